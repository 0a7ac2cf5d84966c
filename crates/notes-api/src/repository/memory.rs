//! 메모리 저장소.
//!
//! `DATABASE_URL` 없이 서버를 실행할 때와 테스트에서 사용합니다.
//! PostgreSQL 구현과 같은 정렬/필터/제약 규칙을 따릅니다.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use notes_core::{
    normalize_tag_ids, Attachment, AttachmentQuery, AttachmentStore, Category, CategoryQuery,
    CategoryStore, NewAttachment, NewCategory, NewNote, NewTag, NewUser, Note, NoteQuery,
    NoteStore, Store, StoreError, StoreResult, Tag, TagQuery, TagStore, User, UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    /// (사용자, 소프트 삭제 여부)
    users: BTreeMap<i64, (User, bool)>,
    notes: BTreeMap<i64, Note>,
    attachments: BTreeMap<i64, Attachment>,
    categories: BTreeMap<i64, Category>,
    tags: BTreeMap<i64, Tag>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn live_users(&self) -> impl Iterator<Item = &User> {
        self.users
            .values()
            .filter(|(_, deleted)| !deleted)
            .map(|(user, _)| user)
    }

    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.live_users()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn with_note_count(&self, tag: &Tag) -> Tag {
        let note_count = self
            .notes
            .values()
            .filter(|note| note.tag_ids.contains(&tag.id))
            .count() as i64;
        Tag {
            note_count,
            ..tag.clone()
        }
    }
}

/// tokio `RwLock` 기반 메모리 저장소.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, input: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&input.username, None) {
            return Err(StoreError::Conflict(format!(
                "username already exists: {}",
                input.username
            )));
        }

        let now = Utc::now();
        let user = User {
            id: tables.allocate_id(),
            username: input.username,
            password_hash: input.password_hash,
            email: input.email,
            nickname: input.nickname,
            avatar: String::new(),
            bio: String::new(),
            role: input.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, (user.clone(), false));
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        let user = tables.live_users().find(|u| u.id == id).cloned();
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        let user = tables.live_users().find(|u| u.username == username).cloned();
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let users = tables.live_users().cloned().collect();
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&user.username, Some(user.id)) {
            return Err(StoreError::Conflict(format!(
                "username already exists: {}",
                user.username
            )));
        }
        match tables.users.get_mut(&user.id) {
            Some((stored, false)) => {
                *stored = User {
                    updated_at: Utc::now(),
                    created_at: stored.created_at,
                    ..user.clone()
                };
                Ok(stored.clone())
            }
            _ => Err(StoreError::NotFound(format!("user not found: {}", user.id))),
        }
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some((_, deleted @ false)) => {
                *deleted = true;
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("user not found: {}", id))),
        }
    }

    async fn count_users(&self) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        let count = tables.live_users().count() as i64;
        Ok(count)
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn list_notes(&self, query: &NoteQuery) -> StoreResult<(Vec<Note>, i64)> {
        let tables = self.tables.read().await;
        let mut matched: Vec<&Note> = tables.notes.values().filter(|n| query.matches(n)).collect();
        matched.sort_by(|a, b| query.order.compare(a, b));

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get_note(&self, id: i64) -> StoreResult<Option<Note>> {
        Ok(self.tables.read().await.notes.get(&id).cloned())
    }

    async fn create_note(&self, input: NewNote) -> StoreResult<Note> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let note = Note {
            id: tables.allocate_id(),
            title: input.title,
            content: input.content,
            summary: input.summary,
            author_id: input.author_id,
            category_id: input.category_id,
            tag_ids: normalize_tag_ids(input.tag_ids),
            visibility: input.visibility,
            published: input.published,
            published_at: input.published_at,
            created_at: now,
            updated_at: now,
        };
        tables.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update_note(&self, note: &Note) -> StoreResult<Note> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .notes
            .get_mut(&note.id)
            .ok_or_else(|| StoreError::NotFound(format!("note not found: {}", note.id)))?;
        *stored = Note {
            tag_ids: normalize_tag_ids(note.tag_ids.clone()),
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..note.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_note(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.notes.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("note not found: {}", id)));
        }
        for attachment in tables.attachments.values_mut() {
            if attachment.note_id == Some(id) {
                attachment.note_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AttachmentStore for MemoryStore {
    async fn create_attachment(&self, input: NewAttachment) -> StoreResult<Attachment> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let attachment = Attachment {
            id: tables.allocate_id(),
            filename: input.filename,
            mime_type: input.mime_type,
            size: input.content.len() as i64,
            content: input.content,
            author_id: input.author_id,
            note_id: input.note_id,
            created_at: now,
            updated_at: now,
        };
        tables.attachments.insert(attachment.id, attachment.clone());
        Ok(attachment)
    }

    async fn get_attachment(&self, id: i64) -> StoreResult<Option<Attachment>> {
        Ok(self.tables.read().await.attachments.get(&id).cloned())
    }

    async fn list_attachments(&self, query: &AttachmentQuery) -> StoreResult<Vec<Attachment>> {
        let tables = self.tables.read().await;
        let mut matched: Vec<&Attachment> = tables
            .attachments
            .values()
            .filter(|a| query.note_id.map_or(true, |id| a.note_id == Some(id)))
            .filter(|a| query.author_id.map_or(true, |id| a.author_id == id))
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        Ok(matched
            .into_iter()
            .take(query.limit.max(0) as usize)
            .map(|a| Attachment {
                content: Vec::new(),
                ..a.clone()
            })
            .collect())
    }

    async fn set_attachment_note(&self, id: i64, note_id: Option<i64>) -> StoreResult<Attachment> {
        let mut tables = self.tables.write().await;
        let attachment = tables
            .attachments
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("attachment not found: {}", id)))?;
        attachment.note_id = note_id;
        attachment.updated_at = Utc::now();
        Ok(attachment.clone())
    }

    async fn delete_attachment(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .attachments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("attachment not found: {}", id)))
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self, query: CategoryQuery) -> StoreResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut matched: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matched)
    }

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn create_category(&self, input: NewCategory) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let category = Category {
            id: tables.allocate_id(),
            name: input.name,
            description: input.description,
            parent_id: input.parent_id,
            sort_order: input.sort_order,
            visible: input.visible,
            created_at: now,
            updated_at: now,
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, category: &Category) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .categories
            .get_mut(&category.id)
            .ok_or_else(|| StoreError::NotFound(format!("category not found: {}", category.id)))?;
        *stored = Category {
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..category.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_category(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let in_use = tables
            .notes
            .values()
            .filter(|n| n.category_id == Some(id))
            .count();
        if in_use > 0 {
            return Err(StoreError::Conflict(format!(
                "cannot delete category: category has {} note(s)",
                in_use
            )));
        }
        tables
            .categories
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("category not found: {}", id)))
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn list_tags(&self, query: TagQuery) -> StoreResult<(Vec<Tag>, i64)> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .tags
            .values()
            .map(|t| tables.with_note_count(t))
            .collect();
        tags.sort_by(|a, b| {
            b.note_count
                .cmp(&a.note_count)
                .then_with(|| a.name.cmp(&b.name))
        });

        let total = tags.len() as i64;
        let page = tags
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.map_or(usize::MAX, |l| l.max(0) as usize))
            .collect();
        Ok((page, total))
    }

    async fn get_tag(&self, id: i64) -> StoreResult<Option<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables.tags.get(&id).map(|t| tables.with_note_count(t)))
    }

    async fn create_tag(&self, input: NewTag) -> StoreResult<Tag> {
        let mut tables = self.tables.write().await;
        if tables.tags.values().any(|t| t.name == input.name) {
            return Err(StoreError::Conflict(format!(
                "tag already exists: {}",
                input.name
            )));
        }
        let now = Utc::now();
        let tag = Tag {
            id: tables.allocate_id(),
            name: input.name,
            description: input.description,
            note_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, tag: &Tag) -> StoreResult<Tag> {
        let mut tables = self.tables.write().await;
        if tables
            .tags
            .values()
            .any(|t| t.name == tag.name && t.id != tag.id)
        {
            return Err(StoreError::Conflict(format!(
                "tag already exists: {}",
                tag.name
            )));
        }
        let stored = tables
            .tags
            .get_mut(&tag.id)
            .ok_or_else(|| StoreError::NotFound(format!("tag not found: {}", tag.id)))?;
        stored.name = tag.name.clone();
        stored.description = tag.description.clone();
        stored.updated_at = Utc::now();
        let updated = stored.clone();
        Ok(tables.with_note_count(&updated))
    }

    async fn delete_tag(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let in_use = tables
            .notes
            .values()
            .filter(|n| n.tag_ids.contains(&id))
            .count();
        if in_use > 0 {
            return Err(StoreError::Conflict(format!(
                "cannot delete tag: tag has {} note(s)",
                in_use
            )));
        }
        tables
            .tags
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("tag not found: {}", id)))
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notes_core::{NoteOrder, ReadScope, Role, Visibility};

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            email: String::new(),
            nickname: username.to_string(),
            role: Role::User,
        }
    }

    fn new_note(author_id: i64, visibility: Visibility, tag_ids: Vec<i64>) -> NewNote {
        NewNote {
            title: "title".to_string(),
            content: "content".to_string(),
            summary: "summary".to_string(),
            author_id,
            category_id: None,
            tag_ids,
            visibility,
            published: true,
            published_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn test_username_unique_and_soft_delete() {
        let store = MemoryStore::new();
        let alice = store.create_user(new_user("alice")).await.unwrap();
        assert!(matches!(
            store.create_user(new_user("alice")).await,
            Err(StoreError::Conflict(_))
        ));

        store.delete_user(alice.id).await.unwrap();
        assert_eq!(store.find_user_by_id(alice.id).await.unwrap(), None);
        assert_eq!(store.count_users().await.unwrap(), 0);
        // 삭제된 사용자명은 재사용 가능
        assert!(store.create_user(new_user("alice")).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_notes_counts_only_readable() {
        let store = MemoryStore::new();
        store.create_note(new_note(1, Visibility::Public, vec![])).await.unwrap();
        store.create_note(new_note(1, Visibility::Private, vec![])).await.unwrap();
        store.create_note(new_note(2, Visibility::Private, vec![])).await.unwrap();

        let query = |scope| NoteQuery {
            scope,
            category_id: None,
            tag_id: None,
            search: None,
            order: NoteOrder::default(),
            limit: 10,
            offset: 0,
        };

        let (_, total) = store.list_notes(&query(ReadScope::PublicOnly)).await.unwrap();
        assert_eq!(total, 1);
        let (_, total) = store.list_notes(&query(ReadScope::PublicAndOwn(1))).await.unwrap();
        assert_eq!(total, 2);
        let (notes, total) = store.list_notes(&query(ReadScope::Everything)).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(notes.len(), 3);
    }

    #[tokio::test]
    async fn test_tag_note_count_and_delete_guard() {
        let store = MemoryStore::new();
        let tag = store
            .create_tag(NewTag {
                name: "rust".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        let note = store
            .create_note(new_note(1, Visibility::Public, vec![tag.id, tag.id]))
            .await
            .unwrap();
        assert_eq!(note.tag_ids, vec![tag.id]);

        let loaded = store.get_tag(tag.id).await.unwrap().unwrap();
        assert_eq!(loaded.note_count, 1);
        assert!(matches!(
            store.delete_tag(tag.id).await,
            Err(StoreError::Conflict(_))
        ));

        store.delete_note(note.id).await.unwrap();
        store.delete_tag(tag.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_note_unlinks_attachments() {
        let store = MemoryStore::new();
        let note = store
            .create_note(new_note(1, Visibility::Public, vec![]))
            .await
            .unwrap();
        let attachment = store
            .create_attachment(NewAttachment {
                filename: "a.txt".to_string(),
                mime_type: "text/plain".to_string(),
                content: b"hello".to_vec(),
                author_id: 1,
                note_id: Some(note.id),
            })
            .await
            .unwrap();
        assert_eq!(attachment.size, 5);

        store.delete_note(note.id).await.unwrap();
        let reloaded = store.get_attachment(attachment.id).await.unwrap().unwrap();
        assert_eq!(reloaded.note_id, None);
        assert_eq!(reloaded.content, b"hello");

        let listed = store
            .list_attachments(&AttachmentQuery {
                note_id: None,
                author_id: Some(1),
                limit: 50,
            })
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].content.is_empty());
    }
}
