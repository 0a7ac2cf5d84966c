//! PostgreSQL 저장소.
//!
//! 테이블 정의는 `crates/notes-api/schema.sql`을 참고하세요.
//! 동적 조건은 `QueryBuilder`로 구성하고, 노트-태그 연결 변경은 트랜잭션으로 묶습니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use notes_core::{
    Attachment, AttachmentQuery, AttachmentStore, Category, CategoryQuery, CategoryStore,
    DatabaseConfig, NewAttachment, NewCategory, NewNote, NewTag, NewUser, Note, NoteQuery,
    NoteOrder, NoteSortField, NoteStore, ReadScope, Role, Store, StoreError, StoreResult, Tag, TagQuery, TagStore, User,
    UserStore, Visibility, normalize_tag_ids,
};

// ================================================================================================
// Row Types
// ================================================================================================

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    email: String,
    nickname: String,
    avatar: String,
    bio: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| StoreError::Database(format!("unknown role in users.role: {}", row.role)))?;
        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            email: row.email,
            nickname: row.nickname,
            avatar: row.avatar,
            bio: row.bio,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct NoteRow {
    id: i64,
    title: String,
    content: String,
    summary: String,
    author_id: i64,
    category_id: Option<i64>,
    tag_ids: Vec<i64>,
    visibility: String,
    published: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<NoteRow> for Note {
    type Error = StoreError;

    fn try_from(row: NoteRow) -> Result<Self, Self::Error> {
        let visibility = Visibility::parse(&row.visibility).ok_or_else(|| {
            StoreError::Database(format!("unknown visibility in notes.visibility: {}", row.visibility))
        })?;
        Ok(Note {
            id: row.id,
            title: row.title,
            content: row.content,
            summary: row.summary,
            author_id: row.author_id,
            category_id: row.category_id,
            tag_ids: row.tag_ids,
            visibility,
            published: row.published,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AttachmentRow {
    id: i64,
    filename: String,
    mime_type: String,
    size: i64,
    content: Vec<u8>,
    author_id: i64,
    note_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AttachmentRow> for Attachment {
    fn from(row: AttachmentRow) -> Self {
        Attachment {
            id: row.id,
            filename: row.filename,
            mime_type: row.mime_type,
            size: row.size,
            content: row.content,
            author_id: row.author_id,
            note_id: row.note_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: String,
    parent_id: Option<i64>,
    sort_order: i32,
    visible: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            description: row.description,
            parent_id: row.parent_id,
            sort_order: row.sort_order,
            visible: row.visible,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TagRow {
    id: i64,
    name: String,
    description: String,
    note_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            description: row.description,
            note_count: row.note_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ================================================================================================
// Queries
// ================================================================================================

const USER_COLUMNS: &str =
    "id, username, password_hash, email, nickname, avatar, bio, role, created_at, updated_at";

const NOTE_SELECT: &str = r#"
    SELECT
        n.id, n.title, n.content, n.summary, n.author_id, n.category_id,
        n.visibility, n.published, n.published_at, n.created_at, n.updated_at,
        COALESCE(
            ARRAY_AGG(nt.tag_id ORDER BY nt.tag_id) FILTER (WHERE nt.tag_id IS NOT NULL),
            '{}'::BIGINT[]
        ) AS tag_ids
    FROM notes n
    LEFT JOIN note_tags nt ON nt.note_id = n.id
"#;

const ATTACHMENT_COLUMNS: &str =
    "id, filename, mime_type, size, content, author_id, note_id, created_at, updated_at";

const CATEGORY_COLUMNS: &str =
    "id, name, description, parent_id, sort_order, visible, created_at, updated_at";

const TAG_SELECT: &str = r#"
    SELECT
        t.id, t.name, t.description, t.created_at, t.updated_at,
        (SELECT COUNT(*) FROM note_tags nt WHERE nt.tag_id = t.id) AS note_count
    FROM tags t
"#;

/// sqlx 에러를 저장소 에러로 변환합니다.
///
/// 유일성 위반과 외래 키 위반은 `Conflict`로, 나머지는 `Database`로 분류합니다.
fn map_db_error(err: sqlx::Error, conflict: impl FnOnce() -> String) -> StoreError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => StoreError::Conflict(conflict()),
        Some(db_err) if db_err.is_foreign_key_violation() => StoreError::Conflict(format!(
            "referenced resource is missing or still in use ({})",
            db_err.constraint().unwrap_or("foreign key")
        )),
        _ => StoreError::Database(err.to_string()),
    }
}

fn db_error(err: sqlx::Error) -> StoreError {
    map_db_error(err, || "resource already exists".to_string())
}

/// `LIKE` 패턴 문자(`%`, `_`)와 이스케이프 문자(`\`)를 문자 그대로 비교되도록 이스케이프합니다.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 정렬 조건을 고정된 `ORDER BY` 절로 바꿉니다. 입력 문자열은 SQL에 들어가지 않습니다.
fn order_by_clause(order: NoteOrder) -> String {
    let column = match order.field {
        NoteSortField::PublishedAt => "n.published_at",
        NoteSortField::CreatedAt => "n.created_at",
        NoteSortField::UpdatedAt => "n.updated_at",
        NoteSortField::Title => "n.title",
    };
    let direction = if order.descending { "DESC" } else { "ASC" };
    format!(" ORDER BY {column} {direction}, n.id {direction}")
}

/// 노트 목록/개수 쿼리에 공통 WHERE 조건을 추가합니다.
fn push_note_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &NoteQuery) {
    builder.push(" WHERE n.published = TRUE");

    match query.scope {
        ReadScope::PublicOnly => {
            builder.push(" AND n.visibility = 'PUBLIC'");
        }
        ReadScope::PublicAndOwn(user_id) => {
            builder.push(" AND (n.visibility = 'PUBLIC' OR n.author_id = ");
            builder.push_bind(user_id);
            builder.push(")");
        }
        ReadScope::Everything => {}
    }

    if let Some(category_id) = query.category_id {
        builder.push(" AND n.category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(tag_id) = query.tag_id {
        builder.push(" AND EXISTS (SELECT 1 FROM note_tags ft WHERE ft.note_id = n.id AND ft.tag_id = ");
        builder.push_bind(tag_id);
        builder.push(")");
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        builder.push(" AND n.title ILIKE ");
        builder.push_bind(format!("%{}%", escape_like(search)));
        builder.push(" ESCAPE '\\'");
    }
}

async fn replace_note_tags(
    tx: &mut Transaction<'_, Postgres>,
    note_id: i64,
    tag_ids: &[i64],
) -> StoreResult<()> {
    sqlx::query("DELETE FROM note_tags WHERE note_id = $1")
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;

    if !tag_ids.is_empty() {
        sqlx::query(
            "INSERT INTO note_tags (note_id, tag_id) SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
        )
        .bind(note_id)
        .bind(tag_ids)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

// ================================================================================================
// Store
// ================================================================================================

/// PostgreSQL 기반 저장소.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 설정으로 연결 풀을 만들고 저장소를 생성합니다.
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connection_timeout_secs))
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, password_hash, email, nickname, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.nickname)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, || format!("username already exists: {}", user.username)))?;

        row.try_into()
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(User::try_from)
        .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                username = $2, password_hash = $3, email = $4, nickname = $5,
                avatar = $6, bio = $7, role = $8, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.nickname)
        .bind(&user.avatar)
        .bind(&user.bio)
        .bind(user.role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, || format!("username already exists: {}", user.username)))?
        .ok_or_else(|| StoreError::NotFound(format!("user not found: {}", user.id)))?;

        row.try_into()
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user not found: {}", id)));
        }
        Ok(())
    }

    async fn count_users(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn list_notes(&self, query: &NoteQuery) -> StoreResult<(Vec<Note>, i64)> {
        let mut count_builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM notes n");
        push_note_filters(&mut count_builder, query);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(NOTE_SELECT);
        push_note_filters(&mut builder, query);
        builder.push(" GROUP BY n.id");
        builder.push(order_by_clause(query.order));
        builder.push(" LIMIT ");
        builder.push_bind(query.limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.offset);

        let notes = builder
            .build_query_as::<NoteRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(Note::try_from)
            .collect::<StoreResult<Vec<_>>>()?;

        debug!(total, returned = notes.len(), "Listed notes");
        Ok((notes, total))
    }

    async fn get_note(&self, id: i64) -> StoreResult<Option<Note>> {
        sqlx::query_as::<_, NoteRow>(&format!("{} WHERE n.id = $1 GROUP BY n.id", NOTE_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(Note::try_from)
            .transpose()
    }

    async fn create_note(&self, note: NewNote) -> StoreResult<Note> {
        let tag_ids = normalize_tag_ids(note.tag_ids);
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO notes
                (title, content, summary, author_id, category_id, visibility, published, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.summary)
        .bind(note.author_id)
        .bind(note.category_id)
        .bind(note.visibility.as_str())
        .bind(note.published)
        .bind(note.published_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        replace_note_tags(&mut tx, id, &tag_ids).await?;
        tx.commit().await.map_err(db_error)?;

        self.get_note(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("note not found: {}", id)))
    }

    async fn update_note(&self, note: &Note) -> StoreResult<Note> {
        let tag_ids = normalize_tag_ids(note.tag_ids.clone());
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE notes SET
                title = $2, content = $3, summary = $4, category_id = $5,
                visibility = $6, published = $7, published_at = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(note.id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.summary)
        .bind(note.category_id)
        .bind(note.visibility.as_str())
        .bind(note.published)
        .bind(note.published_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        if updated.is_none() {
            return Err(StoreError::NotFound(format!("note not found: {}", note.id)));
        }

        replace_note_tags(&mut tx, note.id, &tag_ids).await?;
        tx.commit().await.map_err(db_error)?;

        self.get_note(note.id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("note not found: {}", note.id)))
    }

    async fn delete_note(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query("UPDATE attachments SET note_id = NULL, updated_at = NOW() WHERE note_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        sqlx::query("DELETE FROM note_tags WHERE note_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("note not found: {}", id)));
        }
        tx.commit().await.map_err(db_error)
    }
}

#[async_trait]
impl AttachmentStore for PgStore {
    async fn create_attachment(&self, attachment: NewAttachment) -> StoreResult<Attachment> {
        let row = sqlx::query_as::<_, AttachmentRow>(&format!(
            "INSERT INTO attachments (filename, mime_type, size, content, author_id, note_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            ATTACHMENT_COLUMNS
        ))
        .bind(&attachment.filename)
        .bind(&attachment.mime_type)
        .bind(attachment.content.len() as i64)
        .bind(&attachment.content)
        .bind(attachment.author_id)
        .bind(attachment.note_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into())
    }

    async fn get_attachment(&self, id: i64) -> StoreResult<Option<Attachment>> {
        let row = sqlx::query_as::<_, AttachmentRow>(&format!(
            "SELECT {} FROM attachments WHERE id = $1",
            ATTACHMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Attachment::from))
    }

    async fn list_attachments(&self, query: &AttachmentQuery) -> StoreResult<Vec<Attachment>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, filename, mime_type, size, ''::BYTEA AS content, author_id, note_id, \
             created_at, updated_at FROM attachments WHERE TRUE",
        );
        if let Some(note_id) = query.note_id {
            builder.push(" AND note_id = ");
            builder.push_bind(note_id);
        }
        if let Some(author_id) = query.author_id {
            builder.push(" AND author_id = ");
            builder.push_bind(author_id);
        }
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(query.limit);

        let rows = builder
            .build_query_as::<AttachmentRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(Attachment::from).collect())
    }

    async fn set_attachment_note(&self, id: i64, note_id: Option<i64>) -> StoreResult<Attachment> {
        sqlx::query_as::<_, AttachmentRow>(&format!(
            "UPDATE attachments SET note_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            ATTACHMENT_COLUMNS
        ))
        .bind(id)
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Attachment::from)
        .ok_or_else(|| StoreError::NotFound(format!("attachment not found: {}", id)))
    }

    async fn delete_attachment(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("attachment not found: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn list_categories(&self, query: CategoryQuery) -> StoreResult<Vec<Category>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM categories WHERE TRUE", CATEGORY_COLUMNS));
        if !query.include_hidden {
            builder.push(" AND visible = TRUE");
        }
        if let Some(parent_id) = query.parent_id {
            builder.push(" AND parent_id = ");
            builder.push_bind(parent_id);
        }
        builder.push(" ORDER BY sort_order ASC, created_at DESC, id DESC");

        let rows = builder
            .build_query_as::<CategoryRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {} FROM categories WHERE id = $1",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Category::from))
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "INSERT INTO categories (name, description, parent_id, sort_order, visible) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.parent_id)
        .bind(category.sort_order)
        .bind(category.visible)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into())
    }

    async fn update_category(&self, category: &Category) -> StoreResult<Category> {
        sqlx::query_as::<_, CategoryRow>(&format!(
            r#"
            UPDATE categories SET
                name = $2, description = $3, parent_id = $4, sort_order = $5,
                visible = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.parent_id)
        .bind(category.sort_order)
        .bind(category.visible)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(Category::from)
        .ok_or_else(|| StoreError::NotFound(format!("category not found: {}", category.id)))
    }

    async fn delete_category(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let note_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes WHERE category_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        if note_count > 0 {
            return Err(StoreError::Conflict(format!(
                "cannot delete category: category has {} note(s)",
                note_count
            )));
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("category not found: {}", id)));
        }
        tx.commit().await.map_err(db_error)
    }
}

#[async_trait]
impl TagStore for PgStore {
    async fn list_tags(&self, query: TagQuery) -> StoreResult<(Vec<Tag>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(TAG_SELECT);
        builder.push(" ORDER BY note_count DESC, t.name ASC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }
        if query.offset > 0 {
            builder.push(" OFFSET ");
            builder.push_bind(query.offset);
        }

        let rows = builder
            .build_query_as::<TagRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok((rows.into_iter().map(Tag::from).collect(), total))
    }

    async fn get_tag(&self, id: i64) -> StoreResult<Option<Tag>> {
        let row = sqlx::query_as::<_, TagRow>(&format!("{} WHERE t.id = $1", TAG_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(Tag::from))
    }

    async fn create_tag(&self, tag: NewTag) -> StoreResult<Tag> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO tags (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(&tag.name)
        .bind(&tag.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, || format!("tag already exists: {}", tag.name)))?;

        self.get_tag(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("tag not found: {}", id)))
    }

    async fn update_tag(&self, tag: &Tag) -> StoreResult<Tag> {
        let updated: Option<i64> = sqlx::query_scalar(
            "UPDATE tags SET name = $2, description = $3, updated_at = NOW() WHERE id = $1 RETURNING id",
        )
        .bind(tag.id)
        .bind(&tag.name)
        .bind(&tag.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, || format!("tag already exists: {}", tag.name)))?;

        match updated {
            Some(id) => self
                .get_tag(id)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("tag not found: {}", id))),
            None => Err(StoreError::NotFound(format!("tag not found: {}", tag.id))),
        }
    }

    async fn delete_tag(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let note_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM note_tags WHERE tag_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        if note_count > 0 {
            return Err(StoreError::Conflict(format!(
                "cannot delete tag: tag has {} note(s)",
                note_count
            )));
        }

        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("tag not found: {}", id)));
        }
        tx.commit().await.map_err(db_error)
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(db_error)
    }
}
