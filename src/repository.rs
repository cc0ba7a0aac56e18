use crate::{
    error::AppResult,
    models::{
        Answer, AnswerChanges, Category, NewAnswer, NewQuestion, NewUser, Question,
        QuestionChanges, SluggedTitle, Tag, User,
    },
    pagination::{Page, PageRequest},
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The persistence contract for every entity. Handlers and services only ever
/// see `Arc<dyn Repository>`, so the Postgres store and the in-memory store are
/// interchangeable.
///
/// Implementations must honour the relation rules: deleting a question removes
/// its answers and tag links, deleting a user removes what they authored,
/// deleting a tag unlinks it, and deleting a category that is still referenced
/// is a `Conflict`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn list_users(&self, page: PageRequest) -> AppResult<Page<User>>;
    async fn set_user_roles(&self, id: Uuid, roles: Vec<String>) -> AppResult<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;

    // --- Categories ---
    async fn list_categories(&self, page: PageRequest) -> AppResult<Page<Category>>;
    async fn get_category(&self, id: i64) -> AppResult<Option<Category>>;
    async fn create_category(&self, draft: SluggedTitle) -> AppResult<Category>;
    async fn update_category(&self, id: i64, draft: SluggedTitle) -> AppResult<Option<Category>>;
    async fn delete_category(&self, id: i64) -> AppResult<bool>;

    // --- Tags ---
    async fn list_tags(&self, page: PageRequest) -> AppResult<Page<Tag>>;
    async fn get_tag(&self, id: i64) -> AppResult<Option<Tag>>;
    async fn find_tag_by_slug(&self, slug: &str) -> AppResult<Option<Tag>>;
    async fn create_tag(&self, draft: SluggedTitle) -> AppResult<Tag>;
    async fn update_tag(&self, id: i64, draft: SluggedTitle) -> AppResult<Option<Tag>>;
    async fn delete_tag(&self, id: i64) -> AppResult<bool>;

    // --- Questions ---
    // Newest first.
    async fn list_questions(&self, page: PageRequest) -> AppResult<Page<Question>>;
    async fn list_questions_by_category(
        &self,
        category_id: i64,
        page: PageRequest,
    ) -> AppResult<Page<Question>>;
    async fn list_questions_by_tag(&self, tag_id: i64, page: PageRequest)
    -> AppResult<Page<Question>>;
    async fn get_question(&self, id: i64) -> AppResult<Option<Question>>;
    async fn create_question(&self, question: NewQuestion) -> AppResult<Question>;
    async fn update_question(&self, id: i64, changes: QuestionChanges)
    -> AppResult<Option<Question>>;
    async fn delete_question(&self, id: i64) -> AppResult<bool>;
    async fn question_tags(&self, question_id: i64) -> AppResult<Vec<Tag>>;
    /// Replaces the full tag set of a question.
    async fn set_question_tags(&self, question_id: i64, tag_ids: &[i64]) -> AppResult<()>;

    // --- Answers ---
    // Oldest first.
    async fn list_answers(&self, question_id: i64, page: PageRequest) -> AppResult<Page<Answer>>;
    async fn get_answer(&self, id: i64) -> AppResult<Option<Answer>>;
    async fn create_answer(&self, answer: NewAnswer) -> AppResult<Answer>;
    async fn update_answer(&self, id: i64, changes: AnswerChanges) -> AppResult<Option<Answer>>;
    async fn delete_answer(&self, id: i64) -> AppResult<bool>;
    /// Sets or clears the best-answer flag on one answer; siblings are untouched.
    async fn set_best_answer(&self, id: i64, best: bool) -> AppResult<Option<Answer>>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, email, nickname, password_hash, roles, created_at, updated_at";
const QUESTION_COLUMNS: &str =
    "q.id, q.title, q.body, q.category_id, q.image, q.author_id, q.created_at, q.updated_at";
const ANSWER_COLUMNS: &str =
    "id, question_id, body, image, author_id, best_answer, created_at, updated_at";
const TAXONOMY_COLUMNS: &str = "id, title, slug, created_at, updated_at";
// Unqualified column list for RETURNING clauses.
const QUESTION_FIELDS: &str =
    "id, title, body, category_id, image, author_id, created_at, updated_at";

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Cascades are delegated to the foreign
/// keys declared in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

/// Which questions a listing covers.
#[derive(Debug, Clone, Copy)]
enum QuestionScope {
    All,
    Category(i64),
    Tag(i64),
}

/// Appends the FROM/WHERE part of a question listing, binding the filter value.
fn push_question_source(builder: &mut QueryBuilder<'_, Postgres>, scope: QuestionScope) {
    match scope {
        QuestionScope::All => {
            builder.push(" FROM questions q");
        }
        QuestionScope::Category(category_id) => {
            builder.push(" FROM questions q WHERE q.category_id = ");
            builder.push_bind(category_id);
        }
        QuestionScope::Tag(tag_id) => {
            builder.push(
                " FROM questions q JOIN questions_tags qt ON qt.question_id = q.id WHERE qt.tag_id = ",
            );
            builder.push_bind(tag_id);
        }
    }
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// get_questions_page
    ///
    /// Shared listing for all question scopes: one COUNT, then one page ordered
    /// newest first. Both statements are parameterised through `QueryBuilder`.
    async fn get_questions_page(
        &self,
        scope: QuestionScope,
        page: PageRequest,
    ) -> AppResult<Page<Question>> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*)");
        push_question_source(&mut count, scope);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .inspect_err(|e| tracing::error!("count questions error: {:?}", e))?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {QUESTION_COLUMNS}"));
        push_question_source(&mut builder, scope);
        builder.push(" ORDER BY q.created_at DESC, q.id DESC LIMIT ");
        builder.push_bind(page.limit());
        builder.push(" OFFSET ");
        builder.push_bind(page.offset());

        let items = builder
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await
            .inspect_err(|e| tracing::error!("list questions error: {:?}", e))?;

        Ok(Page::new(items, page, total.max(0) as u64))
    }

    /// Counts a whole table. `table` is always a crate constant, never input.
    async fn count_table(&self, table: &str) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("get_user error: {:?}", e))?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("find_user_by_email error: {:?}", e))?;
        Ok(user)
    }

    /// create_user
    ///
    /// Inserts a user with a fresh UUID. A duplicate email surfaces as
    /// `Conflict` through the unique index.
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO users (id, email, nickname, password_hash, roles, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(user.email)
        .bind(user.nickname)
        .bind(user.password_hash)
        .bind(user.roles)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_users(&self, page: PageRequest) -> AppResult<Page<User>> {
        let total = self.count_table("users").await?;
        let items = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("list_users error: {:?}", e))?;
        Ok(Page::new(items, page, total))
    }

    async fn set_user_roles(&self, id: Uuid, roles: Vec<String>) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET roles = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(roles)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// delete_user
    ///
    /// Authored questions and answers go with the user (ON DELETE CASCADE).
    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- CATEGORIES ---

    async fn list_categories(&self, page: PageRequest) -> AppResult<Page<Category>> {
        let total = self.count_table("categories").await?;
        let items = sqlx::query_as::<_, Category>(&format!(
            "SELECT {TAXONOMY_COLUMNS} FROM categories ORDER BY title ASC, id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("list_categories error: {:?}", e))?;
        Ok(Page::new(items, page, total))
    }

    async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {TAXONOMY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn create_category(&self, draft: SluggedTitle) -> AppResult<Category> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"INSERT INTO categories (title, slug, created_at, updated_at)
               VALUES ($1, $2, NOW(), NOW())
               RETURNING {TAXONOMY_COLUMNS}"#
        ))
        .bind(draft.title)
        .bind(draft.slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update_category(&self, id: i64, draft: SluggedTitle) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"UPDATE categories SET title = $2, slug = $3, updated_at = NOW()
               WHERE id = $1
               RETURNING {TAXONOMY_COLUMNS}"#
        ))
        .bind(id)
        .bind(draft.title)
        .bind(draft.slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    /// delete_category
    ///
    /// Questions reference categories without a cascade, so a category in use
    /// fails with a foreign-key violation, reported as `Conflict`.
    async fn delete_category(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- TAGS ---

    async fn list_tags(&self, page: PageRequest) -> AppResult<Page<Tag>> {
        let total = self.count_table("tags").await?;
        let items = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAXONOMY_COLUMNS} FROM tags ORDER BY title ASC, id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("list_tags error: {:?}", e))?;
        Ok(Page::new(items, page, total))
    }

    async fn get_tag(&self, id: i64) -> AppResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAXONOMY_COLUMNS} FROM tags WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tag)
    }

    async fn find_tag_by_slug(&self, slug: &str) -> AppResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {TAXONOMY_COLUMNS} FROM tags WHERE slug = $1 ORDER BY id ASC LIMIT 1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tag)
    }

    async fn create_tag(&self, draft: SluggedTitle) -> AppResult<Tag> {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            r#"INSERT INTO tags (title, slug, created_at, updated_at)
               VALUES ($1, $2, NOW(), NOW())
               RETURNING {TAXONOMY_COLUMNS}"#
        ))
        .bind(draft.title)
        .bind(draft.slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(tag)
    }

    async fn update_tag(&self, id: i64, draft: SluggedTitle) -> AppResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(&format!(
            r#"UPDATE tags SET title = $2, slug = $3, updated_at = NOW()
               WHERE id = $1
               RETURNING {TAXONOMY_COLUMNS}"#
        ))
        .bind(id)
        .bind(draft.title)
        .bind(draft.slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tag)
    }

    async fn delete_tag(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- QUESTIONS ---

    async fn list_questions(&self, page: PageRequest) -> AppResult<Page<Question>> {
        self.get_questions_page(QuestionScope::All, page).await
    }

    async fn list_questions_by_category(
        &self,
        category_id: i64,
        page: PageRequest,
    ) -> AppResult<Page<Question>> {
        self.get_questions_page(QuestionScope::Category(category_id), page)
            .await
    }

    async fn list_questions_by_tag(
        &self,
        tag_id: i64,
        page: PageRequest,
    ) -> AppResult<Page<Question>> {
        self.get_questions_page(QuestionScope::Tag(tag_id), page)
            .await
    }

    async fn get_question(&self, id: i64) -> AppResult<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_FIELDS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("get_question error: {:?}", e))?;
        Ok(question)
    }

    async fn create_question(&self, question: NewQuestion) -> AppResult<Question> {
        let created = sqlx::query_as::<_, Question>(&format!(
            r#"INSERT INTO questions (title, body, category_id, image, author_id, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
               RETURNING {QUESTION_FIELDS}"#
        ))
        .bind(question.title)
        .bind(question.body)
        .bind(question.category_id)
        .bind(question.image)
        .bind(question.author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// update_question
    ///
    /// Partial update through `COALESCE`: absent fields keep their value.
    async fn update_question(
        &self,
        id: i64,
        changes: QuestionChanges,
    ) -> AppResult<Option<Question>> {
        let updated = sqlx::query_as::<_, Question>(&format!(
            r#"UPDATE questions
               SET title = COALESCE($2, title),
                   body = COALESCE($3, body),
                   category_id = COALESCE($4, category_id),
                   image = COALESCE($5, image),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING {QUESTION_FIELDS}"#
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.body)
        .bind(changes.category_id)
        .bind(changes.image)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    /// delete_question
    ///
    /// Answers and tag links are removed by ON DELETE CASCADE.
    async fn delete_question(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn question_tags(&self, question_id: i64) -> AppResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"SELECT t.id, t.title, t.slug, t.created_at, t.updated_at
               FROM tags t JOIN questions_tags qt ON qt.tag_id = t.id
               WHERE qt.question_id = $1
               ORDER BY t.title ASC, t.id ASC"#,
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn set_question_tags(&self, question_id: i64, tag_ids: &[i64]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM questions_tags WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        if !tag_ids.is_empty() {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO questions_tags (question_id, tag_id) ");
            builder.push_values(tag_ids, |mut row, tag_id| {
                row.push_bind(question_id).push_bind(*tag_id);
            });
            builder.push(" ON CONFLICT DO NOTHING");
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // --- ANSWERS ---

    async fn list_answers(&self, question_id: i64, page: PageRequest) -> AppResult<Page<Answer>> {
        let total: i64 =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM answers WHERE question_id = $1")
                .bind(question_id)
                .fetch_one(&self.pool)
                .await?;
        let items = sqlx::query_as::<_, Answer>(&format!(
            r#"SELECT {ANSWER_COLUMNS} FROM answers
               WHERE question_id = $1
               ORDER BY created_at ASC, id ASC
               LIMIT $2 OFFSET $3"#
        ))
        .bind(question_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("list_answers error: {:?}", e))?;
        Ok(Page::new(items, page, total.max(0) as u64))
    }

    async fn get_answer(&self, id: i64) -> AppResult<Option<Answer>> {
        let answer = sqlx::query_as::<_, Answer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(answer)
    }

    async fn create_answer(&self, answer: NewAnswer) -> AppResult<Answer> {
        let created = sqlx::query_as::<_, Answer>(&format!(
            r#"INSERT INTO answers (question_id, body, image, author_id, best_answer, created_at, updated_at)
               VALUES ($1, $2, $3, $4, false, NOW(), NOW())
               RETURNING {ANSWER_COLUMNS}"#
        ))
        .bind(answer.question_id)
        .bind(answer.body)
        .bind(answer.image)
        .bind(answer.author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_answer(&self, id: i64, changes: AnswerChanges) -> AppResult<Option<Answer>> {
        let updated = sqlx::query_as::<_, Answer>(&format!(
            r#"UPDATE answers
               SET body = COALESCE($2, body),
                   image = COALESCE($3, image),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING {ANSWER_COLUMNS}"#
        ))
        .bind(id)
        .bind(changes.body)
        .bind(changes.image)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_answer(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM answers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_best_answer(&self, id: i64, best: bool) -> AppResult<Option<Answer>> {
        let answer = sqlx::query_as::<_, Answer>(&format!(
            "UPDATE answers SET best_answer = $2 WHERE id = $1 RETURNING {ANSWER_COLUMNS}"
        ))
        .bind(id)
        .bind(best)
        .fetch_optional(&self.pool)
        .await?;
        Ok(answer)
    }
}
