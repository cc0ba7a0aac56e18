use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Answer, AnswerChanges, Category, NewAnswer, NewQuestion, NewUser, Question,
        QuestionChanges, SluggedTitle, Tag, User,
    },
    pagination::{Page, PageRequest},
    repository::Repository,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<Uuid, User>,
    categories: BTreeMap<i64, Category>,
    tags: BTreeMap<i64, Tag>,
    questions: BTreeMap<i64, Question>,
    answers: BTreeMap<i64, Answer>,
    /// (question_id, tag_id)
    question_tags: BTreeSet<(i64, i64)>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn remove_question(&mut self, id: i64) -> bool {
        if self.questions.remove(&id).is_none() {
            return false;
        }
        self.answers.retain(|_, a| a.question_id != id);
        self.question_tags.retain(|(q, _)| *q != id);
        true
    }

    fn sorted_questions<F>(&self, keep: F) -> Vec<Question>
    where
        F: Fn(&Question) -> bool,
    {
        let mut questions: Vec<Question> =
            self.questions.values().filter(|q| keep(q)).cloned().collect();
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        questions
    }
}

/// MemoryRepository
///
/// A `Repository` held entirely in process memory. Mirrors the Postgres
/// schema rules (cascades, restrict on categories, unique email and category
/// slug) so the HTTP layer behaves the same against either store. Used by the
/// test suite and for running the service without a database.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- Users ---

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::Conflict("resource already exists".to_string()));
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            nickname: user.nickname,
            password_hash: user.password_hash,
            roles: user.roles,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_users(&self, page: PageRequest) -> AppResult<Page<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(page.slice(users))
    }

    async fn set_user_roles(&self, id: Uuid, roles: Vec<String>) -> AppResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.roles = roles;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        let authored: Vec<i64> = tables
            .questions
            .values()
            .filter(|q| q.author_id == Some(id))
            .map(|q| q.id)
            .collect();
        for question_id in authored {
            tables.remove_question(question_id);
        }
        tables.answers.retain(|_, a| a.author_id != Some(id));
        Ok(true)
    }

    // --- Categories ---

    async fn list_categories(&self, page: PageRequest) -> AppResult<Page<Category>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(page.slice(categories))
    }

    async fn get_category(&self, id: i64) -> AppResult<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn create_category(&self, draft: SluggedTitle) -> AppResult<Category> {
        let mut tables = self.tables.write().await;
        if tables.categories.values().any(|c| c.slug == draft.slug) {
            return Err(AppError::Conflict("resource already exists".to_string()));
        }
        let now = Utc::now();
        let category = Category {
            id: tables.next_id(),
            title: draft.title,
            slug: draft.slug,
            created_at: now,
            updated_at: now,
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, draft: SluggedTitle) -> AppResult<Option<Category>> {
        let mut tables = self.tables.write().await;
        if tables
            .categories
            .values()
            .any(|c| c.slug == draft.slug && c.id != id)
        {
            return Err(AppError::Conflict("resource already exists".to_string()));
        }
        Ok(tables.categories.get_mut(&id).map(|category| {
            category.title = draft.title;
            category.slug = draft.slug;
            category.updated_at = Utc::now();
            category.clone()
        }))
    }

    async fn delete_category(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.questions.values().any(|q| q.category_id == id) {
            return Err(AppError::Conflict("resource is still referenced".to_string()));
        }
        Ok(tables.categories.remove(&id).is_some())
    }

    // --- Tags ---

    async fn list_tags(&self, page: PageRequest) -> AppResult<Page<Tag>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(page.slice(tags))
    }

    async fn get_tag(&self, id: i64) -> AppResult<Option<Tag>> {
        Ok(self.tables.read().await.tags.get(&id).cloned())
    }

    async fn find_tag_by_slug(&self, slug: &str) -> AppResult<Option<Tag>> {
        let tables = self.tables.read().await;
        Ok(tables.tags.values().find(|t| t.slug == slug).cloned())
    }

    async fn create_tag(&self, draft: SluggedTitle) -> AppResult<Tag> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let tag = Tag {
            id: tables.next_id(),
            title: draft.title,
            slug: draft.slug,
            created_at: now,
            updated_at: now,
        };
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, id: i64, draft: SluggedTitle) -> AppResult<Option<Tag>> {
        let mut tables = self.tables.write().await;
        Ok(tables.tags.get_mut(&id).map(|tag| {
            tag.title = draft.title;
            tag.slug = draft.slug;
            tag.updated_at = Utc::now();
            tag.clone()
        }))
    }

    async fn delete_tag(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.tags.remove(&id).is_none() {
            return Ok(false);
        }
        tables.question_tags.retain(|(_, t)| *t != id);
        Ok(true)
    }

    // --- Questions ---

    async fn list_questions(&self, page: PageRequest) -> AppResult<Page<Question>> {
        let tables = self.tables.read().await;
        Ok(page.slice(tables.sorted_questions(|_| true)))
    }

    async fn list_questions_by_category(
        &self,
        category_id: i64,
        page: PageRequest,
    ) -> AppResult<Page<Question>> {
        let tables = self.tables.read().await;
        Ok(page.slice(tables.sorted_questions(|q| q.category_id == category_id)))
    }

    async fn list_questions_by_tag(
        &self,
        tag_id: i64,
        page: PageRequest,
    ) -> AppResult<Page<Question>> {
        let tables = self.tables.read().await;
        let questions =
            tables.sorted_questions(|q| tables.question_tags.contains(&(q.id, tag_id)));
        Ok(page.slice(questions))
    }

    async fn get_question(&self, id: i64) -> AppResult<Option<Question>> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn create_question(&self, question: NewQuestion) -> AppResult<Question> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&question.category_id) {
            return Err(AppError::Conflict("resource is still referenced".to_string()));
        }
        let now = Utc::now();
        let created = Question {
            id: tables.next_id(),
            title: question.title,
            body: question.body,
            category_id: question.category_id,
            image: question.image,
            author_id: question.author_id,
            created_at: now,
            updated_at: now,
        };
        tables.questions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_question(
        &self,
        id: i64,
        changes: QuestionChanges,
    ) -> AppResult<Option<Question>> {
        let mut tables = self.tables.write().await;
        if let Some(category_id) = changes.category_id {
            if !tables.categories.contains_key(&category_id) {
                return Err(AppError::Conflict("resource is still referenced".to_string()));
            }
        }
        Ok(tables.questions.get_mut(&id).map(|question| {
            if let Some(title) = changes.title {
                question.title = title;
            }
            if let Some(body) = changes.body {
                question.body = body;
            }
            if let Some(category_id) = changes.category_id {
                question.category_id = category_id;
            }
            if let Some(image) = changes.image {
                question.image = Some(image);
            }
            question.updated_at = Utc::now();
            question.clone()
        }))
    }

    async fn delete_question(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.write().await.remove_question(id))
    }

    async fn question_tags(&self, question_id: i64) -> AppResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .question_tags
            .iter()
            .filter(|(q, _)| *q == question_id)
            .filter_map(|(_, t)| tables.tags.get(t).cloned())
            .collect();
        tags.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(tags)
    }

    async fn set_question_tags(&self, question_id: i64, tag_ids: &[i64]) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.questions.contains_key(&question_id)
            || tag_ids.iter().any(|t| !tables.tags.contains_key(t))
        {
            return Err(AppError::Conflict("resource is still referenced".to_string()));
        }
        tables.question_tags.retain(|(q, _)| *q != question_id);
        for tag_id in tag_ids {
            tables.question_tags.insert((question_id, *tag_id));
        }
        Ok(())
    }

    // --- Answers ---

    async fn list_answers(&self, question_id: i64, page: PageRequest) -> AppResult<Page<Answer>> {
        let tables = self.tables.read().await;
        let mut answers: Vec<Answer> = tables
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(page.slice(answers))
    }

    async fn get_answer(&self, id: i64) -> AppResult<Option<Answer>> {
        Ok(self.tables.read().await.answers.get(&id).cloned())
    }

    async fn create_answer(&self, answer: NewAnswer) -> AppResult<Answer> {
        let mut tables = self.tables.write().await;
        if !tables.questions.contains_key(&answer.question_id) {
            return Err(AppError::Conflict("resource is still referenced".to_string()));
        }
        let now = Utc::now();
        let created = Answer {
            id: tables.next_id(),
            question_id: answer.question_id,
            body: answer.body,
            image: answer.image,
            author_id: answer.author_id,
            best_answer: false,
            created_at: now,
            updated_at: now,
        };
        tables.answers.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_answer(&self, id: i64, changes: AnswerChanges) -> AppResult<Option<Answer>> {
        let mut tables = self.tables.write().await;
        Ok(tables.answers.get_mut(&id).map(|answer| {
            if let Some(body) = changes.body {
                answer.body = body;
            }
            if let Some(image) = changes.image {
                answer.image = Some(image);
            }
            answer.updated_at = Utc::now();
            answer.clone()
        }))
    }

    async fn delete_answer(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.write().await.answers.remove(&id).is_some())
    }

    async fn set_best_answer(&self, id: i64, best: bool) -> AppResult<Option<Answer>> {
        let mut tables = self.tables.write().await;
        Ok(tables.answers.get_mut(&id).map(|answer| {
            answer.best_answer = best;
            answer.clone()
        }))
    }
}
