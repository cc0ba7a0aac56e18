//! Service façades over the repository.
//!
//! Each service fixes the page size of its entity, derives slugs, validates
//! payloads and assembles related records. No authorization happens here; the
//! handlers consult `policy` before calling in.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Answer, AnswerChanges, Category, CategoryRequest, CreateAnswerRequest,
        CreateQuestionRequest, NewAnswer, NewQuestion, NewUser, Question, QuestionChanges,
        QuestionDetails, SluggedTitle, Tag, TagRequest, UpdateAnswerRequest,
        UpdateQuestionRequest, User, CATEGORY_TITLE_MAX, TAG_TITLE_MAX,
    },
    pagination::{
        ANSWERS_PER_PAGE, CATEGORIES_PER_PAGE, Page, PageRequest, QUESTIONS_PER_PAGE,
        TAGS_PER_PAGE, USERS_PER_PAGE,
    },
    policy::{Role, RoleSet},
    repository::RepositoryState,
    slug::slugify,
};

/// Stored text is the trimmed text, the same string `validate` measured.
fn trimmed(value: String) -> String {
    value.trim().to_string()
}

fn trimmed_opt(value: Option<String>) -> Option<String> {
    value.map(trimmed)
}

fn slugged(title: &str, max_len: usize) -> AppResult<SluggedTitle> {
    let title = title.trim().to_string();
    let slug = slugify(&title, max_len);
    if slug.is_empty() {
        return Err(AppError::validation(
            "title must contain at least one letter or digit",
        ));
    }
    Ok(SluggedTitle { title, slug })
}

/// QuestionService
#[derive(Clone)]
pub struct QuestionService {
    repo: RepositoryState,
}

impl QuestionService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn paginated_list(&self, page: u32) -> AppResult<Page<QuestionDetails>> {
        let page = self
            .repo
            .list_questions(PageRequest::new(page, QUESTIONS_PER_PAGE))
            .await?;
        self.with_details(page).await
    }

    pub async fn paginated_by_category(
        &self,
        category: &Category,
        page: u32,
    ) -> AppResult<Page<QuestionDetails>> {
        let page = self
            .repo
            .list_questions_by_category(category.id, PageRequest::new(page, QUESTIONS_PER_PAGE))
            .await?;
        self.with_details(page).await
    }

    pub async fn paginated_by_tag(&self, tag: &Tag, page: u32) -> AppResult<Page<QuestionDetails>> {
        let page = self
            .repo
            .list_questions_by_tag(tag.id, PageRequest::new(page, QUESTIONS_PER_PAGE))
            .await?;
        self.with_details(page).await
    }

    /// Loads a question or fails with `NotFound`.
    pub async fn find(&self, id: i64) -> AppResult<Question> {
        self.repo
            .get_question(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("question {id}")))
    }

    pub async fn details(&self, question: Question) -> AppResult<QuestionDetails> {
        let category = self
            .repo
            .get_category(question.category_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("category {}", question.category_id)))?;
        let tags = self.repo.question_tags(question.id).await?;
        Ok(QuestionDetails {
            question,
            category,
            tags,
        })
    }

    pub async fn create(
        &self,
        req: CreateQuestionRequest,
        author_id: Option<Uuid>,
    ) -> AppResult<QuestionDetails> {
        req.validate()?;
        self.require_category(req.category_id).await?;
        let tags = TagService::new(self.repo.clone())
            .find_or_create(&req.tags)
            .await?;

        let question = self
            .repo
            .create_question(NewQuestion {
                title: trimmed(req.title),
                body: trimmed(req.body),
                category_id: req.category_id,
                image: trimmed_opt(req.image),
                author_id,
            })
            .await?;
        let tag_ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
        self.repo.set_question_tags(question.id, &tag_ids).await?;

        tracing::info!(question_id = question.id, "question created");
        self.details(question).await
    }

    pub async fn update(&self, id: i64, req: UpdateQuestionRequest) -> AppResult<QuestionDetails> {
        req.validate()?;
        if let Some(category_id) = req.category_id {
            self.require_category(category_id).await?;
        }

        let changes = QuestionChanges {
            title: trimmed_opt(req.title),
            body: trimmed_opt(req.body),
            category_id: req.category_id,
            image: trimmed_opt(req.image),
        };
        let question = self
            .repo
            .update_question(id, changes)
            .await?
            .ok_or_else(|| AppError::not_found(format!("question {id}")))?;

        if let Some(titles) = req.tags {
            let tags = TagService::new(self.repo.clone())
                .find_or_create(&titles)
                .await?;
            let tag_ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
            self.repo.set_question_tags(question.id, &tag_ids).await?;
        }

        tracing::info!(question_id = id, "question updated");
        self.details(question).await
    }

    /// Removes the question; its answers go with it.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.repo.delete_question(id).await? {
            return Err(AppError::not_found(format!("question {id}")));
        }
        tracing::info!(question_id = id, "question deleted");
        Ok(())
    }

    async fn require_category(&self, category_id: i64) -> AppResult<()> {
        match self.repo.get_category(category_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::validation(format!(
                "category {category_id} does not exist"
            ))),
        }
    }

    async fn with_details(&self, page: Page<Question>) -> AppResult<Page<QuestionDetails>> {
        let Page {
            items,
            page,
            per_page,
            total,
            total_pages,
        } = page;
        let mut details = Vec::with_capacity(items.len());
        for question in items {
            details.push(self.details(question).await?);
        }
        Ok(Page {
            items: details,
            page,
            per_page,
            total,
            total_pages,
        })
    }
}

/// AnswerService
#[derive(Clone)]
pub struct AnswerService {
    repo: RepositoryState,
}

impl AnswerService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// Answers of `question`, oldest first, ten per page.
    pub async fn paginated_list(&self, question: &Question, page: u32) -> AppResult<Page<Answer>> {
        self.repo
            .list_answers(question.id, PageRequest::new(page, ANSWERS_PER_PAGE))
            .await
    }

    pub async fn find(&self, id: i64) -> AppResult<Answer> {
        self.repo
            .get_answer(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("answer {id}")))
    }

    pub async fn create(
        &self,
        question: &Question,
        req: CreateAnswerRequest,
        author_id: Option<Uuid>,
    ) -> AppResult<Answer> {
        req.validate()?;
        let answer = self
            .repo
            .create_answer(NewAnswer {
                question_id: question.id,
                body: trimmed(req.body),
                image: trimmed_opt(req.image),
                author_id,
            })
            .await?;
        tracing::info!(answer_id = answer.id, question_id = question.id, "answer created");
        Ok(answer)
    }

    pub async fn update(&self, id: i64, req: UpdateAnswerRequest) -> AppResult<Answer> {
        req.validate()?;
        self.repo
            .update_answer(
                id,
                AnswerChanges {
                    body: trimmed_opt(req.body),
                    image: trimmed_opt(req.image),
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found(format!("answer {id}")))
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.repo.delete_answer(id).await? {
            return Err(AppError::not_found(format!("answer {id}")));
        }
        tracing::info!(answer_id = id, "answer deleted");
        Ok(())
    }

    /// Marks the answer as best. Other answers of the question keep their flag.
    pub async fn award(&self, id: i64) -> AppResult<Answer> {
        self.set_best(id, true).await
    }

    pub async fn deaward(&self, id: i64) -> AppResult<Answer> {
        self.set_best(id, false).await
    }

    async fn set_best(&self, id: i64, best: bool) -> AppResult<Answer> {
        let answer = self
            .repo
            .set_best_answer(id, best)
            .await?
            .ok_or_else(|| AppError::not_found(format!("answer {id}")))?;
        tracing::info!(answer_id = id, best, "best answer flag changed");
        Ok(answer)
    }
}

/// CategoryService
#[derive(Clone)]
pub struct CategoryService {
    repo: RepositoryState,
}

impl CategoryService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn paginated_list(&self, page: u32) -> AppResult<Page<Category>> {
        self.repo
            .list_categories(PageRequest::new(page, CATEGORIES_PER_PAGE))
            .await
    }

    pub async fn find(&self, id: i64) -> AppResult<Category> {
        self.repo
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("category {id}")))
    }

    pub async fn create(&self, req: CategoryRequest) -> AppResult<Category> {
        req.validate()?;
        let category = self
            .repo
            .create_category(slugged(&req.title, CATEGORY_TITLE_MAX)?)
            .await?;
        tracing::info!(category_id = category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    pub async fn update(&self, id: i64, req: CategoryRequest) -> AppResult<Category> {
        req.validate()?;
        self.repo
            .update_category(id, slugged(&req.title, CATEGORY_TITLE_MAX)?)
            .await?
            .ok_or_else(|| AppError::not_found(format!("category {id}")))
    }

    /// Fails with `Conflict` while questions still use the category.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.repo.delete_category(id).await? {
            return Err(AppError::not_found(format!("category {id}")));
        }
        tracing::info!(category_id = id, "category deleted");
        Ok(())
    }
}

/// TagService
#[derive(Clone)]
pub struct TagService {
    repo: RepositoryState,
}

impl TagService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn paginated_list(&self, page: u32) -> AppResult<Page<Tag>> {
        self.repo
            .list_tags(PageRequest::new(page, TAGS_PER_PAGE))
            .await
    }

    pub async fn find(&self, id: i64) -> AppResult<Tag> {
        self.repo
            .get_tag(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("tag {id}")))
    }

    /// Slugs are unique by convention: creating a tag whose slug already exists
    /// is a `Conflict`.
    pub async fn create(&self, req: TagRequest) -> AppResult<Tag> {
        req.validate()?;
        let draft = slugged(&req.title, TAG_TITLE_MAX)?;
        if self.repo.find_tag_by_slug(&draft.slug).await?.is_some() {
            return Err(AppError::Conflict(format!("tag '{}' already exists", draft.slug)));
        }
        let tag = self.repo.create_tag(draft).await?;
        tracing::info!(tag_id = tag.id, slug = %tag.slug, "tag created");
        Ok(tag)
    }

    pub async fn update(&self, id: i64, req: TagRequest) -> AppResult<Tag> {
        req.validate()?;
        let draft = slugged(&req.title, TAG_TITLE_MAX)?;
        if let Some(existing) = self.repo.find_tag_by_slug(&draft.slug).await? {
            if existing.id != id {
                return Err(AppError::Conflict(format!("tag '{}' already exists", draft.slug)));
            }
        }
        self.repo
            .update_tag(id, draft)
            .await?
            .ok_or_else(|| AppError::not_found(format!("tag {id}")))
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.repo.delete_tag(id).await? {
            return Err(AppError::not_found(format!("tag {id}")));
        }
        tracing::info!(tag_id = id, "tag deleted");
        Ok(())
    }

    /// Resolves tag titles to tags, reusing existing slugs and creating the
    /// rest. Titles that collapse to the same slug yield one tag.
    pub async fn find_or_create(&self, titles: &[String]) -> AppResult<Vec<Tag>> {
        let mut tags: Vec<Tag> = Vec::with_capacity(titles.len());
        for title in titles {
            let draft = slugged(title, TAG_TITLE_MAX)?;
            if tags.iter().any(|t| t.slug == draft.slug) {
                continue;
            }
            let tag = match self.repo.find_tag_by_slug(&draft.slug).await? {
                Some(existing) => existing,
                None => self.repo.create_tag(draft).await?,
            };
            tags.push(tag);
        }
        Ok(tags)
    }
}

/// UserService
#[derive(Clone)]
pub struct UserService {
    repo: RepositoryState,
}

impl UserService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// Users, eight per page.
    pub async fn paginated_list(&self, page: u32) -> AppResult<Page<User>> {
        self.repo
            .list_users(PageRequest::new(page, USERS_PER_PAGE))
            .await
    }

    pub async fn find(&self, id: Uuid) -> AppResult<User> {
        self.repo
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {id}")))
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.repo.find_user_by_email(email.trim()).await
    }

    /// Stores a new account holding only `ROLE_USER`.
    pub async fn register(
        &self,
        email: &str,
        nickname: &str,
        password_hash: String,
    ) -> AppResult<User> {
        if self.find_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("email is already registered".to_string()));
        }
        let user = self
            .repo
            .create_user(NewUser {
                email: email.trim().to_string(),
                nickname: nickname.trim().to_string(),
                password_hash,
                roles: RoleSet::default().to_names(),
            })
            .await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn set_roles(&self, id: Uuid, roles: Vec<Role>) -> AppResult<User> {
        let names = RoleSet::from_roles(roles).to_names();
        let user = self
            .repo
            .set_user_roles(id, names)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {id}")))?;
        tracing::info!(user_id = %id, roles = ?user.roles, "user roles changed");
        Ok(user)
    }

    /// Removes the user and everything they authored.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.repo.delete_user(id).await? {
            return Err(AppError::not_found(format!("user {id}")));
        }
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }
}
