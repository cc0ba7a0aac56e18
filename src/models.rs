use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::policy::{Role, RoleSet};

pub const TAG_TITLE_MIN: usize = 3;
pub const TAG_TITLE_MAX: usize = 32;
pub const CATEGORY_TITLE_MIN: usize = 3;
pub const CATEGORY_TITLE_MAX: usize = 64;
pub const QUESTION_TITLE_MIN: usize = 3;
pub const QUESTION_TITLE_MAX: usize = 255;
pub const BODY_MAX: usize = 5000;
pub const IMAGE_KEY_MAX: usize = 100;
pub const EMAIL_MAX: usize = 180;
pub const NICKNAME_MIN: usize = 3;
pub const NICKNAME_MAX: usize = 64;
pub const PASSWORD_MIN: usize = 6;

// --- Core Records (Mapped to Database) ---

/// User
///
/// Row of the `users` table. The password hash never leaves the server; API
/// responses use `UserProfile`.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    /// Raw role names as stored (`ROLE_USER`, `ROLE_ADMIN`).
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role_set(&self) -> RoleSet {
        RoleSet::from_names(&self.roles)
    }
}

/// Category
///
/// Row of the `categories` table. Every question belongs to exactly one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub slug: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Tag
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Tag {
    pub id: i64,
    pub title: String,
    pub slug: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Question
///
/// Row of the `questions` table. `author_id` is `None` for anonymous questions
/// (and ownership checks on them always fail).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Question {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub category_id: i64,
    /// Key of an already uploaded image, if any.
    pub image: Option<String>,
    pub author_id: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Answer
///
/// Row of the `answers` table. Removed together with its question.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub body: String,
    pub image: Option<String>,
    pub author_id: Option<Uuid>,
    /// Set by the question's author. Several answers may carry it at once.
    pub best_answer: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Response Schemas ---

/// QuestionDetails
///
/// A question together with its category and tags, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionDetails {
    #[serde(flatten)]
    pub question: Question,
    pub category: Category,
    pub tags: Vec<Tag>,
}

/// UserProfile
///
/// Public view of a user (GET /me, admin user listing).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub roles: Vec<Role>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let roles = user.role_set().roles();
        UserProfile {
            id: user.id,
            email: user.email,
            nickname: user.nickname,
            roles,
            created_at: user.created_at,
        }
    }
}

/// TokenResponse
///
/// Issued by POST /login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub email: String,
    pub nickname: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// CreateQuestionRequest
///
/// `tags` are titles; unknown ones are created, known slugs are reused.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateQuestionRequest {
    pub title: String,
    pub body: String,
    pub category_id: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// UpdateQuestionRequest
///
/// Partial update; `None` leaves the field untouched. `tags: Some(vec![])`
/// clears all tags.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateQuestionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateAnswerRequest {
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAnswerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// CategoryRequest
///
/// Used for both creation and rename; the slug is derived from `title`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TagRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateRolesRequest {
    pub roles: Vec<Role>,
}

// --- Repository Inputs ---

/// NewUser
///
/// A user ready for insertion; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub title: String,
    pub body: String,
    pub category_id: i64,
    pub image: Option<String>,
    pub author_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionChanges {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub question_id: i64,
    pub body: String,
    pub image: Option<String>,
    pub author_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct AnswerChanges {
    pub body: Option<String>,
    pub image: Option<String>,
}

/// A title with its derived slug, used for categories and tags alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SluggedTitle {
    pub title: String,
    pub slug: String,
}

// --- Validation ---

fn check_length(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(AppError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

fn check_image(image: Option<&String>) -> AppResult<()> {
    match image {
        Some(key) => check_length("image", key, 1, IMAGE_KEY_MAX),
        None => Ok(()),
    }
}

fn check_email(email: &str) -> AppResult<()> {
    let email = email.trim();
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !well_formed || email.chars().count() > EMAIL_MAX || email.contains(char::is_whitespace) {
        return Err(AppError::validation("email is not a valid address"));
    }
    Ok(())
}

impl RegisterUserRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_email(&self.email)?;
        check_length("nickname", &self.nickname, NICKNAME_MIN, NICKNAME_MAX)?;
        if self.password.chars().count() < PASSWORD_MIN {
            return Err(AppError::validation(format!(
                "password must be at least {PASSWORD_MIN} characters"
            )));
        }
        Ok(())
    }
}

impl CreateQuestionRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_length("title", &self.title, QUESTION_TITLE_MIN, QUESTION_TITLE_MAX)?;
        check_length("body", &self.body, 1, BODY_MAX)?;
        check_image(self.image.as_ref())?;
        for tag in &self.tags {
            check_length("tag", tag, TAG_TITLE_MIN, TAG_TITLE_MAX)?;
        }
        Ok(())
    }
}

impl UpdateQuestionRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            check_length("title", title, QUESTION_TITLE_MIN, QUESTION_TITLE_MAX)?;
        }
        if let Some(body) = &self.body {
            check_length("body", body, 1, BODY_MAX)?;
        }
        check_image(self.image.as_ref())?;
        for tag in self.tags.iter().flatten() {
            check_length("tag", tag, TAG_TITLE_MIN, TAG_TITLE_MAX)?;
        }
        Ok(())
    }
}

impl CreateAnswerRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_length("body", &self.body, 1, BODY_MAX)?;
        check_image(self.image.as_ref())
    }
}

impl UpdateAnswerRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(body) = &self.body {
            check_length("body", body, 1, BODY_MAX)?;
        }
        check_image(self.image.as_ref())
    }
}

impl CategoryRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_length("title", &self.title, CATEGORY_TITLE_MIN, CATEGORY_TITLE_MAX)
    }
}

impl TagRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_length("title", &self.title, TAG_TITLE_MIN, TAG_TITLE_MAX)
    }
}
