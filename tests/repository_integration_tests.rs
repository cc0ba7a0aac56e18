//! Runs the `Repository` contract against a live Postgres.
//!
//! `cargo test -- --ignored` with `DATABASE_URL` pointing at a scratch database.

use qna_portal::{
    AppError,
    models::{NewAnswer, NewQuestion, NewUser, QuestionChanges, SluggedTitle, User},
    pagination::PageRequest,
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Unique suffix so tests can share one database.
fn unique(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..12])
}

fn slugged(prefix: &str) -> SluggedTitle {
    let slug = unique(prefix);
    SluggedTitle {
        title: slug.clone(),
        slug,
    }
}

async fn create_test_user(repo: &PostgresRepository) -> User {
    repo.create_user(NewUser {
        email: format!("{}@test.com", unique("user")),
        nickname: "tester".to_string(),
        password_hash: "hash".to_string(),
        roles: vec!["ROLE_USER".to_string()],
    })
    .await
    .expect("Failed to create test user")
}

async fn create_test_question(
    repo: &PostgresRepository,
    category_id: i64,
    author_id: Option<Uuid>,
) -> i64 {
    repo.create_question(NewQuestion {
        title: "Integration question".to_string(),
        body: "Body".to_string(),
        category_id,
        image: None,
        author_id,
    })
    .await
    .expect("Failed to create test question")
    .id
}

// --- Tests ---

#[test]
#[ignore = "needs a Postgres database"]
async fn test_create_and_get_user() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let user = create_test_user(&repo).await;

    let fetched = repo.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(fetched.email, user.email);
    assert_eq!(fetched.roles, vec!["ROLE_USER"]);

    let by_email = repo
        .find_user_by_email(&user.email.to_uppercase())
        .await
        .unwrap();
    assert_eq!(by_email.map(|u| u.id), Some(user.id));
}

#[test]
#[ignore = "needs a Postgres database"]
async fn test_duplicate_email_is_conflict() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;

    let result = repo
        .create_user(NewUser {
            email: user.email.clone(),
            nickname: "again".to_string(),
            password_hash: "hash".to_string(),
            roles: vec![],
        })
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[test]
#[ignore = "needs a Postgres database"]
async fn test_question_crud_and_cascade() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;
    let category = repo.create_category(slugged("cat")).await.unwrap();
    let tag = repo.create_tag(slugged("tag")).await.unwrap();

    let question_id = create_test_question(&repo, category.id, Some(user.id)).await;
    repo.set_question_tags(question_id, &[tag.id]).await.unwrap();
    let answer = repo
        .create_answer(NewAnswer {
            question_id,
            body: "Answer".to_string(),
            image: None,
            author_id: None,
        })
        .await
        .unwrap();

    let updated = repo
        .update_question(
            question_id,
            QuestionChanges {
                title: Some("Renamed".to_string()),
                ..QuestionChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.body, "Body");

    let tagged = repo
        .list_questions_by_tag(tag.id, PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(tagged.total, 1);

    assert!(repo.delete_question(question_id).await.unwrap());
    assert!(repo.get_answer(answer.id).await.unwrap().is_none());
    assert!(repo.question_tags(question_id).await.unwrap().is_empty());
}

#[test]
#[ignore = "needs a Postgres database"]
async fn test_category_in_use_is_conflict() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let category = repo.create_category(slugged("busy")).await.unwrap();
    create_test_question(&repo, category.id, None).await;

    let result = repo.delete_category(category.id).await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[test]
#[ignore = "needs a Postgres database"]
async fn test_delete_user_cascades_to_content() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;
    let category = repo.create_category(slugged("gone")).await.unwrap();
    let question_id = create_test_question(&repo, category.id, Some(user.id)).await;

    assert!(repo.delete_user(user.id).await.unwrap());

    assert!(repo.get_question(question_id).await.unwrap().is_none());
}

#[test]
#[ignore = "needs a Postgres database"]
async fn test_category_listing_pages() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let category = repo.create_category(slugged("paged")).await.unwrap();
    for _ in 0..3 {
        create_test_question(&repo, category.id, None).await;
    }

    let first = repo
        .list_questions_by_category(category.id, PageRequest::new(1, 2))
        .await
        .unwrap();
    let beyond = repo
        .list_questions_by_category(category.id, PageRequest::new(5, 2))
        .await
        .unwrap();

    assert_eq!(first.total, 3);
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.total_pages, 2);
    assert!(beyond.items.is_empty());
    // Newest first.
    assert!(first.items[0].id > first.items[1].id);
}

#[test]
#[ignore = "needs a Postgres database"]
async fn test_best_answer_toggle() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let category = repo.create_category(slugged("best")).await.unwrap();
    let question_id = create_test_question(&repo, category.id, None).await;
    let answer = repo
        .create_answer(NewAnswer {
            question_id,
            body: "Answer".to_string(),
            image: None,
            author_id: None,
        })
        .await
        .unwrap();
    assert!(!answer.best_answer);

    let awarded = repo.set_best_answer(answer.id, true).await.unwrap().unwrap();
    assert!(awarded.best_answer);
}
