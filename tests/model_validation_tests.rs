use chrono::Utc;
use qna_portal::{
    AppError,
    models::{
        Answer, Category, CategoryRequest, CreateAnswerRequest, CreateQuestionRequest, Question,
        QuestionDetails, RegisterUserRequest, TagRequest, UpdateQuestionRequest, User, UserProfile,
    },
    policy::Role,
    slug::slugify,
};
use uuid::Uuid;

fn question_request(title: &str, body: &str) -> CreateQuestionRequest {
    CreateQuestionRequest {
        title: title.to_string(),
        body: body.to_string(),
        category_id: 1,
        ..CreateQuestionRequest::default()
    }
}

// --- Validation ---

#[test]
fn test_question_title_bounds() {
    assert!(question_request("Why?", "Body").validate().is_ok());
    assert!(matches!(
        question_request("Hi", "Body").validate(),
        Err(AppError::Validation(_))
    ));
    assert!(question_request(&"x".repeat(256), "Body").validate().is_err());
    assert!(question_request(&"x".repeat(255), "Body").validate().is_ok());
}

#[test]
fn test_question_body_bounds() {
    assert!(question_request("Title", "").validate().is_err());
    assert!(question_request("Title", "   ").validate().is_err());
    assert!(question_request("Title", &"b".repeat(5001)).validate().is_err());
}

#[test]
fn test_question_tags_and_image_are_checked() {
    let mut request = question_request("Title", "Body");
    request.tags = vec!["ok-tag".to_string(), "no".to_string()];
    assert!(request.validate().is_err());

    let mut request = question_request("Title", "Body");
    request.image = Some("i".repeat(101));
    assert!(request.validate().is_err());
}

#[test]
fn test_partial_question_update_checks_only_present_fields() {
    assert!(UpdateQuestionRequest::default().validate().is_ok());

    let request = UpdateQuestionRequest {
        title: Some("No".to_string()),
        ..UpdateQuestionRequest::default()
    };
    assert!(request.validate().is_err());
}

#[test]
fn test_answer_body_required() {
    let request = CreateAnswerRequest {
        body: String::new(),
        image: None,
    };
    assert!(request.validate().is_err());
}

#[test]
fn test_catalog_title_bounds() {
    assert!(TagRequest { title: "io".into() }.validate().is_err());
    assert!(TagRequest { title: "x".repeat(33) }.validate().is_err());
    assert!(CategoryRequest { title: "Web".into() }.validate().is_ok());
    assert!(CategoryRequest { title: "x".repeat(65) }.validate().is_err());
}

#[test]
fn test_registration_checks_email_nickname_password() {
    let valid = RegisterUserRequest {
        email: "dev@example.com".to_string(),
        nickname: "dev".to_string(),
        password: "secret".to_string(),
    };
    assert!(valid.validate().is_ok());

    for email in ["plain", "@example.com", "dev@", "dev@localhost", "a b@example.com"] {
        let request = RegisterUserRequest {
            email: email.to_string(),
            ..valid.clone()
        };
        assert!(request.validate().is_err(), "{email} should be rejected");
    }

    let short_password = RegisterUserRequest {
        password: "12345".to_string(),
        ..valid.clone()
    };
    assert!(short_password.validate().is_err());
}

// --- Slugs ---

#[test]
fn test_slugify_examples() {
    assert_eq!(slugify("Hello, World!", 64), "hello-world");
    assert_eq!(slugify("  C++ & Rust  ", 64), "c-plus-plus-rust");
    assert_eq!(slugify("Programowanie współbieżne", 64), "programowanie-wspolbiezne");
    assert_eq!(slugify("***", 64), "");
}

// --- Serialization ---

#[test]
fn test_question_details_flattens_question_fields() {
    let details = QuestionDetails {
        question: Question {
            id: 7,
            title: "Flattened".to_string(),
            body: "Body".to_string(),
            category_id: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            ..Question::default()
        },
        category: Category {
            id: 3,
            title: "Web".to_string(),
            slug: "web".to_string(),
            ..Category::default()
        },
        tags: vec![],
    };

    let json = serde_json::to_value(&details).unwrap();

    assert_eq!(json["id"], 7);
    assert_eq!(json["title"], "Flattened");
    assert_eq!(json["category"]["slug"], "web");
    assert!(json["author_id"].is_null());
    assert!(json.get("question").is_none());
}

#[test]
fn test_answer_serializes_best_answer_flag() {
    let answer = Answer {
        id: 1,
        question_id: 2,
        body: "Yes".to_string(),
        best_answer: true,
        ..Answer::default()
    };

    let json = serde_json::to_value(&answer).unwrap();
    assert_eq!(json["best_answer"], true);
}

#[test]
fn test_user_profile_hides_password_hash() {
    let user = User {
        id: Uuid::new_v4(),
        email: "dev@example.com".to_string(),
        nickname: "dev".to_string(),
        password_hash: "$2b$04$secret".to_string(),
        roles: vec!["ROLE_ADMIN".to_string()],
        ..User::default()
    };

    let profile = UserProfile::from(user);
    let json = serde_json::to_string(&profile).unwrap();

    assert!(!json.contains("password"));
    assert!(!json.contains("$2b$"));
    assert_eq!(profile.roles, vec![Role::User, Role::Admin]);
}
