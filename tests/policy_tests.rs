use qna_portal::{
    models::{Answer, Question},
    policy::{
        Actor, Capability, Permission, Role, RoleSet, can_award, can_delete_answer,
        vote_on_answer, vote_on_question,
    },
};
use uuid::Uuid;

// --- Fixtures ---

const ASKER: Uuid = Uuid::from_u128(1);
const ANSWERER: Uuid = Uuid::from_u128(2);
const STRANGER: Uuid = Uuid::from_u128(3);
const MODERATOR: Uuid = Uuid::from_u128(4);

fn user(id: Uuid) -> Actor {
    Actor::user(id, RoleSet::default())
}

fn admin(id: Uuid) -> Actor {
    Actor::user(id, RoleSet::from_roles([Role::Admin]))
}

fn question(author: Option<Uuid>) -> Question {
    Question {
        id: 10,
        title: "How do lifetimes work?".to_string(),
        body: "Asking for a friend.".to_string(),
        category_id: 1,
        author_id: author,
        ..Question::default()
    }
}

fn answer(author: Option<Uuid>) -> Answer {
    Answer {
        id: 20,
        question_id: 10,
        body: "They are regions.".to_string(),
        author_id: author,
        ..Answer::default()
    }
}

// --- Answer voter ---

#[test]
fn test_answer_author_can_edit_view_and_delete() {
    let q = question(Some(ASKER));
    let a = answer(Some(ANSWERER));
    let actor = user(ANSWERER);

    assert!(vote_on_answer(Permission::Edit, &a, &q, &actor));
    assert!(vote_on_answer(Permission::View, &a, &q, &actor));
    assert!(vote_on_answer(Permission::Delete, &a, &q, &actor));
}

#[test]
fn test_answer_author_cannot_award_own_answer_on_foreign_question() {
    let q = question(Some(ASKER));
    let a = answer(Some(ANSWERER));

    assert!(!vote_on_answer(Permission::Award, &a, &q, &user(ANSWERER)));
}

#[test]
fn test_question_author_can_award_but_not_edit_foreign_answer() {
    let q = question(Some(ASKER));
    let a = answer(Some(ANSWERER));
    let actor = user(ASKER);

    assert!(vote_on_answer(Permission::Award, &a, &q, &actor));
    assert!(!vote_on_answer(Permission::Edit, &a, &q, &actor));
    assert!(!vote_on_answer(Permission::View, &a, &q, &actor));
    assert!(!vote_on_answer(Permission::Delete, &a, &q, &actor));
}

#[test]
fn test_stranger_gets_nothing_on_answer() {
    let q = question(Some(ASKER));
    let a = answer(Some(ANSWERER));
    let actor = user(STRANGER);

    for permission in [
        Permission::Edit,
        Permission::View,
        Permission::Delete,
        Permission::Award,
    ] {
        assert!(!vote_on_answer(permission, &a, &q, &actor), "{permission:?}");
    }
}

#[test]
fn test_anonymous_is_always_denied_on_answers() {
    // Even a question without author must not match an anonymous actor.
    let q = question(None);
    let a = answer(None);

    for permission in [
        Permission::Edit,
        Permission::View,
        Permission::Delete,
        Permission::Award,
    ] {
        assert!(!vote_on_answer(permission, &a, &q, &Actor::Anonymous));
    }
}

#[test]
fn test_moderator_may_delete_any_answer_only() {
    let q = question(Some(ASKER));
    let a = answer(Some(ANSWERER));
    let actor = admin(MODERATOR);

    assert!(can_delete_answer(&a, &actor));
    assert!(vote_on_answer(Permission::Delete, &a, &q, &actor));
    assert!(!vote_on_answer(Permission::Edit, &a, &q, &actor));
    assert!(!vote_on_answer(Permission::Award, &a, &q, &actor));
}

#[test]
fn test_anonymous_answer_is_owned_by_nobody() {
    let q = question(Some(ASKER));
    let a = answer(None);

    assert!(!vote_on_answer(Permission::Edit, &a, &q, &user(ANSWERER)));
    assert!(!vote_on_answer(Permission::Delete, &a, &q, &user(ANSWERER)));
    // The asker can still award it.
    assert!(vote_on_answer(Permission::Award, &a, &q, &user(ASKER)));
}

// --- Question voter ---

#[test]
fn test_question_author_can_edit_and_delete() {
    let q = question(Some(ASKER));

    assert!(vote_on_question(Permission::Edit, &q, &user(ASKER)));
    assert!(vote_on_question(Permission::Delete, &q, &user(ASKER)));
}

#[test]
fn test_question_view_and_award_are_never_granted() {
    let q = question(Some(ASKER));

    assert!(!vote_on_question(Permission::View, &q, &user(ASKER)));
    assert!(!vote_on_question(Permission::Award, &q, &user(ASKER)));
    assert!(!vote_on_question(Permission::View, &q, &admin(MODERATOR)));
}

#[test]
fn test_question_admin_has_no_ownership_override() {
    let q = question(Some(ASKER));

    assert!(!vote_on_question(Permission::Edit, &q, &admin(MODERATOR)));
    assert!(!vote_on_question(Permission::Delete, &q, &admin(MODERATOR)));
}

#[test]
fn test_anonymous_question_cannot_be_edited_by_anyone() {
    let q = question(None);

    assert!(!vote_on_question(Permission::Edit, &q, &user(ASKER)));
    assert!(!vote_on_question(Permission::Edit, &q, &Actor::Anonymous));
    assert!(!can_award(&q, &user(ASKER)));
}

// --- Roles ---

#[test]
fn test_role_set_always_contains_user() {
    let roles = RoleSet::from_names(["ROLE_ADMIN"]);

    assert!(roles.contains(Role::User));
    assert!(roles.contains(Role::Admin));
    assert_eq!(roles.to_names(), vec!["ROLE_USER", "ROLE_ADMIN"]);
}

#[test]
fn test_role_set_ignores_unknown_names() {
    let roles = RoleSet::from_names(["ROLE_USER", "ROLE_SUPERHERO"]);

    assert_eq!(roles.roles(), vec![Role::User]);
}

#[test]
fn test_only_admin_grants_capabilities() {
    for capability in [
        Capability::DeleteAnyAnswer,
        Capability::ManageCatalog,
        Capability::ManageUsers,
    ] {
        assert!(Role::Admin.grants(capability));
        assert!(!Role::User.grants(capability));
        assert!(!Actor::Anonymous.can(capability));
    }
}

#[test]
fn test_role_serializes_as_symbolic_name() {
    let json = serde_json::to_string(&vec![Role::User, Role::Admin]).unwrap();
    assert_eq!(json, r#"["ROLE_USER","ROLE_ADMIN"]"#);

    let parsed: Role = serde_json::from_str(r#""ROLE_ADMIN""#).unwrap();
    assert_eq!(parsed, Role::Admin);
}
