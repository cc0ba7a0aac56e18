//! Permission voters for questions and answers.
//!
//! Every decision is a plain `bool`. Handlers turn a `false` into a 403; nothing
//! in here errors or panics on an ordinary denial.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Answer, Question};

/// Role
///
/// The persisted role names. Stored as text (`ROLE_USER`, `ROLE_ADMIN`) but only
/// ever compared through this enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema,
)]
#[ts(export)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
        }
    }

    pub fn parse(name: &str) -> Option<Role> {
        match name {
            "ROLE_USER" => Some(Role::User),
            "ROLE_ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Whether holding this role confers `capability`.
    pub fn grants(self, capability: Capability) -> bool {
        match (self, capability) {
            (Role::Admin, _) => true,
            (Role::User, _) => false,
        }
    }
}

/// Capability
///
/// Elevated privileges checked by the voters and the admin handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Remove answers regardless of authorship (moderation).
    DeleteAnyAnswer,
    /// Create, rename and delete categories and tags.
    ManageCatalog,
    /// List users, change their roles, delete them.
    ManageUsers,
}

/// RoleSet
///
/// The roles held by an identity. `ROLE_USER` is always present, unknown role
/// names coming from the store are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<Role>);

impl Default for RoleSet {
    fn default() -> Self {
        Self(BTreeSet::from([Role::User]))
    }
}

impl RoleSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = RoleSet::default();
        for name in names {
            match Role::parse(name.as_ref()) {
                Some(role) => {
                    set.0.insert(role);
                }
                None => tracing::warn!(role = name.as_ref(), "ignoring unknown role"),
            }
        }
        set
    }

    pub fn from_roles<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        let mut set = RoleSet::default();
        set.0.extend(roles);
        set
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn grants(&self, capability: Capability) -> bool {
        self.0.iter().any(|role| role.grants(capability))
    }

    pub fn roles(&self) -> Vec<Role> {
        self.0.iter().copied().collect()
    }

    pub fn to_names(&self) -> Vec<String> {
        self.0.iter().map(|r| r.as_str().to_string()).collect()
    }
}

/// Identity
///
/// An authenticated user as seen by the policy layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub roles: RoleSet,
}

/// Actor
///
/// Who is asking. `Anonymous` has no id to compare against, so every
/// ownership check on it fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(Identity),
}

impl Actor {
    pub fn user(id: Uuid, roles: RoleSet) -> Self {
        Actor::User(Identity { id, roles })
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Actor::Anonymous => None,
            Actor::User(identity) => Some(identity.id),
        }
    }

    /// True only when both the actor and `owner` are known and equal.
    pub fn owns(&self, owner: Option<Uuid>) -> bool {
        match (self.id(), owner) {
            (Some(actor), Some(owner)) => actor == owner,
            _ => false,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        match self {
            Actor::Anonymous => false,
            Actor::User(identity) => identity.roles.grants(capability),
        }
    }
}

/// Permission
///
/// The attributes a voter can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Edit,
    View,
    Delete,
    Award,
}

/// Owned
///
/// Entities carrying a nullable author.
pub trait Owned {
    fn author_id(&self) -> Option<Uuid>;
}

impl Owned for Question {
    fn author_id(&self) -> Option<Uuid> {
        self.author_id
    }
}

impl Owned for Answer {
    fn author_id(&self) -> Option<Uuid> {
        self.author_id
    }
}

/// Answer permissions. `question` must be the answer's parent; AWARD is
/// decided on it alone.
pub fn vote_on_answer(
    permission: Permission,
    answer: &Answer,
    question: &Question,
    actor: &Actor,
) -> bool {
    if matches!(actor, Actor::Anonymous) {
        return false;
    }
    match permission {
        Permission::Edit => can_edit_answer(answer, actor),
        Permission::View => can_view_answer(answer, actor),
        Permission::Delete => can_delete_answer(answer, actor),
        Permission::Award => can_award(question, actor),
    }
}

/// Question permissions. Only EDIT and DELETE are supported; anything else is denied.
pub fn vote_on_question(permission: Permission, question: &Question, actor: &Actor) -> bool {
    match permission {
        Permission::Edit | Permission::Delete => actor.owns(question.author_id()),
        Permission::View | Permission::Award => false,
    }
}

pub fn can_edit_answer(answer: &Answer, actor: &Actor) -> bool {
    actor.owns(answer.author_id())
}

pub fn can_view_answer(answer: &Answer, actor: &Actor) -> bool {
    actor.owns(answer.author_id())
}

pub fn can_delete_answer(answer: &Answer, actor: &Actor) -> bool {
    actor.owns(answer.author_id()) || actor.can(Capability::DeleteAnyAnswer)
}

/// Only the asker may mark (or unmark) a best answer.
pub fn can_award(question: &Question, actor: &Actor) -> bool {
    actor.owns(question.author_id())
}
