//! HTTP handlers, grouped by resource.
//!
//! Handlers are the enforcement point for the policy: they load the subject,
//! ask a voter, and turn a denial into `AppError::Forbidden` before any service
//! call mutates state.

pub mod account;
pub mod answers;
pub mod catalog;
pub mod questions;
pub mod users;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    policy::{Actor, Capability},
};

/// Turns a voter decision into a result, logging denials.
pub(crate) fn authorize(granted: bool, actor: &Actor, action: &str) -> AppResult<()> {
    if granted {
        return Ok(());
    }
    tracing::warn!(actor = ?actor.id(), action, "permission denied");
    Err(AppError::Forbidden)
}

/// Admin gate: the authenticated user must hold `capability`.
pub(crate) fn require_capability(user: &AuthUser, capability: Capability) -> AppResult<()> {
    let actor = user.actor();
    authorize(actor.can(capability), &actor, "admin")
}
