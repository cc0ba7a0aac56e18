/// Router Module Index
///
/// Routes are split by the access they require. The split is enforced with
/// router layers in `create_router`; handlers still run the policy voters for
/// ownership and capability checks.

/// Open to everyone. Posting questions and answers is allowed anonymously.
pub mod public;

/// Behind the `AuthUser` middleware. Ownership is checked per handler.
pub mod authenticated;

/// Nested under `/admin`, authenticated, and gated on admin capabilities.
pub mod admin;
