pub use super::auth_tokens::Entity as AuthTokens;
pub use super::decisions::Entity as Decisions;
pub use super::evaluations::Entity as Evaluations;
pub use super::users::Entity as Users;
