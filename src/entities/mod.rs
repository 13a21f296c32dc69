pub mod prelude;

pub mod auth_tokens;
pub mod decisions;
pub mod evaluations;
pub mod users;
