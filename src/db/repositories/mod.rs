pub mod decision;
pub mod token;
pub mod user;
