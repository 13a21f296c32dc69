mod create_admin;
mod init;

pub use create_admin::{ADMIN_PASSWORD_ENV, cmd_create_admin};
pub use init::cmd_init_config;
