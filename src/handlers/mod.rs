pub mod auth;
pub mod health;
pub mod leave;
pub mod shift;
pub mod task;

pub use auth::auth_config;
pub use leave::leave_config;
pub use shift::shift_config;
pub use task::task_config;
