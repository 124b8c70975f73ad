pub mod audit;
pub mod auth;
pub mod leave;
pub mod price;
pub mod shift;
pub mod task;
