pub mod config;
pub mod database;
pub mod docs;
pub mod engine;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod store;
pub mod utils;

use actix_web::web;

pub use database::Database;

/// Mounts every route of the API.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(handlers::health::configure)
        .configure(handlers::auth_config)
        .configure(handlers::task_config)
        .configure(handlers::shift_config)
        .configure(handlers::leave_config);
}
