use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::models::auth::ApiResponse;
use crate::database::Database;

/// Service and database health
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running"),
        (status = 503, description = "Database unreachable")
    )
)]
pub async fn health_check(db: Option<web::Data<Database>>) -> Result<HttpResponse> {
    let Some(db) = db else {
        return Ok(HttpResponse::Ok().json(ApiResponse::success(
            "Field Operations API is running",
            json!({ "status": "ok", "database": "in-memory" }),
        )));
    };

    match db.health_check().await {
        Ok(_) => {
            let stats = match db.get_stats().await {
                Ok(stats) => Some(stats),
                Err(e) => {
                    log::warn!("Could not read database statistics: {}", e);
                    None
                }
            };

            Ok(HttpResponse::Ok().json(ApiResponse::success(
                "Field Operations API is running",
                json!({
                    "status": "ok",
                    "database": "connected",
                    "stats": stats
                })
            )))
        }
        Err(e) => {
            log::error!("Database health check failed: {}", e);
            Ok(HttpResponse::ServiceUnavailable().json(json!({
                "status": "error",
                "message": "Database connection failed"
            })))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
