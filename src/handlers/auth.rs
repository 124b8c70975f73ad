use actix_web::{web, HttpResponse, Result};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::config::AppConfig;
use crate::engine::Engine;
use crate::models::auth::{Actor, ApiResponse, Claims, CurrentUser};
use crate::utils::errors::ServiceError;

/// Resolves the `(id, role, branch)` tuple carried by a bearer token.
pub fn actor_from_token(token: &str, config: &AppConfig) -> Result<Actor, ServiceError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )?
    .claims;

    let id: i32 = claims
        .sub
        .parse()
        .map_err(|_| ServiceError::Unauthorized("Invalid staff ID in token".to_string()))?;

    Ok(Actor::new(id, claims.role, claims.branch_id))
}

pub(crate) fn actor(auth: &BearerAuth, config: &AppConfig) -> Result<Actor, ServiceError> {
    actor_from_token(auth.token(), config)
}

/// Get the identity behind the current token
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Identity resolved", body = ApiResponse<CurrentUser>),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn get_me(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/auth/me");

    let actor = actor(&auth, &config)?;
    let staff = engine
        .staff
        .find_staff(actor.id)
        .await?
        .ok_or_else(|| {
            log::warn!("Staff not found for ID: {}", actor.id);
            ServiceError::Unauthorized("Staff member not found".to_string())
        })?;

    log::info!("Identity resolved for staff {} ({})", staff.id, actor.role.as_str());
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Successfully retrieved staff data",
        CurrentUser { actor, staff },
    )))
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/auth").route("/me", web::get().to(get_me)));
}
