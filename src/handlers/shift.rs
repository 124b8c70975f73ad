use actix_web::{web, HttpResponse, Result};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::Utc;

use crate::config::AppConfig;
use crate::engine::Engine;
use crate::handlers::auth::actor;
use crate::models::auth::{ApiResponse, ErrorResponse};
use crate::models::shift::{
    CurrentShift, ExpectedQuery, ExpectedWindow, SaveScheduleRequest, ScheduleSaved, ShiftRecord, StaffQuery,
    ToggleAction, ToggleShiftRequest,
};
use crate::utils::errors::ServiceError;

/// Clock in or out
#[utoipa::path(
    post,
    path = "/api/shifts/toggle",
    tag = "shifts",
    request_body = ToggleShiftRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Shift record updated", body = ApiResponse<ShiftRecord>),
        (status = 409, description = "Shift already active, or none to end", body = ErrorResponse)
    )
)]
pub async fn toggle_shift(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    body: web::Json<ToggleShiftRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/shifts/toggle - {:?}", body.action);

    let actor = actor(&auth, &config)?;
    let record = engine.shifts.toggle(&actor, body.action).await?;

    let message = match body.action {
        ToggleAction::Start => "Shift started",
        ToggleAction::End => "Shift ended",
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(message, record)))
}

/// Active shift and today's expected window
#[utoipa::path(
    get,
    path = "/api/shifts/current",
    tag = "shifts",
    params(StaffQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current shift state", body = ApiResponse<CurrentShift>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    )
)]
pub async fn current_shift(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    query: web::Query<StaffQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/shifts/current - staff={:?}", query.staff);

    let actor = actor(&auth, &config)?;
    let current = engine
        .shifts
        .current(&actor, query.staff.unwrap_or(actor.id))
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully retrieved current shift", current)))
}

/// Expected working window for a day, leave included
#[utoipa::path(
    get,
    path = "/api/shifts/expected",
    tag = "shifts",
    params(ExpectedQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Expected window", body = ApiResponse<ExpectedWindow>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    )
)]
pub async fn expected_window(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    query: web::Query<ExpectedQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/shifts/expected - staff={:?} date={:?}", query.staff, query.date);

    let actor = actor(&auth, &config)?;
    let date = query.date.unwrap_or_else(|| engine.shifts.local_date(Utc::now()));
    let window = engine
        .shifts
        .expected_window(&actor, query.staff.unwrap_or(actor.id), date)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully retrieved expected window", window)))
}

/// Save a fixed or rotating schedule
#[utoipa::path(
    put,
    path = "/api/shifts/schedule/{staff}",
    tag = "shifts",
    params(
        ("staff" = i32, Path, description = "Staff ID")
    ),
    request_body = SaveScheduleRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Schedule saved, with advisory warnings", body = ApiResponse<ScheduleSaved>),
        (status = 400, description = "Invalid schedule", body = ErrorResponse),
        (status = 403, description = "Caller does not manage this staff member", body = ErrorResponse)
    )
)]
pub async fn save_schedule(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    body: web::Json<SaveScheduleRequest>,
) -> Result<HttpResponse, ServiceError> {
    let staff_id = path.into_inner();
    log::info!("PUT /api/shifts/schedule/{}", staff_id);

    let actor = actor(&auth, &config)?;
    let saved = engine
        .shifts
        .save_schedule(&actor, staff_id, body.into_inner().schedule)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Schedule saved", saved)))
}

pub fn shift_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/shifts")
            .route("/toggle", web::post().to(toggle_shift))
            .route("/current", web::get().to(current_shift))
            .route("/expected", web::get().to(expected_window))
            .route("/schedule/{staff}", web::put().to(save_schedule)),
    );
}
