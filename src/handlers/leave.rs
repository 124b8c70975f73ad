use actix_web::{web, HttpResponse, Result};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use validator::Validate;

use crate::config::AppConfig;
use crate::engine::Engine;
use crate::handlers::auth::actor;
use crate::models::auth::{ApiResponse, ErrorResponse};
use crate::models::leave::{CreateLeaveRequest, LeaveQuery, LeaveRequest, LeaveRequested, ReviewLeaveRequest};
use crate::utils::errors::ServiceError;

/// File a leave request
#[utoipa::path(
    post,
    path = "/api/leave-requests",
    tag = "leave",
    request_body = CreateLeaveRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Leave request filed, with overlap warnings", body = ApiResponse<LeaveRequested>),
        (status = 400, description = "Validation error", body = ErrorResponse)
    )
)]
pub async fn create_leave_request(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    body: web::Json<CreateLeaveRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!(
        "POST /api/leave-requests - {} {} to {}",
        body.leave_type.as_str(),
        body.start,
        body.end
    );

    let actor = actor(&auth, &config)?;
    body.validate()?;
    let requested = engine.leaves.request(&actor, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(ApiResponse::success("Leave request filed", requested)))
}

/// List leave requests
#[utoipa::path(
    get,
    path = "/api/leave-requests",
    tag = "leave",
    params(LeaveQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Leave requests retrieved", body = ApiResponse<Vec<LeaveRequest>>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    )
)]
pub async fn list_leave_requests(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    query: web::Query<LeaveQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/leave-requests - staff={:?}", query.staff);

    let actor = actor(&auth, &config)?;
    let requests = engine.leaves.list(&actor, query.staff).await?;

    log::info!("Retrieved {} leave requests for staff {}", requests.len(), actor.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully retrieved leave requests", requests)))
}

/// Get a single leave request
#[utoipa::path(
    get,
    path = "/api/leave-requests/{id}",
    tag = "leave",
    params(
        ("id" = i32, Path, description = "Leave request ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Leave request retrieved", body = ApiResponse<LeaveRequest>),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Leave request not found", body = ErrorResponse)
    )
)]
pub async fn get_leave_request(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let leave_id = path.into_inner();
    log::info!("GET /api/leave-requests/{}", leave_id);

    let actor = actor(&auth, &config)?;
    let request = engine.leaves.get(&actor, leave_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully retrieved leave request", request)))
}

/// Approve or reject a pending leave request
#[utoipa::path(
    put,
    path = "/api/leave-requests/{id}",
    tag = "leave",
    params(
        ("id" = i32, Path, description = "Leave request ID")
    ),
    request_body = ReviewLeaveRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Leave request reviewed", body = ApiResponse<LeaveRequest>),
        (status = 400, description = "A rejection needs a message", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 409, description = "Request is no longer pending", body = ErrorResponse)
    )
)]
pub async fn review_leave_request(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    body: web::Json<ReviewLeaveRequest>,
) -> Result<HttpResponse, ServiceError> {
    let leave_id = path.into_inner();
    log::info!("PUT /api/leave-requests/{} - {:?}", leave_id, body.decision);

    let actor = actor(&auth, &config)?;
    body.validate()?;
    let reviewed = engine
        .leaves
        .review(&actor, leave_id, body.decision, &body.message)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Leave request reviewed", reviewed)))
}

/// Most recent unacknowledged rejection, if any
#[utoipa::path(
    get,
    path = "/api/leave-requests/notice",
    tag = "leave",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Outstanding rejection notice", body = ApiResponse<LeaveRequest>)
    )
)]
pub async fn rejection_notice(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/leave-requests/notice");

    let actor = actor(&auth, &config)?;
    let notice = engine.leaves.rejection_notice(&actor).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully retrieved notice", notice)))
}

/// Dismiss a rejection notice and every older one
#[utoipa::path(
    post,
    path = "/api/leave-requests/{id}/acknowledge",
    tag = "leave",
    params(
        ("id" = i32, Path, description = "Leave request ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Number of notices dismissed", body = ApiResponse<u64>),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 409, description = "Request was not rejected", body = ErrorResponse)
    )
)]
pub async fn acknowledge_rejection(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let leave_id = path.into_inner();
    log::info!("POST /api/leave-requests/{}/acknowledge", leave_id);

    let actor = actor(&auth, &config)?;
    let marked = engine.leaves.acknowledge(&actor, leave_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Notice acknowledged", marked)))
}

pub fn leave_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/leave-requests")
            .route("", web::get().to(list_leave_requests))
            .route("", web::post().to(create_leave_request))
            .route("/notice", web::get().to(rejection_notice))
            .route("/{id}", web::get().to(get_leave_request))
            .route("/{id}", web::put().to(review_leave_request))
            .route("/{id}/acknowledge", web::post().to(acknowledge_rejection)),
    );
}
