use actix_web::{web, HttpResponse, Result};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use validator::Validate;

use crate::config::AppConfig;
use crate::engine::margin::{commit_row, is_low_margin, unit_price};
use crate::engine::Engine;
use crate::handlers::auth::actor;
use crate::models::auth::{ApiResponse, ErrorResponse};
use crate::models::price::{PriceRow, PriceRowView, UnitPrice, UnitPriceQuery};
use crate::models::task::{
    AssignTaskRequest, OverrideRequest, RejectTaskRequest, SubmitTaskRequest, Task, TaskQuery,
};
use crate::utils::errors::ServiceError;

/// List tasks visible to the caller
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "tasks",
    params(TaskQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Tasks retrieved successfully", body = ApiResponse<Vec<Task>>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_tasks(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    query: web::Query<TaskQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tasks - staff={:?} category={:?}", query.staff, query.category);

    let actor = actor(&auth, &config)?;
    let tasks = engine.tasks.list(&actor, &query).await?;

    log::info!("Retrieved {} tasks for staff {}", tasks.len(), actor.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully retrieved tasks", tasks)))
}

/// Get a single task
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = i32, Path, description = "Task ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Task retrieved successfully", body = ApiResponse<Task>),
        (status = 403, description = "Not visible to the caller", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    )
)]
pub async fn get_task(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("GET /api/tasks/{}", task_id);

    let actor = actor(&auth, &config)?;
    let task = engine.tasks.get(&actor, task_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Successfully retrieved task", task)))
}

/// Assign a new task to a staff member
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "tasks",
    request_body = AssignTaskRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Task assigned successfully", body = ApiResponse<Task>),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "Caller does not manage the assignee", body = ErrorResponse)
    )
)]
pub async fn assign_task(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    body: web::Json<AssignTaskRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/tasks - Assigning '{}' to staff {}", body.title, body.assigned_to);

    let actor = actor(&auth, &config)?;
    body.validate()?;
    let task = engine.tasks.assign(&actor, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(ApiResponse::success("Task assigned successfully", task)))
}

/// Start (or reopen after rejection) a task
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/start",
    tag = "tasks",
    params(
        ("id" = i32, Path, description = "Task ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Task started", body = ApiResponse<Task>),
        (status = 403, description = "Only the assignee may start a task", body = ErrorResponse),
        (status = 409, description = "Task is not startable", body = ErrorResponse)
    )
)]
pub async fn start_task(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("POST /api/tasks/{}/start", task_id);

    let actor = actor(&auth, &config)?;
    let task = engine.tasks.start(&actor, task_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Task started", task)))
}

/// Submit proof of completion
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/submit",
    tag = "tasks",
    params(
        ("id" = i32, Path, description = "Task ID")
    ),
    request_body = SubmitTaskRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Task submitted for review", body = ApiResponse<Task>),
        (status = 400, description = "Submission does not satisfy the category rules", body = ErrorResponse),
        (status = 403, description = "Only the assignee may submit", body = ErrorResponse),
        (status = 409, description = "Task is not open for submission", body = ErrorResponse)
    )
)]
pub async fn submit_task(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    body: web::Json<SubmitTaskRequest>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!(
        "POST /api/tasks/{}/submit - {} photo(s), {} price row(s)",
        task_id,
        body.photos.len(),
        body.price_rows.len()
    );

    let actor = actor(&auth, &config)?;
    let task = engine.tasks.submit(&actor, task_id, body.into_inner().into()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Task submitted for review", task)))
}

/// Approve a submitted task
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/approve",
    tag = "approvals",
    params(
        ("id" = i32, Path, description = "Task ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Task approved", body = ApiResponse<Task>),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 409, description = "Task is no longer awaiting review", body = ErrorResponse)
    )
)]
pub async fn approve_task(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("POST /api/tasks/{}/approve", task_id);

    let actor = actor(&auth, &config)?;
    let task = engine.approvals.approve(&actor, task_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Task approved", task)))
}

/// Reject a submitted task
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/reject",
    tag = "approvals",
    params(
        ("id" = i32, Path, description = "Task ID")
    ),
    request_body = RejectTaskRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Task rejected", body = ApiResponse<Task>),
        (status = 400, description = "Reason is required", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 409, description = "Task is no longer awaiting review", body = ErrorResponse)
    )
)]
pub async fn reject_task(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    body: web::Json<RejectTaskRequest>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("POST /api/tasks/{}/reject", task_id);

    let actor = actor(&auth, &config)?;
    body.validate()?;
    let task = engine
        .approvals
        .reject(&actor, task_id, body.into_inner().reason)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Task rejected", task)))
}

/// Supervisor override of the review outcome
#[utoipa::path(
    post,
    path = "/api/tasks/{id}/override",
    tag = "approvals",
    params(
        ("id" = i32, Path, description = "Task ID")
    ),
    request_body = OverrideRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Decision recorded", body = ApiResponse<Task>),
        (status = 400, description = "Reason is required for a rejection", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 409, description = "Task changed underneath the caller", body = ErrorResponse)
    )
)]
pub async fn override_task(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    body: web::Json<OverrideRequest>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("POST /api/tasks/{}/override - {:?}", task_id, body.decision);

    let actor = actor(&auth, &config)?;
    let OverrideRequest { decision, reason } = body.into_inner();
    let task = engine
        .approvals
        .override_decision(&actor, task_id, decision, reason)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Override recorded", task)))
}

/// Check and commit one price-research row
#[utoipa::path(
    post,
    path = "/api/price-rows/commit",
    tag = "price research",
    request_body = PriceRow,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Row saved with its margin", body = ApiResponse<PriceRowView>),
        (status = 400, description = "Row breaks an evidence rule", body = ErrorResponse)
    )
)]
pub async fn commit_price_row(
    auth: BearerAuth,
    engine: web::Data<Engine>,
    config: web::Data<AppConfig>,
    body: web::Json<PriceRow>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/price-rows/commit - product {}", body.product_code);

    actor(&auth, &config)?;
    let mut row = body.into_inner();
    if let Err(errors) = commit_row(&mut row) {
        return Err(ServiceError::ValidationError {
            message: "Row cannot be saved".to_string(),
            errors: errors.iter().map(|e| e.to_field_error("")).collect(),
        });
    }

    let low_margin = is_low_margin(row.margin, engine.policy.low_margin_threshold);
    log::info!("Row {} saved with margin {}%", row.product_code, row.margin);
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Row saved",
        PriceRowView { row, low_margin },
    )))
}

/// Normalise a package price to price per 100 grams
#[utoipa::path(
    get,
    path = "/api/price-rows/unit-price",
    tag = "price research",
    params(UnitPriceQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Unit price computed", body = ApiResponse<UnitPrice>),
        (status = 400, description = "Weight not positive or unit price out of range", body = ErrorResponse)
    )
)]
pub async fn get_unit_price(
    auth: BearerAuth,
    config: web::Data<AppConfig>,
    query: web::Query<UnitPriceQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/price-rows/unit-price - price={} weight={}", query.price, query.weight);

    actor(&auth, &config)?;
    let unit_price = unit_price(query.price, query.weight)
        .ok_or_else(|| ServiceError::validation("Weight must be positive and the unit price representable"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Unit price computed", UnitPrice { unit_price })))
}

pub fn task_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .route("", web::get().to(list_tasks))
            .route("", web::post().to(assign_task))
            .route("/{id}", web::get().to(get_task))
            .route("/{id}/start", web::post().to(start_task))
            .route("/{id}/submit", web::post().to(submit_task))
            .route("/{id}/approve", web::post().to(approve_task))
            .route("/{id}/reject", web::post().to(reject_task))
            .route("/{id}/override", web::post().to(override_task)),
    )
    .service(
        web::scope("/api/price-rows")
            .route("/commit", web::post().to(commit_price_row))
            .route("/unit-price", web::get().to(get_unit_price)),
    );
}
