mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use common::{harness, Harness, MANAGER, OTHER_MANAGER, STAFF, SUPERVIZOR};
use fieldops_be::config::{AppConfig, EnginePolicy};
use fieldops_be::configure_routes;
use fieldops_be::models::auth::{Actor, Claims};

const SECRET: &str = "api-test-secret";

fn config() -> AppConfig {
    AppConfig {
        database_url: None,
        port: 8080,
        jwt_secret: SECRET.to_string(),
        environment: "memory".to_string(),
        frontend_urls: vec![],
        sms_gateway_url: None,
        policy: EnginePolicy::default(),
    }
}

fn bearer(actor: &Actor) -> (&'static str, String) {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: actor.id.to_string(),
        role: actor.role,
        branch_id: actor.branch_id,
        exp: now + 3600,
        iat: now,
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_ref())).unwrap();
    ("Authorization", format!("Bearer {}", token))
}

macro_rules! app {
    ($h:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($h.engine.clone()))
                .app_data(web::Data::new(config()))
                .configure(configure_routes),
        )
        .await
    };
}

async fn assign_delivery(h: &Harness) -> i32 {
    let task = h
        .engine
        .tasks
        .assign(
            &MANAGER,
            serde_json::from_value(json!({
                "title": "Deliver order 118",
                "category": "DELIVERY",
                "customer": { "name": "Kuzey Market" },
                "assigned_to": STAFF.id
            }))
            .unwrap(),
        )
        .await
        .unwrap();
    task.id
}

#[actix_web::test]
async fn health_reports_in_memory_mode() {
    let h = harness();
    let app = app!(h);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["database"], "in-memory");
}

#[actix_web::test]
async fn requests_without_a_valid_token_are_unauthorized() {
    let h = harness();
    let app = app!(h);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/tasks").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/tasks")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn me_resolves_the_staff_record() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&STAFF))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["actor"]["role"], "STAFF");
    assert_eq!(body["data"]["staff"]["manager_id"], MANAGER.id);
}

#[actix_web::test]
async fn assign_validates_the_body() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer(&MANAGER))
        .set_json(json!({
            "title": "",
            "category": "MARKET_TASK",
            "assigned_to": STAFF.id
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["field"], "title");

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer(&MANAGER))
        .set_json(json!({
            "title": "Shelf check",
            "category": "MARKET_TASK",
            "assigned_to": STAFF.id
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "ASSIGNED");
}

#[actix_web::test]
async fn submission_errors_name_the_field() {
    let h = harness();
    let task_id = assign_delivery(&h).await;
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri(&format!("/api/tasks/{}/submit", task_id))
        .insert_header(bearer(&STAFF))
        .set_json(json!({ "photos": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["field"], "photos");
    assert_eq!(body["errors"][0]["code"], "required");
}

#[actix_web::test]
async fn review_outcomes_map_to_status_codes() {
    let h = harness();
    let task_id = assign_delivery(&h).await;
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri(&format!("/api/tasks/{}/submit", task_id))
        .insert_header(bearer(&STAFF))
        .set_json(json!({ "photos": ["https://cdn.example.test/p/1.jpg"] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // Not the assignee's manager.
    let req = test::TestRequest::post()
        .uri(&format!("/api/tasks/{}/approve", task_id))
        .insert_header(bearer(&OTHER_MANAGER))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "You are not allowed to perform this action");

    let req = test::TestRequest::post()
        .uri(&format!("/api/tasks/{}/reject", task_id))
        .insert_header(bearer(&MANAGER))
        .set_json(json!({ "reason": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri(&format!("/api/tasks/{}/approve", task_id))
        .insert_header(bearer(&MANAGER))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "APPROVED");

    let req = test::TestRequest::post()
        .uri(&format!("/api/tasks/{}/approve", task_id))
        .insert_header(bearer(&MANAGER))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri(&format!("/api/tasks/{}/override", task_id))
        .insert_header(bearer(&SUPERVIZOR))
        .set_json(json!({ "decision": "REJECT", "reason": "Wrong address" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "REJECTED");
}

#[actix_web::test]
async fn unknown_task_is_not_found() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::get()
        .uri("/api/tasks/999")
        .insert_header(bearer(&SUPERVIZOR))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn unit_price_endpoint() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::get()
        .uri("/api/price-rows/unit-price?price=45&weight=1.5")
        .insert_header(bearer(&STAFF))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/price-rows/unit-price?price=1000000000000000000000000000&weight=1")
        .insert_header(bearer(&STAFF))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn commit_rejects_a_margin_that_does_not_fit() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/api/price-rows/commit")
        .insert_header(bearer(&STAFF))
        .set_json(json!({
            "product_code": "8690504",
            "product_name": "Sunflower oil 1L",
            "our_price": "0.0000000000000000000000000001",
            "observations": [
                { "price": "79228162514264337593543950335", "status": "AVAILABLE" }
            ]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["field"], "our_price");
}

#[actix_web::test]
async fn shift_toggle_over_http() {
    let h = harness();
    let app = app!(h);

    let toggle = |action: &str| {
        test::TestRequest::post()
            .uri("/api/shifts/toggle")
            .insert_header(bearer(&STAFF))
            .set_json(json!({ "action": action }))
            .to_request()
    };

    assert_eq!(test::call_service(&app, toggle("end")).await.status(), StatusCode::CONFLICT);
    assert_eq!(test::call_service(&app, toggle("start")).await.status(), StatusCode::OK);
    assert_eq!(test::call_service(&app, toggle("start")).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get()
        .uri("/api/shifts/current")
        .insert_header(bearer(&STAFF))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["active"]["is_active"], true);
    assert_eq!(body["data"]["today"]["kind"], "unscheduled");
}

#[actix_web::test]
async fn leave_notice_route_is_not_taken_for_an_id() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/api/leave-requests")
        .insert_header(bearer(&STAFF))
        .set_json(json!({
            "start": "2026-11-02",
            "end": "2026-11-03",
            "leave_type": "ANNUAL",
            "description": "Moving house"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let leave_id = body["data"]["request"]["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/leave-requests/{}", leave_id))
        .insert_header(bearer(&MANAGER))
        .set_json(json!({ "decision": "REJECTED" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("/api/leave-requests/{}", leave_id))
        .insert_header(bearer(&MANAGER))
        .set_json(json!({ "decision": "REJECTED", "message": "Stock count that week" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/leave-requests/notice")
        .insert_header(bearer(&STAFF))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["id"], leave_id);
    assert_eq!(body["data"]["review_message"], "Stock count that week");

    let req = test::TestRequest::post()
        .uri(&format!("/api/leave-requests/{}/acknowledge", leave_id))
        .insert_header(bearer(&STAFF))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], 1);
}
