use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use fieldops_be::config::AppConfig;
use fieldops_be::docs::ApiDoc;
use fieldops_be::engine::audit::{AuditSink, LogAuditSink};
use fieldops_be::engine::Engine;
use fieldops_be::models::auth::{Role, StaffMember};
use fieldops_be::notify::{LogNotifier, Notifier, SmsGatewayNotifier};
use fieldops_be::store::{MemoryStore, PgStore};
use fieldops_be::{configure_routes, Database};

/// A small reporting line so an in-memory run is usable straight away.
fn seeded_memory_store() -> MemoryStore {
    let store = MemoryStore::new();
    let members = [
        (1, "Selin Aydın", Role::Supervizor, None),
        (2, "Murat Kaya", Role::Manager, Some(1)),
        (10, "Elif Demir", Role::Staff, Some(2)),
        (11, "Can Yılmaz", Role::Staff, Some(2)),
    ];
    for (id, name, role, manager_id) in members {
        store.add_staff(StaffMember {
            id,
            name: name.to_string(),
            role,
            branch_id: 1,
            manager_id,
            phone: None,
        });
    }
    store
}

async fn build_engine(config: &AppConfig, notifier: Arc<dyn Notifier>) -> io::Result<(Engine, Option<Database>)> {
    let log_sink: Arc<dyn AuditSink> = Arc::new(LogAuditSink);

    let Some(database_url) = config.database_url.as_deref().filter(|_| config.environment != "memory") else {
        log::warn!("🧪 Running with the in-memory store; data is lost on restart");
        let store = Arc::new(seeded_memory_store());
        let store_sink: Arc<dyn AuditSink> = store.clone();
        let sinks = vec![log_sink, store_sink];
        let engine = Engine::new(store, sinks, notifier, config.policy.clone());
        return Ok((engine, None));
    };

    let db = Database::new(database_url).await.map_err(|e| {
        log::error!("❌ {:#}", e);
        io::Error::other(e.to_string())
    })?;
    if let Err(e) = db.health_check().await {
        log::error!("❌ {:#}", e);
        return Err(io::Error::other(e.to_string()));
    }
    if let Err(e) = db.verify_schema().await {
        log::warn!("⚠️  {:#}", e);
    }
    match db.get_stats().await {
        Ok(stats) => stats.log_stats(),
        Err(e) => log::warn!("⚠️  {:#}", e),
    }

    let store = Arc::new(PgStore::new(db.pool.clone()));
    let store_sink: Arc<dyn AuditSink> = store.clone();
    let sinks = vec![log_sink, store_sink];
    let engine = Engine::new(store, sinks, notifier, config.policy.clone());
    Ok((engine, Some(db)))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize logger
    env_logger::init();

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("❌ Configuration error: {}", e);
        io::Error::other(e.to_string())
    })?;

    log::info!("🚀 Starting Field Operations API on port {}", config.port);
    log::info!("📋 Allowed frontend URLs: {:?}", config.frontend_urls);
    log::info!("⚙️  Engine policy: {:?}", config.policy);

    let notifier: Arc<dyn Notifier> = match &config.sms_gateway_url {
        Some(url) => {
            log::info!("📨 Sending notifications through {}", url);
            Arc::new(SmsGatewayNotifier::new(url.clone()))
        }
        None => Arc::new(LogNotifier),
    };

    let (engine, db) = build_engine(&config, notifier).await?;

    let port = config.port;
    let allowed_origins = config.frontend_urls.clone();
    let engine = web::Data::new(engine);
    let config = web::Data::new(config);
    let db = db.map(web::Data::new);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                "Authorization",
                "Content-Type",
                "Accept",
                "Origin",
                "X-Requested-With",
            ])
            .supports_credentials();

        // Add allowed origins
        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        let mut app = App::new()
            .app_data(engine.clone())
            .app_data(config.clone());
        if let Some(db) = &db {
            app = app.app_data(db.clone());
        }

        app.wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .configure(configure_routes)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .route("/", web::get().to(|| async {
                HttpResponse::Ok().json(serde_json::json!({
                    "name": "Field Operations API",
                    "version": env!("CARGO_PKG_VERSION"),
                    "description": "REST API for field staff tasks, approvals, shifts and leave"
                }))
            }))
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
