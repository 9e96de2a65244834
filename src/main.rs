use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use leave_ledger::bootstrap::seed_manager;
use leave_ledger::config::Config;
use leave_ledger::context::AppContext;
use leave_ledger::db::init_db;
use leave_ledger::docs::ApiDoc;
use leave_ledger::routes;
use leave_ledger::store::RecordStore;
use leave_ledger::store::memory::InMemoryStore;
use leave_ledger::store::mysql::MySqlStore;
use leave_ledger::telemetry;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let _guard = telemetry::init(&config.log_dir, "app.log");

    info!("Server starting...");

    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => Arc::new(MySqlStore::new(init_db(url).await?)),
        None => {
            warn!("DATABASE_URL not set, records are kept in memory only");
            Arc::new(InMemoryStore::new())
        }
    };

    let ctx = Data::new(AppContext::new(store, config.leave_policy()));

    let warmed = ctx.usernames.warmup(ctx.store.as_ref()).await?;
    info!(usernames = warmed, "Username index ready");

    seed_manager(
        ctx.store.as_ref(),
        &ctx.usernames,
        &config.manager_username,
        &config.manager_password,
    )
    .await?;

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(ctx.clone())
            .app_data(config_data.clone())
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config_data))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
