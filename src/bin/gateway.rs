use leave_ledger::{config::GatewayConfig, gateway, telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()?;
    let _guard = telemetry::init(&config.log_dir, "gateway.log");

    gateway::run(config).await
}
