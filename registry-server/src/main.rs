#[macro_use]
extern crate rocket;

use clap::Parser;
use rocket::Config;
use rocket::data::{ByteUnit, Limits};
use std::net::IpAddr;
use std::str::FromStr;
use tokio::sync::watch;

mod app;
mod config;
mod discovery;

use config::ServerConfig;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let cfg = ServerConfig::parse().validate()?;

    init_log();

    let app = app::init(cfg.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    discovery::sweeper::spawn(app.store.clone(), cfg.heartbeat_interval(), shutdown_rx);

    start_http_server(&cfg, app).await?;

    let _ = shutdown_tx.send(true);

    Ok(())
}

async fn start_http_server(cfg: &ServerConfig, app: &'static app::App) -> anyhow::Result<()> {
    let builder = rocket::build()
        .configure(Config {
            address: IpAddr::from_str(&cfg.address)?,
            port: cfg.port,
            limits: Limits::default()
                .limit("json", ByteUnit::Mebibyte(5))
                .limit("data-form", ByteUnit::Mebibyte(5)),
            cli_colors: false,
            ..Config::debug_default()
        })
        .manage(app.store.clone())
        .manage(app.selector.clone())
        .mount("/", discovery::api::routes());

    builder.launch().await?;

    Ok(())
}

fn init_log() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rocket=warn,rocket::response::debug=error".into()),
        )
        .with_level(true)
        .with_ansi(true)
        .with_line_number(true)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S.%.3f".to_string(),
        ))
        .compact()
        .init();
}
