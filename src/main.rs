mod app;
mod auth;
mod books;
mod config;
mod db;
mod error;
mod extract;
#[cfg(test)]
mod memory;
mod state;
mod users;

use crate::config::{AppConfig, LogConfig};

fn init_tracing(log: &LogConfig) {
    if log.json {
        tracing_subscriber::fmt()
            .with_env_filter(log.filter.as_str())
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(log.filter.as_str())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(&config.log);

    let addr = config.bind_addr();
    let state = state::AppState::init(config).await?;
    let app = app::build_app(state);

    app::serve(app, &addr).await
}
