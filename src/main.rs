mod app;
mod auth;
mod config;
mod db;
mod error;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "opsdesk=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // Missing secret or database URL is fatal here, never per-request.
    let state = AppState::init()?;

    // Best-effort migrations; in a cold-start deployment the database may not
    // be reachable yet, and the per-request guard will connect later.
    match state.db.ensure_connected().await {
        Ok(pool) => {
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                tracing::warn!(error = %e, "migration failed; continuing");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "database not reachable at startup; continuing");
        }
    }

    let app = app::build_app(state);
    app::serve(app).await
}
