use assessment_backend::{
    config::{get_config, init_config},
    database::{
        pool::{create_pool, run_migrations},
        Storage,
    },
    routes::app_router,
    AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    init_config()?;
    let config = get_config()?;

    let storage = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            info!("Using PostgreSQL storage");
            Storage::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using in-memory storage, data is lost on exit");
            Storage::memory()
        }
    };

    let app_state = AppState::from_config(config, storage)?;

    {
        let pipeline = app_state.pipeline.clone();
        let poll = Duration::from_millis(config.recovery_poll_ms);
        tokio::spawn(async move {
            loop {
                match pipeline.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(poll).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "recovery worker error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }

    {
        let pipeline = app_state.pipeline.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = pipeline.report_stale().await {
                    tracing::error!(error = ?e, "stale assessment check failed");
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
    }

    let app = app_router(app_state, config.public_rps, config.company_rps);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
