// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use classmatrix::config::Config;
use classmatrix::domain::Role;
use classmatrix::models::user::NewUser;
use classmatrix::routes;
use classmatrix::services::{Corrector, DisabledCorrector, HttpCorrector, LocalObjectStorage};
use classmatrix::state::AppState;
use classmatrix::store::{PgStore, Store};
use classmatrix::utils::hash::hash_password;
use dotenvy::dotenv;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let pool = connect_with_retry(&config.database_url).await?;
    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    if let Err(e) = seed_admin_user(store.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {}", e);
    }

    let storage = LocalObjectStorage::new(&config.upload_dir, &config.public_base_url).await?;

    let corrector: Arc<dyn Corrector> = match &config.corrector_url {
        Some(url) => {
            tracing::info!("Auto-correction service at {}", url);
            let client = reqwest::Client::builder()
                .timeout(config.corrector_timeout)
                .build()?;
            Arc::new(HttpCorrector::new(client, url.clone()))
        }
        None => {
            tracing::warn!("CORRECTOR_URL not set, auto-correction is disabled");
            Arc::new(DisabledCorrector)
        }
    };

    let state = AppState::new(config.clone(), store, Arc::new(storage), corrector);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn connect_with_retry(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if retry_count < 5 => {
                retry_count += 1;
                tracing::warn!(
                    "Database not ready ({}), retrying in 2s... (Attempt {})",
                    e,
                    retry_count
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn seed_admin_user(
    store: &dyn Store,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let email = email.trim().to_lowercase();
    if store.find_user_by_email(&email).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    store
        .insert_user(NewUser {
            email,
            name: "Administrator".to_string(),
            password_hash: hash_password(password)?,
            role: Role::Admin,
        })
        .await?;
    tracing::info!("Admin user created successfully.");
    Ok(())
}
