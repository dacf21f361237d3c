use std::sync::Arc;

use chirpy::core::auth::{AppState, AuthService, JwtService, api_router};
use chirpy::core::config::Config;
use chirpy::core::db::{
    DbConfig, MemoryRefreshTokenStore, MemoryUserStore, RefreshTokenRepository,
    RefreshTokenStore, UserRepository, UserStore, create_pool_with_migrations,
};
use secrecy::ExposeSecret;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, webhook_key={}, platform={:?}",
        config.has_database(),
        config.has_webhook_key(),
        config.platform
    );

    let users: Arc<dyn UserStore>;
    let refresh_tokens: Arc<dyn RefreshTokenStore>;
    let mut db = None;

    match &config.database_url {
        Some(url) => {
            let pool =
                create_pool_with_migrations(&DbConfig::from_url(url.expose_secret())).await?;
            users = Arc::new(UserRepository::new(pool.clone()));
            refresh_tokens = Arc::new(RefreshTokenRepository::with_ttl(
                pool.clone(),
                config.refresh_token_ttl,
            ));
            db = Some(pool);
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, using in-memory stores; accounts and sessions are lost on restart"
            );
            users = Arc::new(MemoryUserStore::new());
            refresh_tokens = Arc::new(MemoryRefreshTokenStore::with_ttl(config.refresh_token_ttl));
        }
    }

    let mut auth_service = AuthService::new(
        users,
        refresh_tokens,
        JwtService::new(config.jwt_secret.expose_secret()),
    )
    .with_access_ttl(config.access_token_ttl);

    if let Some(key) = &config.webhook_api_key {
        auth_service = auth_service.with_webhook_key(key);
    }

    let mut state = AppState::new(auth_service, config.platform);
    if let Some(pool) = db {
        state = state.with_database(pool);
    }

    let app = api_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
