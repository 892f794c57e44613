//! A.R.E.S Server Binary
//!
//! This is the main entry point for running A.R.E.S as a standalone server.
//! For library usage, import from the `ares` crate instead.

use ares::{api, auth::jwt::AuthService, db::TursoClient, rag::engine::RagEngine, rag::pipeline::PipelineRegistry, AppState, AresConfigManager};
use axum::{Router, routing::get};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const CONFIG_FILE: &str = "ares.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file for secrets (JWT_SECRET, API_KEY, etc.)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting A.R.E.S - Agentic Retrieval Enhanced Server");

    // =================================================================
    // Load TOML Configuration
    // =================================================================
    // The server REQUIRES ares.toml to exist.
    if !std::path::Path::new(CONFIG_FILE).exists() {
        tracing::error!(
            "Configuration file '{}' not found! A.R.E.S requires ares.toml to run. \
             Copy ares.example.toml to ares.toml and customize it.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let mut config_manager = match AresConfigManager::new(CONFIG_FILE) {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "failed to load {} - check for syntax errors", CONFIG_FILE);
            std::process::exit(1);
        }
    };

    // Start hot-reload watcher
    if let Err(e) = config_manager.start_watching() {
        tracing::error!(error = %e, "failed to start config file watcher");
        std::process::exit(1);
    }

    let config_manager = Arc::new(config_manager);
    let config = config_manager.config();

    tracing::info!(
        "Configuration loaded from {} (hot-reload enabled)",
        CONFIG_FILE
    );

    // =================================================================
    // Initialize Database
    // =================================================================
    // Check for Turso cloud config first, then fall back to local SQLite
    let turso = if let (Some(turso_url_env), Some(turso_token_env)) = (
        &config.database.turso_url_env,
        &config.database.turso_token_env,
    ) {
        // Try to get cloud credentials from env vars
        if let (Ok(url), Ok(token)) = (std::env::var(turso_url_env), std::env::var(turso_token_env))
        {
            if !url.is_empty() && !token.is_empty() {
                tracing::info!("Initializing Turso (remote) database");
                TursoClient::new(url, token).await?
            } else {
                init_local_db(&config.database.url).await?
            }
        } else {
            init_local_db(&config.database.url).await?
        }
    } else {
        init_local_db(&config.database.url).await?
    };

    turso.initialize_rag_schema().await?;
    let turso = Arc::new(turso);

    tracing::info!("Database client initialized");

    // =================================================================
    // Initialize Auth Service
    // =================================================================
    let jwt_secret = config
        .jwt_secret()
        .expect("JWT_SECRET environment variable must be set");
    let auth_service = Arc::new(AuthService::new(
        jwt_secret,
        config.auth.jwt_access_expiry,
        config.auth.jwt_refresh_expiry,
    ));
    tracing::info!("Auth service initialized");

    // =================================================================
    // Initialize the RAG Engine
    // =================================================================
    let data_root = PathBuf::from(&config.rag.data_root);
    if let Err(e) = std::fs::create_dir_all(&data_root) {
        tracing::error!(data_root = %data_root.display(), error = %e, "data root is not writable");
        std::process::exit(2);
    }
    let pipeline_registry = Arc::new(PipelineRegistry::new(Arc::clone(&turso), data_root));
    let rag_engine = Arc::new(RagEngine::new(pipeline_registry));
    tracing::info!("RAG engine initialized");

    // =================================================================
    // Create Application State
    // =================================================================
    let state = AppState {
        config_manager: Arc::clone(&config_manager),
        turso,
        auth_service,
        rag_engine,
    };

    // =================================================================
    // Build OpenAPI Documentation
    // =================================================================
    #[derive(OpenApi)]
    #[openapi(
        paths(
            ares::api::handlers::auth::register,
            ares::api::handlers::auth::login,
        ),
        components(schemas(
            ares::types::LoginRequest,
            ares::types::RegisterRequest,
            ares::types::TokenResponse,
        )),
        tags(
              (name = "auth", description = "Authentication endpoints"),
              (name = "rag", description = "RAG pipeline endpoints"),
          ),
        info(
            title = "A.R.E.S - Agentic Retrieval Enhanced Server API",
            version = "0.6.0",
            description = "Retrieval Augmented Generation server: document ingest, chunking, embedding, retrieval, reranking and answer synthesis"
        )
    )]
    struct ApiDoc;

    // =================================================================
    // Build Router
    // =================================================================
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Configuration info endpoint
        .route("/config/info", get(config_info))
        // API routes
        .nest("/api", api::routes::create_router())
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        // Add state
        .with_state(state);

    // =================================================================
    // Start Server
    // =================================================================
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize local SQLite database
async fn init_local_db(url: &str) -> Result<TursoClient, Box<dyn std::error::Error>> {
    // Ensure data directory exists for the default "./data/ares.db" path.
    if !url.contains(":memory:") && !url.starts_with("libsql://") && !url.starts_with("https://") {
        let path = url.strip_prefix("file:").unwrap_or(url);
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::info!(database_url = %url, "Initializing local database");
    Ok(TursoClient::new_local(url).await?)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Configuration info endpoint (non-sensitive info only)
async fn config_info(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    let config = state.config_manager.config();
    axum::Json(serde_json::json!({
        "server": {
            "host": config.server.host,
            "port": config.server.port,
            "log_level": config.server.log_level,
        },
        "rag": {
            "data_root": config.rag.data_root,
        },
    }))
}
