//! Roster Server
//!
//! Serves the user administration pages and endpoints.
//!
//! Configuration comes from a TOML file (first argument, `ROSTER_CONFIG`,
//! or the standard search paths) with `ROSTER_*` environment overrides.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `{admin.base_path}` | Users admin (default `/admin/auth/user`) |
//! | `/health` | Liveness |
//! | `/swagger-ui` | API explorer, document at `/q/openapi` |

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{http::HeaderValue, response::Json, routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utoipa_swagger_ui::SwaggerUi;

use roster_admin::{
    admin_router, Argon2Config, DevDataSeeder, InMemoryStore, Locale, MongoPermissionRepository,
    MongoRoleRepository, MongoSeedStore, MongoUserRepository, PagingLimits, PasswordPolicy,
    PasswordService, PermissionRepository, RoleRepository, SeedStore, Translator, UserRepository,
    UsersState,
};
use roster_common::logging::{init_logging, LogFormat};
use roster_config::{AppConfig, ConfigLoader, PasswordConfig, StorageBackend};

struct Repositories {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    permissions: Arc<dyn PermissionRepository>,
    seed_store: Arc<dyn SeedStore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ConfigLoader::with_path(path).load()?,
        None => AppConfig::load()?,
    };

    init_logging(
        "roster-server",
        LogFormat::resolve(&config.logging.format),
        &config.logging.level,
    );
    info!("Starting Roster Server");

    let passwords = Arc::new(password_service(&config.password)?);
    let repos = connect_storage(&config, passwords).await?;

    if config.dev_mode {
        warn!("dev_mode is on; seeding development data");
        DevDataSeeder::new(repos.seed_store.clone(), repos.users.clone())
            .seed()
            .await?;
    }

    let locale: Locale = config
        .admin
        .locale
        .parse()
        .map_err(anyhow::Error::msg)
        .context("admin.locale")?;

    let state = UsersState::new(repos.users, repos.roles, repos.permissions)
        .with_translator(Translator::new(locale))
        .with_paging(PagingLimits {
            default_page_size: config.admin.default_page_size,
            max_page_size: config.admin.max_page_size,
        })
        .with_base_path(&config.admin.base_path);

    let (router, mut openapi) = admin_router(state).split_for_parts();
    openapi.info.title = "Roster Admin API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description = Some("User accounts and role assignments".to_string());

    let app = Router::new()
        .merge(router)
        .route("/health", get(health_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", openapi))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.http.cors_origins));

    let addr = config.http.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Users admin at http://{}{}", addr, config.admin.base_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Roster Server shutdown complete");
    Ok(())
}

fn password_service(config: &PasswordConfig) -> Result<PasswordService> {
    let policy = if config.strict {
        PasswordPolicy::strict(config.min_length, config.max_length)
    } else {
        PasswordPolicy::lenient().with_lengths(config.min_length, config.max_length)
    };
    let argon2 = Argon2Config {
        memory_cost: config.memory_cost,
        time_cost: config.time_cost,
        parallelism: config.parallelism,
        ..Argon2Config::default()
    };
    Ok(PasswordService::new(argon2, policy)?)
}

async fn connect_storage(config: &AppConfig, passwords: Arc<PasswordService>) -> Result<Repositories> {
    match config.storage.backend {
        StorageBackend::Mongodb => {
            info!("Connecting to MongoDB at {}", config.mongodb.uri);
            let client = mongodb::Client::with_uri_str(&config.mongodb.uri)
                .await
                .context("connecting to MongoDB")?;
            let db = client.database(&config.mongodb.database);

            let users = MongoUserRepository::new(&db, passwords.clone());
            users.ensure_indexes().await?;

            Ok(Repositories {
                users: Arc::new(users),
                roles: Arc::new(MongoRoleRepository::new(&db)),
                permissions: Arc::new(MongoPermissionRepository::new(&db)),
                seed_store: Arc::new(MongoSeedStore::new(&db, passwords)),
            })
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on shutdown");
            let store = Arc::new(InMemoryStore::new(passwords));
            Ok(Repositories {
                users: store.clone(),
                roles: store.clone(),
                permissions: store.clone(),
                seed_store: store,
            })
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
