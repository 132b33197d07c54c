use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
    auth::{optional_auth, require_auth},
    error::{expose_error_detail, handle_panic, not_found},
    handlers::{applications, auth, blog, contact, health, stats},
    identity::{FirebaseCredentials, IdentityProvider},
    notify::Notifier,
    ratelimit::{limit_requests, RateLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW},
    store::Store,
    AppState,
};

pub const DB_FILE: &str = "cradle.db";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

impl RuntimeMode {
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

impl FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!(
                "unknown environment {other:?} (expected development or production)"
            )),
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
        })
    }
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Comma-separated list of origins allowed by CORS.
    pub frontend_url: String,
    pub mode: RuntimeMode,
    pub rate_limit_window: Duration,
    pub rate_limit_max: u32,
    pub firebase_project_id: Option<String>,
    pub firebase_client_email: Option<String>,
    pub firebase_private_key: Option<String>,
    /// Permit the development identity outside development mode.
    pub allow_dev_auth: bool,
    /// Keep records in a redb database instead of process memory.
    pub persist: bool,
    pub data_dir: Option<PathBuf>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
}

impl ServerConfig {
    /// Reads the `CRADLE_*` and `FIREBASE_*` environment. An unrecognized
    /// `CRADLE_ENV` is an error rather than a silent fallback.
    pub fn from_env() -> Result<Self> {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let data_dir = env("CRADLE_DATA_DIR").map(PathBuf::from);
        Ok(Self {
            host: env("CRADLE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: env("CRADLE_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            frontend_url: env("CRADLE_FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.into()),
            mode: parse_mode(env("CRADLE_ENV"))?,
            rate_limit_window: env("CRADLE_RATE_LIMIT_WINDOW")
                .and_then(|w| humantime::parse_duration(&w).ok())
                .unwrap_or(DEFAULT_WINDOW),
            rate_limit_max: env("CRADLE_RATE_LIMIT_MAX")
                .and_then(|m| m.parse().ok())
                .unwrap_or(DEFAULT_MAX_REQUESTS),
            firebase_project_id: env("FIREBASE_PROJECT_ID"),
            firebase_client_email: env("FIREBASE_CLIENT_EMAIL"),
            firebase_private_key: env("FIREBASE_PRIVATE_KEY"),
            allow_dev_auth: env("CRADLE_ALLOW_DEV_AUTH")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            persist: data_dir.is_some(),
            data_dir,
            webhook_url: env("CRADLE_WEBHOOK_URL"),
            webhook_secret: env("CRADLE_WEBHOOK_SECRET"),
        })
    }
}

/// Unset means development; anything else must name a known mode.
fn parse_mode(raw: Option<String>) -> Result<RuntimeMode> {
    match raw {
        None => Ok(RuntimeMode::default()),
        Some(raw) => raw
            .parse()
            .map_err(|e: String| anyhow::anyhow!("invalid CRADLE_ENV: {e}")),
    }
}

/// The complete HTTP surface, minus CORS (which depends on deployment).
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required).
    let public = Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/applications/submit", post(applications::submit_application))
        .route("/contact/submit", post(contact::submit_inquiry))
        .route("/blog", get(blog::list_posts))
        .route("/blog/meta/categories", get(blog::categories))
        .route("/auth/verify", post(auth::verify_token))
        .route("/auth/health", get(auth::auth_health));

    // Public reads where a signed-in admin sees more (draft previews).
    let previews = Router::new()
        .route("/blog/{key}", get(blog::get_post))
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    // Protected routes (verified bearer token required).
    let protected = Router::new()
        .route("/applications", get(applications::list_applications))
        .route("/applications/{id}", get(applications::get_application))
        .route("/applications/{id}", delete(applications::delete_application))
        .route(
            "/applications/{id}/status",
            patch(applications::update_application_status),
        )
        .route("/contact", get(contact::list_inquiries))
        .route("/contact/{id}", get(contact::get_inquiry))
        .route("/contact/{id}", delete(contact::delete_inquiry))
        .route("/contact/{id}/status", patch(contact::update_inquiry_status))
        .route("/blog", post(blog::create_post))
        .route("/blog/admin/all", get(blog::all_posts))
        .route("/blog/{key}", put(blog::update_post))
        .route("/blog/{key}", delete(blog::delete_post))
        .route("/auth/me", get(auth::me))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .merge(public)
        .merge(previews)
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            expose_error_detail,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), limit_requests));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_DNS_PREFETCH_CONTROL,
            HeaderValue::from_static("off"),
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(cfg: ServerConfig) -> Result<()> {
    let store = if cfg.persist {
        let data_dir = crate::dirs::resolve_data_dir(cfg.data_dir.as_ref())?;
        info!(data_dir = %data_dir.display(), "using data directory");
        Store::open(&data_dir.join(DB_FILE)).context("open store")?
    } else {
        info!("using in-memory store (records are lost on exit)");
        Store::in_memory().context("create store")?
    };

    let credentials = FirebaseCredentials::from_parts(
        cfg.firebase_project_id,
        cfg.firebase_client_email,
        cfg.firebase_private_key,
    )?;
    let identity = IdentityProvider::configure(
        credentials,
        cfg.mode.is_development() || cfg.allow_dev_auth,
    )?;

    let notifier = cfg
        .webhook_url
        .map(|url| {
            info!(%url, signed = cfg.webhook_secret.is_some(), "submission notifications enabled");
            Notifier::new(url, cfg.webhook_secret)
        })
        .transpose()?;

    let state = AppState::new(store, identity)
        .with_limiter(RateLimiter::new(cfg.rate_limit_window, cfg.rate_limit_max))
        .with_notifier(notifier)
        .exposing_errors(cfg.mode.is_development());

    let app = router(state).layer(build_cors(&cfg.frontend_url));

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;

    info!(%addr, mode = %cfg.mode, "cradle server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("server stopped");
    Ok(())
}

pub fn build_cors(origins: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!(origin = s, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
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
}
