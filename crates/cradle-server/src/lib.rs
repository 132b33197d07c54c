pub mod auth;
pub mod dirs;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod identity;
pub mod notify;
pub mod ratelimit;
pub mod server;
pub mod store;
pub mod validate;

/// Shared application state threaded through axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: store::Store,
    /// Verifies bearer credentials for the admin routes.
    pub identity: identity::IdentityProvider,
    /// Per-client request ceiling applied to every API route.
    pub limiter: ratelimit::RateLimiter,
    /// Submission notifications (present only when a hook URL is configured).
    pub notifier: Option<notify::Notifier>,
    /// Include internal error detail in 500 bodies (development mode).
    pub expose_errors: bool,
}

impl AppState {
    pub fn new(store: store::Store, identity: identity::IdentityProvider) -> Self {
        Self {
            store,
            identity,
            limiter: ratelimit::RateLimiter::default(),
            notifier: None,
            expose_errors: false,
        }
    }

    pub fn with_limiter(mut self, limiter: ratelimit::RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_notifier(mut self, notifier: Option<notify::Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn exposing_errors(mut self, expose: bool) -> Self {
        self.expose_errors = expose;
        self
    }
}

pub use dirs::resolve_data_dir;
pub use server::{build_cors, router, run, RuntimeMode, ServerConfig, DB_FILE};
