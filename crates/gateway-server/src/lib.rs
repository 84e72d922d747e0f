//! # Gateway Server
//!
//! HTTP front end of the LLM inference router: bearer authentication, the
//! OAuth token-minting flow, inference and feedback endpoints, health and
//! metrics, served over plain HTTP or TLS.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod oauth;
pub mod routes;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod state;

// Re-export main types
pub use auth::{
    auth_middleware, AuthConfig, AuthConfigBuilder, AuthError, AuthMethod, AuthState,
    AuthenticatedUser, Claims, JwtConfig,
};
pub use error::ApiError;
pub use oauth::{OAuthClient, OAuthConfig, OAuthError};
pub use routes::create_router;
pub use server::{Server, ServerConfig, ServerError, TlsFiles};
pub use session::{LoginStates, SessionStore, SESSION_COOKIE};
pub use shutdown::shutdown_signal;
pub use state::{AppState, AppStateBuilder, RoutingDefaults};
