//! Session core for the AIOCENSOR console.
//!
//! This crate owns everything a console client needs to stay signed in:
//! - `auth`: the token store, the session manager and its single-flight refresh
//! - `api`: the remote authenticator client and the authenticated HTTP client
//!   with its request/response interceptors
//! - `navigation`: the route table and the navigation guard
//! - `config`: application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod navigation;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use api::{ApiClient, ApiError, AuthApi, AuthedClient};
pub use auth::{AuthState, Session, SessionError, SessionEvent, SessionManager, TokenStore};
pub use config::Config;
pub use navigation::{GuardDecision, Location, NavigationGuard, RouteTable};
