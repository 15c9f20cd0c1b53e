//! Authentication module for managing the console session.
//!
//! This module provides:
//! - `Session`: the access/refresh token pair and its persisted form
//! - `TokenStore`: durable persistence of the session in a single named slot
//! - `SessionManager`: login, logout, check and single-flight refresh
//! - `AccessClaims`: decoding of the expiry claim embedded in access tokens
//!
//! The in-memory session is the source of truth; the slot is a mirror of it.

pub mod error;
pub mod manager;
pub mod session;
pub mod storage;
pub mod token;

pub use error::SessionError;
pub use manager::{AuthState, SessionEvent, SessionManager};
pub use session::{Session, TokenStore};
pub use storage::{FileSlot, KeyringSlot, MemorySlot, SessionSlot};
pub use token::AccessClaims;
