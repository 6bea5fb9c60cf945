//! Authentication module for the admin session.
//!
//! This module provides:
//! - `TokenStore`: the durable bearer-token slot (file, keyring or memory)
//! - `Session`: in-memory record of who is signed in
//! - `AuthService`: login, logout, verify and change-password
//!
//! A stored token is only trusted after `/auth/verify` accepts it.

pub mod credentials;
pub mod service;
pub mod session;
pub mod token_store;

pub use credentials::KeyringTokenStore;
pub use service::AuthService;
pub use session::{AuthStatus, Session, SessionData};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_SLOT};
