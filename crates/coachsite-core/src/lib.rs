//! coachsite core library.
//!
//! Client-side data access for the coaching-institute website backend:
//!
//! - `api`: HTTP client wrapper with bearer auth and the response policy
//! - `cache`: time-boxed in-memory cache of public content
//! - `data`: content accessors with shared loading/error state
//! - `auth`: token storage, session state and the login lifecycle
//! - `admin`: content CRUD, contact inbox and dashboard counts
//! - `app`: composition root that wires the services together

pub mod admin;
pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod data;
pub mod models;
pub mod navigation;
pub mod utils;

pub use app::App;
pub use config::Config;
