//! In-memory caching for public content.
//!
//! This module provides the `ResourceCache`, which keeps the last successful
//! response for each content category and serves it without a network call
//! while it is younger than the freshness window (5 minutes by default).
//!
//! Cached categories:
//! - Courses, Toppers, Achievements
//! - Gallery
//! - Home sections
//!
//! Nothing is persisted; the cache lives as long as the process.

pub mod manager;

pub use manager::{
    CacheAges, CacheKeying, CacheOptions, CachedData, InFlight, ResourceCache,
    DEFAULT_FRESHNESS_SECS,
};
