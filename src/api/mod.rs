//! Party site API module.
//!
//! This module provides:
//! - HTTP client with a per-run session cookie
//! - Creator lookup and paginated post listing
//! - API response types

pub mod client;
pub mod session;
pub mod source;
pub mod types;

pub use client::{
    search_creators, select_creator, ClientSettings, PartyApi, DEFAULT_USER_AGENT, PAGE_SIZE,
};
pub use source::PostSource;
pub use types::*;
