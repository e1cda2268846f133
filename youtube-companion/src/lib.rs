//! Keep notes on YouTube videos and manage their comments from the command line.
//!
//! The crate is layered leaf-first:
//!
//! - [`token_store`] persists the single OAuth credential
//! - [`oauth`] runs the authorization flow and keeps the credential fresh
//! - [`youtube_api`] talks to the YouTube Data API v3
//! - [`db`] stores videos, notes and the activity log in SQLite
//! - [`companion`] ties them together into the operations the binary exposes

pub mod companion;
pub mod config;
pub mod db;
pub mod oauth;
pub mod token_store;
pub mod youtube_api;

pub use companion::{Companion, CompanionError, extract_video_id};
pub use config::Config;
