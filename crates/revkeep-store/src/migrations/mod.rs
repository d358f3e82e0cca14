//! Schema migrations
//!
//! Embedded SQL files applied in order, once each, with their checksums
//! verified on every open.

mod checksums;
mod embedded;
mod runner;

pub use runner::{applied_migrations, apply_migrations};
