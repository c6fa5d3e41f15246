#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Fetch, normalize and cache DART financial statements.
//!
//! This crate ties the pieces together: a [`Pipeline`] that serves fresh
//! stored statements or refetches them from OpenDART, a [`Facade`] that
//! answers query-string requests with status codes and JSON bodies, and
//! [`records_frame`] for tabular analysis. Core types and the store and
//! client implementations are re-exported.
//!
//! # Features
//!
//! - `cache-sqlite` - SQLite-backed store and the config-driven constructors
//!
//! # Example
//!
//! ```rust,ignore
//! use dart::{Facade, StatementKind};
//!
//! #[tokio::main]
//! async fn main() -> dart::Result<()> {
//!     let facade = Facade::from_env().await?;
//!
//!     let response = facade
//!         .handle(StatementKind::Income, "corp_code=00126380&year=2020")
//!         .await;
//!     println!("{} {}", response.status, response.body);
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use dart_core::*;

// Store implementations
#[cfg(feature = "cache-sqlite")]
pub use dart_cache::SqliteStore;
pub use dart_cache::InMemoryStore;

// Upstream client
pub use dart_opendart::OpenDartClient;

mod facade;
mod frame;
mod pipeline;

pub use facade::{Facade, Response, status_for};
pub use frame::records_frame;
pub use pipeline::Pipeline;
