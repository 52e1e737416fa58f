#![forbid(unsafe_code)]
//! affinity-core library.
//!
//! Loads subject/item/weight triples, pivots them into an incidence matrix,
//! and derives the subject-similarity and item-co-occurrence matrices.
//!
//! # Conventions
//!
//! - **Errors**: library failures are `thiserror` enums ([`load::LoadError`],
//!   [`config::ConfigError`]); callers at the edge use `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod load;
pub mod matrix;
pub mod table;
pub mod timing;

pub use load::{LoadError, LoadedDataset, Triple, ValidationWarning};
pub use matrix::LabeledMatrix;
