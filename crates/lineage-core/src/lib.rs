//! lineage-core: Shared types, validation, and configuration for the lineage knowledge graph.
//!
//! This crate provides the foundational pieces used across all lineage components:
//! - Domain types for dataset lineage (files, features, units, storage) and
//!   NAS provenance (layers, hardware, experiments)
//! - The identifier sanitizer guarding every label or property name that is
//!   substituted into query text
//! - Injectable identifier generators
//! - Reference catalogs (N-CMAPSS feature set, NAS layer catalog)
//! - Configuration management

pub mod catalog;
pub mod config;
pub mod error;
pub mod ident;
pub mod ids;
pub mod types;

pub use error::{ConfigError, IdentError};
pub use ident::Identifier;
pub use ids::{IdGenerator, SequenceGenerator, UuidGenerator};
pub use types::{
    Category, DatasetSpec, ExperimentRecord, FeatureSet, FeatureSpec, HardwareSpec, LayerSpec,
    StorageDescriptor,
};
