//! Lineage Graph: Neo4j client for the lineage knowledge graph.
//!
//! This crate is the single mutation point for the Neo4j knowledge graph.
//! All graph reads and writes flow through this crate: idempotent metadata
//! ingestion, read projections, batched maintenance, and NAS provenance.

pub mod cleanup;
pub mod client;
pub mod ingest;
pub mod nas;
pub mod queries;
pub mod schema;

pub use cleanup::{BatchExecutor, BatchOp, BatchReport, FilterValue, NodeFilter};
pub use client::{GraphClient, GraphConfig, GraphError, TxFuture};
pub use ingest::IngestSummary;
