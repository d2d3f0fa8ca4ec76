//! # docchat core
//!
//! Pipeline logic for docchat: data models, overlapping segmentation, the
//! index gateway over an embedder and a vector index, relevance-filtered
//! retrieval, citation binding, and the coordinator that ties them together.
//!
//! This crate contains no sqlx, HTTP, or filesystem code. Concrete
//! embedders, vector indexes, and inference backends live in the `docchat`
//! app crate and plug in through the traits defined here.
//!
//! ```text
//! ingest:  Document ─▶ Segmenter ─▶ IndexGateway::store ─▶ VectorIndex
//! answer:  query ─▶ Retriever ─▶ prompt ─▶ Generator ─▶ Citation binder
//! ```

pub mod citation;
pub mod embedding;
pub mod error;
pub mod gateway;
pub mod generate;
pub mod models;
pub mod observe;
pub mod pipeline;
pub mod retrieve;
pub mod segment;
pub mod store;
