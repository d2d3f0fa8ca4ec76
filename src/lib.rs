//! # docchat
//!
//! Ask questions about a local folder of documents and get answers that
//! cite the passages they came from.
//!
//! The pipeline logic lives in the `docchat-core` crate. This crate
//! supplies the concrete pieces and the `docchat` CLI:
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │ documents/  │──▶│ Segmenter+Embed  │──▶│ SQLite index │
//! │ (walkdir)   │   │ (docchat-core)   │   │ (sqlx)       │
//! └─────────────┘   └──────────────────┘   └──────┬───────┘
//!                                                 │ nearest
//!                   ┌──────────────────┐   ┌──────▼───────┐
//!    answer  ◀──────│ Citation binder  │◀──│ llama.cpp /  │
//!                   │                  │   │ TGI server   │
//!                   └──────────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docchat init
//! docchat ingest
//! docchat ask "How do I configure logging?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`connector_fs`] | Filesystem document loader |
//! | [`embedding`] | Embedding providers |
//! | [`model`] | Inference server backends |
//! | [`sqlite_store`] | SQLite vector index |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`progress`] | Event output modes |

pub mod app;
pub mod ask;
pub mod config;
pub mod connector_fs;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod migrate;
pub mod model;
pub mod progress;
pub mod sqlite_store;
pub mod stats;
