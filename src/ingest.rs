//! `docchat ingest`: load documents, segment, embed, store.

use anyhow::{bail, Result};
use std::sync::Arc;

use docchat_core::observe::PipelineObserver;
use docchat_core::segment::Segmenter;

use crate::app::App;
use crate::config::Config;
use crate::connector_fs;

pub async fn run_ingest(
    config: &Config,
    observer: Arc<dyn PipelineObserver>,
    dry_run: bool,
) -> Result<()> {
    let documents = connector_fs::load_documents(&config.documents)?;

    if dry_run {
        let pipeline_config = config.pipeline_config()?;
        let segmenter = Segmenter::new(
            pipeline_config.chunk_size,
            pipeline_config.chunk_overlap,
            observer,
        );
        let total_chunks: usize = documents.iter().map(|d| segmenter.chunk(d).len()).sum();

        println!("ingest {} (dry-run)", config.documents.dir.display());
        println!(
            "  chunk size: {}, overlap: {}",
            segmenter.chunk_size(),
            segmenter.overlap()
        );
        println!("  documents found: {}", documents.len());
        println!("  chunks: {}", total_chunks);
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        tracing::warn!("embedding provider is disabled; no chunks can be stored");
    }

    let app = App::open(config, observer).await?;
    let report = app.pipeline.ingest(&documents).await;

    println!("ingest {}", config.documents.dir.display());
    println!("  documents: {}", report.documents);
    println!("  empty: {}", report.documents_empty);
    println!("  stored: {}", report.documents_stored);
    println!("  failed: {}", report.documents_failed);
    println!("  chunks stored: {}", report.chunks_stored);
    println!("  chunks skipped: {}", report.chunks_skipped);
    for failure in &report.failures {
        println!("    {}: {}", failure.source_id, failure.error);
    }

    app.index.close().await;

    if report.chunks_stored == 0 {
        bail!(
            "No chunks were stored ({} documents, {} failed)",
            report.documents,
            report.documents_failed
        );
    }

    println!("ok");
    Ok(())
}
