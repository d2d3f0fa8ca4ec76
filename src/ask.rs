//! `docchat search` and `docchat ask`.

use anyhow::Result;
use std::sync::Arc;

use docchat_core::citation::{derive_label, excerpt};
use docchat_core::models::chunk_id;
use docchat_core::observe::PipelineObserver;

use crate::app::App;
use crate::config::Config;

/// Retrieval only: print the candidates that pass the relevance filter.
pub async fn run_search(
    config: &Config,
    observer: Arc<dyn PipelineObserver>,
    query: &str,
    k: Option<usize>,
) -> Result<()> {
    let app = App::open(config, observer).await?;
    let k = k.unwrap_or(config.retrieval.top_k);
    let results = app.pipeline.retrieve(query, k).await;

    if results.is_empty() {
        println!("No relevant context found.");
    }

    for (i, candidate) in results.iter().enumerate() {
        let id = chunk_id(&candidate.metadata).unwrap_or_default();
        println!(
            "{}. [{:.3}] {}  {}",
            i + 1,
            candidate.distance,
            derive_label(&candidate.metadata),
            id
        );
        println!("    {}", excerpt(&candidate.content).replace('\n', " "));
    }

    app.index.close().await;
    Ok(())
}

/// Full answer path: retrieve, generate, bind citations.
///
/// The model backend's health check runs first; if it fails the command
/// still proceeds and generation reports the backend as not ready. A blank
/// query skips the health check and every other backend call.
pub async fn run_ask(
    config: &Config,
    observer: Arc<dyn PipelineObserver>,
    query: &str,
    json: bool,
) -> Result<()> {
    let app = App::open(config, observer).await?;

    if !query.trim().is_empty() {
        if let Err(e) = app.model.load().await {
            tracing::warn!(
                kind = ?app.model.kind(),
                error = %format!("{:#}", e),
                "model backend failed to load"
            );
        }
    }

    let answer = app.pipeline.answer(query).await;
    app.index.close().await;
    let answer = answer?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        println!("{}", answer.response);
        println!();
        println!("(~{} tokens)", answer.token_estimate);
    }

    Ok(())
}
