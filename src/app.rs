//! Wiring: config → embedder, SQLite index, model backend → pipeline.

use anyhow::Result;
use std::sync::Arc;

use docchat_core::gateway::IndexGateway;
use docchat_core::observe::PipelineObserver;
use docchat_core::pipeline::Pipeline;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::model::ModelBackend;
use crate::sqlite_store::SqliteIndex;

/// A pipeline over the configured SQLite index, plus handles the commands
/// need directly.
pub struct App {
    pub pipeline: Pipeline,
    pub index: Arc<SqliteIndex>,
    pub model: Arc<ModelBackend>,
}

impl App {
    /// Build every component. The model backend is created but not loaded.
    pub async fn open(config: &Config, observer: Arc<dyn PipelineObserver>) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let index = Arc::new(SqliteIndex::open(config).await?);
        let model = Arc::new(ModelBackend::new(&config.model)?);

        let gateway = IndexGateway::new(embedder, index.clone(), observer.clone())
            .with_batch_size(config.embedding.batch_size)
            .with_ceiling(config.embedding.generation_ceiling());

        let pipeline = Pipeline::new(
            config.pipeline_config()?,
            Arc::new(gateway),
            model.clone(),
            observer,
        );

        Ok(Self {
            pipeline,
            index,
            model,
        })
    }
}
