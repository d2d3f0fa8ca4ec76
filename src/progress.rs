//! Pipeline event reporting for the CLI.
//!
//! Events go to **stderr** so stdout stays parseable for scripts. The
//! `--progress` flag picks the observer:
//!
//! | Mode | Observer | Output |
//! |------|----------|--------|
//! | `off` | `NoopObserver` | nothing |
//! | `human` | `TracingObserver` | log lines via `tracing` |
//! | `json` | [`JsonObserver`] | one JSON object per line |

use std::io::Write;
use std::sync::Arc;

use docchat_core::observe::{NoopObserver, PipelineEvent, PipelineObserver, TracingObserver};

/// Machine-readable events: one JSON object per line on stderr.
///
/// ```text
/// {"event":"chunks_stored","count":12}
/// {"event":"chunk_skipped","index":3,"reason":{"kind":"empty_content"}}
/// ```
pub struct JsonObserver;

impl PipelineObserver for JsonObserver {
    fn observe(&self, event: &PipelineEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Observer to inject into the pipeline for this mode.
    pub fn observer(&self) -> Arc<dyn PipelineObserver> {
        match self {
            ProgressMode::Off => Arc::new(NoopObserver),
            ProgressMode::Human => Arc::new(TracingObserver),
            ProgressMode::Json => Arc::new(JsonObserver),
        }
    }
}
