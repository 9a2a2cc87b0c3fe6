//! Typed error taxonomy for the pipeline's public seams.
//!
//! Non-fatal kinds (lexical skips, ignored JSON, type widening, chunk
//! failures) are never exceptions here; they are counted on [`Diagnostics`]
//! and surfaced in the run summary. Only the fatal kinds below get a
//! concrete variant, so a caller can match on fatal-vs-recoverable without
//! string-sniffing an `anyhow` message.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("io error at {path}: {source}")]
    IoFatal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("analytical engine rejected step `{step}`: {source}")]
    EngineExec {
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Per-run counters for the non-fatal error kinds named in the error-handling
/// design (lexical skips, ignored JSON, widened columns, failed chunks).
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub lexical_skips: AtomicU64,
    pub json_ignored: AtomicU64,
    pub type_widens: AtomicU64,
    pub chunk_failures: AtomicU64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lexical_skip(&self) {
        self.lexical_skips.fetch_add(1, Ordering::Relaxed);
        log::warn!("lexical skip: truncated or malformed row discarded");
    }

    pub fn record_json_ignored(&self) {
        self.json_ignored.fetch_add(1, Ordering::Relaxed);
        log::debug!("json ignored: `data` value was not a usable JSON object");
    }

    pub fn record_type_widen(&self, column: &str) {
        self.type_widens.fetch_add(1, Ordering::Relaxed);
        log::warn!("type widen: column `{column}` widened to string");
    }

    pub fn record_chunk_failure(&self, chunk_id: &str, error: &anyhow::Error) {
        self.chunk_failures.fetch_add(1, Ordering::Relaxed);
        log::error!("chunk failure: chunk `{chunk_id}` failed: {error:#}");
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            lexical_skips: self.lexical_skips.load(Ordering::Relaxed),
            json_ignored: self.json_ignored.load(Ordering::Relaxed),
            type_widens: self.type_widens.load(Ordering::Relaxed),
            chunk_failures: self.chunk_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct DiagnosticsSnapshot {
    pub lexical_skips: u64,
    pub json_ignored: u64,
    pub type_widens: u64,
    pub chunk_failures: u64,
}

impl std::fmt::Display for DiagnosticsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rows skipped, {} json ignored, {} columns widened, {} chunks failed",
            self.lexical_skips, self.json_ignored, self.type_widens, self.chunk_failures
        )
    }
}
