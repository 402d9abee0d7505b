// src/ingest/mod.rs
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod providers;
pub mod retry;
pub mod sink;
pub mod types;

use tracing::{error, info};

use crate::ingest::error::FetchError;
use crate::ingest::sink::{StoreConnector, StoreSession};
use crate::ingest::types::{Fetcher, ParseStrategy, RawPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    Load,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Load => "load",
            Stage::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Done,
    /// Stopped early because the named stage produced nothing.
    Failed(Stage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub pipeline: &'static str,
    pub status: RunStatus,
    pub inserted: usize,
}

impl RunOutcome {
    fn failed(pipeline: &'static str, stage: Stage) -> Self {
        error!(pipeline, stage = %stage, "ETL pipeline failed");
        Self {
            pipeline,
            status: RunStatus::Failed(stage),
            inserted: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Done
    }
}

fn enter(pipeline: &'static str, stage: Stage) {
    info!(pipeline, stage = %stage, "entering stage");
}

/// One independent run: extract, transform, load. Each stage's empty
/// result ends the run as failed; no retries happen at this level.
///
/// `Err` is returned only when extraction found neither live data nor a
/// fallback payload. The store connection exists only for the Load stage.
pub async fn run_pipeline<F, P, C>(
    fetcher: &F,
    strategy: &P,
    connector: &C,
    collection: &str,
) -> Result<RunOutcome, FetchError>
where
    F: Fetcher,
    F::Payload: RawPayload,
    P: ParseStrategy<Payload = F::Payload>,
    C: StoreConnector,
{
    let pipeline = fetcher.name();

    enter(pipeline, Stage::Extract);
    let raw = fetcher.fetch().await?;
    if raw.is_blank() {
        error!(pipeline, "extraction returned no data");
        return Ok(RunOutcome::failed(pipeline, Stage::Extract));
    }

    enter(pipeline, Stage::Transform);
    let batch = strategy.transform(&raw);
    drop(raw);
    if batch.is_empty() {
        error!(pipeline, "no records after transformation");
        return Ok(RunOutcome::failed(pipeline, Stage::Transform));
    }

    enter(pipeline, Stage::Load);
    let count = batch.len();
    let loaded = {
        let mut session = match StoreSession::open(connector) {
            Ok(s) => s,
            Err(e) => {
                error!(pipeline, error = %e, "document store connection error");
                return Ok(RunOutcome::failed(pipeline, Stage::Load));
            }
        };
        sink::load(&mut *session, collection, batch)
    };
    if !loaded {
        return Ok(RunOutcome::failed(pipeline, Stage::Load));
    }

    enter(pipeline, Stage::Done);
    info!(pipeline, collection, inserted = count, "ETL pipeline completed successfully");
    Ok(RunOutcome {
        pipeline,
        status: RunStatus::Done,
        inserted: count,
    })
}
