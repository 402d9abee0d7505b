// src/runner.rs
//! Top-level run wrapper: wires real transports and the SQLite store into
//! the pipeline and turns every failure into a logged `false`.

use tracing::{error, info};

use crate::ingest::config::AppConfig;
use crate::ingest::fallback::FallbackCache;
use crate::ingest::http::ReqwestTransport;
use crate::ingest::providers::dshield::{AttackFeedStrategy, DShieldFetcher};
use crate::ingest::providers::newsapi::{ArticleStrategy, NewsApiFetcher};
use crate::ingest::sink::SqliteConnector;
use crate::ingest::types::PipelineKind;
use crate::ingest::run_pipeline;

fn connector(cfg: &AppConfig) -> SqliteConnector {
    SqliteConnector {
        uri: cfg.store.uri.clone(),
        database: cfg.store.database.clone(),
    }
}

/// Run one pipeline to completion. Never panics and never propagates an
/// error; the return value says whether documents were stored.
pub async fn run(kind: PipelineKind, cfg: &AppConfig) -> bool {
    if let Err(e) = cfg.validate_for(kind) {
        error!(pipeline = %kind, error = %e, "configuration error; run aborted before any I/O");
        return false;
    }

    let result = match kind {
        PipelineKind::NewsApi => {
            let transport = match ReqwestTransport::new(cfg.newsapi.timeout) {
                Ok(t) => t,
                Err(e) => {
                    error!(pipeline = %kind, error = %e, "could not build HTTP client");
                    return false;
                }
            };
            let Ok(api_key) = cfg.newsapi_key() else {
                return false;
            };
            let fetcher = NewsApiFetcher::new(
                transport,
                &cfg.newsapi.base_url,
                api_key,
                &cfg.newsapi.country,
            );
            run_pipeline(&fetcher, &ArticleStrategy, &connector(cfg), &cfg.newsapi.collection).await
        }
        PipelineKind::DShield => {
            let transport = match ReqwestTransport::new(cfg.dshield.timeout) {
                Ok(t) => t,
                Err(e) => {
                    error!(pipeline = %kind, error = %e, "could not build HTTP client");
                    return false;
                }
            };
            let fetcher = DShieldFetcher::new(
                transport,
                &cfg.dshield.feed_url,
                cfg.dshield.retry.clone(),
                FallbackCache::new(&cfg.dshield.fallback_path),
            );
            run_pipeline(
                &fetcher,
                &AttackFeedStrategy,
                &connector(cfg),
                &cfg.dshield.collection,
            )
            .await
        }
    };

    match result {
        Ok(outcome) => {
            info!(
                pipeline = %kind,
                status = ?outcome.status,
                inserted = outcome.inserted,
                "run finished"
            );
            outcome.succeeded()
        }
        Err(e) => {
            error!(pipeline = %kind, error = %e, "ETL run aborted");
            false
        }
    }
}

/// Run several pipelines one after another. Later pipelines still run when
/// an earlier one fails.
pub async fn run_all(kinds: &[PipelineKind], cfg: &AppConfig) -> bool {
    let mut all_ok = true;
    for &kind in kinds {
        all_ok &= run(kind, cfg).await;
    }
    all_ok
}
