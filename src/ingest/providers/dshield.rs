// src/ingest/providers/dshield.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, trace, warn};

use crate::ingest::error::{FetchError, MalformedRecordError};
use crate::ingest::fallback::FallbackCache;
use crate::ingest::http::{HttpRequest, HttpTransport};
use crate::ingest::retry::RetryPolicy;
use crate::ingest::types::{AttackRecord, Batch, Fetcher, ParseStrategy, PipelineKind};

pub const DEFAULT_FEED_URL: &str = "https://isc.sans.edu/feeds/topips.txt";
pub const DEFAULT_FALLBACK_PATH: &str = "dshield_fallback.txt";

const PIPELINE: PipelineKind = PipelineKind::DShield;

/// Text feed fetcher: bounded retries with linear backoff, then the
/// on-disk copy of the last good payload.
pub struct DShieldFetcher<T> {
    transport: T,
    request: HttpRequest,
    retry: RetryPolicy,
    cache: FallbackCache,
}

impl<T: HttpTransport> DShieldFetcher<T> {
    pub fn new(transport: T, feed_url: &str, retry: RetryPolicy, cache: FallbackCache) -> Self {
        Self {
            transport,
            request: HttpRequest::get(feed_url).header("Accept", "text/plain"),
            retry,
            cache,
        }
    }

    fn fall_back(&self) -> Result<String, FetchError> {
        match self.cache.load() {
            Ok(Some(body)) => {
                warn!(
                    pipeline = %PIPELINE,
                    path = %self.cache.path().display(),
                    bytes = body.len(),
                    "live fetch exhausted; serving stale fallback payload"
                );
                Ok(body)
            }
            Ok(None) => {
                error!(pipeline = %PIPELINE, "all attempts failed and no fallback cache exists");
                Err(FetchError::NoFallback {
                    pipeline: PIPELINE.name(),
                })
            }
            Err(source) => {
                error!(pipeline = %PIPELINE, error = %source, "fallback cache unreadable");
                Err(FetchError::Cache {
                    pipeline: PIPELINE.name(),
                    source,
                })
            }
        }
    }
}

#[async_trait]
impl<T: HttpTransport> Fetcher for DShieldFetcher<T> {
    type Payload = String;

    async fn fetch(&self) -> Result<String, FetchError> {
        let max = self.retry.max_attempts;
        for attempt in 1..=max {
            info!(pipeline = %PIPELINE, attempt, max_attempts = max, url = %self.request.url, "fetching feed");
            match self.transport.get_text(&self.request).await {
                Ok(body) => {
                    if let Err(e) = self.cache.store(&body) {
                        warn!(
                            pipeline = %PIPELINE,
                            path = %self.cache.path().display(),
                            error = %e,
                            "could not refresh fallback cache"
                        );
                    }
                    info!(pipeline = %PIPELINE, attempt, bytes = body.len(), "feed fetched");
                    return Ok(body);
                }
                Err(e) => {
                    warn!(pipeline = %PIPELINE, attempt, max_attempts = max, error = %e, "fetch attempt failed");
                    if self.retry.has_next(attempt) {
                        let delay = self.retry.delay_for_attempt(attempt);
                        info!(pipeline = %PIPELINE, delay_secs = delay.as_secs_f64(), "backing off before retry");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        self.fall_back()
    }

    fn name(&self) -> &'static str {
        PIPELINE.name()
    }
}

/// Tab-delimited attack feed parser. Lines are independent; a bad line is
/// logged and skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackFeedStrategy;

/// Columns of one feed line. `observed_on` only exists in the 6-column
/// layout and is not carried into the stored document.
struct FeedLine<'a> {
    ip: &'a str,
    asn: &'a str,
    country_code: &'a str,
    observed_on: Option<&'a str>,
    attack_count: &'a str,
    name: &'a str,
}

impl<'a> FeedLine<'a> {
    fn split(line_no: usize, line: &'a str) -> Result<Self, MalformedRecordError> {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        match fields.as_slice() {
            &[ip, asn, cc, count, name] => Ok(Self {
                ip,
                asn,
                country_code: cc,
                observed_on: None,
                attack_count: count,
                name,
            }),
            &[ip, asn, cc, date, count, name] => Ok(Self {
                ip,
                asn,
                country_code: cc,
                observed_on: Some(date),
                attack_count: count,
                name,
            }),
            other => Err(MalformedRecordError::FieldCount {
                line: line_no,
                count: other.len(),
            }),
        }
    }
}

/// Integer when the field is purely ASCII digits, otherwise `None`.
pub fn parse_count(
    line_no: usize,
    field: &'static str,
    value: &str,
) -> Result<Option<u64>, MalformedRecordError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|_| MalformedRecordError::NumericOverflow {
            line: line_no,
            field,
            value: value.to_string(),
        })
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

impl AttackFeedStrategy {
    pub fn parse_line(
        line_no: usize,
        line: &str,
        ingested_at: DateTime<Utc>,
    ) -> Result<AttackRecord, MalformedRecordError> {
        let cols = FeedLine::split(line_no, line)?;
        if let Some(date) = cols.observed_on {
            trace!(line = line_no, date, "observed date column not retained");
        }
        Ok(AttackRecord {
            source: PIPELINE.name().to_string(),
            ip: cols.ip.to_string(),
            asn: parse_count(line_no, "asn", cols.asn)?,
            country_code: cols.country_code.to_string(),
            attack_count: parse_count(line_no, "attack_count", cols.attack_count)?,
            name: non_empty(cols.name),
            ingestion_timestamp: ingested_at,
        })
    }
}

fn is_skippable(line: &str) -> bool {
    let t = line.trim_start();
    t.is_empty() || t.starts_with('#')
}

impl ParseStrategy for AttackFeedStrategy {
    type Payload = String;
    type Record = AttackRecord;

    fn transform_at(&self, raw: &String, ingested_at: DateTime<Utc>) -> Batch<AttackRecord> {
        let mut batch = Batch::new(ingested_at);
        let mut skipped = 0usize;

        for (idx, raw_line) in raw.split('\n').enumerate() {
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
            if is_skippable(line) {
                continue;
            }
            match Self::parse_line(idx + 1, line, ingested_at) {
                Ok(rec) => batch.push(rec),
                Err(e) => {
                    warn!(pipeline = %PIPELINE, error = %e, "skipping malformed feed line");
                    skipped += 1;
                }
            }
        }

        info!(
            pipeline = %PIPELINE,
            kept = batch.len(),
            skipped,
            "feed lines normalized"
        );
        batch
    }
}
