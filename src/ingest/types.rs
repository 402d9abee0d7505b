// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ingest::error::FetchError;

/// Which connector a run belongs to. Also keys the fallback cache and the
/// default target collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    NewsApi,
    DShield,
}

impl PipelineKind {
    pub fn name(self) -> &'static str {
        match self {
            PipelineKind::NewsApi => "newsapi",
            PipelineKind::DShield => "dshield",
        }
    }

    pub fn default_collection(self) -> &'static str {
        match self {
            PipelineKind::NewsApi => "newsapi_raw",
            PipelineKind::DShield => "dshield_raw",
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `source` object attached to every NewsAPI article.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ArticleSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Canonical document for one NewsAPI headline.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ArticleRecord {
    pub source: Option<ArticleSource>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    pub content: Option<String>,
    pub ingestion_timestamp: DateTime<Utc>,
}

/// Canonical document for one DShield feed line.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AttackRecord {
    pub source: String,
    pub ip: String,
    pub asn: Option<u64>,
    pub country_code: String,
    pub attack_count: Option<u64>,
    pub name: Option<String>,
    pub ingestion_timestamp: DateTime<Utc>,
}

/// Records produced by one transform call. Every record was stamped with
/// `ingested_at`, captured once when the batch was opened.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<R> {
    ingested_at: DateTime<Utc>,
    records: Vec<R>,
}

impl<R> Batch<R> {
    pub fn new(ingested_at: DateTime<Utc>) -> Self {
        Self {
            ingested_at,
            records: Vec::new(),
        }
    }

    pub fn with_capacity(ingested_at: DateTime<Utc>, capacity: usize) -> Self {
        Self {
            ingested_at,
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn ingested_at(&self) -> DateTime<Utc> {
        self.ingested_at
    }

    pub fn push(&mut self, record: R) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }
}

/// Payload as handed from a fetcher to its strategy.
pub trait RawPayload {
    /// Nothing worth transforming.
    fn is_blank(&self) -> bool;
}

impl RawPayload for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl RawPayload for Vec<serde_json::Value> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// Extract stage. Implementations own their own retry and fallback policy.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    type Payload: Send;

    async fn fetch(&self) -> Result<Self::Payload, FetchError>;
    fn name(&self) -> &'static str;
}

/// Transform stage. Never fails as a whole; bad entries are skipped or
/// nulled out individually.
pub trait ParseStrategy {
    type Payload;
    type Record: Serialize;

    fn transform_at(&self, raw: &Self::Payload, ingested_at: DateTime<Utc>)
        -> Batch<Self::Record>;

    fn transform(&self, raw: &Self::Payload) -> Batch<Self::Record> {
        self.transform_at(raw, Utc::now())
    }
}
