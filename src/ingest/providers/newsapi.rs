// src/ingest/providers/newsapi.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::ingest::error::FetchError;
use crate::ingest::http::{HttpRequest, HttpTransport};
use crate::ingest::types::{
    ArticleRecord, ArticleSource, Batch, Fetcher, ParseStrategy, PipelineKind,
};

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";
pub const DEFAULT_COUNTRY: &str = "us";

const PIPELINE: PipelineKind = PipelineKind::NewsApi;

#[derive(Debug, Deserialize)]
struct TopHeadlinesResponse {
    status: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Option<Vec<Value>>,
}

/// JSON headlines fetcher. Exactly one attempt and no fallback cache:
/// any failure comes back as an empty article list.
pub struct NewsApiFetcher<T> {
    transport: T,
    request: HttpRequest,
}

impl<T: HttpTransport> NewsApiFetcher<T> {
    pub fn new(transport: T, base_url: &str, api_key: &str, country: &str) -> Self {
        let url = format!("{}/top-headlines", base_url.trim_end_matches('/'));
        let request = HttpRequest::get(url)
            .query("country", country)
            .query("apiKey", api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        Self { transport, request }
    }
}

#[async_trait]
impl<T: HttpTransport> Fetcher for NewsApiFetcher<T> {
    type Payload = Vec<Value>;

    async fn fetch(&self) -> Result<Vec<Value>, FetchError> {
        info!(
            pipeline = %PIPELINE,
            url = %self.request.url,
            params = %self.request.redacted_query(),
            "fetching top headlines"
        );

        let body = match self.transport.get_text(&self.request).await {
            Ok(b) => b,
            Err(e) => {
                error!(pipeline = %PIPELINE, error = %e, "error fetching headlines");
                return Ok(Vec::new());
            }
        };

        let resp: TopHeadlinesResponse = match serde_json::from_str(&body) {
            Ok(r) => r,
            Err(e) => {
                error!(pipeline = %PIPELINE, error = %e, "response is not a headlines document");
                return Ok(Vec::new());
            }
        };

        if resp.status.as_deref() != Some("ok") {
            error!(
                pipeline = %PIPELINE,
                status = ?resp.status,
                code = ?resp.code,
                message = ?resp.message,
                "API returned error status"
            );
            return Ok(Vec::new());
        }

        let articles = resp.articles.unwrap_or_default();
        info!(pipeline = %PIPELINE, count = articles.len(), "headlines fetched");
        Ok(articles)
    }

    fn name(&self) -> &'static str {
        PIPELINE.name()
    }
}

/// Reads a field as `T`; wrong JSON types read as null.
fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Value::deserialize(d)?;
    Ok(serde_json::from_value(v).ok())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EntrySource {
    #[serde(deserialize_with = "lenient")]
    id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    name: Option<String>,
}

/// One element of `articles`. Every field is optional; none is required.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArticleEntry {
    #[serde(deserialize_with = "lenient")]
    source: Option<EntrySource>,
    #[serde(deserialize_with = "lenient")]
    author: Option<String>,
    #[serde(deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    description: Option<String>,
    #[serde(deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(rename = "publishedAt", deserialize_with = "lenient")]
    published_at: Option<String>,
    #[serde(deserialize_with = "lenient")]
    content: Option<String>,
}

impl ArticleEntry {
    fn into_record(self, ingested_at: DateTime<Utc>) -> ArticleRecord {
        ArticleRecord {
            source: self.source.map(|s| ArticleSource {
                id: s.id,
                name: s.name,
            }),
            author: self.author,
            title: self.title,
            description: self.description,
            url: self.url,
            published_at: self.published_at,
            content: self.content,
            ingestion_timestamp: ingested_at,
        }
    }
}

/// Copies headline fields verbatim. Never drops an entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleStrategy;

impl ParseStrategy for ArticleStrategy {
    type Payload = Vec<Value>;
    type Record = ArticleRecord;

    fn transform_at(&self, raw: &Vec<Value>, ingested_at: DateTime<Utc>) -> Batch<ArticleRecord> {
        let mut batch = Batch::with_capacity(ingested_at, raw.len());
        for (idx, item) in raw.iter().enumerate() {
            let entry = match ArticleEntry::deserialize(item) {
                Ok(e) => e,
                Err(e) => {
                    warn!(pipeline = %PIPELINE, index = idx, error = %e, "article is not an object; storing empty record");
                    ArticleEntry::default()
                }
            };
            batch.push(entry.into_record(ingested_at));
        }
        info!(pipeline = %PIPELINE, count = batch.len(), "articles normalized");
        batch
    }
}
