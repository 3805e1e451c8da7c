//! Political news ingestion from JSON news APIs (NewsAPI and GNews, both key
//! gated). Articles are classified, enriched with headline gematria, and
//! upserted on (timestamp, source, headline hash).

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde::Deserialize;
use std::time::Duration as StdDuration;

use crate::entities::{political_news, prelude::PoliticalNews};
use crate::services::news_classifier::{classify, headline_hash, is_political};
use crate::services::numerology::gematria_all_ciphers;
use crate::services::retry::retry_with_backoff;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const FETCH_WINDOW_HOURS: i64 = 4;
const PAGE_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedArticle {
    pub timestamp: DateTime<Utc>,
    pub source_name: String,
    pub headline: String,
    pub url: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<NewsApiSource>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

#[derive(Clone)]
pub struct NewsService {
    client: Client,
    newsapi_key: String,
    gnews_api_key: String,
}

impl NewsService {
    pub fn new(newsapi_key: String, gnews_api_key: String) -> Self {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");
        NewsService {
            client,
            newsapi_key,
            gnews_api_key,
        }
    }

    pub fn is_available(&self) -> bool {
        !self.newsapi_key.is_empty() || !self.gnews_api_key.is_empty()
    }

    async fn fetch_newsapi(&self) -> Option<Vec<FetchedArticle>> {
        if self.newsapi_key.is_empty() {
            return None;
        }
        let from = (Utc::now() - Duration::hours(FETCH_WINDOW_HOURS)).to_rfc3339();
        let body: NewsApiResponse = retry_with_backoff("newsapi", || async {
            self.client
                .get("https://newsapi.org/v2/everything")
                .query(&[
                    ("q", "cryptocurrency regulation"),
                    ("from", from.as_str()),
                    ("sortBy", "publishedAt"),
                    ("language", "en"),
                    ("pageSize", "20"),
                    ("apiKey", self.newsapi_key.as_str()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json::<NewsApiResponse>()
                .await
        })
        .await
        .ok()?;

        Some(
            body.articles
                .into_iter()
                .take(PAGE_LIMIT)
                .filter_map(|a| {
                    let headline = a.title?;
                    Some(FetchedArticle {
                        timestamp: a
                            .published_at
                            .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
                            .map(|t| t.with_timezone(&Utc))
                            .unwrap_or_else(Utc::now),
                        source_name: a
                            .source
                            .and_then(|s| s.name)
                            .unwrap_or_else(|| "NewsAPI".to_string()),
                        headline,
                        url: a.url,
                        summary: a.description,
                    })
                })
                .collect(),
        )
    }

    async fn fetch_gnews(&self) -> Option<Vec<FetchedArticle>> {
        if self.gnews_api_key.is_empty() {
            return None;
        }
        let from = (Utc::now() - Duration::hours(FETCH_WINDOW_HOURS))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();
        let body: NewsApiResponse = retry_with_backoff("gnews", || async {
            self.client
                .get("https://gnews.io/api/v4/search")
                .query(&[
                    ("q", "cryptocurrency policy"),
                    ("from", from.as_str()),
                    ("lang", "en"),
                    ("max", "20"),
                    ("token", self.gnews_api_key.as_str()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json::<NewsApiResponse>()
                .await
        })
        .await
        .ok()?;

        Some(
            body.articles
                .into_iter()
                .take(PAGE_LIMIT)
                .filter_map(|a| {
                    let headline = a.title?;
                    Some(FetchedArticle {
                        timestamp: a
                            .published_at
                            .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
                            .map(|t| t.with_timezone(&Utc))
                            .unwrap_or_else(Utc::now),
                        source_name: a
                            .source
                            .and_then(|s| s.name)
                            .unwrap_or_else(|| "GNews".to_string()),
                        headline,
                        url: a.url,
                        summary: a.description,
                    })
                })
                .collect(),
        )
    }

    pub async fn fetch_all(&self) -> Vec<FetchedArticle> {
        let mut articles = Vec::new();
        if let Some(batch) = self.fetch_newsapi().await {
            tracing::info!(count = batch.len(), "NewsAPI articles fetched");
            articles.extend(batch);
        }
        if let Some(batch) = self.fetch_gnews().await {
            tracing::info!(count = batch.len(), "GNews articles fetched");
            articles.extend(batch);
        }
        articles
    }
}

fn dec(v: f64) -> Option<Decimal> {
    Decimal::from_f64((v * 10_000.0).round() / 10_000.0)
}

/// Classify and store a batch. Returns the number of political articles kept.
pub async fn classify_and_store(
    db: &DatabaseConnection,
    articles: &[FetchedArticle],
) -> Result<usize, DbErr> {
    let mut stored = 0;
    for article in articles {
        let text = match &article.summary {
            Some(s) => format!("{} {}", article.headline, s),
            None => article.headline.clone(),
        };
        if !is_political(&text) {
            continue;
        }

        let classification = classify(&article.headline, article.summary.as_deref());
        let gematria = gematria_all_ciphers(&article.headline);

        // Mention velocity: similar-category articles stored in the last hour.
        let velocity = PoliticalNews::find()
            .filter(political_news::Column::Timestamp.gte(article.timestamp - Duration::hours(1)))
            .filter(political_news::Column::Category.eq(classification.category.clone()))
            .count(db)
            .await? as i32;

        let row = political_news::ActiveModel {
            timestamp: Set(article.timestamp),
            source_name: Set(article.source_name.clone()),
            headline_hash: Set(headline_hash(&article.headline)),
            headline: Set(article.headline.chars().take(500).collect()),
            source_url: Set(article.url.clone()),
            summary: Set(article.summary.clone()),
            category: Set(Some(classification.category.clone())),
            subcategory: Set(classification.subcategory.clone()),
            crypto_relevance: Set(dec(classification.crypto_relevance)),
            sentiment: Set(dec(classification.sentiment)),
            urgency: Set(dec(classification.urgency)),
            entities: Set(None),
            headline_gematria: Set(serde_json::to_value(&gematria).ok()),
            mention_velocity: Set(Some(velocity)),
        };
        PoliticalNews::insert(row)
            .on_conflict(
                OnConflict::columns([
                    political_news::Column::Timestamp,
                    political_news::Column::SourceName,
                    political_news::Column::HeadlineHash,
                ])
                .update_columns([
                    political_news::Column::Category,
                    political_news::Column::Subcategory,
                    political_news::Column::CryptoRelevance,
                    political_news::Column::Sentiment,
                    political_news::Column::Urgency,
                    political_news::Column::HeadlineGematria,
                    political_news::Column::MentionVelocity,
                ])
                .to_owned(),
            )
            .exec(db)
            .await?;
        stored += 1;
    }

    if stored > 0 {
        tracing::info!(count = stored, "Political news stored");
    }
    Ok(stored)
}
