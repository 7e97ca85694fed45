//! Store data access and listing collection

pub mod api_client;
pub mod collector;

pub use api_client::StoreApiClient;
pub use collector::Collector;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Review ordering understood by the store API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSort {
    MostRelevant,
    Newest,
}

impl ReviewSort {
    /// Numeric code used by google-play-scraper compatible services.
    pub fn code(&self) -> u8 {
        match self {
            ReviewSort::MostRelevant => 1,
            ReviewSort::Newest => 2,
        }
    }
}

/// One page of reviews to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewQuery {
    pub sort: ReviewSort,
    /// Only reviews with this star rating
    pub score: Option<u8>,
    pub count: usize,
}

/// Raw store data source
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Search hits for `query`; each hit carries at least `appId`.
    async fn search(&self, query: &str, country: &str, hits: usize) -> Result<Vec<Value>>;

    /// Raw details record of one listing.
    async fn app_details(&self, app_id: &str) -> Result<Map<String, Value>>;

    /// Raw review records.
    async fn reviews(&self, app_id: &str, query: ReviewQuery) -> Result<Vec<Value>>;

    /// Raw permission listing, either grouped or as `{permission, type}` rows.
    async fn permissions(&self, app_id: &str) -> Result<Value>;
}
