//! Listing collection: search, details normalization, reviews, permissions

use super::{ReviewQuery, ReviewSort, StoreClient};
use crate::types::{AppInfo, Permissions, Review};
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Collects store listings into normalized [`AppInfo`] records
#[derive(Clone)]
pub struct Collector {
    store: Arc<dyn StoreClient>,
    search_hits: usize,
}

impl Collector {
    pub fn new(store: Arc<dyn StoreClient>, search_hits: usize) -> Self {
        Self { store, search_hits }
    }

    /// App ids of the top search hits.
    pub async fn search_apps(&self, query: &str, country: &str) -> Result<Vec<String>> {
        let hits = self
            .store
            .search(query, country, self.search_hits)
            .await
            .with_context(|| format!("Search for '{}' failed", query))?;

        let ids: Vec<String> = hits
            .iter()
            .filter_map(|hit| hit.get("appId").and_then(Value::as_str))
            .map(str::to_string)
            .take(self.search_hits)
            .collect();

        info!(query = %query, country = %country, hits = ids.len(), "Search complete");
        Ok(ids)
    }

    /// Fetch and normalize the details of one listing.
    pub async fn get_app_details(&self, app_id: &str) -> Result<AppInfo> {
        let raw = self
            .store
            .app_details(app_id)
            .await
            .with_context(|| format!("Failed to fetch details for {}", app_id))?;

        let mut app = AppInfo::from_store_details(raw);
        if app.app_id.is_empty() {
            app.app_id = app_id.to_string();
        }
        Ok(app)
    }

    /// Review sample mixing recency, relevance and every star rating:
    /// `num/4` newest, `num/4` most relevant and `num/10` newest per rating.
    pub async fn get_reviews(&self, app_id: &str, num: usize) -> Result<Vec<Review>> {
        let newest = self
            .store
            .reviews(
                app_id,
                ReviewQuery {
                    sort: ReviewSort::Newest,
                    score: None,
                    count: num / 4,
                },
            )
            .await
            .with_context(|| format!("Failed to fetch newest reviews for {}", app_id))?;

        let relevant = self
            .store
            .reviews(
                app_id,
                ReviewQuery {
                    sort: ReviewSort::MostRelevant,
                    score: None,
                    count: num / 4,
                },
            )
            .await
            .with_context(|| format!("Failed to fetch relevant reviews for {}", app_id))?;

        let balanced = self.get_balanced_reviews(app_id, num / 10).await?;

        let reviews: Vec<Review> = newest
            .into_iter()
            .chain(relevant)
            .chain(balanced)
            .filter_map(reduce_review)
            .collect();

        info!(app_id = %app_id, count = reviews.len(), "Reviews collected");
        Ok(reviews)
    }

    /// `per_rating` newest reviews for each star rating 1..=5.
    pub async fn get_balanced_reviews(
        &self,
        app_id: &str,
        per_rating: usize,
    ) -> Result<Vec<Value>> {
        let mut all_reviews = Vec::new();

        for rating in 1..=5u8 {
            let page = self
                .store
                .reviews(
                    app_id,
                    ReviewQuery {
                        sort: ReviewSort::Newest,
                        score: Some(rating),
                        count: per_rating,
                    },
                )
                .await
                .with_context(|| {
                    format!("Failed to fetch {}-star reviews for {}", rating, app_id)
                })?;
            all_reviews.extend(page);
        }

        Ok(all_reviews)
    }

    /// Permission groups of one listing.
    pub async fn get_permissions(&self, app_id: &str) -> Result<Permissions> {
        let raw = self
            .store
            .permissions(app_id)
            .await
            .with_context(|| format!("Failed to fetch permissions for {}", app_id))?;
        Ok(group_permissions(&raw))
    }

    /// Details of every search hit; hits whose details fail are skipped.
    pub async fn create_dataset(&self, query: &str, country: &str) -> Result<Vec<AppInfo>> {
        let ids = self.search_apps(query, country).await?;
        let mut dataset = Vec::with_capacity(ids.len());

        for (i, app_id) in ids.iter().enumerate() {
            match self.get_app_details(app_id).await {
                Ok(app) => dataset.push(app),
                Err(e) => {
                    warn!(index = i, app_id = %app_id, error = %format!("{:#}", e), "Skipping app");
                }
            }
        }

        info!(query = %query, apps = dataset.len(), "Dataset collected");
        Ok(dataset)
    }
}

/// Keep only the review fields the analysis uses.
fn reduce_review(raw: Value) -> Option<Review> {
    match raw {
        Value::Object(map) => Some(Review::from_raw(&map)),
        other => {
            warn!(record = %other, "Skipping review that is not an object");
            None
        }
    }
}

/// Normalize a permission listing into group -> permissions.
pub fn group_permissions(raw: &Value) -> Permissions {
    let mut groups = Permissions::new();

    match raw {
        Value::Object(map) => {
            for (group, entries) in map {
                let entries = match entries {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|item| item.as_str().map(str::to_string))
                        .collect(),
                    _ => Vec::new(),
                };
                groups.insert(group.clone(), entries);
            }
        }
        Value::Array(rows) => {
            for row in rows {
                let Some(permission) = row.get("permission").and_then(Value::as_str) else {
                    continue;
                };
                let group = row
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("Other")
                    .to_string();
                groups.entry(group).or_default().push(permission.to_string());
            }
        }
        _ => {}
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_search_apps_returns_ids() {
        let store = FakeStore::new()
            .with_app("com.a", json!({"title": "A"}))
            .with_app("com.b", json!({"title": "B"}));
        let collector = Collector::new(Arc::new(store), 10);

        let ids = collector.search_apps("wallet", "in").await.unwrap();
        assert_eq!(ids, vec!["com.a", "com.b"]);
    }

    #[tokio::test]
    async fn test_review_sampling_counts_and_fields() {
        let store = Arc::new(FakeStore::new().with_app("com.a", json!({})));
        let collector = Collector::new(store.clone(), 10);

        let reviews = collector.get_reviews("com.a", 100).await.unwrap();

        // 25 newest + 25 relevant + 5 ratings x 10
        assert_eq!(reviews.len(), 100);
        let queries = store.review_queries();
        assert_eq!(queries.len(), 7);
        assert_eq!(queries[0].sort, ReviewSort::Newest);
        assert_eq!(queries[0].count, 25);
        assert_eq!(queries[1].sort, ReviewSort::MostRelevant);
        assert_eq!(queries[2].score, Some(1));
        assert_eq!(queries[6].score, Some(5));
        assert_eq!(queries[6].count, 10);

        let first = serde_json::to_value(&reviews[0]).unwrap();
        let keys: Vec<&String> = first.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["userName", "content", "score", "thumbsUpCount"]);
        assert!(first.get("replyText").is_none());
    }

    #[test]
    fn test_reduce_review_keeps_mismatched_fields() {
        let review = reduce_review(json!({
            "userName": "a",
            "content": "c",
            "score": "5",
            "thumbsUpCount": -1
        }))
        .unwrap();

        assert_eq!(review.user_name, "a");
        assert_eq!(review.content, "c");
        assert_eq!(review.score, "5");
        assert_eq!(review.thumbs_up_count, -1);
        assert!(reduce_review(json!("not a review")).is_none());
    }

    #[tokio::test]
    async fn test_get_app_details_normalizes() {
        let store = FakeStore::new().with_app(
            "com.a",
            json!({"title": "A", "developer": "Dev", "containsAds": true, "adSupported": true}),
        );
        let collector = Collector::new(Arc::new(store), 10);

        let app = collector.get_app_details("com.a").await.unwrap();
        assert_eq!(app.app_id, "com.a");
        assert_eq!(app.developer.legal_name, "Dev");
        assert!(app.features.has_ads);
    }

    #[tokio::test]
    async fn test_create_dataset_skips_failed_details() {
        let store = FakeStore::new()
            .with_app("com.a", json!({"title": "A"}))
            .with_app("com.broken", json!({}))
            .with_app("com.c", json!({"title": "C"}))
            .failing_details("com.broken");
        let collector = Collector::new(Arc::new(store), 10);

        let dataset = collector.create_dataset("games", "us").await.unwrap();
        let ids: Vec<&str> = dataset.iter().map(|app| app.app_id.as_str()).collect();
        assert_eq!(ids, vec!["com.a", "com.c"]);
    }

    #[test]
    fn test_group_permissions_from_rows() {
        let raw = json!([
            {"permission": "read your contacts", "type": "Contacts"},
            {"permission": "approximate location", "type": "Location"},
            {"permission": "precise location", "type": "Location"},
            {"permission": "full network access"}
        ]);
        let groups = group_permissions(&raw);

        assert_eq!(groups["Location"].len(), 2);
        assert_eq!(groups["Other"], vec!["full network access"]);
    }

    #[test]
    fn test_group_permissions_from_map() {
        let raw = json!({"Camera": ["take pictures"], "Storage": []});
        let groups = group_permissions(&raw);

        assert_eq!(groups["Camera"], vec!["take pictures"]);
        assert!(groups["Storage"].is_empty());
        assert!(group_permissions(&json!(null)).is_empty());
    }
}
