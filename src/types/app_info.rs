//! Normalized store listing record threaded through the pipeline

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Placeholder used for store fields that were not published
pub const NOT_AVAILABLE: &str = "N/A";

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

fn not_available_value() -> Value {
    Value::String(NOT_AVAILABLE.to_string())
}

fn free_text() -> String {
    "Free".to_string()
}

/// Permission group name -> permissions in that group
pub type Permissions = BTreeMap<String, Vec<String>>;

/// Normalized description of one store listing.
///
/// Enrichment fields stay `None` until the enricher fills them and are left
/// out of the serialized record while absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub app_id: String,
    #[serde(default)]
    pub categories: Vec<Value>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub content_rating: String,
    #[serde(default = "not_available")]
    pub content_rating_description: String,
    #[serde(default = "not_available")]
    pub currency: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub developer: DeveloperInfo,
    #[serde(default)]
    pub features: AppFeatures,
    #[serde(default)]
    pub has_in_app_purchases: bool,
    #[serde(default = "not_available")]
    pub in_app_product_price: String,
    #[serde(default)]
    pub header_image: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub media: MediaInfo,
    #[serde(default)]
    pub metrics: AppMetrics,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "free_text")]
    pub price_text: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: VersionInfo,
    #[serde(default)]
    pub comments: Vec<Value>,
    /// Every store field the normalizer did not recognize
    #[serde(default)]
    pub extra: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_valid: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_content: Option<String>,
}

/// Developer block of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default = "not_available")]
    pub email: String,
    #[serde(default = "not_available")]
    pub privacy_policy: String,
    #[serde(default = "not_available")]
    pub website: String,
    #[serde(default)]
    pub legal_name: String,
    #[serde(default = "not_available")]
    pub legal_email: String,
    #[serde(default = "not_available")]
    pub legal_address: String,
}

impl Default for DeveloperInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            id: String::new(),
            email: not_available(),
            privacy_policy: not_available(),
            website: not_available(),
            legal_name: String::new(),
            legal_email: not_available(),
            legal_address: not_available(),
        }
    }
}

impl DeveloperInfo {
    /// Website URL, if the developer published one
    pub fn website_url(&self) -> Option<&str> {
        let website = self.website.trim();
        if website.is_empty() || website == NOT_AVAILABLE {
            None
        } else {
            Some(website)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppFeatures {
    #[serde(default)]
    pub has_ads: bool,
}

/// Screenshots are a plain URL list until the enricher captions them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Screenshots {
    Urls(Vec<String>),
    /// URL -> caption, in listing order
    Described(Map<String, Value>),
}

impl Default for Screenshots {
    fn default() -> Self {
        Screenshots::Urls(Vec::new())
    }
}

impl Screenshots {
    pub fn urls(&self) -> Vec<String> {
        match self {
            Screenshots::Urls(urls) => urls.clone(),
            Screenshots::Described(captions) => captions.keys().cloned().collect(),
        }
    }

    /// Captions of described screenshots; empty before enrichment.
    pub fn captions(&self) -> Vec<String> {
        match self {
            Screenshots::Urls(_) => Vec::new(),
            Screenshots::Described(captions) => captions
                .values()
                .map(|caption| match caption {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    #[serde(default)]
    pub screenshots: Screenshots,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_screenshots: Vec<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub video_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetrics {
    #[serde(default)]
    pub ratings: RatingsInfo,
    #[serde(default)]
    pub reviews: Option<u64>,
    #[serde(default)]
    pub installs: InstallsInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingsInfo {
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub average_text: String,
    #[serde(default)]
    pub total: Option<u64>,
    /// Star rating (1..=5) -> number of ratings
    #[serde(default)]
    pub distribution: BTreeMap<u8, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallsInfo {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub min: Option<u64>,
    #[serde(default)]
    pub max: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    #[serde(default = "not_available")]
    pub number: String,
    #[serde(default = "not_available")]
    pub released: String,
    #[serde(default = "not_available_value")]
    pub updated: Value,
    #[serde(default = "not_available")]
    pub last_updated: String,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            number: not_available(),
            released: not_available(),
            updated: not_available_value(),
            last_updated: not_available(),
        }
    }
}

/// A store review reduced to the fields the analysis uses.
///
/// Values are kept exactly as the store returned them; absent ones are null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default)]
    pub user_name: Value,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub score: Value,
    #[serde(default)]
    pub thumbs_up_count: Value,
}

impl Review {
    /// Pick the four review fields from a raw record, one key at a time.
    /// `text` and `thumbsUp` are read when the canonical keys are missing.
    pub fn from_raw(raw: &Map<String, Value>) -> Self {
        let field = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| raw.get(*key).filter(|value| !value.is_null()))
                .cloned()
                .unwrap_or(Value::Null)
        };

        Self {
            user_name: field(&["userName"]),
            content: field(&["content", "text"]),
            score: field(&["score"]),
            thumbs_up_count: field(&["thumbsUpCount", "thumbsUp"]),
        }
    }
}

impl AppInfo {
    /// Normalize a raw store details record.
    ///
    /// Recognized fields are moved into the typed structure; whatever is left
    /// over lands in `extra`.
    pub fn from_store_details(mut raw: Map<String, Value>) -> Self {
        let raw = &mut raw;

        let contains_ads = take_bool(raw, "containsAds");
        let ad_supported = take_bool(raw, "adSupported");

        let name = take_string(raw, "developer");
        let email = take_string_or(raw, "developerEmail", NOT_AVAILABLE);
        let developer = DeveloperInfo {
            legal_name: name.clone(),
            legal_email: email.clone(),
            name,
            id: take_string(raw, "developerId"),
            email,
            privacy_policy: take_string_or(raw, "privacyPolicy", NOT_AVAILABLE),
            website: take_string_or(raw, "developerWebsite", NOT_AVAILABLE),
            legal_address: take_string_or(raw, "developerAddress", NOT_AVAILABLE),
        };

        let score = take_f64(raw, "score");
        let ratings = RatingsInfo {
            average: score,
            average_text: score.map(|s| s.to_string()).unwrap_or_default(),
            total: take_u64(raw, "ratings"),
            distribution: histogram_distribution(&take(raw, "histogram")),
        };

        let installs_text = take_string(raw, "installs");
        let min_installs = take_u64(raw, "minInstalls");
        let max_installs = take_u64(raw, "realInstalls").or(take_u64(raw, "maxInstalls"));

        let screenshots = match take(raw, "screenshots") {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        let app_id = take_string(raw, "appId");
        let categories = match take(raw, "categories") {
            Value::Array(items) => items,
            _ => Vec::new(),
        };

        let mut app = AppInfo {
            app_id,
            categories,
            category: take_string(raw, "genre"),
            category_id: take_string(raw, "genreId"),
            content_rating: take_string(raw, "contentRating"),
            content_rating_description: take_string_or(
                raw,
                "contentRatingDescription",
                NOT_AVAILABLE,
            ),
            currency: take_string_or(raw, "currency", NOT_AVAILABLE),
            description: take_string(raw, "description"),
            developer,
            features: AppFeatures {
                has_ads: contains_ads && ad_supported,
            },
            has_in_app_purchases: take_bool(raw, "offersIAP"),
            in_app_product_price: take_string_or(raw, "inAppProductPrice", NOT_AVAILABLE),
            header_image: take_string(raw, "headerImage"),
            icon: take_string(raw, "icon"),
            is_free: take_bool(raw, "free"),
            media: MediaInfo {
                screenshots: Screenshots::Urls(screenshots),
                other_screenshots: Vec::new(),
                video: take(raw, "video").as_str().map(str::to_string),
                video_image: take(raw, "videoImage").as_str().map(str::to_string),
            },
            metrics: AppMetrics {
                ratings,
                reviews: take_u64(raw, "reviews"),
                installs: InstallsInfo {
                    text: installs_text,
                    min: min_installs,
                    max: max_installs,
                },
            },
            price: take_f64(raw, "price").unwrap_or(0.0),
            price_text: take_string_or(raw, "priceText", "Free"),
            summary: take_string(raw, "summary"),
            title: take_string(raw, "title"),
            url: take_string(raw, "url"),
            version: VersionInfo {
                number: take_string_or(raw, "version", NOT_AVAILABLE),
                released: take_string_or(raw, "released", NOT_AVAILABLE),
                updated: match take(raw, "updated") {
                    Value::Null => not_available_value(),
                    other => other,
                },
                last_updated: take_string_or(raw, "lastUpdatedOn", NOT_AVAILABLE),
            },
            comments: match take(raw, "comments") {
                Value::Array(items) => items,
                _ => Vec::new(),
            },
            ..Default::default()
        };

        app.extra = std::mem::take(raw);
        app
    }
}

fn take(raw: &mut Map<String, Value>, key: &str) -> Value {
    raw.remove(key).unwrap_or(Value::Null)
}

fn take_string(raw: &mut Map<String, Value>, key: &str) -> String {
    take_string_or(raw, key, "")
}

fn take_string_or(raw: &mut Map<String, Value>, key: &str, default: &str) -> String {
    match take(raw, key) {
        Value::Null => default.to_string(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn take_bool(raw: &mut Map<String, Value>, key: &str) -> bool {
    take(raw, key).as_bool().unwrap_or(false)
}

fn take_f64(raw: &mut Map<String, Value>, key: &str) -> Option<f64> {
    match take(raw, key) {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn take_u64(raw: &mut Map<String, Value>, key: &str) -> Option<u64> {
    match take(raw, key) {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    }
}

/// Star histogram as either `[n1, .., n5]` or `{"1": n1, .., "5": n5}`.
fn histogram_distribution(value: &Value) -> BTreeMap<u8, u64> {
    match value {
        Value::Array(counts) => counts
            .iter()
            .take(5)
            .enumerate()
            .map(|(idx, count)| ((idx + 1) as u8, count.as_u64().unwrap_or(0)))
            .collect(),
        Value::Object(counts) => counts
            .iter()
            .filter_map(|(star, count)| {
                let star: u8 = star.parse().ok()?;
                (1..=5)
                    .contains(&star)
                    .then(|| (star, count.as_u64().unwrap_or(0)))
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_details() -> Map<String, Value> {
        json!({
            "appId": "com.example.wallet",
            "title": "Example Wallet",
            "summary": "Pay and get paid",
            "description": "A wallet app.",
            "developer": "Example Corp",
            "developerId": "Example+Corp",
            "developerEmail": "support@example.com",
            "developerWebsite": "https://example.com",
            "genre": "Finance",
            "genreId": "FINANCE",
            "categories": [{"name": "Finance", "id": "FINANCE"}],
            "containsAds": true,
            "adSupported": false,
            "offersIAP": true,
            "free": true,
            "price": 0,
            "score": 4.25,
            "ratings": 1200,
            "reviews": 300,
            "histogram": [10, 20, 30, 40, 100],
            "installs": "100,000+",
            "minInstalls": 100000,
            "realInstalls": 154321,
            "screenshots": ["https://img/1.png", "https://img/2.png"],
            "contentRating": "Everyone",
            "url": "https://play.google.com/store/apps/details?id=com.example.wallet",
            "recentChanges": "Bug fixes"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_from_store_details_maps_fields() {
        let app = AppInfo::from_store_details(raw_details());

        assert_eq!(app.app_id, "com.example.wallet");
        assert_eq!(app.category, "Finance");
        assert_eq!(app.category_id, "FINANCE");
        assert_eq!(app.developer.name, "Example Corp");
        assert_eq!(app.developer.legal_name, "Example Corp");
        assert_eq!(app.developer.legal_email, "support@example.com");
        assert_eq!(app.developer.legal_address, NOT_AVAILABLE);
        assert_eq!(app.developer.privacy_policy, NOT_AVAILABLE);
        assert!(!app.features.has_ads);
        assert!(app.has_in_app_purchases);
        assert_eq!(app.metrics.ratings.average, Some(4.25));
        assert_eq!(app.metrics.ratings.average_text, "4.25");
        assert_eq!(app.metrics.ratings.distribution.get(&5), Some(&100));
        assert_eq!(app.metrics.installs.max, Some(154321));
        assert_eq!(app.price_text, "Free");
        assert_eq!(app.currency, NOT_AVAILABLE);
        assert_eq!(app.version.number, NOT_AVAILABLE);
        assert_eq!(app.media.screenshots.urls().len(), 2);
    }

    #[test]
    fn test_unrecognized_fields_kept_in_extra() {
        let app = AppInfo::from_store_details(raw_details());

        assert_eq!(app.extra.len(), 1);
        assert_eq!(app.extra["recentChanges"], "Bug fixes");
    }

    #[test]
    fn test_review_from_raw_keeps_each_field() {
        let raw = json!({
            "userName": "a",
            "text": "t",
            "content": "c",
            "score": "5",
            "thumbsUp": -1,
            "replyText": "thanks"
        });
        let review = Review::from_raw(raw.as_object().unwrap());

        assert_eq!(review.user_name, "a");
        assert_eq!(review.content, "c");
        assert_eq!(review.score, "5");
        assert_eq!(review.thumbs_up_count, -1);

        let json = serde_json::to_string(&review).unwrap();
        assert_eq!(
            json,
            r#"{"userName":"a","content":"c","score":"5","thumbsUpCount":-1}"#
        );
    }

    #[test]
    fn test_review_from_raw_aliases_and_missing() {
        let raw = json!({"text": "only text", "score": 4, "thumbsUp": 3});
        let review = Review::from_raw(raw.as_object().unwrap());

        assert!(review.user_name.is_null());
        assert_eq!(review.content, "only text");
        assert_eq!(serde_json::to_value(&review).unwrap()["score"].to_string(), "4");
        assert_eq!(review.thumbs_up_count, 3);
    }

    #[test]
    fn test_histogram_object_form() {
        let dist = histogram_distribution(&json!({"1": 3, "5": 7, "9": 1}));
        assert_eq!(dist.len(), 2);
        assert_eq!(dist[&1], 3);
        assert_eq!(dist[&5], 7);
    }

    #[test]
    fn test_screenshots_deserialize_both_forms() {
        let urls: Screenshots = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(urls.urls(), vec!["a", "b"]);
        assert!(urls.captions().is_empty());

        let described: Screenshots =
            serde_json::from_value(json!({"a": "a login screen", "b": "a chart"})).unwrap();
        assert_eq!(described.urls(), vec!["a", "b"]);
        assert_eq!(described.captions(), vec!["a login screen", "a chart"]);
    }

    #[test]
    fn test_enrichment_fields_omitted_until_set() {
        let app = AppInfo::from_store_details(raw_details());
        let json = serde_json::to_value(&app).unwrap();

        assert!(json.get("reviews").is_none());
        assert!(json.get("emailValid").is_none());
        assert!(json.get("websiteContent").is_none());
        assert!(json["metrics"].get("reviews").is_some());
    }

    #[test]
    fn test_app_info_roundtrips_through_dataset_json() {
        let mut app = AppInfo::from_store_details(raw_details());
        app.website_content = Some("Welcome".to_string());

        let json = serde_json::to_string(&app).unwrap();
        let restored: AppInfo = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, app);
    }

    #[test]
    fn test_website_url_skips_placeholder() {
        let mut developer = DeveloperInfo::default();
        assert_eq!(developer.website_url(), None);

        developer.website = "https://example.com".to_string();
        assert_eq!(developer.website_url(), Some("https://example.com"));
    }
}
