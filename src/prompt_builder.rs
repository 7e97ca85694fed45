//! Prompt construction for the analysis stages.
//!
//! Every prompt embeds the same base block (output format plus title,
//! summary and description), a fixed guideline list, and the slice of the
//! app record the stage is about.

use crate::tokens::TokenBudget;
use crate::types::{AnalysisDimension, AppInfo, NOT_AVAILABLE};
use serde::Serialize;
use serde_json::Value;

/// Prepended to every analysis prompt before it is sent
pub const SYSTEM_PREAMBLE: &str = "You are an AI expert in fraud detection for mobile apps. \
Respond with valid JSON only in this format: \
{\"type\": \"fraud\"|\"genuine\"|\"suspected\", \"reason\": \"Concise explanation (300 char max)\"}\n\n";

/// Record keys left out of the description prompt
const DESCRIPTION_EXCLUDED_KEYS: [&str; 4] = ["extra", "reviews", "emailValid", "websiteContent"];

/// Builds the per-dimension and overall prompts for one app.
pub struct PromptBuilder {
    tokens: TokenBudget,
    token_limit: usize,
}

impl PromptBuilder {
    pub fn new(tokenizer_model: &str, token_limit: usize) -> Self {
        Self {
            tokens: TokenBudget::new(tokenizer_model),
            token_limit,
        }
    }

    /// Prompt for one analysis dimension.
    pub fn for_dimension(&self, dimension: AnalysisDimension, app: &AppInfo) -> String {
        match dimension {
            AnalysisDimension::Developer => self.developer(app),
            AnalysisDimension::Images => self.images(app),
            AnalysisDimension::Reviews => self.reviews(app),
            AnalysisDimension::Description => self.description(app),
            AnalysisDimension::Permissions => self.permissions(app),
        }
    }

    /// Shared output-format and app-details block.
    pub fn base(app: &AppInfo) -> String {
        format!(
            "Provide a single structured JSON output in this format:\n\
             {{ \"type\": \"fraud\"|\"genuine\"|\"suspected\", \"reason\": \"Concise explanation (300 char max)\" }}\n\
             \n\
             App details:\n\
             Title: {}\n\
             Summary: {}\n\
             Description: {}\n",
            app.title, app.summary, app.description
        )
    }

    pub fn developer(&self, app: &AppInfo) -> String {
        let email_validity = app
            .email_valid
            .as_ref()
            .map(|validity| Value::Object(validity.clone()).to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let website = app.website_content.as_deref().unwrap_or(NOT_AVAILABLE);

        let prompt = format!(
            "Analyze the following app developer information for potential fraud and provide your reasoning.\n\
             Guidelines -\n\
             1. I have checked if the email is valid and if the website is genuine.\n\
             2. You are given the developer's email validity and the website content.\n\
             3. Check if the developer's website contains any suspicious or fraudulent elements.\n\
             \n\
             {}\n\
             Developer Information:\n\
             {}\n\
             Email Validity: {}\n\
             Website Content: {}\n",
            Self::base(app),
            pretty(&app.developer),
            email_validity,
            website
        );
        self.tokens.truncate(&prompt, self.token_limit)
    }

    pub fn images(&self, app: &AppInfo) -> String {
        format!(
            "Analyze the following app screenshots descriptions for potential fraud and provide your reasoning.\n\
             Guidelines -\n\
             1. Identify any discrepancies or suspicious elements that may indicate fraudulent activity.\n\
             2. Check if the screenshots match the app's description and functionality.\n\
             3. Check if the screenshots are fake, spam, misleading, or irrelevant. (Check if the image descriptions are related to the app description)\n\
             \n\
             {}\n\
             App Screenshot Descriptions:\n\
             {}\n",
            Self::base(app),
            pretty(&app.media.screenshots.captions())
        )
    }

    pub fn reviews(&self, app: &AppInfo) -> String {
        let reviews = app.reviews.clone().unwrap_or_default();
        let prompt = format!(
            "Analyze the following app reviews for potential fraud and provide your reasoning.\n\
             Guidelines -\n\
             1. Identify any discrepancies or suspicious elements that may indicate fraudulent activity.\n\
             2. Check if the reviews match the app's description and functionality.\n\
             3. Check if reviews are fake, spam, misleading, or irrelevant.\n\
             4. Check if the reviews are from verified users or bots.\n\
             5. Check if the reviews contain repeated phrases or words or emojis.\n\
             \n\
             {}\n\
             Reviews:\n\
             {}\n",
            Self::base(app),
            pretty(&reviews)
        );
        self.tokens.truncate(&prompt, self.token_limit)
    }

    /// Embeds a copy of the record without the bulky or already-analyzed keys.
    pub fn description(&self, app: &AppInfo) -> String {
        let mut record = serde_json::to_value(app).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut record {
            for key in DESCRIPTION_EXCLUDED_KEYS {
                map.remove(key);
            }
        }

        format!(
            "Analyze the following app description and basic details for potential fraud and provide your reasoning.\n\
             Guidelines -\n\
             1. Identify any discrepancies or suspicious elements that may indicate fraudulent activity.\n\
             2. Check if the description matches the app's functionality and features.\n\
             3. Check if the description is misleading or irrelevant.\n\
             4. Check if the app description aligns with the app's title, summary and screenshot descriptions, and permissions.\n\
             \n\
             {}\n\
             App Description:\n\
             {}\n",
            Self::base(app),
            pretty(&record)
        )
    }

    pub fn permissions(&self, app: &AppInfo) -> String {
        let permissions = app.permissions.clone().unwrap_or_default();
        format!(
            "Analyze the following app permissions for potential fraud and provide your reasoning accordingly.\n\
             Guidelines -\n\
             1. Identify any discrepancies or suspicious elements that may indicate fraudulent activity.\n\
             2. Check if the permissions are necessary for the app's functionality.\n\
             3. Check if the permissions are excessive or intrusive.\n\
             4. Check if the permissions are related to sensitive data or device features.\n\
             \n\
             {}\n\
             Permissions:\n\
             {}\n",
            Self::base(app),
            pretty(&permissions)
        )
    }

    /// Arbitration prompt over the five dimension results.
    pub fn overall(&self, results: &Value, app: &AppInfo) -> String {
        format!(
            "Analyze the following fraud detection results for the app and provide your reasoning accordingly.\n\
             1. Consider the results of all the analyses performed on the app.\n\
             2. Provide a final assessment of the app's potential fraud status.\n\
             3. Provide a summary of the key findings from each analysis.\n\
             Your priorities are - Developer Analysis > Image Analysis > Review Analysis > Description Analysis > Permissions Analysis.\n\
             4. Provide a final assessment of the app's potential fraud status.\n\
             5. If it is suspected, rethink and try to reason it out, and maybe resolve it to either genuine or fraud.\n\
             {}\n\
             Results:\n\
             {}\n",
            Self::base(app),
            pretty(results)
        )
    }

    /// Full request text for a stage prompt.
    pub fn with_preamble(prompt: &str) -> String {
        format!("{}{}", SYSTEM_PREAMBLE, prompt)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new("gpt-4", 8000)
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Review, Screenshots};
    use serde_json::{json, Map};

    fn sample_app() -> AppInfo {
        let mut app = AppInfo {
            app_id: "com.example.loans".to_string(),
            title: "Quick Loans".to_string(),
            summary: "Instant cash".to_string(),
            description: "Get a loan in 5 minutes.".to_string(),
            ..Default::default()
        };
        app.developer.name = "Loan Shark Ltd".to_string();
        app.developer.email = "boss@loanshark.example".to_string();
        app.extra.insert("secretField".to_string(), json!("hidden"));
        app.reviews = Some(vec![Review {
            user_name: json!("Asha"),
            content: json!("Stole my data!!"),
            score: json!(1),
            thumbs_up_count: json!(12),
        }]);
        app.website_content = Some("Welcome to Loan Shark".to_string());
        let mut validity = Map::new();
        validity.insert("format_valid".to_string(), json!(true));
        app.email_valid = Some(validity);
        let mut captions = Map::new();
        captions.insert("https://img/1.png".to_string(), json!("A loan approval screen"));
        app.media.screenshots = Screenshots::Described(captions);
        let mut permissions = crate::types::Permissions::new();
        permissions.insert("Contacts".to_string(), vec!["read your contacts".to_string()]);
        app.permissions = Some(permissions);
        app
    }

    #[test]
    fn test_base_contains_app_details() {
        let base = PromptBuilder::base(&sample_app());
        assert!(base.contains("Title: Quick Loans"));
        assert!(base.contains("Summary: Instant cash"));
        assert!(base.contains("Description: Get a loan in 5 minutes."));
        assert!(base.contains("\"fraud\"|\"genuine\"|\"suspected\""));
    }

    #[test]
    fn test_developer_prompt_fields() {
        let prompt = PromptBuilder::default().developer(&sample_app());
        assert!(prompt.contains("Loan Shark Ltd"));
        assert!(prompt.contains("boss@loanshark.example"));
        assert!(prompt.contains("Email Validity: {\"format_valid\":true}"));
        assert!(prompt.contains("Website Content: Welcome to Loan Shark"));
    }

    #[test]
    fn test_developer_prompt_without_enrichment() {
        let app = AppInfo::default();
        let prompt = PromptBuilder::default().developer(&app);
        assert!(prompt.contains("Email Validity: N/A"));
        assert!(prompt.contains("Website Content: N/A"));
    }

    #[test]
    fn test_images_prompt_uses_captions() {
        let prompt = PromptBuilder::default().images(&sample_app());
        assert!(prompt.contains("A loan approval screen"));
        assert!(!prompt.contains("https://img/1.png"));
    }

    #[test]
    fn test_reviews_prompt_fields() {
        let prompt = PromptBuilder::default().reviews(&sample_app());
        assert!(prompt.contains("Stole my data!!"));
        assert!(prompt.contains("\"thumbsUpCount\": 12"));
        assert!(prompt.contains("\"score\": 1,"));
        assert!(prompt.contains("repeated phrases or words or emojis"));
    }

    #[test]
    fn test_description_prompt_strips_keys_without_mutating() {
        let app = sample_app();
        let prompt = PromptBuilder::default().description(&app);

        assert!(!prompt.contains("secretField"));
        assert!(!prompt.contains("Stole my data!!"));
        assert!(!prompt.contains("Welcome to Loan Shark"));
        assert!(!prompt.contains("format_valid"));
        assert!(prompt.contains("read your contacts"));
        assert!(prompt.contains("A loan approval screen"));

        assert!(app.reviews.is_some());
        assert!(app.website_content.is_some());
        assert!(app.extra.contains_key("secretField"));
    }

    #[test]
    fn test_permissions_prompt_fields() {
        let prompt = PromptBuilder::default().permissions(&sample_app());
        assert!(prompt.contains("\"Contacts\""));
        assert!(prompt.contains("read your contacts"));
    }

    #[test]
    fn test_overall_prompt_embeds_results() {
        let results = json!({"developer_analysis": {"type": "fraud", "reason": "fake site"}});
        let prompt = PromptBuilder::default().overall(&results, &sample_app());
        assert!(prompt.contains("fake site"));
        assert!(prompt.contains("Developer Analysis > Image Analysis"));
        assert!(prompt.contains("Title: Quick Loans"));
    }

    #[test]
    fn test_long_review_prompt_truncated() {
        let mut app = sample_app();
        app.reviews = Some(
            (0..2000)
                .map(|i| Review {
                    content: json!(format!("review number {} says it is great", i)),
                    ..Default::default()
                })
                .collect(),
        );

        let builder = PromptBuilder::new("gpt-4", 500);
        let prompt = builder.reviews(&app);
        assert!(TokenBudget::default().count(&prompt) <= 500);
        assert!(prompt.starts_with("Analyze the following app reviews"));
    }

    #[test]
    fn test_preamble_prefix() {
        let full = PromptBuilder::with_preamble("body");
        assert!(full.starts_with("You are an AI expert in fraud detection"));
        assert!(full.ends_with("body"));
    }
}
