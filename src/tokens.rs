//! Token budgeting for prompts and scraped text

use std::sync::OnceLock;
use tracing::warn;

/// Truncates text to a token budget using the tiktoken BPE for a model.
/// The BPE is loaded lazily and cached.
pub struct TokenBudget {
    model: String,
    bpe: OnceLock<Option<tiktoken_rs::CoreBPE>>,
}

impl TokenBudget {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            bpe: OnceLock::new(),
        }
    }

    fn bpe(&self) -> Option<&tiktoken_rs::CoreBPE> {
        self.bpe
            .get_or_init(|| {
                let bpe = tiktoken_rs::get_bpe_from_model(&self.model)
                    .or_else(|_| tiktoken_rs::get_bpe_from_model("gpt-4"));
                if let Err(e) = &bpe {
                    warn!(
                        model = %self.model,
                        error = %e,
                        "Tokenizer unavailable, using approximate counts"
                    );
                }
                bpe.ok()
            })
            .as_ref()
    }

    /// Count tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        match self.bpe() {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => Self::count_approximate(text),
        }
    }

    /// Fast approximation (4 chars ≈ 1 token).
    pub fn count_approximate(text: &str) -> usize {
        text.len().div_ceil(4)
    }

    /// Keep at most `max_tokens` tokens of `text`.
    pub fn truncate(&self, text: &str, max_tokens: usize) -> String {
        let Some(bpe) = self.bpe() else {
            return text.chars().take(max_tokens.saturating_mul(4)).collect();
        };

        let tokens = bpe.encode_with_special_tokens(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }

        // A cut can land inside a multi-byte character; back off a few tokens.
        let mut end = max_tokens;
        while end > 0 && max_tokens - end < 4 {
            if let Ok(decoded) = bpe.decode(tokens[..end].to_vec()) {
                return decoded;
            }
            end -= 1;
        }
        text.chars().take(max_tokens.saturating_mul(4)).collect()
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::new("gpt-4")
    }
}
