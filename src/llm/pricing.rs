//! Token pricing in USD per million tokens.

/// Price used for analysis models missing from the table
pub const DEFAULT_PRICING: ModelPricing = ModelPricing {
    input_per_million: 3.0,
    output_per_million: 15.0,
};

/// Price used for embedding models missing from the table
pub const DEFAULT_EMBEDDING_PER_MILLION: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Looks up a model, stripping an OpenRouter-style `vendor/` prefix.
    pub fn lookup(model: &str) -> Option<Self> {
        let bare = model.rsplit('/').next().unwrap_or(model);
        let pricing = match bare {
            "claude-sonnet-4-5-20250929" | "claude-sonnet-4.5" => Self::new(3.0, 15.0),
            "claude-haiku-4-5-20251001" => Self::new(0.80, 4.0),
            "claude-opus-4-6" | "claude-opus-4" => Self::new(15.0, 75.0),
            "gpt-4o" => Self::new(2.50, 10.0),
            "gpt-4o-mini" => Self::new(0.15, 0.60),
            "gemini-2.0-flash" => Self::new(0.10, 0.40),
            "gemini-1.5-pro" => Self::new(1.25, 5.0),
            _ => return None,
        };
        Some(pricing)
    }

    /// Table price, or [`DEFAULT_PRICING`] for unknown models.
    pub fn for_model(model: &str) -> Self {
        Self::lookup(model).unwrap_or(DEFAULT_PRICING)
    }

    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 / 1_000_000.0 * self.input_per_million
            + output_tokens as f64 / 1_000_000.0 * self.output_per_million
    }
}

fn embedding_price_per_million(model: &str) -> f64 {
    match model.rsplit('/').next().unwrap_or(model) {
        "text-embedding-3-small" => 0.02,
        "text-embedding-3-large" => 0.13,
        "text-embedding-ada-002" => 0.10,
        "nomic-embed-text" | "mxbai-embed-large" | "all-minilm" => 0.0,
        _ => DEFAULT_EMBEDDING_PER_MILLION,
    }
}

/// Estimated USD cost of a completion with the given token counts.
pub fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    ModelPricing::for_model(model).cost(input_tokens, output_tokens)
}

pub fn estimate_embedding_cost(model: &str, tokens: u64) -> f64 {
    tokens as f64 / 1_000_000.0 * embedding_price_per_million(model)
}

/// Rough token count for `bytes` of source: one token per four bytes, at
/// least one for non-empty input.
pub fn estimate_tokens(bytes: u64) -> u64 {
    if bytes == 0 {
        0
    } else {
        (bytes / 4).max(1)
    }
}
