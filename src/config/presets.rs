use super::{ProviderKind, QualityTier};

/// Models used for a provider at a given quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPreset {
    pub model: &'static str,
    pub embedding_model: &'static str,
}

pub fn preset_for(provider: ProviderKind, tier: QualityTier) -> QualityPreset {
    use ProviderKind::*;
    use QualityTier::*;

    let (model, embedding_model) = match (provider, tier) {
        (Anthropic, Lite) => ("claude-haiku-4-5-20251001", "text-embedding-3-small"),
        (Anthropic, Normal) => ("claude-sonnet-4-5-20250929", "text-embedding-3-small"),
        (Anthropic, Max) => ("claude-opus-4-6", "text-embedding-3-large"),
        (OpenAi, Lite) => ("gpt-4o-mini", "text-embedding-3-small"),
        (OpenAi, Normal) => ("gpt-4o", "text-embedding-3-small"),
        (OpenAi, Max) => ("gpt-4o", "text-embedding-3-large"),
        (OpenRouter, Lite) => ("openai/gpt-4o-mini", "text-embedding-3-small"),
        (OpenRouter, Normal) => ("anthropic/claude-sonnet-4.5", "text-embedding-3-small"),
        (OpenRouter, Max) => ("anthropic/claude-opus-4", "text-embedding-3-large"),
        (Ollama, Lite) | (Ollama, Normal) => ("llama3", "nomic-embed-text"),
        (Ollama, Max) => ("llama3:70b", "nomic-embed-text"),
    };

    QualityPreset {
        model,
        embedding_model,
    }
}

/// Output dimensions of known embedding models
pub fn known_embedding_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "text-embedding-ada-002" => Some(1536),
        "nomic-embed-text" => Some(768),
        "mxbai-embed-large" => Some(1024),
        "all-minilm" => Some(384),
        _ => None,
    }
}
