//! Keyword extraction ahead of name resolution.
//!
//! Users ask questions like "Où se situe l'extincteur X45 ?"; the name
//! resolver wants "extincteur X45". The language model is asked for the
//! subject words only.

use anyhow::{bail, Result};
use tracing::warn;

use crate::llm::LanguageModel;

const KEYWORDS_PROMPT: &str =
    "donne moi, sans aucun autre mot, les mots composant le sujet de ce texte: ";

pub async fn extract_keywords(model: &dyn LanguageModel, question: &str) -> Result<String> {
    let prompt = format!("{}{}", KEYWORDS_PROMPT, question);
    let raw = model.complete(&prompt).await?;
    let keywords = raw.trim();
    if keywords.is_empty() {
        bail!("language model returned no keywords");
    }
    Ok(keywords.to_string())
}

/// The text to hand to the name resolver for `query`.
///
/// Falls back to the raw query when the model is disabled or fails, so a
/// lookup never depends on the external service being up.
pub async fn search_terms(model: &dyn LanguageModel, query: &str) -> String {
    if !model.is_enabled() {
        return query.to_string();
    }

    match extract_keywords(model, query).await {
        Ok(k) => k,
        Err(e) => {
            warn!(error = %e, "keyword extraction failed, using raw query");
            query.to_string()
        }
    }
}
