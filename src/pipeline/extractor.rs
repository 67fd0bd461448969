use crate::config::Config;
use crate::error::{ExtractionCause, FactCheckError, Result};
use crate::models::{Claim, ClaimCategory};
use crate::pipeline::response::{collapse_whitespace, json_payload};
use crate::pipeline::traits::{with_deadline, LanguageModel, Prompt, ResponseSchema};
use schemars::JsonSchema;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const TRUNCATION_MARKER: &str = "\n...[truncated]";

const SYSTEM_PROMPT: &str = "You are an expert fact-checker. Read the DOCUMENT and list every claim \
that can be checked against real-world data: statistics and other numbers, dates and timelines, \
financial figures, technical specifications, statements about named companies or organizations, \
and scientific assertions. Skip opinions, questions, predictions without a checkable fact, and \
vague statements. Each claim must be a single self-contained sentence that is understandable \
without the document. For each claim give: claim, category (one of Statistics, Date/Timeline, \
Financial, Technical, Organizational, Scientific), context (what the claim is about) and \
verification_query (a web search query that would confirm or refute it). \
Return JSON only: {\"claims\": [...]}. Return {\"claims\": []} when nothing is checkable.";

/// Turns document text into an ordered list of checkable claims.
///
/// Generation is not deterministic, so two calls with the same text may
/// return different claim lists. That is expected, not a defect.
pub struct ClaimExtractor<M: LanguageModel + ?Sized> {
    model: Arc<M>,
    max_document_chars: usize,
    max_tokens: u32,
    timeout: Duration,
}

#[derive(Deserialize, JsonSchema)]
struct ExtractedClaim {
    #[serde(alias = "text", alias = "statement")]
    claim: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    verification_query: Option<String>,
}

/// Shape requested from the model.
#[derive(Deserialize, JsonSchema)]
#[allow(dead_code)]
struct ClaimList {
    claims: Vec<ExtractedClaim>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClaimEntry {
    Text(String),
    Detailed(ExtractedClaim),
}

/// Shapes accepted back: the requested object, a bare array, or one claim.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExtractionResponse {
    Wrapped { claims: Vec<ClaimEntry> },
    List(Vec<ClaimEntry>),
    Single(ExtractedClaim),
}

impl ExtractionResponse {
    fn into_entries(self) -> Vec<ClaimEntry> {
        match self {
            ExtractionResponse::Wrapped { claims } | ExtractionResponse::List(claims) => claims,
            ExtractionResponse::Single(c) => vec![ClaimEntry::Detailed(c)],
        }
    }
}

impl<M: LanguageModel + ?Sized> ClaimExtractor<M> {
    pub fn new(model: Arc<M>, config: &Config) -> Self {
        Self {
            model,
            max_document_chars: config.extract.max_document_chars.max(1),
            max_tokens: config.llm.extraction_max_tokens,
            timeout: config.llm.timeout(),
        }
    }

    pub async fn extract(&self, document_text: &str) -> Result<Vec<Claim>> {
        let trimmed = document_text.trim();
        if trimmed.is_empty() {
            return Err(FactCheckError::EmptyDocument);
        }
        let text = truncate_document(trimmed, self.max_document_chars);
        if let Cow::Owned(_) = text {
            info!(
                limit = self.max_document_chars,
                "document truncated before extraction"
            );
        }

        let prompt = Prompt::new(SYSTEM_PROMPT, format!("DOCUMENT:\n{text}"))
            .with_max_tokens(self.max_tokens);
        let schema = ResponseSchema::of::<ClaimList>("claim_list");
        let raw = with_deadline(self.timeout, self.model.generate(&prompt, Some(&schema)))
            .await
            .map_err(ExtractionCause::from)?;
        debug!(raw = %raw, "extraction output");

        let claims = parse_claims(&raw)?;
        info!(count = claims.len(), "claims extracted");
        Ok(claims)
    }
}

/// Strict parse of the extraction output into normalized, indexed claims.
pub fn parse_claims(raw: &str) -> std::result::Result<Vec<Claim>, ExtractionCause> {
    let value: serde_json::Value = serde_json::from_str(json_payload(raw))?;
    let response: ExtractionResponse = serde_json::from_value(value)
        .map_err(|e| ExtractionCause::Shape(e.to_string()))?;

    let claims = response
        .into_entries()
        .into_iter()
        .filter_map(|entry| match entry {
            ClaimEntry::Text(text) => normalize_claim_text(&text).map(|t| (t, None, None, None)),
            ClaimEntry::Detailed(c) => normalize_claim_text(&c.claim)
                .map(|t| (t, c.category, c.context, c.verification_query)),
        })
        .enumerate()
        .map(|(index, (text, category, context, query))| Claim {
            index,
            text,
            category: category
                .as_deref()
                .map(ClaimCategory::from_label)
                .unwrap_or_default(),
            context: non_blank(context),
            verification_query: non_blank(query),
        })
        .collect();
    Ok(claims)
}

/// Trims, flattens line breaks, and strips list markers and wrapping quotes.
/// Returns `None` when nothing is left.
pub fn normalize_claim_text(raw: &str) -> Option<String> {
    let mut text = collapse_whitespace(raw);
    loop {
        let before = text.len();
        text = strip_list_marker(&text).to_string();
        text = strip_wrapping_quotes(&text).to_string();
        if text.len() == before {
            break;
        }
    }
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn strip_list_marker(text: &str) -> &str {
    for bullet in ["- ", "* ", "• ", "– "] {
        if let Some(rest) = text.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && digits <= 3 {
        let rest = &text[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim_start();
        }
    }
    text
}

fn strip_wrapping_quotes(text: &str) -> &str {
    for (open, close) in [('"', '"'), ('\u{201c}', '\u{201d}'), ('\'', '\'')] {
        if text.chars().count() >= 2 && text.starts_with(open) && text.ends_with(close) {
            return text[open.len_utf8()..text.len() - close.len_utf8()].trim();
        }
    }
    text
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| collapse_whitespace(&v))
        .filter(|v| !v.is_empty())
}

fn truncate_document(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}{}", &text[..cut], TRUNCATION_MARKER)),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_requested_object_shape() {
        let raw = r#"{"claims": [
            {"claim": "Bitcoin is trading at $42,500", "category": "Financial",
             "context": "crypto prices", "verification_query": "bitcoin price"},
            {"claim": "  "}
        ]}"#;
        let claims = parse_claims(raw).unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].index, 0);
        assert_eq!(claims[0].text, "Bitcoin is trading at $42,500");
        assert_eq!(claims[0].category, ClaimCategory::Financial);
        assert_eq!(claims[0].verification_query.as_deref(), Some("bitcoin price"));
    }

    #[test]
    fn parses_fenced_array_of_mixed_entries() {
        let raw = "```json\n[\"- Paris is the capital of France\", {\"text\": \"1. GDP grew 2% in 2023\"}]\n```";
        let texts: Vec<String> = parse_claims(raw).unwrap().into_iter().map(|c| c.text).collect();
        assert_eq!(
            texts,
            vec!["Paris is the capital of France", "GDP grew 2% in 2023"]
        );
    }

    #[test]
    fn indices_follow_kept_claims() {
        let raw = r#"["", "a claim", "   ", "another claim"]"#;
        let claims = parse_claims(raw).unwrap();
        let indices: Vec<usize> = claims.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn empty_list_is_not_an_error() {
        assert!(parse_claims(r#"{"claims": []}"#).unwrap().is_empty());
        assert!(parse_claims("[]").unwrap().is_empty());
    }

    #[test]
    fn trailing_commentary_does_not_fail_extraction() {
        let raw = "[{\"claim\": \"Water boils at 100C\"}]\nThese are all the claims.";
        let claims = parse_claims(raw).unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].text, "Water boils at 100C");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(parse_claims("I could not find any claims."), Err(ExtractionCause::Parse(_))));
    }

    #[test]
    fn wrong_shape_is_a_shape_error() {
        assert!(matches!(parse_claims(r#"{"status": "ok"}"#), Err(ExtractionCause::Shape(_))));
        assert!(matches!(parse_claims("42"), Err(ExtractionCause::Shape(_))));
    }

    #[test]
    fn normalization_flattens_and_unquotes() {
        assert_eq!(
            normalize_claim_text("  \"The tower is\n 330 m tall\"  ").as_deref(),
            Some("The tower is 330 m tall")
        );
        assert_eq!(normalize_claim_text("* 2) “Quoted”").as_deref(), Some("Quoted"));
        assert_eq!(normalize_claim_text(" \n\t "), None);
        assert_eq!(normalize_claim_text("\"\""), None);
    }

    #[test]
    fn normalization_keeps_leading_years() {
        assert_eq!(
            normalize_claim_text("2023 was the warmest year on record").as_deref(),
            Some("2023 was the warmest year on record")
        );
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_document("héllo", 10), Cow::Borrowed("héllo"));
        assert_eq!(
            truncate_document("héllo", 2).into_owned(),
            format!("hé{TRUNCATION_MARKER}")
        );
    }
}
