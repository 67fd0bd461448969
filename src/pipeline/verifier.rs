use crate::config::Config;
use crate::error::{FactCheckError, Result};
use crate::models::{Claim, EvidenceItem, EvidenceSet, Verdict, VerificationStatus};
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::response::{collapse_whitespace, json_payload, truncate_chars};
use crate::pipeline::traits::{with_deadline, EvidenceSearch, LanguageModel, Prompt, ResponseSchema};
use futures_util::stream::{self, StreamExt};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const UNDETERMINED_EXPLANATION: &str =
    "Could not determine the accuracy of this claim from the model's assessment.";
pub const NO_EVIDENCE_EXPLANATION: &str =
    "No evidence was found to confirm or refute this claim.";

const SYSTEM_PROMPT: &str = "You are a strict fact-checking engine. Compare the CLAIM with the \
EVIDENCE only; do not rely on memory. Pick exactly one status: \
\"Verified\" when the evidence shows the claim matches current, reliable data; \
\"Inaccurate\" when the claim is outdated or partially wrong (for example an old statistic); \
\"False\" when the evidence clearly contradicts the claim; \
\"Unverifiable\" when the evidence is insufficient to decide. \
Pay attention to dates, figures that change over time, and whether events actually happened. \
Give a brief explanation grounded in the evidence, the correct information when the claim is \
Inaccurate or False, a confidence between 0 and 1, and in sources list the URLs (or SOURCE \
numbers) of the evidence your decision relies on.";

/// Receives per-claim notifications during a batch.
pub trait VerifyProgress: Send + Sync {
    fn claim_started(&self, _claim: &Claim, _total: usize) {}
    fn claim_finished(&self, _verdict: &Verdict, _total: usize) {}
}

pub struct NoProgress;

impl VerifyProgress for NoProgress {}

/// Schema requested from the model.
#[derive(JsonSchema)]
#[allow(dead_code)]
struct ClassificationShape {
    status: VerificationStatus,
    confidence: f32,
    explanation: String,
    correct_information: String,
    sources: Vec<String>,
}

/// What is actually accepted back; looser than the schema.
#[derive(Deserialize)]
struct ClassificationReply {
    status: Value,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    correct_information: Option<String>,
    #[serde(default)]
    sources: Vec<Value>,
}

/// Classifies claims against web evidence. Each claim is verified
/// independently; nothing is shared between claims except the gateways.
pub struct FactVerifier<M: LanguageModel + ?Sized, S: EvidenceSearch + ?Sized> {
    model: Arc<M>,
    search: Arc<S>,
    max_results: usize,
    concurrency: usize,
    snippet_chars: usize,
    explanation_chars: usize,
    max_tokens: u32,
    search_timeout: Duration,
    model_timeout: Duration,
}

impl<M, S> FactVerifier<M, S>
where
    M: LanguageModel + ?Sized,
    S: EvidenceSearch + ?Sized,
{
    pub fn new(model: Arc<M>, search: Arc<S>, config: &Config) -> Self {
        Self {
            model,
            search,
            max_results: config.search.result_cap(),
            concurrency: config.verify.concurrency.max(1),
            snippet_chars: config.verify.snippet_chars.max(1),
            explanation_chars: config.verify.explanation_chars.max(1),
            max_tokens: config.llm.classification_max_tokens,
            search_timeout: config.search.timeout(),
            model_timeout: config.llm.timeout(),
        }
    }

    /// Never fails: every degraded path ends in an Unverifiable verdict.
    pub async fn verify(&self, claim: &Claim) -> Verdict {
        let query = claim.search_query();
        let evidence = match with_deadline(
            self.search_timeout,
            self.search.search(query, self.max_results),
        )
        .await
        {
            Ok(set) => set.usable(self.max_results),
            Err(err) => {
                warn!(claim = claim.index, error = %err, "evidence search failed");
                return Verdict::unverifiable(
                    claim,
                    format!("Could not retrieve evidence for this claim: {}", err.reason),
                );
            }
        };
        debug!(claim = claim.index, items = evidence.items.len(), "evidence retrieved");

        if evidence.is_empty() && evidence.answer.is_none() {
            return Verdict::unverifiable(claim, NO_EVIDENCE_EXPLANATION);
        }

        let prompt = Prompt::new(SYSTEM_PROMPT, classification_input(claim, &evidence, self.snippet_chars))
            .with_max_tokens(self.max_tokens);
        let schema = ResponseSchema::of::<ClassificationShape>("claim_verdict");
        let raw = match with_deadline(self.model_timeout, self.model.generate(&prompt, Some(&schema))).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(claim = claim.index, error = %err, "classification call failed");
                return Verdict::unverifiable(
                    claim,
                    format!("Verification analysis failed: {}", err.reason),
                );
            }
        };
        debug!(claim = claim.index, raw = %raw, "classification output");

        classify(claim, &raw, &evidence, self.explanation_chars)
    }

    /// Verifies every claim, returning verdicts in input order.
    pub async fn verify_all(&self, claims: &[Claim]) -> Vec<Verdict> {
        self.run_batch(claims, &CancellationToken::new(), &NoProgress)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Like [`verify_all`](Self::verify_all), but stops starting new claims once
    /// `cancel` fires. A cancelled batch reports no verdicts at all.
    pub async fn verify_all_with(
        &self,
        claims: &[Claim],
        cancel: &CancellationToken,
        progress: &dyn VerifyProgress,
    ) -> Result<Vec<Verdict>> {
        let slots = self.run_batch(claims, cancel, progress).await;
        let completed = slots.iter().filter(|s| s.is_some()).count();
        if completed < slots.len() {
            info!(completed, total = slots.len(), "verification cancelled");
            return Err(FactCheckError::Cancelled { completed });
        }
        Ok(slots.into_iter().flatten().collect())
    }

    // `buffered` keeps up to `concurrency` claims in flight and yields results
    // in input order.
    async fn run_batch(
        &self,
        claims: &[Claim],
        cancel: &CancellationToken,
        progress: &dyn VerifyProgress,
    ) -> Vec<Option<Verdict>> {
        let total = claims.len();
        stream::iter(claims)
            .map(|claim| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                progress.claim_started(claim, total);
                let verdict = self.verify(claim).await;
                progress.claim_finished(&verdict, total);
                Some(verdict)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Claim plus grounding context, as shown to the classifier.
pub fn classification_input(claim: &Claim, evidence: &EvidenceSet, snippet_chars: usize) -> String {
    let context = claim.context.as_deref().unwrap_or("(none)");
    format!(
        "CLAIM TO VERIFY:\n{}\n\nCATEGORY: {}\nCLAIM CONTEXT: {}\n\nEVIDENCE:\n{}",
        claim.text,
        claim.category,
        context,
        grounding_context(evidence, snippet_chars)
    )
}

/// Numbered title/snippet blocks, each tagged with its URL for citation.
pub fn grounding_context(evidence: &EvidenceSet, snippet_chars: usize) -> String {
    let mut blocks = Vec::new();
    if let Some(answer) = &evidence.answer {
        blocks.push(format!("SEARCH SUMMARY (not citable): {}", collapse_whitespace(answer)));
    }
    for (i, item) in evidence.items.iter().enumerate() {
        let url = if item.url.trim().is_empty() { "(unknown)" } else { item.url.trim() };
        let title = if item.title.trim().is_empty() { "(untitled)" } else { item.title.trim() };
        blocks.push(format!(
            "[SOURCE {}] URL: {}\nTitle: {}\nContent: {}",
            i + 1,
            url,
            title,
            truncate_chars(&collapse_whitespace(&item.snippet), snippet_chars)
        ));
    }
    if evidence.items.is_empty() {
        blocks.push("(no evidence items)".to_string());
    }
    blocks.join("\n\n")
}

/// Turns raw classifier output into a verdict. Total: malformed output or an
/// unknown status yields Unverifiable, and the no-evidence rule is applied last.
pub fn classify(claim: &Claim, raw: &str, evidence: &EvidenceSet, explanation_chars: usize) -> Verdict {
    let reply = match serde_json::from_str::<ClassificationReply>(json_payload(raw)) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(claim = claim.index, error = %err, "unparsable classification output");
            return Verdict::unverifiable(claim, UNDETERMINED_EXPLANATION);
        }
    };
    let Some(status) = reply.status.as_str().and_then(VerificationStatus::parse_label) else {
        warn!(claim = claim.index, status = %reply.status, "classification status outside the fixed set");
        return Verdict::unverifiable(claim, UNDETERMINED_EXPLANATION);
    };

    let explanation = reply
        .explanation
        .map(|e| truncate_chars(&collapse_whitespace(&e), explanation_chars))
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| format!("Classified as {status} without further explanation."));
    let sources = resolve_sources(&reply.sources, &evidence.items);
    let confidence = reply.confidence.as_ref().and_then(value_as_f32).unwrap_or(0.5);

    let verdict = Verdict::new(claim, status, explanation, sources)
        .with_confidence(confidence_adjust(confidence, evidence.items.len()))
        .with_correction(reply.correct_information);
    apply_evidence_policy(verdict, evidence)
}

/// No evidence items means no affirmative or negative verdict. The model's
/// reading of the search summary is kept after the downgrade note.
pub fn apply_evidence_policy(verdict: Verdict, evidence: &EvidenceSet) -> Verdict {
    if !evidence.is_empty() || !verdict.status.is_decisive() {
        return verdict;
    }
    debug!(
        claim = verdict.claim_index,
        status = %verdict.status,
        "downgrading verdict without evidence"
    );
    let explanation = format!(
        "{NO_EVIDENCE_EXPLANATION} The search summary alone suggested {}: {}",
        verdict.status, verdict.explanation
    );
    Verdict {
        status: VerificationStatus::Unverifiable,
        explanation,
        sources: Vec::new(),
        confidence: 0.0,
        correct_information: None,
        ..verdict
    }
}

/// Maps cited URLs or `SOURCE n` references onto retrieved item URLs.
/// Citations that match nothing are dropped; duplicates keep first position.
pub fn resolve_sources(cited: &[Value], items: &[EvidenceItem]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for citation in cited {
        let Some(item) = match_citation(citation, items) else {
            continue;
        };
        let key = url_key(&item.url);
        if !seen.contains(&key) {
            seen.push(key);
            out.push(item.url.trim().to_string());
        }
    }
    out
}

fn match_citation<'a>(citation: &Value, items: &'a [EvidenceItem]) -> Option<&'a EvidenceItem> {
    let by_number = |n: u64| -> Option<&'a EvidenceItem> {
        let idx = usize::try_from(n).ok()?.checked_sub(1)?;
        items.get(idx).filter(|i| !i.url.trim().is_empty())
    };
    match citation {
        Value::Number(n) => n.as_u64().and_then(by_number),
        Value::String(s) => {
            let s = s.trim();
            if let Some(n) = source_number(s) {
                return by_number(n);
            }
            let key = url_key(s);
            items
                .iter()
                .find(|i| !i.url.trim().is_empty() && url_key(&i.url) == key)
        }
        _ => None,
    }
}

/// Parses `3`, `SOURCE 3` or `[SOURCE 3]`.
fn source_number(s: &str) -> Option<u64> {
    let inner = s.trim_start_matches('[').trim_end_matches(']').trim();
    let digits = match inner.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("source") => inner[6..].trim(),
        _ => inner,
    };
    digits.parse().ok()
}

/// Comparison key: parsed URL without fragment or trailing slash.
fn url_key(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => raw.trim_end_matches('/').to_string(),
    }
}

fn value_as_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f32>().ok().map(|f| {
            if s.trim().ends_with('%') {
                f / 100.0
            } else {
                f
            }
        }),
        _ => None,
    }
}

/// Fewer than three evidence items scales the model's confidence down.
fn confidence_adjust(conf_llm: f32, evidence_count: usize) -> f32 {
    if !conf_llm.is_finite() {
        return 0.0;
    }
    let factor = (evidence_count as f32 / 3.0).clamp(0.4, 1.0);
    (conf_llm * factor).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn items() -> Vec<EvidenceItem> {
        vec![
            EvidenceItem::new("A", "a", "https://a.example/page"),
            EvidenceItem::new("B", "b", "https://b.example/"),
            EvidenceItem::new("C", "c", ""),
        ]
    }

    fn evidence() -> EvidenceSet {
        EvidenceSet::from_items(items())
    }

    #[test]
    fn sources_resolve_by_url_or_number_and_dedup() {
        let cited = vec![
            json!("https://b.example"),
            json!("[SOURCE 1]"),
            json!(2),
            json!("https://a.example/page#section"),
            json!("https://unknown.example"),
            json!("SOURCE 3"),
            json!(null),
        ];
        assert_eq!(
            resolve_sources(&cited, &items()),
            vec!["https://b.example/".to_string(), "https://a.example/page".to_string()]
        );
    }

    #[test]
    fn source_numbers_parse() {
        assert_eq!(source_number("3"), Some(3));
        assert_eq!(source_number("Source 12"), Some(12));
        assert_eq!(source_number("[SOURCE 1]"), Some(1));
        assert_eq!(source_number("https://x"), None);
    }

    #[test]
    fn classify_reads_well_formed_reply() {
        let claim = Claim::new(0, "Bitcoin is trading at $42,500");
        let raw = r#"```json
        {"status": "Inaccurate", "confidence": 0.9,
         "explanation": "Current price is about $67,000.",
         "correct_information": "Bitcoin trades near $67,000.",
         "sources": ["https://a.example/page"]}
        ```"#;
        let verdict = classify(&claim, raw, &evidence(), 600);
        assert_eq!(verdict.status, VerificationStatus::Inaccurate);
        assert_eq!(verdict.sources, vec!["https://a.example/page".to_string()]);
        assert_eq!(verdict.correct_information.as_deref(), Some("Bitcoin trades near $67,000."));
        assert!((verdict.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn classify_coerces_unknown_status() {
        let claim = Claim::new(0, "x");
        let verdict = classify(&claim, r#"{"status": "Mostly True", "sources": ["https://a.example/page"]}"#, &evidence(), 600);
        assert_eq!(verdict.status, VerificationStatus::Unverifiable);
        assert_eq!(verdict.explanation, UNDETERMINED_EXPLANATION);
        assert!(verdict.sources.is_empty());
    }

    #[test]
    fn classify_handles_garbage() {
        let claim = Claim::new(0, "x");
        for raw in ["", "nope", "{\"status\": 7}", "[1,2]", "{\"explanation\": \"no status\"}"] {
            let verdict = classify(&claim, raw, &evidence(), 600);
            assert_eq!(verdict.status, VerificationStatus::Unverifiable, "input: {raw}");
        }
    }

    #[test]
    fn policy_downgrades_without_evidence() {
        let claim = Claim::new(0, "x");
        let verdict = classify(
            &claim,
            r#"{"status": "Verified", "explanation": "summary says so", "sources": []}"#,
            &EvidenceSet {
                answer: Some("It is true.".to_string()),
                items: Vec::new(),
            },
            600,
        );
        assert_eq!(verdict.status, VerificationStatus::Unverifiable);
        assert_eq!(
            verdict.explanation,
            format!("{NO_EVIDENCE_EXPLANATION} The search summary alone suggested Verified: summary says so")
        );
    }

    #[test]
    fn classify_accepts_json_wrapped_in_prose() {
        let claim = Claim::new(0, "x");
        for raw in [
            "{\"status\": \"Verified\", \"explanation\": \"matches\", \"sources\": [1]}\n\nNote: based on SOURCE 1.",
            "Based on [SOURCE 1], the answer is: {\"status\": \"Verified\", \"explanation\": \"matches\", \"sources\": [1]}",
        ] {
            let verdict = classify(&claim, raw, &evidence(), 600);
            assert_eq!(verdict.status, VerificationStatus::Verified, "input: {raw}");
            assert_eq!(verdict.sources, vec!["https://a.example/page".to_string()]);
        }
    }

    #[test]
    fn confidence_scales_with_evidence() {
        assert!((confidence_adjust(1.0, 0) - 0.4).abs() < 1e-6);
        assert!((confidence_adjust(0.9, 3) - 0.9).abs() < 1e-6);
        assert_eq!(confidence_adjust(f32::NAN, 3), 0.0);
        assert_eq!(value_as_f32(&json!("80%")), Some(0.8));
        assert_eq!(value_as_f32(&json!("high")), None);
    }

    #[test]
    fn grounding_context_tags_sources() {
        let set = EvidenceSet {
            answer: Some("summary".to_string()),
            items: items(),
        };
        let text = grounding_context(&set, 10);
        assert!(text.starts_with("SEARCH SUMMARY (not citable): summary"));
        assert!(text.contains("[SOURCE 1] URL: https://a.example/page\nTitle: A\nContent: a"));
        assert!(text.contains("[SOURCE 3] URL: (unknown)"));
    }
}
