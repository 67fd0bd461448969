use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic bucket the extractor assigns to a claim.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ClaimCategory {
    Statistics,
    #[serde(rename = "Date/Timeline")]
    DateTimeline,
    Financial,
    Technical,
    Organizational,
    Scientific,
    #[default]
    Other,
}

impl ClaimCategory {
    pub const ALL: [ClaimCategory; 7] = [
        ClaimCategory::Statistics,
        ClaimCategory::DateTimeline,
        ClaimCategory::Financial,
        ClaimCategory::Technical,
        ClaimCategory::Organizational,
        ClaimCategory::Scientific,
        ClaimCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ClaimCategory::Statistics => "Statistics",
            ClaimCategory::DateTimeline => "Date/Timeline",
            ClaimCategory::Financial => "Financial",
            ClaimCategory::Technical => "Technical",
            ClaimCategory::Organizational => "Organizational",
            ClaimCategory::Scientific => "Scientific",
            ClaimCategory::Other => "Other",
        }
    }

    /// Lenient label match; anything unrecognised lands in `Other`.
    pub fn from_label(raw: &str) -> Self {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "statistics" | "statistic" | "stats" => ClaimCategory::Statistics,
            "datetimeline" | "date" | "timeline" | "dates" => ClaimCategory::DateTimeline,
            "financial" | "finance" => ClaimCategory::Financial,
            "technical" | "technology" => ClaimCategory::Technical,
            "organizational" | "organisational" | "organization" => ClaimCategory::Organizational,
            "scientific" | "science" => ClaimCategory::Scientific,
            _ => ClaimCategory::Other,
        }
    }
}

impl fmt::Display for ClaimCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single checkable statement, immutable once extracted.
///
/// `index` is the zero-based position in extraction order and is the only
/// identity a claim has within a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub index: usize,
    pub text: String,
    pub category: ClaimCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_query: Option<String>,
}

impl Claim {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            category: ClaimCategory::Other,
            context: None,
            verification_query: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.verification_query = Some(query.into());
        self
    }

    /// Query sent to the search gateway: the extractor's suggestion when present,
    /// the claim text otherwise.
    pub fn search_query(&self) -> &str {
        match self.verification_query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q,
            _ => &self.text,
        }
    }

    /// Short preview for progress lines.
    pub fn preview(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            return self.text.clone();
        }
        let mut out: String = self.text.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_query_prefers_suggestion() {
        let claim = Claim::new(0, "Bitcoin is trading at $42,500").with_query("bitcoin price today");
        assert_eq!(claim.search_query(), "bitcoin price today");
    }

    #[test]
    fn blank_suggestion_falls_back_to_text() {
        let claim = Claim::new(0, "Water boils at 100C").with_query("   ");
        assert_eq!(claim.search_query(), "Water boils at 100C");
    }

    #[test]
    fn category_labels_are_lenient() {
        assert_eq!(ClaimCategory::from_label("Date/Timeline"), ClaimCategory::DateTimeline);
        assert_eq!(ClaimCategory::from_label(" financial "), ClaimCategory::Financial);
        assert_eq!(ClaimCategory::from_label("gossip"), ClaimCategory::Other);
        for c in ClaimCategory::ALL {
            assert_eq!(ClaimCategory::from_label(c.label()), c);
        }
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let claim = Claim::new(0, "é".repeat(10));
        assert_eq!(claim.preview(3), "ééé...");
        assert_eq!(claim.preview(20), "é".repeat(10));
    }
}
