use serde::{Deserialize, Serialize};

/// One search result. Owned by the verification of a single claim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub url: String,
}

impl EvidenceItem {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
        }
    }

    /// An item needs a title or a snippet to ground anything.
    pub fn is_usable(&self) -> bool {
        !self.title.trim().is_empty() || !self.snippet.trim().is_empty()
    }
}

/// Ordered results of one search call, plus the provider's own answer summary
/// when it returns one. The summary is context only, never a citation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSet {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub items: Vec<EvidenceItem>,
}

impl EvidenceSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<EvidenceItem>) -> Self {
        Self {
            answer: None,
            items,
        }
    }

    /// Drops unusable items and caps the list, keeping provider order.
    pub fn usable(self, max_items: usize) -> Self {
        let answer = self
            .answer
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        let items = self
            .items
            .into_iter()
            .filter(EvidenceItem::is_usable)
            .take(max_items)
            .collect();
        Self { answer, items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usable_filters_and_caps() {
        let set = EvidenceSet {
            answer: Some("  ".to_string()),
            items: vec![
                EvidenceItem::new("", "", "https://a.example"),
                EvidenceItem::new("B", "", "https://b.example"),
                EvidenceItem::new("", "c snippet", "https://c.example"),
                EvidenceItem::new("D", "d", "https://d.example"),
            ],
        };
        let usable = set.usable(2);
        assert_eq!(usable.answer, None);
        let urls: Vec<&str> = usable.items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.example", "https://c.example"]);
    }
}
