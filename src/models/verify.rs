use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four possible classification outcomes. Nothing else is ever reported.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum VerificationStatus {
    Verified,
    Inaccurate,
    False,
    Unverifiable,
}

impl VerificationStatus {
    pub const ALL: [VerificationStatus; 4] = [
        VerificationStatus::Verified,
        VerificationStatus::Inaccurate,
        VerificationStatus::False,
        VerificationStatus::Unverifiable,
    ];

    /// Strict label match (case, whitespace and quoting ignored).
    pub fn parse_label(raw: &str) -> Option<Self> {
        let key = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.' || c == '*')
            .trim()
            .to_ascii_lowercase();
        match key.as_str() {
            "verified" => Some(VerificationStatus::Verified),
            "inaccurate" => Some(VerificationStatus::Inaccurate),
            "false" => Some(VerificationStatus::False),
            "unverifiable" => Some(VerificationStatus::Unverifiable),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VerificationStatus::Verified => "Verified",
            VerificationStatus::Inaccurate => "Inaccurate",
            VerificationStatus::False => "False",
            VerificationStatus::Unverifiable => "Unverifiable",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            VerificationStatus::Verified => "✅",
            VerificationStatus::Inaccurate => "⚠️",
            VerificationStatus::False => "❌",
            VerificationStatus::Unverifiable => "❓",
        }
    }

    /// Review order: problems first.
    pub fn review_priority(self) -> u8 {
        match self {
            VerificationStatus::False => 0,
            VerificationStatus::Inaccurate => 1,
            VerificationStatus::Unverifiable => 2,
            VerificationStatus::Verified => 3,
        }
    }

    /// Whether the status asserts something about the claim's truth.
    pub fn is_decisive(self) -> bool {
        !matches!(self, VerificationStatus::Unverifiable)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
