use crate::models::claim::{Claim, ClaimCategory};
use crate::models::verify::VerificationStatus;
use serde::{Deserialize, Serialize};

/// Classification outcome for one claim.
///
/// Field order matters for export: claim, status, explanation and sources come
/// first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub claim: String,
    pub status: VerificationStatus,
    pub explanation: String,
    pub sources: Vec<String>,
    pub claim_index: usize,
    pub category: ClaimCategory,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_information: Option<String>,
}

impl Verdict {
    pub fn new(
        claim: &Claim,
        status: VerificationStatus,
        explanation: impl Into<String>,
        sources: Vec<String>,
    ) -> Self {
        Self {
            claim: claim.text.clone(),
            status,
            explanation: explanation.into(),
            sources,
            claim_index: claim.index,
            category: claim.category,
            confidence: 0.0,
            correct_information: None,
        }
    }

    /// Verdict for a claim nothing could be concluded about.
    pub fn unverifiable(claim: &Claim, explanation: impl Into<String>) -> Self {
        Self::new(claim, VerificationStatus::Unverifiable, explanation, Vec::new())
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Corrections only make sense for Inaccurate/False verdicts.
    pub fn with_correction(mut self, correction: Option<String>) -> Self {
        self.correct_information = match self.status {
            VerificationStatus::Inaccurate | VerificationStatus::False => correction
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            _ => None,
        };
        self
    }
}
