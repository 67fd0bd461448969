//! Aggregation of verdicts for display and export.

use crate::error::Result;
use crate::models::{Id, IsoDateTime, Verdict, VerificationStatus};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub verified: usize,
    pub inaccurate: usize,
    #[serde(rename = "false")]
    pub false_: usize,
    pub unverifiable: usize,
}

impl StatusCounts {
    pub fn get(&self, status: VerificationStatus) -> usize {
        match status {
            VerificationStatus::Verified => self.verified,
            VerificationStatus::Inaccurate => self.inaccurate,
            VerificationStatus::False => self.false_,
            VerificationStatus::Unverifiable => self.unverifiable,
        }
    }

    pub fn total(&self) -> usize {
        self.verified + self.inaccurate + self.false_ + self.unverifiable
    }

    fn bump(&mut self, status: VerificationStatus) {
        match status {
            VerificationStatus::Verified => self.verified += 1,
            VerificationStatus::Inaccurate => self.inaccurate += 1,
            VerificationStatus::False => self.false_ += 1,
            VerificationStatus::Unverifiable => self.unverifiable += 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub counts: StatusCounts,
    /// Claim order.
    pub verdicts: Vec<Verdict>,
}

impl VerificationReport {
    /// Verdicts ordered for review: False, Inaccurate, Unverifiable, Verified.
    /// Claim order is kept within each status.
    pub fn prioritized(&self) -> Vec<&Verdict> {
        let mut out: Vec<&Verdict> = self.verdicts.iter().collect();
        out.sort_by_key(|v| v.status.review_priority());
        out
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}

/// Pure: the same verdicts always give the same report.
pub fn summarize(verdicts: &[Verdict]) -> VerificationReport {
    let mut counts = StatusCounts::default();
    for verdict in verdicts {
        counts.bump(verdict.status);
    }
    VerificationReport {
        counts,
        verdicts: verdicts.to_vec(),
    }
}

/// One document submission, start to finish.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationRun {
    pub run_id: Id,
    pub started_at: IsoDateTime,
    pub finished_at: IsoDateTime,
    #[serde(flatten)]
    pub report: VerificationReport,
}

impl VerificationRun {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Claim;
    use pretty_assertions::assert_eq;

    fn verdict(index: usize, status: VerificationStatus) -> Verdict {
        Verdict::new(&Claim::new(index, format!("claim {index}")), status, "why", Vec::new())
    }

    #[test]
    fn empty_input_gives_zero_counts() {
        let report = summarize(&[]);
        assert_eq!(report.counts, StatusCounts::default());
        assert_eq!(report.counts.total(), 0);
        assert!(report.is_empty());
    }

    #[test]
    fn counts_every_status() {
        let verdicts = vec![
            verdict(0, VerificationStatus::Verified),
            verdict(1, VerificationStatus::False),
            verdict(2, VerificationStatus::Verified),
            verdict(3, VerificationStatus::Unverifiable),
            verdict(4, VerificationStatus::Inaccurate),
        ];
        let report = summarize(&verdicts);
        assert_eq!(
            report.counts,
            StatusCounts {
                verified: 2,
                inaccurate: 1,
                false_: 1,
                unverifiable: 1,
            }
        );
        assert_eq!(report.counts.get(VerificationStatus::Verified), 2);
        assert_eq!(report.verdicts, verdicts);
    }

    #[test]
    fn summarize_is_pure() {
        let verdicts = vec![
            verdict(0, VerificationStatus::Inaccurate),
            verdict(1, VerificationStatus::Unverifiable),
        ];
        assert_eq!(summarize(&verdicts), summarize(&verdicts));
    }

    #[test]
    fn prioritized_puts_problems_first_and_is_stable() {
        let report = summarize(&[
            verdict(0, VerificationStatus::Verified),
            verdict(1, VerificationStatus::Unverifiable),
            verdict(2, VerificationStatus::False),
            verdict(3, VerificationStatus::Inaccurate),
            verdict(4, VerificationStatus::False),
        ]);
        let order: Vec<usize> = report.prioritized().iter().map(|v| v.claim_index).collect();
        assert_eq!(order, vec![2, 4, 3, 1, 0]);
    }

    #[test]
    fn run_json_keeps_claim_order_and_counts() {
        let run = VerificationRun {
            run_id: Id::new(),
            started_at: IsoDateTime::now(),
            finished_at: IsoDateTime::now(),
            report: summarize(&[
                verdict(0, VerificationStatus::False),
                verdict(1, VerificationStatus::Verified),
            ]),
        };
        let json = run.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["counts"]["false"], 1);
        assert_eq!(value["verdicts"][0]["claim"], "claim 0");
        assert_eq!(value["verdicts"][1]["status"], "Verified");
        let back: VerificationRun = serde_json::from_str(&json).unwrap();
        assert_eq!(back, run);
    }
}
