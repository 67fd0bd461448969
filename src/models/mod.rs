pub mod claim;
pub mod common;
pub mod evidence;
pub mod verdict;
pub mod verify;

pub use claim::{Claim, ClaimCategory};
pub use common::{Id, IsoDateTime};
pub use evidence::{EvidenceItem, EvidenceSet};
pub use verdict::Verdict;
pub use verify::VerificationStatus;
