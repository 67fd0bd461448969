use crate::config::Config;
use crate::error::Result;
use crate::models::{Claim, Id, IsoDateTime};
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::extractor::ClaimExtractor;
use crate::pipeline::traits::{EvidenceSearch, LanguageModel};
use crate::pipeline::verifier::{FactVerifier, NoProgress, VerifyProgress};
use crate::report::{summarize, VerificationRun};
use std::sync::Arc;
use tracing::info;

/// Document text in, verification run out.
pub struct FactCheckPipeline<M, S>
where
    M: LanguageModel + ?Sized,
    S: EvidenceSearch + ?Sized,
{
    pub extractor: ClaimExtractor<M>,
    pub verifier: FactVerifier<M, S>,
}

impl<M, S> FactCheckPipeline<M, S>
where
    M: LanguageModel + ?Sized,
    S: EvidenceSearch + ?Sized,
{
    pub fn new(model: Arc<M>, search: Arc<S>, config: &Config) -> Self {
        Self {
            extractor: ClaimExtractor::new(Arc::clone(&model), config),
            verifier: FactVerifier::new(model, search, config),
        }
    }

    pub async fn extract(&self, document_text: &str) -> Result<Vec<Claim>> {
        self.extractor.extract(document_text).await
    }

    pub async fn run(&self, document_text: &str) -> Result<VerificationRun> {
        self.run_with(document_text, &CancellationToken::new(), &NoProgress)
            .await
    }

    /// Empty-document and extraction failures abort the run; per-claim
    /// failures only ever show up as Unverifiable verdicts.
    pub async fn run_with(
        &self,
        document_text: &str,
        cancel: &CancellationToken,
        progress: &dyn VerifyProgress,
    ) -> Result<VerificationRun> {
        let run_id = Id::new();
        let started_at = IsoDateTime::now();
        info!(%run_id, chars = document_text.len(), "run started");

        let claims = self.extractor.extract(document_text).await?;
        if claims.is_empty() {
            info!(%run_id, "no verifiable claims found");
        }

        let verdicts = self
            .verifier
            .verify_all_with(&claims, cancel, progress)
            .await?;
        let report = summarize(&verdicts);
        info!(
            %run_id,
            verified = report.counts.verified,
            inaccurate = report.counts.inaccurate,
            false_ = report.counts.false_,
            unverifiable = report.counts.unverifiable,
            "run finished"
        );

        Ok(VerificationRun {
            run_id,
            started_at,
            finished_at: IsoDateTime::now(),
            report,
        })
    }
}
