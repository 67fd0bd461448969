pub mod cancel;
pub mod extractor;
pub mod mock;
pub mod openai;
pub mod response;
pub mod run;
pub mod search;
pub mod traits;
pub mod verifier;

pub use cancel::CancellationToken;
pub use extractor::ClaimExtractor;
pub use mock::{DummySearch, FailingModel, FailingSearch, ScriptedModel, StaticSearch};
pub use openai::OpenAiModel;
pub use run::FactCheckPipeline;
pub use search::TavilySearch;
pub use traits::{EvidenceSearch, LanguageModel, Prompt, ResponseSchema};
pub use verifier::{FactVerifier, NoProgress, VerifyProgress};
