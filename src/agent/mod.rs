//! Agent module - generation backend and retry handling

pub mod llm;
pub mod retry;
pub mod generation;

pub use generation::GenerationClient;
pub use llm::{GenerationBackend, LlmClient};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
