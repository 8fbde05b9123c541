//! reply-tuner - Consultant Chatbot Prompt Learning Library
//!
//! Learns a chatbot system prompt from real consultant transcripts:
//! - Segments direction-tagged transcripts into training samples
//! - Predicts replies with the active prompt and rewrites the prompt toward
//!   what the human consultant actually said
//! - Versions prompts across a local record and an optional SQLite database
//! - Retries the generative backend with exponential backoff on rate limits
//!
//! # Example
//!
//! ```ignore
//! use reply_tuner::{Config, ImprovementEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = ImprovementEngine::from_config(&Config::load()?)?;
//!     let reply = engine.reply("Can I extend my DTV?", &[]).await;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod error;
pub mod config;
pub mod store;
pub mod agent;
pub mod learning;
pub mod server;
pub mod cli;

pub use agent::{GenerationBackend, GenerationClient, LlmClient, RetryPolicy};
pub use config::Config;
pub use error::{ApiError, EngineError, GenerationError, StoreError};
pub use learning::{Improvement, ImprovementEngine, TrainingReport};
pub use store::{LocalRecord, PromptStore, PromptTier, SqlitePromptDb};
pub use types::{Message, PromptSource, PromptVersion, Role, Sample, Turn};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
