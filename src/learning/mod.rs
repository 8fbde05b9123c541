//! Prompt learning
//!
//! Turns consultant transcripts into training samples and runs the
//! improvement loop that rewrites the chatbot prompt from them.

pub mod segmenter;
pub mod prompts;
pub mod engine;

pub use segmenter::{segment, segment_file, Conversation};
pub use engine::{Improvement, ImprovementEngine, TrainingReport};
