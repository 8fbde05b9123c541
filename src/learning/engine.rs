//! Improvement engine
//!
//! Drives the learning loop: predict a reply with the active prompt, ask the
//! backend to rewrite the prompt toward the real consultant reply, persist
//! the result. Also hosts the manual-update and direct-edit paths.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::agent::{LlmClient, RetryPolicy};
use crate::agent::generation::{
    is_error_sentinel, GenerationClient, BUSY_SENTINEL, ERROR_BUSY_SENTINEL, MISSING_KEY_SENTINEL,
};
use crate::config::Config;
use crate::error::{EngineError, GenerationError};
use crate::learning::prompts::{
    compose_improvement_prompt, compose_manual_prompt, compose_reply_prompt, PROMPT_FIELD,
    REPLY_FIELD,
};
use crate::store::PromptStore;
use crate::types::{PromptSource, Sample, Turn};

/// Outcome of one improvement step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvement {
    pub predicted_reply: String,
    pub updated_prompt: String,
}

/// Summary of a batch training run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainingReport {
    /// Samples run through `improve`
    pub processed: usize,
    /// Steps whose prompt actually changed
    pub changed: usize,
    /// Steps whose prediction came back as the busy sentinel
    pub busy: usize,
    /// Active prompt after the run
    pub final_prompt: String,
}

/// Learning loop over a prompt store and a generation client
#[derive(Clone)]
pub struct ImprovementEngine {
    store: PromptStore,
    generator: GenerationClient,
}

impl ImprovementEngine {
    pub fn new(store: PromptStore, generator: GenerationClient) -> Self {
        Self { store, generator }
    }

    /// Engine over the configured storage tiers and HTTP backend
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = PromptStore::from_config(&config.storage);
        let backend = Arc::new(LlmClient::from_config(&config.llm)?);
        let generator = GenerationClient::new(backend, RetryPolicy::from_config(&config.retry));
        Ok(Self::new(store, generator))
    }

    pub fn store(&self) -> &PromptStore {
        &self.store
    }

    /// Text of the currently active prompt
    pub fn active_prompt(&self) -> String {
        self.store.get_active_prompt()
    }

    /// Consultant reply for a client message under the active prompt
    pub async fn reply(&self, client_sequence: &str, chat_history: &[Turn]) -> String {
        let current = self.store.get_active_prompt();
        let prompt = compose_reply_prompt(&current, client_sequence, chat_history);
        self.generator
            .generate_or(&prompt, REPLY_FIELD, BUSY_SENTINEL)
            .await
    }

    /// One learning step against a real consultant reply.
    ///
    /// Not atomic: a failed save is logged and the generated values are
    /// still returned.
    pub async fn improve(
        &self,
        client_sequence: &str,
        chat_history: &[Turn],
        consultant_reply: &str,
    ) -> Improvement {
        let current = self.store.get_active_prompt();

        let reply_prompt = compose_reply_prompt(&current, client_sequence, chat_history);
        let predicted_reply = self
            .generator
            .generate_or(&reply_prompt, REPLY_FIELD, BUSY_SENTINEL)
            .await;

        let improvement_prompt = compose_improvement_prompt(
            &current,
            client_sequence,
            chat_history,
            consultant_reply,
            &predicted_reply,
        );
        let updated_prompt = match self.generator.generate(&improvement_prompt, PROMPT_FIELD).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("Prompt improvement came back blank, keeping current prompt");
                current.clone()
            }
            Err(e) => {
                warn!("Prompt improvement failed, keeping current prompt: {}", e);
                current.clone()
            }
        };

        if let Err(e) = self
            .store
            .save_new_prompt(&updated_prompt, PromptSource::AutoLearning)
        {
            warn!("Improved prompt was not persisted: {}", e);
        }

        Improvement {
            predicted_reply,
            updated_prompt,
        }
    }

    /// Rewrite the active prompt per free-text instructions
    pub async fn apply_instructions(&self, instructions: &str) -> Result<String, EngineError> {
        let current = self.store.get_active_prompt();
        let prompt = compose_manual_prompt(&current, instructions);

        let updated = match self.generator.generate(&prompt, PROMPT_FIELD).await {
            Ok(text) => text,
            Err(GenerationError::BackendUnavailable) => MISSING_KEY_SENTINEL.to_string(),
            Err(e) => {
                warn!("Manual prompt update failed: {}", e);
                ERROR_BUSY_SENTINEL.to_string()
            }
        };

        if is_error_sentinel(&updated) {
            return Err(EngineError::GenerationFailed(updated));
        }

        self.store
            .save_new_prompt(&updated, PromptSource::ManualUpdate)?;
        Ok(updated)
    }

    /// Persist operator-supplied prompt text as-is
    pub fn direct_save(&self, text: &str) -> Result<String, EngineError> {
        if text.trim().is_empty() {
            return Err(EngineError::EmptyPrompt);
        }
        let version = self.store.save_new_prompt(text, PromptSource::DirectEdit)?;
        Ok(version.text)
    }

    /// Run `improve` over samples in order, one at a time
    pub async fn train(&self, samples: &[Sample], limit: Option<usize>) -> TrainingReport {
        let total = limit.map_or(samples.len(), |l| l.min(samples.len()));
        let mut report = TrainingReport::default();

        for (i, sample) in samples.iter().take(total).enumerate() {
            info!("Training on sample {}/{}", i + 1, total);
            let before = self.store.get_active_prompt();

            let step = self
                .improve(
                    &sample.client_sequence,
                    &sample.chat_history,
                    &sample.consultant_reply,
                )
                .await;

            report.processed += 1;
            if step.predicted_reply == BUSY_SENTINEL {
                report.busy += 1;
            }
            if step.updated_prompt != before {
                report.changed += 1;
            }
        }

        report.final_prompt = self.store.get_active_prompt();
        info!(
            processed = report.processed,
            changed = report.changed,
            "Training finished"
        );
        report
    }
}
