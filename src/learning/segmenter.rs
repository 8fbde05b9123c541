//! Transcript segmentation
//!
//! Cuts direction-tagged transcripts into (history, client input, consultant
//! reply) samples. Only direction and position are inspected, never content.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::types::{Message, Role, Sample, Turn};

const TURN_SEPARATOR: &str = "\n\n";

/// One conversation from a transcript export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "conversation", default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// A maximal run of consecutive messages from the same role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub role: Role,
    pub texts: Vec<String>,
}

impl Block {
    fn seed(message: &Message) -> Self {
        Self {
            role: message.role(),
            texts: vec![message.text.clone()],
        }
    }

    /// Texts joined the way a speaking turn is presented to the model
    pub fn joined(&self) -> String {
        self.texts.join(TURN_SEPARATOR)
    }

    pub fn to_turn(&self) -> Turn {
        Turn::new(self.role, self.joined())
    }
}

/// Merge consecutive same-role messages into blocks
pub fn group_blocks(messages: &[Message]) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();

    for message in messages {
        match blocks.last_mut() {
            Some(current) if current.role == message.role() => {
                current.texts.push(message.text.clone());
            }
            _ => blocks.push(Block::seed(message)),
        }
    }

    blocks
}

/// Segment a single conversation. History never crosses conversations.
pub fn segment_conversation(messages: &[Message]) -> Vec<Sample> {
    let blocks = group_blocks(messages);
    let mut samples = Vec::new();
    let mut history: Vec<Turn> = Vec::new();

    for pair in blocks.windows(2) {
        let (block, next) = (&pair[0], &pair[1]);

        if block.role == Role::Client && next.role == Role::Consultant {
            samples.push(Sample {
                client_sequence: block.joined(),
                consultant_reply: next.joined(),
                chat_history: history.clone(),
            });
        }

        // history grows by position, whether or not a sample was cut here
        history.push(block.to_turn());
    }

    samples
}

/// Segment every conversation into one flat, ordered sample list
pub fn segment(conversations: &[Conversation]) -> Vec<Sample> {
    conversations
        .iter()
        .filter(|c| !c.messages.is_empty())
        .flat_map(|c| segment_conversation(&c.messages))
        .collect()
}

/// Load a transcript export (`[{"conversation": [...]}, ...]`)
pub fn load_conversations(path: &Path) -> Result<Vec<Conversation>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript file {}", path.display()))?;
    let conversations: Vec<Conversation> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse transcript file {}", path.display()))?;
    Ok(conversations)
}

/// Load and segment a transcript export
pub fn segment_file(path: &Path) -> Result<Vec<Sample>> {
    let conversations = load_conversations(path)?;
    let samples = segment(&conversations);
    info!(
        conversations = conversations.len(),
        samples = samples.len(),
        "Segmented transcript {}",
        path.display()
    );
    Ok(samples)
}
