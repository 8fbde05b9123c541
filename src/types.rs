//! Shared types used across modules
//!
//! Transcript messages, the samples cut from them, and the prompt versions
//! the learning loop produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a transcript message as recorded by the chat platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Direction {
    /// Sent by the client (`"in"`)
    Inbound,
    /// Anything else, sent by the consultant
    Outbound,
}

impl From<String> for Direction {
    fn from(s: String) -> Self {
        if s == "in" {
            Direction::Inbound
        } else {
            Direction::Outbound
        }
    }
}

impl From<Direction> for String {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Inbound => "in".to_string(),
            Direction::Outbound => "out".to_string(),
        }
    }
}

/// A single transcript message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub direction: Direction,
    #[serde(default)]
    pub text: String,
}

impl Message {
    pub fn inbound(text: impl Into<String>) -> Self {
        Self { direction: Direction::Inbound, text: text.into() }
    }

    pub fn outbound(text: impl Into<String>) -> Self {
        Self { direction: Direction::Outbound, text: text.into() }
    }

    /// Resolved speaker role
    pub fn role(&self) -> Role {
        match self.direction {
            Direction::Inbound => Role::Client,
            Direction::Outbound => Role::Consultant,
        }
    }
}

/// Speaker role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Consultant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Consultant => "consultant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One speaking turn in a chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub message: String,
}

impl Turn {
    pub fn new(role: Role, message: impl Into<String>) -> Self {
        Self { role, message: message.into() }
    }
}

/// A supervised training sample: history, client input, real consultant reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub client_sequence: String,
    pub consultant_reply: String,
    pub chat_history: Vec<Turn>,
}

/// Where a prompt version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptSource {
    AutoLearning,
    ManualUpdate,
    DirectEdit,
    Auto,
}

impl PromptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptSource::AutoLearning => "auto_learning",
            PromptSource::ManualUpdate => "manual_update",
            PromptSource::DirectEdit => "direct_edit",
            PromptSource::Auto => "auto",
        }
    }

    /// Parse a stored source string. Unknown values map to `Auto`.
    pub fn parse(s: &str) -> Self {
        match s {
            "auto_learning" => PromptSource::AutoLearning,
            "manual_update" => PromptSource::ManualUpdate,
            "direct_edit" => PromptSource::DirectEdit,
            _ => PromptSource::Auto,
        }
    }
}

impl std::fmt::Display for PromptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable prompt version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptVersion {
    pub text: String,
    pub source: PromptSource,
    pub created_at: DateTime<Utc>,
}

impl PromptVersion {
    /// Stamp a new version with the current time
    pub fn new(text: impl Into<String>, source: PromptSource) -> Self {
        Self {
            text: text.into(),
            source,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parsing() {
        let m: Message = serde_json::from_str(r#"{"direction":"in","text":"hi"}"#).unwrap();
        assert_eq!(m.role(), Role::Client);

        let m: Message = serde_json::from_str(r#"{"direction":"out","text":"hello"}"#).unwrap();
        assert_eq!(m.role(), Role::Consultant);

        // anything that is not "in" is the consultant
        let m: Message = serde_json::from_str(r#"{"direction":"agent","text":"x"}"#).unwrap();
        assert_eq!(m.role(), Role::Consultant);
    }

    #[test]
    fn test_direction_is_required() {
        assert!(serde_json::from_str::<Message>(r#"{"text":"hi"}"#).is_err());
    }

    #[test]
    fn test_sample_wire_names() {
        let sample = Sample {
            client_sequence: "hi".into(),
            consultant_reply: "hello".into(),
            chat_history: vec![Turn::new(Role::Client, "earlier")],
        };
        let v = serde_json::to_value(&sample).unwrap();
        assert_eq!(v["clientSequence"], "hi");
        assert_eq!(v["consultantReply"], "hello");
        assert_eq!(v["chatHistory"][0]["role"], "client");
        assert_eq!(v["chatHistory"][0]["message"], "earlier");
    }

    #[test]
    fn test_prompt_source_strings() {
        for source in [
            PromptSource::AutoLearning,
            PromptSource::ManualUpdate,
            PromptSource::DirectEdit,
            PromptSource::Auto,
        ] {
            assert_eq!(PromptSource::parse(source.as_str()), source);
        }
        assert_eq!(PromptSource::parse("something-else"), PromptSource::Auto);
        assert_eq!(
            serde_json::to_string(&PromptSource::AutoLearning).unwrap(),
            "\"auto_learning\""
        );
    }
}
