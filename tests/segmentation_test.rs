//! Transcript file to training samples

use reply_tuner::learning::segmenter::{load_conversations, segment, segment_file};
use reply_tuner::Role;
use std::io::Write;
use tempfile::NamedTempFile;

const TRANSCRIPT: &str = r#"[
  {"conversation": [
    {"direction": "in",  "text": "Hi"},
    {"direction": "in",  "text": "Is the DTV open to freelancers?"},
    {"direction": "out", "text": "Yes! Remote workers qualify."},
    {"direction": "in",  "text": "Great, what documents?"},
    {"direction": "out", "text": "Passport and bank statement."}
  ]},
  {"conversation": []},
  {"conversation": [
    {"direction": "out", "text": "Following up on your application"},
    {"direction": "out", "text": "Any news?"}
  ]},
  {"conversation": [
    {"direction": "in",  "text": "Hello again"},
    {"direction": "agent", "text": "Welcome back"}
  ]}
]"#;

fn transcript_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_segment_file() {
    let file = transcript_file(TRANSCRIPT);
    let samples = segment_file(file.path()).unwrap();

    assert_eq!(samples.len(), 3);

    assert_eq!(samples[0].client_sequence, "Hi\n\nIs the DTV open to freelancers?");
    assert_eq!(samples[0].consultant_reply, "Yes! Remote workers qualify.");
    assert!(samples[0].chat_history.is_empty());

    assert_eq!(samples[1].client_sequence, "Great, what documents?");
    assert_eq!(samples[1].chat_history.len(), 1);
    assert_eq!(samples[1].chat_history[0].role, Role::Client);

    // any direction other than "in" is the consultant, history resets per conversation
    assert_eq!(samples[2].consultant_reply, "Welcome back");
    assert!(samples[2].chat_history.is_empty());
}

#[test]
fn test_segmentation_is_deterministic() {
    let file = transcript_file(TRANSCRIPT);
    let conversations = load_conversations(file.path()).unwrap();
    assert_eq!(conversations.len(), 4);
    assert_eq!(segment(&conversations), segment(&conversations));
}

#[test]
fn test_samples_serialize_camel_case() {
    let file = transcript_file(TRANSCRIPT);
    let samples = segment_file(file.path()).unwrap();
    let json = serde_json::to_value(&samples[1]).unwrap();

    assert_eq!(json["clientSequence"], "Great, what documents?");
    assert_eq!(json["consultantReply"], "Passport and bank statement.");
    assert_eq!(json["chatHistory"][0]["role"], "client");
}

#[test]
fn test_bad_transcript_is_an_error() {
    let file = transcript_file("{not json");
    assert!(segment_file(file.path()).is_err());
    assert!(segment_file(std::path::Path::new("/nonexistent/transcript.json")).is_err());
}
