//! End-to-end learning loop with a scripted backend and real storage tiers

use async_trait::async_trait;
use reply_tuner::agent::generation::{ERROR_BUSY_SENTINEL, BUSY_SENTINEL};
use reply_tuner::agent::Sleeper;
use reply_tuner::learning::prompts::DEFAULT_PROMPT;
use reply_tuner::store::init_schema;
use reply_tuner::{
    EngineError, GenerationBackend, GenerationClient, GenerationError, ImprovementEngine,
    LocalRecord, PromptSource, PromptStore, PromptTier, RetryPolicy, Role, SqlitePromptDb, Turn,
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Replays canned completions in order and records every prompt it saw
struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn is_configured(&self) -> bool {
        true
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::backend(None, "script exhausted")))
    }
}

#[derive(Default)]
struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

struct Fixture {
    engine: ImprovementEngine,
    local: LocalRecord,
    db: SqlitePromptDb,
    sleeper: Arc<RecordingSleeper>,
}

fn fixture(dir: &Path, backend: Arc<ScriptedBackend>) -> Fixture {
    let local = LocalRecord::new(dir.join("local_prompts.json"));
    let db_path = dir.join("prompts.db");
    init_schema(&db_path).unwrap();
    let db = SqlitePromptDb::new(&db_path);

    let sleeper = Arc::new(RecordingSleeper::default());
    let generator =
        GenerationClient::new(backend, RetryPolicy::default()).with_sleeper(sleeper.clone());
    let store = PromptStore::new(local.clone(), Some(db.clone()));

    Fixture {
        engine: ImprovementEngine::new(store, generator),
        local,
        db,
        sleeper,
    }
}

#[tokio::test]
async fn test_improvement_updates_active_prompt() {
    let dir = tempdir().unwrap();
    let backend = ScriptedBackend::new(vec![
        Ok("```json\n{\"reply\": \"Hello! How can I help with your DTV?\"}\n```".into()),
        Ok(r#"{"prompt": "You are Alex. Greet warmly, keep it short."}"#.into()),
    ]);
    let f = fixture(dir.path(), backend.clone());

    assert_eq!(f.engine.active_prompt(), DEFAULT_PROMPT);

    let history = vec![Turn::new(Role::Client, "Hi")];
    let step = f
        .engine
        .improve("Do you help with visas?", &history, "Hey! Yes, which visa?")
        .await;

    assert_eq!(step.predicted_reply, "Hello! How can I help with your DTV?");
    assert_eq!(step.updated_prompt, "You are Alex. Greet warmly, keep it short.");
    assert_eq!(f.engine.active_prompt(), step.updated_prompt);

    // both tiers hold the new version
    let local = f.local.load_latest().unwrap().unwrap();
    assert_eq!(local.source, PromptSource::AutoLearning);
    let row = f.db.load_latest().unwrap().unwrap();
    assert_eq!(row.text, step.updated_prompt);

    // the rewrite request carried both the prediction and the real reply
    let prompts = backend.prompts.lock().unwrap();
    assert!(prompts[0].contains(DEFAULT_PROMPT));
    assert!(prompts[1].contains("Hey! Yes, which visa?"));
    assert!(prompts[1].contains("Hello! How can I help with your DTV?"));
}

#[tokio::test]
async fn test_rate_limited_reply_degrades_to_sentinel() {
    let dir = tempdir().unwrap();
    let mut script: Vec<Result<String, GenerationError>> = (0..5)
        .map(|_| Err(GenerationError::RateLimited("RESOURCE_EXHAUSTED".into())))
        .collect();
    script.push(Ok(r#"{"prompt": "unchanged in spirit"}"#.into()));
    let backend = ScriptedBackend::new(script);
    let f = fixture(dir.path(), backend.clone());

    let step = f.engine.improve("Hi", &[], "Hello").await;

    assert_eq!(step.predicted_reply, BUSY_SENTINEL);
    assert_eq!(step.updated_prompt, "unchanged in spirit");
    assert_eq!(backend.calls(), 6);

    let slept: Vec<u64> = f.sleeper.slept.lock().unwrap().iter().map(|d| d.as_secs()).collect();
    assert_eq!(slept, vec![5, 10, 20, 40]);
}

#[tokio::test]
async fn test_manual_sentinel_is_not_persisted() {
    let dir = tempdir().unwrap();
    let backend = ScriptedBackend::new(
        (0..5)
            .map(|_| Err(GenerationError::backend(Some(429), "Too Many Requests")))
            .collect(),
    );
    let f = fixture(dir.path(), backend);
    f.engine.direct_save("Pinned prompt").unwrap();

    let err = f.engine.apply_instructions("mention pricing").await.unwrap_err();
    assert!(matches!(err, EngineError::GenerationFailed(ref s) if s == ERROR_BUSY_SENTINEL));

    assert_eq!(f.engine.active_prompt(), "Pinned prompt");
    assert_eq!(f.engine.store().history(10).len(), 1);
}

#[tokio::test]
async fn test_local_pin_hides_newer_database_rows() {
    let dir = tempdir().unwrap();
    let f = fixture(dir.path(), ScriptedBackend::new(vec![]));

    f.engine.direct_save("operator pin").unwrap();
    // another process writes only to the shared database
    f.db
        .persist(&reply_tuner::PromptVersion::new("newer remote", PromptSource::Auto))
        .unwrap();

    assert_eq!(f.engine.active_prompt(), "operator pin");
    assert_eq!(f.engine.store().history(1)[0].text, "newer remote");
}
