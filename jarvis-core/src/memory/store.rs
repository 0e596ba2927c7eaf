use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::memory::extraction::MemoryExtraction;

const TOPIC_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "chatId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub topic: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemoryData {
    #[serde(default)]
    user_preferences: BTreeMap<String, String>,
    #[serde(default)]
    facts: Vec<Fact>,
    #[serde(default)]
    previous_topics: Vec<Topic>,
}

/// The part of the store that is shown to the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub user_preferences: BTreeMap<String, String>,
    pub recent_facts: Vec<Fact>,
    pub previous_topics: Vec<Topic>,
}

#[derive(Debug)]
pub struct MemoryStore {
    data: MemoryData,
    path: PathBuf,
}

impl MemoryStore {
    /// An empty store that will be written to `path` on first mutation.
    pub fn new(path: PathBuf) -> Self {
        Self {
            data: MemoryData::default(),
            path,
        }
    }

    /// Load the blob at `path`. A missing file is an empty store; a file that
    /// no longer parses is moved to `<name>.backup` and replaced.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read memory file: {}", path.display()))?;

        match serde_json::from_str::<MemoryData>(&content) {
            Ok(data) => Ok(Self {
                data,
                path: path.to_path_buf(),
            }),
            Err(e) => {
                let backup_path = path.with_extension("json.backup");
                warn!(?e, backup = %backup_path.display(), "Memory file is corrupt, starting fresh");
                fs::rename(path, &backup_path).with_context(|| {
                    format!("Failed to backup corrupted memory to {backup_path:?}")
                })?;

                let store = Self::new(path.to_path_buf());
                store.save()?;
                Ok(store)
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        write_data(&self.path, &self.data)
    }

    /// Writes a changed copy and keeps it only once the write succeeded.
    fn commit(&mut self, change: impl FnOnce(&mut MemoryData)) -> Result<()> {
        let mut data = self.data.clone();
        change(&mut data);
        write_data(&self.path, &data)?;
        self.data = data;
        Ok(())
    }

    /// Last write wins.
    pub fn set_preference(&mut self, key: &str, value: &str) -> Result<()> {
        self.commit(|data| {
            data.user_preferences.insert(key.to_string(), value.to_string());
        })
    }

    pub fn add_fact(&mut self, text: &str, session_id: Option<&str>) -> Result<()> {
        self.commit(|data| push_fact(data, text, session_id))
    }

    /// Logs the first 50 characters of `message` as a topic.
    pub fn add_topic(&mut self, message: &str) -> Result<()> {
        self.commit(|data| push_topic(data, message))
    }

    /// Record everything `extraction` found, then persist once.
    pub fn apply(&mut self, extraction: &MemoryExtraction, session_id: Option<&str>) -> Result<()> {
        self.commit(|data| {
            for (key, value) in &extraction.preferences {
                data.user_preferences.insert(key.to_string(), value.clone());
            }
            if let Some(fact) = &extraction.fact {
                push_fact(data, fact, session_id);
            }
            if let Some(topic) = &extraction.topic {
                push_topic(data, topic);
            }
        })?;
        debug!(
            preferences = extraction.preferences.len(),
            fact = extraction.fact.is_some(),
            topic = extraction.topic.is_some(),
            "Applied memory extraction"
        );
        Ok(())
    }

    /// Preferences plus the newest facts and topics, oldest first.
    pub fn snapshot(&self, recent_facts: usize, recent_topics: usize) -> MemorySnapshot {
        MemorySnapshot {
            user_preferences: self.data.user_preferences.clone(),
            recent_facts: tail(&self.data.facts, recent_facts).to_vec(),
            previous_topics: tail(&self.data.previous_topics, recent_topics).to_vec(),
        }
    }

    pub fn preferences(&self) -> &BTreeMap<String, String> {
        &self.data.user_preferences
    }

    pub fn facts(&self) -> &[Fact] {
        &self.data.facts
    }

    pub fn topics(&self) -> &[Topic] {
        &self.data.previous_topics
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_data(path: &Path, data: &MemoryData) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create memory directory: {}", parent.display())
        })?;
    }

    let content = serde_json::to_string_pretty(data).context("Failed to serialize memory")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write memory file: {}", path.display()))
}

fn push_fact(data: &mut MemoryData, text: &str, session_id: Option<&str>) {
    data.facts.push(Fact {
        text: text.to_string(),
        timestamp: Utc::now(),
        session_id: session_id.map(str::to_string),
    });
}

fn push_topic(data: &mut MemoryData, message: &str) {
    data.previous_topics.push(Topic {
        topic: message.chars().take(TOPIC_CHARS).collect(),
        timestamp: Utc::now(),
    });
}

fn tail<T>(items: &[T], count: usize) -> &[T] {
    &items[items.len().saturating_sub(count)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::extraction::analyze;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, MemoryStore) {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path().join("memory.json"));
        (dir, store)
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let (dir, mut store) = temp_store();
        let path = dir.path().join("memory.json");

        store.set_preference("name", "Alex").unwrap();
        assert_eq!(
            MemoryStore::load(&path).unwrap().preferences()["name"],
            "Alex"
        );

        store.add_fact("I hate mushrooms", Some("42")).unwrap();
        let loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded.facts()[0].text, "I hate mushrooms");
        assert_eq!(loaded.facts()[0].session_id.as_deref(), Some("42"));

        store.add_topic(&"x".repeat(80)).unwrap();
        assert_eq!(MemoryStore::load(&path).unwrap().topics()[0].topic.len(), 50);
    }

    #[test]
    fn test_preferences_are_last_write_wins() {
        let (_dir, mut store) = temp_store();
        store.set_preference("job", "teacher").unwrap();
        store.set_preference("job", "pilot").unwrap();

        assert_eq!(store.preferences().len(), 1);
        assert_eq!(store.preferences()["job"], "pilot");
    }

    #[test]
    fn test_snapshot_returns_recent_suffix() {
        let (_dir, mut store) = temp_store();
        for i in 0..12 {
            store.add_fact(&format!("fact {i}"), None).unwrap();
            store.add_topic(&format!("topic {i}")).unwrap();
        }

        let snapshot = store.snapshot(10, 5);

        assert_eq!(snapshot.recent_facts.len(), 10);
        assert_eq!(snapshot.recent_facts[0].text, "fact 2");
        assert_eq!(snapshot.previous_topics.len(), 5);
        assert_eq!(snapshot.previous_topics[4].topic, "topic 11");
    }

    #[test]
    fn test_apply_remember_command() {
        let (_dir, mut store) = temp_store();

        store
            .apply(&analyze("remember that I hate mushrooms"), None)
            .unwrap();

        assert_eq!(store.facts().len(), 1);
        assert_eq!(store.facts()[0].text, "I hate mushrooms");
        assert!(store.topics().is_empty());
    }

    #[test]
    fn test_apply_name_statement() {
        let (_dir, mut store) = temp_store();

        store.apply(&analyze("My name is Alex."), None).unwrap();

        assert_eq!(store.preferences()["name"], "Alex");
        assert_eq!(store.topics().len(), 1);
        assert_eq!(store.topics()[0].topic, "My name is Alex.");
    }

    #[test]
    fn test_failed_write_keeps_previous_state() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let mut store = MemoryStore::new(blocker.join("memory.json"));

        assert!(store.set_preference("name", "Alex").is_err());
        assert!(store
            .apply(&analyze("remember that I hate mushrooms"), None)
            .is_err());

        assert!(store.preferences().is_empty());
        assert!(store.facts().is_empty());
        assert!(store.topics().is_empty());
    }

    #[test]
    fn test_load_reads_legacy_chat_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        fs::write(
            &path,
            r#"{"userPreferences": {"name": "Sam"},
                "facts": [{"text": "I own a boat", "timestamp": "2024-09-21T14:00:00.000Z", "chatId": "1726927200000"}],
                "previousTopics": []}"#,
        )
        .unwrap();

        let store = MemoryStore::load(&path).unwrap();

        assert_eq!(store.facts()[0].session_id.as_deref(), Some("1726927200000"));
    }

    #[test]
    fn test_corrupt_file_is_backed_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        fs::write(&path, "{ not json").unwrap();

        let store = MemoryStore::load(&path).unwrap();

        assert!(store.facts().is_empty());
        assert!(dir.path().join("memory.json.backup").exists());
        assert!(MemoryStore::load(&path).unwrap().facts().is_empty());
    }

    #[test]
    fn test_load_nonexistent_creates_empty() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::load(&dir.path().join("missing.json")).unwrap();
        assert!(store.preferences().is_empty());
        assert!(!store.path().exists());
    }
}
