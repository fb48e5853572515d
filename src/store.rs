use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::documents;
use crate::models::StandaloneDeadline;

/// University documents and standalone deadline rows written by scrapers.
#[async_trait]
pub trait UniversityStore: Send + Sync {
    async fn find_all(&self) -> anyhow::Result<Vec<Value>>;

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Value>>;

    async fn insert(&self, name: &str, doc: Value) -> anyhow::Result<Uuid>;

    /// Removes every document stored under exactly `name`.
    async fn delete_many(&self, name: &str) -> anyhow::Result<u64>;

    async fn find_all_deadlines(&self) -> anyhow::Result<Vec<StandaloneDeadline>>;

    /// Drops every standalone row for `university_name` and stores `rows` in
    /// their place. Returns the number of rows stored.
    async fn replace_deadlines(
        &self,
        university_name: &str,
        rows: Vec<StandaloneDeadline>,
    ) -> anyhow::Result<u64>;
}

/// Validates a scraped document and swaps it in for any previous copy.
pub async fn replace_university(store: &dyn UniversityStore, doc: &Value) -> anyhow::Result<Uuid> {
    let university = documents::university_from_document(doc)?;
    let removed = store.delete_many(&university.name).await?;
    let doc = serde_json::to_value(&university).context("failed to encode university")?;
    let id = store.insert(&university.name, doc).await?;
    info!(
        university = %university.name,
        replaced = removed,
        deadlines = university.deadlines.len(),
        "stored university document"
    );
    Ok(id)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub universities: usize,
    pub deadlines: usize,
}

/// Loads scraper output and stores every valid entry. The file holds one
/// entry or an array of them. An entry with `university_name` is a standalone
/// deadline row; anything else is a university document.
pub async fn ingest_file(
    store: &dyn UniversityStore,
    path: &Path,
) -> anyhow::Result<IngestSummary> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {} as JSON", path.display()))?;

    let entries = match parsed {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut summary = IngestSummary::default();
    let mut rows: Vec<StandaloneDeadline> = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        if documents::is_standalone_deadline(entry) {
            match documents::standalone_deadline(entry) {
                Ok(row) => rows.push(row),
                Err(err) => warn!(index, error = %err, "skipping scraped deadline"),
            }
            continue;
        }
        match documents::university_from_document(entry) {
            Ok(_) => {
                replace_university(store, entry).await?;
                summary.universities += 1;
            }
            Err(err) => warn!(index, error = %err, "skipping scraped document"),
        }
    }

    // One replace per university, in first-seen order.
    let mut names: Vec<String> = Vec::new();
    for row in &rows {
        if !names.contains(&row.university_name) {
            names.push(row.university_name.clone());
        }
    }
    for name in names {
        let group: Vec<StandaloneDeadline> = rows
            .iter()
            .filter(|row| row.university_name == name)
            .cloned()
            .collect();
        let stored = store.replace_deadlines(&name, group).await?;
        info!(university = %name, deadlines = stored, "stored standalone deadlines");
        summary.deadlines += stored as usize;
    }

    Ok(summary)
}

#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<Vec<(Uuid, String, Value)>>,
    deadlines: Mutex<Vec<StandaloneDeadline>>,
}

impl MemoryStore {
    pub fn with_documents(docs: Vec<Value>) -> Self {
        let rows = docs
            .into_iter()
            .map(|doc| {
                let name = doc
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                (Uuid::new_v4(), name, doc)
            })
            .collect();
        Self {
            docs: Mutex::new(rows),
            deadlines: Mutex::default(),
        }
    }

    pub fn with_deadlines(self, rows: Vec<StandaloneDeadline>) -> Self {
        Self {
            deadlines: Mutex::new(rows),
            ..self
        }
    }
}

#[async_trait]
impl UniversityStore for MemoryStore {
    async fn find_all(&self) -> anyhow::Result<Vec<Value>> {
        Ok(self.docs.lock().await.iter().map(|(_, _, doc)| doc.clone()).collect())
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Value>> {
        Ok(self
            .docs
            .lock()
            .await
            .iter()
            .find(|(_, _, doc)| documents::matches_name(doc, name))
            .map(|(_, _, doc)| doc.clone()))
    }

    async fn insert(&self, name: &str, doc: Value) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        self.docs.lock().await.push((id, name.to_string(), doc));
        Ok(id)
    }

    async fn delete_many(&self, name: &str) -> anyhow::Result<u64> {
        let mut docs = self.docs.lock().await;
        let before = docs.len();
        docs.retain(|(_, stored, _)| stored != name);
        Ok((before - docs.len()) as u64)
    }

    async fn find_all_deadlines(&self) -> anyhow::Result<Vec<StandaloneDeadline>> {
        Ok(self.deadlines.lock().await.clone())
    }

    async fn replace_deadlines(
        &self,
        university_name: &str,
        rows: Vec<StandaloneDeadline>,
    ) -> anyhow::Result<u64> {
        let mut deadlines = self.deadlines.lock().await;
        deadlines.retain(|row| row.university_name != university_name);
        let stored = rows.len() as u64;
        deadlines.extend(rows);
        Ok(stored)
    }
}
