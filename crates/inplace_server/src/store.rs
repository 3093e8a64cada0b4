//! Accepted edits, kept in memory and optionally appended to a log file.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

use crate::error::HttpError;

/// One accepted edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditRecord {
    pub name: String,
    pub pk: Value,
    pub value: String,
    pub user: String,
    pub timestamp: String,
}

impl EditRecord {
    fn log_line(&self) -> String {
        format!(
            "Field '{}' with ID '{}' updated to '{}' by {} at {}\n",
            self.name,
            pk_key(&self.pk),
            self.value,
            self.user,
            self.timestamp
        )
    }
}

fn pk_key(pk: &Value) -> String {
    match pk {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Default)]
struct Inner {
    latest: HashMap<(String, String), EditRecord>,
    history: Vec<EditRecord>,
}

/// Latest value per `(name, pk)` plus the full edit history.
#[derive(Debug, Default)]
pub struct EditStore {
    inner: Mutex<Inner>,
    log_path: Option<PathBuf>,
}

impl EditStore {
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            log_path,
        }
    }

    /// Store `record` and append it to the edit log when one is configured.
    ///
    /// # Errors
    /// Returns [`HttpError::Storage`] when the log cannot be written and
    /// [`HttpError::Internal`] when the store lock is poisoned.
    pub async fn record(&self, record: EditRecord) -> Result<(), HttpError> {
        if let Some(path) = &self.log_path {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(record.log_line().as_bytes()).await?;
            file.flush().await?;
        }
        let mut inner = self.inner.lock().map_err(|_| HttpError::Internal)?;
        inner.latest.insert(
            (record.name.clone(), pk_key(&record.pk)),
            record.clone(),
        );
        inner.history.push(record);
        Ok(())
    }

    /// Latest accepted edit for a field.
    pub fn get(&self, name: &str, pk: &Value) -> Option<EditRecord> {
        let inner = self.inner.lock().ok()?;
        inner
            .latest
            .get(&(name.to_string(), pk_key(pk)))
            .cloned()
    }

    /// Every accepted edit, oldest first.
    pub fn history(&self) -> Vec<EditRecord> {
        self.inner
            .lock()
            .map(|inner| inner.history.clone())
            .unwrap_or_default()
    }
}
