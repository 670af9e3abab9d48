//! Event data model and batch loading.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RunError;

/// One unit of work: an identifier assigned by the producer and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub payload: String,
}

impl Event {
    pub fn new(id: i64, payload: impl Into<String>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }
}

/// The five-event batch used when no event file is supplied.
pub fn sample_batch() -> Vec<Event> {
    vec![
        Event::new(1, "First event"),
        Event::new(2, "Second event"),
        Event::new(3, "Third event"),
        Event::new(4, "Fourth event"),
        Event::new(5, "Fifth event"),
    ]
}

/// Loads a batch from a JSON file holding an array of `{"id", "payload"}` objects.
pub fn load_batch(path: &Path) -> anyhow::Result<Vec<Event>> {
    let raw = std::fs::read_to_string(path)?;
    let events: Vec<Event> = serde_json::from_str(&raw)?;
    Ok(events)
}

/// Checks that every event id in the batch is unique.
pub fn ensure_unique_ids(events: &[Event]) -> Result<(), RunError> {
    let mut seen = HashSet::with_capacity(events.len());
    for event in events {
        if !seen.insert(event.id) {
            return Err(RunError::DuplicateEventId(event.id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sample_batch_ids() {
        let batch = sample_batch();
        let ids: Vec<i64> = batch.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(ensure_unique_ids(&batch).is_ok());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let batch = vec![Event::new(1, "a"), Event::new(2, "b"), Event::new(1, "c")];
        assert_eq!(
            ensure_unique_ids(&batch),
            Err(RunError::DuplicateEventId(1))
        );
    }

    #[test]
    fn test_load_batch_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"[{{"id": 10, "payload": "ten"}}, {{"id": 11, "payload": "eleven"}}]"#
        )
        .expect("write events");

        let events = load_batch(file.path()).expect("load batch");
        assert_eq!(events, vec![Event::new(10, "ten"), Event::new(11, "eleven")]);
    }

    #[test]
    fn test_load_batch_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"id": 1}}"#).expect("write");
        assert!(load_batch(file.path()).is_err());
    }
}
