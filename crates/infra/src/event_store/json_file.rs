use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use invenhub_core::{AggregateId, ExpectedVersion};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, StreamKey, UncommittedEvent, batch_key, prepare_append};

const LOG_FILE: &str = "events.jsonl";

#[derive(Debug)]
struct Inner {
    file: File,
    streams: HashMap<StreamKey, Vec<StoredEvent>>,
    log: Vec<StoredEvent>,
}

/// Append-only event store persisted as JSON lines (one stored event per line).
///
/// The whole log is replayed into memory on open. Appends are validated,
/// written and flushed before the in-memory view changes, all under one lock,
/// so a failed write never leaves a half-applied batch visible to readers.
#[derive(Debug)]
pub struct JsonFileEventStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl JsonFileEventStore {
    /// Open (or create) the event log under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, EventStoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(LOG_FILE);

        let file = OpenOptions::new().create(true).append(true).read(true).open(&path)?;

        let mut streams: HashMap<StreamKey, Vec<StoredEvent>> = HashMap::new();
        let mut log = Vec::new();

        for (line_no, line) in BufReader::new(File::open(&path)?).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: StoredEvent = serde_json::from_str(&line)
                .map_err(|e| EventStoreError::Corrupt(format!("line {}: {e}", line_no + 1)))?;

            let stream = streams
                .entry((event.aggregate_type.clone(), event.aggregate_id))
                .or_default();
            let expected = stream.last().map(|e| e.sequence_number).unwrap_or(0) + 1;
            if event.sequence_number != expected {
                return Err(EventStoreError::Corrupt(format!(
                    "line {}: stream {}/{} expected sequence {expected}, found {}",
                    line_no + 1,
                    event.aggregate_type,
                    event.aggregate_id,
                    event.sequence_number
                )));
            }
            stream.push(event.clone());
            log.push(event);
        }

        tracing::info!(path = %path.display(), events = log.len(), "opened event log");

        Ok(Self {
            path,
            inner: Mutex::new(Inner { file, streams, log }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventStore for JsonFileEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(key) = batch_key(&events) else {
            return Ok(vec![]);
        };

        let mut inner = self.inner.lock().map_err(|_| EventStoreError::Poisoned)?;
        let stream = inner.streams.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        let committed = prepare_append(stream, events, expected_version)?;

        let mut buf = Vec::new();
        for e in &committed {
            serde_json::to_writer(&mut buf, e)
                .map_err(|err| EventStoreError::InvalidAppend(err.to_string()))?;
            buf.push(b'\n');
        }
        inner.file.write_all(&buf)?;
        inner.file.flush()?;

        inner
            .streams
            .entry(key)
            .or_default()
            .extend(committed.iter().cloned());
        inner.log.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(&self, aggregate_type: &str, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self.inner.lock().map_err(|_| EventStoreError::Poisoned)?;
        Ok(inner
            .streams
            .get(&(aggregate_type.to_string(), aggregate_id))
            .cloned()
            .unwrap_or_default())
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self.inner.lock().map_err(|_| EventStoreError::Poisoned)?;
        Ok(inner.log.clone())
    }
}
