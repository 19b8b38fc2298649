use crate::common::{EventEnvelope, RunJournal};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

/// JSON Lines run history, one file per aggregate id.
pub struct FileRunJournal {
    base_path: PathBuf,
}

impl FileRunJournal {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn file_path(&self, aggregate_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", aggregate_id))
    }

    /// Aggregate ids that have history on disk.
    pub fn list_aggregates(&self) -> Result<Vec<String>, String> {
        if !self.base_path.exists() {
            return Ok(vec![]);
        }
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| format!("Failed to read journal directory: {}", e))?;
        let mut ids = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl RunJournal for FileRunJournal {
    fn append(&self, events: &[EventEnvelope]) -> Result<(), String> {
        if events.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.base_path)
            .map_err(|e| format!("Failed to create journal directory: {}", e))?;

        // A flush can span several runs after a reset, so group by aggregate.
        let mut start = 0;
        while start < events.len() {
            let aggregate_id = &events[start].aggregate_id;
            let end = events[start..]
                .iter()
                .position(|e| &e.aggregate_id != aggregate_id)
                .map_or(events.len(), |p| start + p);

            let file_path = self.file_path(aggregate_id);
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file_path)
                .map_err(|e| format!("Failed to open journal file {}: {}", file_path.display(), e))?;

            for event in &events[start..end] {
                let line = serde_json::to_string(event)
                    .map_err(|e| format!("Failed to serialize event: {}", e))?;
                writeln!(file, "{}", line).map_err(|e| format!("Failed to write event: {}", e))?;
            }
            file.flush().map_err(|e| format!("Failed to flush file: {}", e))?;
            start = end;
        }
        Ok(())
    }

    fn load(&self, aggregate_id: &str) -> Result<Vec<EventEnvelope>, String> {
        let file_path = self.file_path(aggregate_id);
        if !file_path.exists() {
            return Ok(vec![]);
        }

        let file = File::open(&file_path)
            .map_err(|e| format!("Failed to open journal file {}: {}", file_path.display(), e))?;

        let mut events = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read line: {}", e))?;
            if line.trim().is_empty() {
                continue;
            }
            let event: EventEnvelope = serde_json::from_str(&line)
                .map_err(|e| format!("Failed to deserialize event at line {}: {}", number + 1, e))?;
            events.push(event);
        }
        Ok(events)
    }
}
