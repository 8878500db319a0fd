//! File-backed streaming sink writing one JSON document per line.

use crate::error::{EventError, EventResult};
use crate::sink::StreamingSink;
use docstore_types::ChangeRecord;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends records to `<dir>/<stream>.jsonl`.
///
/// Files are opened lazily on first use of a stream and kept open.
pub struct JsonLinesSink {
    dir: PathBuf,
    files: Mutex<HashMap<String, File>>,
}

impl JsonLinesSink {
    /// Opens a sink rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> EventResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Path of the file backing `stream`.
    pub fn stream_path(&self, stream: &str) -> PathBuf {
        self.dir.join(format!("{stream}.jsonl"))
    }

    fn validate_stream(stream: &str) -> EventResult<()> {
        let valid = !stream.is_empty()
            && stream
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && stream != "."
            && stream != "..";
        if valid {
            Ok(())
        } else {
            Err(EventError::Config(format!("invalid stream name: {stream:?}")))
        }
    }
}

impl StreamingSink for JsonLinesSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn put_record(&self, stream: &str, record: &ChangeRecord) -> EventResult<()> {
        Self::validate_stream(stream)?;

        let mut line = record.to_json()?;
        line.push('\n');

        let mut files = self.files.lock();
        if !files.contains_key(stream) {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.stream_path(stream))?;
            files.insert(stream.to_string(), file);
        }
        let file = files
            .get_mut(stream)
            .ok_or_else(|| EventError::Unavailable(format!("stream {stream} not open")))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for JsonLinesSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink").field("dir", &self.dir).finish()
    }
}
