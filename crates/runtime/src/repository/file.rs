//! JSON Lines event log.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use game_core::Event;

use super::{EventRepository, RepositoryError, Result};

// ============================================================================
// FileEventLog
// ============================================================================

/// Append-only event log stored as JSON Lines.
///
/// One record per line, newline terminated:
/// ```text
/// {"type":"LoopEvent","data":{"loop":"encounter_start","active":true}}
/// {"type":"AddSpentEvent","data":{"actor":"fighter","key":"actions"}}
/// ```
///
/// Every append is written in a single call and synced before returning,
/// so a crash can at worst leave one unterminated record at the end of the
/// file. [`load`](EventRepository::load) reports that record as
/// [`RepositoryError::CorruptedTail`] instead of guessing at its contents.
///
/// A failed append is cut back to the previous record. If that fails too,
/// the log refuses every later append with [`RepositoryError::TornWrite`].
#[derive(Debug)]
pub struct FileEventLog {
    path: PathBuf,
    file: File,
    /// Byte offset of the next record.
    current_offset: u64,
    count: u64,
    /// Offset of a partial record that could not be removed.
    torn: Option<u64>,
}

impl FileEventLog {
    /// Open the log at `path`, creating it and its parent directories if
    /// needed. Existing records are not validated until `load`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;
        let current_offset = file.metadata()?.len();
        let count = std::fs::read(&path)?
            .iter()
            .filter(|byte| **byte == b'\n')
            .count() as u64;

        tracing::debug!(
            path = %path.display(),
            offset = current_offset,
            records = count,
            "opened event log"
        );

        Ok(Self {
            path,
            file,
            current_offset,
            count,
            torn: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&mut self, record: &[u8]) -> std::io::Result<()> {
        self.file.write_all(record)?;
        self.file.sync_data()
    }

    /// Truncates whatever a failed append left behind.
    fn rollback(&mut self, err: std::io::Error) -> RepositoryError {
        let offset = self.current_offset;
        match self.file.set_len(offset).and_then(|()| self.file.sync_data()) {
            Ok(()) => {
                tracing::warn!(offset, %err, "append failed; log rolled back");
                RepositoryError::Io(err)
            }
            Err(truncate_err) => {
                tracing::error!(offset, %err, %truncate_err, "append failed; log left torn");
                self.torn = Some(offset);
                RepositoryError::TornWrite { offset }
            }
        }
    }
}

impl EventRepository for FileEventLog {
    fn append(&mut self, event: &Event) -> Result<u64> {
        if let Some(offset) = self.torn {
            return Err(RepositoryError::TornWrite { offset });
        }
        let mut record = serde_json::to_vec(event).map_err(|err| RepositoryError::Json {
            line: self.count as usize + 1,
            message: err.to_string(),
        })?;
        record.push(b'\n');

        let offset = self.current_offset;
        if let Err(err) = self.write_record(&record) {
            return Err(self.rollback(err));
        }

        self.current_offset += record.len() as u64;
        self.count += 1;
        tracing::trace!(offset, event = event.type_tag(), "appended event");
        Ok(offset)
    }

    fn load(&self) -> Result<Vec<Event>> {
        let content = std::fs::read_to_string(&self.path)?;
        parse_log(&content)
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn len(&self) -> u64 {
        self.count
    }
}

// ============================================================================
// Parsing
// ============================================================================

fn parse_log(content: &str) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for (index, line) in content.split_inclusive('\n').enumerate() {
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let Some(record) = line.strip_suffix('\n') else {
            return Err(RepositoryError::CorruptedTail { line: line_number });
        };
        events.push(parse_record(record.trim_end_matches('\r'), line_number)?);
    }
    Ok(events)
}

fn parse_record(record: &str, line: usize) -> Result<Event> {
    serde_json::from_str::<Event>(record).map_err(|err| {
        let tag = serde_json::from_str::<serde_json::Value>(record)
            .ok()
            .and_then(|value| value.get("type")?.as_str().map(str::to_string));
        match tag {
            Some(tag) if !Event::TAGS.contains(&tag.as_str()) => {
                RepositoryError::UnknownTag { line, tag }
            }
            _ => RepositoryError::Json {
                line,
                message: err.to_string(),
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<Event> {
        vec![
            Event::Loop {
                loop_name: "encounter_start".into(),
                active: true,
            },
            Event::AddSpent {
                actor: "fighter".into(),
                key: "actions".into(),
            },
            Event::MetadataChanged {
                key: "frozen".into(),
                value: serde_json::json!(true),
            },
        ]
    }

    #[test]
    fn test_append_then_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("campaign").join("log.jsonl");

        let mut log = FileEventLog::open(&path).unwrap();
        assert!(log.is_empty());
        let mut offsets = Vec::new();
        for event in sample() {
            offsets.push(log.append(&event).unwrap());
        }
        assert_eq!(offsets[0], 0);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        log.close().unwrap();
        drop(log);

        let reopened = FileEventLog::open(&path).unwrap();
        assert_eq!(reopened.len(), 3);
        assert_eq!(reopened.load().unwrap(), sample());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(
            r#"{"type":"LoopEvent","data":{"loop":"encounter_start","active":true}}"#
        ));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_failed_append_is_cut_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.jsonl");
        let mut log = FileEventLog::open(&path).unwrap();
        log.append(&sample()[0]).unwrap();

        // What a short write leaves behind.
        let mut raw = OpenOptions::new().append(true).open(&path).unwrap();
        raw.write_all(br#"{"type":"Lo"#).unwrap();
        let err = log.rollback(std::io::Error::other("disk full"));
        assert!(matches!(err, RepositoryError::Io(_)));

        log.append(&sample()[1]).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.load().unwrap(), sample()[..2].to_vec());
    }

    #[test]
    fn test_unrecoverable_append_refuses_later_writes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.jsonl");
        let mut log = FileEventLog::open(&path).unwrap();
        let offset = log.append(&sample()[0]).unwrap();
        let next = std::fs::metadata(&path).unwrap().len();
        assert_eq!(offset, 0);

        // A handle that can neither write nor truncate.
        log.file = File::open(&path).unwrap();
        let err = log.append(&sample()[1]).unwrap_err();
        assert!(matches!(err, RepositoryError::TornWrite { offset } if offset == next));
        assert!(matches!(
            log.append(&sample()[2]),
            Err(RepositoryError::TornWrite { .. })
        ));
        assert_eq!(log.len(), 1);
        assert_eq!(log.load().unwrap(), sample()[..1].to_vec());
    }

    #[test]
    fn test_torn_tail_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.jsonl");
        std::fs::write(
            &path,
            "{\"type\":\"LoopAdvancedEvent\",\"data\":{\"loop\":\"x\"}}\n{\"type\":\"Hint",
        )
        .unwrap();

        let log = FileEventLog::open(&path).unwrap();
        let err = log.load().unwrap_err();
        assert!(matches!(err, RepositoryError::CorruptedTail { line: 2 }));
    }

    #[test]
    fn test_unknown_tag_and_bad_json_are_distinguished() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.jsonl");

        std::fs::write(&path, "{\"type\":\"TeleportEvent\",\"data\":{}}\n").unwrap();
        let err = FileEventLog::open(&path).unwrap().load().unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::UnknownTag { line: 1, ref tag } if tag == "TeleportEvent"
        ));

        std::fs::write(&path, "\n{\"type\":\"HintEvent\",\"data\":{}}\n").unwrap();
        let err = FileEventLog::open(&path).unwrap().load().unwrap_err();
        assert!(matches!(err, RepositoryError::Json { line: 2, .. }));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.jsonl");
        std::fs::write(
            &path,
            "\n{\"type\":\"HintEvent\",\"data\":{\"message\":\"hi\"}}\n\n",
        )
        .unwrap();
        let events = FileEventLog::open(&path).unwrap().load().unwrap();
        assert_eq!(
            events,
            vec![Event::Hint {
                message: "hi".into()
            }]
        );
    }
}
