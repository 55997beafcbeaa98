//! `stats.cache`: counter snapshot plus the replay bookmark.
//!
//! ```text
//! last;<fingerprint>
//! <stat name>;<value>
//! ...
//! ```

use super::CheckpointError;
use crate::game_data::stats::is_known_stat;
use hashbrown::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const BOOKMARK_KEY: &str = "last";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatCheckpoint {
    pub bookmark: u64,
    pub counters: HashMap<String, i64>,
}

/// Read the checkpoint, `None` if it does not exist yet.
pub fn read_checkpoint(path: &Path) -> Result<Option<StatCheckpoint>, CheckpointError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CheckpointError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut lines = contents.lines();
    let bookmark = lines
        .next()
        .and_then(|line| line.split_once(';'))
        .filter(|(key, _)| *key == BOOKMARK_KEY)
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
        .ok_or_else(|| CheckpointError::MissingBookmark {
            path: path.to_path_buf(),
        })?;

    let mut counters = HashMap::new();
    for (idx, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(';') else {
            tracing::warn!(line = idx + 2, content = line, "Skipping malformed checkpoint line");
            continue;
        };
        let Ok(value) = value.trim().parse::<i64>() else {
            tracing::warn!(line = idx + 2, content = line, "Skipping malformed checkpoint value");
            continue;
        };
        if !is_known_stat(name) {
            tracing::warn!(stat = name, "Loading unknown stat from checkpoint");
        }
        counters.insert(name.to_string(), value);
    }

    Ok(Some(StatCheckpoint { bookmark, counters }))
}

/// Write the checkpoint via a temporary sibling and rename.
pub fn write_checkpoint(path: &Path, checkpoint: &StatCheckpoint) -> Result<(), CheckpointError> {
    let mut names: Vec<&String> = checkpoint.counters.keys().collect();
    names.sort();

    let mut out = format!("{BOOKMARK_KEY};{}\n", checkpoint.bookmark);
    for name in names {
        out.push_str(&format!("{name};{}\n", checkpoint.counters[name]));
    }

    let tmp = temp_path(path);
    fs::write(&tmp, out).map_err(|source| CheckpointError::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| CheckpointError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_checkpoint(&dir.path().join("stats.cache")).unwrap(), None);
    }

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.cache");
        let mut checkpoint = StatCheckpoint {
            bookmark: 0xDEAD_BEEF,
            counters: HashMap::new(),
        };
        checkpoint.counters.insert("AreaChanges".to_string(), 42);
        checkpoint.counters.insert("MapsFinished_Arcade".to_string(), 3);

        write_checkpoint(&path, &checkpoint).unwrap();
        assert!(!temp_path(&path).exists());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("last;3735928559\n"));
        assert_eq!(read_checkpoint(&path).unwrap(), Some(checkpoint));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.cache");
        fs::write(&path, "last;7\nAreaChanges;5\ngarbage\nLevelUps;x\nFutureStat;2\n").unwrap();

        let checkpoint = read_checkpoint(&path).unwrap().unwrap();
        assert_eq!(checkpoint.bookmark, 7);
        assert_eq!(checkpoint.counters.len(), 2);
        assert_eq!(checkpoint.counters.get("FutureStat"), Some(&2));
    }

    #[test]
    fn header_is_required() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.cache");
        fs::write(&path, "AreaChanges;5\n").unwrap();
        assert!(matches!(
            read_checkpoint(&path),
            Err(CheckpointError::MissingBookmark { .. })
        ));
    }
}
