use super::replay::fingerprint;
use super::{EventClassifier, ReaderError, TrackingEvent};
use memchr::{memchr_iter, memrchr};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

/// One complete line of pre-existing log content.
#[derive(Debug, Clone)]
pub struct ScannedLine {
    pub line_number: u64,
    pub fingerprint: u64,
    pub event: Option<TrackingEvent>,
}

/// Result of classifying everything already in the file.
#[derive(Debug)]
pub struct HistoryScan {
    pub lines: Vec<ScannedLine>,
    /// Byte offset just past the last complete line
    pub end_pos: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextLine {
    Line { line_number: u64, text: String },
    Eof,
}

/// The growing Client.txt as a restartable sequence of lines.
pub struct LineSource {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    buf: Vec<u8>,
    position: u64,
    lines_read: u64,
    lines_total: u64,
}

impl LineSource {
    /// Open a log file and count its current lines for progress reporting.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ReaderError> {
        let path = path.into();
        let lines_total = count_lines(&path)?;
        Ok(Self {
            path,
            reader: None,
            buf: Vec::new(),
            position: 0,
            lines_read: 0,
            lines_total,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// (lines consumed, lines known to exist)
    pub fn progress(&self) -> (u64, u64) {
        (self.lines_read, self.lines_total)
    }

    /// Fingerprint and classify all complete lines currently in the file.
    ///
    /// Lines are processed in parallel but returned in file order. Tailing
    /// continues from `end_pos` afterwards.
    pub fn scan_history(&mut self, classifier: &EventClassifier) -> Result<HistoryScan, ReaderError> {
        let file = fs::File::open(&self.path).map_err(|source| ReaderError::OpenFile {
            path: self.path.clone(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| ReaderError::ReadFile {
                path: self.path.clone(),
                source,
            })?
            .len();
        if len == 0 {
            return Ok(HistoryScan {
                lines: Vec::new(),
                end_pos: 0,
            });
        }

        // SAFETY: the game only appends; the mapped prefix is never rewritten while we read it.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ReaderError::MemoryMap {
            path: self.path.clone(),
            source,
        })?;
        let bytes = mmap.as_ref();

        // A trailing line without '\n' is still being written
        let end = memrchr(b'\n', bytes).map(|i| i + 1).unwrap_or(0);
        let complete = &bytes[..end];

        let mut line_ranges: Vec<(usize, usize)> = Vec::new();
        let mut start = 0;
        for nl in memchr_iter(b'\n', complete) {
            if nl > start {
                line_ranges.push((start, nl));
            }
            start = nl + 1;
        }

        let lines: Vec<ScannedLine> = line_ranges
            .par_iter()
            .enumerate()
            .filter_map(|(idx, &(start, end))| {
                let text = decode_line(&complete[start..end]);
                if text.is_empty() {
                    return None;
                }
                let line_number = idx as u64 + 1;
                let fp = fingerprint(&text);
                Some(ScannedLine {
                    line_number,
                    fingerprint: fp,
                    event: classifier.classify(line_number, fp, &text),
                })
            })
            .collect();

        self.position = end as u64;
        self.lines_read = line_ranges.len() as u64;
        self.lines_total = self.lines_total.max(self.lines_read);
        self.reader = None;
        self.buf.clear();

        Ok(HistoryScan {
            lines,
            end_pos: end as u64,
        })
    }

    /// Next complete line, or `Eof` when the writer has not produced one yet.
    /// Partial lines are buffered until their newline arrives.
    pub async fn next_line(&mut self) -> Result<NextLine, ReaderError> {
        if self.reader.is_none() {
            self.reader = Some(self.open_at_position().await?);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(NextLine::Eof);
        };

        loop {
            let n = reader
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|source| ReaderError::ReadFile {
                    path: self.path.clone(),
                    source,
                })?;
            if n == 0 || !self.buf.ends_with(b"\n") {
                return Ok(NextLine::Eof);
            }

            self.position += self.buf.len() as u64;
            let text = decode_line(&self.buf);
            self.buf.clear();
            if text.is_empty() {
                continue;
            }

            self.lines_read += 1;
            self.lines_total = self.lines_total.max(self.lines_read);
            return Ok(NextLine::Line {
                line_number: self.lines_read,
                text,
            });
        }
    }

    async fn open_at_position(&self) -> Result<BufReader<File>, ReaderError> {
        let file = File::open(&self.path)
            .await
            .map_err(|source| ReaderError::OpenFile {
                path: self.path.clone(),
                source,
            })?;
        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(self.position))
            .await
            .map_err(|source| ReaderError::Seek {
                path: self.path.clone(),
                source,
            })?;
        Ok(reader)
    }
}

/// Count newline-terminated lines in a file.
pub fn count_lines(path: &Path) -> Result<u64, ReaderError> {
    let file = fs::File::open(path).map_err(|source| ReaderError::OpenFile {
        path: path.to_path_buf(),
        source,
    })?;
    let len = file
        .metadata()
        .map_err(|source| ReaderError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if len == 0 {
        return Ok(0);
    }
    // SAFETY: read-only map of an append-only file
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ReaderError::MemoryMap {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(memchr_iter(b'\n', mmap.as_ref()).count() as u64)
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
