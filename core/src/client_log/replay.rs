//! Replay avoidance for re-read log content.
//!
//! Client.txt is always read from the beginning on startup. Classification is
//! substring based, so without a guard every historical line would produce its
//! event again. The guard keeps a bookmark (fingerprint of the last classified
//! line from a previous run) plus a bounded cache of fingerprints classified in
//! the current run.

use hashbrown::HashSet;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

pub const DEFAULT_CACHE_CAPACITY: usize = 65_536;

/// Stable 64-bit fingerprint of a line (line ending excluded). Never 0.
pub fn fingerprint(line: &str) -> u64 {
    let digest = Sha256::digest(line.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    match u64::from_be_bytes(prefix) {
        0 => 1,
        value => value,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineVerdict {
    /// Already processed, either before the bookmark or earlier in this run
    Skip,
    New,
}

#[derive(Debug, Clone)]
pub struct ReplayGuard {
    bookmark: u64,
    passed_bookmark: bool,
    seen: HashSet<u64>,
    order: VecDeque<u64>,
    capacity: usize,
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(0, DEFAULT_CACHE_CAPACITY)
    }
}

impl ReplayGuard {
    /// `bookmark == 0` means nothing was processed before.
    pub fn new(bookmark: u64, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bookmark,
            passed_bookmark: bookmark == 0,
            seen: HashSet::with_capacity(capacity.min(DEFAULT_CACHE_CAPACITY)),
            order: VecDeque::with_capacity(capacity.min(DEFAULT_CACHE_CAPACITY)),
            capacity,
        }
    }

    pub fn bookmark(&self) -> u64 {
        self.bookmark
    }

    pub fn passed_bookmark(&self) -> bool {
        self.passed_bookmark
    }

    pub fn check(&mut self, fingerprint: u64) -> LineVerdict {
        if self.seen.contains(&fingerprint) {
            return LineVerdict::Skip;
        }

        if !self.passed_bookmark {
            if fingerprint == self.bookmark {
                // The bookmarked line itself was handled last run
                self.passed_bookmark = true;
            }
            return LineVerdict::Skip;
        }

        LineVerdict::New
    }

    /// First EOF: whatever follows is new, even if the bookmark never showed up
    /// (rotated or truncated log).
    pub fn mark_eof(&mut self) {
        if !self.passed_bookmark {
            tracing::debug!(bookmark = self.bookmark, "bookmark not found before EOF");
        }
        self.passed_bookmark = true;
    }

    /// Record a classified line: advances the bookmark and caches the fingerprint.
    pub fn commit(&mut self, fingerprint: u64) {
        self.bookmark = fingerprint;
        if !self.seen.insert(fingerprint) {
            return;
        }
        self.order.push_back(fingerprint);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
    }

    pub fn cached(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_nonzero() {
        let a = fingerprint("2024/03/02 19:04:11 1 a [INFO Client 1] : You have entered Arcade.");
        let b = fingerprint("2024/03/02 19:04:11 1 a [INFO Client 1] : You have entered Arcade.");
        let c = fingerprint("2024/03/02 19:04:12 1 a [INFO Client 1] : You have entered Arcade.");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, 0);
    }

    #[test]
    fn first_run_treats_everything_as_new() {
        let mut guard = ReplayGuard::new(0, 16);
        assert!(guard.passed_bookmark());
        assert_eq!(guard.check(10), LineVerdict::New);
        guard.commit(10);
        assert_eq!(guard.bookmark(), 10);
    }

    #[test]
    fn skips_until_bookmark_including_bookmark() {
        let mut guard = ReplayGuard::new(30, 16);
        assert_eq!(guard.check(10), LineVerdict::Skip);
        assert_eq!(guard.check(20), LineVerdict::Skip);
        assert_eq!(guard.check(30), LineVerdict::Skip);
        assert!(guard.passed_bookmark());
        assert_eq!(guard.check(40), LineVerdict::New);
    }

    #[test]
    fn eof_without_bookmark_switches_to_new_content() {
        let mut guard = ReplayGuard::new(99, 16);
        assert_eq!(guard.check(1), LineVerdict::Skip);
        guard.mark_eof();
        assert_eq!(guard.check(2), LineVerdict::New);
    }

    #[test]
    fn committed_lines_are_not_processed_twice() {
        let mut guard = ReplayGuard::new(0, 16);
        assert_eq!(guard.check(5), LineVerdict::New);
        guard.commit(5);
        assert_eq!(guard.check(5), LineVerdict::Skip);
    }

    #[test]
    fn cache_is_bounded_oldest_first() {
        let mut guard = ReplayGuard::new(0, 2);
        guard.commit(1);
        guard.commit(2);
        guard.commit(3);
        assert_eq!(guard.cached(), 2);
        assert_eq!(guard.check(1), LineVerdict::New);
        assert_eq!(guard.check(2), LineVerdict::Skip);
        assert_eq!(guard.check(3), LineVerdict::Skip);
    }
}
