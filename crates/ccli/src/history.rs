//! Command history.
//!
//! Entries live in a fixed-capacity ring addressed by a logical index that
//! only ever grows: entry `i` is stored in slot `i % max`, and once more than
//! `max` lines have been appended the oldest slots are overwritten in place.
//! The browsing cursor moves over logical indices in
//! `[size - max, size]`, where `size` itself is the live edge (the line being
//! typed, not yet submitted).
//!
//! Entries are never modified after being appended. When the user edits a
//! recalled entry and then moves away, the edited text is kept in an overlay
//! keyed by logical index, so coming back shows the edit. The draft line of
//! the live edge is kept the same way. The overlay is dropped whenever a new
//! line is appended.

use crate::error::Result;
use crate::line::LineBuffer;
use std::collections::HashMap;

/// Default number of entries kept.
pub const DEFAULT_HISTORY_MAX: usize = 256;

#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    max: usize,
    size: usize,
    current: usize,
    edits: HashMap<usize, String>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_MAX)
    }
}

impl History {
    /// A history holding at most `max` entries (at least one).
    pub fn new(max: usize) -> Self {
        Self {
            entries: Vec::new(),
            max: max.max(1),
            size: 0,
            current: 0,
            edits: HashMap::new(),
        }
    }

    /// Capacity.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Number of entries ever appended. This is also the logical index of
    /// the live edge.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of entries currently retained.
    pub fn len(&self) -> usize {
        self.size.min(self.max)
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Logical index of the browsing cursor.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Logical index of the oldest retained entry.
    pub fn oldest(&self) -> usize {
        self.size.saturating_sub(self.max)
    }

    /// The entry at logical `index`, if it is still retained.
    pub fn get(&self, index: usize) -> Option<&str> {
        if index < self.oldest() || index >= self.size {
            return None;
        }
        self.entries.get(index % self.max).map(String::as_str)
    }

    /// Entry by age: 1 is the most recent.
    pub fn by_age(&self, age: usize) -> Option<&str> {
        if age == 0 || age > self.len() {
            return None;
        }
        self.get(self.size - age)
    }

    /// Retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        (self.oldest()..self.size).filter_map(|i| self.get(i))
    }

    /// Record a submitted line and move the cursor to the live edge.
    pub fn append(&mut self, line: &str) -> Result<()> {
        let mut entry = String::new();
        entry.try_reserve_exact(line.len())?;
        entry.push_str(line);

        let slot = self.size % self.max;
        if slot < self.entries.len() {
            self.entries[slot] = entry;
        } else {
            self.entries.try_reserve(1)?;
            self.entries.push(entry);
        }

        self.size += 1;
        self.current = self.size;
        self.edits.clear();
        Ok(())
    }

    /// Move `count` entries back, loading the result into `line`.
    ///
    /// Returns false when the cursor was already at the oldest entry.
    pub fn up(&mut self, line: &mut LineBuffer, count: usize) -> Result<bool> {
        let target = self.current.saturating_sub(count).max(self.oldest());
        self.jump(line, target)
    }

    /// Move `count` entries forward, loading the result into `line`.
    /// Reaching the live edge restores the draft.
    ///
    /// Returns false when the cursor was already at the live edge.
    pub fn down(&mut self, line: &mut LineBuffer, count: usize) -> Result<bool> {
        let target = self.current.saturating_add(count).min(self.size);
        self.jump(line, target)
    }

    fn jump(&mut self, line: &mut LineBuffer, target: usize) -> Result<bool> {
        if target == self.current {
            return Ok(false);
        }

        let mut saved = String::new();
        saved.try_reserve_exact(line.len())?;
        saved.push_str(line.as_str());

        line.replace(self.text_at(target))?;
        self.edits.insert(self.current, saved);
        self.current = target;
        Ok(true)
    }

    /// What browsing to `index` would show: the edited text if the entry was
    /// edited, else the entry itself. The live edge with no draft is empty.
    pub fn text_at(&self, index: usize) -> &str {
        self.edits
            .get(&index)
            .map(String::as_str)
            .or_else(|| self.get(index))
            .unwrap_or("")
    }

    /// Remember `text` as the edited form of logical `index`.
    pub fn save_edit(&mut self, index: usize, text: &str) -> Result<()> {
        if index < self.oldest() || index > self.size {
            return Ok(());
        }
        let mut saved = String::new();
        saved.try_reserve_exact(text.len())?;
        saved.push_str(text);
        self.edits.insert(index, saved);
        Ok(())
    }

    /// Move the browsing cursor, clamped into the valid range.
    pub fn set_current(&mut self, index: usize) {
        self.current = index.clamp(self.oldest(), self.size);
    }

    /// Search backwards from logical index `from` (inclusive) for an entry
    /// containing `pattern`. Entries equal to `skip` are passed over.
    ///
    /// Returns the entry's logical index and the byte offset just past the
    /// first occurrence of the pattern in it.
    pub fn find_back(
        &self,
        pattern: &str,
        from: usize,
        skip: Option<&str>,
    ) -> Option<(usize, usize)> {
        if pattern.is_empty() || self.size == 0 {
            return None;
        }
        let from = from.min(self.size - 1);
        if from < self.oldest() {
            return None;
        }

        (self.oldest()..=from).rev().find_map(|index| {
            let entry = self.get(index)?;
            if skip == Some(entry) {
                return None;
            }
            entry.find(pattern).map(|at| (index, at + pattern.len()))
        })
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.size = 0;
        self.current = 0;
        self.edits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(max: usize, lines: &[&str]) -> History {
        let mut h = History::new(max);
        for line in lines {
            h.append(line).unwrap();
        }
        h
    }

    #[test]
    fn test_eviction_keeps_most_recent() {
        let max = 4;
        let h = history(max, &["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(h.len(), max);
        assert_eq!(h.size(), 7);
        assert_eq!(h.iter().collect::<Vec<_>>(), ["d", "e", "f", "g"]);
        assert_eq!(h.by_age(1), Some("g"));
        assert_eq!(h.by_age(4), Some("d"));
        assert_eq!(h.by_age(5), None);
        assert_eq!(h.get(2), None);
    }

    #[test]
    fn test_by_age_always_returns_latest() {
        let mut h = History::new(3);
        for i in 0..10 {
            let line = format!("cmd {i}");
            h.append(&line).unwrap();
            assert_eq!(h.by_age(1), Some(line.as_str()));
        }
        assert_eq!(h.by_age(0), None);
    }

    #[test]
    fn test_up_then_down_restores_draft() {
        let mut h = history(8, &["one", "two", "three"]);
        let mut line = LineBuffer::with_text("draft text").unwrap();

        for _ in 0..3 {
            assert!(h.up(&mut line, 1).unwrap());
        }
        assert_eq!(line.as_str(), "one");
        assert!(!h.up(&mut line, 1).unwrap());

        for _ in 0..3 {
            assert!(h.down(&mut line, 1).unwrap());
        }
        assert_eq!(line.as_str(), "draft text");
        assert_eq!(line.position(), line.len());
        assert!(!h.down(&mut line, 1).unwrap());
    }

    #[test]
    fn test_edits_survive_browsing_but_not_append() {
        let mut h = history(8, &["one", "two"]);
        let mut line = LineBuffer::new();

        h.up(&mut line, 1).unwrap();
        line.insert('!').unwrap();
        h.up(&mut line, 1).unwrap();
        assert_eq!(line.as_str(), "one");
        h.down(&mut line, 1).unwrap();
        assert_eq!(line.as_str(), "two!");

        // The entry itself is untouched
        assert_eq!(h.by_age(1), Some("two"));

        h.append("three").unwrap();
        h.up(&mut line, 2).unwrap();
        assert_eq!(line.as_str(), "two");
    }

    #[test]
    fn test_page_moves_are_clamped() {
        let mut h = history(3, &["a", "b", "c", "d", "e"]);
        let mut line = LineBuffer::new();
        h.up(&mut line, 24).unwrap();
        assert_eq!(h.current(), h.oldest());
        assert_eq!(line.as_str(), "c");
        h.down(&mut line, 24).unwrap();
        assert_eq!(h.current(), h.size());
        assert_eq!(line.as_str(), "");
    }

    #[test]
    fn test_find_back_unique_match() {
        let h = history(8, &["ls -la", "git status", "make test"]);
        let (index, end) = h.find_back("stat", h.size(), None).unwrap();
        assert_eq!(h.get(index), Some("git status"));
        assert_eq!(end, "git stat".len());
    }

    #[test]
    fn test_find_back_skips_duplicates() {
        let h = history(8, &["echo one", "echo two", "echo two"]);
        let (first, _) = h.find_back("echo", h.size(), None).unwrap();
        assert_eq!(first, 2);
        let (next, _) = h.find_back("echo", first, Some("echo two")).unwrap();
        assert_eq!(h.get(next), Some("echo one"));
        assert_eq!(h.find_back("echo", next, Some("echo one")), None);
        assert_eq!(h.find_back("", h.size(), None), None);
    }

    #[test]
    fn test_set_current_and_clear() {
        let mut h = history(2, &["a", "b", "c"]);
        h.set_current(0);
        assert_eq!(h.current(), 1);
        h.set_current(99);
        assert_eq!(h.current(), 3);

        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.iter().count(), 0);
        assert_eq!(h.by_age(1), None);
    }
}
