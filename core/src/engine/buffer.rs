//! Typing buffer
//!
//! Holds the current word twice over: the processed bit-packed characters
//! the user sees, and every raw keystroke that produced them. The raw side
//! makes restore exact; the processed side makes display serialization a
//! flat copy.
//!
//! Two orderings coexist and diverge once modifiers attach to earlier
//! entries (typing `aas`: the second `a` and the `s` both belong to entry 0):
//! - per-entry order: `primary ++ modifiers` per entry, used to rebuild
//!   word state;
//! - the keystroke-sequence log in strict typing order, authoritative for
//!   restore at word break.

use crate::data::chars::{self, PackedChar};
use crate::data::keys;

/// Visible window size; older entries spill into the overflow tail
pub const MAX_SIZE: usize = 32;

/// Bounded snapshot stack depth
pub const HISTORY_CAP: usize = 10;

/// One raw key event. Immutable once recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keystroke {
    pub key: u16,
    pub caps: bool,
}

impl Keystroke {
    pub fn new(key: u16, caps: bool) -> Self {
        Self { key, caps }
    }

    /// ASCII projection with shift substitution
    pub fn to_ascii(self) -> Option<char> {
        keys::to_ascii(self.key, self.caps)
    }
}

/// How an entry participates in composition
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compose {
    /// Part of the Vietnamese syllable
    #[default]
    Active,
    /// Kept verbatim, invisible to the syllable parser
    Inline,
    /// Kept verbatim and closes the vowel cluster for tone placement
    Terminal,
}

/// One visible character plus the keystrokes that built it
#[derive(Clone, Debug)]
pub struct Entry {
    pub primary: Keystroke,
    pub modifiers: Vec<Keystroke>,
    pub processed: PackedChar,
    pub role: Compose,
}

impl Entry {
    pub fn new(key: u16, caps: bool) -> Self {
        Self {
            primary: Keystroke::new(key, caps),
            modifiers: Vec::new(),
            processed: PackedChar::new(key, caps),
            role: Compose::Active,
        }
    }

    pub fn keystroke_count(&self) -> usize {
        1 + self.modifiers.len()
    }

    /// Primary followed by modifiers
    pub fn all_keystrokes(&self) -> impl Iterator<Item = Keystroke> + '_ {
        std::iter::once(self.primary).chain(self.modifiers.iter().copied())
    }

    pub fn is_active(&self) -> bool {
        self.role == Compose::Active
    }
}

/// Immutable full copy of the buffer, owned by the history stack
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub entries: Vec<Entry>,
    pub overflow: Vec<Entry>,
    pub keystrokes: Vec<Keystroke>,
}

/// The typing buffer
#[derive(Clone, Debug, Default)]
pub struct TypingBuffer {
    entries: Vec<Entry>,
    overflow: Vec<Entry>,
    keystrokes: Vec<Keystroke>,
}

impl TypingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new entry for a consumed keystroke; evicts the front entry
    /// into overflow when the window is full. Returns the entry index.
    pub fn append(&mut self, key: u16, caps: bool) -> usize {
        if self.entries.len() >= MAX_SIZE {
            let evicted = self.entries.remove(0);
            self.overflow.push(evicted);
        }
        self.entries.push(Entry::new(key, caps));
        self.keystrokes.push(Keystroke::new(key, caps));
        self.entries.len() - 1
    }

    /// Append an entry that rides on a keystroke already in the log
    /// (quick-consonant expansions produce two characters from one key).
    pub fn append_unlogged(&mut self, key: u16, caps: bool) -> usize {
        if self.entries.len() >= MAX_SIZE {
            let evicted = self.entries.remove(0);
            self.overflow.push(evicted);
        }
        self.entries.push(Entry::new(key, caps));
        self.entries.len() - 1
    }

    /// Attach a modifier keystroke to an existing entry.
    ///
    /// Does not touch the sequence log: one keystroke sometimes modifies an
    /// entry and sometimes creates one, so the caller logs it separately via
    /// `record_keystroke`.
    pub fn add_modifier(&mut self, at: usize, ks: Keystroke) {
        if let Some(e) = self.entries.get_mut(at) {
            e.modifiers.push(ks);
        }
    }

    /// Log a keystroke in typing order
    pub fn record_keystroke(&mut self, ks: Keystroke) {
        self.keystrokes.push(ks);
    }

    /// Pop the tail entry and its keystrokes from the sequence log.
    ///
    /// The log pops are only exact when the tail is the most-recently-typed
    /// entry; removals elsewhere degrade log fidelity. One overflow entry
    /// moves back into the window if available.
    pub fn remove_last(&mut self) -> Option<Entry> {
        let e = self.entries.pop()?;
        let n = e.keystroke_count().min(self.keystrokes.len());
        self.keystrokes.truncate(self.keystrokes.len() - n);
        if let Some(back) = self.overflow.pop() {
            self.entries.insert(0, back);
        }
        Some(e)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.overflow.clear();
        self.keystrokes.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keystroke_len(&self) -> usize {
        self.keystrokes.len()
    }

    pub fn overflow_len(&self) -> usize {
        self.overflow.len()
    }

    pub fn get(&self, i: usize) -> Option<&Entry> {
        self.entries.get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut Entry> {
        self.entries.get_mut(i)
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut Entry> {
        self.entries.last_mut()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn keystrokes(&self) -> &[Keystroke] {
        &self.keystrokes
    }

    /// Full copy for the history stack
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            entries: self.entries.clone(),
            overflow: self.overflow.clone(),
            keystrokes: self.keystrokes.clone(),
        }
    }

    /// Restore a snapshot. The sequence log is rebuilt in per-entry order:
    /// the original typing order is gone, but further edits need a log that
    /// agrees with the entries.
    pub fn restore(&mut self, snap: Snapshot) {
        self.entries = snap.entries;
        self.overflow = snap.overflow;
        self.keystrokes = self
            .overflow
            .iter()
            .chain(self.entries.iter())
            .flat_map(|e| e.all_keystrokes())
            .collect();
    }

    /// Rebuild the buffer from already-committed text (host read the word
    /// back, e.g. after a cursor move). Modifier keystrokes are unknown, so
    /// the sequence log holds primaries only.
    pub fn restore_from_committed(&mut self, word: &str) {
        self.clear();
        for ch in word.chars() {
            if let Some(p) = chars::parse_char(ch) {
                let mut e = Entry::new(p.key(), p.caps());
                e.processed = p;
                self.entries.push(e);
                self.keystrokes.push(Keystroke::new(p.key(), p.caps()));
            }
        }
    }

    /// ASCII projection of the whole word in typing order (overflow
    /// included via the log); drives the English heuristic.
    pub fn raw_keystrokes_as_string(&self) -> String {
        self.keystrokes.iter().filter_map(|k| k.to_ascii()).collect()
    }

    /// Like `raw_keystrokes_as_string` but only the visible window, so a
    /// stale overflow after restore cannot feed the heuristic.
    pub fn raw_from_entries_only(&self) -> String {
        self.entries
            .iter()
            .flat_map(|e| e.all_keystrokes())
            .filter_map(|k| k.to_ascii())
            .collect()
    }

    /// Visible text from the processed characters
    pub fn visible_string(&self) -> String {
        self.entries
            .iter()
            .filter_map(|e| chars::to_unicode(e.processed).ok())
            .collect()
    }
}

/// Bounded LIFO of snapshots, pushed at word break and popped on
/// backspace-after-space
#[derive(Debug, Default)]
pub struct History {
    snaps: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snap: Snapshot) {
        if self.snaps.len() >= HISTORY_CAP {
            self.snaps.remove(0);
        }
        self.snaps.push(snap);
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        self.snaps.pop()
    }

    pub fn clear(&mut self) {
        self.snaps.clear();
    }

    pub fn len(&self) -> usize {
        self.snaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snaps.is_empty()
    }
}
