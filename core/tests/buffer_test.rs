//! Typing-buffer contract: dual view, snapshots, history horizon

use goviet_core::data::keys;
use goviet_core::engine::buffer::{History, Keystroke, TypingBuffer, HISTORY_CAP, MAX_SIZE};

#[test]
fn append_at_window_edge_evicts_to_overflow() {
    let mut buf = TypingBuffer::new();
    for _ in 0..MAX_SIZE {
        buf.append(keys::A, false);
    }
    buf.append(keys::B, false);

    assert_eq!(buf.len(), MAX_SIZE);
    assert_eq!(buf.overflow_len(), 1);
    // the keystroke log covers the whole word
    assert_eq!(buf.keystroke_len(), MAX_SIZE + 1);
}

#[test]
fn keystroke_count_invariant() {
    let mut buf = TypingBuffer::new();
    buf.append(keys::T, false);
    let i = buf.append(keys::O, false);
    let ks = Keystroke::new(keys::O, false);
    buf.record_keystroke(ks);
    buf.add_modifier(i, ks);

    let per_entry: usize = buf.iter().map(|e| e.keystroke_count()).sum();
    assert_eq!(per_entry, buf.keystroke_len());
}

#[test]
fn typing_order_differs_from_entry_order() {
    // t, o, i typed first, then a modifier lands on the o entry: the log
    // keeps strict typing order while entries group the modifier with its
    // vowel
    let mut buf = TypingBuffer::new();
    buf.append(keys::T, false);
    let o = buf.append(keys::O, false);
    buf.append(keys::I, false);
    let m = Keystroke::new(keys::W, false);
    buf.record_keystroke(m);
    buf.add_modifier(o, m);

    assert_eq!(buf.raw_keystrokes_as_string(), "toiw");
    assert_eq!(buf.raw_from_entries_only(), "towi");

    // after a snapshot restore the log is rebuilt per-entry: the original
    // typing order is deliberately gone
    let snap = buf.snapshot();
    let mut other = TypingBuffer::new();
    other.restore(snap);
    assert_eq!(other.raw_keystrokes_as_string(), "towi");
}

#[test]
fn snapshot_restore_identity() {
    let mut buf = TypingBuffer::new();
    buf.append(keys::B, true);
    buf.append(keys::A, false);
    buf.get_mut(1).unwrap().processed.set_mark(2);

    let snap = buf.snapshot();
    let mut other = TypingBuffer::new();
    other.restore(snap);

    assert_eq!(other.len(), buf.len());
    assert_eq!(other.visible_string(), buf.visible_string());
    assert_eq!(other.overflow_len(), buf.overflow_len());
}

#[test]
fn remove_last_restores_overflow_entry() {
    let mut buf = TypingBuffer::new();
    for _ in 0..=MAX_SIZE {
        buf.append(keys::A, false);
    }
    assert_eq!(buf.overflow_len(), 1);

    buf.remove_last();
    assert_eq!(buf.overflow_len(), 0);
    assert_eq!(buf.len(), MAX_SIZE);
}

#[test]
fn history_is_bounded_lifo() {
    let mut hist = History::new();
    for i in 0..HISTORY_CAP + 2 {
        let mut buf = TypingBuffer::new();
        for _ in 0..=i {
            buf.append(keys::A, false);
        }
        hist.push(buf.snapshot());
    }
    assert_eq!(hist.len(), HISTORY_CAP);

    // most recent first
    let top = hist.pop().unwrap();
    assert_eq!(top.entries.len(), HISTORY_CAP + 2);
}

#[test]
fn restore_from_committed_word() {
    let mut buf = TypingBuffer::new();
    buf.restore_from_committed("người");
    assert_eq!(buf.visible_string(), "người");
    assert_eq!(buf.len(), 5);
}
