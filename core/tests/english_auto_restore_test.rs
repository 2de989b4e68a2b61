//! Restore-on-wrong-spelling: English words typed in Vietnamese mode come
//! back as their raw keystrokes

mod common;
use common::{telex, telex_restore};

// ============================================================
// MID-WORD RESTORE (transformed letters unwound)
// ============================================================

const MID_WORD: &[(&str, &str)] = &[
    // x composes a tilde, the final t invalidates it, restore unwinds
    ("text", "text"),
    ("expect", "expect"),
    // w composes ư at word start, interior w pattern restores
    ("work", "work"),
];

#[test]
fn restores_while_typing() {
    telex_restore(MID_WORD);
}

// ============================================================
// SUSPENSION (no transformation yet, composing stops quietly)
// ============================================================

const SUSPENDED: &[(&str, &str)] = &[
    ("street", "street"),
    ("school", "school"),
    ("claus", "claus"),
    ("hello", "hello"),
    // the doubled e of street must not merge to ê
    ("street ", "street "),
    ("spring ", "spring "),
];

#[test]
fn foreign_starts_stop_composition() {
    telex_restore(SUSPENDED);
}

// ============================================================
// WORD-BREAK RESTORE (ending rules, modifier reverts)
// ============================================================

const AT_BREAK: &[(&str, &str)] = &[
    ("text ", "text "),
    ("expect ", "expect "),
    // rr reverts the tone and eats a keystroke; the break-time check
    // rewrites the word back to everything that was typed
    ("sorry ", "sorry "),
];

#[test]
fn restores_at_word_break() {
    telex_restore(AT_BREAK);
}

// ============================================================
// VIETNAMESE UNAFFECTED
// ============================================================

const VIETNAMESE: &[(&str, &str)] = &[
    ("vieejt ", "việt "),
    ("thuwowng ", "thương "),
    ("toasn ", "toán "),
    ("nguwowif ", "người "),
    ("as", "á"),
    ("no ", "no "),
    ("ddi ", "đi "),
];

#[test]
fn valid_vietnamese_never_restores() {
    telex_restore(VIETNAMESE);
}

// ============================================================
// FEATURE OFF
// ============================================================

const RESTORE_OFF: &[(&str, &str)] = &[
    // without restore the tilde stays
    ("text", "tẽt"),
    ("text ", "tẽt "),
];

#[test]
fn restore_off_keeps_transforms() {
    telex(RESTORE_OFF);
}

// ============================================================
// FREE UNDO IS NOT A RESTORE CASE
// ============================================================

const FREE_UNDO: &[(&str, &str)] = &[
    // the third o is an explicit request for literal letters; the break
    // must not "restore" it back to three o's
    ("tooo", "too"),
    ("tooo ", "too "),
];

#[test]
fn free_undo_survives_word_break() {
    telex_restore(FREE_UNDO);
}
