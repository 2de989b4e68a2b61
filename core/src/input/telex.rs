//! Telex input method
//!
//! - aa → â, ee → ê, oo → ô, dd → đ (doubled letters)
//! - w → horn/breve (uw → ư, ow → ơ, aw → ă); alone at word start → ư
//! - s f r x j → sắc huyền hỏi ngã nặng
//! - z removes marks
//! - [ → ơ, ] → ư (full Telex only)
//!
//! The simple variants drop the standalone shortcuts that collide with
//! English typing; key-to-tone mappings stay identical.

use super::{Intent, Method};
use crate::data::chars::mark;
use crate::data::keys;

/// Telex classifier; const-constructed per variant
pub struct Telex {
    w_standalone: bool,
    brackets: bool,
    quick_double: bool,
}

impl Telex {
    pub const fn full() -> Self {
        Self {
            w_standalone: true,
            brackets: true,
            quick_double: true,
        }
    }

    /// Simple Telex 1: no standalone w → ư, no bracket quick chars
    pub const fn simple1() -> Self {
        Self {
            w_standalone: false,
            brackets: false,
            quick_double: true,
        }
    }

    /// Simple Telex 2: additionally no quick double-consonant expansion
    pub const fn simple2() -> Self {
        Self {
            w_standalone: false,
            brackets: false,
            quick_double: false,
        }
    }
}

impl Method for Telex {
    fn classify(&self, key: u16, shifted: bool) -> Intent {
        // ^ (shift+6) spells the circumflex out loud
        if key == keys::N6 && shifted {
            return Intent::AddCircumflex;
        }

        // ! (shift+1) ends the word like other sentence punctuation
        if key == keys::N1 && shifted {
            return Intent::WordBreak;
        }

        if self.brackets && (key == keys::LBRACKET || key == keys::RBRACKET) {
            return Intent::Standalone(key);
        }

        if keys::is_break(key) {
            return Intent::WordBreak;
        }

        match key {
            // Doubled letters are ambiguous; the engine checks the previous
            // keystroke before merging
            keys::A | keys::E | keys::O => Intent::DoubleLetter(key),
            keys::D => Intent::DoubleLetter(key),
            keys::W => Intent::AddHorn,
            keys::S => Intent::AddTone(mark::SAC),
            keys::F => Intent::AddTone(mark::HUYEN),
            keys::R => Intent::AddTone(mark::HOI),
            keys::X => Intent::AddTone(mark::NGA),
            keys::J => Intent::AddTone(mark::NANG),
            keys::Z => Intent::RemoveTone,
            _ if keys::is_vowel(key) => Intent::AppendVowel(key),
            _ if keys::is_letter(key) => Intent::AppendConsonant(key),
            _ => Intent::Normal(key),
        }
    }

    fn w_standalone(&self) -> bool {
        self.w_standalone
    }

    fn bracket_standalone(&self) -> bool {
        self.brackets
    }

    fn quick_double(&self) -> bool {
        self.quick_double
    }
}
