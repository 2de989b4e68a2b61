//! VNI input method
//!
//! Digits carry all modifiers:
//! - 1-5 → sắc huyền hỏi ngã nặng
//! - 6 → circumflex (â ê ô)
//! - 7 → horn (ơ ư), 8 → breve (ă); the engine lets each fall back to the
//!   other target class, so a7/a8 → ă and o7/o8 → ơ both work
//! - 9 → đ (doubles the previous d)
//! - 0 removes marks
//!
//! Shift+digit types the symbol (@, #, ...) and never composes.

use super::{Intent, Method};
use crate::data::chars::mark;
use crate::data::keys;

pub struct Vni;

impl Method for Vni {
    fn classify(&self, key: u16, shifted: bool) -> Intent {
        if keys::is_break(key) || key == keys::LBRACKET || key == keys::RBRACKET {
            return Intent::WordBreak;
        }

        // ! (shift+1) ends the word; other shifted digits are symbols
        if key == keys::N1 && shifted {
            return Intent::WordBreak;
        }
        if keys::is_number(key) && shifted {
            return Intent::Normal(key);
        }

        match key {
            keys::N1 => Intent::AddTone(mark::SAC),
            keys::N2 => Intent::AddTone(mark::HUYEN),
            keys::N3 => Intent::AddTone(mark::HOI),
            keys::N4 => Intent::AddTone(mark::NGA),
            keys::N5 => Intent::AddTone(mark::NANG),
            keys::N6 => Intent::AddCircumflex,
            keys::N7 => Intent::AddHorn,
            keys::N8 => Intent::AddBreve,
            keys::N9 => Intent::DoubleLetter(keys::D),
            keys::N0 => Intent::RemoveTone,
            _ if keys::is_vowel(key) => Intent::AppendVowel(key),
            _ if keys::is_letter(key) => Intent::AppendConsonant(key),
            _ => Intent::Normal(key),
        }
    }
}
