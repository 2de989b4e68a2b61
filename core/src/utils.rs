//! Shared helpers: key/char conversion and a host simulator
//!
//! The simulator applies `HookState` results to a screen string exactly the
//! way a host would (backspaces, then injected characters), so integration
//! tests can assert on what the user ends up seeing.

use crate::data::keys;
use crate::engine::{Engine, HookState, Op};

/// Keycode to ASCII character (shift substitution included)
pub fn key_to_char(key: u16, caps: bool) -> Option<char> {
    keys::to_ascii(key, caps)
}

/// Character to (keycode, shifted). Uppercase letters and shifted symbols
/// set the flag.
pub fn char_to_key(c: char) -> Option<(u16, bool)> {
    let lower = c.to_ascii_lowercase();
    let key = match lower {
        'a' => keys::A,
        'b' => keys::B,
        'c' => keys::C,
        'd' => keys::D,
        'e' => keys::E,
        'f' => keys::F,
        'g' => keys::G,
        'h' => keys::H,
        'i' => keys::I,
        'j' => keys::J,
        'k' => keys::K,
        'l' => keys::L,
        'm' => keys::M,
        'n' => keys::N,
        'o' => keys::O,
        'p' => keys::P,
        'q' => keys::Q,
        'r' => keys::R,
        's' => keys::S,
        't' => keys::T,
        'u' => keys::U,
        'v' => keys::V,
        'w' => keys::W,
        'x' => keys::X,
        'y' => keys::Y,
        'z' => keys::Z,
        '0' => keys::N0,
        '1' => keys::N1,
        '2' => keys::N2,
        '3' => keys::N3,
        '4' => keys::N4,
        '5' => keys::N5,
        '6' => keys::N6,
        '7' => keys::N7,
        '8' => keys::N8,
        '9' => keys::N9,
        ' ' => keys::SPACE,
        '.' => keys::DOT,
        ',' => keys::COMMA,
        ';' => keys::SEMICOLON,
        '\'' => keys::QUOTE,
        '-' => keys::MINUS,
        '=' => keys::EQUAL,
        '[' => keys::LBRACKET,
        ']' => keys::RBRACKET,
        '\\' => keys::BACKSLASH,
        '/' => keys::SLASH,
        '`' => keys::BACKQUOTE,
        '\n' => keys::RETURN,
        '\t' => keys::TAB,
        // shifted symbols used by tests
        '^' => return Some((keys::N6, true)),
        '@' => return Some((keys::N2, true)),
        '#' => return Some((keys::N3, true)),
        ':' => return Some((keys::SEMICOLON, true)),
        '?' => return Some((keys::SLASH, true)),
        '!' => return Some((keys::N1, true)),
        _ => return None,
    };
    Some((key, c.is_ascii_uppercase()))
}

/// Keycodes for a plain string (letters and digits)
pub fn keys_from_str(s: &str) -> Vec<u16> {
    s.chars().filter_map(|c| char_to_key(c).map(|(k, _)| k)).collect()
}

/// Apply one result to the simulated screen
pub fn apply_result(screen: &mut String, r: &HookState, typed: Option<char>) {
    match r.op {
        op if op == Op::WillProcess as u8
            || op == Op::Restore as u8
            || op == Op::RestoreAndNewSession as u8 =>
        {
            for _ in 0..r.backspace_count {
                screen.pop();
            }
            for ch in r.output_chars() {
                screen.push(ch);
            }
        }
        op if op == Op::ReplaceMacro as u8 => {
            for _ in 0..r.backspace_count {
                screen.pop();
            }
            for i in 0..r.macro_len as usize {
                if let Some(ch) = char::from_u32(r.macro_data[i]) {
                    screen.push(ch);
                }
            }
        }
        // Ignore / DoNothing: the host lets the keystroke through
        _ => {
            if let Some(ch) = typed {
                screen.push(ch);
            }
        }
    }
}

/// Simulate typing `input` and return the resulting screen text.
///
/// `<` is a backspace, `\x1b` is ESC, everything else maps through
/// `char_to_key`. Unknown characters are skipped.
pub fn type_word(e: &mut Engine, input: &str) -> String {
    let mut screen = String::new();
    for c in input.chars() {
        if c == '<' {
            let _ = e.handle_key(keys::DELETE, false);
            screen.pop();
            continue;
        }
        if c == '\x1b' {
            let r = e.handle_key(keys::ESC, false);
            apply_result(&mut screen, &r, None);
            continue;
        }
        let Some((key, shifted)) = char_to_key(c) else {
            continue;
        };
        let r = e.handle_key(key, shifted);
        apply_result(&mut screen, &r, key_to_char(key, shifted));
    }
    screen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_to_key_roundtrip() {
        for c in "abcxyz0189. ".chars() {
            let (key, shifted) = char_to_key(c).unwrap();
            assert_eq!(key_to_char(key, shifted), Some(c));
        }
        let (key, shifted) = char_to_key('A').unwrap();
        assert!(shifted);
        assert_eq!(key_to_char(key, shifted), Some('A'));
        let (key, shifted) = char_to_key('@').unwrap();
        assert!(shifted);
        assert_eq!(key_to_char(key, shifted), Some('@'));
    }

    #[test]
    fn test_type_word_simulation() {
        let mut e = Engine::new();
        assert_eq!(type_word(&mut e, "vieejt"), "việt");
    }

    #[test]
    fn test_type_word_backspace() {
        let mut e = Engine::new();
        assert_eq!(type_word(&mut e, "ab<"), "a");
    }
}
