//! Word State - syllable decomposition and validity
//!
//! Derived view over the typing buffer: initial consonant, vowel run, final
//! consonant, tone. Reparsed from the buffer after every edit; nothing here
//! is incrementally mutated, which keeps the decomposition and the buffer
//! from drifting apart.

use super::buffer::TypingBuffer;
use crate::data::chars::{self, mark};
use crate::data::keys;
use crate::data::vowel::{self, Modifier, Vowel};

/// Valid single initial consonants (gi/qu and the h-compounds are handled
/// as clusters)
const VALID_INITIALS_1: &[u16] = &[
    keys::B,
    keys::C,
    keys::D,
    keys::G,
    keys::H,
    keys::K,
    keys::L,
    keys::M,
    keys::N,
    keys::P,
    keys::Q,
    keys::R,
    keys::S,
    keys::T,
    keys::V,
    keys::X,
];

/// Compound initials: ch, gh, gi, kh, ng, nh, ph, qu, th, tr (+ ngh)
const VALID_INITIALS_2: &[[u16; 2]] = &[
    [keys::C, keys::H],
    [keys::G, keys::H],
    [keys::G, keys::I],
    [keys::K, keys::H],
    [keys::N, keys::G],
    [keys::N, keys::H],
    [keys::P, keys::H],
    [keys::Q, keys::U],
    [keys::T, keys::H],
    [keys::T, keys::R],
];

/// Valid single finals: c, m, n, p, t
const VALID_FINALS_1: &[u16] = &[keys::C, keys::M, keys::N, keys::P, keys::T];

/// Valid compound finals: ch, ng, nh
const VALID_FINALS_2: &[[u16; 2]] = &[
    [keys::C, keys::H],
    [keys::N, keys::G],
    [keys::N, keys::H],
];

/// Spelling restrictions: (initial, forbidden first vowels)
/// c/k split, g/gh split, ng/ngh split
const SPELLING_RULES: &[(&[u16], &[u16])] = &[
    (&[keys::C], &[keys::E, keys::I, keys::Y]),
    (&[keys::K], &[keys::A, keys::O, keys::U]),
    (&[keys::G], &[keys::E]),
    (&[keys::G, keys::H], &[keys::A, keys::O, keys::U]),
    (&[keys::N, keys::G], &[keys::E, keys::I]),
    (&[keys::N, keys::G, keys::H], &[keys::A, keys::O, keys::U, keys::Y]),
];

/// Compound-consonant merge table for the engine: can `first ++ second`
/// begin a valid initial?
pub fn is_compound_initial(run: &[u16]) -> bool {
    match run.len() {
        1 => VALID_INITIALS_1.contains(&run[0]),
        2 => VALID_INITIALS_2.iter().any(|p| p == run),
        3 => run == [keys::N, keys::G, keys::H],
        _ => false,
    }
}

/// Can `run` still grow into a valid initial? (n → ng → ngh)
pub fn is_initial_prefix(run: &[u16]) -> bool {
    match run.len() {
        0 => true,
        1 => VALID_INITIALS_1.contains(&run[0]),
        2 => VALID_INITIALS_2.iter().any(|p| p == run),
        3 => run == [keys::N, keys::G, keys::H],
        _ => false,
    }
}

/// Is `run` a valid final consonant (c, ch, m, n, ng, nh, p, t)?
pub fn is_valid_final(run: &[u16]) -> bool {
    match run.len() {
        0 => true,
        1 => VALID_FINALS_1.contains(&run[0]),
        2 => VALID_FINALS_2.iter().any(|p| p == run),
        _ => false,
    }
}

/// Stops (c, ch, p, t) carry only sắc and nặng
fn tone_allowed_with_final(tone: u8, final_run: &[u16]) -> bool {
    let is_stop = matches!(
        final_run,
        [k] if matches!(*k, keys::C | keys::P | keys::T)
    ) || final_run == [keys::C, keys::H];
    if is_stop {
        matches!(tone, mark::NONE | mark::SAC | mark::NANG)
    } else {
        true
    }
}

/// Syllable decomposition over buffer entry indices
#[derive(Debug, Default, Clone)]
pub struct WordState {
    /// Initial consonant entries (may include the i of gi- / u of qu-)
    pub initial: Vec<usize>,
    /// Vowel run entries
    pub vowels: Vec<usize>,
    /// Final consonant entries
    pub final_c: Vec<usize>,
    /// Current tone mark (0 = none)
    pub tone: u8,
    /// Entry index carrying the mark
    pub tone_pos: Option<usize>,
    /// True when an active entry did not fit the (C)(V)(C) shape
    pub leftover: bool,
    /// True when a pass-through entry sits after the vowel run
    pub terminated: bool,
}

impl WordState {
    /// Parse the buffer's active entries into a syllable.
    ///
    /// gi- and qu- initials absorb their letter vowel when another vowel
    /// follows (gia, quà), which is what makes tone placement land on the
    /// main vowel without special cases downstream.
    pub fn parse(buf: &TypingBuffer) -> Self {
        let mut st = Self::default();
        let mut seen_vowel_end = false;

        for (i, e) in buf.iter().enumerate() {
            if !e.is_active() {
                if !st.vowels.is_empty() && st.final_c.is_empty() && !seen_vowel_end {
                    st.terminated = true;
                }
                continue;
            }
            let p = e.processed;
            if p.is_char_code() {
                st.leftover = true;
                continue;
            }
            let key = p.key();

            if keys::is_vowel(key) && !seen_vowel_end {
                st.vowels.push(i);
            } else if keys::is_letter(key) {
                if st.vowels.is_empty() {
                    st.initial.push(i);
                } else {
                    seen_vowel_end = true;
                    st.final_c.push(i);
                }
            } else {
                st.leftover = true;
            }
        }

        // gi- / qu-: the letter after g/q belongs to the initial when more
        // vowel material follows
        if st.initial.len() == 1 && st.vowels.len() >= 2 {
            let lead = buf.get(st.initial[0]).map(|e| e.processed.key());
            let first_v = buf.get(st.vowels[0]).map(|e| e.processed);
            match (lead, first_v) {
                (Some(keys::G), Some(p)) if p.key() == keys::I && !p.has_tonew() => {
                    st.initial.push(st.vowels.remove(0));
                }
                (Some(keys::Q), Some(p)) if p.key() == keys::U && !p.has_tonew() => {
                    st.initial.push(st.vowels.remove(0));
                }
                _ => {}
            }
        }

        // Pick up an existing mark. Scans every active entry: a marked u/i
        // just absorbed into a qu-/gi- initial still carries it until the
        // engine relocates.
        for (i, e) in buf.iter().enumerate() {
            if e.is_active() && e.processed.mark() != mark::NONE {
                st.tone = e.processed.mark();
                st.tone_pos = Some(i);
                break;
            }
        }

        st
    }

    /// Vowel run with phonological info, for the tone placer
    pub fn vowel_info(&self, buf: &TypingBuffer) -> Vec<Vowel> {
        self.vowels
            .iter()
            .filter_map(|&i| buf.get(i).map(|e| (i, e.processed)))
            .map(|(i, p)| {
                let modifier = if p.has_tone() {
                    Modifier::Circumflex
                } else if p.has_tonew() {
                    Modifier::Horn
                } else {
                    Modifier::None
                };
                Vowel::new(p.key(), modifier, i)
            })
            .collect()
    }

    /// Initial keycodes
    pub fn initial_keys(&self, buf: &TypingBuffer) -> Vec<u16> {
        self.initial
            .iter()
            .filter_map(|&i| buf.get(i).map(|e| e.processed.key()))
            .collect()
    }

    /// Final keycodes
    pub fn final_keys(&self, buf: &TypingBuffer) -> Vec<u16> {
        self.final_c
            .iter()
            .filter_map(|&i| buf.get(i).map(|e| e.processed.key()))
            .collect()
    }

    /// Does the initial end in qu-?
    pub fn has_qu_initial(&self, buf: &TypingBuffer) -> bool {
        let ks = self.initial_keys(buf);
        ks.ends_with(&[keys::Q, keys::U])
    }

    /// Does the initial end in gi-?
    pub fn has_gi_initial(&self, buf: &TypingBuffer) -> bool {
        let ks = self.initial_keys(buf);
        ks.ends_with(&[keys::G, keys::I])
    }

    /// Composed vowel run (diacritics, marks stripped): "ươ", "uyê", ...
    pub fn composed_vowel_run(&self, buf: &TypingBuffer) -> String {
        self.vowels
            .iter()
            .filter_map(|&i| buf.get(i))
            .filter_map(|e| {
                let mut p = e.processed;
                p.set_mark(mark::NONE);
                p.set_caps(false);
                chars::to_unicode(p).ok()
            })
            .collect()
    }

    /// Vowel run as plain base letters: "uo", "uye", ...
    pub fn base_vowel_run(&self, buf: &TypingBuffer) -> String {
        self.vowels
            .iter()
            .filter_map(|&i| buf.get(i))
            .filter_map(|e| keys::to_letter(e.processed.key()))
            .collect()
    }

    /// Validity of the word as (possibly unfinished) Vietnamese.
    ///
    /// Empty words and bare (prefixes of) initials are valid: the user may
    /// still be mid-word. `allow_zfwj` admits z/f/w/j as initials.
    pub fn is_valid_vietnamese(&self, buf: &TypingBuffer, allow_zfwj: bool) -> bool {
        if buf.is_empty() {
            return true;
        }
        if self.leftover {
            return false;
        }

        let initial = self.initial_keys(buf);
        let zfwj_ok = |run: &[u16]| {
            allow_zfwj
                && run.len() == 1
                && matches!(run[0], keys::Z | keys::F | keys::W | keys::J)
        };

        if self.vowels.is_empty() {
            // A consonant skeleton is fine while it can still grow into a
            // valid initial (đ, th, ng, ngh...)
            return self.final_c.is_empty()
                && (is_initial_prefix(&initial) || zfwj_ok(&initial));
        }

        if !(initial.is_empty() || is_initial_prefix(&initial) || zfwj_ok(&initial)) {
            return false;
        }

        // c/k, g/gh, ng/ngh spelling restrictions
        if let Some(&first_vi) = self.vowels.first() {
            if let Some(first_vowel) = buf.get(first_vi).map(|e| e.processed.key()) {
                for (cons, forbidden) in SPELLING_RULES {
                    if initial == *cons && forbidden.contains(&first_vowel) {
                        return false;
                    }
                }
                // Bare q must be followed by u
                if initial == [keys::Q] && first_vowel != keys::U {
                    return false;
                }
            }
        }

        // The composed run must be a known cluster (or prefix). Shape keys
        // may not have arrived yet, so a run whose plain-letter form is still
        // reachable (uo before the horn of ươ) also passes.
        let run = self.composed_vowel_run(buf);
        if !vowel::is_cluster_or_prefix(&run)
            && !vowel::is_base_run_or_prefix(&self.base_vowel_run(buf))
        {
            return false;
        }

        let final_run = self.final_keys(buf);
        if !is_valid_final(&final_run) {
            return false;
        }
        if !tone_allowed_with_final(self.tone, &final_run) {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::chars::PackedChar;

    /// Type plain letters into a buffer (no transformations)
    fn buf_from(word: &str) -> TypingBuffer {
        let mut buf = TypingBuffer::new();
        for ch in word.chars() {
            if let Some(key) = chars::ascii_to_key(ch) {
                buf.append(key, ch.is_uppercase());
            }
        }
        buf
    }

    fn valid(word: &str) -> bool {
        let buf = buf_from(word);
        WordState::parse(&buf).is_valid_vietnamese(&buf, false)
    }

    #[test]
    fn test_valid_words() {
        for w in [
            "", "b", "d", "th", "ng", "ngh", "ba", "ca", "an", "em", "gi", "gia", "ke", "ki",
            "ky", "nghe", "nghi", "toan", "muon", "khuya",
        ] {
            assert!(valid(w), "'{}' should be valid", w);
        }
    }

    #[test]
    fn test_invalid_words() {
        for w in [
            "bcd", "john", "bla", "string", "chrome", "ci", "ce", "cy", "ka", "ko", "ku", "nge",
            "ngi", "ge", "test", "expect", "qa",
        ] {
            assert!(!valid(w), "'{}' should be invalid", w);
        }
    }

    #[test]
    fn test_zfwj_initials() {
        let buf = buf_from("za");
        assert!(!WordState::parse(&buf).is_valid_vietnamese(&buf, false));
        assert!(WordState::parse(&buf).is_valid_vietnamese(&buf, true));
    }

    #[test]
    fn test_compound_initials() {
        assert!(is_compound_initial(&[keys::T, keys::H]));
        assert!(is_compound_initial(&[keys::Q, keys::U]));
        assert!(is_compound_initial(&[keys::N, keys::G, keys::H]));
        assert!(!is_compound_initial(&[keys::T, keys::L]));
        assert!(!is_compound_initial(&[]));
    }

    #[test]
    fn test_decomposition() {
        let buf = buf_from("truong");
        let st = WordState::parse(&buf);
        assert_eq!(st.initial_keys(&buf), vec![keys::T, keys::R]);
        assert_eq!(st.vowels.len(), 2);
        assert_eq!(st.final_keys(&buf), vec![keys::N, keys::G]);
    }

    #[test]
    fn test_qu_gi_absorption() {
        let buf = buf_from("qua");
        let st = WordState::parse(&buf);
        assert!(st.has_qu_initial(&buf));
        assert_eq!(st.vowels.len(), 1);

        let buf = buf_from("gia");
        let st = WordState::parse(&buf);
        assert!(st.has_gi_initial(&buf));
        assert_eq!(st.vowels.len(), 1);

        // bare gi: the i stays a vowel
        let buf = buf_from("gi");
        let st = WordState::parse(&buf);
        assert!(!st.has_gi_initial(&buf));
        assert_eq!(st.vowels.len(), 1);
    }

    #[test]
    fn test_tone_stop_restriction() {
        let mut buf = buf_from("hat");
        // sắc on a: hát is fine
        buf.get_mut(1).unwrap().processed.set_mark(mark::SAC);
        let st = WordState::parse(&buf);
        assert!(st.is_valid_vietnamese(&buf, false));

        // huyền with a stop final is not
        buf.get_mut(1).unwrap().processed.set_mark(mark::HUYEN);
        let st = WordState::parse(&buf);
        assert!(!st.is_valid_vietnamese(&buf, false));
    }

    #[test]
    fn test_composed_run() {
        let mut buf = buf_from("thuong");
        // apply horn to u and o: ươ
        buf.get_mut(2).unwrap().processed.set_tonew(true);
        buf.get_mut(3).unwrap().processed.set_tonew(true);
        let st = WordState::parse(&buf);
        assert_eq!(st.composed_vowel_run(&buf), "ươ");
        assert!(st.is_valid_vietnamese(&buf, false));
    }

    #[test]
    fn test_d_stroke_is_consonant() {
        let mut buf = TypingBuffer::new();
        buf.append(keys::D, false);
        buf.get_mut(0).unwrap().processed.set_tone(true); // đ
        buf.append(keys::A, false);
        let st = WordState::parse(&buf);
        assert_eq!(st.initial, vec![0]);
        assert_eq!(st.vowels, vec![1]);
        assert!(st.is_valid_vietnamese(&buf, false));
    }

    #[test]
    fn test_mark_pickup() {
        let mut buf = buf_from("toan");
        buf.get_mut(2).unwrap().processed.set_mark(mark::SAC);
        let st = WordState::parse(&buf);
        assert_eq!(st.tone, mark::SAC);
        assert_eq!(st.tone_pos, Some(2));
    }

    #[test]
    fn test_char_code_entries_invalidate() {
        let mut buf = buf_from("ba");
        buf.get_mut(0).unwrap().processed = PackedChar::from_char('!');
        let st = WordState::parse(&buf);
        assert!(!st.is_valid_vietnamese(&buf, false));
    }
}
