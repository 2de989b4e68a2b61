//! English word detection for restore-on-wrong-spelling
//!
//! Once a word fails Vietnamese validation, these heuristics decide whether
//! the raw keystrokes look like English. Two variants:
//! - `is_definitely_english`: the full rule set, run at word break;
//! - `looks_english_while_typing`: start/interior rules only. Word-ending
//!   rules are skipped mid-word because Telex tone keys (s, r, x...) sit at
//!   the end of half-typed Vietnamese words.
//!
//! Input is the lowercased ASCII projection of the raw keystrokes.

/// English-only two-letter endings
const ENGLISH_ENDINGS_2: &[&str] = &[
    "ck", "sk", "nk", "lk", "rk", "ct", "ft", "pt", "xt", "lt", "st", "lp", "mp", "sp", "nd",
    "ld", "rd", "nt", "lf", "lm", "lb", "rb", "rm",
];

/// English-only onset clusters
const ENGLISH_STARTS: &[&str] = &[
    "str", "spr", "scr", "spl", "shr", "thr", "sch", "squ", "bl", "cl", "fl", "gl", "pl", "sl",
    "br", "cr", "dr", "fr", "gr", "pr", "sc", "sk", "sm", "sn", "sp", "st", "sw", "dw", "tw",
    "gn",
];

/// Silent-letter starts (know, write, psalm, pneumonia)
const ENGLISH_SILENT_STARTS: &[&str] = &["kn", "wr", "ps", "pn"];

/// English-only endings with silent or clustered letters
const ENGLISH_SILENT_ENDS: &[&str] = &["mb", "lm", "gn", "bt"];

/// Vowel sequences Vietnamese never produces
const ENGLISH_VOWEL_PATTERNS: &[&str] = &[
    "ough", "eigh", "augh", "oo", "ee", "eau", "iew", "ow", "aw", "ies",
];

/// Vietnamese digraphs collapsed before counting consonant clusters
const VIETNAMESE_DIGRAPHS: &[&str] = &["ngh", "ng", "nh", "ch", "th", "kh", "ph", "tr", "gi", "qu"];

fn is_cons(c: char) -> bool {
    c.is_ascii_alphabetic() && !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// f/j/w/z anywhere except the last position (Telex tone/horn keys live
/// at the end of Vietnamese words)
fn has_interior_fjwz(w: &str) -> bool {
    let n = w.len();
    w.bytes()
        .take(n.saturating_sub(1))
        .any(|b| matches!(b, b'f' | b'j' | b'w' | b'z'))
}

/// Same consonant twice in a row (ll, ss, tt...)
fn has_doubled_consonant(w: &str) -> bool {
    w.as_bytes()
        .windows(2)
        .any(|p| p[0] == p[1] && is_cons(p[0] as char))
}

/// Three consonants in a row after collapsing Vietnamese digraphs
fn has_consonant_cluster(w: &str) -> bool {
    let mut collapsed = w.to_string();
    for d in VIETNAMESE_DIGRAPHS {
        collapsed = collapsed.replace(d, "+");
    }
    let mut run = 0;
    for c in collapsed.chars() {
        if c == '+' || is_cons(c) {
            run += 1;
            if run >= 3 {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// x somewhere strictly inside the word
fn has_interior_x(w: &str) -> bool {
    let bytes = w.as_bytes();
    bytes.len() > 2 && bytes[1..bytes.len() - 1].contains(&b'x')
}

/// q not followed by u
fn has_lone_q(w: &str) -> bool {
    let bytes = w.as_bytes();
    bytes
        .iter()
        .enumerate()
        .any(|(i, &b)| b == b'q' && bytes.get(i + 1) != Some(&b'u'))
}

/// Rules shared by both variants: starts, interior letters, impossible
/// clusters, vowel patterns
fn english_core(w: &str, io_marked: bool) -> bool {
    if has_interior_fjwz(w) {
        return true;
    }
    if ENGLISH_STARTS.iter().any(|s| w.starts_with(s)) {
        return true;
    }
    if ENGLISH_SILENT_STARTS.iter().any(|s| w.starts_with(s)) {
        return true;
    }
    if has_doubled_consonant(w) {
        return true;
    }
    if has_consonant_cluster(w) {
        return true;
    }
    if ENGLISH_VOWEL_PATTERNS.iter().any(|p| w.contains(p)) {
        return true;
    }
    if has_interior_x(w) {
        return true;
    }
    if has_lone_q(w) {
        return true;
    }
    // io never occurs in Vietnamese unless already composed as iô/iơ
    if !io_marked && w.contains("io") {
        return true;
    }
    false
}

/// Full rule set, run at word break
pub fn is_definitely_english(word: &str, io_marked: bool) -> bool {
    let w = word.to_lowercase();
    if w.len() < 2 {
        return false;
    }

    if english_core(&w, io_marked) {
        return true;
    }

    // Ending rules
    if w.len() > 2 && w.ends_with('s') {
        return true;
    }
    if w
        .as_bytes()
        .last()
        .map(|b| matches!(b, b'b' | b'd' | b'g' | b'k' | b'l' | b'r' | b'v' | b'x'))
        .unwrap_or(false)
    {
        return true;
    }
    if ENGLISH_ENDINGS_2.iter().any(|e| w.ends_with(e)) {
        return true;
    }
    if ENGLISH_SILENT_ENDS.iter().any(|e| w.ends_with(e)) {
        return true;
    }

    false
}

/// Restricted variant for mid-word checks: no ending rules
pub fn looks_english_while_typing(word: &str, io_marked: bool) -> bool {
    let w = word.to_lowercase();
    if w.len() < 2 {
        return false;
    }
    english_core(&w, io_marked)
}

/// Words the restore machinery leaves alone: single characters and words
/// that do not start with a letter (emoji shortcuts, numbers)
pub fn skip_restore(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        None => true,
        Some(first) => !first.is_ascii_alphabetic() || chars.next().is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("street")]
    #[case("school")]
    #[case("spring")]
    #[case("hello")] // doubled l
    #[case("text")] // interior x
    #[case("quick")] // ck ending
    #[case("expect")] // interior x
    #[case("food")] // oo
    #[case("view")] // iew
    #[case("know")] // kn start + ow
    #[case("lamb")] // mb ending
    #[case("nation")] // io
    #[case("works")] // ends s
    #[case("failed")] // ends d
    #[case("iraq")] // lone q
    fn test_english_words(#[case] w: &str) {
        assert!(is_definitely_english(w, false), "'{}' should read as English", w);
    }

    #[rstest]
    #[case("truong")]
    #[case("nguoi")]
    #[case("chuong")]
    #[case("nghieng")]
    #[case("toan")]
    #[case("viet")]
    #[case("hay")]
    #[case("quen")]
    #[case("an")]
    fn test_vietnamese_raw_words(#[case] w: &str) {
        assert!(
            !is_definitely_english(w, false),
            "'{}' should not read as English",
            w
        );
    }

    #[test]
    fn test_final_fjwz_tolerated() {
        // Telex tone keys at the end must not trip the interior rule
        assert!(!has_interior_fjwz("caf"));
        assert!(!has_interior_fjwz("bongj"));
        assert!(has_interior_fjwz("before"));
        assert!(has_interior_fjwz("adjust"));
    }

    #[test]
    fn test_realtime_variant_skips_endings() {
        // "las" ends with s: word-break rule only
        assert!(is_definitely_english("las", false));
        assert!(!looks_english_while_typing("las", false));

        // start clusters fire in both
        assert!(looks_english_while_typing("stre", false));
        assert!(is_definitely_english("stre", false));
    }

    #[test]
    fn test_io_marked_exception() {
        assert!(is_definitely_english("tion", false));
        assert!(!is_definitely_english("tion", true));
    }

    #[test]
    fn test_digraph_collapse() {
        // nghieng: ngh + ieng collapses cleanly
        assert!(!has_consonant_cluster("nghieng"));
        // world: r + l + d survive as a cluster
        assert!(has_consonant_cluster("world"));
        assert!(has_consonant_cluster("abstract"));
    }

    #[test]
    fn test_skip_restore() {
        assert!(skip_restore(""));
        assert!(skip_restore("a"));
        assert!(skip_restore(":happy"));
        assert!(skip_restore("1abc"));
        assert!(!skip_restore("ab"));
    }
}
