//! Vietnamese Vowel System
//!
//! Phonological classification of Vietnamese vowels and the tone-mark
//! placement rule over vowel clusters.
//!
//! ## Vowel Classification
//!
//! Vietnamese has 12 vowels with 3 modifier types:
//! - Simple: a, e, i, o, u, y
//! - Circumflex (^): â, ê, ô
//! - Horn (móc): ơ, ư
//! - Breve (trăng): ă
//!
//! ## Phonological Roles
//!
//! In Vietnamese syllable structure (C)(G)V(C):
//! - **Medial (âm đệm)**: o, u when followed by main vowel (oa, oe, uy, uê)
//! - **Main (âm chính)**: The primary vowel carrying tone
//! - **Glide (bán nguyên âm)**: i/y, u/o at syllable end (ai, ao, iu, oi)

use super::keys;

/// Vowel modifier type (dấu phụ)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Modifier {
    None = 0,       // a, e, i, o, u, y
    Circumflex = 1, // â, ê, ô (^)
    Horn = 2,       // ơ, ư (móc) / ă (trăng)
}

/// Vowel information
#[derive(Clone, Copy, Debug)]
pub struct Vowel {
    pub key: u16,
    pub modifier: Modifier,
    pub pos: usize,
}

impl Vowel {
    pub fn new(key: u16, modifier: Modifier, pos: usize) -> Self {
        Self { key, modifier, pos }
    }

    /// Check if this vowel has a diacritic modifier (^, ơ, ư, ă)
    pub fn has_diacritic(&self) -> bool {
        self.modifier != Modifier::None
    }
}

// =============================================================================
// VOWEL CLUSTER TABLES
// =============================================================================

/// Every recognized Vietnamese vowel cluster, in composed form (diacritics,
/// no tone marks). Marked variants validate through their base entry.
pub const CLUSTERS: &[&str] = &[
    "a", "ai", "ao", "au", "ay", "âu", "ây", //
    "e", "eo", "ê", "êu", //
    "i", "ia", "iê", "iêu", "iu", //
    "o", "oa", "oă", "oai", "oao", "oay", "oe", "oeo", "oi", //
    "ô", "ôi", "ơ", "ơi", //
    "u", "ua", "uâ", "uây", "uê", "ui", "uô", "uôi", "uy", "uya", "uyê", "uyu", //
    "ư", "ưa", "ưi", "ưu", "ươ", "ươi", "ươu", //
    "y", "yê", "yêu",
];

/// The same clusters reduced to plain letters (â/ă → a, ê → e, ô/ơ → o,
/// ư → u). Used while the user is still typing, before shape keys arrive.
pub const BASE_RUNS: &[&str] = &[
    "a", "ai", "ao", "au", "ay", //
    "e", "eo", "eu", //
    "i", "ia", "ie", "ieu", "iu", //
    "o", "oa", "oai", "oao", "oay", "oe", "oeo", "oi", //
    "u", "ua", "uay", "ue", "ui", "uo", "uoi", "uou", "uu", "uy", "uya", "uye", "uyu", //
    "y", "ye", "yeu",
];

/// Check a composed vowel run (diacritics, marks stripped by the caller)
/// against the cluster table. Strict prefixes are accepted: the user may
/// still be typing the rest of the cluster.
pub fn is_cluster_or_prefix(run: &str) -> bool {
    if run.is_empty() {
        return true;
    }
    CLUSTERS.iter().any(|c| c.starts_with(run))
}

/// Exact composed-cluster membership
pub fn is_cluster(run: &str) -> bool {
    CLUSTERS.contains(&run)
}

/// Check a plain-letter vowel run against the base table (prefixes accepted)
pub fn is_base_run_or_prefix(run: &str) -> bool {
    if run.is_empty() {
        return true;
    }
    BASE_RUNS.iter().any(|c| c.starts_with(run))
}

// =============================================================================
// TONE POSITION PATTERNS
// =============================================================================

/// Position for tone mark placement
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TonePosition {
    /// First vowel (âm chính + glide: ai, ao, ia, ưu...)
    First,
    /// Second vowel (âm đệm + chính: oa, uy; compound: iê, uô, ươ)
    Second,
    /// Last vowel (only uyê triphthong)
    Last,
}

/// Diphthongs with tone on FIRST vowel (âm chính + glide)
///
/// ai, ao, au, ay, eo, ia, iu, oi, ui, ua (not after q), ưu
const TONE_FIRST_PATTERNS: &[[u16; 2]] = &[
    [keys::A, keys::I], // ai: mái, hài
    [keys::A, keys::O], // ao: cáo, sào
    [keys::A, keys::U], // au: sáu, màu
    [keys::A, keys::Y], // ay: máy, tày
    [keys::E, keys::O], // eo: kéo, trèo
    [keys::I, keys::A], // ia: kìa, mía (not after gi)
    [keys::I, keys::U], // iu: dịu, kíu
    [keys::O, keys::I], // oi: đói, còi
    [keys::U, keys::I], // ui: túi, mùi
    [keys::U, keys::A], // ua: mùa, cúa (not after q)
    [keys::U, keys::U], // ưu: lưu, hưu
];

/// Diphthongs with tone on SECOND vowel (âm đệm + chính, compound)
///
/// oa, oe, uê, uy, iê, uô
const TONE_SECOND_PATTERNS: &[[u16; 2]] = &[
    [keys::O, keys::A], // oa: hoà, toá
    [keys::O, keys::E], // oe: khoẻ, xoè
    [keys::U, keys::E], // uê: huế, tuệ
    [keys::U, keys::Y], // uy: quý, thuỳ
    [keys::I, keys::E], // iê: tiên (compound)
    [keys::U, keys::O], // uô/ươ: (compound)
];

/// Triphthong pattern for tone placement
struct TriphthongPattern {
    v1: u16,
    v2: u16,
    v3: u16,
    position: TonePosition,
}

/// Triphthongs - penultimate vowel except uyê (last)
const TRIPHTHONG_PATTERNS: &[TriphthongPattern] = &[
    TriphthongPattern {
        v1: keys::I,
        v2: keys::E,
        v3: keys::U,
        position: TonePosition::Second,
    }, // iêu: tiếu
    TriphthongPattern {
        v1: keys::Y,
        v2: keys::E,
        v3: keys::U,
        position: TonePosition::Second,
    }, // yêu: yếu
    TriphthongPattern {
        v1: keys::O,
        v2: keys::A,
        v3: keys::I,
        position: TonePosition::Second,
    }, // oai: ngoài
    TriphthongPattern {
        v1: keys::O,
        v2: keys::A,
        v3: keys::O,
        position: TonePosition::Second,
    }, // oao: ngoáo
    TriphthongPattern {
        v1: keys::O,
        v2: keys::A,
        v3: keys::Y,
        position: TonePosition::Second,
    }, // oay: xoáy
    TriphthongPattern {
        v1: keys::O,
        v2: keys::E,
        v3: keys::O,
        position: TonePosition::Second,
    }, // oeo: khoèo
    TriphthongPattern {
        v1: keys::U,
        v2: keys::A,
        v3: keys::Y,
        position: TonePosition::Second,
    }, // uây: khuấy
    TriphthongPattern {
        v1: keys::U,
        v2: keys::O,
        v3: keys::I,
        position: TonePosition::Second,
    }, // uôi: cuối / ươi: mười
    TriphthongPattern {
        v1: keys::U,
        v2: keys::O,
        v3: keys::U,
        position: TonePosition::Second,
    }, // ươu: rượu
    TriphthongPattern {
        v1: keys::U,
        v2: keys::Y,
        v3: keys::E,
        position: TonePosition::Last,
    }, // uyê: khuyến, quyền
    TriphthongPattern {
        v1: keys::U,
        v2: keys::Y,
        v3: keys::U,
        position: TonePosition::Second,
    }, // uyu: khuỵu
];

// =============================================================================
// TONE PLACEMENT
// =============================================================================

/// Find the index (into `vowels`) where the tone mark belongs.
///
/// Rules, in order:
/// 1. A vowel already carrying circumflex/horn/breve wins; for the
///    horn-horn pair ươ the second vowel wins.
/// 2. Closed syllable (final consonant, or the cluster is terminated by a
///    pass-through letter): main vowel - second of two, per pattern table
///    for three.
/// 3. Open syllable: pattern tables; `modern` switches oa/oe/uy from first
///    to second vowel.
/// 4. qu-/gi- initials consume the leading u/i, shifting placement right.
pub fn find_tone_position(
    vowels: &[Vowel],
    has_final_consonant: bool,
    modern: bool,
    has_qu_initial: bool,
    has_gi_initial: bool,
    terminated: bool,
) -> usize {
    let closed = has_final_consonant || terminated;
    match vowels.len() {
        0 => 0,
        1 => 0,
        2 => diphthong_position(vowels, closed, modern, has_qu_initial, has_gi_initial),
        3 => triphthong_position(vowels),
        _ => fallback_position(vowels),
    }
}

fn diphthong_position(
    vowels: &[Vowel],
    closed: bool,
    modern: bool,
    has_qu_initial: bool,
    has_gi_initial: bool,
) -> usize {
    let (v1, v2) = (&vowels[0], &vowels[1]);

    // Diacritic priority; ươ (horn + horn) takes the second
    if v1.has_diacritic() && !v2.has_diacritic() {
        return 0;
    }
    if v2.has_diacritic() {
        return 1;
    }

    // Closed syllable: the second vowel is the main vowel
    if closed {
        return 1;
    }

    // ia: first unless gi-initial (kìa vs. gịa)
    if v1.key == keys::I && v2.key == keys::A {
        return if has_gi_initial { 1 } else { 0 };
    }

    // ua: first unless qu-initial (mùa vs. quà); not affected by style
    if v1.key == keys::U && v2.key == keys::A {
        return if has_qu_initial { 1 } else { 0 };
    }

    // uy after qu: u belongs to the initial, tone goes on y
    if v1.key == keys::U && v2.key == keys::Y && has_qu_initial {
        return 1;
    }

    let pair = [v1.key, v2.key];

    if TONE_SECOND_PATTERNS.contains(&pair) {
        // Only oa, oe, uy are subject to the modern/traditional debate
        let debated = matches!(
            (v1.key, v2.key),
            (keys::O, keys::A) | (keys::O, keys::E) | (keys::U, keys::Y)
        );
        if debated {
            return if modern { 1 } else { 0 };
        }
        return 1;
    }

    if TONE_FIRST_PATTERNS.contains(&pair) {
        return 0;
    }

    // Default: second vowel
    1
}

fn triphthong_position(vowels: &[Vowel]) -> usize {
    let (k0, k1, k2) = (vowels[0].key, vowels[1].key, vowels[2].key);

    for pattern in TRIPHTHONG_PATTERNS {
        if k0 == pattern.v1 && k1 == pattern.v2 && k2 == pattern.v3 {
            return match pattern.position {
                TonePosition::First => 0,
                TonePosition::Second => 1,
                TonePosition::Last => 2,
            };
        }
    }

    // Unmatched: prefer a diacritic-carrying vowel, middle first
    if vowels[1].has_diacritic() {
        return 1;
    }
    if vowels[2].has_diacritic() {
        return 2;
    }
    1
}

fn fallback_position(vowels: &[Vowel]) -> usize {
    let mid = vowels.len() / 2;
    if vowels[mid].has_diacritic() {
        return mid;
    }
    for (i, v) in vowels.iter().enumerate() {
        if v.has_diacritic() {
            return i;
        }
    }
    mid
}

// =============================================================================
// HORN / BREVE PLACEMENT
// =============================================================================

/// Find which vowel(s) of the run receive the horn (or breve) modifier.
///
/// `vowel_keys` is the base-letter run; `after_q` is true when the run's
/// leading `u` is part of a qu- initial. Returned indices are into the run.
///
/// - uo / uô → both (ươ compound: được, ướt)
/// - uu → first (ưu: lưu, hưu)
/// - oa → second as breve (oă: hoặc, xoắn)
/// - ua → first (mưa, chưa) unless after q (quă)
/// - single u/o from the right; plain a last (breve)
pub fn find_horn_positions(vowel_keys: &[u16], after_q: bool) -> Vec<usize> {
    if vowel_keys.len() >= 2 {
        for i in 0..vowel_keys.len() - 1 {
            let (k1, k2) = (vowel_keys[i], vowel_keys[i + 1]);
            if k1 == keys::U && k2 == keys::O {
                return vec![i, i + 1];
            }
            if k1 == keys::U && k2 == keys::U {
                return vec![i];
            }
            if k1 == keys::O && k2 == keys::A {
                return vec![i + 1];
            }
            if k1 == keys::U && k2 == keys::A {
                return if after_q { vec![i + 1] } else { vec![i] };
            }
        }
    }

    // Single target: last u or o, skipping o that precedes e (ơe is not a
    // Vietnamese run)
    for i in (0..vowel_keys.len()).rev() {
        let k = vowel_keys[i];
        if k == keys::U {
            return vec![i];
        }
        if k == keys::O {
            if vowel_keys.get(i + 1) == Some(&keys::E) {
                continue;
            }
            return vec![i];
        }
    }

    // No u/o: breve on a trailing a
    if let Some(&last) = vowel_keys.last() {
        if last == keys::A {
            return vec![vowel_keys.len() - 1];
        }
    }

    Vec::new()
}
