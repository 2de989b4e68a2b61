//! Input Methods
//!
//! Pure keystroke classifiers. Each method maps a raw keystroke to an
//! `Intent`; all buffer-dependent resolution (does the tone key follow a
//! vowel, is the doubled letter mergeable) happens in the engine.

pub mod telex;
pub mod vni;

pub use telex::Telex;
pub use vni::Vni;

use crate::settings::InputMethod;

/// What a keystroke asks the engine to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Append a vowel letter
    AppendVowel(u16),
    /// Append a consonant letter
    AppendConsonant(u16),
    /// Circumflex on the target vowel (â ê ô)
    AddCircumflex,
    /// Breve on a (ă)
    AddBreve,
    /// Horn on o/u (ơ ư); in Telex this also covers ă via aw
    AddHorn,
    /// Tone mark 1-5 (sắc, huyền, hỏi, ngã, nặng)
    AddTone(u8),
    /// Strip marks, then diacritics (Telex z, VNI 0)
    RemoveTone,
    /// Same letter twice merges (aa → â, dd → đ); VNI 9 reuses this for đ
    DoubleLetter(u16),
    /// Non-letter key producing a composed character directly ([ → ơ)
    Standalone(u16),
    /// Anything that passes through unchanged
    Normal(u16),
    /// Ends the current word
    WordBreak,
}

/// Input method classifier
pub trait Method {
    /// Classify one keystroke. `shifted` is the caps/shift state.
    fn classify(&self, key: u16, shifted: bool) -> Intent;

    /// Whether `w` alone at word start composes ư
    fn w_standalone(&self) -> bool {
        false
    }

    /// Whether `[`/`]` compose ơ/ư directly
    fn bracket_standalone(&self) -> bool {
        false
    }

    /// Whether quick double-consonant expansion (cc → ch, ...) may apply
    /// when the user opted in
    fn quick_double(&self) -> bool {
        true
    }
}

/// Static method instances (zero-sized, no heap allocation)
static TELEX: Telex = Telex::full();
static SIMPLE_TELEX_1: Telex = Telex::simple1();
static SIMPLE_TELEX_2: Telex = Telex::simple2();
static VNI: Vni = Vni;

/// Get classifier by configured method (static reference, no allocation)
pub fn get(method: InputMethod) -> &'static dyn Method {
    match method {
        InputMethod::Telex => &TELEX,
        InputMethod::Vni => &VNI,
        InputMethod::SimpleTelex1 => &SIMPLE_TELEX_1,
        InputMethod::SimpleTelex2 => &SIMPLE_TELEX_2,
    }
}
