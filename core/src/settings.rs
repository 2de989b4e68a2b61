//! Engine configuration
//!
//! Plain data, serde-serializable so hosts can persist it as JSON alongside
//! their own preferences. Numeric ids are stable for the C ABI.

use serde::{Deserialize, Serialize};

/// Keystroke convention
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMethod {
    #[default]
    #[serde(rename = "telex")]
    Telex,
    #[serde(rename = "vni")]
    Vni,
    #[serde(rename = "simple_telex_1")]
    SimpleTelex1,
    #[serde(rename = "simple_telex_2")]
    SimpleTelex2,
}

impl InputMethod {
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Self::Vni,
            2 => Self::SimpleTelex1,
            3 => Self::SimpleTelex2,
            _ => Self::Telex,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Self::Telex => 0,
            Self::Vni => 1,
            Self::SimpleTelex1 => 2,
            Self::SimpleTelex2 => 3,
        }
    }
}

/// Output character set. The engine always emits Unicode scalars in
/// `char_data`; hosts targeting the legacy charsets transcode on injection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeTable {
    #[default]
    Unicode,
    Tcvn3,
    VniWindows,
}

impl CodeTable {
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Self::Tcvn3,
            2 => Self::VniWindows,
            _ => Self::Unicode,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Self::Unicode => 0,
            Self::Tcvn3 => 1,
            Self::VniWindows => 2,
        }
    }
}

/// All engine switches
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub input_method: InputMethod,
    pub code_table: CodeTable,

    /// Tone on the main vowel of oa/oe/uy (hoạ) instead of the first (họa)
    pub modern_style: bool,
    pub spell_check_enabled: bool,
    /// Hint for hosts fighting browser autocomplete; no engine-side behavior
    pub fix_autocomplete: bool,
    /// Accept tone keys after the vowel cluster has been closed off
    pub free_marking: bool,

    /// cc → ch, gg → gi, kk → kh, nn → ng, pp → ph, qq → qu, tt → th
    pub quick_telex: bool,
    /// f → ph, j → gi, w → qu as the first letter
    pub quick_start_consonant: bool,
    /// After a vowel: g → ng, h → nh, k → ch
    pub quick_end_consonant: bool,

    pub upper_case_first_char: bool,
    pub restore_if_wrong_spelling: bool,
    /// Treat leading z/f/w/j as acceptable initials when validating
    pub allow_consonant_zfwj: bool,

    pub temp_off_spelling: bool,
    pub temp_off_engine: bool,

    pub macro_enabled: bool,
    pub macro_in_english_mode: bool,
    pub auto_caps_macro: bool,

    pub smart_switch_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            input_method: InputMethod::Telex,
            code_table: CodeTable::Unicode,
            modern_style: true,
            spell_check_enabled: true,
            fix_autocomplete: false,
            free_marking: true,
            quick_telex: false,
            quick_start_consonant: false,
            quick_end_consonant: false,
            upper_case_first_char: false,
            restore_if_wrong_spelling: false,
            allow_consonant_zfwj: false,
            temp_off_spelling: false,
            temp_off_engine: false,
            macro_enabled: true,
            macro_in_english_mode: false,
            auto_caps_macro: true,
            smart_switch_enabled: true,
        }
    }
}
