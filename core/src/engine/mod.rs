//! Vietnamese IME Engine
//!
//! One keystroke in, one `HookState` out. The engine owns the typing buffer
//! and derives word state from it after every change; the host applies the
//! returned backspaces and replacement characters before submitting the next
//! keystroke.

pub mod buffer;
pub mod macros;
pub mod restore;
pub mod smartswitch;
pub mod word;

use buffer::{History, Keystroke, TypingBuffer, MAX_SIZE};
use macros::MacroTable;
use smartswitch::SmartSwitch;
use word::WordState;

use crate::data::chars::{self, mark, PackedChar};
use crate::data::keys;
use crate::data::vowel;
use crate::input::{self, Intent};
use crate::settings::EngineSettings;

/// Expansion capacity in a single result
pub const MACRO_MAX: usize = 256;

/// Operation codes, stable across the C ABI
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Engine did not consume the key; host passes it through
    Ignore = 0,
    /// Consumed with no visible change (or unknown key)
    DoNothing = 1,
    /// Apply backspaces, then inject `char_data`
    WillProcess = 2,
    /// Word judged non-Vietnamese: rewrite to the raw keystrokes
    Restore = 3,
    /// Restore, then the session resets (ESC)
    RestoreAndNewSession = 4,
    /// A macro trigger committed: erase it and inject `macro_data`
    ReplaceMacro = 5,
}

/// Result of one keystroke.
///
/// `char_data` is stored in reverse index order (last character first),
/// mirroring how the host injects text.
#[repr(C)]
pub struct HookState {
    pub op: u8,
    pub backspace_count: u8,
    pub new_char_count: u8,
    pub char_data: [u32; MAX_SIZE],
    pub macro_key_len: u8,
    pub macro_key: [u16; MAX_SIZE],
    pub macro_len: u16,
    pub macro_data: [u32; MACRO_MAX],
}

impl HookState {
    fn base(op: Op) -> Self {
        Self {
            op: op as u8,
            backspace_count: 0,
            new_char_count: 0,
            char_data: [0; MAX_SIZE],
            macro_key_len: 0,
            macro_key: [0; MAX_SIZE],
            macro_len: 0,
            macro_data: [0; MACRO_MAX],
        }
    }

    pub fn ignore() -> Self {
        Self::base(Op::Ignore)
    }

    pub fn nothing() -> Self {
        Self::base(Op::DoNothing)
    }

    /// Backspace `bs` visible characters, then write `chars` (given in
    /// forward order; stored reversed)
    pub fn send(op: Op, bs: usize, chars: &[PackedChar]) -> Self {
        let mut r = Self::base(op);
        r.backspace_count = bs.min(u8::MAX as usize) as u8;
        let n = chars.len().min(MAX_SIZE);
        r.new_char_count = n as u8;
        for (i, p) in chars[..n].iter().enumerate() {
            r.char_data[n - 1 - i] = p.0;
        }
        r
    }

    pub fn replace_macro(bs: usize, trigger: &str, expansion: &str) -> Self {
        let mut r = Self::base(Op::ReplaceMacro);
        r.backspace_count = bs.min(u8::MAX as usize) as u8;
        let klen = trigger.len().min(MAX_SIZE);
        r.macro_key_len = klen as u8;
        for (i, b) in trigger.bytes().take(klen).enumerate() {
            r.macro_key[i] = b as u16;
        }
        let mlen = expansion.chars().count().min(MACRO_MAX);
        r.macro_len = mlen as u16;
        for (i, c) in expansion.chars().take(mlen).enumerate() {
            r.macro_data[i] = c as u32;
        }
        r
    }

    /// Characters in forward order, decoded
    pub fn output_chars(&self) -> Vec<char> {
        let n = self.new_char_count as usize;
        (0..n)
            .rev()
            .filter_map(|i| chars::to_unicode(PackedChar(self.char_data[i])).ok())
            .collect()
    }
}

/// Main engine
pub struct Engine {
    buf: TypingBuffer,
    history: History,
    settings: EngineSettings,
    /// 0 = English, 1 = Vietnamese
    lang: u8,
    macros: MacroTable,
    smart: SmartSwitch,
    /// Composition suspended for the rest of the word after a restore
    suspended: bool,
    /// Raw word collector while the engine is in English mode
    english_word: String,
    /// Host-driven: drop input-source notifications for a while
    ignore_source_events: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_stores(MacroTable::new(), SmartSwitch::new())
    }

    /// Build with externally loaded collaborator stores
    pub fn with_stores(macros: MacroTable, smart: SmartSwitch) -> Self {
        Self {
            buf: TypingBuffer::new(),
            history: History::new(),
            settings: EngineSettings::default(),
            lang: smartswitch::LANG_VIETNAMESE,
            macros,
            smart,
            suspended: false,
            english_word: String::new(),
            ignore_source_events: false,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: EngineSettings) {
        self.settings = settings;
    }

    pub fn settings_mut(&mut self) -> &mut EngineSettings {
        &mut self.settings
    }

    pub fn language(&self) -> u8 {
        self.lang
    }

    pub fn set_language(&mut self, lang: u8) {
        self.lang = lang;
        self.buf.clear();
        self.suspended = false;
        self.english_word.clear();
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn macros_mut(&mut self) -> &mut MacroTable {
        &mut self.macros
    }

    pub fn smart_switch(&self) -> &SmartSwitch {
        &self.smart
    }

    pub fn smart_switch_mut(&mut self) -> &mut SmartSwitch {
        &mut self.smart
    }

    /// Drop the current word: buffer, word state, macro collector. History
    /// stays; no snapshot is pushed.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.suspended = false;
        self.english_word.clear();
    }

    /// Reset including word history. For cursor moves and focus changes,
    /// where stale snapshots would restore the wrong text.
    pub fn reset_all(&mut self) {
        self.reset();
        self.history.clear();
    }

    /// Foreground app changed. Returns the language to switch to, if the
    /// stored preference differs from the current one.
    pub fn handle_app_switch(&mut self, app_id: &str) -> Option<u8> {
        if !self.settings.smart_switch_enabled {
            return None;
        }
        self.reset();
        match self.smart.get_app_language(app_id, self.lang) {
            Some(lang) if lang != self.lang => {
                log::debug!("smart switch: {} -> lang {}", app_id, lang);
                self.lang = lang;
                Some(lang)
            }
            _ => None,
        }
    }

    /// Host-side input-source collision window (the engine only stores the
    /// flag; timing lives with the host)
    pub fn set_ignore_source_events(&mut self, on: bool) {
        self.ignore_source_events = on;
    }

    pub fn ignore_source_events(&self) -> bool {
        self.ignore_source_events
    }

    /// Visible content of the current word
    pub fn buffer_string(&self) -> String {
        self.buf.visible_string()
    }

    /// ASCII projection of the raw keystrokes of the current word
    pub fn raw_string(&self) -> String {
        self.buf.raw_keystrokes_as_string()
    }

    /// Rebuild the buffer from a committed word the host read back (cursor
    /// moved into existing text)
    pub fn restore_word(&mut self, word: &str) {
        self.buf.restore_from_committed(word);
        self.suspended = false;
    }

    // ============================================================
    // Main loop
    // ============================================================

    /// Process one keystroke. `caps` doubles as the shift state for
    /// non-letter keys.
    pub fn handle_key(&mut self, key: u16, caps: bool) -> HookState {
        if self.settings.temp_off_engine {
            return HookState::ignore();
        }

        if self.lang != smartswitch::LANG_VIETNAMESE {
            return self.english_mode_key(key, caps);
        }

        if key == keys::DELETE {
            return self.handle_backspace();
        }
        if key == keys::ESC {
            return self.handle_escape();
        }

        let method = input::get(self.settings.input_method);
        let intent = method.classify(key, caps);

        if intent == Intent::WordBreak {
            return self.commit_word(key, caps);
        }

        let prev_visible = self.buf.len();

        if self.suspended {
            // Word already judged foreign: collect raw, let the host type
            if keys::to_ascii(key, caps).is_some() {
                let i = self.buf.append(key, caps);
                if let Some(e) = self.buf.get_mut(i) {
                    e.role = buffer::Compose::Inline;
                }
            }
            return HookState::ignore();
        }

        let result = self.apply_intent(intent, key, caps, prev_visible);
        self.spell_gate(result, prev_visible)
    }

    /// Replay the keystroke log through the normal pipeline, rebuilding the
    /// buffer and word state from scratch
    pub fn rebuild_from_keystrokes(&mut self) {
        let keystrokes: Vec<Keystroke> = self.buf.keystrokes().to_vec();
        self.buf.clear();
        self.suspended = false;
        for ks in keystrokes {
            let _ = self.handle_key(ks.key, ks.caps);
        }
    }

    // ============================================================
    // English mode
    // ============================================================

    fn english_mode_key(&mut self, key: u16, caps: bool) -> HookState {
        if !(self.settings.macro_enabled && self.settings.macro_in_english_mode) {
            return HookState::ignore();
        }
        if key == keys::DELETE {
            self.english_word.pop();
            return HookState::ignore();
        }
        if keys::is_break(key) {
            let word = std::mem::take(&mut self.english_word);
            if !word.is_empty() {
                if let Some(exp) = self.macros.lookup(&word, self.settings.auto_caps_macro) {
                    let mut with_break = exp;
                    if let Some(b) = keys::to_ascii(key, caps) {
                        with_break.push(b);
                    }
                    return HookState::replace_macro(word.chars().count(), &word, &with_break);
                }
            }
            return HookState::ignore();
        }
        if let Some(ch) = keys::to_ascii(key, caps) {
            self.english_word.push(ch);
        }
        HookState::ignore()
    }

    // ============================================================
    // Backspace / ESC
    // ============================================================

    fn handle_backspace(&mut self) -> HookState {
        if !self.buf.is_empty() {
            self.buf.remove_last();
            if self.buf.is_empty() {
                self.suspended = false;
            }
            return HookState::nothing();
        }
        // Backspace after space: resume the previous word; the host's
        // backspace eats the break character
        if let Some(snap) = self.history.pop() {
            self.buf.restore(snap);
            self.suspended = false;
        }
        HookState::nothing()
    }

    fn handle_escape(&mut self) -> HookState {
        let transformed = self.buf.iter().any(|e| e.processed.is_transformed());
        if !transformed {
            self.reset();
            return HookState::nothing();
        }
        let bs = self.buf.len();
        let raw = self.restore_keystrokes();
        let packed: Vec<PackedChar> = raw.iter().map(|k| PackedChar::new(k.key, k.caps)).collect();
        self.reset();
        HookState::send(Op::RestoreAndNewSession, bs, &packed)
    }

    // ============================================================
    // Word break
    // ============================================================

    fn commit_word(&mut self, key: u16, caps: bool) -> HookState {
        let break_char = PackedChar::new(key, caps);
        let raw = self.word_raw_string();

        // Macro lookup runs on the raw projection, so transformed trigger
        // letters still match
        if self.settings.macro_enabled && !raw.is_empty() {
            if let Some(exp) = self.macros.lookup(&raw, self.settings.auto_caps_macro) {
                let mut with_break = exp;
                if let Ok(b) = chars::to_unicode(break_char) {
                    with_break.push(b);
                }
                let result = HookState::replace_macro(raw.chars().count(), &raw, &with_break);
                self.reset();
                return result;
            }
        }

        // Final wrong-spelling check with the full heuristic
        if self.restore_enabled() && !self.suspended && !restore::skip_restore(&raw) {
            let st = WordState::parse(&self.buf);
            let has_pass = self.buf.iter().any(|e| !e.is_active());
            let invalid =
                !st.is_valid_vietnamese(&self.buf, self.settings.allow_consonant_zfwj);
            // Modifier reverts eat keystrokes without leaving a transformed
            // entry behind; a visible/raw mismatch still needs unwinding
            let needs_rewrite = self.buf.iter().any(|e| e.processed.is_transformed())
                || self.buf.visible_string() != raw;
            if (invalid || has_pass)
                && needs_rewrite
                && restore::is_definitely_english(&raw, self.io_marked(&st))
            {
                let bs = self.buf.len();
                let mut packed: Vec<PackedChar> = self
                    .restore_keystrokes()
                    .iter()
                    .map(|k| PackedChar::new(k.key, k.caps))
                    .collect();
                packed.push(break_char);
                self.reset();
                return HookState::send(Op::Restore, bs, &packed);
            }
        }

        // Upper-case-first applies at commit when nothing was capitalized
        if self.settings.upper_case_first_char && self.ucf_applies() {
            if let Some(e) = self.buf.get_mut(0) {
                e.processed.set_caps(true);
            }
            let bs = self.buf.len();
            let mut out: Vec<PackedChar> = self.buf.iter().map(|e| e.processed).collect();
            out.push(break_char);
            if out.len() <= MAX_SIZE {
                self.push_history_and_clear();
                return HookState::send(Op::WillProcess, bs, &out);
            }
            // Word too long to rewrite in one result; fall through unchanged
            if let Some(e) = self.buf.get_mut(0) {
                e.processed.set_caps(false);
            }
        }

        self.push_history_and_clear();
        HookState::send(Op::WillProcess, 0, &[break_char])
    }

    fn push_history_and_clear(&mut self) {
        if !self.buf.is_empty() {
            self.history.push(self.buf.snapshot());
        }
        self.buf.clear();
        self.suspended = false;
    }

    fn ucf_applies(&self) -> bool {
        match self.buf.get(0) {
            Some(first) => {
                keys::is_letter(first.processed.key())
                    && !first.processed.is_char_code()
                    && !self.buf.iter().any(|e| e.processed.caps())
            }
            None => false,
        }
    }

    // ============================================================
    // Intent application
    // ============================================================

    fn apply_intent(
        &mut self,
        intent: Intent,
        key: u16,
        caps: bool,
        prev_visible: usize,
    ) -> HookState {
        match intent {
            Intent::AppendVowel(v) => self.apply_vowel(v, key, caps, prev_visible),
            Intent::AppendConsonant(c) => self.apply_consonant(c, key, caps, prev_visible),
            Intent::AddCircumflex => self.apply_circumflex(key, caps, prev_visible),
            Intent::AddBreve => self.apply_breve(key, caps, prev_visible),
            Intent::AddHorn => self.apply_horn(key, caps, prev_visible),
            Intent::AddTone(m) => self.apply_tone(m, key, caps, prev_visible),
            Intent::RemoveTone => self.apply_remove_tone(key, caps, prev_visible),
            Intent::DoubleLetter(k) => self.apply_double(k, key, caps, prev_visible),
            Intent::Standalone(k) => self.apply_standalone(k, caps, prev_visible),
            Intent::Normal(k) => self.apply_passthrough(k, caps),
            Intent::WordBreak => unreachable!("handled by the main loop"),
        }
    }

    /// Full-word rewrite: erase what was visible before this keystroke,
    /// re-send the whole window
    fn make_rewrite(&self, prev_visible: usize) -> HookState {
        let out: Vec<PackedChar> = self.buf.iter().map(|e| e.processed).collect();
        HookState::send(Op::WillProcess, prev_visible, &out)
    }

    fn apply_vowel(&mut self, v: u16, _key: u16, caps: bool, prev_visible: usize) -> HookState {
        let i = self.buf.append(v, caps);
        // A vowel that breaks the cluster (or follows the final consonant)
        // passes through as a foreign letter
        let st = WordState::parse(&self.buf);
        let in_word = st.vowels.contains(&i) || st.initial.contains(&i);
        let valid_run = vowel::is_cluster_or_prefix(&st.composed_vowel_run(&self.buf))
            || vowel::is_base_run_or_prefix(&st.base_vowel_run(&self.buf));
        if !in_word || !valid_run {
            if let Some(e) = self.buf.get_mut(i) {
                e.role = buffer::Compose::Terminal;
            }
            return HookState::nothing();
        }
        if self.relocate_tone() {
            return self.make_rewrite(prev_visible);
        }
        HookState::nothing()
    }

    fn apply_consonant(&mut self, c: u16, _key: u16, caps: bool, prev_visible: usize) -> HookState {
        // Quick word-start consonants: f → ph, j → gi, w → qu
        if self.settings.quick_start_consonant && self.buf.is_empty() {
            let pair = match c {
                keys::F => Some((keys::P, keys::H)),
                keys::J => Some((keys::G, keys::I)),
                keys::W => Some((keys::Q, keys::U)),
                _ => None,
            };
            if let Some((first, second)) = pair {
                let i = self.buf.append(c, caps);
                if let Some(e) = self.buf.get_mut(i) {
                    e.processed = PackedChar::new(first, caps);
                }
                self.append_phantom(second, caps);
                return self.make_rewrite(prev_visible);
            }
        }

        // Quick Telex doubles: cc → ch, gg → gi, ...
        if self.settings.quick_telex
            && input::get(self.settings.input_method).quick_double()
            && self.word_state().vowels.is_empty()
        {
            let expansion = match c {
                keys::C => Some(keys::H),
                keys::G => Some(keys::I),
                keys::K => Some(keys::H),
                keys::N => Some(keys::G),
                keys::P => Some(keys::H),
                keys::Q => Some(keys::U),
                keys::T => Some(keys::H),
                _ => None,
            };
            let mergeable = self
                .buf
                .last()
                .map(|last| {
                    last.is_active() && last.processed.key() == c && last.modifiers.is_empty()
                })
                .unwrap_or(false);
            if let Some(exp) = expansion {
                if mergeable {
                    let i = self.buf.append(c, caps);
                    if let Some(e) = self.buf.get_mut(i) {
                        e.processed = PackedChar::new(exp, caps);
                    }
                    return self.make_rewrite(prev_visible);
                }
            }
        }

        // Quick word-end consonants: g → ng, h → nh, k → ch after a vowel
        if self.settings.quick_end_consonant {
            let after_vowel = self
                .buf
                .last()
                .map(|e| e.is_active() && keys::is_vowel(e.processed.key()))
                .unwrap_or(false);
            let expansion = match c {
                keys::G => Some((keys::N, keys::G)),
                keys::H => Some((keys::N, keys::H)),
                keys::K => Some((keys::C, keys::H)),
                _ => None,
            };
            if after_vowel {
                if let Some((lead, display)) = expansion {
                    self.append_phantom(lead, caps);
                    let i = self.buf.append(c, caps);
                    if let Some(e) = self.buf.get_mut(i) {
                        e.processed = PackedChar::new(display, caps);
                    }
                    return self.make_rewrite(prev_visible);
                }
            }
        }

        let i = self.buf.append(c, caps);
        let st = WordState::parse(&self.buf);
        let fits = (st.initial.contains(&i)
            && word::is_initial_prefix(&st.initial_keys(&self.buf)))
            || (st.final_c.contains(&i) && word::is_valid_final(&st.final_keys(&self.buf)));
        if !fits {
            if let Some(e) = self.buf.get_mut(i) {
                e.role = buffer::Compose::Terminal;
            }
            return HookState::nothing();
        }
        if self.relocate_tone() {
            return self.make_rewrite(prev_visible);
        }
        HookState::nothing()
    }

    /// Entry with no keystroke of its own (quick-consonant expansions)
    fn append_phantom(&mut self, display_key: u16, caps: bool) {
        self.buf.append_unlogged(display_key, caps);
    }

    fn apply_circumflex(&mut self, key: u16, caps: bool, prev_visible: usize) -> HookState {
        let st = self.word_state();
        // last a/e/o in the vowel run
        let target = st
            .vowels
            .iter()
            .rev()
            .find(|&&i| {
                self.buf
                    .get(i)
                    .map(|e| matches!(e.processed.key(), keys::A | keys::E | keys::O))
                    .unwrap_or(false)
            })
            .copied();
        let Some(i) = target else {
            return self.apply_passthrough(key, caps);
        };

        let already = self.buf.get(i).map(|e| e.processed.has_tone()).unwrap_or(false);
        if already {
            // Second press reverts and the key goes in verbatim
            if let Some(e) = self.buf.get_mut(i) {
                e.processed.set_tone(false);
            }
            self.append_literal(key, caps);
            return self.make_rewrite(prev_visible);
        }

        if let Some(e) = self.buf.get_mut(i) {
            e.processed.set_tone(true);
        }
        let ks = Keystroke::new(key, caps);
        self.buf.add_modifier(i, ks);
        self.buf.record_keystroke(ks);
        self.relocate_tone();
        self.make_rewrite(prev_visible)
    }

    fn apply_breve(&mut self, key: u16, caps: bool, prev_visible: usize) -> HookState {
        self.apply_shape_tonew(key, caps, prev_visible, true)
    }

    fn apply_horn(&mut self, key: u16, caps: bool, prev_visible: usize) -> HookState {
        self.apply_shape_tonew(key, caps, prev_visible, false)
    }

    /// Horn and breve share the TONEW bit; placement picks the vowels
    fn apply_shape_tonew(
        &mut self,
        key: u16,
        caps: bool,
        prev_visible: usize,
        _breve_first: bool,
    ) -> HookState {
        let st = self.word_state();
        let run_keys: Vec<u16> = st
            .vowels
            .iter()
            .filter_map(|&i| self.buf.get(i).map(|e| e.processed.key()))
            .collect();

        if run_keys.is_empty() {
            // Quick-start w → qu wins over the standalone shortcut
            if key == keys::W && self.settings.quick_start_consonant && self.buf.is_empty() {
                return self.apply_consonant(keys::W, key, caps, prev_visible);
            }
            // Telex w with no target composes ư at word start
            if key == keys::W
                && input::get(self.settings.input_method).w_standalone()
                && st.final_c.is_empty()
            {
                let i = self.buf.append(keys::W, caps);
                if let Some(e) = self.buf.get_mut(i) {
                    e.processed = PackedChar::new(keys::U, caps);
                    e.processed.set_tonew(true);
                    e.processed.set_standalone(true);
                }
                return self.make_rewrite(prev_visible);
            }
            return self.apply_passthrough(key, caps);
        }

        let positions = vowel::find_horn_positions(&run_keys, st.has_qu_initial(&self.buf));
        if positions.is_empty() {
            return self.apply_passthrough(key, caps);
        }
        let targets: Vec<usize> = positions.iter().map(|&p| st.vowels[p]).collect();

        // All targets already shaped: revert and emit the key verbatim
        if targets
            .iter()
            .all(|&i| self.buf.get(i).map(|e| e.processed.has_tonew()).unwrap_or(false))
        {
            for &i in &targets {
                if let Some(e) = self.buf.get_mut(i) {
                    e.processed.set_tonew(false);
                }
            }
            self.append_literal(key, caps);
            return self.make_rewrite(prev_visible);
        }

        for &i in &targets {
            if let Some(e) = self.buf.get_mut(i) {
                e.processed.set_tonew(true);
            }
        }
        let ks = Keystroke::new(key, caps);
        if let Some(&last) = targets.last() {
            self.buf.add_modifier(last, ks);
        }
        self.buf.record_keystroke(ks);
        self.relocate_tone();
        self.make_rewrite(prev_visible)
    }

    fn apply_tone(&mut self, m: u8, key: u16, caps: bool, prev_visible: usize) -> HookState {
        let st = self.word_state();
        if st.vowels.is_empty() {
            return self.tone_key_fallback(key, caps, prev_visible);
        }
        if st.terminated && !self.settings.free_marking {
            return self.tone_key_fallback(key, caps, prev_visible);
        }

        // ư followed by plain o corrects to ươ before placement
        self.correct_uo();
        let st = self.word_state();

        let vowels = st.vowel_info(&self.buf);
        let idx = vowel::find_tone_position(
            &vowels,
            !st.final_c.is_empty(),
            self.settings.modern_style,
            st.has_qu_initial(&self.buf),
            st.has_gi_initial(&self.buf),
            st.terminated,
        );
        let target = st.vowels[idx.min(st.vowels.len() - 1)];

        let current = self.buf.get(target).map(|e| e.processed.mark()).unwrap_or(0);
        if current == m {
            // Same tone twice reverts it; the key goes in verbatim
            if let Some(e) = self.buf.get_mut(target) {
                e.processed.set_mark(mark::NONE);
            }
            self.append_literal(key, caps);
            return self.make_rewrite(prev_visible);
        }

        // One mark per word
        for i in 0..self.buf.len() {
            if let Some(e) = self.buf.get_mut(i) {
                e.processed.set_mark(mark::NONE);
            }
        }
        if let Some(e) = self.buf.get_mut(target) {
            e.processed.set_mark(m);
        }
        let ks = Keystroke::new(key, caps);
        self.buf.add_modifier(target, ks);
        self.buf.record_keystroke(ks);
        self.make_rewrite(prev_visible)
    }

    /// Tone keys double as letters (Telex s/f/r/x/j) or pass-through
    /// symbols (VNI digits) when no vowel can take the mark
    fn tone_key_fallback(&mut self, key: u16, caps: bool, prev_visible: usize) -> HookState {
        if keys::is_letter(key) {
            self.apply_consonant(key, key, caps, prev_visible)
        } else {
            self.apply_passthrough(key, caps)
        }
    }

    fn apply_remove_tone(&mut self, key: u16, caps: bool, prev_visible: usize) -> HookState {
        let st = self.word_state();
        // Marks strip first, shape diacritics second
        if let Some(pos) = st.tone_pos {
            if let Some(e) = self.buf.get_mut(pos) {
                e.processed.set_mark(mark::NONE);
            }
            self.buf.record_keystroke(Keystroke::new(key, caps));
            self.buf.add_modifier(pos, Keystroke::new(key, caps));
            return self.make_rewrite(prev_visible);
        }
        let shaped: Vec<usize> = st
            .vowels
            .iter()
            .copied()
            .filter(|&i| {
                self.buf
                    .get(i)
                    .map(|e| e.processed.has_tone() || e.processed.has_tonew())
                    .unwrap_or(false)
            })
            .collect();
        if !shaped.is_empty() {
            for &i in &shaped {
                if let Some(e) = self.buf.get_mut(i) {
                    e.processed.set_tone(false);
                    e.processed.set_tonew(false);
                }
            }
            let ks = Keystroke::new(key, caps);
            self.buf.add_modifier(shaped[shaped.len() - 1], ks);
            self.buf.record_keystroke(ks);
            return self.make_rewrite(prev_visible);
        }
        self.tone_key_fallback(key, caps, prev_visible)
    }

    fn apply_double(&mut self, k: u16, key: u16, caps: bool, prev_visible: usize) -> HookState {
        let st = self.word_state();
        let last_active = self
            .buf
            .iter()
            .enumerate()
            .rev()
            .find(|(_, e)| e.is_active())
            .map(|(i, _)| i);

        if let Some(i) = last_active {
            let p = self.buf.get(i).map(|e| e.processed).unwrap_or_default();
            if p.key() == k && !p.has_tonew() {
                // d+d composes đ only before any vowel
                if k == keys::D && !p.has_tone() && st.vowels.is_empty() {
                    if let Some(e) = self.buf.get_mut(i) {
                        e.processed.set_tone(true);
                    }
                    let ks = Keystroke::new(key, caps);
                    self.buf.add_modifier(i, ks);
                    self.buf.record_keystroke(ks);
                    return self.make_rewrite(prev_visible);
                }
                // Third press undoes (the free-undo pattern); the typed key
                // goes in verbatim (letter in Telex, digit in VNI). The user
                // asked for literal doubles: composition ends for this word.
                if p.has_tone() {
                    if let Some(e) = self.buf.get_mut(i) {
                        e.processed.set_tone(false);
                    }
                    if !keys::is_letter(key) {
                        self.append_literal(key, caps);
                    } else if k == keys::D {
                        let _ = self.apply_consonant(k, key, caps, prev_visible);
                    } else {
                        let j = self.buf.append(k, caps);
                        let run_ok = {
                            let st = WordState::parse(&self.buf);
                            vowel::is_base_run_or_prefix(&st.base_vowel_run(&self.buf))
                        };
                        if !run_ok {
                            if let Some(e) = self.buf.get_mut(j) {
                                e.role = buffer::Compose::Terminal;
                            }
                        }
                    }
                    self.suspended = true;
                    return self.make_rewrite(prev_visible);
                }
                // aa → â, ee → ê, oo → ô, when the cluster stays valid
                if k != keys::D && keys::is_vowel(k) && st.vowels.contains(&i) {
                    if let Some(e) = self.buf.get_mut(i) {
                        e.processed.set_tone(true);
                    }
                    let merged_ok = {
                        let st = WordState::parse(&self.buf);
                        vowel::is_cluster_or_prefix(&st.composed_vowel_run(&self.buf))
                    };
                    if merged_ok {
                        let ks = Keystroke::new(key, caps);
                        self.buf.add_modifier(i, ks);
                        self.buf.record_keystroke(ks);
                        self.relocate_tone();
                        return self.make_rewrite(prev_visible);
                    }
                    if let Some(e) = self.buf.get_mut(i) {
                        e.processed.set_tone(false);
                    }
                }
            }
        }

        // No merge: the key is an ordinary letter (or a VNI digit)
        if keys::is_vowel(k) && key == k {
            self.apply_vowel(k, key, caps, prev_visible)
        } else if keys::is_letter(key) {
            self.apply_consonant(key, key, caps, prev_visible)
        } else {
            self.apply_passthrough(key, caps)
        }
    }

    fn apply_standalone(&mut self, k: u16, caps: bool, prev_visible: usize) -> HookState {
        let vowel_key = match k {
            keys::LBRACKET => keys::O,
            keys::RBRACKET => keys::U,
            _ => return self.apply_passthrough(k, caps),
        };
        let i = self.buf.append(k, caps);
        if let Some(e) = self.buf.get_mut(i) {
            e.processed = PackedChar::new(vowel_key, caps);
            e.processed.set_tonew(true);
            e.processed.set_standalone(true);
        }
        self.make_rewrite(prev_visible)
    }

    /// Verbatim entry: kept in the buffer for undo and macros, ignored by
    /// the syllable. Terminal after a vowel run (the cluster is over),
    /// Inline elsewhere.
    fn apply_passthrough(&mut self, key: u16, caps: bool) -> HookState {
        if keys::to_ascii(key, caps).is_none() {
            return HookState::nothing();
        }
        let after_vowel = !self.word_state().vowels.is_empty();
        let i = self.buf.append(key, caps);
        if let Some(e) = self.buf.get_mut(i) {
            e.role = if after_vowel {
                buffer::Compose::Terminal
            } else {
                buffer::Compose::Inline
            };
        }
        HookState::ignore()
    }

    /// Literal letter entry appended after a modifier revert
    fn append_literal(&mut self, key: u16, caps: bool) {
        let i = self.buf.append(key, caps);
        if let Some(e) = self.buf.get_mut(i) {
            e.role = buffer::Compose::Inline;
        }
    }

    // ============================================================
    // Shared helpers
    // ============================================================

    fn word_state(&self) -> WordState {
        WordState::parse(&self.buf)
    }

    /// Move an existing mark to where the (possibly longer) cluster now
    /// wants it. Returns true when something moved.
    fn relocate_tone(&mut self) -> bool {
        let st = self.word_state();
        let Some(old_pos) = st.tone_pos else {
            return false;
        };
        if st.vowels.is_empty() {
            return false;
        }
        let vowels = st.vowel_info(&self.buf);
        let idx = vowel::find_tone_position(
            &vowels,
            !st.final_c.is_empty(),
            self.settings.modern_style,
            st.has_qu_initial(&self.buf),
            st.has_gi_initial(&self.buf),
            st.terminated,
        );
        let target = st.vowels[idx.min(st.vowels.len() - 1)];
        if target == old_pos {
            return false;
        }
        let m = st.tone;
        if let Some(e) = self.buf.get_mut(old_pos) {
            e.processed.set_mark(mark::NONE);
        }
        if let Some(e) = self.buf.get_mut(target) {
            e.processed.set_mark(m);
        }
        true
    }

    /// ư followed by a plain o becomes ươ (the user typed the horn early)
    fn correct_uo(&mut self) {
        let st = self.word_state();
        if st.vowels.len() < 2 {
            return;
        }
        for w in st.vowels.windows(2) {
            let (a, b) = (w[0], w[1]);
            let first = self.buf.get(a).map(|e| e.processed);
            let second = self.buf.get(b).map(|e| e.processed);
            if let (Some(f), Some(s)) = (first, second) {
                if f.key() == keys::U
                    && f.has_tonew()
                    && s.key() == keys::O
                    && !s.has_tone()
                    && !s.has_tonew()
                {
                    if let Some(e) = self.buf.get_mut(b) {
                        e.processed.set_tonew(true);
                    }
                }
            }
        }
    }

    fn restore_enabled(&self) -> bool {
        self.settings.restore_if_wrong_spelling
            && self.settings.spell_check_enabled
            && !self.settings.temp_off_spelling
    }

    fn io_marked(&self, st: &WordState) -> bool {
        let run = st.composed_vowel_run(&self.buf);
        run.contains("iô") || run.contains("iơ")
    }

    /// Raw keystrokes for restore: typing order when the whole word is in
    /// the window, per-entry order once overflow is involved
    fn restore_keystrokes(&self) -> Vec<Keystroke> {
        if self.buf.overflow_len() == 0 {
            self.buf.keystrokes().to_vec()
        } else {
            self.buf
                .iter()
                .flat_map(|e| e.all_keystrokes())
                .collect()
        }
    }

    fn word_raw_string(&self) -> String {
        self.buf.raw_keystrokes_as_string()
    }

    /// After a mutation, decide whether the word has turned out to be
    /// English. May replace the pending result with a RESTORE.
    fn spell_gate(&mut self, pending: HookState, prev_visible: usize) -> HookState {
        if !self.restore_enabled() || self.suspended {
            return pending;
        }
        let st = self.word_state();
        let has_pass = self.buf.iter().any(|e| !e.is_active());
        let invalid = !st.is_valid_vietnamese(&self.buf, self.settings.allow_consonant_zfwj);
        if !invalid && !has_pass {
            return pending;
        }
        let raw = self.buf.raw_from_entries_only();
        if restore::skip_restore(&raw) {
            return pending;
        }
        if !restore::looks_english_while_typing(&raw, self.io_marked(&st)) {
            return pending;
        }

        log::debug!("restore: '{}' judged English", raw);

        let transformed = self.buf.iter().any(|e| e.processed.is_transformed());
        if !transformed {
            // Verbatim so far: suspend composition quietly, nothing visible
            // to unwind. A word that merely diverged through modifier
            // reverts keeps composing until the word-break check.
            if self.buf.visible_string() == raw {
                self.suspended = true;
            }
            return pending;
        }

        // Rewrite the word back to its raw keystrokes and rebuild the
        // buffer as verbatim entries
        self.suspended = true;
        let ks_list = self.restore_keystrokes();
        let packed: Vec<PackedChar> = ks_list
            .iter()
            .map(|k| PackedChar::new(k.key, k.caps))
            .collect();
        self.buf.clear();
        for ks in &ks_list {
            let i = self.buf.append(ks.key, ks.caps);
            if let Some(e) = self.buf.get_mut(i) {
                e.role = buffer::Compose::Inline;
            }
        }
        HookState::send(Op::Restore, prev_visible, &packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telex_engine() -> Engine {
        Engine::new()
    }

    fn press(e: &mut Engine, key: u16, caps: bool) -> HookState {
        e.handle_key(key, caps)
    }

    #[test]
    fn test_telex_basic_mark() {
        let mut e = telex_engine();
        let r = press(&mut e, keys::A, false);
        assert_eq!(r.op, Op::DoNothing as u8);
        let r = press(&mut e, keys::S, false);
        assert_eq!(r.op, Op::WillProcess as u8);
        assert_eq!(r.output_chars(), vec!['á']);
        assert_eq!(r.backspace_count, 1);
    }

    #[test]
    fn test_vni_basic_mark() {
        let mut e = telex_engine();
        e.settings_mut().input_method = crate::settings::InputMethod::Vni;

        press(&mut e, keys::A, false);
        let r = press(&mut e, keys::N1, false);
        assert_eq!(r.op, Op::WillProcess as u8);
        assert_eq!(r.output_chars(), vec!['á']);
    }

    #[test]
    fn test_dd_composes_d_stroke() {
        let mut e = telex_engine();
        press(&mut e, keys::D, false);
        let r = press(&mut e, keys::D, false);
        assert_eq!(r.op, Op::WillProcess as u8);
        assert_eq!(r.output_chars(), vec!['đ']);
        assert_eq!(r.backspace_count, 1);
    }

    #[test]
    fn test_word_break_emits_break_char() {
        let mut e = telex_engine();
        let r = press(&mut e, keys::SPACE, false);
        assert_eq!(r.op, Op::WillProcess as u8);
        assert_eq!(r.backspace_count, 0);
        assert_eq!(r.output_chars(), vec![' ']);
    }

    #[test]
    fn test_break_pushes_history_and_backspace_restores() {
        let mut e = telex_engine();
        press(&mut e, keys::B, false);
        press(&mut e, keys::A, false);
        press(&mut e, keys::SPACE, false);
        assert_eq!(e.buffer_string(), "");

        // backspace after space resumes the word
        press(&mut e, keys::DELETE, false);
        assert_eq!(e.buffer_string(), "ba");
    }

    #[test]
    fn test_english_mode_ignores() {
        let mut e = telex_engine();
        e.set_language(smartswitch::LANG_ENGLISH);
        let r = press(&mut e, keys::A, false);
        assert_eq!(r.op, Op::Ignore as u8);
        let r = press(&mut e, keys::S, false);
        assert_eq!(r.op, Op::Ignore as u8);
    }

    #[test]
    fn test_smart_switch_flip() {
        let mut e = telex_engine();
        // first visit records, no flip
        assert_eq!(e.handle_app_switch("com.example.a"), None);
        e.set_language(smartswitch::LANG_ENGLISH);
        // first visit of b records English
        assert_eq!(e.handle_app_switch("com.example.b"), None);
        // back to a: stored Vietnamese differs from current English
        assert_eq!(
            e.handle_app_switch("com.example.a"),
            Some(smartswitch::LANG_VIETNAMESE)
        );
    }

    #[test]
    fn test_reset_drops_word() {
        let mut e = telex_engine();
        press(&mut e, keys::B, false);
        press(&mut e, keys::A, false);
        e.reset();
        assert_eq!(e.buffer_string(), "");
    }

    #[test]
    fn test_unknown_key_does_nothing() {
        let mut e = telex_engine();
        let r = press(&mut e, 200, false);
        assert_eq!(r.op, Op::DoNothing as u8);
        assert_eq!(e.buffer_string(), "");
    }
}
