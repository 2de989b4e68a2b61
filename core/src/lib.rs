//! Gõ Việt Vietnamese IME Core
//!
//! Keystroke-processing engine for a Vietnamese input method: Telex and VNI
//! conventions, tone placement, wrong-spelling restore, text macros and
//! per-application language memory. The host owns the OS keyboard hook and
//! applies each returned `HookState` (backspaces + replacement characters)
//! before delivering the next keystroke.
//!
//! # FFI Usage
//!
//! ```c
//! // Initialize once at app start
//! ime_init();
//! ime_method(0);  // 0=Telex, 1=VNI, 2/3=Simple Telex
//!
//! // Process each keystroke
//! HookState* r = ime_key(keycode, caps, ctrl);
//! if (r && r->op == 2) {
//!     // Send r->backspace_count deletes, then r->char_data
//! }
//! ime_free(r);
//!
//! // On focus/cursor change
//! ime_reset_all();
//! ```

pub mod data;
pub mod engine;
pub mod input;
pub mod settings;
pub mod utils;

use engine::{Engine, HookState};
use settings::{EngineSettings, InputMethod};
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Mutex;

// Global engine instance (thread-safe via Mutex)
static ENGINE: Mutex<Option<Engine>> = Mutex::new(None);

/// Lock the engine mutex, recovering from poisoned state if needed (for tests)
fn lock_engine() -> std::sync::MutexGuard<'static, Option<Engine>> {
    ENGINE.lock().unwrap_or_else(|e| e.into_inner())
}

unsafe fn cstr<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    std::ffi::CStr::from_ptr(ptr).to_str().ok()
}

// ============================================================
// FFI Interface
// ============================================================

/// Initialize the IME engine.
///
/// Must be called exactly once before any other `ime_*` functions.
/// Thread-safe: uses internal mutex.
#[no_mangle]
pub extern "C" fn ime_init() {
    let mut guard = lock_engine();
    *guard = Some(Engine::new());
}

/// Process a key event and return the result.
///
/// # Arguments
/// * `key` - macOS virtual keycode (0-127 for standard keys)
/// * `caps` - uppercase/shift state of the keystroke
/// * `ctrl` - true if Cmd/Ctrl/Alt is pressed (bypasses the IME)
///
/// # Returns
/// Pointer to `HookState` (caller must free with `ime_free`), or null if
/// the engine is not initialized.
#[no_mangle]
pub extern "C" fn ime_key(key: u16, caps: bool, ctrl: bool) -> *mut HookState {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        if ctrl {
            e.reset();
            return Box::into_raw(Box::new(HookState::ignore()));
        }
        let r = e.handle_key(key, caps);
        Box::into_raw(Box::new(r))
    } else {
        std::ptr::null_mut()
    }
}

/// Free a result pointer returned by `ime_key`.
///
/// # Safety
/// * `r` must be a pointer returned by `ime_key`, or null
/// * Must be called exactly once per non-null `ime_key` return
#[no_mangle]
pub unsafe extern "C" fn ime_free(r: *mut HookState) {
    if !r.is_null() {
        drop(Box::from_raw(r));
    }
}

/// Set the input method: 0=Telex, 1=VNI, 2=SimpleTelex1, 3=SimpleTelex2.
#[no_mangle]
pub extern "C" fn ime_method(method: u8) {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.settings_mut().input_method = InputMethod::from_id(method);
    }
}

/// Set the active language: 0=English, 1=Vietnamese.
#[no_mangle]
pub extern "C" fn ime_language(lang: u8) {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.set_language(lang);
    }
}

/// Set modern tone placement (hoạ) vs. traditional (họa).
#[no_mangle]
pub extern "C" fn ime_modern(modern: bool) {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.settings_mut().modern_style = modern;
    }
}

/// Enable restore-on-wrong-spelling.
#[no_mangle]
pub extern "C" fn ime_restore_wrong_spelling(enabled: bool) {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.settings_mut().restore_if_wrong_spelling = enabled;
    }
}

/// Enable the spell checker.
#[no_mangle]
pub extern "C" fn ime_spell_check(enabled: bool) {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.settings_mut().spell_check_enabled = enabled;
    }
}

/// Replace the whole settings block from a JSON string.
///
/// Missing fields keep their defaults. Returns false on parse failure.
///
/// # Safety
/// `json` must be a valid null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn ime_set_settings_json(json: *const c_char) -> bool {
    let Some(text) = cstr(json) else {
        return false;
    };
    match serde_json::from_str::<EngineSettings>(text) {
        Ok(s) => {
            let mut guard = lock_engine();
            if let Some(ref mut e) = *guard {
                e.set_settings(s);
                true
            } else {
                false
            }
        }
        Err(err) => {
            log::warn!("settings json rejected: {}", err);
            false
        }
    }
}

/// Clear the input buffer (word boundary). Word history survives for the
/// backspace-after-space feature.
#[no_mangle]
pub extern "C" fn ime_reset() {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.reset();
    }
}

/// Clear everything including word history. Call on cursor moves, mouse
/// clicks and focus changes.
#[no_mangle]
pub extern "C" fn ime_reset_all() {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.reset_all();
    }
}

/// Foreground app changed.
///
/// Returns the language to switch to (0/1), or -1 when no switch applies.
///
/// # Safety
/// `app_id` must be a valid null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn ime_app_switch(app_id: *const c_char) -> i32 {
    let Some(id) = cstr(app_id) else {
        return -1;
    };
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        match e.handle_app_switch(id) {
            Some(lang) => lang as i32,
            None => -1,
        }
    } else {
        -1
    }
}

/// Host-side input-source collision window toggle.
#[no_mangle]
pub extern "C" fn ime_ignore_source_events(on: bool) {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.set_ignore_source_events(on);
    }
}

/// Get the full composed buffer as UTF-32 codepoints.
///
/// # Safety
/// `out` must point to valid memory of at least `max_len * 4` bytes.
#[no_mangle]
pub unsafe extern "C" fn ime_get_buffer(out: *mut u32, max_len: i64) -> i64 {
    if out.is_null() || max_len <= 0 {
        return 0;
    }
    let guard = lock_engine();
    if let Some(ref e) = *guard {
        let utf32: Vec<u32> = e.buffer_string().chars().map(|c| c as u32).collect();
        let len = utf32.len().min(max_len as usize);
        std::ptr::copy_nonoverlapping(utf32.as_ptr(), out, len);
        len as i64
    } else {
        0
    }
}

/// Rebuild the buffer from a committed Vietnamese word (cursor moved back
/// into it).
///
/// # Safety
/// `word` must be a valid null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn ime_restore_word(word: *const c_char) {
    let Some(w) = cstr(word) else {
        return;
    };
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.restore_word(w);
    }
}

// ============================================================
// Macro FFI
// ============================================================

/// Add a macro to the engine.
///
/// # Safety
/// Both pointers must be valid null-terminated UTF-8 strings.
#[no_mangle]
pub unsafe extern "C" fn ime_add_macro(trigger: *const c_char, expansion: *const c_char) {
    let (Some(t), Some(x)) = (cstr(trigger), cstr(expansion)) else {
        return;
    };
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.macros_mut().add(t, x);
    }
}

/// Remove a macro by trigger.
///
/// # Safety
/// `trigger` must be a valid null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn ime_remove_macro(trigger: *const c_char) {
    let Some(t) = cstr(trigger) else {
        return;
    };
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.macros_mut().remove(t);
    }
}

/// Clear all macros.
#[no_mangle]
pub extern "C" fn ime_clear_macros() {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.macros_mut().clear();
    }
}

/// Load macros from a UniKey-compatible file. Returns the number of entries
/// loaded, or -1 on failure (in-memory macros unchanged).
///
/// # Safety
/// `path` must be a valid null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn ime_load_macros(path: *const c_char, append: bool) -> i32 {
    let Some(p) = cstr(path) else {
        return -1;
    };
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        match e.macros_mut().load(Path::new(p), append) {
            Ok(n) => n as i32,
            Err(err) => {
                log::warn!("macro load failed: {}", err);
                -1
            }
        }
    } else {
        -1
    }
}

/// Save macros to a UniKey-compatible file. Returns false on failure.
///
/// # Safety
/// `path` must be a valid null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn ime_save_macros(path: *const c_char) -> bool {
    let Some(p) = cstr(path) else {
        return false;
    };
    let guard = lock_engine();
    if let Some(ref e) = *guard {
        match e.macros().save(Path::new(p)) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("macro save failed: {}", err);
                false
            }
        }
    } else {
        false
    }
}

// ============================================================
// Smart-switch FFI
// ============================================================

/// Load the per-app language map from JSON. Returns entry count or -1.
///
/// # Safety
/// `path` must be a valid null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn ime_load_app_languages(path: *const c_char) -> i32 {
    let Some(p) = cstr(path) else {
        return -1;
    };
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        match e.smart_switch_mut().load_json(Path::new(p)) {
            Ok(n) => n as i32,
            Err(err) => {
                log::warn!("smart switch load failed: {}", err);
                -1
            }
        }
    } else {
        -1
    }
}

/// Save the per-app language map as JSON. Returns false on failure.
///
/// # Safety
/// `path` must be a valid null-terminated UTF-8 string or null.
#[no_mangle]
pub unsafe extern "C" fn ime_save_app_languages(path: *const c_char) -> bool {
    let Some(p) = cstr(path) else {
        return false;
    };
    let guard = lock_engine();
    if let Some(ref e) = *guard {
        match e.smart_switch().save_json(Path::new(p)) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("smart switch save failed: {}", err);
                false
            }
        }
    } else {
        false
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::keys;
    use crate::engine::Op;
    use serial_test::serial;
    use std::ffi::CString;

    #[test]
    #[serial]
    fn test_ffi_flow() {
        ime_init();
        ime_method(0); // Telex

        let r1 = ime_key(keys::A, false, false);
        assert!(!r1.is_null());
        unsafe { ime_free(r1) };

        let r2 = ime_key(keys::S, false, false);
        assert!(!r2.is_null());
        unsafe {
            assert_eq!((*r2).op, Op::WillProcess as u8);
            let chars = (*r2).output_chars();
            assert_eq!(chars, vec!['á']);
            ime_free(r2);
        }

        ime_reset();
    }

    #[test]
    #[serial]
    fn test_ffi_ctrl_bypasses() {
        ime_init();
        let r = ime_key(keys::A, false, true);
        unsafe {
            assert_eq!((*r).op, Op::Ignore as u8);
            ime_free(r);
        }
        ime_reset();
    }

    #[test]
    #[serial]
    fn test_macro_ffi_add_and_clear() {
        ime_init();
        ime_clear_macros();
        ime_method(0);

        let trigger = CString::new("vn").unwrap();
        let expansion = CString::new("Việt Nam").unwrap();
        unsafe {
            ime_add_macro(trigger.as_ptr(), expansion.as_ptr());
        }

        let guard = lock_engine();
        if let Some(ref e) = *guard {
            assert_eq!(e.macros().len(), 1);
        }
        drop(guard);

        ime_clear_macros();
        let guard = lock_engine();
        if let Some(ref e) = *guard {
            assert_eq!(e.macros().len(), 0);
        }
        drop(guard);

        ime_reset();
    }

    #[test]
    #[serial]
    fn test_macro_ffi_null_safety() {
        ime_init();
        unsafe {
            ime_add_macro(std::ptr::null(), std::ptr::null());
            ime_remove_macro(std::ptr::null());
            ime_restore_word(std::ptr::null());
            assert_eq!(ime_app_switch(std::ptr::null()), -1);
        }
        let r = ime_key(keys::A, false, false);
        assert!(!r.is_null());
        unsafe { ime_free(r) };
        ime_reset();
    }

    #[test]
    #[serial]
    fn test_settings_json_ffi() {
        ime_init();
        let json = CString::new(r#"{"input_method":"vni","modern_style":false}"#).unwrap();
        assert!(unsafe { ime_set_settings_json(json.as_ptr()) });

        let bad = CString::new("{nope").unwrap();
        assert!(!unsafe { ime_set_settings_json(bad.as_ptr()) });
        ime_reset();
        // restore defaults for other tests
        let defaults = CString::new("{}").unwrap();
        assert!(unsafe { ime_set_settings_json(defaults.as_ptr()) });
    }

    #[test]
    #[serial]
    fn test_restore_word_ffi() {
        ime_init();
        ime_method(0);

        let word = CString::new("việt").unwrap();
        unsafe {
            ime_restore_word(word.as_ptr());
        }

        // buffer now holds the word again
        let mut out = [0u32; 8];
        let n = unsafe { ime_get_buffer(out.as_mut_ptr(), 8) };
        assert_eq!(n, 4);
        let s: String = out[..4]
            .iter()
            .filter_map(|&u| char::from_u32(u))
            .collect();
        assert_eq!(s, "việt");

        ime_reset();
    }
}
