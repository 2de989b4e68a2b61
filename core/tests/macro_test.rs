//! Macro expansion through the engine, and store persistence

mod common;

use common::engine;
use goviet_core::engine::Engine;
use goviet_core::settings::InputMethod;
use goviet_core::utils::type_word;
use tempfile::tempdir;

fn telex_with_macros() -> Engine {
    let mut e = engine(InputMethod::Telex);
    e.macros_mut().add("btw", "by the way");
    e.macros_mut().add("vn", "Việt Nam");
    e
}

#[test]
fn macro_expands_on_space() {
    let mut e = telex_with_macros();
    assert_eq!(type_word(&mut e, "btw "), "by the way ");
}

#[test]
fn macro_expands_on_punctuation() {
    let mut e = telex_with_macros();
    assert_eq!(type_word(&mut e, "vn."), "Việt Nam.");
}

#[test]
fn macro_matches_raw_keystrokes() {
    // the w of btw composes ư on screen; the trigger still matches the
    // raw projection
    let mut e = telex_with_macros();
    assert_eq!(e_buffer_after(&mut e, "btw"), "btư");

    let mut e = telex_with_macros();
    assert_eq!(type_word(&mut e, "btw "), "by the way ");
}

fn e_buffer_after(e: &mut Engine, input: &str) -> String {
    let _ = type_word(e, input);
    e.buffer_string()
}

#[test]
fn auto_caps_follow_trigger_case() {
    let mut e = telex_with_macros();
    assert_eq!(type_word(&mut e, "BTW "), "BY THE WAY ");

    let mut e = telex_with_macros();
    assert_eq!(type_word(&mut e, "Btw "), "By the way ");
}

#[test]
fn auto_caps_disabled_requires_exact_match() {
    let mut e = telex_with_macros();
    e.settings_mut().auto_caps_macro = false;
    // BTW is not a stored trigger: commits as a normal word
    assert_eq!(type_word(&mut e, "BTW "), "BTƯ ");

    let mut e = telex_with_macros();
    e.settings_mut().auto_caps_macro = false;
    assert_eq!(type_word(&mut e, "btw "), "by the way ");
}

#[test]
fn macro_disabled_setting() {
    let mut e = telex_with_macros();
    e.settings_mut().macro_enabled = false;
    assert_eq!(type_word(&mut e, "btw "), "btư ");
}

#[test]
fn non_trigger_commits_normally() {
    let mut e = telex_with_macros();
    assert_eq!(type_word(&mut e, "ban "), "ban ");
}

#[test]
fn macro_in_english_mode() {
    let mut e = telex_with_macros();
    e.settings_mut().macro_in_english_mode = true;
    e.set_language(0);
    assert_eq!(type_word(&mut e, "btw "), "by the way ");

    // without the flag English mode leaves triggers alone
    let mut e = telex_with_macros();
    e.set_language(0);
    assert_eq!(type_word(&mut e, "btw "), "btw ");
}

#[test]
fn store_roundtrip_through_engine() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("macros.txt");

    let e = telex_with_macros();
    e.macros().save(&path).unwrap();

    let mut fresh = engine(InputMethod::Telex);
    assert_eq!(fresh.macros_mut().load(&path, false).unwrap(), 2);
    assert_eq!(type_word(&mut fresh, "btw "), "by the way ");
}
