//! Smart-switch memory: per-app language across engine and store

mod common;

use common::engine;
use goviet_core::engine::smartswitch::{SmartSwitch, LANG_ENGLISH, LANG_VIETNAMESE};
use goviet_core::settings::InputMethod;
use goviet_core::utils::type_word;
use tempfile::tempdir;

#[test]
fn typing_follows_switched_language() {
    let mut e = engine(InputMethod::Telex);

    // Vietnamese in the editor
    assert_eq!(e.handle_app_switch("com.editor"), None);
    assert_eq!(type_word(&mut e, "as"), "á");

    // user switches to English in the terminal
    assert_eq!(e.handle_app_switch("com.terminal"), None);
    e.set_language(LANG_ENGLISH);
    e.smart_switch_mut()
        .set_app_language("com.terminal", LANG_ENGLISH);
    assert_eq!(type_word(&mut e, "as"), "as");

    // back to the editor: engine flips back and composes again
    assert_eq!(e.handle_app_switch("com.editor"), Some(LANG_VIETNAMESE));
    assert_eq!(type_word(&mut e, "as"), "á");
}

#[test]
fn app_switch_resets_pending_word() {
    let mut e = engine(InputMethod::Telex);
    let _ = type_word(&mut e, "toas");
    assert_eq!(e.buffer_string(), "toá");
    let _ = e.handle_app_switch("com.other");
    assert_eq!(e.buffer_string(), "");
}

#[test]
fn json_persistence_through_engine() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("apps.json");

    let mut e = engine(InputMethod::Telex);
    e.smart_switch_mut()
        .set_app_language("com.terminal", LANG_ENGLISH);
    e.smart_switch_mut()
        .set_app_language("com.editor", LANG_VIETNAMESE);
    e.smart_switch().save_json(&path).unwrap();

    let mut fresh = engine(InputMethod::Telex);
    assert_eq!(fresh.smart_switch_mut().load_json(&path).unwrap(), 2);
    assert_eq!(fresh.handle_app_switch("com.terminal"), Some(LANG_ENGLISH));
}

#[test]
fn binary_format_layout() {
    let mut s = SmartSwitch::new();
    s.set_app_language("ab", LANG_VIETNAMESE);
    let bytes = s.to_binary();
    // [count=1 LE] [len=2] "ab" [lang=1]
    assert_eq!(bytes, vec![1, 0, 2, b'a', b'b', 1]);

    let back = SmartSwitch::from_binary(&bytes).unwrap();
    assert_eq!(back.to_binary(), bytes);
}

#[test]
fn binary_file_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("apps.bin");

    let mut s = SmartSwitch::new();
    s.set_app_language("com.terminal", LANG_ENGLISH);
    s.set_app_language("com.editor", LANG_VIETNAMESE);
    s.save_binary(&path).unwrap();

    let mut loaded = SmartSwitch::new();
    assert_eq!(loaded.load_binary(&path).unwrap(), 2);
    assert_eq!(
        loaded.get_app_language("com.editor", LANG_ENGLISH),
        Some(LANG_VIETNAMESE)
    );
}
