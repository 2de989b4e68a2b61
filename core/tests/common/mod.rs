//! Shared test harness
//!
//! Case runners build a fresh engine per case and compare the simulated
//! screen output against the expectation.

#![allow(dead_code)]

use goviet_core::engine::Engine;
use goviet_core::settings::InputMethod;
use goviet_core::utils::type_word;

pub fn engine(method: InputMethod) -> Engine {
    let mut e = Engine::new();
    e.settings_mut().input_method = method;
    e
}

fn run(make: impl Fn() -> Engine, label: &str, cases: &[(&str, &str)]) {
    for (input, expected) in cases {
        let mut e = make();
        let result = type_word(&mut e, input);
        assert_eq!(
            &result, expected,
            "[{}] '{}' produced '{}', expected '{}'",
            label, input, result, expected
        );
    }
}

/// Telex with default settings (modern tone placement)
pub fn telex(cases: &[(&str, &str)]) {
    run(|| engine(InputMethod::Telex), "Telex", cases);
}

/// Telex with traditional tone placement
pub fn telex_traditional(cases: &[(&str, &str)]) {
    run(
        || {
            let mut e = engine(InputMethod::Telex);
            e.settings_mut().modern_style = false;
            e
        },
        "Telex/traditional",
        cases,
    );
}

/// Telex with restore-on-wrong-spelling enabled
pub fn telex_restore(cases: &[(&str, &str)]) {
    run(
        || {
            let mut e = engine(InputMethod::Telex);
            e.settings_mut().restore_if_wrong_spelling = true;
            e
        },
        "Telex/restore",
        cases,
    );
}

/// VNI with default settings
pub fn vni(cases: &[(&str, &str)]) {
    run(|| engine(InputMethod::Vni), "VNI", cases);
}

/// VNI with traditional tone placement
pub fn vni_traditional(cases: &[(&str, &str)]) {
    run(
        || {
            let mut e = engine(InputMethod::Vni);
            e.settings_mut().modern_style = false;
            e
        },
        "VNI/traditional",
        cases,
    );
}

/// Simple Telex 1 (no standalone shortcuts)
pub fn simple_telex_1(cases: &[(&str, &str)]) {
    run(|| engine(InputMethod::SimpleTelex1), "SimpleTelex1", cases);
}
