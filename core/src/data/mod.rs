//! Static data: keycodes, character tables, vowel phonology

pub mod chars;
pub mod keys;
pub mod vowel;
