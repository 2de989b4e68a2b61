//! Macro Table - text shortcut expansion
//!
//! Maps an ASCII trigger ("btw") to an expansion ("by the way"). Lookup runs
//! against the raw-keystroke projection of the word being committed, so
//! triggers survive Vietnamese transformation of their letters (the w of
//! "btw" composing ư does not hide the macro).
//!
//! The on-disk format stays compatible with UniKey/OpenKey macro files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

/// Fixed first line of a macro file
pub const MACRO_FILE_HEADER: &str = ";Compatible OpenKey Macro Data file for UniKey*** version=1 ***";

/// Store persistence failure; in-memory state is unchanged when one of
/// these surfaces
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a macro data file (bad header)")]
    BadHeader,
}

/// Macro table keyed by trigger text.
///
/// A BTreeMap keeps save files stable across runs.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: BTreeMap<String, String>,
}

/// Case shape of a typed trigger
enum CaseShape {
    Lower,
    AllCaps,
    Capitalized,
}

fn case_shape(typed: &str) -> CaseShape {
    let mut chars = typed.chars().filter(|c| c.is_alphabetic());
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            if chars.all(|c| c.is_uppercase()) {
                CaseShape::AllCaps
            } else {
                CaseShape::Capitalized
            }
        }
        _ => CaseShape::Lower,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, trigger: &str, expansion: &str) {
        self.macros
            .insert(trigger.to_string(), expansion.to_string());
    }

    pub fn remove(&mut self, trigger: &str) -> Option<String> {
        self.macros.remove(trigger)
    }

    pub fn clear(&mut self) {
        self.macros.clear();
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.macros.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Look up a typed word.
    ///
    /// Exact trigger match wins. With `auto_caps`, a case-insensitive match
    /// follows the case of the typed word: all-caps trigger → all-caps
    /// expansion, leading capital → capitalized expansion.
    pub fn lookup(&self, typed: &str, auto_caps: bool) -> Option<String> {
        if let Some(exp) = self.macros.get(typed) {
            return Some(exp.clone());
        }
        if !auto_caps {
            return None;
        }
        let lower = typed.to_lowercase();
        let exp = self
            .macros
            .iter()
            .find(|(k, _)| k.to_lowercase() == lower)
            .map(|(_, v)| v)?;
        let out = match case_shape(typed) {
            CaseShape::Lower => exp.clone(),
            CaseShape::AllCaps => exp.to_uppercase(),
            CaseShape::Capitalized => capitalize(exp),
        };
        Some(out)
    }

    /// Load macros from a UniKey-compatible file.
    ///
    /// With `append` false the table is replaced. Parses into a scratch map
    /// first so a failure leaves the table untouched.
    pub fn load(&mut self, path: &Path, append: bool) -> Result<usize, StoreError> {
        let text = fs::read_to_string(path)?;
        let mut lines = text.lines();
        match lines.next() {
            Some(header) if header.trim_end() == MACRO_FILE_HEADER => {}
            _ => return Err(StoreError::BadHeader),
        }

        let mut scratch = BTreeMap::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            if let Some((trigger, expansion)) = split_macro_line(line) {
                scratch.insert(trigger.to_string(), expansion.to_string());
            }
        }

        let count = scratch.len();
        if append {
            self.macros.extend(scratch);
        } else {
            self.macros = scratch;
        }
        log::debug!("loaded {} macros from {}", count, path.display());
        Ok(count)
    }

    /// Save macros in the UniKey-compatible format
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let mut out = String::with_capacity(64 + self.macros.len() * 24);
        out.push_str(MACRO_FILE_HEADER);
        out.push('\n');
        for (trigger, expansion) in &self.macros {
            out.push_str(trigger);
            out.push(':');
            out.push_str(expansion);
            out.push('\n');
        }
        fs::write(path, out)?;
        Ok(())
    }
}

/// Split `text:content` on the first colon that leaves a non-empty text
/// segment, so triggers like ":)" keep their leading colon.
fn split_macro_line(line: &str) -> Option<(&str, &str)> {
    for (i, b) in line.bytes().enumerate() {
        if b == b':' && i > 0 {
            return Some((&line[..i], &line[i + 1..]));
        }
    }
    None
}
