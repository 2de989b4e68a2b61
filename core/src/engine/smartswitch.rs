//! Smart-Switch Memory - per-application language preference
//!
//! Remembers which language (0 = English, 1 = Vietnamese) the user last
//! typed in each application. On foreground change the host asks for the
//! stored value; unknown apps record the current language and report
//! nothing, so the first visit never flips the keyboard.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

pub const LANG_ENGLISH: u8 = 0;
pub const LANG_VIETNAMESE: u8 = 1;

#[derive(Error, Debug)]
pub enum SwitchStoreError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("truncated binary data")]
    Truncated,
}

/// App-identifier → language map
#[derive(Debug, Default)]
pub struct SmartSwitch {
    map: BTreeMap<String, u8>,
}

impl SmartSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Language stored for `app_id`, if any. Unknown apps record `current`
    /// and return None; the host keeps its language unchanged.
    pub fn get_app_language(&mut self, app_id: &str, current: u8) -> Option<u8> {
        match self.map.get(app_id) {
            Some(&lang) => Some(lang),
            None => {
                self.map.insert(app_id.to_string(), current);
                None
            }
        }
    }

    /// Record the language the user settled on in `app_id`
    pub fn set_app_language(&mut self, app_id: &str, lang: u8) {
        self.map.insert(app_id.to_string(), lang);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    // ============================================================
    // JSON form
    // ============================================================

    pub fn save_json(&self, path: &Path) -> Result<(), SwitchStoreError> {
        let json = serde_json::to_string(&self.map)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json(&mut self, path: &Path) -> Result<usize, SwitchStoreError> {
        let text = fs::read_to_string(path)?;
        let map: BTreeMap<String, u8> = serde_json::from_str(&text)?;
        let count = map.len();
        self.map = map;
        log::debug!("loaded {} app languages from {}", count, path.display());
        Ok(count)
    }

    // ============================================================
    // Compact binary form
    // [count: u16 LE] ([len: u8][id bytes][lang: u8])*
    // ============================================================

    pub fn to_binary(&self) -> Vec<u8> {
        let entries: Vec<_> = self
            .map
            .iter()
            .filter(|(id, _)| id.len() <= u8::MAX as usize)
            .collect();
        let mut out = Vec::with_capacity(2 + entries.len() * 16);
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (id, &lang) in entries {
            out.push(id.len() as u8);
            out.extend_from_slice(id.as_bytes());
            out.push(lang);
        }
        out
    }

    pub fn from_binary(data: &[u8]) -> Result<Self, SwitchStoreError> {
        if data.len() < 2 {
            return Err(SwitchStoreError::Truncated);
        }
        let count = u16::from_le_bytes([data[0], data[1]]) as usize;
        let mut map = BTreeMap::new();
        let mut pos = 2;
        for _ in 0..count {
            let len = *data.get(pos).ok_or(SwitchStoreError::Truncated)? as usize;
            pos += 1;
            let id_bytes = data
                .get(pos..pos + len)
                .ok_or(SwitchStoreError::Truncated)?;
            pos += len;
            let lang = *data.get(pos).ok_or(SwitchStoreError::Truncated)?;
            pos += 1;
            let id = String::from_utf8_lossy(id_bytes).into_owned();
            map.insert(id, lang);
        }
        Ok(Self { map })
    }

    pub fn save_binary(&self, path: &Path) -> Result<(), SwitchStoreError> {
        fs::write(path, self.to_binary())?;
        Ok(())
    }

    pub fn load_binary(&mut self, path: &Path) -> Result<usize, SwitchStoreError> {
        let data = fs::read(path)?;
        let loaded = Self::from_binary(&data)?;
        let count = loaded.len();
        self.map = loaded.map;
        Ok(count)
    }
}
