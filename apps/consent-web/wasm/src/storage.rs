//! Profile persistence over `localStorage`
//!
//! One profile per browser, stored under a fixed versioned key. The value
//! is the scalar fields of a [`FieldRecord`] as JSON; signature images are
//! never persisted.

use consent_core::FieldRecord;
use wasm_bindgen::prelude::*;

const PROFILE_KEY: &str = "consent_form_profile_v1";

/// Saved-profile store backed by `window.localStorage`
#[wasm_bindgen]
pub struct ProfileStore;

/// Check that a profile payload parses and is worth keeping. Returns the
/// normalized JSON to store.
fn validate_profile(record_json: &str) -> Result<String, String> {
    let record: FieldRecord =
        serde_json::from_str(record_json).map_err(|e| format!("Invalid profile data: {}", e))?;
    let record = record.normalized();
    if !record.can_persist() {
        return Err("Profile needs a student id before it can be saved".to_string());
    }
    serde_json::to_string(&record).map_err(|e| e.to_string())
}

fn local_storage() -> Result<web_sys::Storage, JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    window.local_storage()?.ok_or_else(|| "No localStorage".into())
}

#[wasm_bindgen]
impl ProfileStore {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self
    }

    /// The saved profile as JSON, or `undefined` when none exists
    pub fn load(&self) -> Result<Option<String>, JsValue> {
        local_storage()?.get_item(PROFILE_KEY)
    }

    /// Validate and save a profile. Rejects payloads without a student id
    /// so an accidental save cannot wipe a useful profile with blanks.
    pub fn save(&self, record_json: &str) -> Result<(), JsValue> {
        let normalized = validate_profile(record_json).map_err(|e| JsValue::from_str(&e))?;
        local_storage()?.set_item(PROFILE_KEY, &normalized)
    }

    /// Remove the saved profile
    pub fn clear(&self) -> Result<(), JsValue> {
        local_storage()?.remove_item(PROFILE_KEY)
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}
