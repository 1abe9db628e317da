//! WASM bindings for the leave-consent form builder
//!
//! State lives in Rust; JavaScript only forwards DOM events and file I/O.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { SignatureSlot, ProfileStore, ExportSession } from './pkg/consent_wasm.js';
//!
//! await init();
//!
//! const slot = new SignatureSlot();
//! await slot.loadFile(input.files[0]);       // rejects anything but png/jpeg
//!
//! slot.beginCrop(img.clientWidth, img.clientHeight);
//! // forward pointerdown/pointermove/pointerup, then:
//! if (slot.canApplyCrop()) slot.applyCrop();
//!
//! const session = new ExportSession('/assets/consent-template.pdf');
//! await session.loadTemplate();
//! const { url, filename } = session.exportPdf(recordJson, slot);
//! // trigger the anchor click, then:
//! session.downloadStarted(url);
//! ```

pub mod crop_surface;
pub mod export;
pub mod storage;
pub mod upload;

use wasm_bindgen::prelude::*;

pub use crop_surface::SignatureSlot;
pub use export::ExportSession;
pub use storage::ProfileStore;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Render an ISO date for display (`2024-03-05` -> `05/03/2024`)
#[wasm_bindgen(js_name = formatDisplayDate)]
pub fn format_display_date(iso: &str) -> String {
    consent_core::format_display_date(iso)
}

/// Leave start changed: new end date for the current duration, or
/// `undefined` when the input does not parse
#[wasm_bindgen(js_name = leaveFromChanged)]
pub fn leave_from_changed(new_from: &str, duration_days: i32) -> Option<String> {
    consent_core::from_changed(new_from, duration_days as i64)
}

/// Duration changed: new end date for the current start
#[wasm_bindgen(js_name = leaveDurationChanged)]
pub fn leave_duration_changed(from: &str, new_duration_days: i32) -> Option<String> {
    consent_core::duration_changed(from, new_duration_days as i64)
}

/// Leave end edited directly: recomputed inclusive duration
#[wasm_bindgen(js_name = leaveToChanged)]
pub fn leave_to_changed(from: &str, new_to: &str) -> Option<i32> {
    consent_core::to_changed(from, new_to).map(|days| days as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        assert!(!get_version().is_empty());
    }

    #[test]
    fn date_helpers_delegate_to_core() {
        assert_eq!(format_display_date("2024-03-05"), "05/03/2024");
        assert_eq!(
            leave_from_changed("2024-03-05", 3),
            Some("2024-03-07".to_string())
        );
        assert_eq!(leave_to_changed("2024-03-05", "2024-03-07"), Some(3));
        assert_eq!(leave_to_changed("2024-03-05", "nope"), None);
    }
}
