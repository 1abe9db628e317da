//! Document export and download handoff
//!
//! The session fetches the PDF template once, renders either output format
//! from a snapshot of the current field values, and hands JavaScript an
//! object URL plus a filename for an anchor-click download. The previous
//! object URL of the same format is revoked before a new one is created,
//! so at most one URL per format is live.

use consent_core::{render_flow, render_overlay, ConsentError, FieldRecord};
use js_sys::Uint8Array;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, Response, Url};

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// What JavaScript needs to trigger a download
#[derive(Debug, Serialize)]
struct DownloadHandle {
    url: String,
    filename: String,
}

/// One form session's export state
#[wasm_bindgen]
pub struct ExportSession {
    template_url: String,
    template: Option<Vec<u8>>,
    loading: bool,
    last_pdf_url: Option<String>,
    last_docx_url: Option<String>,
}

/// Parse the field snapshot and attach the signature image from the slot.
///
/// The snapshot is pure scalar state from the form; the image lives in the
/// slot because it never round-trips through JSON.
fn snapshot_record(
    record_json: &str,
    slot: &crate::SignatureSlot,
) -> Result<FieldRecord, String> {
    let record: FieldRecord =
        serde_json::from_str(record_json).map_err(|e| format!("Invalid form data: {}", e))?;
    let mut record = record.normalized();
    record.signature_image = slot.image().cloned();
    Ok(record)
}

fn render_pdf(template: &[u8], record: &FieldRecord) -> Result<Vec<u8>, String> {
    render_overlay(template, record).map_err(|e| e.to_string())
}

fn render_docx(record: &FieldRecord) -> Result<Vec<u8>, String> {
    render_flow(record).map_err(|e| e.to_string())
}

fn object_url(bytes: &[u8], mime: &str) -> Result<String, JsValue> {
    let array = Uint8Array::from(bytes);
    let parts = js_sys::Array::of1(&array);
    let options = BlobPropertyBag::new();
    options.set_type(mime);
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    Url::create_object_url_with_blob(&blob)
}

fn revoke(url: &mut Option<String>) {
    if let Some(old) = url.take() {
        let _ = Url::revoke_object_url(&old);
    }
}

fn take_if_matching(slot: &mut Option<String>, url: &str) -> Option<String> {
    if slot.as_deref() == Some(url) {
        slot.take()
    } else {
        None
    }
}

#[wasm_bindgen]
impl ExportSession {
    #[wasm_bindgen(constructor)]
    pub fn new(template_url: String) -> Self {
        Self {
            template_url,
            template: None,
            loading: false,
            last_pdf_url: None,
            last_docx_url: None,
        }
    }

    /// Fetch the PDF template. A no-op once loaded; concurrent calls while
    /// a fetch is in flight are rejected rather than duplicated. There is
    /// no automatic retry, the caller decides when to try again.
    #[wasm_bindgen(js_name = loadTemplate)]
    pub async fn load_template(&mut self) -> Result<(), JsValue> {
        if self.template.is_some() {
            return Ok(());
        }
        if self.loading {
            return Err(JsValue::from_str("Template fetch already in progress"));
        }
        self.loading = true;
        let result = self.fetch_template().await;
        self.loading = false;
        match result {
            Ok(bytes) => {
                self.template = Some(bytes);
                Ok(())
            }
            Err(message) => Err(JsValue::from_str(
                &ConsentError::TemplateLoad(message).to_string(),
            )),
        }
    }

    #[wasm_bindgen(js_name = templateReady)]
    pub fn template_ready(&self) -> bool {
        self.template.is_some()
    }

    /// Render the template-overlay PDF and return `{ url, filename }`
    #[wasm_bindgen(js_name = exportPdf)]
    pub fn export_pdf(
        &mut self,
        record_json: &str,
        slot: &crate::SignatureSlot,
    ) -> Result<JsValue, JsValue> {
        let template = self
            .template
            .as_deref()
            .ok_or_else(|| JsValue::from_str("Template not loaded yet"))?;
        let record = snapshot_record(record_json, slot).map_err(|e| JsValue::from_str(&e))?;
        let bytes = render_pdf(template, &record).map_err(|e| JsValue::from_str(&e))?;

        revoke(&mut self.last_pdf_url);
        let url = object_url(&bytes, PDF_MIME)?;
        self.last_pdf_url = Some(url.clone());

        let handle = DownloadHandle {
            url,
            filename: format!("{}.pdf", record.export_file_stem()),
        };
        serde_wasm_bindgen::to_value(&handle)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Render the flowed DOCX and return `{ url, filename }`. Works
    /// without the template, which only the PDF path needs.
    #[wasm_bindgen(js_name = exportDocx)]
    pub fn export_docx(
        &mut self,
        record_json: &str,
        slot: &crate::SignatureSlot,
    ) -> Result<JsValue, JsValue> {
        let record = snapshot_record(record_json, slot).map_err(|e| JsValue::from_str(&e))?;
        let bytes = render_docx(&record).map_err(|e| JsValue::from_str(&e))?;

        revoke(&mut self.last_docx_url);
        let url = object_url(&bytes, DOCX_MIME)?;
        self.last_docx_url = Some(url.clone());

        let handle = DownloadHandle {
            url,
            filename: format!("{}.docx", record.export_file_stem()),
        };
        serde_wasm_bindgen::to_value(&handle)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Revoke the handed-out URL once the anchor click has fired; the
    /// browser keeps an initiated download alive without it. Unknown or
    /// already-revoked URLs are ignored.
    #[wasm_bindgen(js_name = downloadStarted)]
    pub fn download_started(&mut self, url: &str) {
        for slot in [&mut self.last_pdf_url, &mut self.last_docx_url] {
            if let Some(old) = take_if_matching(slot, url) {
                let _ = Url::revoke_object_url(&old);
            }
        }
    }

    /// Revoke any live object URLs; call when tearing the form down
    pub fn release(&mut self) {
        revoke(&mut self.last_pdf_url);
        revoke(&mut self.last_docx_url);
    }
}

impl ExportSession {
    async fn fetch_template(&self) -> Result<Vec<u8>, String> {
        let window = web_sys::window().ok_or("No window")?;
        let response = JsFuture::from(window.fetch_with_str(&self.template_url))
            .await
            .map_err(|_| format!("Could not fetch {}", self.template_url))?;
        let response: Response = response
            .dyn_into()
            .map_err(|_| "Unexpected fetch result".to_string())?;
        if !response.ok() {
            return Err(format!("HTTP {} for {}", response.status(), self.template_url));
        }
        let buffer = JsFuture::from(
            response
                .array_buffer()
                .map_err(|_| "Template body unavailable".to_string())?,
        )
        .await
        .map_err(|_| "Template body unavailable".to_string())?;
        Ok(Uint8Array::new(&buffer).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_core::{ImageKind, SignatureImage};
    use crate::SignatureSlot;

    #[test]
    fn snapshot_merges_the_slot_image() {
        let mut bytes = Vec::new();
        let img = image::RgbImage::from_pixel(40, 20, image::Rgb([0, 0, 0]));
        image::DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        let mut slot = SignatureSlot::default();
        slot.set_image(SignatureImage {
            bytes,
            kind: ImageKind::Png,
            width: 40,
            height: 20,
        });

        let record = snapshot_record(r#"{"student_id":" S-7 "}"#, &slot).unwrap();
        assert_eq!(record.student_id, "S-7");
        let image = record.signature_image.unwrap();
        assert_eq!((image.width, image.height), (40, 20));
    }

    #[test]
    fn snapshot_without_image_is_fine() {
        let slot = SignatureSlot::default();
        let record = snapshot_record(r#"{"full_name":"Kim Lee"}"#, &slot).unwrap();
        assert!(record.signature_image.is_none());
    }

    #[test]
    fn snapshot_rejects_garbage_json() {
        let slot = SignatureSlot::default();
        assert!(snapshot_record("{", &slot).is_err());
    }

    #[test]
    fn matching_url_is_taken_exactly_once() {
        let mut slot = Some("blob:abc".to_string());
        assert_eq!(take_if_matching(&mut slot, "blob:abc").as_deref(), Some("blob:abc"));
        assert_eq!(slot, None);
        assert_eq!(take_if_matching(&mut slot, "blob:abc"), None);
    }

    #[test]
    fn unrelated_url_leaves_the_live_one_alone() {
        let mut slot = Some("blob:abc".to_string());
        assert_eq!(take_if_matching(&mut slot, "blob:other"), None);
        assert_eq!(slot.as_deref(), Some("blob:abc"));
    }

    #[test]
    fn download_started_without_live_urls_is_a_no_op() {
        let mut session = ExportSession::new("/template.pdf".to_string());
        session.download_started("blob:stale");
        session.release();
    }

    #[test]
    fn docx_renders_from_a_snapshot() {
        let slot = SignatureSlot::default();
        let record = snapshot_record(r#"{"student_name":"Anna"}"#, &slot).unwrap();
        let bytes = render_docx(&record).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
