//! Signature upload ingestion
//!
//! The MIME gate runs before any bytes are read: a file of the wrong kind
//! is rejected outright and the caller clears the file input so the same
//! filename can be selected again.

use consent_core::{ConsentError, ImageKind, SignatureImage};
use js_sys::Uint8Array;
use wasm_bindgen_futures::JsFuture;
use web_sys::File;

/// Accept exactly the two supported raster kinds
pub fn check_upload_kind(mime: &str) -> Result<ImageKind, ConsentError> {
    ImageKind::from_mime(mime).ok_or_else(|| ConsentError::UnsupportedFormat(mime.to_string()))
}

/// Read an accepted upload into an in-memory encoded image with known
/// pixel dimensions.
pub async fn file_to_signature(file: &File) -> Result<SignatureImage, ConsentError> {
    let kind = check_upload_kind(&file.type_())?;

    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|_| ConsentError::Read(file.name()))?;
    let bytes = Uint8Array::new(&buffer).to_vec();

    SignatureImage::measure(bytes, kind)
}
