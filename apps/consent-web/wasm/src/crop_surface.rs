//! Stateful signature slot with the interactive crop surface
//!
//! Holds the one signature image being edited plus the crop state machine
//! from `consent-core`. JavaScript forwards pointer coordinates relative
//! to the displayed image; all geometry and rasterization happen here.

use consent_core::{
    apply_crop, can_apply, transition, CropEvent, CropState, SignatureImage, SurfaceSize,
};
use wasm_bindgen::prelude::*;
use web_sys::File;

use crate::upload::file_to_signature;

/// The signature image slot and its (at most one) cropping interaction
#[wasm_bindgen]
pub struct SignatureSlot {
    image: Option<SignatureImage>,
    crop: CropState,
    surface: SurfaceSize,
}

impl Default for SignatureSlot {
    fn default() -> Self {
        Self {
            image: None,
            crop: CropState::Idle,
            surface: SurfaceSize {
                width: 0.0,
                height: 0.0,
            },
        }
    }
}

impl SignatureSlot {
    /// The stored image, for the export path
    pub fn image(&self) -> Option<&SignatureImage> {
        self.image.as_ref()
    }

    pub(crate) fn set_image(&mut self, image: SignatureImage) {
        self.image = Some(image);
        self.crop = CropState::Idle;
    }

    fn begin_crop_internal(
        &mut self,
        display_width: f64,
        display_height: f64,
    ) -> Result<(), String> {
        if self.image.is_none() {
            return Err("no signature image to crop".to_string());
        }
        if display_width <= 0.0 || display_height <= 0.0 {
            return Err("crop surface has no size".to_string());
        }
        self.surface = SurfaceSize {
            width: display_width,
            height: display_height,
        };
        self.crop = transition(CropState::Idle, CropEvent::Begin, self.surface);
        Ok(())
    }

    /// Rasterize the selection and swap the stored image. A
    /// below-threshold selection is a no-op returning `false`, and the
    /// selection stays visible for adjustment.
    fn apply_crop_internal(&mut self) -> Result<bool, String> {
        if !can_apply(&self.crop) {
            return Ok(false);
        }
        let (image, selection) = match (&self.image, self.crop) {
            (
                Some(image),
                CropState::Selecting {
                    selection: Some(selection),
                    ..
                },
            ) => (image, selection),
            _ => return Ok(false),
        };

        let cropped =
            apply_crop(image, &selection, self.surface).map_err(|e| e.to_string())?;

        // old image is discarded only now that the new one exists
        self.image = Some(cropped);
        self.crop = CropState::Idle;
        Ok(true)
    }
}

#[wasm_bindgen]
impl SignatureSlot {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest an upload. Fails without touching the stored image when the
    /// file kind is unsupported or the bytes do not decode; the caller
    /// should clear the file input on error so the same filename can be
    /// re-selected.
    #[wasm_bindgen(js_name = loadFile)]
    pub async fn load_file(&mut self, file: File) -> Result<(), JsValue> {
        let image = file_to_signature(&file)
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.image = Some(image);
        self.crop = CropState::Idle;
        Ok(())
    }

    #[wasm_bindgen(js_name = hasImage)]
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Natural pixel dimensions as `[width, height]`, empty when no image
    #[wasm_bindgen(js_name = imageDimensions)]
    pub fn image_dimensions(&self) -> Vec<u32> {
        match &self.image {
            Some(image) => vec![image.width, image.height],
            None => vec![],
        }
    }

    /// Encoded bytes for previewing in an `<img>` element
    #[wasm_bindgen(js_name = imageBytes)]
    pub fn image_bytes(&self) -> Option<Vec<u8>> {
        self.image.as_ref().map(|image| image.bytes.clone())
    }

    #[wasm_bindgen(js_name = imageMime)]
    pub fn image_mime(&self) -> Option<String> {
        self.image.as_ref().map(|image| image.kind.mime().to_string())
    }

    /// Discard the stored image and any selection in progress
    pub fn clear(&mut self) {
        self.image = None;
        self.crop = CropState::Idle;
    }

    /// Show the crop surface. Only valid while an image is loaded;
    /// `display_width`/`display_height` are the on-screen size of the
    /// preview, which may differ from the natural size on each axis.
    #[wasm_bindgen(js_name = beginCrop)]
    pub fn begin_crop(&mut self, display_width: f64, display_height: f64) -> Result<(), JsValue> {
        self.begin_crop_internal(display_width, display_height)
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.crop = transition(self.crop, CropEvent::PointerDown { x, y }, self.surface);
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.crop = transition(self.crop, CropEvent::PointerMove { x, y }, self.surface);
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self) {
        self.crop = transition(self.crop, CropEvent::PointerUp, self.surface);
    }

    /// Current selection rectangle for drawing the marquee, or `undefined`
    #[wasm_bindgen(js_name = selectionRect)]
    pub fn selection_rect(&self) -> Result<JsValue, JsValue> {
        let selection = match self.crop {
            CropState::Selecting { selection, .. } => selection,
            CropState::Idle => None,
        };
        serde_wasm_bindgen::to_value(&selection)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Whether the selection exceeds the minimum size; drives the enabled
    /// state of the confirm button
    #[wasm_bindgen(js_name = canApplyCrop)]
    pub fn can_apply_crop(&self) -> bool {
        can_apply(&self.crop)
    }

    /// Apply the crop; `false` means the selection was below the minimum
    /// size and nothing changed
    #[wasm_bindgen(js_name = applyCrop)]
    pub fn apply_crop(&mut self) -> Result<bool, JsValue> {
        self.apply_crop_internal().map_err(|e| JsValue::from_str(&e))
    }

    /// Drop the selection and hide the surface without touching the image
    #[wasm_bindgen(js_name = cancelCrop)]
    pub fn cancel_crop(&mut self) {
        self.crop = transition(self.crop, CropEvent::Cancel, self.surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_core::ImageKind;

    fn slot_with_image(width: u32, height: u32) -> SignatureSlot {
        let mut bytes = Vec::new();
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([0, 0, 0]));
        image::DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        SignatureSlot {
            image: Some(SignatureImage {
                bytes,
                kind: ImageKind::Png,
                width,
                height,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn begin_crop_requires_an_image() {
        let mut slot = SignatureSlot::default();
        assert!(slot.begin_crop_internal(500.0, 400.0).is_err());
    }

    #[test]
    fn full_crop_interaction_replaces_the_image() {
        let mut slot = slot_with_image(1000, 800);
        slot.begin_crop_internal(500.0, 400.0).unwrap();
        slot.pointer_down(10.0, 10.0);
        slot.pointer_move(60.0, 50.0);
        slot.pointer_up();

        assert!(slot.can_apply_crop());
        assert!(slot.apply_crop_internal().unwrap());
        assert_eq!(slot.image_dimensions(), vec![100, 80]);
        assert_eq!(slot.image_mime(), Some("image/png".to_string()));
    }

    #[test]
    fn tiny_selection_is_a_no_op_and_keeps_selection() {
        let mut slot = slot_with_image(1000, 800);
        slot.begin_crop_internal(500.0, 400.0).unwrap();
        slot.pointer_down(10.0, 10.0);
        slot.pointer_move(13.0, 50.0);
        slot.pointer_up();

        assert!(!slot.can_apply_crop());
        assert!(!slot.apply_crop_internal().unwrap());
        assert_eq!(slot.image_dimensions(), vec![1000, 800]);
        assert!(matches!(
            slot.crop,
            CropState::Selecting {
                selection: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn cancel_keeps_the_stored_image() {
        let mut slot = slot_with_image(1000, 800);
        slot.begin_crop_internal(500.0, 400.0).unwrap();
        slot.pointer_down(10.0, 10.0);
        slot.pointer_move(60.0, 50.0);
        slot.cancel_crop();

        assert_eq!(slot.image_dimensions(), vec![1000, 800]);
        assert!(matches!(slot.crop, CropState::Idle));
    }
}
