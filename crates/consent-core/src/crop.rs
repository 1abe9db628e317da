//! Rectangle-selection cropping of the uploaded signature image
//!
//! The interaction is modeled as an explicit state machine with pure
//! transitions; the browser layer only forwards pointer events and the
//! display-surface size. Rasterization happens at source resolution, so a
//! selection drawn over a scaled-down preview still crops the original
//! pixels.

use serde::{Deserialize, Serialize};

use crate::error::ConsentError;
use crate::fields::{ImageKind, SignatureImage};

/// Selections narrower or shorter than this (in display pixels) cannot be
/// applied; the confirm action stays disabled instead of erroring.
pub const MIN_SELECTION_PX: f64 = 5.0;

/// Display size of the crop surface in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

/// User-drawn rectangle in display coordinates, clamped to the surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropSelection {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropSelection {
    fn between(ax: f64, ay: f64, bx: f64, by: f64) -> Self {
        Self {
            x: ax.min(bx),
            y: ay.min(by),
            width: (bx - ax).abs(),
            height: (by - ay).abs(),
        }
    }
}

/// One cropping interaction over one signature image
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropState {
    /// No crop surface shown
    Idle,
    /// Surface visible; `anchor` is set while a drag is active
    Selecting {
        anchor: Option<(f64, f64)>,
        selection: Option<CropSelection>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropEvent {
    Begin,
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    Cancel,
}

fn clamp_to_surface(x: f64, y: f64, surface: SurfaceSize) -> (f64, f64) {
    (x.clamp(0.0, surface.width), y.clamp(0.0, surface.height))
}

/// Pure transition function: `(state, event) -> state`.
///
/// `Begin` is only meaningful from `Idle` (the caller gates it on a source
/// image existing); pointer events outside `Selecting` are ignored.
pub fn transition(state: CropState, event: CropEvent, surface: SurfaceSize) -> CropState {
    match (state, event) {
        (CropState::Idle, CropEvent::Begin) => CropState::Selecting {
            anchor: None,
            selection: None,
        },
        (CropState::Selecting { .. }, CropEvent::PointerDown { x, y }) => {
            let (x, y) = clamp_to_surface(x, y, surface);
            CropState::Selecting {
                anchor: Some((x, y)),
                selection: Some(CropSelection {
                    x,
                    y,
                    width: 0.0,
                    height: 0.0,
                }),
            }
        }
        (
            CropState::Selecting {
                anchor: Some((ax, ay)),
                ..
            },
            CropEvent::PointerMove { x, y },
        ) => {
            let (x, y) = clamp_to_surface(x, y, surface);
            CropState::Selecting {
                anchor: Some((ax, ay)),
                selection: Some(CropSelection::between(ax, ay, x, y)),
            }
        }
        // drag ends, selection stays visible for confirm or adjustment
        (CropState::Selecting { selection, .. }, CropEvent::PointerUp) => CropState::Selecting {
            anchor: None,
            selection,
        },
        (CropState::Selecting { .. }, CropEvent::Cancel) => CropState::Idle,
        (state, _) => state,
    }
}

/// Whether the current selection is large enough to apply
pub fn can_apply(state: &CropState) -> bool {
    match state {
        CropState::Selecting {
            selection: Some(sel),
            ..
        } => sel.width > MIN_SELECTION_PX && sel.height > MIN_SELECTION_PX,
        _ => false,
    }
}

/// Rasterize the selected sub-region of `source` at source resolution.
///
/// The selection is translated from display to source coordinates with an
/// independent ratio per axis, so a non-uniformly scaled preview still maps
/// correctly. The result is re-encoded as lossless PNG regardless of the
/// input format. The caller replaces its stored image only on `Ok`, which
/// gives the atomic swap the form relies on.
pub fn apply_crop(
    source: &SignatureImage,
    selection: &CropSelection,
    surface: SurfaceSize,
) -> Result<SignatureImage, ConsentError> {
    if selection.width <= MIN_SELECTION_PX || selection.height <= MIN_SELECTION_PX {
        return Err(ConsentError::InvalidImage(
            "selection below minimum size".to_string(),
        ));
    }
    if surface.width <= 0.0 || surface.height <= 0.0 {
        return Err(ConsentError::InvalidImage(
            "crop surface has no size".to_string(),
        ));
    }

    let decoded = image::load_from_memory(&source.bytes)
        .map_err(|e| ConsentError::InvalidImage(e.to_string()))?;

    let ratio_x = source.width as f64 / surface.width;
    let ratio_y = source.height as f64 / surface.height;

    let src_x = (selection.x * ratio_x).round().max(0.0) as u32;
    let src_y = (selection.y * ratio_y).round().max(0.0) as u32;
    let src_x = src_x.min(source.width.saturating_sub(1));
    let src_y = src_y.min(source.height.saturating_sub(1));
    let src_w = ((selection.width * ratio_x).round() as u32)
        .clamp(1, source.width - src_x);
    let src_h = ((selection.height * ratio_y).round() as u32)
        .clamp(1, source.height - src_y);

    let cropped = decoded.crop_imm(src_x, src_y, src_w, src_h);

    let mut bytes = Vec::new();
    cropped
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .map_err(|e| ConsentError::InvalidImage(e.to_string()))?;

    Ok(SignatureImage {
        bytes,
        kind: ImageKind::Png,
        width: src_w,
        height: src_h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURFACE: SurfaceSize = SurfaceSize {
        width: 500.0,
        height: 400.0,
    };

    fn png_signature(width: u32, height: u32) -> SignatureImage {
        let mut bytes = Vec::new();
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 0])
        });
        image::DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        SignatureImage {
            bytes,
            kind: ImageKind::Png,
            width,
            height,
        }
    }

    fn selecting(sel: CropSelection) -> CropState {
        CropState::Selecting {
            anchor: None,
            selection: Some(sel),
        }
    }

    #[test]
    fn begin_enters_selecting_with_no_selection() {
        let state = transition(CropState::Idle, CropEvent::Begin, SURFACE);
        assert_eq!(
            state,
            CropState::Selecting {
                anchor: None,
                selection: None
            }
        );
        assert!(!can_apply(&state));
    }

    #[test]
    fn drag_builds_axis_aligned_box_between_anchor_and_pointer() {
        let mut state = transition(CropState::Idle, CropEvent::Begin, SURFACE);
        state = transition(state, CropEvent::PointerDown { x: 100.0, y: 80.0 }, SURFACE);
        state = transition(state, CropEvent::PointerMove { x: 40.0, y: 120.0 }, SURFACE);

        match state {
            CropState::Selecting {
                anchor: Some(_),
                selection: Some(sel),
            } => {
                assert_eq!(sel.x, 40.0);
                assert_eq!(sel.y, 80.0);
                assert_eq!(sel.width, 60.0);
                assert_eq!(sel.height, 40.0);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn pointer_is_clamped_to_the_surface() {
        let mut state = transition(CropState::Idle, CropEvent::Begin, SURFACE);
        state = transition(state, CropEvent::PointerDown { x: 490.0, y: 390.0 }, SURFACE);
        state = transition(
            state,
            CropEvent::PointerMove {
                x: 1000.0,
                y: -50.0,
            },
            SURFACE,
        );

        match state {
            CropState::Selecting {
                selection: Some(sel),
                ..
            } => {
                assert_eq!(sel.x + sel.width, 500.0);
                assert_eq!(sel.y, 0.0);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn pointer_up_keeps_selection_visible() {
        let mut state = transition(CropState::Idle, CropEvent::Begin, SURFACE);
        state = transition(state, CropEvent::PointerDown { x: 10.0, y: 10.0 }, SURFACE);
        state = transition(state, CropEvent::PointerMove { x: 60.0, y: 50.0 }, SURFACE);
        state = transition(state, CropEvent::PointerUp, SURFACE);

        assert!(can_apply(&state));
        // further moves without a new press do not change the selection
        let after = transition(state, CropEvent::PointerMove { x: 0.0, y: 0.0 }, SURFACE);
        assert_eq!(after, state);
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut state = transition(CropState::Idle, CropEvent::Begin, SURFACE);
        state = transition(state, CropEvent::PointerDown { x: 10.0, y: 10.0 }, SURFACE);
        state = transition(state, CropEvent::Cancel, SURFACE);
        assert_eq!(state, CropState::Idle);
    }

    #[test]
    fn tiny_selection_cannot_be_applied() {
        let sel = CropSelection {
            x: 10.0,
            y: 10.0,
            width: 4.0,
            height: 40.0,
        };
        assert!(!can_apply(&selecting(sel)));

        let source = png_signature(1000, 800);
        assert!(apply_crop(&source, &sel, SURFACE).is_err());
    }

    #[test]
    fn crop_maps_display_to_source_resolution() {
        // 500x400 display of a 1000x800 source: 2x on both axes
        let source = png_signature(1000, 800);
        let sel = CropSelection {
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 40.0,
        };

        let cropped = apply_crop(&source, &sel, SURFACE).unwrap();
        assert_eq!((cropped.width, cropped.height), (100, 80));
        assert_eq!(cropped.kind, ImageKind::Png);
        assert_eq!(
            crate::fields::measure(&cropped.bytes).unwrap(),
            (100, 80)
        );
    }

    #[test]
    fn crop_supports_non_uniform_scaling() {
        // 500x400 display of a 1000x400 source: 2x horizontal, 1x vertical
        let source = png_signature(1000, 400);
        let sel = CropSelection {
            x: 20.0,
            y: 20.0,
            width: 100.0,
            height: 100.0,
        };

        let cropped = apply_crop(&source, &sel, SURFACE).unwrap();
        assert_eq!((cropped.width, cropped.height), (200, 100));
    }

    #[test]
    fn crop_preserves_source_pixels() {
        let source = png_signature(1000, 800);
        let sel = CropSelection {
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 40.0,
        };

        let cropped = apply_crop(&source, &sel, SURFACE).unwrap();
        let img = image::load_from_memory(&cropped.bytes).unwrap().to_rgb8();
        // top-left of the crop corresponds to source pixel (20, 20)
        assert_eq!(img.get_pixel(0, 0).0, [20, 20, 0]);
    }
}
