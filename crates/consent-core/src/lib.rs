//! Core logic for the leave-consent form builder
//!
//! Everything here is plain Rust with no browser dependency: the field
//! model, date arithmetic, fit geometry, the crop state machine, and the
//! two document renderers (template-overlay PDF and from-scratch DOCX).
//! The `consent-web` WASM crate wires these into DOM events, storage, and
//! downloads.

pub mod crop;
pub mod dates;
pub mod error;
pub mod fields;
pub mod flow;
pub mod geometry;
pub mod overlay;

pub use crop::{
    apply_crop, can_apply, transition, CropEvent, CropSelection, CropState, SurfaceSize,
    MIN_SELECTION_PX,
};
pub use dates::{duration_changed, format_display_date, from_changed, to_changed};
pub use error::ConsentError;
pub use fields::{
    measure, normalize_text, FieldRecord, ImageKind, RelationKind, SignatureImage,
    FALLBACK_FILE_STEM,
};
pub use flow::render_flow;
pub use geometry::fit_within;
pub use overlay::render_overlay;
