//! The validated field set for one consent document

use serde::{Deserialize, Serialize};

use crate::error::ConsentError;

/// Which parent is giving consent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    Father,
    Mother,
}

impl RelationKind {
    pub fn label(&self) -> &'static str {
        match self {
            RelationKind::Father => "father",
            RelationKind::Mother => "mother",
        }
    }
}

impl Default for RelationKind {
    fn default() -> Self {
        RelationKind::Father
    }
}

/// The two raster formats accepted for signature upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// Accepts exactly `image/png` and `image/jpeg`; everything else is
    /// rejected before any bytes are read.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(ImageKind::Png),
            "image/jpeg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }
}

/// An uploaded (or cropped) signature image.
///
/// Present as a whole or not at all: the record holds
/// `Option<SignatureImage>`, never a partially populated quadruple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureImage {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

impl SignatureImage {
    /// Decode `bytes` to establish pixel dimensions.
    ///
    /// Fails with `InvalidImage` when the bytes cannot be decoded as the
    /// claimed format.
    pub fn measure(bytes: Vec<u8>, kind: ImageKind) -> Result<Self, ConsentError> {
        let (width, height) = measure(&bytes)?;
        Ok(Self {
            bytes,
            kind,
            width,
            height,
        })
    }
}

/// Determine pixel dimensions of an encoded image
pub fn measure(bytes: &[u8]) -> Result<(u32, u32), ConsentError> {
    let reader = image::io::Reader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ConsentError::InvalidImage(e.to_string()))?;
    reader
        .into_dimensions()
        .map_err(|e| ConsentError::InvalidImage(e.to_string()))
}

/// All form values for one consent document.
///
/// Dates are stored as ISO `YYYY-MM-DD` strings; display formatting is a
/// separate concern (`dates::format_display_date`). The renderers receive
/// this record by value and never mutate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    #[serde(default)]
    pub school_unit: String,
    #[serde(default)]
    pub relation: RelationKind,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub leave_from: String,
    #[serde(default)]
    pub leave_to: String,
    #[serde(default)]
    pub signature_text: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub place: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub signature_image: Option<SignatureImage>,
}

impl FieldRecord {
    /// Copy of the record with every scalar trimmed and inner whitespace
    /// collapsed to single spaces.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        for value in [
            &mut out.school_unit,
            &mut out.student_name,
            &mut out.student_id,
            &mut out.leave_from,
            &mut out.leave_to,
            &mut out.signature_text,
            &mut out.full_name,
            &mut out.place,
            &mut out.date,
            &mut out.mobile,
        ] {
            *value = normalize_text(value);
        }
        out
    }

    /// Whether the record may be persisted: the student identifier is the
    /// storage key and must survive normalization.
    pub fn can_persist(&self) -> bool {
        !normalize_text(&self.student_id).is_empty()
    }

    /// Deterministic download-name stem from the student identifier, or a
    /// fixed fallback when the identifier is absent.
    pub fn export_file_stem(&self) -> String {
        let stem = sanitize_file_stem(&self.student_id);
        if stem.is_empty() {
            FALLBACK_FILE_STEM.to_string()
        } else {
            stem
        }
    }
}

pub const FALLBACK_FILE_STEM: &str = "leave-consent";

/// Trim and collapse runs of whitespace to single spaces
pub fn normalize_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep ASCII alphanumerics, `-` and `_`; map everything else (including
/// spaces and path separators) to `_`.
fn sanitize_file_stem(value: &str) -> String {
    let stem: String = value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    stem.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mime_gate_accepts_exactly_two_kinds() {
        assert_eq!(ImageKind::from_mime("image/png"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_mime("image/jpeg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_mime("image/gif"), None);
        assert_eq!(ImageKind::from_mime("image/webp"), None);
        assert_eq!(ImageKind::from_mime(""), None);
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  Jane \t Doe \n"), "Jane Doe");
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn normalized_record_touches_every_scalar() {
        let record = FieldRecord {
            student_name: "  A  B ".into(),
            mobile: " 555  123 ".into(),
            ..Default::default()
        };
        let normalized = record.normalized();
        assert_eq!(normalized.student_name, "A B");
        assert_eq!(normalized.mobile, "555 123");
    }

    #[test]
    fn persistence_requires_student_id() {
        let mut record = FieldRecord::default();
        assert!(!record.can_persist());
        record.student_id = "   ".into();
        assert!(!record.can_persist());
        record.student_id = "S-1042".into();
        assert!(record.can_persist());
    }

    #[test]
    fn file_stem_is_sanitized() {
        let mut record = FieldRecord {
            student_id: "S 10/42".into(),
            ..Default::default()
        };
        assert_eq!(record.export_file_stem(), "S_10_42");

        record.student_id = String::new();
        assert_eq!(record.export_file_stem(), FALLBACK_FILE_STEM);

        record.student_id = "///".into();
        assert_eq!(record.export_file_stem(), FALLBACK_FILE_STEM);
    }

    #[test]
    fn measure_rejects_garbage() {
        assert!(measure(b"not an image").is_err());
    }

    #[test]
    fn measure_reads_png_dimensions() {
        // 3x2 opaque PNG, encoded in-process
        let mut bytes = Vec::new();
        let img = image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        image::DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();

        assert_eq!(measure(&bytes).unwrap(), (3, 2));

        let sig = SignatureImage::measure(bytes, ImageKind::Png).unwrap();
        assert_eq!((sig.width, sig.height), (3, 2));
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = FieldRecord {
            student_id: "S-1".into(),
            relation: RelationKind::Mother,
            signature_image: None,
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: FieldRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
