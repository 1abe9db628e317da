//! Template-anchored PDF renderer
//!
//! Paints the field values of a [`FieldRecord`] onto fixed rectangles of a
//! pre-existing single-page A4 template. The template's own artwork carries
//! the form wording and the printed underline guides; each filled slot
//! masks its region with an opaque white rectangle first so overlaid text
//! never doubles up with the printed guides.
//!
//! Slot coordinates are authored top-left-origin in template space and
//! converted to the PDF's bottom-left origin against the page MediaBox.

pub mod metrics;

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::dates::format_display_date;
use crate::error::ConsentError;
use crate::fields::{normalize_text, FieldRecord, ImageKind, SignatureImage};
use crate::geometry::fit_within;

const FONT_RES_NAME: &str = "Fcf";
const IMAGE_RES_NAME: &str = "SigCf";

const BODY_SIZE: f64 = 11.0;
const UNDERLINE_DROP: f64 = 2.5;
const MASK_PAD: f64 = 3.0;

/// One fixed text slot, top-left-origin in template space
#[derive(Debug, Clone, Copy)]
struct LineSlot {
    x: f64,
    y_from_top: f64,
    max_width: f64,
    font_size: f64,
    mask: bool,
    underline: bool,
}

/// Signature area: the image is fit into this box and centered; the
/// fallback text line anchors at the box's baseline.
const SIG_BOX_X: f64 = 360.0;
const SIG_BOX_Y_FROM_TOP: f64 = 620.0;
const SIG_BOX_W: f64 = 170.0;
const SIG_BOX_H: f64 = 64.0;

const SIG_TEXT_SLOT: LineSlot = LineSlot {
    x: SIG_BOX_X,
    y_from_top: SIG_BOX_Y_FROM_TOP + SIG_BOX_H - 14.0,
    max_width: SIG_BOX_W,
    font_size: BODY_SIZE,
    mask: true,
    underline: true,
};

fn slot(x: f64, y_from_top: f64, max_width: f64) -> LineSlot {
    LineSlot {
        x,
        y_from_top,
        max_width,
        font_size: BODY_SIZE,
        mask: true,
        underline: true,
    }
}

/// Display value and target slot for every scalar field
fn field_slots(record: &FieldRecord) -> Vec<(String, LineSlot)> {
    vec![
        (normalize_text(&record.school_unit), slot(170.0, 148.0, 250.0)),
        (record.relation.label().to_string(), slot(130.0, 212.0, 70.0)),
        (normalize_text(&record.student_name), slot(255.0, 212.0, 180.0)),
        (normalize_text(&record.student_id), slot(170.0, 238.0, 150.0)),
        (
            format_display_date(&normalize_text(&record.leave_from)),
            slot(120.0, 264.0, 95.0),
        ),
        (
            format_display_date(&normalize_text(&record.leave_to)),
            slot(290.0, 264.0, 95.0),
        ),
        (normalize_text(&record.full_name), slot(360.0, 700.0, 170.0)),
        (normalize_text(&record.mobile), slot(360.0, 726.0, 170.0)),
        (normalize_text(&record.place), slot(80.0, 700.0, 150.0)),
        (
            format_display_date(&normalize_text(&record.date)),
            slot(80.0, 726.0, 150.0),
        ),
    ]
}

/// Signature image prepared for embedding: the XObject's sample data and
/// filter plus its placement on the page.
struct PreparedSignature {
    data: Vec<u8>,
    filter: &'static str,
    px_width: u32,
    px_height: u32,
    draw_x: f64,
    draw_y: f64,
    draw_w: f64,
    draw_h: f64,
}

/// Prepare the signature for embedding and fit/center it into the
/// signature box.
///
/// JPEG uploads are passed through untouched as DCTDecode; PNG uploads
/// are decoded, any alpha flattened onto white, and the RGB triples
/// zlib-compressed for FlateDecode.
fn prepare_signature(
    sig: &SignatureImage,
    page_height: f64,
) -> Result<PreparedSignature, ConsentError> {
    let (data, filter, px_width, px_height) = match sig.kind {
        ImageKind::Jpeg => (sig.bytes.clone(), "DCTDecode", sig.width, sig.height),
        ImageKind::Png => {
            let decoded = image::load_from_memory(&sig.bytes)
                .map_err(|e| ConsentError::InvalidImage(e.to_string()))?;
            let rgba = decoded.to_rgba8();
            let (px_width, px_height) = rgba.dimensions();

            let mut rgb = Vec::with_capacity((px_width * px_height * 3) as usize);
            for pixel in rgba.pixels() {
                let [r, g, b, a] = pixel.0;
                // flatten onto white so transparent uploads match the paper form
                let alpha = a as u16;
                rgb.push(((r as u16 * alpha + 255 * (255 - alpha)) / 255) as u8);
                rgb.push(((g as u16 * alpha + 255 * (255 - alpha)) / 255) as u8);
                rgb.push(((b as u16 * alpha + 255 * (255 - alpha)) / 255) as u8);
            }

            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            let zlib = encoder
                .write_all(&rgb)
                .and_then(|_| encoder.finish())
                .map_err(|e| ConsentError::InvalidImage(e.to_string()))?;
            (zlib, "FlateDecode", px_width, px_height)
        }
    };

    let (draw_w, draw_h) = fit_within(
        px_width,
        px_height,
        SIG_BOX_W.floor() as u32,
        SIG_BOX_H.floor() as u32,
    );
    let (draw_w, draw_h) = (draw_w as f64, draw_h as f64);
    Ok(PreparedSignature {
        data,
        filter,
        px_width,
        px_height,
        draw_x: SIG_BOX_X + (SIG_BOX_W - draw_w) / 2.0,
        draw_y: page_height - SIG_BOX_Y_FROM_TOP - SIG_BOX_H + (SIG_BOX_H - draw_h) / 2.0,
        draw_w,
        draw_h,
    })
}

/// Encode text for a WinAnsi-encoded base font. ASCII passes through, the
/// ellipsis maps to its WinAnsi code point, anything else degrades to '?'.
fn winansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '…' => 0x85,
            _ => b'?',
        })
        .collect()
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// Mask, underline, and draw one field value at its slot.
///
/// An empty normalized value draws neither mask nor text: the slot keeps
/// the template's printed guide and stays blank.
fn draw_text_on_line(ops: &mut Vec<Operation>, value: &str, slot: LineSlot, page_height: f64) {
    let text = metrics::truncate_to_width(value, slot.max_width, slot.font_size);
    if text.is_empty() {
        return;
    }

    let baseline = page_height - slot.y_from_top;

    if slot.mask {
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("rg", vec![real(1.0), real(1.0), real(1.0)]));
        ops.push(Operation::new(
            "re",
            vec![
                real(slot.x - 1.0),
                real(baseline - UNDERLINE_DROP - MASK_PAD),
                real(slot.max_width + 2.0),
                real(slot.font_size + UNDERLINE_DROP + 2.0 * MASK_PAD),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    if slot.underline {
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("w", vec![real(0.7)]));
        ops.push(Operation::new(
            "m",
            vec![real(slot.x), real(baseline - UNDERLINE_DROP)],
        ));
        ops.push(Operation::new(
            "l",
            vec![
                real(slot.x + slot.max_width),
                real(baseline - UNDERLINE_DROP),
            ],
        ));
        ops.push(Operation::new("S", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![
            Object::Name(FONT_RES_NAME.as_bytes().to_vec()),
            real(slot.font_size),
        ],
    ));
    ops.push(Operation::new("Td", vec![real(slot.x), real(baseline)]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(
            winansi_bytes(&text),
            lopdf::StringFormat::Literal,
        )],
    ));
    ops.push(Operation::new("ET", vec![]));
}

/// The full overlay content stream for one record
fn build_operations(
    record: &FieldRecord,
    page_height: f64,
    signature: Option<&PreparedSignature>,
) -> Vec<Operation> {
    let mut ops = vec![Operation::new("q", vec![])];
    // the template's streams may leave color state behind
    ops.push(Operation::new("rg", vec![real(0.0), real(0.0), real(0.0)]));
    ops.push(Operation::new("RG", vec![real(0.0), real(0.0), real(0.0)]));

    for (value, slot) in field_slots(record) {
        draw_text_on_line(&mut ops, &value, slot, page_height);
    }

    match signature {
        Some(sig) => {
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new(
                "cm",
                vec![
                    real(sig.draw_w),
                    real(0.0),
                    real(0.0),
                    real(sig.draw_h),
                    real(sig.draw_x),
                    real(sig.draw_y),
                ],
            ));
            ops.push(Operation::new(
                "Do",
                vec![Object::Name(IMAGE_RES_NAME.as_bytes().to_vec())],
            ));
            ops.push(Operation::new("Q", vec![]));
        }
        None => {
            let fallback = normalize_text(&record.signature_text);
            draw_text_on_line(&mut ops, &fallback, SIG_TEXT_SLOT, page_height);
        }
    }

    ops.push(Operation::new("Q", vec![]));
    ops
}

fn first_page(doc: &Document) -> Result<ObjectId, ConsentError> {
    doc.get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| ConsentError::TemplateLoad("template has no pages".to_string()))
}

fn page_height(doc: &Document, page_id: ObjectId) -> Result<f64, ConsentError> {
    let media_box = doc
        .get_object(page_id)
        .and_then(|obj| obj.as_dict())
        .and_then(|dict| dict.get(b"MediaBox"))
        .and_then(|obj| obj.as_array())
        .map_err(|e| ConsentError::TemplateLoad(format!("missing MediaBox: {}", e)))?;

    let value = |i: usize| -> f64 {
        media_box
            .get(i)
            .map(|obj| match obj {
                Object::Integer(v) => *v as f64,
                Object::Real(v) => *v as f64,
                _ => 0.0,
            })
            .unwrap_or(0.0)
    };
    Ok(value(3) - value(1))
}

/// Insert the overlay font (and the signature XObject when present) into
/// the page's resource dictionary, creating sub-dictionaries as needed.
fn register_resources(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    image_id: Option<ObjectId>,
) -> Result<(), ConsentError> {
    let err = |e: lopdf::Error| ConsentError::TemplateLoad(e.to_string());

    // Resources may live inline on the page or behind a reference
    let resource_ref = doc
        .get_object(page_id)
        .and_then(|obj| obj.as_dict())
        .ok()
        .and_then(|dict| dict.get(b"Resources").ok().cloned());

    let resources = match resource_ref {
        Some(Object::Reference(id)) => doc
            .get_object_mut(id)
            .and_then(|obj| obj.as_dict_mut())
            .map_err(err)?,
        _ => {
            let page = doc
                .get_object_mut(page_id)
                .and_then(|obj| obj.as_dict_mut())
                .map_err(err)?;
            if !matches!(page.get(b"Resources"), Ok(Object::Dictionary(_))) {
                page.set("Resources", Dictionary::new());
            }
            page.get_mut(b"Resources")
                .and_then(|obj| obj.as_dict_mut())
                .map_err(err)?
        }
    };

    let set_in_subdict = |resources: &mut Dictionary, key: &[u8], name: &str, id: ObjectId| {
        if !matches!(resources.get(key), Ok(Object::Dictionary(_))) {
            resources.set(key, Dictionary::new());
        }
        if let Ok(sub) = resources.get_mut(key).and_then(|obj| obj.as_dict_mut()) {
            sub.set(name.as_bytes().to_vec(), Object::Reference(id));
        }
    };

    set_in_subdict(resources, b"Font", FONT_RES_NAME, font_id);
    if let Some(image_id) = image_id {
        set_in_subdict(resources, b"XObject", IMAGE_RES_NAME, image_id);
    }
    Ok(())
}

/// Append the overlay stream to the page's contents without disturbing the
/// template's own streams.
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    stream_id: ObjectId,
) -> Result<(), ConsentError> {
    let err = |e: lopdf::Error| ConsentError::TemplateLoad(e.to_string());

    let page = doc
        .get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())
        .map_err(err)?;

    let new_ref = Object::Reference(stream_id);
    let contents = match page.get(b"Contents").cloned() {
        Ok(Object::Array(mut array)) => {
            array.push(new_ref);
            Object::Array(array)
        }
        Ok(existing @ Object::Reference(_)) => Object::Array(vec![existing, new_ref]),
        _ => Object::Array(vec![new_ref]),
    };
    page.set("Contents", contents);
    Ok(())
}

/// Produce the finished consent PDF by overlaying `record` onto the fixed
/// template. Pure in its inputs: identical template bytes and record yield
/// byte-identical output.
pub fn render_overlay(template: &[u8], record: &FieldRecord) -> Result<Vec<u8>, ConsentError> {
    let mut doc = Document::load_mem(template)
        .map_err(|e| ConsentError::TemplateLoad(e.to_string()))?;

    let page_id = first_page(&doc)?;
    let height = page_height(&doc, page_id)?;

    let prepared = record
        .signature_image
        .as_ref()
        .map(|sig| prepare_signature(sig, height))
        .transpose()?;

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let image_id = prepared.as_ref().map(|sig| {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => sig.px_width as i64,
                "Height" => sig.px_height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => sig.filter,
            },
            sig.data.clone(),
        ))
    });

    let operations = build_operations(record, height, prepared.as_ref());
    let content = Content { operations };
    let encoded = content
        .encode()
        .map_err(|e| ConsentError::Packaging(e.to_string()))?;
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    register_resources(&mut doc, page_id, font_id, image_id)?;
    append_content(&mut doc, page_id, stream_id)?;

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| ConsentError::Packaging(e.to_string()))?;
    Ok(out)
}
