//! From-scratch DOCX renderer
//!
//! Unlike the overlay renderer this path needs no template asset: the
//! consent letter is composed as an ordered list of paragraphs with styled
//! runs. Field values render as underlined fill-in blanks, space-padded to
//! a minimum width so an empty field still reads as a blank line on paper.
//!
//! The paragraph/run model is built by [`layout`] as a pure function of the
//! record and only then handed to `docx-rs` for packaging, which keeps the
//! interesting logic testable without unzipping output.

use docx_rs::{
    AlignmentType, Docx, PageMargin, Paragraph, Pic, Run,
};

use crate::dates::format_display_date;
use crate::error::ConsentError;
use crate::fields::{normalize_text, FieldRecord};
use crate::geometry::fit_within;

/// Minimum character width of a fill-in blank
pub const MIN_BLANK_CHARS: usize = 24;

/// Maximum signature size in the letter, in pixels at 96 dpi
const SIG_MAX_W: u32 = 160;
const SIG_MAX_H: u32 = 60;

/// EMUs per pixel at 96 dpi
const EMU_PER_PX: u32 = 9525;

// A4 in twentieths of a point, 1-inch margins in twips
const PAGE_W: u32 = 11906;
const PAGE_H: u32 = 16838;
const MARGIN: i32 = 1440;

const BODY_HALF_POINTS: usize = 24; // 12pt

#[derive(Debug, Clone, PartialEq)]
pub enum FlowRun {
    /// Fixed letter wording
    Text { text: String, bold: bool },
    /// Underlined fill-in blank holding a (possibly empty) field value
    Blank { text: String },
    /// Inline signature image, already fit to the signature box
    Image {
        bytes: Vec<u8>,
        width_px: u32,
        height_px: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowAlign {
    Left,
    Center,
    Justify,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowParagraph {
    pub align: FlowAlign,
    pub runs: Vec<FlowRun>,
}

fn text(value: &str) -> FlowRun {
    FlowRun::Text {
        text: value.to_string(),
        bold: false,
    }
}

fn bold(value: &str) -> FlowRun {
    FlowRun::Text {
        text: value.to_string(),
        bold: true,
    }
}

/// Space-pad `value` on both sides to at least [`MIN_BLANK_CHARS`] so the
/// underline reads as a writing line even when the value is short or empty.
fn blank(value: &str) -> FlowRun {
    let value = normalize_text(value);
    let missing = MIN_BLANK_CHARS.saturating_sub(value.chars().count());
    let left = missing / 2 + missing % 2;
    let right = missing / 2;
    FlowRun::Blank {
        text: format!(
            "{}{}{}",
            " ".repeat(left.max(1)),
            value,
            " ".repeat(right.max(1))
        ),
    }
}

fn paragraph(align: FlowAlign, runs: Vec<FlowRun>) -> FlowParagraph {
    FlowParagraph { align, runs }
}

/// The signature run: the fitted image when one is present, the underlined
/// fallback text otherwise.
fn signature_run(record: &FieldRecord) -> FlowRun {
    match &record.signature_image {
        Some(sig) => {
            let (width_px, height_px) = fit_within(sig.width, sig.height, SIG_MAX_W, SIG_MAX_H);
            FlowRun::Image {
                bytes: sig.bytes.clone(),
                width_px,
                height_px,
            }
        }
        None => blank(&record.signature_text),
    }
}

/// Build the complete letter as a pure function of the record
pub fn layout(record: &FieldRecord) -> Vec<FlowParagraph> {
    vec![
        paragraph(
            FlowAlign::Center,
            vec![bold("APPLICATION FOR LEAVE OF ABSENCE")],
        ),
        paragraph(
            FlowAlign::Left,
            vec![text("To the Head of "), blank(&record.school_unit), text(",")],
        ),
        paragraph(
            FlowAlign::Justify,
            vec![
                text("I, "),
                blank(&record.full_name),
                text(", "),
                text(record.relation.label()),
                text(" of "),
                blank(&record.student_name),
                text(" (student ID "),
                blank(&record.student_id),
                text("), hereby give my consent for my child to be absent from school from "),
                blank(&format_display_date(&normalize_text(&record.leave_from))),
                text(" to "),
                blank(&format_display_date(&normalize_text(&record.leave_to))),
                text(" inclusive."),
            ],
        ),
        paragraph(
            FlowAlign::Justify,
            vec![text(
                "I confirm that I am responsible for my child during the stated period \
                 and that any missed coursework will be made up.",
            )],
        ),
        paragraph(FlowAlign::Left, vec![text("Signature: "), signature_run(record)]),
        paragraph(
            FlowAlign::Left,
            vec![text("Name: "), blank(&record.full_name)],
        ),
        paragraph(
            FlowAlign::Left,
            vec![text("Place: "), blank(&record.place)],
        ),
        paragraph(
            FlowAlign::Left,
            vec![
                text("Date: "),
                blank(&format_display_date(&normalize_text(&record.date))),
            ],
        ),
        paragraph(
            FlowAlign::Left,
            vec![text("Mobile: "), blank(&record.mobile)],
        ),
    ]
}

fn to_docx_paragraph(para: &FlowParagraph) -> Paragraph {
    let mut out = Paragraph::new().align(match para.align {
        FlowAlign::Left => AlignmentType::Left,
        FlowAlign::Center => AlignmentType::Center,
        FlowAlign::Justify => AlignmentType::Justified,
    });

    for run in &para.runs {
        let docx_run = match run {
            FlowRun::Text { text, bold } => {
                let mut r = Run::new().add_text(text.clone()).size(BODY_HALF_POINTS);
                if *bold {
                    r = r.bold();
                }
                r
            }
            FlowRun::Blank { text } => Run::new()
                .add_text(text.clone())
                .size(BODY_HALF_POINTS)
                .underline("single"),
            FlowRun::Image {
                bytes,
                width_px,
                height_px,
            } => {
                let pic = Pic::new(bytes)
                    .size(width_px * EMU_PER_PX, height_px * EMU_PER_PX);
                Run::new().add_image(pic)
            }
        };
        out = out.add_run(docx_run);
    }
    out
}

/// Produce the finished consent letter as DOCX bytes
pub fn render_flow(record: &FieldRecord) -> Result<Vec<u8>, ConsentError> {
    let mut docx = Docx::new().page_size(PAGE_W, PAGE_H).page_margin(
        PageMargin::new()
            .top(MARGIN)
            .bottom(MARGIN)
            .left(MARGIN)
            .right(MARGIN),
    );

    for para in layout(record) {
        docx = docx.add_paragraph(to_docx_paragraph(&para));
    }

    let mut buffer = std::io::Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| ConsentError::Packaging(e.to_string()))?;
    Ok(buffer.into_inner())
}
