//! Helvetica advance widths for fitting text into fixed template slots
//!
//! Widths are the standard AFM values in 1/1000 em for the printable ASCII
//! range. The template is filled with one of the base-14 fonts, so no font
//! file ships with the crate.

const ELLIPSIS: char = '…';
const ELLIPSIS_WIDTH: u32 = 1000;
// characters outside the table (accented letters and the like) are close
// to the lowercase average
const DEFAULT_WIDTH: u32 = 556;

#[rustfmt::skip]
const ASCII_WIDTHS: [u32; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, // space ! " # $ % & '
    333, 333, 389, 584, 278, 333, 278, 278, // ( ) * + , - . /
    556, 556, 556, 556, 556, 556, 556, 556, // 0 1 2 3 4 5 6 7
    556, 556, 278, 278, 584, 584, 584, 556, // 8 9 : ; < = > ?
    1015, 667, 667, 722, 722, 667, 611, 778, // @ A B C D E F G
    722, 278, 500, 667, 556, 833, 722, 778, // H I J K L M N O
    667, 778, 722, 667, 611, 722, 667, 944, // P Q R S T U V W
    667, 667, 611, 278, 278, 278, 469, 556, // X Y Z [ \ ] ^ _
    333, 556, 556, 500, 556, 556, 278, 556, // ` a b c d e f g
    556, 222, 222, 500, 222, 833, 556, 556, // h i j k l m n o
    556, 556, 333, 500, 278, 556, 500, 722, // p q r s t u v w
    500, 500, 500, 334, 260, 334, 584,      // x y z { | } ~
];

fn char_width(c: char) -> u32 {
    match c {
        ' '..='~' => ASCII_WIDTHS[c as usize - ' ' as usize],
        ELLIPSIS => ELLIPSIS_WIDTH,
        _ => DEFAULT_WIDTH,
    }
}

/// Rendered width of `text` at `font_size`, in points
pub fn string_width(text: &str, font_size: f64) -> f64 {
    let units: u32 = text.chars().map(char_width).sum();
    units as f64 * font_size / 1000.0
}

/// Fit `text` into `max_width` points at `font_size`.
///
/// Text that already fits is returned unchanged. Otherwise characters are
/// trimmed from the end and an ellipsis appended, repeating until the
/// result fits. Returns an empty string only for empty input.
pub fn truncate_to_width(text: &str, max_width: f64, font_size: f64) -> String {
    if string_width(text, font_size) <= max_width {
        return text.to_string();
    }

    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let mut candidate: String = chars.iter().collect();
        candidate.push(ELLIPSIS);
        if string_width(&candidate, font_size) <= max_width {
            return candidate;
        }
    }
    ELLIPSIS.to_string()
}
