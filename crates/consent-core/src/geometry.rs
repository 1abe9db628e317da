//! Aspect-ratio-preserving fit math shared by both renderers and the crop tool

/// Largest dimensions that fit `(source_w, source_h)` inside the box
/// `(max_w, max_h)` without changing the aspect ratio and without upscaling.
///
/// A zero (unknown) source dimension is treated as a neutral default: the
/// box dimensions are returned unchanged rather than reported as an error.
pub fn fit_within(source_w: u32, source_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if source_w == 0 || source_h == 0 {
        return (max_w, max_h);
    }

    let scale = (max_w as f64 / source_w as f64)
        .min(max_h as f64 / source_h as f64)
        .min(1.0);

    let w = (source_w as f64 * scale).round().max(1.0) as u32;
    let h = (source_h as f64 * scale).round().max(1.0) as u32;
    (w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_source_returns_box_unchanged() {
        assert_eq!(fit_within(0, 0, 200, 100), (200, 100));
        assert_eq!(fit_within(0, 50, 200, 100), (200, 100));
        assert_eq!(fit_within(50, 0, 200, 100), (200, 100));
    }

    #[test]
    fn small_image_is_never_upscaled() {
        assert_eq!(fit_within(40, 30, 200, 100), (40, 30));
    }

    #[test]
    fn wide_image_is_limited_by_width() {
        // 1000x200 into 200x100: scale 0.2, height ratio 0.5
        assert_eq!(fit_within(1000, 200, 200, 100), (200, 40));
    }

    #[test]
    fn tall_image_is_limited_by_height() {
        assert_eq!(fit_within(200, 1000, 200, 100), (20, 100));
    }

    #[test]
    fn degenerate_result_is_floored_at_one() {
        // 10000x1 source into a 10x10 box scales height below one pixel
        let (w, h) = fit_within(10000, 1, 10, 10);
        assert_eq!(w, 10);
        assert_eq!(h, 1);
    }
}
