//! Coordinate mapping
//!
//! Every page is rendered onto a fixed-width canvas. One scale factor per
//! page converts native units to pixel units; every emitted coordinate and
//! size on that page goes through the same factor and is rounded to one
//! decimal place.

use super::LayoutError;

/// Width of the HTML page canvas in pixel units
pub const TARGET_WIDTH: f32 = 960.0;

/// Per-page conversion from native units to canvas pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageScale {
    factor: f32,
}

impl PageScale {
    pub fn new(page_width: f32) -> Result<Self, LayoutError> {
        if page_width <= 0.0 {
            return Err(LayoutError::ZeroWidthPage);
        }
        Ok(Self {
            factor: TARGET_WIDTH / page_width,
        })
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Scale a native value to pixels, rounded to one decimal place
    pub fn px(&self, native: f32) -> f32 {
        (native * self.factor * 10.0).round() / 10.0
    }

    /// Scaled page height, rounded to a whole pixel
    pub fn page_height_px(&self, page_height: f32) -> u32 {
        (page_height * self.factor).round().max(0.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_page_is_fatal() {
        assert!(matches!(PageScale::new(0.0), Err(LayoutError::ZeroWidthPage)));
        assert!(matches!(PageScale::new(-5.0), Err(LayoutError::ZeroWidthPage)));
    }

    #[test]
    fn letter_page_scale() {
        // 612 native units wide: factor 960/612, native top 100 lands at 156.9
        let scale = PageScale::new(612.0).unwrap();
        assert!((scale.factor() - 1.5686).abs() < 0.001);
        assert_eq!(scale.px(100.0), 156.9);
    }

    #[test]
    fn scaled_width_is_always_target() {
        for width in [320.0, 612.0, 960.0, 1920.0] {
            let scale = PageScale::new(width).unwrap();
            assert_eq!(scale.px(width), TARGET_WIDTH);
        }
    }

    #[test]
    fn one_decimal_rounding() {
        let scale = PageScale::new(960.0).unwrap();
        assert_eq!(scale.px(10.04), 10.0);
        assert_eq!(scale.px(10.06), 10.1);
        assert_eq!(scale.px(0.0), 0.0);
    }

    #[test]
    fn page_height_rounds_to_whole_pixels() {
        let scale = PageScale::new(612.0).unwrap();
        // 792 * 960/612 = 1242.35...
        assert_eq!(scale.page_height_px(792.0), 1242);
    }
}
