// cloud-imager/src/processors/resizer.rs
use crate::core::Dimensions;
use image::{imageops::FilterType, DynamicImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeAlgorithm {
    Nearest,
    Bilinear,
    Bicubic,
    #[default]
    Lanczos3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeMode {
    /// Largest size fitting inside the box, aspect preserved.
    Fit(u32, u32),
    /// Exactly this size, aspect ignored.
    Exact(u32, u32),
    /// Percentage of the current size.
    Scale(f32),
    Width(u32),
    Height(u32),
}

impl ResizeMode {
    /// Mode for a `resize(width?, height?, flag?)` call.
    ///
    /// `!` forces the exact size and `%` reads the sides as percentages.
    pub fn from_request(width: Option<u32>, height: Option<u32>, flag: Option<&str>) -> Option<Self> {
        match (width, height, flag) {
            (Some(w), _, Some("%")) => Some(ResizeMode::Scale(w as f32)),
            (Some(w), Some(h), Some("!")) => Some(ResizeMode::Exact(w, h)),
            (Some(w), Some(h), _) => Some(ResizeMode::Fit(w, h)),
            (Some(w), None, _) => Some(ResizeMode::Width(w)),
            (None, Some(h), _) => Some(ResizeMode::Height(h)),
            (None, None, _) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Resizer {
    algorithm: ResizeAlgorithm,
}

impl Resizer {
    pub fn new(algorithm: ResizeAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn resize(&self, image: &DynamicImage, mode: ResizeMode) -> DynamicImage {
        let current = Dimensions::new(image.width(), image.height());
        let target = Self::calculate_dimensions(current, mode);

        if target == current {
            log::debug!("Image dimensions unchanged, skipping resize");
            return image.clone();
        }

        log::debug!(
            "Resizing image from {}x{} to {}x{}",
            current.width,
            current.height,
            target.width,
            target.height
        );

        image.resize_exact(target.width, target.height, self.filter_type())
    }

    pub fn calculate_dimensions(current: Dimensions, mode: ResizeMode) -> Dimensions {
        let (orig_width, orig_height) = (current.width, current.height);
        if orig_width == 0 || orig_height == 0 {
            return current;
        }

        let (width, height) = match mode {
            ResizeMode::Fit(w, h) => Self::preserve_aspect(orig_width, orig_height, w, h),
            ResizeMode::Exact(w, h) => (
                if w == 0 { orig_width } else { w },
                if h == 0 { orig_height } else { h },
            ),
            ResizeMode::Scale(scale) => {
                if scale <= 0.0 {
                    (orig_width, orig_height)
                } else {
                    (
                        (orig_width as f32 * scale / 100.0).round() as u32,
                        (orig_height as f32 * scale / 100.0).round() as u32,
                    )
                }
            }
            ResizeMode::Width(width) => {
                if width == 0 || width == orig_width {
                    (orig_width, orig_height)
                } else {
                    let ratio = width as f32 / orig_width as f32;
                    (width, (orig_height as f32 * ratio).round() as u32)
                }
            }
            ResizeMode::Height(height) => {
                if height == 0 || height == orig_height {
                    (orig_width, orig_height)
                } else {
                    let ratio = height as f32 / orig_height as f32;
                    ((orig_width as f32 * ratio).round() as u32, height)
                }
            }
        };

        Dimensions::new(width.max(1), height.max(1))
    }

    fn preserve_aspect(orig_w: u32, orig_h: u32, target_w: u32, target_h: u32) -> (u32, u32) {
        if target_w == 0 && target_h == 0 {
            return (orig_w, orig_h);
        }

        if target_w == 0 {
            let ratio = target_h as f32 / orig_h as f32;
            return ((orig_w as f32 * ratio).round() as u32, target_h);
        }

        if target_h == 0 {
            let ratio = target_w as f32 / orig_w as f32;
            return (target_w, (orig_h as f32 * ratio).round() as u32);
        }

        let ratio = (target_w as f32 / orig_w as f32).min(target_h as f32 / orig_h as f32);
        (
            (orig_w as f32 * ratio).round() as u32,
            (orig_h as f32 * ratio).round() as u32,
        )
    }

    fn filter_type(&self) -> FilterType {
        match self.algorithm {
            ResizeAlgorithm::Nearest => FilterType::Nearest,
            ResizeAlgorithm::Bilinear => FilterType::Triangle,
            ResizeAlgorithm::Bicubic => FilterType::CatmullRom,
            ResizeAlgorithm::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(w: u32, h: u32) -> Dimensions {
        Dimensions::new(w, h)
    }

    #[test]
    fn single_side_keeps_aspect() {
        let landscape = dims(800, 600);
        assert_eq!(
            Resizer::calculate_dimensions(landscape, ResizeMode::Height(100)),
            dims(133, 100)
        );
        assert_eq!(
            Resizer::calculate_dimensions(landscape, ResizeMode::Width(400)),
            dims(400, 300)
        );
    }

    #[test]
    fn fit_uses_the_constraining_side() {
        assert_eq!(
            Resizer::calculate_dimensions(dims(800, 600), ResizeMode::Fit(100, 100)),
            dims(100, 75)
        );
    }

    #[test]
    fn exact_and_scale() {
        assert_eq!(
            Resizer::calculate_dimensions(dims(800, 600), ResizeMode::Exact(10, 20)),
            dims(10, 20)
        );
        assert_eq!(
            Resizer::calculate_dimensions(dims(800, 600), ResizeMode::Scale(50.0)),
            dims(400, 300)
        );
    }

    #[test]
    fn request_flags_select_mode() {
        assert_eq!(
            ResizeMode::from_request(Some(50), None, Some("%")),
            Some(ResizeMode::Scale(50.0))
        );
        assert_eq!(
            ResizeMode::from_request(Some(5), Some(6), Some("!")),
            Some(ResizeMode::Exact(5, 6))
        );
        assert_eq!(ResizeMode::from_request(None, None, None), None);
    }

    #[test]
    fn resize_produces_target_size() {
        let image = DynamicImage::new_rgb8(40, 20);
        let resized = Resizer::default().resize(&image, ResizeMode::Height(10));
        assert_eq!((resized.width(), resized.height()), (20, 10));
    }
}
