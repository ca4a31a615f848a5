use crate::ops::{OpParams, Operation};
use crate::registry::RegistryError;
use crate::surface::{DrawBackend, Surface};
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

lazy_static::lazy_static! {
    static ref MATCHER: Regex = Regex::new(r"flip=(horizontal|vertical|h|v)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipParams {
    pub direction: Option<FlipDirection>,
}

pub struct FlipOperation;

impl FlipOperation {
    pub fn from_settings(_settings: &HashMap<String, String>) -> Result<Box<dyn Operation>, RegistryError> {
        Ok(Box::new(Self))
    }
}

impl Operation for FlipOperation {
    fn name(&self) -> &'static str {
        "flip"
    }

    fn matcher(&self) -> &Regex {
        &MATCHER
    }

    fn parse(&self, fragment: &str) -> OpParams {
        let direction = MATCHER.captures(fragment).map(|caps| match &caps[1] {
            "horizontal" | "h" => FlipDirection::Horizontal,
            _ => FlipDirection::Vertical,
        });
        OpParams::Flip(FlipParams { direction })
    }

    fn apply(&self, surface: Surface, params: &OpParams, backend: &dyn DrawBackend) -> Surface {
        let OpParams::Flip(params) = params else {
            return surface;
        };
        let Some(direction) = params.direction else {
            return surface;
        };
        let flipped = match direction {
            FlipDirection::Horizontal => backend.flip_horizontal(&surface),
            FlipDirection::Vertical => backend.flip_vertical(&surface),
        };
        match flipped {
            Ok(flipped) => flipped,
            Err(err) => {
                warn!(error = %err, "flip failed, returning original image");
                surface
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RasterBackend;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_parse_directions() {
        let op = FlipOperation;
        assert_eq!(
            op.parse("flip=horizontal"),
            OpParams::Flip(FlipParams {
                direction: Some(FlipDirection::Horizontal)
            })
        );
        assert_eq!(
            op.parse("flip=v"),
            OpParams::Flip(FlipParams {
                direction: Some(FlipDirection::Vertical)
            })
        );
        assert_eq!(op.parse(""), OpParams::Flip(FlipParams { direction: None }));
    }

    #[test]
    fn test_apply_horizontal_moves_pixels() {
        let op = FlipOperation;
        let mut image = RgbaImage::from_pixel(4, 1, Rgba([0, 0, 0, 255]));
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let surface = Surface::from_image(image);
        let flipped = op.apply(
            surface,
            &OpParams::Flip(FlipParams {
                direction: Some(FlipDirection::Horizontal),
            }),
            &RasterBackend,
        );
        assert_eq!(flipped.image().get_pixel(3, 0).0, [255, 0, 0, 255]);
    }
}
