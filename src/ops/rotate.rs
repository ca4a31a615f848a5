use crate::ops::{OpParams, Operation};
use crate::registry::RegistryError;
use crate::surface::{DrawBackend, Surface};
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

lazy_static::lazy_static! {
    static ref MATCHER: Regex = Regex::new(r"rotate=(90|180|270)").unwrap();
}

/// Rotation angle in degrees; only quarter turns are recognized and anything
/// else passes the image through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotateParams {
    pub angle: u16,
}

pub struct RotateOperation;

impl RotateOperation {
    pub fn from_settings(_settings: &HashMap<String, String>) -> Result<Box<dyn Operation>, RegistryError> {
        Ok(Box::new(Self))
    }
}

impl Operation for RotateOperation {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn matcher(&self) -> &Regex {
        &MATCHER
    }

    fn parse(&self, fragment: &str) -> OpParams {
        let angle = MATCHER
            .captures(fragment)
            .and_then(|caps| caps[1].parse::<u16>().ok())
            .unwrap_or(0);
        OpParams::Rotate(RotateParams { angle })
    }

    fn apply(&self, surface: Surface, params: &OpParams, backend: &dyn DrawBackend) -> Surface {
        let OpParams::Rotate(params) = params else {
            return surface;
        };
        if !matches!(params.angle, 90 | 180 | 270) {
            return surface;
        }
        match backend.rotate(&surface, params.angle) {
            Ok(rotated) => rotated,
            Err(err) => {
                warn!(error = %err, angle = params.angle, "rotate failed, returning original image");
                surface
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RasterBackend;

    #[test]
    fn test_parse_angle() {
        let op = RotateOperation;
        assert_eq!(op.parse("rotate=90"), OpParams::Rotate(RotateParams { angle: 90 }));
        assert_eq!(op.parse(""), OpParams::Rotate(RotateParams { angle: 0 }));
    }

    #[test]
    fn test_matcher_rejects_other_angles() {
        let op = RotateOperation;
        assert!(!op.matcher().is_match("rotate=45"));
        assert!(op.matcher().is_match("xrotate=180y"));
    }

    #[test]
    fn test_apply_quarter_turn() {
        let op = RotateOperation;
        let source = RasterBackend.allocate(40, 20, [0, 0, 0, 255]).unwrap();
        let rotated = op.apply(source, &OpParams::Rotate(RotateParams { angle: 90 }), &RasterBackend);
        assert_eq!((rotated.width(), rotated.height()), (20, 40));
    }

    #[test]
    fn test_apply_zero_angle_passes_through() {
        let op = RotateOperation;
        let source = RasterBackend.allocate(40, 20, [0, 0, 0, 255]).unwrap();
        let unchanged = op.apply(source, &OpParams::Rotate(RotateParams { angle: 0 }), &RasterBackend);
        assert_eq!((unchanged.width(), unchanged.height()), (40, 20));
    }
}
