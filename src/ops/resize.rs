//! The resize geometry engine.
//!
//! Parses size/mode/anchor/color/upscale/center tokens from the operation's
//! merged directive fragment, computes source/destination geometry for the
//! requested mode, and decides whether to composite, reject, or pass the
//! image through unchanged.

use crate::ops::{utils, OpParams, Operation};
use crate::registry::RegistryError;
use crate::surface::{BackendError, DrawBackend, EdgeMode, Interpolation, Rect, Smoothing, Surface};
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};

lazy_static::lazy_static! {
    static ref MATCHER: Regex = Regex::new(
        r"(?x)
        (width|height)=\d+
        | mode=(pad|stretch|crop|max)
        | anchor=(top|bottom|left|right|center)
        | center=-?\d+(\.\d+)?,-?\d+(\.\d+)?
        | bgcolor=(transparent|\d{1,3},\d{1,3},\d{1,3},\d{1,3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{3})
        | upscale=(true|false)
        "
    )
    .unwrap();
    static ref SIZE_RE: Regex = Regex::new(r"(width|height)=(\d+)").unwrap();
    static ref MODE_RE: Regex = Regex::new(r"mode=(pad|stretch|crop|max)").unwrap();
    static ref ANCHOR_RE: Regex = Regex::new(r"anchor=(top|bottom|left|right|center)").unwrap();
    static ref CENTER_RE: Regex = Regex::new(r"center=(-?\d+(?:\.\d+)?),(-?\d+(?:\.\d+)?)").unwrap();
    static ref BGCOLOR_RE: Regex =
        Regex::new(r"bgcolor=(transparent|\d{1,3},\d{1,3},\d{1,3},\d{1,3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{3})").unwrap();
    static ref UPSCALE_RE: Regex = Regex::new(r"upscale=(true|false)").unwrap();
}

/// How the source aspect ratio reconciles with the requested target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    #[default]
    Pad,
    Stretch,
    Crop,
    Max,
}

/// Reference point used to place a crop window when no explicit center
/// coordinates are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    Top,
    Bottom,
    Left,
    Right,
    #[default]
    Center,
}

/// Typed parameter set for one resize invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    /// Target width; 0 means "derive from aspect ratio".
    pub width: u32,
    /// Target height; 0 means "derive from aspect ratio".
    pub height: u32,
    pub mode: ResizeMode,
    pub anchor: Anchor,
    /// Pad background, RGBA.
    pub background: [u8; 4],
    /// When false, a target larger than the source is a no-op (unless
    /// stretching).
    pub upscale: bool,
    /// Crop focal point in source-fraction space; overrides the anchor.
    pub center: Option<(f64, f64)>,
}

impl Default for ResizeParams {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            mode: ResizeMode::Pad,
            anchor: Anchor::Center,
            background: [0, 0, 0, 0],
            upscale: true,
            center: None,
        }
    }
}

/// An allow-list constraint on final output dimensions. A zero dimension is
/// an OR-wildcard: the final size matches when either of its dimensions
/// equals the other, nonzero restriction value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRestriction {
    pub width: u32,
    pub height: u32,
}

impl SizeRestriction {
    pub fn permits(&self, width: u32, height: u32) -> bool {
        match (self.width, self.height) {
            (0, 0) => true,
            (0, h) => width == h || height == h,
            (w, 0) => width == w || height == w,
            (w, h) => width == w && height == h,
        }
    }
}

/// Settings attached to the resize operation at registry build time.
#[derive(Debug, Clone, Default)]
pub struct ResizeSettings {
    /// Allowed output sizes; empty means unrestricted.
    pub restrictions: Vec<SizeRestriction>,
    /// Largest permitted output width; 0 means unbounded.
    pub max_width: u32,
    /// Largest permitted output height; 0 means unbounded.
    pub max_height: u32,
}

impl ResizeSettings {
    pub fn from_map(settings: &HashMap<String, String>) -> Result<Self, RegistryError> {
        let restrictions = settings
            .get("RestrictTo")
            .map(|raw| parse_restrictions(raw))
            .unwrap_or_default();
        let max_width = parse_limit(settings, "MaxWidth")?;
        let max_height = parse_limit(settings, "MaxHeight")?;
        Ok(Self {
            restrictions,
            max_width,
            max_height,
        })
    }
}

fn parse_limit(settings: &HashMap<String, String>, key: &str) -> Result<u32, RegistryError> {
    match settings.get(key) {
        None => Ok(0),
        Some(raw) => raw.trim().parse::<u32>().map_err(|e| RegistryError::InvalidSetting {
            operation: "resize".to_string(),
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Parses a comma-separated restriction list; each entry is a size-token
/// pair such as `width=100height=0`. Entries without any size token are
/// skipped.
fn parse_restrictions(raw: &str) -> Vec<SizeRestriction> {
    raw.split(',')
        .filter_map(|entry| {
            let mut width = 0u32;
            let mut height = 0u32;
            let mut seen = false;
            for caps in SIZE_RE.captures_iter(entry) {
                let value = caps[2].parse::<u32>().unwrap_or(0);
                match &caps[1] {
                    "width" => width = value,
                    _ => height = value,
                }
                seen = true;
            }
            seen.then_some(SizeRestriction { width, height })
        })
        .collect()
}

/// Why a computed resize was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The final size matched no configured restriction.
    Restricted,
    /// The target enlarges the source and upscaling is disabled.
    UpscaleDisallowed,
    /// The final size is degenerate or exceeds the configured maximums.
    OutOfBounds,
}

/// Computed composite geometry: the canvas to allocate and the destination
/// rectangle the source is scaled into. The destination rectangle may exceed
/// the canvas with a negative offset (crop overflow).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeGeometry {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub dest_x: i64,
    pub dest_y: i64,
    pub dest_width: u32,
    pub dest_height: u32,
    pub smoothing: Smoothing,
}

/// Outcome of the geometry computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePlan {
    Apply(ResizeGeometry),
    Skip(SkipReason),
}

/// Computes the resize geometry for a source image and parameter set.
///
/// Pure arithmetic; no surface is touched. The caller maps `Skip` to a
/// pass-through of the original image.
pub fn compute_geometry(
    source_width: u32,
    source_height: u32,
    params: &ResizeParams,
    settings: &ResizeSettings,
) -> ResizePlan {
    if source_width == 0 || source_height == 0 {
        return ResizePlan::Skip(SkipReason::OutOfBounds);
    }

    let sw = f64::from(source_width);
    let sh = f64::from(source_height);
    let mut width = f64::from(params.width);
    let mut height = f64::from(params.height);

    let mut percent_width = (width / sw).abs();
    let mut percent_height = (height / sh).abs();

    let mut dest_x: i64 = 0;
    let mut dest_y: i64 = 0;
    let mut dest_width = width;
    let mut dest_height = height;

    match params.mode {
        ResizeMode::Pad if width > 0.0 && height > 0.0 => {
            // The smaller percent is binding; the other axis shrinks inside
            // the canvas and is centered.
            if percent_height < percent_width {
                let ratio = percent_height;
                dest_width = (sw * ratio).ceil();
                dest_x = ((width - sw * ratio) / 2.0) as i64;
            } else {
                let ratio = percent_width;
                dest_height = (sh * ratio).ceil();
                dest_y = ((height - sh * ratio) / 2.0) as i64;
            }
        }
        ResizeMode::Crop if width > 0.0 && height > 0.0 => {
            // The larger percent is binding; the other axis overflows the
            // canvas and the overflow is cropped.
            if percent_height > percent_width {
                let ratio = percent_height;
                dest_width = (sw * ratio).ceil();
                dest_x = match params.center {
                    Some((cx, _)) => {
                        let offset = (width / 2.0 - cx * sw * ratio) as i64;
                        offset.clamp(width as i64 - dest_width as i64, 0)
                    }
                    None => match params.anchor {
                        Anchor::Left => 0,
                        Anchor::Right => width as i64 - dest_width as i64,
                        _ => ((width - sw * ratio) / 2.0) as i64,
                    },
                };
            } else {
                let ratio = percent_width;
                dest_height = (sh * ratio).ceil();
                dest_y = match params.center {
                    Some((_, cy)) => {
                        let offset = (height / 2.0 - cy * sh * ratio) as i64;
                        offset.clamp(height as i64 - dest_height as i64, 0)
                    }
                    None => match params.anchor {
                        Anchor::Top => 0,
                        Anchor::Bottom => height as i64 - dest_height as i64,
                        _ => ((height - sh * ratio) / 2.0) as i64,
                    },
                };
            }
        }
        ResizeMode::Max => {
            // Only constrains; when the source exceeds the box, drop the
            // dimension with the smaller ratio mismatch so the derivation
            // below recomputes it from the binding axis.
            if width > 0.0 && height > 0.0 && (sw > width || sh > height) {
                let source_ratio = sh / sw;
                let target_ratio = height / width;
                if source_ratio < target_ratio {
                    height = 0.0;
                    percent_height = 0.0;
                    dest_height = 0.0;
                } else {
                    width = 0.0;
                    percent_width = 0.0;
                    dest_width = 0.0;
                }
            }
        }
        // Stretch fills the target box exactly; single-dimension pad/crop
        // requests fall through to the derivation below.
        _ => {}
    }

    // Any dimension left unspecified is derived from the other axis's scale.
    if height == 0.0 {
        dest_height = (sh * percent_width).ceil();
        height = dest_height;
    }
    if width == 0.0 {
        dest_width = (sw * percent_height).ceil();
        width = dest_width;
    }

    let final_width = width as u32;
    let final_height = height as u32;

    if !settings.restrictions.is_empty()
        && !settings
            .restrictions
            .iter()
            .any(|r| r.permits(final_width, final_height))
    {
        return ResizePlan::Skip(SkipReason::Restricted);
    }

    if (final_width > source_width || final_height > source_height)
        && !params.upscale
        && params.mode != ResizeMode::Stretch
    {
        return ResizePlan::Skip(SkipReason::UpscaleDisallowed);
    }

    if final_width == 0
        || final_height == 0
        || (settings.max_width > 0 && final_width > settings.max_width)
        || (settings.max_height > 0 && final_height > settings.max_height)
    {
        return ResizePlan::Skip(SkipReason::OutOfBounds);
    }

    let smoothing = if dest_width > sw || dest_height > sh {
        Smoothing::AntiAlias
    } else {
        Smoothing::None
    };

    ResizePlan::Apply(ResizeGeometry {
        canvas_width: final_width,
        canvas_height: final_height,
        dest_x,
        dest_y,
        dest_width: dest_width as u32,
        dest_height: dest_height as u32,
        smoothing,
    })
}

fn parse_params(fragment: &str) -> ResizeParams {
    let mut params = ResizeParams::default();

    // Assignment follows token occurrence order; later tokens overwrite.
    for caps in SIZE_RE.captures_iter(fragment) {
        let value = caps[2].parse::<u32>().unwrap_or(0);
        match &caps[1] {
            "width" => params.width = value,
            _ => params.height = value,
        }
    }

    for caps in MODE_RE.captures_iter(fragment) {
        params.mode = match &caps[1] {
            "stretch" => ResizeMode::Stretch,
            "crop" => ResizeMode::Crop,
            "max" => ResizeMode::Max,
            _ => ResizeMode::Pad,
        };
    }

    for caps in ANCHOR_RE.captures_iter(fragment) {
        params.anchor = match &caps[1] {
            "top" => Anchor::Top,
            "bottom" => Anchor::Bottom,
            "left" => Anchor::Left,
            "right" => Anchor::Right,
            _ => Anchor::Center,
        };
    }

    for caps in BGCOLOR_RE.captures_iter(fragment) {
        params.background = utils::parse_color(&caps[1]);
    }

    for caps in UPSCALE_RE.captures_iter(fragment) {
        params.upscale = utils::parse_boolean(&caps[1]);
    }

    for caps in CENTER_RE.captures_iter(fragment) {
        let x = caps[1].parse::<f64>().ok();
        let y = caps[2].parse::<f64>().ok();
        if let (Some(x), Some(y)) = (x, y) {
            params.center = Some((x, y));
        }
    }

    params
}

/// The resize operation: matcher, parameter parser, and apply step.
pub struct ResizeOperation {
    settings: ResizeSettings,
}

impl ResizeOperation {
    pub fn new(settings: ResizeSettings) -> Self {
        Self { settings }
    }

    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Box<dyn Operation>, RegistryError> {
        Ok(Box::new(Self::new(ResizeSettings::from_map(settings)?)))
    }

    pub fn settings(&self) -> &ResizeSettings {
        &self.settings
    }

    fn composite(
        &self,
        surface: &Surface,
        params: &ResizeParams,
        geometry: &ResizeGeometry,
        backend: &dyn DrawBackend,
    ) -> Result<Surface, BackendError> {
        let mut dest = backend.allocate(geometry.canvas_width, geometry.canvas_height, params.background)?;
        backend.draw(
            &mut dest,
            Rect::new(geometry.dest_x, geometry.dest_y, geometry.dest_width, geometry.dest_height),
            surface,
            Rect::new(0, 0, surface.width(), surface.height()),
            Interpolation::Cubic,
            EdgeMode::Mirror,
            geometry.smoothing,
        )?;
        Ok(dest)
    }
}

impl Operation for ResizeOperation {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn matcher(&self) -> &Regex {
        &MATCHER
    }

    fn parse(&self, fragment: &str) -> OpParams {
        OpParams::Resize(parse_params(fragment))
    }

    fn apply(&self, surface: Surface, params: &OpParams, backend: &dyn DrawBackend) -> Surface {
        let OpParams::Resize(params) = params else {
            return surface;
        };

        match compute_geometry(surface.width(), surface.height(), params, &self.settings) {
            ResizePlan::Skip(reason) => {
                debug!(?reason, "resize is a no-op, passing image through");
                surface
            }
            ResizePlan::Apply(geometry) => match self.composite(&surface, params, &geometry, backend) {
                Ok(next) => next,
                Err(err) => {
                    // Best-effort degrade: the partial destination is dropped
                    // and the original image survives unchanged.
                    warn!(error = %err, "resize compositing failed, returning original image");
                    surface
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ResizeSettings {
        ResizeSettings::default()
    }

    fn params(width: u32, height: u32, mode: ResizeMode) -> ResizeParams {
        ResizeParams {
            width,
            height,
            mode,
            ..ResizeParams::default()
        }
    }

    fn apply(plan: ResizePlan) -> ResizeGeometry {
        match plan {
            ResizePlan::Apply(g) => g,
            ResizePlan::Skip(reason) => panic!("expected geometry, got skip {:?}", reason),
        }
    }

    #[test]
    fn test_parse_full_fragment() {
        let parsed = parse_params("width=100height=50mode=cropanchor=leftbgcolor=ff8000upscale=falsecenter=0.25,-0.5");
        assert_eq!(
            parsed,
            ResizeParams {
                width: 100,
                height: 50,
                mode: ResizeMode::Crop,
                anchor: Anchor::Left,
                background: [255, 128, 0, 255],
                upscale: false,
                center: Some((0.25, -0.5)),
            }
        );
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(parse_params(""), ResizeParams::default());
        let parsed = parse_params("width=320");
        assert_eq!(parsed.width, 320);
        assert_eq!(parsed.height, 0);
        assert_eq!(parsed.mode, ResizeMode::Pad);
        assert_eq!(parsed.anchor, Anchor::Center);
        assert!(parsed.upscale);
        assert_eq!(parsed.background, [0, 0, 0, 0]);
    }

    #[test]
    fn test_parse_later_token_overwrites() {
        let parsed = parse_params("width=100width=200");
        assert_eq!(parsed.width, 200);

        // Every token kind follows last-occurrence-wins, not just sizes.
        let parsed = parse_params(
            "mode=padanchor=topbgcolor=ff0000upscale=truecenter=0.1,0.1\
             mode=cropanchor=bottombgcolor=00ff00upscale=falsecenter=0.9,0.9",
        );
        assert_eq!(parsed.mode, ResizeMode::Crop);
        assert_eq!(parsed.anchor, Anchor::Bottom);
        assert_eq!(parsed.background, [0, 255, 0, 255]);
        assert!(!parsed.upscale);
        assert_eq!(parsed.center, Some((0.9, 0.9)));
    }

    #[test]
    fn test_matcher_tokens() {
        let matcher = &*MATCHER;
        let directive = "width=100height=50junkmode=cropanchor=left";
        let merged: Vec<_> = matcher.find_iter(directive).map(|m| m.as_str()).collect();
        assert_eq!(merged, vec!["width=100", "height=50", "mode=crop", "anchor=left"]);
    }

    #[test]
    fn test_pad_centers_the_short_axis() {
        // landscape source into square canvas: height is the leftover axis
        let g = apply(compute_geometry(400, 300, &params(200, 200, ResizeMode::Pad), &settings()));
        assert_eq!((g.canvas_width, g.canvas_height), (200, 200));
        assert_eq!((g.dest_width, g.dest_height), (200, 150));
        assert_eq!((g.dest_x, g.dest_y), (0, 25));
        assert!(g.dest_x + i64::from(g.dest_width) <= 200);
        assert!(g.dest_y + i64::from(g.dest_height) <= 200);
    }

    #[test]
    fn test_pad_portrait_centers_horizontally() {
        let g = apply(compute_geometry(300, 400, &params(200, 200, ResizeMode::Pad), &settings()));
        assert_eq!((g.dest_width, g.dest_height), (150, 200));
        assert_eq!((g.dest_x, g.dest_y), (25, 0));
    }

    #[test]
    fn test_pad_uniform_scale_is_min_ratio() {
        // ratio = min(200/400, 200/300) = 0.5 applied uniformly
        let g = apply(compute_geometry(400, 300, &params(200, 200, ResizeMode::Pad), &settings()));
        assert_eq!(g.dest_width, 200); // 400 * 0.5
        assert_eq!(g.dest_height, 150); // 300 * 0.5
    }

    #[test]
    fn test_crop_overflows_the_long_axis() {
        let g = apply(compute_geometry(400, 300, &params(200, 200, ResizeMode::Crop), &settings()));
        assert_eq!((g.canvas_width, g.canvas_height), (200, 200));
        // larger percent (200/300) binds; width overflows: ceil(400 * 2/3)
        assert_eq!(g.dest_width, 267);
        assert_eq!(g.dest_height, 200);
        assert_eq!(g.dest_x, -33);
        assert_eq!(g.dest_y, 0);
    }

    #[test]
    fn test_crop_anchor_top_is_zero_offset() {
        let g = apply(compute_geometry(
            300,
            400,
            &ResizeParams {
                anchor: Anchor::Top,
                ..params(200, 200, ResizeMode::Crop)
            },
            &settings(),
        ));
        assert_eq!(g.dest_y, 0);
    }

    #[test]
    fn test_crop_anchor_bottom_aligns_bottom_edge() {
        let g = apply(compute_geometry(
            300,
            400,
            &ResizeParams {
                anchor: Anchor::Bottom,
                ..params(200, 200, ResizeMode::Crop)
            },
            &settings(),
        ));
        // ceil(400 * 2/3) = 267 scaled height against a 200 canvas
        assert_eq!(g.dest_height, 267);
        assert_eq!(g.dest_y, 200 - 267);
    }

    #[test]
    fn test_crop_anchor_left_and_right() {
        let left = apply(compute_geometry(
            400,
            300,
            &ResizeParams {
                anchor: Anchor::Left,
                ..params(200, 200, ResizeMode::Crop)
            },
            &settings(),
        ));
        assert_eq!(left.dest_x, 0);

        let right = apply(compute_geometry(
            400,
            300,
            &ResizeParams {
                anchor: Anchor::Right,
                ..params(200, 200, ResizeMode::Crop)
            },
            &settings(),
        ));
        assert_eq!(right.dest_x, 200 - 267);
    }

    #[test]
    fn test_crop_center_coordinates_override_anchor() {
        // anchor says top, center says bottom edge
        let g = apply(compute_geometry(
            300,
            400,
            &ResizeParams {
                anchor: Anchor::Top,
                center: Some((0.5, 1.0)),
                ..params(200, 200, ResizeMode::Crop)
            },
            &settings(),
        ));
        // clamped to the maximum negative offset
        assert_eq!(g.dest_y, 200 - 267);
    }

    #[test]
    fn test_crop_center_coordinates_clamped_to_zero() {
        let g = apply(compute_geometry(
            300,
            400,
            &ResizeParams {
                center: Some((0.5, 0.0)),
                ..params(200, 200, ResizeMode::Crop)
            },
            &settings(),
        ));
        assert_eq!(g.dest_y, 0);
    }

    #[test]
    fn test_crop_center_coordinates_midpoint() {
        let g = apply(compute_geometry(
            300,
            400,
            &ResizeParams {
                center: Some((0.5, 0.5)),
                ..params(200, 200, ResizeMode::Crop)
            },
            &settings(),
        ));
        // 200/2 - 0.5 * 400 * (200/300) = 100 - 133.3 -> -33
        assert_eq!(g.dest_y, -33);
    }

    #[test]
    fn test_stretch_fills_the_box_exactly() {
        let g = apply(compute_geometry(400, 300, &params(200, 100, ResizeMode::Stretch), &settings()));
        assert_eq!((g.dest_width, g.dest_height), (200, 100));
        assert_eq!((g.dest_x, g.dest_y), (0, 0));
    }

    #[test]
    fn test_max_shrinks_into_the_box() {
        let g = apply(compute_geometry(400, 300, &params(200, 100, ResizeMode::Max), &settings()));
        // height binds: width derived as ceil(400 * 100/300)
        assert_eq!((g.canvas_width, g.canvas_height), (134, 100));
        assert_eq!((g.dest_width, g.dest_height), (134, 100));
    }

    #[test]
    fn test_max_within_box_keeps_request() {
        let g = apply(compute_geometry(100, 100, &params(200, 200, ResizeMode::Max), &settings()));
        assert_eq!((g.canvas_width, g.canvas_height), (200, 200));
    }

    #[test]
    fn test_width_only_derives_height() {
        let g = apply(compute_geometry(400, 300, &params(200, 0, ResizeMode::Pad), &settings()));
        assert_eq!((g.canvas_width, g.canvas_height), (200, 150));
        assert_eq!((g.dest_width, g.dest_height), (200, 150));
    }

    #[test]
    fn test_height_only_derives_width() {
        let g = apply(compute_geometry(400, 300, &params(0, 150, ResizeMode::Pad), &settings()));
        assert_eq!((g.canvas_width, g.canvas_height), (200, 150));
    }

    #[test]
    fn test_both_zero_is_a_no_op() {
        let plan = compute_geometry(400, 300, &params(0, 0, ResizeMode::Pad), &settings());
        assert_eq!(plan, ResizePlan::Skip(SkipReason::OutOfBounds));
    }

    #[test]
    fn test_restriction_wildcard_semantics() {
        let restriction = SizeRestriction { width: 100, height: 0 };
        assert!(restriction.permits(100, 400));
        assert!(restriction.permits(400, 100));
        assert!(!restriction.permits(99, 400));

        let exact = SizeRestriction { width: 640, height: 480 };
        assert!(exact.permits(640, 480));
        assert!(!exact.permits(480, 640));
    }

    #[test]
    fn test_restriction_mismatch_skips() {
        let settings = ResizeSettings {
            restrictions: vec![SizeRestriction { width: 100, height: 0 }],
            ..ResizeSettings::default()
        };
        let plan = compute_geometry(400, 300, &params(200, 150, ResizeMode::Pad), &settings);
        assert_eq!(plan, ResizePlan::Skip(SkipReason::Restricted));

        // width == 100 satisfies the wildcard
        let plan = compute_geometry(400, 300, &params(100, 75, ResizeMode::Pad), &settings);
        assert!(matches!(plan, ResizePlan::Apply(_)));
    }

    #[test]
    fn test_upscale_disallowed_skips() {
        let plan = compute_geometry(
            50,
            50,
            &ResizeParams {
                upscale: false,
                ..params(200, 200, ResizeMode::Pad)
            },
            &settings(),
        );
        assert_eq!(plan, ResizePlan::Skip(SkipReason::UpscaleDisallowed));
    }

    #[test]
    fn test_upscale_disallowed_does_not_gate_stretch() {
        let plan = compute_geometry(
            50,
            50,
            &ResizeParams {
                upscale: false,
                ..params(200, 200, ResizeMode::Stretch)
            },
            &settings(),
        );
        assert!(matches!(plan, ResizePlan::Apply(_)));
    }

    #[test]
    fn test_max_dimensions_gate() {
        let settings = ResizeSettings {
            max_width: 1000,
            max_height: 1000,
            ..ResizeSettings::default()
        };
        let plan = compute_geometry(4000, 3000, &params(2000, 1500, ResizeMode::Pad), &settings);
        assert_eq!(plan, ResizePlan::Skip(SkipReason::OutOfBounds));
    }

    #[test]
    fn test_smoothing_selected_when_enlarging() {
        let enlarged = apply(compute_geometry(50, 50, &params(200, 200, ResizeMode::Pad), &settings()));
        assert_eq!(enlarged.smoothing, Smoothing::AntiAlias);
        let shrunk = apply(compute_geometry(400, 300, &params(200, 150, ResizeMode::Pad), &settings()));
        assert_eq!(shrunk.smoothing, Smoothing::None);
    }

    #[test]
    fn test_parse_restrictions() {
        let restrictions = parse_restrictions("width=100height=0,width=640height=480, junk ,height=50");
        assert_eq!(
            restrictions,
            vec![
                SizeRestriction { width: 100, height: 0 },
                SizeRestriction { width: 640, height: 480 },
                SizeRestriction { width: 0, height: 50 },
            ]
        );
    }

    #[test]
    fn test_settings_from_map_rejects_bad_limit() {
        let mut map = HashMap::new();
        map.insert("MaxWidth".to_string(), "lots".to_string());
        assert!(ResizeSettings::from_map(&map).is_err());
    }

    #[test]
    fn test_apply_upscale_noop_returns_original() {
        use crate::surface::RasterBackend;
        let op = ResizeOperation::new(ResizeSettings::default());
        let source = RasterBackend.allocate(50, 50, [1, 2, 3, 255]).unwrap();
        let params = OpParams::Resize(ResizeParams {
            upscale: false,
            ..params(200, 200, ResizeMode::Pad)
        });
        let result = op.apply(source, &params, &RasterBackend);
        assert_eq!((result.width(), result.height()), (50, 50));
        assert_eq!(result.image().get_pixel(0, 0).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_apply_backend_failure_returns_original() {
        use crate::surface::RasterBackend;
        let op = ResizeOperation::new(ResizeSettings::default());
        let source = RasterBackend.allocate(50, 50, [7, 8, 9, 255]).unwrap();
        // 20000x20000 exceeds the backend allocation cap, so compositing
        // fails after the geometry plan is accepted
        let params = OpParams::Resize(params(20_000, 20_000, ResizeMode::Stretch));
        let result = op.apply(source, &params, &RasterBackend);
        assert_eq!((result.width(), result.height()), (50, 50));
        assert_eq!(result.image().get_pixel(0, 0).0, [7, 8, 9, 255]);
    }

    #[test]
    fn test_apply_pad_composites_with_background() {
        use crate::surface::RasterBackend;
        let op = ResizeOperation::new(ResizeSettings::default());
        let source = RasterBackend.allocate(400, 300, [10, 10, 10, 255]).unwrap();
        let params = OpParams::Resize(ResizeParams {
            background: [255, 0, 0, 255],
            ..params(200, 200, ResizeMode::Pad)
        });
        let result = op.apply(source, &params, &RasterBackend);
        assert_eq!((result.width(), result.height()), (200, 200));
        // top band is pad background, center is source content
        assert_eq!(result.image().get_pixel(100, 5).0, [255, 0, 0, 255]);
        assert_eq!(result.image().get_pixel(100, 100).0, [10, 10, 10, 255]);
    }
}
