pub mod flip;
pub mod resize;
pub mod rotate;
pub mod utils;

use crate::surface::{DrawBackend, Surface};
use regex::Regex;

pub use flip::{FlipDirection, FlipOperation, FlipParams};
pub use resize::{Anchor, ResizeMode, ResizeOperation, ResizeParams};
pub use rotate::{RotateOperation, RotateParams};

/// Parameters for one pipeline step, one variant per operation kind.
///
/// Parsed once at the planning boundary and threaded through explicitly;
/// operation instances themselves carry no per-request state and may be
/// shared across concurrent invocations.
#[derive(Debug, Clone, PartialEq)]
pub enum OpParams {
    Resize(ResizeParams),
    Rotate(RotateParams),
    Flip(FlipParams),
}

/// A pluggable image transform.
///
/// The matcher recognizes this operation's token syntax anywhere in a
/// directive; `parse` interprets the concatenation of all matched substrings;
/// `apply` transforms the surface, returning the input unchanged when the
/// parameters resolve to a no-op or the backend fails.
pub trait Operation: Send + Sync {
    fn name(&self) -> &'static str;

    fn matcher(&self) -> &Regex;

    fn parse(&self, fragment: &str) -> OpParams;

    fn apply(&self, surface: Surface, params: &OpParams, backend: &dyn DrawBackend) -> Surface;
}
