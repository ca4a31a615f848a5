/// Environment variable enabling automatic operation discovery.
pub const ENV_AUTO_DISCOVER: &str = "IMGWEAVE_AUTO_DISCOVER";
/// Environment variable holding the explicit operation pipeline list.
pub const ENV_PIPELINE: &str = "IMGWEAVE_PIPELINE";
/// Environment variable holding preset definitions.
pub const ENV_PRESETS: &str = "IMGWEAVE_PRESETS";
/// Environment variable restricting directives to preset references only.
pub const ENV_ONLY_PRESETS: &str = "IMGWEAVE_ONLY_PRESETS";
/// Environment variable holding per-operation settings.
pub const ENV_SETTINGS: &str = "IMGWEAVE_SETTINGS";

/// Order value assigned to an operation whose matcher found nothing in the
/// directive. Such operations are excluded from the pipeline entirely, not
/// merely ordered last.
pub const MAX_ORDER: usize = usize::MAX;
