pub mod config;
pub mod constants;
pub mod ops;
pub mod pipeline;
pub mod registry;
pub mod settings;
pub mod surface;

pub use config::Config;
pub use ops::{OpParams, Operation};
pub use pipeline::{plan, Pipeline, PlanError, PlannedStep};
pub use registry::{OperationProvider, OperationRegistry, RegistryError};
pub use settings::SettingsRegistry;
pub use surface::{BackendError, DrawBackend, RasterBackend, Surface};
