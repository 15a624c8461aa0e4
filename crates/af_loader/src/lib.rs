//! # af_loader (layer 4)
//!
//! Wiring: resolves declarative scenario documents against registries of
//! packs and agent types. The original scenario DSL selected code by
//! import; here a JSON document names a registered pack label and
//! registered agent type tags.

pub mod file;
pub mod registry;

pub use file::load_scenario;
pub use registry::Registry;
