pub mod artifact_loader;
pub mod mock;
pub mod observability;

pub use artifact_loader::ArtifactLoader;
