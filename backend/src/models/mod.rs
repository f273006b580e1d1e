//! Domain models for the session pipeline

pub mod event;
pub mod particle;
pub mod registry;

// Re-exports
pub use event::EventId;
pub use particle::{IonSpec, ParticleHandle, ParticleRecord};
pub use registry::{MaterialRegistry, ParticleRegistry, RegistryError, UNREGISTERED_INDEX};
