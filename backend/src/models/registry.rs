//! Particle and material registries
//!
//! Both registries map a declared name to the small integer index written
//! into output records. They are filled once at session start and never
//! renumbered afterwards.
//!
//! # Lookup policy
//!
//! - Particles: an unknown name is a soft failure. The name is remembered in
//!   a deduplicated set (reported in the receipt) and the caller receives
//!   `None`, written to the wire as [`UNREGISTERED_INDEX`].
//! - Materials: an unknown name is fatal ([`RegistryError::UnregisteredMaterial`]).
//!
//! Declaring the same name twice keeps the index of the later declaration.

use crate::models::particle::ParticleHandle;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Index written for particles absent from the declared list
pub const UNREGISTERED_INDEX: i32 = -1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Found deposition in materials not listed in the config json: {0}")]
    UnregisteredMaterial(String),
}

/// Declared particles: name → index, index → engine handle
#[derive(Debug, Clone, Default)]
pub struct ParticleRegistry {
    indices: HashMap<String, usize>,
    handles: Vec<ParticleHandle>,
    seen_unregistered: BTreeSet<String>,
}

impl ParticleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a declared particle, returning its index
    pub fn register(&mut self, name: &str, handle: ParticleHandle) -> usize {
        let index = self.handles.len();
        self.handles.push(handle);
        self.indices.insert(name.to_string(), index);
        index
    }

    /// Index of a declared particle
    ///
    /// Unknown names are recorded for the receipt and yield `None`.
    ///
    /// # Example
    /// ```
    /// use g4ants_session_core::models::registry::ParticleRegistry;
    /// use g4ants_session_core::ParticleHandle;
    ///
    /// let mut registry = ParticleRegistry::new();
    /// registry.register("gamma", ParticleHandle(22));
    ///
    /// assert_eq!(registry.lookup("gamma"), Some(0));
    /// assert_eq!(registry.lookup("Ar40"), None);
    /// assert_eq!(registry.seen_unregistered().count(), 1);
    /// ```
    pub fn lookup(&mut self, name: &str) -> Option<usize> {
        match self.indices.get(name) {
            Some(index) => Some(*index),
            None => {
                if !self.seen_unregistered.contains(name) {
                    self.seen_unregistered.insert(name.to_string());
                }
                None
            }
        }
    }

    /// Wire form of [`lookup`](Self::lookup)
    pub fn wire_index(&mut self, name: &str) -> i32 {
        self.lookup(name)
            .map_or(UNREGISTERED_INDEX, |index| index as i32)
    }

    /// Engine handle for a particle-table index (text primaries)
    pub fn handle(&self, index: usize) -> Option<ParticleHandle> {
        self.handles.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Names seen in lookups but never declared, sorted
    pub fn seen_unregistered(&self) -> impl Iterator<Item = &str> {
        self.seen_unregistered.iter().map(String::as_str)
    }
}

/// Declared materials: name → index
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    indices: HashMap<String, usize>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the declaration order of the config
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut registry = Self::new();
        for (index, name) in names.iter().enumerate() {
            registry.indices.insert(name.as_ref().to_string(), index);
        }
        registry
    }

    /// Make `alias` resolve to the index of an already declared material
    ///
    /// Used when a declared material is swapped for a standard-library
    /// definition, which then appears in the geometry under its own name.
    pub fn alias(&mut self, alias: &str, existing: &str) -> Result<usize, RegistryError> {
        let index = self.find(existing)?;
        self.indices.insert(alias.to_string(), index);
        Ok(index)
    }

    pub fn find(&self, name: &str) -> Result<usize, RegistryError> {
        self.indices
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnregisteredMaterial(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(names: &[&str]) -> ParticleRegistry {
        let mut registry = ParticleRegistry::new();
        for (i, name) in names.iter().enumerate() {
            registry.register(name, ParticleHandle(i as u32 + 100));
        }
        registry
    }

    #[test]
    fn test_registered_particle_lookup_is_stable() {
        let mut registry = registry_with(&["gamma", "e-"]);
        for _ in 0..3 {
            assert_eq!(registry.lookup("e-"), Some(1));
        }
        assert_eq!(registry.seen_unregistered().count(), 0);
    }

    #[test]
    fn test_unregistered_particle_recorded_once() {
        let mut registry = registry_with(&["gamma"]);
        for _ in 0..5 {
            assert_eq!(registry.wire_index("neutron"), UNREGISTERED_INDEX);
        }
        registry.lookup("alpha");
        let seen: Vec<&str> = registry.seen_unregistered().collect();
        assert_eq!(seen, vec!["alpha", "neutron"]);
    }

    #[test]
    fn test_duplicate_particle_last_declaration_wins() {
        let mut registry = registry_with(&["gamma", "e-", "gamma"]);
        assert_eq!(registry.lookup("gamma"), Some(2));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.handle(0), Some(ParticleHandle(100)));
    }

    #[test]
    fn test_material_lookup() {
        let registry = MaterialRegistry::from_names(&["Water", "Air"]);
        assert_eq!(registry.find("Air"), Ok(1));
        assert_eq!(registry.find("Air"), Ok(1));
        assert_eq!(
            registry.find("Lead"),
            Err(RegistryError::UnregisteredMaterial("Lead".to_string()))
        );
    }

    #[test]
    fn test_duplicate_material_last_declaration_wins() {
        let registry = MaterialRegistry::from_names(&["Water", "Air", "Water"]);
        assert_eq!(registry.find("Water"), Ok(2));
    }

    #[test]
    fn test_material_alias() {
        let mut registry = MaterialRegistry::from_names(&["Water", "Alu"]);
        assert_eq!(registry.alias("G4_Al", "Alu"), Ok(1));
        assert_eq!(registry.find("G4_Al"), Ok(1));
        assert!(registry.alias("G4_Pb", "Lead").is_err());
    }
}
