//! Primary particle records and particle-name grammar
//!
//! A [`ParticleRecord`] is one particle to inject into an event. Species are
//! referenced through an opaque [`ParticleHandle`] issued by the transport
//! engine's particle table, so this layer never owns particle definitions.
//!
//! Names that the engine's particle table does not know may still denote an
//! ion, written as element symbol + mass number with an optional excitation
//! energy in keV:
//!
//! ```text
//! Ar40          Z = 18, A = 40
//! C12[4438.9]   Z = 6,  A = 12, excitation 4438.9 keV
//! ```

use serde::{Deserialize, Serialize};

/// Opaque reference to a particle definition owned by the transport engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticleHandle(pub u32);

/// One primary particle of an event
///
/// Units follow the wire formats: energy in keV, position in mm, time in ns.
/// The direction is passed through exactly as read.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleRecord {
    pub particle: ParticleHandle,
    pub energy: f64,
    pub position: [f64; 3],
    pub direction: [f64; 3],
    pub time: f64,
}

/// Element symbols ordered by atomic number (H = 1 ... Hs = 108)
const ELEMENTS: [&str; 108] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs",
];

/// Atomic number for an element symbol, if known
pub fn atomic_number(symbol: &str) -> Option<u32> {
    ELEMENTS
        .iter()
        .position(|s| *s == symbol)
        .map(|i| i as u32 + 1)
}

/// Ion identified by a name such as `Ar40` or `C12[4438.9]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IonSpec {
    pub z: u32,
    pub a: u32,
    /// Excitation energy (keV)
    pub excitation: f64,
}

impl IonSpec {
    /// Parse the ion-name grammar
    ///
    /// Returns `None` when the text is not a valid ion name.
    ///
    /// # Example
    /// ```
    /// use g4ants_session_core::models::particle::IonSpec;
    ///
    /// let ion = IonSpec::parse("C12[4438.9]").unwrap();
    /// assert_eq!((ion.z, ion.a), (6, 12));
    /// assert_eq!(ion.excitation, 4438.9);
    ///
    /// assert!(IonSpec::parse("gamma").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() < 2 || !bytes[0].is_ascii_uppercase() {
            return None;
        }

        let symbol_len = if bytes[1].is_ascii_lowercase() { 2 } else { 1 };
        let z = atomic_number(&text[..symbol_len])?;

        let rest = &text[symbol_len..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let a: u32 = rest[..digits].parse().ok()?;
        if a == 0 {
            return None;
        }

        let tail = &rest[digits..];
        if tail.is_empty() {
            return Some(Self { z, a, excitation: 0.0 });
        }

        let excitation = tail
            .strip_prefix('[')?
            .strip_suffix(']')?
            .trim()
            .parse::<f64>()
            .ok()?;

        Some(Self { z, a, excitation })
    }
}
