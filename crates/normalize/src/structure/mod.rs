//! Molecular structure handling for compound identifiers.

mod aromaticity;
pub mod canonical;
pub mod descriptors;
pub mod elements;
pub mod smiles;

pub use canonical::canonical_smiles;
pub use smiles::{Molecule, SmilesError};

use thiserror::Error;

/// What the normalizer needs to know about a parsed compound.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureSummary {
    pub canonical_smiles: String,
    pub mw: f64,
    pub logp: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("structure parsing is not available")]
    Unavailable,
    #[error("invalid SMILES: {0}")]
    Parse(#[from] SmilesError),
}

/// Parses compound identifiers into canonical form plus descriptors.
pub trait StructureToolkit: Send + Sync {
    fn analyze(&self, identifier: &str) -> Result<StructureSummary, StructureError>;
}

/// Built-in SMILES toolkit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmilesToolkit;

impl StructureToolkit for SmilesToolkit {
    fn analyze(&self, identifier: &str) -> Result<StructureSummary, StructureError> {
        let mol = Molecule::parse(identifier)?;

        Ok(StructureSummary {
            canonical_smiles: canonical_smiles(&mol),
            mw: descriptors::molecular_weight(&mol),
            logp: descriptors::crippen_logp(&mol),
        })
    }
}

/// Stand-in used when structure parsing is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableToolkit;

impl StructureToolkit for UnavailableToolkit {
    fn analyze(&self, _identifier: &str) -> Result<StructureSummary, StructureError> {
        Err(StructureError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smiles_toolkit() {
        let summary = SmilesToolkit.analyze("OCC").unwrap();
        assert_eq!(summary.canonical_smiles, "CCO");
        assert!(summary.mw > 46.0 && summary.mw < 46.1);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let error = SmilesToolkit.analyze("C1CC").unwrap_err();
        assert!(matches!(error, StructureError::Parse(SmilesError::UnclosedRing { label: 1 })));
    }

    #[test]
    fn test_unavailable_toolkit() {
        assert_eq!(UnavailableToolkit.analyze("CCO"), Err(StructureError::Unavailable));
    }
}
