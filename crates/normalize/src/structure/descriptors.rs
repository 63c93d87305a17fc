//! Molecular descriptors: average molecular weight and an atom-contribution
//! logP in the style of Wildman & Crippen (1999).
//!
//! The logP typing covers the common C/N/O/S/P/halogen environments with the
//! published contribution values; rarer environments fall back to the
//! closest generic class.

use super::elements;
use super::smiles::{BondOrder, Molecule};

/// Sum of atomic weights including implicit hydrogens
pub fn molecular_weight(mol: &Molecule) -> f64 {
    let hydrogen = elements::hydrogen().mass;
    mol.atoms()
        .iter()
        .map(|atom| atom.mass() + f64::from(atom.hydrogens) * hydrogen)
        .sum()
}

pub fn crippen_logp(mol: &Molecule) -> f64 {
    (0..mol.atoms().len())
        .map(|index| {
            let atom = &mol.atoms()[index];
            if atom.element.atomic_number == 1 {
                // Explicit hydrogen atom, typed by what it is attached to
                return mol
                    .neighbors(index)
                    .first()
                    .map_or(HS, |&(heavy, _)| hydrogen_contribution(mol, heavy));
            }
            heavy_contribution(mol, index) + f64::from(atom.hydrogens) * hydrogen_contribution(mol, index)
        })
        .sum()
}

const H1_HYDROCARBON: f64 = 0.1230;
const H2_ALCOHOL: f64 = -0.2677;
const H3_AMINE: f64 = 0.2142;
const HS: f64 = 0.1125;

fn hydrogen_contribution(mol: &Molecule, heavy: usize) -> f64 {
    match mol.atoms()[heavy].element.atomic_number {
        6 => H1_HYDROCARBON,
        7 => H3_AMINE,
        8 => H2_ALCOHOL,
        _ => HS,
    }
}

/// Local environment of a heavy atom used for typing.
struct Environment {
    hydrogens: u8,
    aromatic_neighbors: usize,
    hetero_neighbors: usize,
    /// Element of a multiply bonded neighbour, with the bond order
    multiple: Option<(u8, BondOrder)>,
    /// Element and aromaticity of a neighbour reached by a non-aromatic bond
    substituent: Option<(u8, bool)>,
}

fn environment(mol: &Molecule, index: usize) -> Environment {
    let mut env = Environment {
        hydrogens: mol.atoms()[index].hydrogens,
        aromatic_neighbors: 0,
        hetero_neighbors: 0,
        multiple: None,
        substituent: None,
    };

    for &(neighbor, bond) in mol.neighbors(index) {
        let other = &mol.atoms()[neighbor];
        let order = mol.bonds()[bond].order;
        let number = other.element.atomic_number;

        if number == 1 {
            env.hydrogens += 1;
            continue;
        }
        if other.aromatic {
            env.aromatic_neighbors += 1;
        }
        if number != 6 {
            env.hetero_neighbors += 1;
        }
        match order {
            BondOrder::Double | BondOrder::Triple | BondOrder::Quadruple => {
                env.multiple = Some((number, order));
            }
            BondOrder::Single => {
                env.substituent = Some((number, other.aromatic));
            }
            BondOrder::Aromatic => {}
        }
    }

    env
}

fn heavy_contribution(mol: &Molecule, index: usize) -> f64 {
    let atom = &mol.atoms()[index];
    let env = environment(mol, index);

    match atom.element.symbol {
        "C" if atom.aromatic => aromatic_carbon(&env),
        "C" => aliphatic_carbon(&env),
        "N" => nitrogen(atom.aromatic, atom.charge, &env),
        "O" => oxygen(mol, index, &env),
        "S" if atom.aromatic => 0.6237,
        "S" if atom.charge != 0 => -0.0024,
        "S" => 0.6482,
        "P" => 0.8612,
        "F" => 0.4202,
        "Cl" => 0.6895,
        "Br" => 0.8456,
        "I" => 0.8857,
        _ => 0.0,
    }
}

fn aliphatic_carbon(env: &Environment) -> f64 {
    match env.multiple {
        Some((number, _)) if number != 6 => return -0.2783,
        Some((_, BondOrder::Triple)) => return 0.0017,
        Some(_) => return 0.1551,
        None => {}
    }

    if env.aromatic_neighbors > 0 {
        return match env.hydrogens {
            3 => 0.08452,
            2 => -0.0516,
            1 => 0.1193,
            _ => -0.0967,
        };
    }

    if env.hetero_neighbors > 0 {
        return if env.hydrogens >= 2 { -0.2035 } else { -0.2051 };
    }

    if env.hydrogens >= 2 { 0.1441 } else { 0.0 }
}

fn aromatic_carbon(env: &Environment) -> f64 {
    if env.hydrogens > 0 {
        return 0.1581;
    }
    if let Some((number, _)) = env.multiple {
        if matches!(number, 6..=8) {
            return -0.8186;
        }
    }
    match env.substituent {
        None => 0.2955,
        Some((9, _)) => 0.0,
        Some((17, _)) => 0.2450,
        Some((35, _)) => 0.1980,
        Some((53, _)) => 0.0,
        Some((7, _)) => 0.4619,
        Some((8, _)) => 0.5437,
        Some((16, _)) => 0.1893,
        Some((_, true)) => 0.2713,
        Some((6, false)) => 0.1360,
        Some(_) => -0.5443,
    }
}

fn nitrogen(aromatic: bool, charge: i8, env: &Environment) -> f64 {
    if aromatic {
        return -0.4806;
    }
    if charge != 0 {
        return -0.3239;
    }
    match env.multiple {
        Some((_, BondOrder::Triple)) => return -0.2613,
        Some(_) => return 0.08387,
        None => {}
    }
    match (env.hydrogens, env.aromatic_neighbors > 0) {
        (h, false) if h >= 2 => -1.0190,
        (h, true) if h >= 2 => -1.0270,
        (1, false) => -0.7096,
        (1, true) => -0.5188,
        _ => match env.aromatic_neighbors {
            0 => -0.3187,
            1 => -0.4458,
            _ => 0.01508,
        },
    }
}

fn oxygen(mol: &Molecule, index: usize, env: &Environment) -> f64 {
    let atom = &mol.atoms()[index];
    if atom.aromatic {
        return 0.1552;
    }
    if atom.charge < 0 {
        return -1.1890;
    }
    if let Some((number, _)) = env.multiple {
        return match number {
            6 => carbonyl_oxygen(mol, index),
            _ => 0.0335,
        };
    }
    if env.hydrogens > 0 {
        return -0.2893;
    }
    if env.aromatic_neighbors > 0 { -0.4195 } else { -0.0684 }
}

/// Carbonyl oxygens are typed by the carbon they sit on: plain aliphatic,
/// conjugated with an aromatic ring, or part of an acid/ester/amide.
fn carbonyl_oxygen(mol: &Molecule, index: usize) -> f64 {
    let carbon = mol.neighbors(index).iter().find(|&&(neighbor, bond)| {
        mol.bonds()[bond].order == BondOrder::Double && mol.atoms()[neighbor].element.is_carbon()
    });

    let Some(&(carbon, _)) = carbon else {
        return -0.1526;
    };

    let env = environment(mol, carbon);
    if env.hetero_neighbors > 1 {
        0.4833
    } else if mol.atoms()[carbon].aromatic || env.aromatic_neighbors > 0 {
        0.1129
    } else {
        -0.1526
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mol(smiles: &str) -> Molecule {
        Molecule::parse(smiles).unwrap()
    }

    #[test]
    fn test_molecular_weight() {
        assert!((molecular_weight(&mol("CCO")) - 46.069).abs() < 1e-3);
        assert!((molecular_weight(&mol("O")) - 18.015).abs() < 1e-3);
        assert!((molecular_weight(&mol("c1ccccc1")) - 78.114).abs() < 1e-3);
    }

    #[test]
    fn test_isotope_mass() {
        assert!((molecular_weight(&mol("[13CH4]")) - (13.0 + 4.0 * 1.008)).abs() < 1e-9);
    }

    #[test]
    fn test_ethanol_logp() {
        assert!((crippen_logp(&mol("CCO")) - (-0.0014)).abs() < 1e-3);
    }

    #[test]
    fn test_logp_ordering() {
        // Hydrocarbons are more lipophilic than their hydroxylated analogues
        assert!(crippen_logp(&mol("CCCCCC")) > crippen_logp(&mol("OCCCCCO")));
        assert!(crippen_logp(&mol("c1ccccc1Cl")) > crippen_logp(&mol("c1ccccc1")));
    }

    #[test]
    fn test_logp_independent_of_atom_order() {
        assert!((crippen_logp(&mol("CCO")) - crippen_logp(&mol("OCC"))).abs() < 1e-9);
    }
}
