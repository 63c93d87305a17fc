//! Kekulization of aromatic input and aromaticity perception.
//!
//! Aromatic atoms are first given explicit alternating bonds, then every
//! ring of up to ten sp2 atoms is checked against the 4n+2 rule. Running
//! both steps on every input makes the result independent of whether the
//! compound was written in Kekulé or aromatic form.

use super::smiles::{Atom, Bond, BondOrder, SmilesError};

const MAX_RING_SIZE: usize = 10;
/// Upper bound on search steps for both the matching and the ring walk.
const SEARCH_LIMIT: usize = 200_000;

/// Replace aromatic bonds by a Kekulé assignment and clear aromatic flags.
pub(crate) fn kekulize(
    atoms: &mut [Atom],
    bonds: &mut [Bond],
    adjacency: &[Vec<(usize, usize)>],
) -> Result<(), SmilesError> {
    if !atoms.iter().any(|atom| atom.aromatic) && !bonds.iter().any(|bond| bond.order == BondOrder::Aromatic) {
        return Ok(());
    }

    let needs: Vec<bool> = atoms
        .iter()
        .enumerate()
        .map(|(index, atom)| atom.aromatic && needs_double_bond(atom, bonds, &adjacency[index]))
        .collect();

    let mut matching = Matching {
        adjacency,
        bonds,
        needs: &needs,
        partner: vec![None; atoms.len()],
        budget: SEARCH_LIMIT,
    };
    if !matching.solve() {
        return Err(SmilesError::Kekulization);
    }
    let partner = matching.partner;

    for bond in bonds.iter_mut() {
        if bond.order == BondOrder::Aromatic {
            bond.order = if partner[bond.a] == Some(bond.b) {
                BondOrder::Double
            } else {
                BondOrder::Single
            };
        }
    }
    for atom in atoms.iter_mut() {
        atom.aromatic = false;
    }
    Ok(())
}

/// Valence an aromatic atom reaches once its pi bond is written out.
fn pi_valence(atom: &Atom) -> Option<u32> {
    let charge = i32::from(atom.charge);
    let valence = match atom.element.symbol {
        "C" => 4 - charge.abs(),
        "B" => 3 - charge,
        "N" | "P" | "As" => 3 + charge,
        "O" | "S" | "Se" | "Te" => 2 + charge,
        _ => return None,
    };
    u32::try_from(valence).ok()
}

fn needs_double_bond(atom: &Atom, bonds: &[Bond], neighbors: &[(usize, usize)]) -> bool {
    let Some(target) = pi_valence(atom) else {
        return false;
    };
    let used: u32 = u32::from(atom.hydrogens)
        + neighbors
            .iter()
            .map(|&(_, bond)| bonds[bond].order.valence())
            .sum::<u32>();
    used < target
}

/// Perfect matching of the atoms that need a double bond, over aromatic
/// bonds. Backtracks from the most constrained atom.
struct Matching<'a> {
    adjacency: &'a [Vec<(usize, usize)>],
    bonds: &'a [Bond],
    needs: &'a [bool],
    partner: Vec<Option<usize>>,
    budget: usize,
}

impl Matching<'_> {
    fn options(&self, atom: usize) -> Vec<usize> {
        self.adjacency[atom]
            .iter()
            .filter(|&&(other, bond)| {
                self.bonds[bond].order == BondOrder::Aromatic && self.needs[other] && self.partner[other].is_none()
            })
            .map(|&(other, _)| other)
            .collect()
    }

    fn solve(&mut self) -> bool {
        let mut best: Option<(usize, Vec<usize>)> = None;
        for atom in 0..self.needs.len() {
            if !self.needs[atom] || self.partner[atom].is_some() {
                continue;
            }
            let options = self.options(atom);
            if best.as_ref().is_none_or(|(_, current)| options.len() < current.len()) {
                best = Some((atom, options));
            }
        }

        let Some((atom, options)) = best else {
            return true;
        };
        if self.budget == 0 {
            return false;
        }
        self.budget -= 1;

        for other in options {
            self.partner[atom] = Some(other);
            self.partner[other] = Some(atom);
            if self.solve() {
                return true;
            }
            self.partner[atom] = None;
            self.partner[other] = None;
        }
        false
    }
}

/// Per bond: whether it lies on a ring.
pub(crate) fn ring_bonds(bonds: &[Bond], adjacency: &[Vec<(usize, usize)>]) -> Vec<bool> {
    bonds
        .iter()
        .enumerate()
        .map(|(index, bond)| connected_without(adjacency, bond.a, bond.b, index))
        .collect()
}

fn connected_without(adjacency: &[Vec<(usize, usize)>], from: usize, to: usize, skip: usize) -> bool {
    let mut seen = vec![false; adjacency.len()];
    let mut stack = vec![from];
    seen[from] = true;

    while let Some(atom) = stack.pop() {
        if atom == to {
            return true;
        }
        for &(next, bond) in &adjacency[atom] {
            if bond != skip && !seen[next] {
                seen[next] = true;
                stack.push(next);
            }
        }
    }
    false
}

/// Mark atoms and bonds of every ring with 4n+2 pi electrons as aromatic.
pub(crate) fn perceive(atoms: &mut [Atom], bonds: &mut [Bond], adjacency: &[Vec<(usize, usize)>], rings: &[bool]) {
    let electrons: Vec<Option<u32>> = (0..atoms.len())
        .map(|index| pi_electrons(atoms, bonds, &adjacency[index], rings, index))
        .collect();

    let mut search = RingSearch {
        adjacency,
        rings,
        electrons: &electrons,
        start: 0,
        path: Vec::new(),
        path_bonds: Vec::new(),
        on_path: vec![false; atoms.len()],
        steps: 0,
        aromatic_atoms: vec![false; atoms.len()],
        aromatic_bonds: vec![false; bonds.len()],
    };
    for start in 0..atoms.len() {
        if electrons[start].is_some() {
            search.from(start);
        }
    }

    for (atom, aromatic) in atoms.iter_mut().zip(&search.aromatic_atoms) {
        if *aromatic {
            atom.aromatic = true;
        }
    }
    for (bond, aromatic) in bonds.iter_mut().zip(&search.aromatic_bonds) {
        if *aromatic {
            bond.order = BondOrder::Aromatic;
        }
    }
}

/// Pi electrons a ring atom gives to the ring, or `None` when it cannot take
/// part in an aromatic ring.
fn pi_electrons(
    atoms: &[Atom],
    bonds: &[Bond],
    neighbors: &[(usize, usize)],
    rings: &[bool],
    index: usize,
) -> Option<u32> {
    let atom = &atoms[index];
    if !neighbors.iter().any(|&(_, bond)| rings[bond]) {
        return None;
    }

    let mut ring_double = 0;
    let mut exocyclic_hetero = false;
    for &(other, bond) in neighbors {
        match bonds[bond].order {
            BondOrder::Single => {}
            BondOrder::Double if rings[bond] => ring_double += 1,
            BondOrder::Double
                if atom.element.is_carbon() && matches!(atoms[other].element.symbol, "N" | "O" | "S") =>
            {
                exocyclic_hetero = true;
            }
            _ => return None,
        }
    }

    match (ring_double, exocyclic_hetero) {
        (1, false) => return Some(1),
        (0, true) => return Some(0),
        (0, false) => {}
        _ => return None,
    }

    // No multiple bonds: a lone pair or an empty orbital
    let degree = neighbors.len() + usize::from(atom.hydrogens);
    match (atom.element.symbol, atom.charge, degree) {
        ("C", -1, 3) => Some(2),
        ("C", 1, 3) | ("B", 0, 3) => Some(0),
        ("N" | "P" | "As", 0, 3) => Some(2),
        ("O" | "S" | "Se" | "Te", 0, 2) => Some(2),
        _ => None,
    }
}

/// Enumerates simple rings through candidate atoms, each ring once, with
/// the lowest-indexed atom as `start`.
struct RingSearch<'a> {
    adjacency: &'a [Vec<(usize, usize)>],
    rings: &'a [bool],
    electrons: &'a [Option<u32>],
    start: usize,
    path: Vec<usize>,
    path_bonds: Vec<usize>,
    on_path: Vec<bool>,
    steps: usize,
    aromatic_atoms: Vec<bool>,
    aromatic_bonds: Vec<bool>,
}

impl RingSearch<'_> {
    fn from(&mut self, start: usize) {
        self.start = start;
        self.path.push(start);
        self.on_path[start] = true;
        self.extend(start);
        self.on_path[start] = false;
        self.path.pop();
    }

    fn extend(&mut self, atom: usize) {
        if self.steps >= SEARCH_LIMIT {
            return;
        }
        self.steps += 1;

        let adjacency = self.adjacency;
        for &(next, bond) in &adjacency[atom] {
            if !self.rings[bond] {
                continue;
            }
            // Closing on the start; visit each ring in one direction only
            if next == self.start {
                if self.path.len() >= 3 && self.path[1] < atom {
                    self.close(bond);
                }
                continue;
            }
            if next < self.start
                || self.on_path[next]
                || self.electrons[next].is_none()
                || self.path.len() >= MAX_RING_SIZE
            {
                continue;
            }

            self.path.push(next);
            self.path_bonds.push(bond);
            self.on_path[next] = true;
            self.extend(next);
            self.on_path[next] = false;
            self.path_bonds.pop();
            self.path.pop();
        }
    }

    fn close(&mut self, closing_bond: usize) {
        let total: u32 = self.path.iter().filter_map(|&atom| self.electrons[atom]).sum();
        if total % 4 != 2 {
            return;
        }
        for &atom in &self.path {
            self.aromatic_atoms[atom] = true;
        }
        for &bond in self.path_bonds.iter().chain(std::iter::once(&closing_bond)) {
            self.aromatic_bonds[bond] = true;
        }
    }
}
