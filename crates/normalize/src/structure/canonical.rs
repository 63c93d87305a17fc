//! Canonical SMILES writer.
//!
//! Atoms are ranked from local invariants, the ranks are refined from
//! neighbour ranks until stable, and remaining ties are broken one atom at a
//! time. The writer then walks each component depth-first from its
//! lowest-ranked atom, always taking neighbours in rank order, so any two
//! inputs describing the same graph produce the same string.
//!
//! Stereo marks are kept only where they describe a real stereocentre: a
//! tetrahedral atom with four different neighbours, or a double bond whose
//! ends each carry distinguishable substituents. `@`/`@@` and `/`/`\` are
//! recomputed for the output order.

use std::collections::BTreeSet;

use super::smiles::{implicit_hydrogens, Atom, BondOrder, Direction, Molecule, Neighbor};

pub fn canonical_smiles(mol: &Molecule) -> String {
    let stereo = Stereocentres::resolve(mol);
    let ranks = rank_atoms(mol, &stereo);
    Writer::new(mol, &ranks, &stereo).write()
}

/// Dense canonical rank per atom, `0..atoms.len()`.
pub fn canonical_ranks(mol: &Molecule) -> Vec<usize> {
    rank_atoms(mol, &Stereocentres::resolve(mol))
}

type Invariant = (u8, usize, u8, i8, u16, bool);

fn invariants(mol: &Molecule) -> Vec<Invariant> {
    mol.atoms()
        .iter()
        .enumerate()
        .map(|(index, atom)| {
            (
                atom.element.atomic_number,
                mol.neighbors(index).len(),
                atom.hydrogens,
                atom.charge,
                atom.isotope.unwrap_or(0),
                atom.aromatic,
            )
        })
        .collect()
}

fn rank_atoms(mol: &Molecule, stereo: &Stereocentres) -> Vec<usize> {
    let n = mol.atoms().len();
    let keys: Vec<(Invariant, bool)> = invariants(mol)
        .into_iter()
        .enumerate()
        .map(|(index, invariant)| (invariant, stereo.involves(mol, index)))
        .collect();

    let mut ranks = refine(mol, dense_ranks(&keys));

    while class_count(&ranks) < n {
        let mut counts = vec![0usize; n];
        for &rank in &ranks {
            counts[rank] += 1;
        }
        let Some(tied) = counts.iter().position(|&count| count > 1) else {
            break;
        };
        let Some(chosen) = ranks.iter().position(|&rank| rank == tied) else {
            break;
        };

        let split: Vec<(usize, u8)> = ranks
            .iter()
            .enumerate()
            .map(|(index, &rank)| (rank, u8::from(index != chosen)))
            .collect();
        ranks = refine(mol, dense_ranks(&split));
    }

    ranks
}

fn refine(mol: &Molecule, mut ranks: Vec<usize>) -> Vec<usize> {
    loop {
        let keys: Vec<(usize, Vec<(usize, BondOrder)>)> = (0..ranks.len())
            .map(|index| {
                let mut around: Vec<(usize, BondOrder)> = mol
                    .neighbors(index)
                    .iter()
                    .map(|&(neighbor, bond)| (ranks[neighbor], mol.bonds()[bond].order))
                    .collect();
                around.sort();
                (ranks[index], around)
            })
            .collect();

        let next = dense_ranks(&keys);
        if class_count(&next) == class_count(&ranks) {
            return next;
        }
        ranks = next;
    }
}

fn dense_ranks<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

    let mut ranks = vec![0; keys.len()];
    let mut rank = 0;
    for (position, &index) in order.iter().enumerate() {
        if position > 0 && keys[index] != keys[order[position - 1]] {
            rank += 1;
        }
        ranks[index] = rank;
    }
    ranks
}

fn class_count(ranks: &[usize]) -> usize {
    ranks.iter().max().map_or(0, |&max| max + 1)
}

/// Stereo marks that describe an actual stereocentre.
struct Stereocentres {
    /// Per atom
    tetrahedral: Vec<bool>,
    /// Per bond
    double_bonds: Vec<bool>,
}

impl Stereocentres {
    fn resolve(mol: &Molecule) -> Self {
        let classes = refine(mol, dense_ranks(&invariants(mol)));
        let distinct = |atom: usize, skip: Option<usize>| {
            let mut seen = BTreeSet::new();
            mol.neighbors(atom)
                .iter()
                .filter(|&&(neighbor, _)| Some(neighbor) != skip)
                .all(|&(neighbor, _)| seen.insert(classes[neighbor]))
        };

        let tetrahedral = (0..mol.atoms().len())
            .map(|atom| mol.atoms()[atom].chirality.is_some() && distinct(atom, None))
            .collect();
        let double_bonds = mol
            .bonds()
            .iter()
            .map(|bond| bond.stereo.is_some() && distinct(bond.a, Some(bond.b)) && distinct(bond.b, Some(bond.a)))
            .collect();

        Self { tetrahedral, double_bonds }
    }

    fn involves(&self, mol: &Molecule, atom: usize) -> bool {
        self.tetrahedral[atom] || mol.neighbors(atom).iter().any(|&(_, bond)| self.double_bonds[bond])
    }
}

/// Substituent chosen to carry the `/` `\` mark on one end of a double bond.
#[derive(Debug, Clone, Copy)]
struct Reference {
    atom: usize,
    bond: usize,
    /// The substituent is written before the double-bond atom
    from_parent: bool,
}

impl Reference {
    /// Converts a written mark into the direction pointing away from the
    /// double bond, and back.
    fn outward(self, mark: Direction) -> Direction {
        if self.from_parent { mark.flip() } else { mark }
    }
}

struct Writer<'a> {
    mol: &'a Molecule,
    ranks: &'a [usize],
    stereo: &'a Stereocentres,
    visit_order: Vec<Option<usize>>,
    bond_used: Vec<bool>,
    parent: Vec<Option<(usize, usize)>>,
    children: Vec<Vec<(usize, usize)>>,
    ring_opens: Vec<Vec<usize>>,
    ring_closes: Vec<Vec<usize>>,
    ring_labels: Vec<Option<u16>>,
    marks: Vec<Option<Direction>>,
    free_labels: BTreeSet<u16>,
    next_label: u16,
    out: String,
}

impl<'a> Writer<'a> {
    fn new(mol: &'a Molecule, ranks: &'a [usize], stereo: &'a Stereocentres) -> Self {
        let n = mol.atoms().len();
        Self {
            mol,
            ranks,
            stereo,
            visit_order: vec![None; n],
            bond_used: vec![false; mol.bonds().len()],
            parent: vec![None; n],
            children: vec![Vec::new(); n],
            ring_opens: vec![Vec::new(); n],
            ring_closes: vec![Vec::new(); n],
            ring_labels: vec![None; mol.bonds().len()],
            marks: vec![None; mol.bonds().len()],
            free_labels: BTreeSet::new(),
            next_label: 1,
            out: String::new(),
        }
    }

    fn write(mut self) -> String {
        let mut by_rank: Vec<usize> = (0..self.mol.atoms().len()).collect();
        by_rank.sort_by_key(|&index| self.ranks[index]);

        let mut roots = Vec::new();
        let mut counter = 0;
        for &atom in &by_rank {
            if self.visit_order[atom].is_none() {
                roots.push(atom);
                self.plan(atom, &mut counter);
            }
        }
        self.assign_marks();

        for (component, &root) in roots.iter().enumerate() {
            if component > 0 {
                self.out.push('.');
            }
            self.emit(root);
        }

        self.out
    }

    /// First pass: fix the spanning tree and which bonds become ring closures.
    fn plan(&mut self, atom: usize, counter: &mut usize) {
        self.visit_order[atom] = Some(*counter);
        *counter += 1;

        let mut neighbors = self.mol.neighbors(atom).to_vec();
        neighbors.sort_by_key(|&(neighbor, _)| self.ranks[neighbor]);

        for (neighbor, bond) in neighbors {
            if self.bond_used[bond] {
                continue;
            }
            self.bond_used[bond] = true;

            match self.visit_order[neighbor] {
                Some(seen) => {
                    let (opener, closer) = if Some(seen) < self.visit_order[atom] {
                        (neighbor, atom)
                    } else {
                        (atom, neighbor)
                    };
                    self.ring_opens[opener].push(bond);
                    self.ring_closes[closer].push(bond);
                }
                None => {
                    self.children[atom].push((neighbor, bond));
                    self.parent[neighbor] = Some((atom, bond));
                    self.plan(neighbor, counter);
                }
            }
        }
    }

    /// Pick `/` `\` for the tree bonds next to each stereo double bond, in
    /// the order the double bonds are reached.
    fn assign_marks(&mut self) {
        let mut double_bonds: Vec<usize> = (0..self.mol.bonds().len())
            .filter(|&bond| self.stereo.double_bonds[bond])
            .collect();
        double_bonds.sort_by_key(|&bond| {
            let bond = &self.mol.bonds()[bond];
            self.visit_order[bond.a].min(self.visit_order[bond.b])
        });

        let mut ends = vec![false; self.mol.atoms().len()];
        for &bond in &double_bonds {
            let bond = &self.mol.bonds()[bond];
            ends[bond.a] = true;
            ends[bond.b] = true;
        }

        for index in double_bonds {
            let bond = self.mol.bonds()[index];
            let Some(stereo) = bond.stereo else { continue };
            let (Some(a_side), Some(b_side)) = (
                self.reference(bond.a, bond.b, &ends),
                self.reference(bond.b, bond.a, &ends),
            ) else {
                continue;
            };

            // Relative to the chosen substituents rather than the parsed ones
            let cis = stereo.cis ^ (a_side.atom != stereo.a_ref) ^ (b_side.atom != stereo.b_ref);
            let across = |outward: Direction| if cis { outward } else { outward.flip() };

            let (first, second) = if self.visit_order[bond.a] <= self.visit_order[bond.b] {
                (a_side, b_side)
            } else {
                (b_side, a_side)
            };

            match (self.marks[first.bond], self.marks[second.bond]) {
                (None, None) => {
                    self.marks[first.bond] = Some(Direction::Up);
                    let outward = first.outward(Direction::Up);
                    self.marks[second.bond] = Some(second.outward(across(outward)));
                }
                (Some(mark), None) => {
                    self.marks[second.bond] = Some(second.outward(across(first.outward(mark))));
                }
                (None, Some(mark)) => {
                    self.marks[first.bond] = Some(first.outward(across(second.outward(mark))));
                }
                (Some(_), Some(_)) => {}
            }
        }
    }

    /// Single-bonded tree neighbour of `end` (other than `partner`) to carry
    /// the mark. Conjugated double bonds share the bond between them, so an
    /// already marked bond comes first, then one leading to another stereo
    /// double bond, then the lowest rank.
    fn reference(&self, end: usize, partner: usize, ends: &[bool]) -> Option<Reference> {
        let usable = |atom: usize, bond: usize| atom != partner && self.mol.bonds()[bond].order == BondOrder::Single;

        let parent = self.parent[end]
            .filter(|&(atom, bond)| usable(atom, bond))
            .map(|(atom, bond)| Reference { atom, bond, from_parent: true });
        let children = self.children[end]
            .iter()
            .filter(|&&(atom, bond)| usable(atom, bond))
            .map(|&(atom, bond)| Reference { atom, bond, from_parent: false });

        parent
            .into_iter()
            .chain(children)
            .min_by_key(|reference| {
                (
                    self.marks[reference.bond].is_none(),
                    !ends[reference.atom],
                    self.ranks[reference.atom],
                )
            })
    }

    /// Second pass: emit atoms, ring labels and branches in planned order.
    fn emit(&mut self, atom: usize) {
        let symbol = self.atom_symbol(atom);
        self.out.push_str(&symbol);

        for bond in self.ring_closes[atom].clone() {
            if let Some(label) = self.ring_labels[bond] {
                self.out.push_str(&label_text(label));
                self.free_labels.insert(label);
            }
        }

        for bond in self.ring_opens[atom].clone() {
            let label = self.take_label();
            self.ring_labels[bond] = Some(label);
            let symbol = bond_symbol(self.mol, bond);
            self.out.push_str(symbol);
            self.out.push_str(&label_text(label));
        }

        let children = self.children[atom].clone();
        let last = children.len().saturating_sub(1);
        for (position, (child, bond)) in children.into_iter().enumerate() {
            let branch = position < last;
            if branch {
                self.out.push('(');
            }
            let symbol = match self.marks[bond] {
                Some(Direction::Up) => "/",
                Some(Direction::Down) => "\\",
                None => bond_symbol(self.mol, bond),
            };
            self.out.push_str(symbol);
            self.emit(child);
            if branch {
                self.out.push(')');
            }
        }
    }

    fn take_label(&mut self) -> u16 {
        if let Some(label) = self.free_labels.pop_first() {
            return label;
        }
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    fn atom_symbol(&self, index: usize) -> String {
        let atom = &self.mol.atoms()[index];
        let symbol = if atom.aromatic {
            atom.element.symbol.to_lowercase()
        } else {
            atom.element.symbol.to_string()
        };

        let chirality = self.chirality_mark(index);
        if chirality.is_none() && !needs_bracket(self.mol, index, atom) {
            return symbol;
        }

        let mut text = String::from("[");
        if let Some(isotope) = atom.isotope {
            text.push_str(&isotope.to_string());
        }
        text.push_str(&symbol);
        if let Some(mark) = chirality {
            text.push_str(mark);
        }
        match atom.hydrogens {
            0 => {}
            1 => text.push('H'),
            h => text.push_str(&format!("H{}", h)),
        }
        match atom.charge {
            0 => {}
            1 => text.push('+'),
            -1 => text.push('-'),
            c if c > 0 => text.push_str(&format!("+{}", c)),
            c => text.push_str(&format!("-{}", -i16::from(c))),
        }
        text.push(']');
        text
    }

    /// `@` or `@@` for the neighbour order this atom is written with.
    fn chirality_mark(&self, index: usize) -> Option<&'static str> {
        if !self.stereo.tetrahedral[index] {
            return None;
        }
        let atom = &self.mol.atoms()[index];
        let chirality = atom.chirality.as_ref()?;

        let other_end = |bond: usize| {
            let bond = &self.mol.bonds()[bond];
            if bond.a == index { bond.b } else { bond.a }
        };

        let mut written = Vec::with_capacity(4);
        if let Some((parent, _)) = self.parent[index] {
            written.push(Neighbor::Atom(parent));
        }
        if atom.hydrogens > 0 {
            written.push(Neighbor::ImplicitHydrogen);
        }
        written.extend(
            self.ring_closes[index]
                .iter()
                .chain(&self.ring_opens[index])
                .map(|&bond| Neighbor::Atom(other_end(bond))),
        );
        written.extend(self.children[index].iter().map(|&(child, _)| Neighbor::Atom(child)));

        let clockwise = chirality.clockwise ^ odd_permutation(&chirality.order, &written)?;
        Some(if clockwise { "@@" } else { "@" })
    }
}

/// Parity of the permutation taking `from` to `to`; `None` when they do not
/// hold the same neighbours.
fn odd_permutation(from: &[Neighbor], to: &[Neighbor]) -> Option<bool> {
    if from.len() != to.len() {
        return None;
    }
    let mut positions = to
        .iter()
        .map(|neighbor| from.iter().position(|other| other == neighbor))
        .collect::<Option<Vec<usize>>>()?;

    let mut swaps = 0;
    for i in 0..positions.len() {
        while positions[i] != i {
            let j = positions[i];
            positions.swap(i, j);
            swaps += 1;
        }
    }
    Some(swaps % 2 == 1)
}

fn label_text(label: u16) -> String {
    if label < 10 {
        label.to_string()
    } else {
        format!("%{:02}", label)
    }
}

fn bond_symbol(mol: &Molecule, bond: usize) -> &'static str {
    let bond = &mol.bonds()[bond];
    let both_aromatic = mol.atoms()[bond.a].aromatic && mol.atoms()[bond.b].aromatic;

    match bond.order {
        BondOrder::Single if both_aromatic => "-",
        BondOrder::Single => "",
        BondOrder::Double => "=",
        BondOrder::Triple => "#",
        BondOrder::Quadruple => "$",
        BondOrder::Aromatic if both_aromatic => "",
        BondOrder::Aromatic => ":",
    }
}

/// Whether the atom can only round-trip in bracket form.
fn needs_bracket(mol: &Molecule, index: usize, atom: &Atom) -> bool {
    if !atom.element.is_organic_subset() || atom.charge != 0 || atom.isotope.is_some() {
        return true;
    }
    let implicit = implicit_hydrogens(atom.element, atom.aromatic, mol.bonded_valence(index));
    implicit != atom.hydrogens
}
