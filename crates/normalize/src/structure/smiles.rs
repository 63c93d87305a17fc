//! SMILES reader producing a hydrogen-suppressed molecular graph.
//!
//! Supports the organic subset, bracket atoms (isotope, tetrahedral
//! chirality, hydrogen count, charge), all bond symbols including the
//! directional `/` and `\`, branches, ring closures including `%nn` labels,
//! and dot-separated components.
//!
//! Building the graph settles everything that has more than one spelling:
//! plain `[H]` atoms are folded into their neighbour's hydrogen count,
//! aromatic input is kekulized and aromaticity is then perceived afresh, so
//! Kekulé and aromatic forms of one compound give the same graph.

use std::collections::BTreeMap;
use thiserror::Error;

use super::aromaticity;
use super::elements::{self, Element};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmilesError {
    #[error("empty SMILES string")]
    Empty,
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedCharacter { ch: char, pos: usize },
    #[error("unknown element '{symbol}' at position {pos}")]
    UnknownElement { symbol: String, pos: usize },
    #[error("unterminated bracket atom starting at position {pos}")]
    UnterminatedBracket { pos: usize },
    #[error("unbalanced parenthesis at position {pos}")]
    UnbalancedParenthesis { pos: usize },
    #[error("branch opened but never closed")]
    UnclosedBranch,
    #[error("bond at position {pos} is not followed by an atom")]
    DanglingBond { pos: usize },
    #[error("ring bond {label} is never closed")]
    UnclosedRing { label: u16 },
    #[error("invalid ring closure at position {pos}")]
    InvalidRingClosure { pos: usize },
    #[error("unsupported stereo mark at position {pos}")]
    UnsupportedStereo { pos: usize },
    #[error("{symbol} atom {atom} has more bonds than any allowed valence")]
    ValenceExceeded { symbol: &'static str, atom: usize },
    #[error("aromatic system cannot be kekulized")]
    Kekulization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Contribution to an atom's bonded valence. Aromatic bonds count as one.
    pub fn valence(self) -> u32 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }

    fn from_symbol(symbol: u8) -> Option<Self> {
        match symbol {
            b'-' | b'/' | b'\\' => Some(BondOrder::Single),
            b'=' => Some(BondOrder::Double),
            b'#' => Some(BondOrder::Triple),
            b'$' => Some(BondOrder::Quadruple),
            b':' => Some(BondOrder::Aromatic),
            _ => None,
        }
    }
}

/// A `/` (up) or `\` (down) mark, read in writing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
}

impl Direction {
    fn from_symbol(symbol: u8) -> Option<Self> {
        match symbol {
            b'/' => Some(Direction::Up),
            b'\\' => Some(Direction::Down),
            _ => None,
        }
    }

    pub(crate) fn flip(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// One position around a tetrahedral centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbor {
    Atom(usize),
    ImplicitHydrogen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chirality {
    /// The four neighbours in the order they were written
    pub order: Vec<Neighbor>,
    /// `@@`: looking from the first neighbour, the other three run clockwise
    pub clockwise: bool,
}

/// Configuration of a double bond relative to one substituent on each end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleBondStereo {
    /// Substituent on the bond's `a` end
    pub a_ref: usize,
    /// Substituent on the bond's `b` end
    pub b_ref: usize,
    /// Both references on the same side
    pub cis: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: &'static Element,
    pub aromatic: bool,
    pub isotope: Option<u16>,
    pub charge: i8,
    /// Hydrogens not present as graph atoms: the written count for bracket
    /// atoms, the valence-derived count otherwise.
    pub hydrogens: u8,
    pub bracket: bool,
    pub chirality: Option<Chirality>,
}

impl Atom {
    fn new(element: &'static Element, aromatic: bool) -> Self {
        Self {
            element,
            aromatic,
            isotope: None,
            charge: 0,
            hydrogens: 0,
            bracket: false,
            chirality: None,
        }
    }

    pub fn mass(&self) -> f64 {
        self.isotope.map(f64::from).unwrap_or(self.element.mass)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
    pub order: BondOrder,
    pub stereo: Option<DoubleBondStereo>,
}

impl Bond {
    fn new(a: usize, b: usize, order: BondOrder) -> Self {
        Self { a, b, order, stereo: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    /// Per atom: (neighbour, bond index)
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Molecule {
    pub fn parse(smiles: &str) -> Result<Self, SmilesError> {
        Parser::new(smiles.trim()).parse()
    }

    fn build(mut atoms: Vec<Atom>, mut bonds: Vec<Bond>, directions: &[Option<Direction>]) -> Result<Self, SmilesError> {
        let adjacency = build_adjacency(atoms.len(), &bonds);
        assign_hydrogens(&mut atoms, &bonds, &adjacency)?;
        assign_double_bond_stereo(&mut bonds, &adjacency, directions);

        let (mut atoms, mut bonds) = fold_hydrogens(atoms, bonds);
        let adjacency = build_adjacency(atoms.len(), &bonds);

        aromaticity::kekulize(&mut atoms, &mut bonds, &adjacency)?;
        let rings = aromaticity::ring_bonds(&bonds, &adjacency);
        aromaticity::perceive(&mut atoms, &mut bonds, &adjacency, &rings);

        // Only open-chain double bonds keep a configuration
        for (bond, in_ring) in bonds.iter_mut().zip(&rings) {
            if bond.order != BondOrder::Double || *in_ring {
                bond.stereo = None;
            }
        }

        Ok(Self { atoms, bonds, adjacency })
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn neighbors(&self, atom: usize) -> &[(usize, usize)] {
        &self.adjacency[atom]
    }

    pub fn bonded_valence(&self, atom: usize) -> u32 {
        valence_sum(&self.bonds, &self.adjacency[atom])
    }
}

fn build_adjacency(atom_count: usize, bonds: &[Bond]) -> Vec<Vec<(usize, usize)>> {
    let mut adjacency = vec![Vec::new(); atom_count];
    for (index, bond) in bonds.iter().enumerate() {
        adjacency[bond.a].push((bond.b, index));
        adjacency[bond.b].push((bond.a, index));
    }
    adjacency
}

fn valence_sum(bonds: &[Bond], neighbors: &[(usize, usize)]) -> u32 {
    neighbors.iter().map(|&(_, bond)| bonds[bond].order.valence()).sum()
}

fn assign_hydrogens(atoms: &mut [Atom], bonds: &[Bond], adjacency: &[Vec<(usize, usize)>]) -> Result<(), SmilesError> {
    for (index, atom) in atoms.iter_mut().enumerate() {
        if atom.bracket {
            continue;
        }
        let used = valence_sum(bonds, &adjacency[index]);
        if let Some(&max) = atom.element.default_valences().last() {
            if used > u32::from(max) {
                return Err(SmilesError::ValenceExceeded {
                    symbol: atom.element.symbol,
                    atom: index,
                });
            }
        }
        atom.hydrogens = implicit_hydrogens(atom.element, atom.aromatic, used);
    }
    Ok(())
}

/// Hydrogens an unbracketed atom carries given its bonded valence.
pub(crate) fn implicit_hydrogens(element: &Element, aromatic: bool, used: u32) -> u8 {
    let Ok(used) = u8::try_from(used) else {
        return 0;
    };
    let valences = element.default_valences();

    if aromatic {
        // One valence unit goes to the delocalised system
        return valences
            .first()
            .map_or(0, |&v| v.saturating_sub(used).saturating_sub(1));
    }

    valences
        .iter()
        .find(|&&v| v >= used)
        .map_or(0, |&v| v - used)
}

/// Turn `/` `\` marks around each double bond into a cis/trans flag.
fn assign_double_bond_stereo(bonds: &mut [Bond], adjacency: &[Vec<(usize, usize)>], directions: &[Option<Direction>]) {
    for index in 0..bonds.len() {
        if bonds[index].order != BondOrder::Double {
            continue;
        }
        let Bond { a, b, .. } = bonds[index];

        let side = |end: usize| {
            adjacency[end]
                .iter()
                .filter(|&&(_, bond)| bond != index)
                .find_map(|&(other, bond)| {
                    let direction = directions[bond]?;
                    // Pointing away from the double bond
                    let outward = if bonds[bond].a == end { direction } else { direction.flip() };
                    Some((other, outward))
                })
        };

        let stereo = match (side(a), side(b)) {
            (Some((a_ref, a_out)), Some((b_ref, b_out))) => Some(DoubleBondStereo {
                a_ref,
                b_ref,
                cis: a_out == b_out,
            }),
            _ => None,
        };
        bonds[index].stereo = stereo;
    }
}

/// Remove uncharged, isotope-free `[H]` atoms hanging off a heavy atom and
/// count them on that atom instead.
fn fold_hydrogens(atoms: Vec<Atom>, bonds: Vec<Bond>) -> (Vec<Atom>, Vec<Bond>) {
    let adjacency = build_adjacency(atoms.len(), &bonds);
    let host: Vec<Option<usize>> = atoms
        .iter()
        .enumerate()
        .map(|(index, atom)| {
            let plain = atom.element.atomic_number == 1
                && atom.isotope.is_none()
                && atom.charge == 0
                && atom.hydrogens == 0;
            match adjacency[index].as_slice() {
                [(heavy, _)] if plain && atoms[*heavy].element.atomic_number != 1 => Some(*heavy),
                _ => None,
            }
        })
        .collect();

    if host.iter().all(Option::is_none) {
        return (atoms, bonds);
    }

    let mut remap = vec![None; atoms.len()];
    let mut next = 0;
    for (index, folded) in host.iter().enumerate() {
        if folded.is_none() {
            remap[index] = Some(next);
            next += 1;
        }
    }

    let mut atoms = atoms;
    for (hydrogen, heavy) in host.iter().enumerate() {
        let Some(heavy) = *heavy else { continue };
        let atom = &mut atoms[heavy];
        atom.hydrogens = atom.hydrogens.saturating_add(1);
        if let Some(chirality) = atom.chirality.as_mut() {
            for slot in chirality.order.iter_mut() {
                if *slot == Neighbor::Atom(hydrogen) {
                    *slot = Neighbor::ImplicitHydrogen;
                }
            }
        }
    }

    let atoms = atoms
        .into_iter()
        .zip(&host)
        .filter(|(_, folded)| folded.is_none())
        .map(|(mut atom, _)| {
            let chirality = atom.chirality.take().filter(|_| atom.hydrogens <= 1);
            atom.chirality = chirality.and_then(|chirality| {
                let order = chirality
                    .order
                    .iter()
                    .map(|slot| match *slot {
                        Neighbor::Atom(index) => remap[index].map(Neighbor::Atom),
                        Neighbor::ImplicitHydrogen => Some(Neighbor::ImplicitHydrogen),
                    })
                    .collect::<Option<Vec<_>>>()?;
                Some(Chirality { order, ..chirality })
            });
            atom
        })
        .collect();

    let bonds = bonds
        .iter()
        .filter_map(|bond| {
            let stereo = bond.stereo.and_then(|stereo| {
                let (a_ref, flip_a) = surviving_reference(&adjacency, &host, bond.a, bond.b, stereo.a_ref)?;
                let (b_ref, flip_b) = surviving_reference(&adjacency, &host, bond.b, bond.a, stereo.b_ref)?;
                Some(DoubleBondStereo {
                    a_ref: remap[a_ref]?,
                    b_ref: remap[b_ref]?,
                    cis: stereo.cis ^ flip_a ^ flip_b,
                })
            });
            Some(Bond {
                a: remap[bond.a]?,
                b: remap[bond.b]?,
                order: bond.order,
                stereo,
            })
        })
        .collect();

    (atoms, bonds)
}

/// A double-bond reference that survives folding, and whether it moved to
/// the opposite substituent.
fn surviving_reference(
    adjacency: &[Vec<(usize, usize)>],
    host: &[Option<usize>],
    end: usize,
    partner: usize,
    reference: usize,
) -> Option<(usize, bool)> {
    if host[reference].is_none() {
        return Some((reference, false));
    }
    adjacency[end]
        .iter()
        .map(|&(other, _)| other)
        .find(|&other| other != partner && other != reference && host[other].is_none())
        .map(|other| (other, true))
}

struct RingOpening {
    atom: usize,
    order: Option<BondOrder>,
    /// Position reserved in the opening atom's neighbour order
    slot: usize,
}

struct PendingBond {
    order: BondOrder,
    direction: Option<Direction>,
    pos: usize,
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    directions: Vec<Option<Direction>>,
    /// Per atom: neighbours in writing order, ring openings filled on closure
    written: Vec<Vec<Option<Neighbor>>>,
    /// Per atom: `Some(clockwise)` when a tetrahedral mark was given
    marks: Vec<Option<bool>>,
    branches: Vec<usize>,
    previous: Option<usize>,
    pending_bond: Option<PendingBond>,
    rings: BTreeMap<u16, RingOpening>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            atoms: Vec::new(),
            bonds: Vec::new(),
            directions: Vec::new(),
            written: Vec::new(),
            marks: Vec::new(),
            branches: Vec::new(),
            previous: None,
            pending_bond: None,
            rings: BTreeMap::new(),
        }
    }

    fn parse(mut self) -> Result<Molecule, SmilesError> {
        if self.input.is_empty() {
            return Err(SmilesError::Empty);
        }

        while let Some(c) = self.peek() {
            match c {
                b'(' => self.open_branch()?,
                b')' => self.close_branch()?,
                b'.' => {
                    self.expect_no_pending_bond()?;
                    self.previous = None;
                    self.pos += 1;
                }
                b'0'..=b'9' | b'%' => self.ring_closure()?,
                b'[' => {
                    let (atom, mark) = self.bracket_atom()?;
                    self.add_atom(atom, mark)?;
                }
                _ if BondOrder::from_symbol(c).is_some() => self.bond_symbol(c)?,
                _ => {
                    let atom = self.organic_atom()?;
                    self.add_atom(atom, None)?;
                }
            }
        }

        self.expect_no_pending_bond()?;
        if !self.branches.is_empty() {
            return Err(SmilesError::UnclosedBranch);
        }
        if let Some(&label) = self.rings.keys().next() {
            return Err(SmilesError::UnclosedRing { label });
        }
        if self.atoms.is_empty() {
            return Err(SmilesError::Empty);
        }

        let Parser {
            mut atoms,
            bonds,
            directions,
            written,
            marks,
            ..
        } = self;

        for ((atom, mark), written) in atoms.iter_mut().zip(marks).zip(written) {
            let Some(clockwise) = mark else { continue };
            let hydrogens = atom.hydrogens;
            let order: Option<Vec<Neighbor>> = written.into_iter().collect();
            // Only four-coordinate centres with at most one hydrogen
            atom.chirality = order
                .filter(|order| order.len() == 4 && hydrogens <= 1)
                .map(|order| Chirality { order, clockwise });
        }

        Molecule::build(atoms, bonds, &directions)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn unexpected(&self) -> SmilesError {
        SmilesError::UnexpectedCharacter {
            ch: self.peek().map(char::from).unwrap_or('\0'),
            pos: self.pos,
        }
    }

    fn expect_no_pending_bond(&self) -> Result<(), SmilesError> {
        match &self.pending_bond {
            Some(pending) => Err(SmilesError::DanglingBond { pos: pending.pos }),
            None => Ok(()),
        }
    }

    fn open_branch(&mut self) -> Result<(), SmilesError> {
        let anchor = self.previous.ok_or_else(|| self.unexpected())?;
        self.expect_no_pending_bond()?;
        self.branches.push(anchor);
        self.pos += 1;
        Ok(())
    }

    fn close_branch(&mut self) -> Result<(), SmilesError> {
        self.expect_no_pending_bond()?;
        let anchor = self
            .branches
            .pop()
            .ok_or(SmilesError::UnbalancedParenthesis { pos: self.pos })?;
        self.previous = Some(anchor);
        self.pos += 1;
        Ok(())
    }

    fn bond_symbol(&mut self, symbol: u8) -> Result<(), SmilesError> {
        if self.previous.is_none() || self.pending_bond.is_some() {
            return Err(self.unexpected());
        }
        if let Some(order) = BondOrder::from_symbol(symbol) {
            self.pending_bond = Some(PendingBond {
                order,
                direction: Direction::from_symbol(symbol),
                pos: self.pos,
            });
        }
        self.pos += 1;
        Ok(())
    }

    fn ring_closure(&mut self) -> Result<(), SmilesError> {
        let start = self.pos;
        let atom = self.previous.ok_or_else(|| self.unexpected())?;

        let label = if self.peek() == Some(b'%') {
            let digits = self
                .input
                .get(start + 1..start + 3)
                .filter(|d| d.iter().all(u8::is_ascii_digit))
                .ok_or(SmilesError::InvalidRingClosure { pos: start })?;
            self.pos += 3;
            u16::from(digits[0] - b'0') * 10 + u16::from(digits[1] - b'0')
        } else {
            self.pos += 1;
            u16::from(self.input[start] - b'0')
        };

        let order = match self.pending_bond.take() {
            Some(PendingBond { direction: Some(_), pos, .. }) => {
                return Err(SmilesError::UnsupportedStereo { pos });
            }
            Some(pending) => Some(pending.order),
            None => None,
        };

        match self.rings.remove(&label) {
            Some(opening) => {
                if opening.atom == atom {
                    return Err(SmilesError::InvalidRingClosure { pos: start });
                }
                let order = match (opening.order, order) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(SmilesError::InvalidRingClosure { pos: start });
                    }
                    (Some(a), _) | (None, Some(a)) => a,
                    (None, None) => self.default_order(opening.atom, atom),
                };
                self.connect(opening.atom, atom, order, None, start)?;
                self.written[opening.atom][opening.slot] = Some(Neighbor::Atom(atom));
                self.written[atom].push(Some(Neighbor::Atom(opening.atom)));
            }
            None => {
                let slot = self.written[atom].len();
                self.written[atom].push(None);
                self.rings.insert(label, RingOpening { atom, order, slot });
            }
        }

        Ok(())
    }

    fn add_atom(&mut self, atom: Atom, mark: Option<bool>) -> Result<(), SmilesError> {
        let index = self.atoms.len();
        let hydrogens = atom.hydrogens;
        self.atoms.push(atom);
        self.marks.push(mark);
        self.written.push(Vec::new());

        if let Some(previous) = self.previous {
            let pos = self.pos;
            let (order, direction) = match self.pending_bond.take() {
                Some(pending) => (pending.order, pending.direction),
                None => (self.default_order(previous, index), None),
            };
            self.connect(previous, index, order, direction, pos)?;
            self.written[previous].push(Some(Neighbor::Atom(index)));
            self.written[index].push(Some(Neighbor::Atom(previous)));
        }
        if hydrogens > 0 {
            self.written[index].push(Some(Neighbor::ImplicitHydrogen));
        }

        self.previous = Some(index);
        Ok(())
    }

    fn default_order(&self, a: usize, b: usize) -> BondOrder {
        if self.atoms[a].aromatic && self.atoms[b].aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn connect(
        &mut self,
        a: usize,
        b: usize,
        order: BondOrder,
        direction: Option<Direction>,
        pos: usize,
    ) -> Result<(), SmilesError> {
        let exists = self
            .bonds
            .iter()
            .any(|bond| (bond.a == a && bond.b == b) || (bond.a == b && bond.b == a));
        if exists {
            return Err(SmilesError::InvalidRingClosure { pos });
        }

        self.bonds.push(Bond::new(a, b, order));
        self.directions.push(direction);
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<Atom, SmilesError> {
        let c = self.peek().ok_or(SmilesError::Empty)?;
        let pos = self.pos;

        if c == b'*' {
            self.pos += 1;
            return Ok(Atom::new(self.element("*", pos)?, false));
        }

        if c.is_ascii_uppercase() {
            let two = self.input.get(pos..pos + 2);
            if two == Some(b"Cl".as_slice()) || two == Some(b"Br".as_slice()) {
                self.pos += 2;
                let symbol = if c == b'C' { "Cl" } else { "Br" };
                return Ok(Atom::new(self.element(symbol, pos)?, false));
            }

            let symbol = char::from(c).to_string();
            let element = self.element(&symbol, pos)?;
            if !element.is_organic_subset() {
                return Err(SmilesError::UnknownElement { symbol, pos });
            }
            self.pos += 1;
            return Ok(Atom::new(element, false));
        }

        if matches!(c, b'b' | b'c' | b'n' | b'o' | b'p' | b's') {
            let symbol = char::from(c.to_ascii_uppercase()).to_string();
            self.pos += 1;
            return Ok(Atom::new(self.element(&symbol, pos)?, true));
        }

        Err(self.unexpected())
    }

    fn bracket_atom(&mut self) -> Result<(Atom, Option<bool>), SmilesError> {
        let start = self.pos;
        self.pos += 1;

        let isotope = self.read_number().map(|n| n.min(u32::from(u16::MAX)) as u16);
        let (element, aromatic) = self.bracket_symbol(start)?;
        let mark = self.read_chirality()?;

        let hydrogens = if self.peek() == Some(b'H') {
            self.pos += 1;
            self.read_number().unwrap_or(1).min(u32::from(u8::MAX)) as u8
        } else {
            0
        };

        let charge = self.read_charge();

        if self.peek() == Some(b':') {
            self.pos += 1;
            self.read_number();
        }

        if self.peek() != Some(b']') {
            return Err(SmilesError::UnterminatedBracket { pos: start });
        }
        self.pos += 1;

        let atom = Atom {
            element,
            aromatic,
            isotope,
            charge,
            hydrogens,
            bracket: true,
            chirality: None,
        };
        Ok((atom, mark))
    }

    fn bracket_symbol(&mut self, start: usize) -> Result<(&'static Element, bool), SmilesError> {
        let c = self.peek().ok_or(SmilesError::UnterminatedBracket { pos: start })?;
        let pos = self.pos;

        if c == b'*' {
            self.pos += 1;
            return Ok((self.element("*", pos)?, false));
        }

        if !c.is_ascii_alphabetic() {
            return Err(self.unexpected());
        }

        let aromatic = c.is_ascii_lowercase();
        let first = char::from(c.to_ascii_uppercase());

        // A lowercase letter can only continue the symbol, never follow it
        if let Some(next) = self.input.get(pos + 1).filter(|n| n.is_ascii_lowercase()) {
            let symbol = format!("{}{}", first, char::from(*next));
            return match elements::lookup(&symbol) {
                Some(element) if !aromatic || element.can_be_aromatic() => {
                    self.pos += 2;
                    Ok((element, aromatic))
                }
                _ => Err(SmilesError::UnknownElement {
                    symbol: format!("{}{}", char::from(c), char::from(*next)),
                    pos,
                }),
            };
        }

        let symbol = first.to_string();
        let element = self.element(&symbol, pos)?;
        if aromatic && !element.can_be_aromatic() {
            return Err(SmilesError::UnknownElement {
                symbol: symbol.to_lowercase(),
                pos,
            });
        }
        self.pos += 1;
        Ok((element, aromatic))
    }

    /// `@` / `@@` and their `@TH1` / `@TH2` spellings. Other chirality
    /// classes are rejected.
    fn read_chirality(&mut self) -> Result<Option<bool>, SmilesError> {
        if self.peek() != Some(b'@') {
            return Ok(None);
        }
        let pos = self.pos;
        self.pos += 1;
        let mut clockwise = false;
        if self.peek() == Some(b'@') {
            self.pos += 1;
            clockwise = true;
        }

        let class = self.input.get(self.pos..self.pos + 2);
        if class == Some(b"TH".as_slice()) && !clockwise {
            self.pos += 2;
            return match self.read_number() {
                Some(1) => Ok(Some(false)),
                Some(2) => Ok(Some(true)),
                _ => Err(SmilesError::UnsupportedStereo { pos }),
            };
        }
        if class.is_some_and(|class| class.iter().all(u8::is_ascii_uppercase)) {
            return Err(SmilesError::UnsupportedStereo { pos });
        }

        Ok(Some(clockwise))
    }

    fn read_charge(&mut self) -> i8 {
        let sign: i32 = match self.peek() {
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ => return 0,
        };
        let symbol = self.input[self.pos];
        self.pos += 1;

        let magnitude = match self.read_number() {
            Some(n) => n.min(15) as i32,
            None => {
                let mut count = 1;
                while self.peek() == Some(symbol) {
                    count += 1;
                    self.pos += 1;
                }
                count.min(15)
            }
        };

        (sign * magnitude) as i8
    }

    fn read_number(&mut self) -> Option<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(digit) = self.peek().filter(u8::is_ascii_digit) {
            value = value.saturating_mul(10).saturating_add(u32::from(digit - b'0'));
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    fn element(&self, symbol: &str, pos: usize) -> Result<&'static Element, SmilesError> {
        elements::lookup(symbol).ok_or_else(|| SmilesError::UnknownElement {
            symbol: symbol.to_string(),
            pos,
        })
    }
}
