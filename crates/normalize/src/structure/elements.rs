/// Static properties of a chemical element.
#[derive(Debug, PartialEq)]
pub struct Element {
    pub symbol: &'static str,
    pub atomic_number: u8,
    /// Standard atomic weight
    pub mass: f64,
}

macro_rules! element {
    ($symbol:expr, $number:expr, $mass:expr) => {
        Element { symbol: $symbol, atomic_number: $number, mass: $mass }
    };
}

/// Indexed by atomic number; `*` is the SMILES wildcard.
static ELEMENTS: &[Element] = &[
    element!("*", 0, 0.0),
    element!("H", 1, 1.008),
    element!("He", 2, 4.003),
    element!("Li", 3, 6.941),
    element!("Be", 4, 9.012),
    element!("B", 5, 10.812),
    element!("C", 6, 12.011),
    element!("N", 7, 14.007),
    element!("O", 8, 15.999),
    element!("F", 9, 18.998),
    element!("Ne", 10, 20.18),
    element!("Na", 11, 22.99),
    element!("Mg", 12, 24.305),
    element!("Al", 13, 26.982),
    element!("Si", 14, 28.086),
    element!("P", 15, 30.974),
    element!("S", 16, 32.067),
    element!("Cl", 17, 35.453),
    element!("Ar", 18, 39.948),
    element!("K", 19, 39.098),
    element!("Ca", 20, 40.078),
    element!("Sc", 21, 44.956),
    element!("Ti", 22, 47.867),
    element!("V", 23, 50.942),
    element!("Cr", 24, 51.996),
    element!("Mn", 25, 54.938),
    element!("Fe", 26, 55.845),
    element!("Co", 27, 58.933),
    element!("Ni", 28, 58.693),
    element!("Cu", 29, 63.546),
    element!("Zn", 30, 65.39),
    element!("Ga", 31, 69.723),
    element!("Ge", 32, 72.61),
    element!("As", 33, 74.922),
    element!("Se", 34, 78.96),
    element!("Br", 35, 79.904),
    element!("Kr", 36, 83.8),
    element!("Rb", 37, 85.468),
    element!("Sr", 38, 87.62),
    element!("Y", 39, 88.906),
    element!("Zr", 40, 91.224),
    element!("Nb", 41, 92.906),
    element!("Mo", 42, 95.94),
    element!("Tc", 43, 98.0),
    element!("Ru", 44, 101.07),
    element!("Rh", 45, 102.906),
    element!("Pd", 46, 106.42),
    element!("Ag", 47, 107.868),
    element!("Cd", 48, 112.411),
    element!("In", 49, 114.818),
    element!("Sn", 50, 118.71),
    element!("Sb", 51, 121.76),
    element!("Te", 52, 127.6),
    element!("I", 53, 126.904),
    element!("Xe", 54, 131.29),
    element!("Cs", 55, 132.905),
    element!("Ba", 56, 137.327),
    element!("La", 57, 138.906),
    element!("Ce", 58, 140.116),
    element!("Pr", 59, 140.908),
    element!("Nd", 60, 144.24),
    element!("Pm", 61, 145.0),
    element!("Sm", 62, 150.36),
    element!("Eu", 63, 151.964),
    element!("Gd", 64, 157.25),
    element!("Tb", 65, 158.925),
    element!("Dy", 66, 162.5),
    element!("Ho", 67, 164.93),
    element!("Er", 68, 167.26),
    element!("Tm", 69, 168.934),
    element!("Yb", 70, 173.04),
    element!("Lu", 71, 174.967),
    element!("Hf", 72, 178.49),
    element!("Ta", 73, 180.948),
    element!("W", 74, 183.84),
    element!("Re", 75, 186.207),
    element!("Os", 76, 190.23),
    element!("Ir", 77, 192.217),
    element!("Pt", 78, 195.078),
    element!("Au", 79, 196.967),
    element!("Hg", 80, 200.59),
    element!("Tl", 81, 204.383),
    element!("Pb", 82, 207.2),
    element!("Bi", 83, 208.98),
    element!("Po", 84, 209.0),
    element!("At", 85, 210.0),
    element!("Rn", 86, 222.0),
    element!("Fr", 87, 223.0),
    element!("Ra", 88, 226.0),
    element!("Ac", 89, 227.0),
    element!("Th", 90, 232.038),
    element!("Pa", 91, 231.036),
    element!("U", 92, 238.029),
    element!("Np", 93, 237.0),
    element!("Pu", 94, 244.0),
    element!("Am", 95, 243.0),
    element!("Cm", 96, 247.0),
    element!("Bk", 97, 247.0),
    element!("Cf", 98, 251.0),
    element!("Es", 99, 252.0),
    element!("Fm", 100, 257.0),
    element!("Md", 101, 258.0),
    element!("No", 102, 259.0),
    element!("Lr", 103, 262.0),
    element!("Rf", 104, 267.0),
    element!("Db", 105, 268.0),
    element!("Sg", 106, 269.0),
    element!("Bh", 107, 270.0),
    element!("Hs", 108, 269.0),
    element!("Mt", 109, 278.0),
    element!("Ds", 110, 281.0),
    element!("Rg", 111, 282.0),
    element!("Cn", 112, 285.0),
    element!("Nh", 113, 286.0),
    element!("Fl", 114, 289.0),
    element!("Mc", 115, 290.0),
    element!("Lv", 116, 293.0),
    element!("Ts", 117, 294.0),
    element!("Og", 118, 294.0),
];

/// Elements that may appear outside brackets in SMILES.
const ORGANIC_SUBSET: &[&str] = &["*", "B", "C", "N", "O", "P", "S", "F", "Cl", "Br", "I"];

/// Elements that may be written in lowercase (aromatic) form.
const AROMATIC_CAPABLE: &[&str] = &["B", "C", "N", "O", "P", "S", "Se", "As"];

pub fn lookup(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

pub fn hydrogen() -> &'static Element {
    &ELEMENTS[1]
}

impl Element {
    pub fn is_organic_subset(&self) -> bool {
        ORGANIC_SUBSET.contains(&self.symbol)
    }

    pub fn can_be_aromatic(&self) -> bool {
        AROMATIC_CAPABLE.contains(&self.symbol)
    }

    /// Allowed valences used to infer implicit hydrogens, lowest first.
    /// Empty for elements outside the organic subset.
    pub fn default_valences(&self) -> &'static [u8] {
        match self.symbol {
            "B" => &[3],
            "C" => &[4],
            "N" | "P" => &[3, 5],
            "O" => &[2],
            "S" => &[2, 4, 6],
            "F" | "Cl" | "Br" | "I" => &[1],
            _ => &[],
        }
    }

    pub fn is_carbon(&self) -> bool {
        self.atomic_number == 6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("C").map(|e| e.atomic_number), Some(6));
        assert_eq!(lookup("Cl").map(|e| e.atomic_number), Some(17));
        assert!(lookup("Xx").is_none());
        assert_eq!(hydrogen().symbol, "H");
    }

    #[test]
    fn test_table_covers_every_element() {
        assert_eq!(lookup("In").map(|e| e.atomic_number), Some(49));
        assert_eq!(lookup("U").map(|e| e.atomic_number), Some(92));
        assert_eq!(lookup("Og").map(|e| e.atomic_number), Some(118));
        for (number, element) in ELEMENTS.iter().enumerate() {
            assert_eq!(usize::from(element.atomic_number), number, "{}", element.symbol);
        }
    }

    #[test]
    fn test_organic_subset() {
        assert!(lookup("Br").unwrap().is_organic_subset());
        assert!(!lookup("Na").unwrap().is_organic_subset());
    }
}
