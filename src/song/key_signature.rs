use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tonic {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Tonic {
    pub const fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            'E' => Some(Self::E),
            'F' => Some(Self::F),
            'G' => Some(Self::G),
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            _ => None,
        }
    }

    pub const fn letter(self) -> char {
        match self {
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
            Self::F => 'F',
            Self::G => 'G',
            Self::A => 'A',
            Self::B => 'B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accidental {
    Natural,
    Sharp,
    Flat,
}

use Accidental::{Flat, Natural, Sharp};
use Mode::{Major, Minor};
use Tonic::{A, B, C, D, E, F, G};

/// Every legal key: (tonic, mode, accidental, position on the circle of fifths)
const KEY_SIGNATURES: [(Tonic, Mode, Accidental, i8); 30] = [
    (C, Major, Flat, -7),
    (G, Major, Flat, -6),
    (D, Major, Flat, -5),
    (A, Major, Flat, -4),
    (E, Major, Flat, -3),
    (B, Major, Flat, -2),
    (F, Major, Natural, -1),
    (C, Major, Natural, 0),
    (G, Major, Natural, 1),
    (D, Major, Natural, 2),
    (A, Major, Natural, 3),
    (E, Major, Natural, 4),
    (B, Major, Natural, 5),
    (F, Major, Sharp, 6),
    (C, Major, Sharp, 7),
    (A, Minor, Flat, -7),
    (E, Minor, Flat, -6),
    (B, Minor, Flat, -5),
    (F, Minor, Natural, -4),
    (C, Minor, Natural, -3),
    (G, Minor, Natural, -2),
    (D, Minor, Natural, -1),
    (A, Minor, Natural, 0),
    (E, Minor, Natural, 1),
    (B, Minor, Natural, 2),
    (F, Minor, Sharp, 3),
    (C, Minor, Sharp, 4),
    (G, Minor, Sharp, 5),
    (D, Minor, Sharp, 6),
    (A, Minor, Sharp, 7),
];

/// A key from the fixed table of legal key signatures.
///
/// Only constructible through the table, so `fifths` is always consistent
/// with the (tonic, mode, accidental) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySignature {
    tonic: Tonic,
    mode: Mode,
    accidental: Accidental,
    fifths: i8,
}

impl Default for KeySignature {
    fn default() -> Self {
        Self::C_MAJOR
    }
}

impl KeySignature {
    pub const C_MAJOR: Self = Self {
        tonic: C,
        mode: Major,
        accidental: Natural,
        fifths: 0,
    };

    pub fn resolve(tonic: Tonic, mode: Mode, accidental: Accidental) -> Option<Self> {
        KEY_SIGNATURES
            .iter()
            .find(|(t, m, a, _)| *t == tonic && *m == mode && *a == accidental)
            .map(|&(tonic, mode, accidental, fifths)| Self {
                tonic,
                mode,
                accidental,
                fifths,
            })
    }

    pub fn from_fifths(fifths: i8, mode: Mode) -> Option<Self> {
        KEY_SIGNATURES
            .iter()
            .find(|(_, m, _, f)| *f == fifths && *m == mode)
            .map(|&(tonic, mode, accidental, fifths)| Self {
                tonic,
                mode,
                accidental,
                fifths,
            })
    }

    pub fn all() -> impl Iterator<Item = Self> {
        KEY_SIGNATURES
            .iter()
            .map(|&(tonic, mode, accidental, fifths)| Self {
                tonic,
                mode,
                accidental,
                fifths,
            })
    }

    /// Resolve a free-text key description such as "F# minor" or "Key of Bb Major".
    ///
    /// Absent, empty or unresolvable descriptions yield C major.
    pub fn parse(text: Option<&str>) -> Self {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return Self::default();
        };
        let normalized = text.to_lowercase().replace("key of", "");
        let mode = if normalized.contains("minor") {
            Minor
        } else {
            Major
        };
        let token = normalized.replace("major", "").replace("minor", "");
        let token = match token.trim() {
            "" => "c",
            token => token,
        };
        let mut chars = token.chars();
        let Some(tonic) = chars.next().and_then(Tonic::from_char) else {
            return Self::default();
        };
        let rest = chars.as_str();
        let accidental = if rest.contains('#') {
            Sharp
        } else if rest.contains('b') {
            Flat
        } else {
            Natural
        };
        Self::resolve(tonic, mode, accidental).unwrap_or_default()
    }

    pub const fn tonic(&self) -> Tonic {
        self.tonic
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn accidental(&self) -> Accidental {
        self.accidental
    }

    /// Number of sharps (positive) or flats (negative).
    pub const fn fifths(&self) -> i8 {
        self.fifths
    }

    pub const fn is_minor(&self) -> bool {
        matches!(self.mode, Minor)
    }
}

impl fmt::Display for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let accidental = match self.accidental {
            Natural => "",
            Sharp => "#",
            Flat => "b",
        };
        let mode = match self.mode {
            Major => "major",
            Minor => "minor",
        };
        write!(f, "{}{accidental} {mode}", self.tonic.letter())
    }
}
