/// Standard 6-string guitar tuning, low to high (E2 A2 D3 G3 B3 E4)
pub const STANDARD_TUNING: [i32; 6] = [40, 45, 50, 55, 59, 64];

/// Acoustic steel-string guitar
pub const DEFAULT_PROGRAM: u8 = 25;

/// Percussion tracks play on the drum kit channel, the program is not used.
pub const PERCUSSION_PROGRAM: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuitarString {
    /// 1-based string number
    pub number: i32,
    /// MIDI pitch of the open string
    pub value: i32,
}

/// Build the string definitions for a track.
///
/// Pitches are not range checked, they pass through as given.
pub fn resolve_strings(tuning: Option<&[i32]>) -> Vec<GuitarString> {
    let tuning = match tuning {
        Some(tuning) if !tuning.is_empty() => tuning,
        _ => &STANDARD_TUNING,
    };
    tuning
        .iter()
        .enumerate()
        .map(|(i, &value)| GuitarString {
            number: i as i32 + 1,
            value,
        })
        .collect()
}

// General MIDI programs (0-based) for the instrument labels we understand,
// the first label of a program is the one read back
const INSTRUMENT_PROGRAMS: [(&str, u8); 24] = [
    ("guitar", 25),
    ("acoustic guitar", 25),
    ("steel guitar", 25),
    ("nylon guitar", 24),
    ("classical guitar", 24),
    ("jazz guitar", 26),
    ("clean guitar", 27),
    ("electric guitar", 27),
    ("muted guitar", 28),
    ("overdriven guitar", 29),
    ("overdrive guitar", 29),
    ("distortion guitar", 30),
    ("distorted guitar", 30),
    ("harmonics", 31),
    ("acoustic bass", 32),
    ("bass", 33),
    ("electric bass", 33),
    ("finger bass", 33),
    ("pick bass", 34),
    ("fretless bass", 35),
    ("banjo", 105),
    ("ukulele", 24),
    ("piano", 0),
    ("organ", 16),
];

/// Resolve a free-text instrument label to a General MIDI program.
///
/// Unknown labels fall back to `DEFAULT_PROGRAM`.
pub fn resolve_program(label: &str) -> u8 {
    let label = label.trim().to_lowercase();
    INSTRUMENT_PROGRAMS
        .iter()
        .find(|(name, _)| *name == label)
        .map_or(DEFAULT_PROGRAM, |&(_, program)| program)
}

/// Display label for a program, used when reading files back.
pub fn program_label(program: u8) -> String {
    INSTRUMENT_PROGRAMS
        .iter()
        .find(|(_, p)| *p == program)
        .map_or_else(|| format!("Program {program}"), |(name, _)| capitalize(name))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
