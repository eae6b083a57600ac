pub mod duration;
pub mod header_sync;
pub mod key_signature;
pub mod song_builder;
pub mod tuning;

pub use duration::{Duration, DurationValue, QUARTER_TIME};
pub use key_signature::{Accidental, KeySignature, Mode, Tonic};
pub use tuning::GuitarString;

pub const DEFAULT_TEMPO: i32 = 120;

/// Display color of markers, RGB(40, 40, 40)
pub const MARKER_COLOR: i32 = 0x0028_2828;

/// Highest fret a note can carry
pub const MAX_FRET: i32 = 99;

#[derive(Debug, PartialEq)]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub tempo: i32,
    pub key_signature: KeySignature,
    /// Shared by all tracks, measures refer to them by index.
    pub measure_headers: Vec<MeasureHeader>,
    pub tracks: Vec<Track>,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            tempo: DEFAULT_TEMPO,
            key_signature: KeySignature::default(),
            measure_headers: vec![],
            tracks: vec![],
        }
    }
}

impl Song {
    pub fn measure_header(&self, measure: &Measure) -> Option<&MeasureHeader> {
        self.measure_headers.get(measure.header_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub title: String,
    /// packed 0xRRGGBB
    pub color: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: i8,
    pub denominator: Duration,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: Duration::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasureHeader {
    /// 1-based measure number
    pub number: usize,
    pub time_signature: TimeSignature,
    pub repeat_open: bool,
    pub repeat_close: i8,
    pub marker: Option<Marker>,
}

impl MeasureHeader {
    /// Length of the measure in `QUARTER_TIME` ticks.
    pub fn length(&self) -> u32 {
        let numerator = self.time_signature.numerator.max(0) as u32;
        numerator * self.time_signature.denominator.time()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// 1-based track number
    pub number: i32,
    pub name: String,
    pub percussion: bool,
    pub instrument: String,
    pub program: u8,
    pub strings: Vec<GuitarString>,
    pub capo: i32,
    pub volume: u8,
    pub pan: u8,
    pub measures: Vec<Measure>,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            number: 1,
            name: String::new(),
            percussion: false,
            instrument: String::new(),
            program: tuning::DEFAULT_PROGRAM,
            strings: vec![],
            capo: 0,
            volume: 100,
            pan: 64,
            measures: vec![],
        }
    }
}

/// One track's content for one shared measure header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Measure {
    pub track_index: usize,
    pub header_index: usize,
    pub voice: Voice,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Voice {
    pub beats: Vec<Beat>,
}

impl Voice {
    /// Sum of the beat durations in `QUARTER_TIME` ticks.
    pub fn length(&self) -> u32 {
        self.beats.iter().map(|b| b.duration.time()).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BeatStatus {
    #[default]
    Normal,
    Rest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Beat {
    pub status: BeatStatus,
    pub duration: Duration,
    pub notes: Vec<Note>,
}

impl Beat {
    pub fn is_rest(&self) -> bool {
        self.status == BeatStatus::Rest
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteType {
    Rest,
    Normal,
    Tie,
    Dead,
    Unknown(u8),
}

impl NoteType {
    pub const fn get_note_type(value: u8) -> Self {
        match value {
            0 => Self::Rest,
            1 => Self::Normal,
            2 => Self::Tie,
            3 => Self::Dead,
            _ => Self::Unknown(value),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Rest => 0,
            Self::Normal => 1,
            Self::Tie => 2,
            Self::Dead => 3,
            Self::Unknown(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    /// 1-based string number
    pub string: i8,
    /// fret
    pub value: i8,
    pub kind: NoteType,
}

impl Note {
    pub const fn new(string: i8, value: i8) -> Self {
        Self {
            string,
            value,
            kind: NoteType::Normal,
        }
    }
}
