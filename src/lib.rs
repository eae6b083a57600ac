//! Tabwright - JSON song data to Guitar Pro 5 tablature and MIDI sequences
//!
//! This library provides:
//! - Building a song model from a JSON tablature document
//! - Writing the song as a Guitar Pro 5 (.gp5) file
//! - Reading GP5 files back for validation
//! - Generating a multi-track MIDI sequence on a fixed tick grid
//!
//! # Example
//!
//! ```no_run
//! use tabwright::{generate_sequence, validate_tablature, write_tablature};
//!
//! let json = std::fs::read("song.json").unwrap();
//! let gp5 = write_tablature(&json).unwrap();
//! let song = validate_tablature(&gp5).unwrap();
//! assert!(!song.tracks.is_empty());
//!
//! let midi = generate_sequence(br#"{"measures": 2, "tempo": 100}"#).unwrap();
//! ```

pub mod audio;
pub mod convert;
pub mod error;
pub mod parser;
pub mod schema;
pub mod song;
pub mod writer;

// Re-export main types for convenience
pub use audio::{
    midi_event::{MidiEvent, MidiEventType},
    midi_writer::{SequenceWriter, SmfWriter},
    progression::{DefaultProgression, ProgressionResolver},
    tick_sequencer::{Sequence, SequenceTrack, TickSequencer, TICKS_PER_BEAT},
};
pub use convert::{
    generate_sequence, sequence_from_json, song_from_json, validate_tablature, write_tablature,
};
pub use error::ConvertError;
pub use parser::gp5_parser::parse_gp5_data;
pub use schema::{SequenceRequest, SongSchema};
pub use song::{
    song_builder::SongBuilder, Beat, BeatStatus, Duration, DurationValue, KeySignature, Measure,
    MeasureHeader, Note, Song, TimeSignature, Track, QUARTER_TIME,
};
pub use writer::{gp5_writer::Gp5Writer, SongWriter};
