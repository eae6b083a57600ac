//! The two conversions: JSON song to GP5 tablature and JSON request to a MIDI sequence.

use crate::audio::midi_writer::{SequenceWriter, SmfWriter};
use crate::audio::tick_sequencer::{Sequence, TickSequencer};
use crate::parser::gp5_parser::parse_gp5_data;
use crate::schema::{SequenceRequest, SongSchema};
use crate::song::song_builder::SongBuilder;
use crate::song::Song;
use crate::writer::gp5_writer::Gp5Writer;
use crate::writer::SongWriter;
use crate::ConvertError;

/// Build the song model of a tablature document.
pub fn song_from_json(json: &[u8]) -> Result<Song, ConvertError> {
    let schema = SongSchema::from_json(json)?;
    SongBuilder::new().build(&schema)
}

/// Convert a tablature document into GP5 bytes.
pub fn write_tablature(json: &[u8]) -> Result<Vec<u8>, ConvertError> {
    write_tablature_with(json, &Gp5Writer)
}

pub fn write_tablature_with<W: SongWriter>(
    json: &[u8],
    writer: &W,
) -> Result<Vec<u8>, ConvertError> {
    let song = song_from_json(json)?;
    log::info!(
        "Writing '{}' with {} tracks and {} measures",
        song.title,
        song.tracks.len(),
        song.measure_headers.len()
    );
    writer.write_song(&song)
}

/// Build the sequence described by a sequenced-audio request.
pub fn sequence_from_json(json: &[u8]) -> Result<Sequence, ConvertError> {
    let request = SequenceRequest::from_json(json)?;
    Ok(TickSequencer::new().sequence(&request))
}

/// Convert a sequenced-audio request into Standard MIDI File bytes.
pub fn generate_sequence(json: &[u8]) -> Result<Vec<u8>, ConvertError> {
    generate_sequence_with(json, &SmfWriter)
}

pub fn generate_sequence_with<W: SequenceWriter>(
    json: &[u8],
    writer: &W,
) -> Result<Vec<u8>, ConvertError> {
    let sequence = sequence_from_json(json)?;
    log::info!(
        "Generating {} tracks at {} BPM",
        sequence.tracks.len(),
        sequence.tempo
    );
    writer.write_sequence(&sequence)
}

/// Read GP5 bytes back and check they hold a playable song.
pub fn validate_tablature(bytes: &[u8]) -> Result<Song, ConvertError> {
    let song = parse_gp5_data(bytes)?;
    if song.tracks.is_empty() {
        return Err(ConvertError::Parsing("GP5 file has no track".to_string()));
    }
    if song.tempo <= 0 {
        return Err(ConvertError::Parsing(format!(
            "GP5 file has a non positive tempo {}",
            song.tempo
        )));
    }
    Ok(song)
}
