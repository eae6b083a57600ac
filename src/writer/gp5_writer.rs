//! Guitar Pro 5.00 file writer.
//!
//! The layout mirrors what Guitar Pro 5 readers expect, see the parser in
//! `crate::parser::gp5_parser` for the reading side.

use crate::song::{Beat, MeasureHeader, Note, Song, TimeSignature, Track, Voice};
use crate::writer::primitive_writer::{
    write_byte_size_string, write_color, write_i8, write_int, write_int_byte_sized_string,
    write_int_sized_string, write_placeholder, write_short, write_u8,
};
use crate::writer::SongWriter;
use crate::ConvertError;

pub const GP5_VERSION: &str = "FICHIER GUITAR PRO v5.00";
pub const VERSION_FIELD_SIZE: usize = 30;
pub const TRACK_NAME_FIELD_SIZE: usize = 40;

/// Tunings are stored in a fixed 7 string table
pub const MAX_STRINGS: usize = 7;
pub const CHANNEL_COUNT: usize = 64;
pub const DRUM_CHANNEL: usize = 9;
pub const LYRICS_LINES: usize = 5;
pub const DIRECTION_COUNT: usize = 19;
/// Bytes of RSE and display settings closing each GP5.00 track
pub const TRACK_SETTINGS_SIZE: usize = 44;

const DEFAULT_FRET_COUNT: i32 = 24;
const DEFAULT_TEMPO_NAME: &str = "Moderate";
const DEFAULT_CHANNEL_VOLUME: u8 = 104;
const DEFAULT_CHANNEL_BALANCE: u8 = 64;
const TRACK_COLOR: i32 = 0x00FF_0000;
const BEAMS: [u8; 4] = [2, 2, 2, 2];

const PAGE_HEADERS: [&str; 10] = [
    "%TITLE%",
    "%SUBTITLE%",
    "%ARTIST%",
    "%ALBUM%",
    "Words by %WORDS%",
    "Music by %MUSIC%",
    "Words & Music by %WORDSMUSIC%",
    "Copyright %COPYRIGHT%",
    "All Rights Reserved - International Copyright Secured",
    "Page %N%/%P%",
];

/// Guitar Pro stores mixer values on a 0-16 scale
pub const fn to_channel_short(value: u8) -> i8 {
    (value >> 3) as i8
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Gp5Writer;

impl SongWriter for Gp5Writer {
    fn write_song(&self, song: &Song) -> Result<Vec<u8>, ConvertError> {
        log::debug!("Writing GP5 song '{}'", song.title);
        let channels = assign_channels(&song.tracks)?;
        let mut out = Vec::with_capacity(4096);

        write_byte_size_string(&mut out, GP5_VERSION, VERSION_FIELD_SIZE);
        write_info(&mut out, song);
        write_lyrics(&mut out);
        write_page_setup(&mut out);
        write_int_byte_sized_string(&mut out, DEFAULT_TEMPO_NAME);
        write_int(&mut out, song.tempo);
        write_i8(&mut out, song.key_signature.fifths());
        write_int(&mut out, 0); // octave
        write_midi_channels(&mut out, &song.tracks, &channels);
        write_directions(&mut out);
        write_int(&mut out, 0); // master reverb

        write_int(&mut out, count(song.measure_headers.len(), "measures")?);
        write_int(&mut out, count(song.tracks.len(), "tracks")?);
        write_measure_headers(&mut out, song);
        for (track, &channel) in song.tracks.iter().zip(&channels) {
            write_track(&mut out, track, channel)?;
        }
        write_placeholder(&mut out, 2);
        write_measures(&mut out, song)?;

        log::debug!("GP5 song written in {} bytes", out.len());
        Ok(out)
    }
}

fn count(len: usize, what: &str) -> Result<i32, ConvertError> {
    i32::try_from(len).map_err(|_| ConvertError::Serialization(format!("too many {what}: {len}")))
}

/// Percussion tracks share the drum channel, melodic tracks take the next free
/// channel skipping the drum slot of every port.
pub fn assign_channels(tracks: &[Track]) -> Result<Vec<usize>, ConvertError> {
    let mut next = 0;
    tracks
        .iter()
        .map(|track| {
            if track.percussion {
                return Ok(DRUM_CHANNEL);
            }
            if next % 16 == DRUM_CHANNEL {
                next += 1;
            }
            if next >= CHANNEL_COUNT {
                return Err(ConvertError::Serialization(format!(
                    "no MIDI channel left for track '{}'",
                    track.name
                )));
            }
            let channel = next;
            next += 1;
            Ok(channel)
        })
        .collect()
}

fn write_info(out: &mut Vec<u8>, song: &Song) {
    write_int_byte_sized_string(out, &song.title);
    write_int_byte_sized_string(out, ""); // subtitle
    write_int_byte_sized_string(out, &song.artist);
    for _ in 0..6 {
        // album, words, music, copyright, tab author, instructions
        write_int_byte_sized_string(out, "");
    }
    write_int(out, 0); // notices
}

fn write_lyrics(out: &mut Vec<u8>) {
    write_int(out, 0); // lyrics track
    for _ in 0..LYRICS_LINES {
        write_int(out, 1); // starting measure
        write_int_sized_string(out, "");
    }
}

fn write_page_setup(out: &mut Vec<u8>) {
    // A4 page size and margins in mm
    for value in [210, 297, 10, 15, 10, 10] {
        write_int(out, value);
    }
    write_int(out, 100); // score size proportion
    write_short(out, 0x01FF); // header and footer
    for header in PAGE_HEADERS {
        write_int_byte_sized_string(out, header);
    }
}

fn write_midi_channels(out: &mut Vec<u8>, tracks: &[Track], channels: &[usize]) {
    for channel_id in 0..CHANNEL_COUNT {
        let track = tracks
            .iter()
            .zip(channels)
            .find(|(_, &channel)| channel == channel_id)
            .map(|(track, _)| track);
        let (instrument, volume, balance) = match track {
            Some(track) => (i32::from(track.program), track.volume, track.pan),
            None if channel_id % 16 == DRUM_CHANNEL => {
                (0, DEFAULT_CHANNEL_VOLUME, DEFAULT_CHANNEL_BALANCE)
            }
            None => (
                i32::from(crate::song::tuning::DEFAULT_PROGRAM),
                DEFAULT_CHANNEL_VOLUME,
                DEFAULT_CHANNEL_BALANCE,
            ),
        };
        write_int(out, instrument);
        write_i8(out, to_channel_short(volume));
        write_i8(out, to_channel_short(balance));
        // chorus, reverb, phaser, tremolo
        write_placeholder(out, 4);
        write_placeholder(out, 2);
    }
}

fn write_directions(out: &mut Vec<u8>) {
    // coda, segno, fine... none placed
    for _ in 0..DIRECTION_COUNT {
        write_short(out, -1);
    }
}

fn write_measure_headers(out: &mut Vec<u8>, song: &Song) {
    let mut previous: Option<&TimeSignature> = None;
    for (index, header) in song.measure_headers.iter().enumerate() {
        if index > 0 {
            write_placeholder(out, 1);
        }
        write_measure_header(out, song, index, header, previous);
        previous = Some(&header.time_signature);
    }
}

fn write_measure_header(
    out: &mut Vec<u8>,
    song: &Song,
    index: usize,
    header: &MeasureHeader,
    previous: Option<&TimeSignature>,
) {
    let time_signature = &header.time_signature;
    let mut flags = 0u8;
    if previous.map_or(true, |p| p.numerator != time_signature.numerator) {
        flags |= 0x01;
    }
    if previous.map_or(true, |p| p.denominator != time_signature.denominator) {
        flags |= 0x02;
    }
    if header.repeat_open {
        flags |= 0x04;
    }
    if header.repeat_close > 0 {
        flags |= 0x08;
    }
    if header.marker.is_some() {
        flags |= 0x20;
    }
    // the first header carries the key so the mode is kept
    if index == 0 {
        flags |= 0x40;
    }
    write_u8(out, flags);

    if (flags & 0x01) != 0 {
        write_i8(out, time_signature.numerator);
    }
    if (flags & 0x02) != 0 {
        write_i8(out, time_signature.denominator.value.denominator() as i8);
    }
    if (flags & 0x08) != 0 {
        write_i8(out, header.repeat_close.saturating_add(1));
    }
    if let Some(marker) = &header.marker {
        write_int_byte_sized_string(out, &marker.title);
        write_color(out, marker.color);
    }
    if (flags & 0x40) != 0 {
        write_i8(out, song.key_signature.fifths());
        write_i8(out, i8::from(song.key_signature.is_minor()));
    }
    if (flags & 0x01) != 0 || (flags & 0x02) != 0 {
        out.extend_from_slice(&BEAMS);
    }
    // no repeat alternative
    write_placeholder(out, 1);
    write_u8(out, 0); // triplet feel
}

fn write_track(out: &mut Vec<u8>, track: &Track, channel: usize) -> Result<(), ConvertError> {
    log::debug!("Writing track {} '{}' on channel {channel}", track.number, track.name);
    if track.strings.len() > MAX_STRINGS {
        return Err(ConvertError::Serialization(format!(
            "track '{}' has {} strings, at most {MAX_STRINGS} are supported",
            track.name,
            track.strings.len()
        )));
    }
    write_placeholder(out, 1);
    let mut flags = 0x08; // visible
    if track.percussion {
        flags |= 0x01;
    }
    write_u8(out, flags);
    write_byte_size_string(out, &track.name, TRACK_NAME_FIELD_SIZE);
    write_int(out, track.strings.len() as i32);
    for index in 0..MAX_STRINGS {
        write_int(out, track.strings.get(index).map_or(0, |s| s.value));
    }
    write_int(out, (channel / 16) as i32 + 1); // port
    // channel and effect channel, 1-based indexes into the 64 entry table
    write_int(out, channel as i32 + 1);
    write_int(out, channel as i32 + 1);
    write_int(out, DEFAULT_FRET_COUNT);
    write_int(out, track.capo);
    write_color(out, TRACK_COLOR);
    write_track_settings(out);
    Ok(())
}

fn write_track_settings(out: &mut Vec<u8>) {
    let start = out.len();
    write_short(out, 0x0003); // show tablature and standard notation
    write_u8(out, 0); // auto accentuation
    write_u8(out, 0); // bank
    write_u8(out, 0); // humanize
    write_placeholder(out, 12);
    write_placeholder(out, 12);
    // RSE instrument: instrument, unknown, sound bank, effect number
    write_int(out, -1);
    write_int(out, -1);
    write_int(out, -1);
    write_short(out, -1);
    write_placeholder(out, 1);
    debug_assert_eq!(out.len() - start, TRACK_SETTINGS_SIZE);
}

/// Measures are written measure by measure, each holding every track in order.
fn write_measures(out: &mut Vec<u8>, song: &Song) -> Result<(), ConvertError> {
    for header_index in 0..song.measure_headers.len() {
        for track in &song.tracks {
            let measure = track.measures.get(header_index).ok_or_else(|| {
                ConvertError::Serialization(format!(
                    "track '{}' has no measure {}",
                    track.name,
                    header_index + 1
                ))
            })?;
            write_voice(out, track, &measure.voice)?;
            write_int(out, 0); // second voice is empty
            write_u8(out, 0); // line break
        }
    }
    Ok(())
}

fn write_voice(out: &mut Vec<u8>, track: &Track, voice: &Voice) -> Result<(), ConvertError> {
    write_int(out, count(voice.beats.len(), "beats")?);
    for beat in &voice.beats {
        write_beat(out, track, beat)?;
    }
    Ok(())
}

fn write_beat(out: &mut Vec<u8>, track: &Track, beat: &Beat) -> Result<(), ConvertError> {
    let mut flags = 0u8;
    if beat.duration.dotted {
        flags |= 0x01;
    }
    if beat.is_rest() {
        flags |= 0x40;
    }
    write_u8(out, flags);
    if (flags & 0x40) != 0 {
        write_u8(out, 0x02);
    }
    write_i8(out, beat.duration.value.gp_exponent());

    let notes = notes_by_string(track, &beat.notes)?;
    let string_flags = notes
        .iter()
        .enumerate()
        .filter(|(_, note)| note.is_some())
        .fold(0u8, |flags, (index, _)| flags | (1 << (6 - index)));
    write_u8(out, string_flags);
    for note in notes.iter().flatten() {
        write_note(out, note);
    }
    write_short(out, 0);
    Ok(())
}

/// Notes slotted by string, string 1 first.
fn notes_by_string<'a>(
    track: &Track,
    notes: &'a [Note],
) -> Result<[Option<&'a Note>; MAX_STRINGS], ConvertError> {
    let mut slots = [None; MAX_STRINGS];
    for note in notes {
        let index = usize::try_from(i16::from(note.string) - 1)
            .ok()
            .filter(|index| *index < track.strings.len())
            .ok_or_else(|| {
                ConvertError::Serialization(format!(
                    "note on string {} of track '{}' which has {} strings",
                    note.string,
                    track.name,
                    track.strings.len()
                ))
            })?;
        if slots[index].replace(note).is_some() {
            return Err(ConvertError::Serialization(format!(
                "two notes on string {} in one beat of track '{}'",
                note.string, track.name
            )));
        }
    }
    Ok(slots)
}

fn write_note(out: &mut Vec<u8>, note: &Note) {
    let flags = 0x20; // note type and fret follow
    write_u8(out, flags);
    write_u8(out, note.kind.to_byte());
    write_i8(out, note.value);
    write_u8(out, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::tuning::resolve_strings;
    use crate::song::{BeatStatus, Duration, DurationValue, Measure};

    fn guitar(name: &str, percussion: bool) -> Track {
        Track {
            name: name.to_string(),
            percussion,
            strings: resolve_strings(None),
            ..Default::default()
        }
    }

    #[test]
    fn channels_skip_drum_slot() {
        let mut tracks: Vec<Track> = (0..11).map(|i| guitar(&format!("g{i}"), false)).collect();
        tracks.insert(2, guitar("drums", true));
        let channels = assign_channels(&tracks).unwrap();
        assert_eq!(channels, vec![0, 1, 9, 2, 3, 4, 5, 6, 7, 8, 10, 11]);
    }

    #[test]
    fn too_many_melodic_tracks() {
        let tracks: Vec<Track> = (0..61).map(|i| guitar(&format!("g{i}"), false)).collect();
        let err = assign_channels(&tracks).unwrap_err();
        assert!(matches!(err, ConvertError::Serialization(_)));
        assert!(assign_channels(&tracks[..60]).is_ok());
    }

    #[test]
    fn beat_bytes() {
        let track = guitar("lead", false);
        let beat = Beat {
            status: BeatStatus::Normal,
            duration: Duration::new(DurationValue::Eighth, true),
            notes: vec![Note::new(6, 3), Note::new(1, 5)],
        };
        let mut out = vec![];
        write_beat(&mut out, &track, &beat).unwrap();
        assert_eq!(
            out,
            vec![
                0x01, // dotted
                1,    // eighth
                0b0100_0010,
                0x20, 1, 5, 0, // string 1
                0x20, 1, 3, 0, // string 6
                0, 0,
            ]
        );
    }

    #[test]
    fn rest_beat_bytes() {
        let track = guitar("lead", false);
        let beat = Beat {
            status: BeatStatus::Rest,
            duration: Duration::new(DurationValue::Whole, false),
            notes: vec![],
        };
        let mut out = vec![];
        write_beat(&mut out, &track, &beat).unwrap();
        assert_eq!(out, vec![0x40, 0x02, 0xFE, 0, 0, 0]);
    }

    #[test]
    fn invalid_notes_are_serialization_errors() {
        let track = guitar("lead", false);
        for notes in [
            vec![Note::new(7, 0)],
            vec![Note::new(0, 0)],
            vec![Note::new(2, 1), Note::new(2, 3)],
        ] {
            let beat = Beat {
                notes,
                ..Default::default()
            };
            let err = write_beat(&mut vec![], &track, &beat).unwrap_err();
            assert!(matches!(err, ConvertError::Serialization(_)));
        }
    }

    #[test]
    fn eight_strings_cannot_be_written() {
        let mut track = guitar("eight", false);
        track.strings = resolve_strings(Some(&[30, 35, 40, 45, 50, 55, 59, 64]));
        let err = write_track(&mut vec![], &track, 0).unwrap_err();
        assert!(matches!(err, ConvertError::Serialization(_)));
    }

    #[test]
    fn track_channel_indexes_the_whole_channel_table() {
        let track = guitar("banjo", false);
        let mut out = vec![];
        write_track(&mut out, &track, 17).unwrap();
        // placeholder, flags, name field, string count, tunings
        let start = 1 + 1 + 1 + TRACK_NAME_FIELD_SIZE + 4 + 4 * MAX_STRINGS;
        let int_at = |offset: usize| {
            i32::from_le_bytes([out[offset], out[offset + 1], out[offset + 2], out[offset + 3]])
        };
        assert_eq!(int_at(start), 2); // port
        assert_eq!(int_at(start + 4), 18);
        assert_eq!(int_at(start + 8), 18);
    }

    #[test]
    fn song_starts_with_version_and_title() {
        let mut track = guitar("lead", false);
        track.measures.push(Measure::default());
        let song = Song {
            title: "Song".to_string(),
            artist: "Band".to_string(),
            measure_headers: vec![MeasureHeader {
                number: 1,
                ..Default::default()
            }],
            tracks: vec![track],
            ..Default::default()
        };
        let bytes = Gp5Writer.write_song(&song).unwrap();
        assert_eq!(bytes[0], 24);
        assert_eq!(&bytes[1..25], GP5_VERSION.as_bytes());
        // title right after the 30 bytes version field
        assert_eq!(&bytes[31..40], &[5, 0, 0, 0, 4, b'S', b'o', b'n', b'g']);
    }

    #[test]
    fn missing_measure_is_a_serialization_error() {
        let song = Song {
            measure_headers: vec![MeasureHeader::default()],
            tracks: vec![guitar("lead", false)],
            ..Default::default()
        };
        let err = Gp5Writer.write_song(&song).unwrap_err();
        assert!(matches!(err, ConvertError::Serialization(_)));
    }
}
