//! Guitar Pro 5.00 reader.
//!
//! Reads back what [`crate::writer::gp5_writer::Gp5Writer`] produces. Files
//! using features the song model cannot hold (chords, beat text, effects, mix
//! table changes, note effects, a second voice) are rejected instead of being
//! silently truncated.

use crate::parser::primitive_parser::{
    parse_byte_size_string, parse_color, parse_count, parse_i8, parse_int,
    parse_int_byte_sized_string, parse_int_sized_string, parse_short, parse_u8, skip,
};
use crate::song::tuning::program_label;
use crate::song::{
    Beat, BeatStatus, Duration, DurationValue, GuitarString, KeySignature, Marker, Measure,
    MeasureHeader, Mode, Note, NoteType, Song, TimeSignature, Track, Voice,
};
use crate::writer::gp5_writer::{
    CHANNEL_COUNT, DIRECTION_COUNT, GP5_VERSION, LYRICS_LINES, MAX_STRINGS, TRACK_NAME_FIELD_SIZE,
    TRACK_SETTINGS_SIZE, VERSION_FIELD_SIZE,
};
use crate::ConvertError;
use nom::error::{Error, ErrorKind};
use nom::multi::count;
use nom::{IResult, Parser};

const INFO_FIELDS: usize = 9;
const PAGE_HEADER_FIELDS: usize = 10;

const BEAT_DOTTED: u8 = 0x01;
const BEAT_STATUS: u8 = 0x40;
const NOTE_TYPE_AND_FRET: u8 = 0x20;

#[derive(Debug, Clone, Copy, Default)]
struct MidiChannel {
    instrument: i32,
    volume: i8,
    balance: i8,
}

impl MidiChannel {
    fn to_mixer_value(short: i8) -> u8 {
        (short.max(0) as u8).saturating_mul(8).min(127)
    }
}

/// Parse a GP5.00 file into the song model.
pub fn parse_gp5_data(file_data: &[u8]) -> Result<Song, ConvertError> {
    let mut parser = Gp5Parser::default();
    let result = parser.parse_song_data(file_data);
    if let Some(reason) = parser.unsupported.take() {
        log::error!("Unsupported GP5 content: {reason}");
        return Err(ConvertError::Parsing(reason));
    }
    match result {
        Ok((rest, ())) => {
            if !rest.is_empty() {
                log::debug!("{} trailing bytes after GP5 data", rest.len());
            }
            Ok(parser.song)
        }
        Err(e) => {
            log::error!("Failed to parse GP5 data: {e:?}");
            Err(ConvertError::Parsing(
                "Failed to parse GP5 data".to_string(),
            ))
        }
    }
}

fn failure(i: &[u8]) -> nom::Err<Error<&[u8]>> {
    nom::Err::Failure(Error::new(i, ErrorKind::Verify))
}

#[derive(Default)]
struct Gp5Parser {
    song: Song,
    channels: Vec<MidiChannel>,
    unsupported: Option<String>,
}

impl Gp5Parser {
    /// Record why the file cannot be read and stop parsing.
    fn reject<'a, T>(&mut self, i: &'a [u8], reason: String) -> IResult<&'a [u8], T> {
        self.unsupported = Some(reason);
        Err(failure(i))
    }

    fn parse_song_data<'a>(&mut self, i: &'a [u8]) -> IResult<&'a [u8], ()> {
        let (i, version) = parse_byte_size_string(VERSION_FIELD_SIZE)(i)?;
        log::debug!("Version: {version}");
        if version != GP5_VERSION {
            return self.reject(i, format!("unsupported file version '{version}'"));
        }
        let (i, info) = count(parse_int_byte_sized_string, INFO_FIELDS).parse(i)?;
        self.song.title.clone_from(&info[0]);
        self.song.artist.clone_from(&info[2]);

        let (mut i, notice_count) = parse_count(i)?;
        for _ in 0..notice_count {
            let (inner, _notice) = parse_int_byte_sized_string(i)?;
            i = inner;
        }

        // lyrics track, then each line with its starting measure
        let (mut i, _lyrics_track) = parse_int(i)?;
        for _ in 0..LYRICS_LINES {
            let (inner, (_from, _text)) = (parse_int, parse_int_sized_string).parse(i)?;
            i = inner;
        }

        // page setup: size, margins, proportion, header flags, header texts
        let (i, _) = count(parse_int, 7).parse(i)?;
        let (i, _) = parse_short(i)?;
        let (i, _) = count(parse_int_byte_sized_string, PAGE_HEADER_FIELDS).parse(i)?;

        let (i, _tempo_name) = parse_int_byte_sized_string(i)?;
        let (i, (tempo, key, _octave)) = (parse_int, parse_i8, parse_int).parse(i)?;
        self.song.tempo = tempo;
        self.song.key_signature = KeySignature::from_fifths(key, Mode::Major).unwrap_or_default();

        let (i, channels) = count(parse_midi_channel, CHANNEL_COUNT).parse(i)?;
        self.channels = channels;

        // directions and master reverb
        let (i, ()) = skip(DIRECTION_COUNT * 2 + 4)(i)?;

        let (i, (measure_count, track_count)) = (parse_count, parse_count).parse(i)?;
        log::debug!("Parsing music data -> track_count: {track_count} measure_count {measure_count}");

        let i = self.parse_measure_headers(i, measure_count)?.0;
        let mut i = i;
        for number in 1..=track_count {
            let (inner, track) = self.parse_track(i, number)?;
            i = inner;
            self.song.tracks.push(track);
        }
        let (i, ()) = skip(2)(i)?;
        self.parse_measures(i)
    }

    fn parse_measure_headers<'a>(
        &mut self,
        i: &'a [u8],
        measure_count: usize,
    ) -> IResult<&'a [u8], ()> {
        let mut i = i;
        let mut previous = TimeSignature::default();
        for index in 0..measure_count {
            // one blank byte between headers
            if index > 0 {
                i = skip(1)(i)?.0;
            }
            let (inner, header) = self.parse_measure_header(i, index, &previous)?;
            i = inner;
            previous = header.time_signature.clone();
            self.song.measure_headers.push(header);
        }
        Ok((i, ()))
    }

    fn parse_measure_header<'a>(
        &mut self,
        i: &'a [u8],
        index: usize,
        previous: &TimeSignature,
    ) -> IResult<&'a [u8], MeasureHeader> {
        let (mut i, flags) = parse_u8(i)?;
        log::debug!("Measure header {} flags: {flags:08b}", index + 1);
        let mut header = MeasureHeader {
            number: index + 1,
            time_signature: previous.clone(),
            repeat_open: (flags & 0x04) != 0,
            ..Default::default()
        };

        if (flags & 0x01) != 0 {
            let (inner, numerator) = parse_i8(i)?;
            if numerator < 1 {
                return self.reject(i, format!("time signature numerator {numerator}"));
            }
            i = inner;
            header.time_signature.numerator = numerator;
        }
        if (flags & 0x02) != 0 {
            let (inner, denominator) = parse_i8(i)?;
            let Some(value) = DurationValue::from_denominator(i64::from(denominator)) else {
                return self.reject(i, format!("time signature denominator {denominator}"));
            };
            i = inner;
            header.time_signature.denominator = Duration::new(value, false);
        }
        if (flags & 0x08) != 0 {
            let (inner, repeat_close) = parse_i8(i)?;
            i = inner;
            header.repeat_close = repeat_close.saturating_sub(1).max(0);
        }
        if (flags & 0x20) != 0 {
            let (inner, (title, color)) = (parse_int_byte_sized_string, parse_color).parse(i)?;
            i = inner;
            header.marker = Some(Marker { title, color });
        }
        if (flags & 0x10) != 0 {
            let (inner, alternative) = parse_u8(i)?;
            i = inner;
            log::debug!("Ignoring repeat alternative {alternative}");
        }
        if (flags & 0x40) != 0 {
            let (inner, (fifths, minor)) = (parse_i8, parse_i8).parse(i)?;
            let mode = if minor != 0 { Mode::Minor } else { Mode::Major };
            let Some(key) = KeySignature::from_fifths(fifths, mode) else {
                return self.reject(i, format!("key signature with {fifths} fifths"));
            };
            i = inner;
            if index == 0 {
                self.song.key_signature = key;
            }
        }
        if (flags & 0x01) != 0 || (flags & 0x02) != 0 {
            i = skip(4)(i)?.0; // beams
        }
        if (flags & 0x10) == 0 {
            i = skip(1)(i)?.0;
        }
        let (i, _triplet_feel) = parse_u8(i)?;
        Ok((i, header))
    }

    fn parse_track<'a>(&mut self, i: &'a [u8], number: usize) -> IResult<&'a [u8], Track> {
        log::debug!("Parsing track {number}");
        let (i, ()) = skip(1)(i)?;
        let (i, flags) = parse_u8(i)?;
        let (i, name) = parse_byte_size_string(TRACK_NAME_FIELD_SIZE)(i)?;
        let (i, string_count) = parse_count(i)?;
        if string_count == 0 || string_count > MAX_STRINGS {
            return self.reject(i, format!("track '{name}' has {string_count} strings"));
        }
        let (i, tunings) = count(parse_int, MAX_STRINGS).parse(i)?;
        let (i, (port, channel, _effect_channel, _frets, capo, _color)) =
            (parse_int, parse_int, parse_int, parse_int, parse_int, parse_color).parse(i)?;
        let (i, ()) = skip(TRACK_SETTINGS_SIZE)(i)?;

        let ports = (CHANNEL_COUNT / 16) as i32;
        let midi_channel = if (1..=ports).contains(&port) && channel >= 1 {
            self.channels.get(channel as usize - 1).copied()
        } else {
            None
        };
        let Some(midi_channel) = midi_channel else {
            return self.reject(i, format!("track '{name}' uses port {port} channel {channel}"));
        };

        let percussion = (flags & 0x01) != 0;
        let program = u8::try_from(midi_channel.instrument).unwrap_or_default();
        let track = Track {
            number: number as i32,
            name,
            percussion,
            instrument: if percussion {
                "Drums".to_string()
            } else {
                program_label(program)
            },
            program,
            strings: tunings
                .iter()
                .take(string_count)
                .enumerate()
                .map(|(index, &value)| GuitarString {
                    number: index as i32 + 1,
                    value,
                })
                .collect(),
            capo,
            volume: MidiChannel::to_mixer_value(midi_channel.volume),
            pan: MidiChannel::to_mixer_value(midi_channel.balance),
            measures: Vec::with_capacity(self.song.measure_headers.len()),
        };
        log::debug!("{track:?}");
        Ok((i, track))
    }

    /// Measures come measure by measure, each holding every track in order.
    fn parse_measures<'a>(&mut self, i: &'a [u8]) -> IResult<&'a [u8], ()> {
        let mut i = i;
        for header_index in 0..self.song.measure_headers.len() {
            for track_index in 0..self.song.tracks.len() {
                let (inner, voice) = self.parse_voice(i, track_index)?;
                let (inner, second) = self.parse_voice(inner, track_index)?;
                if !second.beats.is_empty() {
                    return self.reject(
                        i,
                        format!("second voice in measure {}", header_index + 1),
                    );
                }
                let (inner, ()) = skip(1)(inner)?; // line break
                i = inner;
                self.song.tracks[track_index].measures.push(Measure {
                    track_index,
                    header_index,
                    voice,
                });
            }
        }
        Ok((i, ()))
    }

    fn parse_voice<'a>(&mut self, i: &'a [u8], track_index: usize) -> IResult<&'a [u8], Voice> {
        let (mut i, beat_count) = parse_count(i)?;
        let mut voice = Voice {
            beats: Vec::with_capacity(beat_count.min(i.len())),
        };
        for _ in 0..beat_count {
            let (inner, beat) = self.parse_beat(i, track_index)?;
            i = inner;
            voice.beats.push(beat);
        }
        Ok((i, voice))
    }

    fn parse_beat<'a>(&mut self, i: &'a [u8], track_index: usize) -> IResult<&'a [u8], Beat> {
        let (mut i, flags) = parse_u8(i)?;
        let unsupported = flags & !(BEAT_DOTTED | BEAT_STATUS);
        if unsupported != 0 {
            let feature = match unsupported {
                f if (f & 0x02) != 0 => "chord diagram",
                f if (f & 0x04) != 0 => "beat text",
                f if (f & 0x08) != 0 => "beat effects",
                f if (f & 0x10) != 0 => "mix table change",
                f if (f & 0x20) != 0 => "tuplet",
                _ => "unknown beat flag",
            };
            return self.reject(i, format!("{feature} (beat flags {flags:08b})"));
        }

        let mut beat = Beat::default();
        if (flags & BEAT_STATUS) != 0 {
            let (inner, status) = parse_u8(i)?;
            i = inner;
            if status == 0x02 {
                beat.status = BeatStatus::Rest;
            }
        }
        let (i, exponent) = parse_i8(i)?;
        let Some(value) = DurationValue::from_gp_exponent(exponent) else {
            return self.reject(i, format!("beat duration exponent {exponent}"));
        };
        beat.duration = Duration::new(value, (flags & BEAT_DOTTED) != 0);

        let (mut i, string_flags) = parse_u8(i)?;
        let string_count = self.song.tracks[track_index].strings.len();
        let known_strings = (1..=string_count).fold(0u8, |mask, s| mask | (1 << (7 - s)));
        if (string_flags & !known_strings) != 0 {
            return self.reject(i, format!("note on a missing string ({string_flags:08b})"));
        }
        for string in 1..=string_count {
            if (string_flags & (1 << (7 - string))) != 0 {
                let (inner, note) = self.parse_note(i, string as i8)?;
                i = inner;
                beat.notes.push(note);
            }
        }

        let (mut i, flags2) = parse_short(i)?;
        if (flags2 & 0x0800) != 0 {
            i = skip(1)(i)?.0;
        }
        Ok((i, beat))
    }

    fn parse_note<'a>(&mut self, i: &'a [u8], string: i8) -> IResult<&'a [u8], Note> {
        let (mut i, flags) = parse_u8(i)?;
        if (flags & !NOTE_TYPE_AND_FRET) != 0 {
            return self.reject(i, format!("note effects (note flags {flags:08b})"));
        }
        let mut note = Note::new(string, 0);
        if (flags & NOTE_TYPE_AND_FRET) != 0 {
            let (inner, (kind, fret)) = (parse_u8, parse_i8).parse(i)?;
            i = inner;
            note.kind = NoteType::get_note_type(kind);
            note.value = fret;
        }
        let (i, ()) = skip(1)(i)?;
        Ok((i, note))
    }
}

fn parse_midi_channel(i: &[u8]) -> IResult<&[u8], MidiChannel> {
    let (i, (instrument, volume, balance)) = (parse_int, parse_i8, parse_i8).parse(i)?;
    // chorus, reverb, phaser, tremolo and two blank bytes
    let (i, ()) = skip(6)(i)?;
    Ok((
        i,
        MidiChannel {
            instrument,
            volume,
            balance,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::tuning::{resolve_program, resolve_strings};
    use crate::writer::gp5_writer::Gp5Writer;
    use crate::writer::SongWriter;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn sample_song() -> Song {
        let headers = vec![
            MeasureHeader {
                number: 1,
                repeat_open: true,
                marker: Some(Marker {
                    title: "Intro".to_string(),
                    color: crate::song::MARKER_COLOR,
                }),
                ..Default::default()
            },
            MeasureHeader {
                number: 2,
                time_signature: TimeSignature {
                    numerator: 6,
                    denominator: Duration::from_denominator(8),
                },
                repeat_close: 2,
                ..Default::default()
            },
        ];
        let beats = vec![
            Beat {
                status: BeatStatus::Normal,
                duration: Duration::new(DurationValue::Eighth, true),
                notes: vec![Note::new(1, 5), Note::new(6, 3)],
            },
            Beat {
                status: BeatStatus::Rest,
                duration: Duration::new(DurationValue::Half, false),
                notes: vec![],
            },
        ];
        let lead = Track {
            number: 1,
            name: "Lead".to_string(),
            instrument: "Overdriven guitar".to_string(),
            program: 29,
            strings: resolve_strings(None),
            capo: 2,
            volume: 96,
            pan: 64,
            measures: vec![
                Measure {
                    track_index: 0,
                    header_index: 0,
                    voice: Voice { beats },
                },
                Measure {
                    track_index: 0,
                    header_index: 1,
                    voice: Voice::default(),
                },
            ],
            ..Default::default()
        };
        let drums = Track {
            number: 2,
            name: "Drums".to_string(),
            percussion: true,
            instrument: "Drums".to_string(),
            program: 0,
            strings: resolve_strings(None),
            volume: 120,
            pan: 32,
            measures: (0..2)
                .map(|header_index| Measure {
                    track_index: 1,
                    header_index,
                    voice: Voice::default(),
                })
                .collect(),
            ..Default::default()
        };
        Song {
            title: "Round Trip".to_string(),
            artist: "Tester".to_string(),
            tempo: 90,
            key_signature: KeySignature::parse(Some("E minor")),
            measure_headers: headers,
            tracks: vec![lead, drums],
        }
    }

    #[test]
    fn reads_back_written_song() {
        init_logger();
        let song = sample_song();
        let bytes = Gp5Writer.write_song(&song).unwrap();
        let parsed = parse_gp5_data(&bytes).unwrap();
        assert_eq!(parsed.title, "Round Trip");
        assert_eq!(parsed.artist, "Tester");
        assert_eq!(parsed.tempo, 90);
        assert_eq!(parsed.key_signature, song.key_signature);
        assert_eq!(parsed.measure_headers, song.measure_headers);

        let lead = &parsed.tracks[0];
        assert_eq!(lead.name, "Lead");
        assert_eq!(lead.program, 29);
        assert_eq!(lead.strings, resolve_strings(None));
        assert_eq!(lead.capo, 2);
        assert_eq!((lead.volume, lead.pan), (96, 64));
        assert_eq!(lead.measures, song.tracks[0].measures);

        let drums = &parsed.tracks[1];
        assert!(drums.percussion);
        assert_eq!((drums.volume, drums.pan), (120, 32));
        assert_eq!(drums.measures.len(), 2);
    }

    #[test]
    fn tracks_past_the_first_port_keep_their_channel() {
        init_logger();
        let instruments = (0..17).map(|index| if index == 16 { "banjo" } else { "guitar" });
        let tracks: Vec<Track> = instruments
            .enumerate()
            .map(|(index, instrument)| Track {
                number: index as i32 + 1,
                name: format!("t{index}"),
                instrument: instrument.to_string(),
                program: resolve_program(instrument),
                strings: resolve_strings(None),
                volume: if index == 16 { 80 } else { 100 },
                measures: vec![Measure {
                    track_index: index,
                    header_index: 0,
                    voice: Voice::default(),
                }],
                ..Default::default()
            })
            .collect();
        let song = Song {
            measure_headers: vec![MeasureHeader {
                number: 1,
                ..Default::default()
            }],
            tracks,
            ..Default::default()
        };
        let bytes = Gp5Writer.write_song(&song).unwrap();
        let parsed = parse_gp5_data(&bytes).unwrap();
        assert_eq!(parsed.tracks.len(), 17);
        assert!(parsed.tracks[..16].iter().all(|t| t.program == 25));
        let banjo = &parsed.tracks[16];
        assert_eq!(banjo.program, 105);
        assert_eq!(banjo.instrument, "Banjo");
        assert_eq!(banjo.volume, 80);
    }

    #[test]
    fn truncated_file_is_a_parsing_error() {
        init_logger();
        let bytes = Gp5Writer.write_song(&sample_song()).unwrap();
        for len in [0, 10, 31, bytes.len() / 2, bytes.len() - 1] {
            let err = parse_gp5_data(&bytes[..len]).unwrap_err();
            assert!(matches!(err, ConvertError::Parsing(_)), "{len}: {err:?}");
        }
    }

    #[test]
    fn other_versions_are_rejected() {
        let mut bytes = Gp5Writer.write_song(&sample_song()).unwrap();
        // FICHIER GUITAR PRO v5.00 -> v5.10
        bytes[23] = b'1';
        let err = parse_gp5_data(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported file version"));
    }

    #[test]
    fn beat_effects_are_rejected() {
        let mut parser = Gp5Parser::default();
        parser.song.tracks.push(Track {
            strings: resolve_strings(None),
            ..Default::default()
        });
        assert!(parser.parse_beat(&[0x08, 0, 0, 0, 0], 0).is_err());
        assert!(parser.unsupported.unwrap().contains("beat effects"));
    }

    #[test]
    fn note_effects_are_rejected() {
        let mut parser = Gp5Parser::default();
        parser.song.tracks.push(Track {
            strings: resolve_strings(None),
            ..Default::default()
        });
        // quarter on string 1 with a note effect flag
        let data = [0x00, 0x00, 0b0100_0000, 0x28, 1, 5, 0, 0, 0];
        assert!(parser.parse_beat(&data, 0).is_err());
        assert!(parser.unsupported.unwrap().contains("note effects"));
    }

    #[test]
    fn note_on_missing_string_is_rejected() {
        let mut parser = Gp5Parser::default();
        parser.song.tracks.push(Track {
            strings: resolve_strings(Some(&[28, 33, 38, 43])),
            ..Default::default()
        });
        // string 6 on a four string bass
        let data = [0x00, 0x00, 0b0000_0010, 0x20, 1, 3, 0, 0, 0];
        assert!(parser.parse_beat(&data, 0).is_err());
        assert!(parser.unsupported.is_some());
    }
}
