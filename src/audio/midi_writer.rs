//! Standard MIDI File encoding of generated sequences.

use crate::audio::midi_event::{MidiEvent, MidiEventType};
use crate::audio::tick_sequencer::{Sequence, SequenceTrack, BEATS_PER_MEASURE};
use crate::ConvertError;
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;
const MAX_TEMPO: u32 = 0x00FF_FFFF;
const MAX_TICKS_PER_BEAT: u16 = 0x7FFF;
const MAX_DELTA: u32 = 0x0FFF_FFFF;

/// Encodes a generated sequence into a MIDI file.
pub trait SequenceWriter {
    fn write_sequence(&self, sequence: &Sequence) -> Result<Vec<u8>, ConvertError>;
}

/// Microseconds per quarter note for a tempo in BPM.
pub fn bpm_to_tempo(bpm: i32) -> u32 {
    let bpm = f64::from(bpm.max(1));
    let tempo = (MICROSECONDS_PER_MINUTE / bpm).round() as u32;
    tempo.clamp(1, MAX_TEMPO)
}

/// Format 1 writer: a conductor track then one track per sequence track.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmfWriter;

impl SequenceWriter for SmfWriter {
    fn write_sequence(&self, sequence: &Sequence) -> Result<Vec<u8>, ConvertError> {
        if sequence.ticks_per_beat == 0 || sequence.ticks_per_beat > MAX_TICKS_PER_BEAT {
            return Err(ConvertError::Serialization(format!(
                "resolution of {} ticks per beat cannot be stored",
                sequence.ticks_per_beat
            )));
        }
        let header = Header::new(
            Format::Parallel,
            Timing::Metrical(u15::new(sequence.ticks_per_beat)),
        );
        let mut tracks = Vec::with_capacity(sequence.tracks.len() + 1);
        tracks.push(conductor_track(sequence));
        for track in &sequence.tracks {
            tracks.push(note_track(track)?);
        }
        let smf = Smf { header, tracks };

        let mut buffer = Vec::new();
        smf.write(&mut buffer)
            .map_err(|e| ConvertError::Serialization(format!("failed to write MIDI: {e}")))?;
        log::debug!(
            "MIDI sequence written with {} tracks in {} bytes",
            smf.tracks.len(),
            buffer.len()
        );
        Ok(buffer)
    }
}

fn meta(message: MetaMessage<'_>) -> TrackEvent<'_> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(message),
    }
}

fn conductor_track(sequence: &Sequence) -> Vec<TrackEvent<'static>> {
    vec![
        meta(MetaMessage::Tempo(u24::new(bpm_to_tempo(sequence.tempo)))),
        // 4/4, 24 clocks per click, 8 32nds per quarter
        meta(MetaMessage::TimeSignature(BEATS_PER_MEASURE as u8, 2, 24, 8)),
        meta(MetaMessage::EndOfTrack),
    ]
}

fn note_track(track: &SequenceTrack) -> Result<Vec<TrackEvent<'_>>, ConvertError> {
    let mut events = Vec::with_capacity(track.measures.iter().map(Vec::len).sum::<usize>() + 3);
    events.push(meta(MetaMessage::TrackName(track.name.as_bytes())));
    if let Some(program) = track.program {
        events.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel: u4::new(track.channel),
                message: MidiMessage::ProgramChange {
                    program: u7::new(program),
                },
            },
        });
    }
    for event in track.events() {
        events.push(note_event(event)?);
    }
    events.push(meta(MetaMessage::EndOfTrack));
    Ok(events)
}

fn note_event(event: &MidiEvent) -> Result<TrackEvent<'static>, ConvertError> {
    if event.delta > MAX_DELTA || event.channel() > 15 || event.key() > 127 {
        return Err(ConvertError::Serialization(format!(
            "MIDI event out of range: {event:?}"
        )));
    }
    let message = match event.event {
        MidiEventType::NoteOn(_, key, velocity) => MidiMessage::NoteOn {
            key: u7::new(key),
            vel: u7::new(velocity.min(127)),
        },
        MidiEventType::NoteOff(_, key) => MidiMessage::NoteOff {
            key: u7::new(key),
            vel: u7::new(0),
        },
    };
    Ok(TrackEvent {
        delta: u28::new(event.delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(event.channel()),
            message,
        },
    })
}
