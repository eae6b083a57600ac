use crate::audio::midi_event::MidiEvent;
use crate::audio::progression::{DefaultProgression, ProgressionResolver};
use crate::schema::SequenceRequest;
use crate::song::KeySignature;

/// Resolution of generated sequences, ticks per quarter note
pub const TICKS_PER_BEAT: u16 = 480;
pub const BEATS_PER_MEASURE: u32 = 4;

pub const MELODIC_VELOCITY: u8 = 90;
pub const HAT_VELOCITY: u8 = 60;

pub const KICK: u8 = 36;
pub const SNARE: u8 = 38;
pub const CLOSED_HAT: u8 = 42;

pub const GUITAR_PROGRAM: u8 = 30;
pub const BASS_PROGRAM: u8 = 32;
pub const DRUM_CHANNEL: u8 = 9;

/// A generated multi-track sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// beats per minute
    pub tempo: i32,
    pub ticks_per_beat: u16,
    pub key_signature: KeySignature,
    pub tracks: Vec<SequenceTrack>,
}

impl Sequence {
    pub fn ticks_per_measure(&self) -> u32 {
        u32::from(self.ticks_per_beat) * BEATS_PER_MEASURE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceTrack {
    pub name: String,
    pub channel: u8,
    /// No program change is emitted on the drum channel
    pub program: Option<u8>,
    /// Note events grouped by measure, deltas relative to the previous event
    pub measures: Vec<Vec<MidiEvent>>,
}

impl SequenceTrack {
    pub fn events(&self) -> impl Iterator<Item = &MidiEvent> {
        self.measures.iter().flatten()
    }

    /// Sum of the event deltas of one measure.
    pub fn measure_ticks(&self, measure_index: usize) -> Option<u32> {
        self.measures
            .get(measure_index)
            .map(|events| events.iter().map(|e| e.delta).sum())
    }
}

/// Builds fixed-resolution note streams for a guitar, a bass and a drum kit.
///
/// Every beat starts exactly on the quarter grid and every measure lasts
/// `ticks_per_beat * BEATS_PER_MEASURE` ticks; whatever the beat layout leaves
/// over is added to the delta of the last event of the measure.
pub struct TickSequencer<P = DefaultProgression> {
    ticks_per_beat: u16,
    progression: P,
}

impl Default for TickSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSequencer {
    pub const fn new() -> Self {
        Self {
            ticks_per_beat: TICKS_PER_BEAT,
            progression: DefaultProgression,
        }
    }
}

impl<P: ProgressionResolver> TickSequencer<P> {
    pub fn with_progression<Q: ProgressionResolver>(self, progression: Q) -> TickSequencer<Q> {
        TickSequencer {
            ticks_per_beat: self.ticks_per_beat,
            progression,
        }
    }

    /// Change the resolution, zero is raised to one tick.
    pub fn with_ticks_per_beat(mut self, ticks_per_beat: u16) -> Self {
        self.ticks_per_beat = ticks_per_beat.max(1);
        self
    }

    fn ticks_per_measure(&self) -> u32 {
        u32::from(self.ticks_per_beat) * BEATS_PER_MEASURE
    }

    pub fn sequence(&self, request: &SequenceRequest) -> Sequence {
        let key_signature = KeySignature::parse(request.key.as_deref());
        let roots = self.progression.roots(&key_signature);
        log::debug!(
            "Sequencing {} measures at {} BPM in {key_signature}",
            request.measures,
            request.tempo
        );
        let tracks = vec![
            self.melodic_track("Guitar", 0, GUITAR_PROGRAM, &roots, request.measures),
            self.melodic_track("Bass", 1, BASS_PROGRAM, &roots, request.measures),
            self.drum_track(request.measures),
        ];
        Sequence {
            tempo: request.tempo,
            ticks_per_beat: self.ticks_per_beat,
            key_signature,
            tracks,
        }
    }

    fn melodic_track(
        &self,
        name: &str,
        channel: u8,
        program: u8,
        roots: &[u8],
        measure_count: usize,
    ) -> SequenceTrack {
        let beat = u32::from(self.ticks_per_beat);
        let measures = (0..measure_count)
            .map(|measure_index| {
                let root = if roots.is_empty() {
                    crate::audio::progression::PROGRESSION_BASE
                } else {
                    roots[measure_index % roots.len()]
                };
                let mut events = Vec::with_capacity(2 * BEATS_PER_MEASURE as usize);
                for _ in 0..BEATS_PER_MEASURE {
                    events.push(MidiEvent::new_note_on(0, channel, root, MELODIC_VELOCITY));
                    events.push(MidiEvent::new_note_off(beat, channel, root));
                }
                self.close_measure(&mut events);
                events
            })
            .collect();
        SequenceTrack {
            name: name.to_string(),
            channel,
            program: Some(program),
            measures,
        }
    }

    /// Kick on beats 1 and 3, snare on 2 and 4, each followed by a closed hat
    /// on the off-beat. Drum notes last half a beat.
    fn drum_track(&self, measure_count: usize) -> SequenceTrack {
        let half_beat = u32::from(self.ticks_per_beat) / 2;
        let measures = (0..measure_count)
            .map(|_| {
                let mut events = Vec::with_capacity(4 * BEATS_PER_MEASURE as usize);
                for beat in 0..BEATS_PER_MEASURE {
                    let drum = if beat % 2 == 0 { KICK } else { SNARE };
                    events.push(MidiEvent::new_note_on(0, DRUM_CHANNEL, drum, MELODIC_VELOCITY));
                    events.push(MidiEvent::new_note_off(half_beat, DRUM_CHANNEL, drum));
                    events.push(MidiEvent::new_note_on(0, DRUM_CHANNEL, CLOSED_HAT, HAT_VELOCITY));
                    events.push(MidiEvent::new_note_off(half_beat, DRUM_CHANNEL, CLOSED_HAT));
                }
                self.close_measure(&mut events);
                events
            })
            .collect();
        SequenceTrack {
            name: "Drums".to_string(),
            channel: DRUM_CHANNEL,
            program: None,
            measures,
        }
    }

    /// Stretch the last event so the measure lasts exactly one measure.
    fn close_measure(&self, events: &mut [MidiEvent]) {
        let elapsed: u32 = events.iter().map(|e| e.delta).sum();
        let remainder = self.ticks_per_measure().saturating_sub(elapsed);
        if let Some(last) = events.last_mut() {
            last.delta += remainder;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(measures: usize) -> SequenceRequest {
        SequenceRequest {
            measures,
            ..Default::default()
        }
    }

    #[test]
    fn every_measure_lasts_four_beats() {
        for ticks_per_beat in [1, 2, 3, 7, 96, 479, 480, 960, u16::MAX] {
            for measures in [1, 2, 5] {
                let sequence = TickSequencer::new()
                    .with_ticks_per_beat(ticks_per_beat)
                    .sequence(&request(measures));
                let expected = u32::from(ticks_per_beat) * 4;
                assert_eq!(sequence.ticks_per_measure(), expected);
                for track in &sequence.tracks {
                    assert_eq!(track.measures.len(), measures);
                    for index in 0..measures {
                        assert_eq!(
                            track.measure_ticks(index),
                            Some(expected),
                            "{} measure {index} at {ticks_per_beat}",
                            track.name
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn zero_resolution_is_raised() {
        let sequence = TickSequencer::new()
            .with_ticks_per_beat(0)
            .sequence(&request(1));
        assert_eq!(sequence.ticks_per_beat, 1);
    }

    #[test]
    fn melodic_onsets_follow_the_quarter_grid() {
        let sequence = TickSequencer::new().sequence(&request(2));
        let guitar = &sequence.tracks[0];
        let mut tick = 0;
        let mut onsets = vec![];
        for event in guitar.events() {
            tick += event.delta;
            if event.is_note_on() {
                onsets.push(tick);
            }
        }
        let expected: Vec<u32> = (0..8).map(|beat| beat * 480).collect();
        assert_eq!(onsets, expected);
        // first event of the first measure has no lead-in
        assert_eq!(guitar.measures[0][0].delta, 0);
    }

    #[test]
    fn roots_cycle_per_measure() {
        let sequence = TickSequencer::new().sequence(&request(5));
        for track in &sequence.tracks[..2] {
            let roots: Vec<u8> = track.measures.iter().map(|m| m[0].key()).collect();
            assert_eq!(roots, vec![48, 51, 53, 56, 48]);
            assert!(track.measures.iter().all(|m| m.iter().all(|e| e.key() == m[0].key())));
        }
    }

    #[test]
    fn tracks_layout() {
        let sequence = TickSequencer::new().sequence(&request(1));
        let layout: Vec<(&str, u8, Option<u8>)> = sequence
            .tracks
            .iter()
            .map(|t| (t.name.as_str(), t.channel, t.program))
            .collect();
        assert_eq!(
            layout,
            vec![
                ("Guitar", 0, Some(GUITAR_PROGRAM)),
                ("Bass", 1, Some(BASS_PROGRAM)),
                ("Drums", DRUM_CHANNEL, None),
            ]
        );
        for track in &sequence.tracks {
            assert!(track.events().all(|e| e.channel() == track.channel));
        }
    }

    #[test]
    fn drum_pattern() {
        let sequence = TickSequencer::new().sequence(&request(1));
        let drums = &sequence.tracks[2];
        let hits: Vec<(u8, u8)> = drums
            .events()
            .filter_map(|e| match e.event {
                crate::audio::midi_event::MidiEventType::NoteOn(_, key, velocity) => {
                    Some((key, velocity))
                }
                crate::audio::midi_event::MidiEventType::NoteOff(_, _) => None,
            })
            .collect();
        assert_eq!(
            hits,
            vec![
                (KICK, 90),
                (CLOSED_HAT, 60),
                (SNARE, 90),
                (CLOSED_HAT, 60),
                (KICK, 90),
                (CLOSED_HAT, 60),
                (SNARE, 90),
                (CLOSED_HAT, 60),
            ]
        );
        // drum notes are released after half a beat
        assert!(drums
            .events()
            .filter(|e| e.is_note_off())
            .all(|e| e.delta == 240));
    }

    #[test]
    fn drum_remainder_goes_to_last_event() {
        let sequence = TickSequencer::new()
            .with_ticks_per_beat(3)
            .sequence(&request(1));
        let drums = &sequence.tracks[2];
        let deltas: Vec<u32> = drums.measures[0].iter().map(|e| e.delta).collect();
        assert_eq!(deltas.iter().sum::<u32>(), 12);
        assert_eq!(deltas.last(), Some(&5));
    }

    struct Fifths;

    impl ProgressionResolver for Fifths {
        fn roots(&self, key: &KeySignature) -> Vec<u8> {
            vec![(60 + key.fifths()) as u8]
        }
    }

    #[test]
    fn custom_progression() {
        let sequence = TickSequencer::new()
            .with_progression(Fifths)
            .sequence(&SequenceRequest {
                key: Some("D major".to_string()),
                ..request(3)
            });
        assert!(sequence.tracks[0].events().all(|e| e.key() == 62));
        assert_eq!(sequence.key_signature.fifths(), 2);
    }
}
