use crate::schema::{BeatSchema, SongSchema, TrackSchema};
use crate::song::header_sync::synchronize_headers;
use crate::song::tuning::{resolve_program, resolve_strings, PERCUSSION_PROGRAM};
use crate::song::{
    Beat, BeatStatus, Duration, KeySignature, Measure, Note, Song, Track, Voice, MAX_FRET,
};
use crate::ConvertError;

/// Builds the song model from a tablature schema.
///
/// Tracks own their measures, measures point at the shared headers by index.
pub struct SongBuilder {
    song: Song,
}

impl Default for SongBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SongBuilder {
    pub fn new() -> Self {
        Self {
            song: Song::default(),
        }
    }

    pub fn build(mut self, schema: &SongSchema) -> Result<Song, ConvertError> {
        if schema.tracks.is_empty() {
            return Err(ConvertError::InputValidation(
                "At least one track is required.".to_string(),
            ));
        }
        let metadata = &schema.metadata;
        if metadata.tempo <= 0 {
            return Err(ConvertError::InputValidation(format!(
                "tempo must be positive, got {}",
                metadata.tempo
            )));
        }
        self.song.title.clone_from(&metadata.title);
        self.song.artist.clone_from(&metadata.artist);
        self.song.tempo = metadata.tempo;
        self.song.key_signature = KeySignature::parse(metadata.key_signature.as_deref());
        self.song.measure_headers =
            synchronize_headers(&schema.tracks, &metadata.time_signature)?;

        let mut tracks = Vec::with_capacity(schema.tracks.len());
        for (track_index, track_data) in schema.tracks.iter().enumerate() {
            tracks.push(self.build_track(track_index, track_data)?);
        }
        self.song.tracks = tracks;
        log::debug!(
            "Built song '{}' with {} tracks and {} measures",
            self.song.title,
            self.song.tracks.len(),
            self.song.measure_headers.len()
        );
        Ok(self.song)
    }

    fn build_track(&self, track_index: usize, data: &TrackSchema) -> Result<Track, ConvertError> {
        log::debug!("Building track {track_index} '{}'", data.name);
        let program = if data.is_drums {
            PERCUSSION_PROGRAM
        } else {
            resolve_program(&data.instrument)
        };
        let mut track = Track {
            number: track_index as i32 + 1,
            name: data.name.clone(),
            percussion: data.is_drums,
            instrument: data.instrument.clone(),
            program,
            strings: resolve_strings(data.tuning.as_deref()),
            capo: data.capo.max(0),
            volume: data.volume.clamp(0, 127) as u8,
            pan: data.pan.clamp(0, 127) as u8,
            measures: Vec::with_capacity(self.song.measure_headers.len()),
        };

        // tracks with fewer measures are padded with empty ones
        for header_index in 0..self.song.measure_headers.len() {
            let beats = data
                .measures
                .get(header_index)
                .map_or(&[][..], |m| m.beats.as_slice());
            let measure = self.build_measure(&track, track_index, header_index, beats)?;
            track.measures.push(measure);
        }
        Ok(track)
    }

    fn build_measure(
        &self,
        track: &Track,
        track_index: usize,
        header_index: usize,
        beats: &[BeatSchema],
    ) -> Result<Measure, ConvertError> {
        let mut voice = Voice::default();
        for beat_data in beats {
            let beat = build_beat(beat_data, track)?;
            voice.beats.push(beat);
        }
        let header = &self.song.measure_headers[header_index];
        if voice.length() > header.length() {
            log::warn!(
                "Track '{}' measure {} holds more beats than its time signature allows",
                track.name,
                header.number
            );
        }
        Ok(Measure {
            track_index,
            header_index,
            voice,
        })
    }
}

/// Build one beat.
///
/// The beat duration comes from its first note entry (quarter when there are
/// none). Rest entries never become notes; the beat is a rest only when it has
/// rest entries and no playable note.
pub fn build_beat(data: &BeatSchema, track: &Track) -> Result<Beat, ConvertError> {
    let duration = data.notes.first().map_or_else(Duration::default, |note| {
        Duration::from_fraction(note.duration.numerator, note.duration.denominator)
    });
    let mut beat = Beat {
        status: BeatStatus::Normal,
        duration,
        notes: Vec::with_capacity(data.notes.len()),
    };
    let mut has_rest_entry = false;
    for note_data in &data.notes {
        if note_data.is_rest() {
            has_rest_entry = true;
            continue;
        }
        let string = i8::try_from(note_data.string)
            .ok()
            .filter(|s| *s >= 1 && (*s as usize) <= track.strings.len())
            .ok_or_else(|| {
                ConvertError::InputValidation(format!(
                    "note string {} outside 1..={} on track '{}'",
                    note_data.string,
                    track.strings.len(),
                    track.name
                ))
            })?;
        if !(0..=MAX_FRET).contains(&note_data.fret) {
            return Err(ConvertError::InputValidation(format!(
                "fret {} outside 0..={MAX_FRET} on track '{}'",
                note_data.fret, track.name
            )));
        }
        beat.notes.push(Note::new(string, note_data.fret as i8));
    }
    if has_rest_entry {
        if beat.notes.is_empty() {
            beat.status = BeatStatus::Rest;
        } else {
            log::debug!("Beat mixes rest and note entries, keeping the notes");
        }
    }
    Ok(beat)
}
