//! JSON input documents accepted by the two conversions.
//!
//! The tablature schema is strongly typed with per-field defaults, the
//! sequence request is read leniently from a raw JSON value.

use crate::ConvertError;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SongSchema {
    pub metadata: MetadataSchema,
    pub tracks: Vec<TrackSchema>,
}

impl SongSchema {
    pub fn from_json(json: &[u8]) -> Result<Self, ConvertError> {
        serde_json::from_slice(json)
            .map_err(|err| ConvertError::InputValidation(format!("malformed song document: {err}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetadataSchema {
    pub title: String,
    pub artist: String,
    #[serde(deserialize_with = "lenient_i32")]
    pub tempo: i32,
    pub key_signature: Option<String>,
    pub time_signature: TimeSignatureSchema,
}

impl Default for MetadataSchema {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            artist: "Unknown Artist".to_string(),
            tempo: 120,
            key_signature: None,
            time_signature: TimeSignatureSchema::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeSignatureSchema {
    #[serde(deserialize_with = "lenient_i32")]
    pub beats: i32,
    #[serde(deserialize_with = "lenient_i64")]
    pub beat_type: i64,
}

impl Default for TimeSignatureSchema {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_type: 4,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackSchema {
    pub name: String,
    pub is_drums: bool,
    pub instrument: String,
    pub tuning: Option<Vec<i32>>,
    #[serde(deserialize_with = "lenient_i32")]
    pub capo: i32,
    #[serde(deserialize_with = "lenient_i32")]
    pub volume: i32,
    #[serde(deserialize_with = "lenient_i32")]
    pub pan: i32,
    pub measures: Vec<MeasureSchema>,
}

impl Default for TrackSchema {
    fn default() -> Self {
        Self {
            name: "Track".to_string(),
            is_drums: false,
            instrument: "Guitar".to_string(),
            tuning: None,
            capo: 0,
            volume: 100,
            pan: 64,
            measures: vec![],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MeasureSchema {
    pub header: Option<HeaderSchema>,
    pub beats: Vec<BeatSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeaderSchema {
    pub time_signature: Option<TimeSignatureSchema>,
    pub repeat_start: bool,
    pub repeat_end: bool,
    pub marker: Option<String>,
}

impl HeaderSchema {
    /// A header block without any field set carries no information.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BeatSchema {
    pub notes: Vec<NoteSchema>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NoteSchema {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient_i32")]
    pub string: i32,
    #[serde(deserialize_with = "lenient_i32")]
    pub fret: i32,
    pub duration: DurationSchema,
}

impl Default for NoteSchema {
    fn default() -> Self {
        Self {
            kind: None,
            string: 1,
            fret: 0,
            duration: DurationSchema::default(),
        }
    }
}

impl NoteSchema {
    pub fn is_rest(&self) -> bool {
        self.kind.as_deref() == Some("rest")
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DurationSchema {
    #[serde(deserialize_with = "lenient_i64")]
    pub numerator: i64,
    #[serde(deserialize_with = "lenient_i64")]
    pub denominator: i64,
}

impl Default for DurationSchema {
    fn default() -> Self {
        Self {
            numerator: 1,
            denominator: 4,
        }
    }
}

pub const DEFAULT_SEQUENCE_TEMPO: i32 = 120;
pub const DEFAULT_SEQUENCE_MEASURES: usize = 8;
/// Longest sequence a request may ask for
pub const MAX_SEQUENCE_MEASURES: usize = 10_000;

/// Parameters of a sequenced-audio request.
///
/// Every field falls back silently to its default when absent or malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRequest {
    pub tempo: i32,
    pub measures: usize,
    pub key: Option<String>,
}

impl Default for SequenceRequest {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_SEQUENCE_TEMPO,
            measures: DEFAULT_SEQUENCE_MEASURES,
            key: None,
        }
    }
}

impl SequenceRequest {
    pub fn from_json(json: &[u8]) -> Result<Self, ConvertError> {
        let payload: Value = serde_json::from_slice(json).map_err(|err| {
            ConvertError::InputValidation(format!("malformed sequence request: {err}"))
        })?;
        Self::from_value(&payload)
    }

    pub fn from_value(payload: &Value) -> Result<Self, ConvertError> {
        if !payload.is_object() {
            return Err(ConvertError::InputValidation(
                "sequence request must be a JSON object".to_string(),
            ));
        }
        let metadata = payload.get("metadata");

        let tempo = first_present(&[payload.get("tempo"), metadata.and_then(|m| m.get("tempo"))])
            .and_then(lenient_int)
            .and_then(|tempo| i32::try_from(tempo).ok())
            .filter(|tempo| *tempo > 0)
            .unwrap_or(DEFAULT_SEQUENCE_TEMPO);

        let measures = match first_present(&[payload.get("measures"), payload.get("length")]) {
            Some(value) => lenient_int(value).map_or(DEFAULT_SEQUENCE_MEASURES, |measures| {
                usize::try_from(measures.max(1)).unwrap_or(DEFAULT_SEQUENCE_MEASURES)
            }),
            None => DEFAULT_SEQUENCE_MEASURES,
        };
        if measures > MAX_SEQUENCE_MEASURES {
            return Err(ConvertError::InputValidation(format!(
                "{measures} measures requested, at most {MAX_SEQUENCE_MEASURES} are supported"
            )));
        }

        let key = first_present(&[
            payload.get("key"),
            metadata.and_then(|m| m.get("keySignature")),
        ])
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

        Ok(Self {
            tempo,
            measures,
            key,
        })
    }
}

/// First candidate holding a truthy value.
fn first_present<'a>(candidates: &[Option<&'a Value>]) -> Option<&'a Value> {
    candidates.iter().flatten().copied().find(|v| is_truthy(v))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Integer field that also accepts floats (truncated) and numeric strings.
fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    lenient_int(&value)
        .ok_or_else(|| de::Error::custom(format!("expected an integer, found {value}")))
}

fn lenient_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_i64(deserializer)?;
    i32::try_from(value).map_err(|_| de::Error::custom(format!("integer {value} out of range")))
}

/// Integer from a JSON number (floats truncate) or a numeric string.
fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn song_schema_defaults() {
        let schema = SongSchema::from_json(br#"{"tracks":[{"measures":[{}]}]}"#).unwrap();
        assert_eq!(schema.metadata.title, "Untitled");
        assert_eq!(schema.metadata.artist, "Unknown Artist");
        assert_eq!(schema.metadata.tempo, 120);
        assert_eq!(schema.metadata.time_signature, TimeSignatureSchema::default());
        let track = &schema.tracks[0];
        assert_eq!(track.name, "Track");
        assert_eq!(track.instrument, "Guitar");
        assert_eq!((track.capo, track.volume, track.pan), (0, 100, 64));
        assert!(track.measures[0].header.is_none());
    }

    #[test]
    fn song_schema_type_errors_are_input_errors() {
        let err = SongSchema::from_json(br#"{"metadata":{"tempo":"fast"}}"#).unwrap_err();
        assert!(err.is_client_error());
        let err = SongSchema::from_json(b"not json").unwrap_err();
        assert!(matches!(err, ConvertError::InputValidation(_)));
    }

    #[test]
    fn song_schema_coerces_numeric_text_and_floats() {
        let schema = SongSchema::from_json(
            br#"{"metadata":{"tempo":"90","timeSignature":{"beats":3.0,"beatType":"8"}},
                "tracks":[{"capo":" 2 ","volume":99.7,"measures":[{"beats":[{"notes":[
                    {"string":"1","fret":5.0,"duration":{"numerator":"1","denominator":8.0}}]}]}]}]}"#,
        )
        .unwrap();
        assert_eq!(schema.metadata.tempo, 90);
        assert_eq!(schema.metadata.time_signature.beats, 3);
        assert_eq!(schema.metadata.time_signature.beat_type, 8);
        let track = &schema.tracks[0];
        assert_eq!((track.capo, track.volume, track.pan), (2, 99, 64));
        let note = &track.measures[0].beats[0].notes[0];
        assert_eq!((note.string, note.fret), (1, 5));
        assert_eq!((note.duration.numerator, note.duration.denominator), (1, 8));
    }

    #[test]
    fn song_schema_rejects_out_of_range_integers() {
        let err = SongSchema::from_json(br#"{"metadata":{"tempo":1e12}}"#).unwrap_err();
        assert!(matches!(err, ConvertError::InputValidation(_)));
        let err = SongSchema::from_json(br#"{"tracks":[{"capo":null}]}"#).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn note_schema_rest_tag() {
        let note: NoteSchema = serde_json::from_value(json!({"type": "rest"})).unwrap();
        assert!(note.is_rest());
        let note: NoteSchema = serde_json::from_value(json!({"type": "normal", "fret": 3})).unwrap();
        assert!(!note.is_rest());
        assert_eq!((note.string, note.fret), (1, 3));
    }

    #[test]
    fn empty_header_block() {
        let header: HeaderSchema = serde_json::from_value(json!({})).unwrap();
        assert!(header.is_empty());
        let header: HeaderSchema = serde_json::from_value(json!({"repeatStart": true})).unwrap();
        assert!(!header.is_empty());
    }

    #[test]
    fn sequence_request_reads_fields_and_fallbacks() {
        let request = SequenceRequest::from_value(&json!({"measures": 2, "tempo": 100})).unwrap();
        assert_eq!(request.tempo, 100);
        assert_eq!(request.measures, 2);
        assert_eq!(request.key, None);

        let request = SequenceRequest::from_value(&json!({
            "metadata": {"tempo": "95", "keySignature": "E minor"},
            "length": 3.9
        }))
        .unwrap();
        assert_eq!(request.tempo, 95);
        assert_eq!(request.measures, 3);
        assert_eq!(request.key.as_deref(), Some("E minor"));
    }

    #[test]
    fn sequence_request_malformed_values_use_defaults() {
        let request =
            SequenceRequest::from_value(&json!({"tempo": "fast", "measures": [1]})).unwrap();
        assert_eq!(request, SequenceRequest::default());

        let request = SequenceRequest::from_value(&json!({"tempo": -40, "measures": -3})).unwrap();
        assert_eq!(request.tempo, DEFAULT_SEQUENCE_TEMPO);
        assert_eq!(request.measures, 1);

        // zero is not present, so the fallback chain continues
        let request = SequenceRequest::from_value(&json!({"tempo": 0, "metadata": {"tempo": 80}}))
            .unwrap();
        assert_eq!(request.tempo, 80);
        let request = SequenceRequest::from_value(&json!({"measures": 0})).unwrap();
        assert_eq!(request.measures, DEFAULT_SEQUENCE_MEASURES);
    }

    #[test]
    fn sequence_request_measure_ceiling() {
        let request =
            SequenceRequest::from_value(&json!({ "measures": MAX_SEQUENCE_MEASURES })).unwrap();
        assert_eq!(request.measures, MAX_SEQUENCE_MEASURES);
        for measures in [json!(MAX_SEQUENCE_MEASURES + 1), json!(1e300), json!("20000")] {
            let err = SequenceRequest::from_value(&json!({ "measures": measures })).unwrap_err();
            assert!(matches!(err, ConvertError::InputValidation(_)), "{err:?}");
        }
    }

    #[test]
    fn sequence_request_must_be_object() {
        let err = SequenceRequest::from_value(&json!([1, 2])).unwrap_err();
        assert!(err.is_client_error());
    }
}
