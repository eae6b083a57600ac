use crate::schema::{HeaderSchema, TimeSignatureSchema, TrackSchema};
use crate::song::{Duration, Marker, MeasureHeader, TimeSignature, MARKER_COLOR};
use crate::ConvertError;

/// Repeat count given to a measure closing a repeat
pub const REPEAT_END_COUNT: i8 = 2;

/// Build the measure headers shared by every track.
///
/// The header count is the longest track's measure count. Header precedence
/// follows track input order: at each measure index the first track carrying a
/// non-empty header block wins, the others are ignored. Without any block the
/// header is synthesized from the global default time signature.
pub fn synchronize_headers(
    tracks: &[TrackSchema],
    default_time_signature: &TimeSignatureSchema,
) -> Result<Vec<MeasureHeader>, ConvertError> {
    let measure_count = tracks.iter().map(|t| t.measures.len()).max().unwrap_or(0);
    log::debug!(
        "Synchronizing {measure_count} measure headers across {} tracks",
        tracks.len()
    );
    (0..measure_count)
        .map(|index| build_header(index, header_at(tracks, index), default_time_signature))
        .collect()
}

/// First non-empty header block at `index`, scanning tracks in input order.
pub fn header_at(tracks: &[TrackSchema], index: usize) -> Option<&HeaderSchema> {
    tracks
        .iter()
        .filter_map(|track| track.measures.get(index))
        .filter_map(|measure| measure.header.as_ref())
        .find(|header| !header.is_empty())
}

fn build_header(
    index: usize,
    header: Option<&HeaderSchema>,
    default_time_signature: &TimeSignatureSchema,
) -> Result<MeasureHeader, ConvertError> {
    // a header block without time signature inherits the global one
    let time_signature = header
        .and_then(|h| h.time_signature.as_ref())
        .unwrap_or(default_time_signature);
    let mut measure_header = MeasureHeader {
        number: index + 1,
        time_signature: time_signature_from_schema(time_signature)?,
        ..Default::default()
    };
    if let Some(header) = header {
        measure_header.repeat_open = header.repeat_start;
        if header.repeat_end {
            measure_header.repeat_close = REPEAT_END_COUNT;
        }
        measure_header.marker = header
            .marker
            .as_ref()
            .filter(|title| !title.is_empty())
            .map(|title| Marker {
                title: title.clone(),
                color: MARKER_COLOR,
            });
    }
    Ok(measure_header)
}

pub fn time_signature_from_schema(
    time_signature: &TimeSignatureSchema,
) -> Result<TimeSignature, ConvertError> {
    let numerator = i8::try_from(time_signature.beats)
        .ok()
        .filter(|beats| *beats >= 1)
        .ok_or_else(|| {
            ConvertError::InputValidation(format!(
                "time signature beats {} outside 1..=127",
                time_signature.beats
            ))
        })?;
    Ok(TimeSignature {
        numerator,
        denominator: Duration::from_denominator(time_signature.beat_type),
    })
}
