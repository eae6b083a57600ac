use crate::song::KeySignature;

/// C3
pub const PROGRESSION_BASE: u8 = 48;

/// Root notes driving the sequenced tracks, one root per measure in turn.
pub trait ProgressionResolver {
    fn roots(&self, key: &KeySignature) -> Vec<u8>;
}

/// Fixed root, minor third, fourth, minor sixth above C3.
///
/// The key is not taken into account yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProgression;

impl ProgressionResolver for DefaultProgression {
    fn roots(&self, _key: &KeySignature) -> Vec<u8> {
        [0, 3, 5, 8]
            .iter()
            .map(|interval| PROGRESSION_BASE + interval)
            .collect()
    }
}
