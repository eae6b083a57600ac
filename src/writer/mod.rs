pub mod gp5_writer;
pub mod primitive_writer;

use crate::song::Song;
use crate::ConvertError;

/// Encodes a song model into a notation file.
pub trait SongWriter {
    fn write_song(&self, song: &Song) -> Result<Vec<u8>, ConvertError>;
}
