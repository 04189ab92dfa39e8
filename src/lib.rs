#![doc = include_str!("../README.md")]
pub mod crc;
mod error;
pub mod parser;
mod protocol;
mod reader;
mod writer;

use std::{io::Cursor, path::Path};

pub use crc::{checksum, update};
pub use error::{Error, FormatError, Result};
pub use protocol::*;
pub use reader::*;
pub use writer::*;

/// Reads every frame of a stream file.
///
/// # Errors
///
/// See [`FrameReader::open`] and [`FrameReader::next_frame`]
pub fn read_file(path: impl AsRef<Path>, config: FrameConfig) -> Result<Vec<Frame>> {
    FrameReader::open(path, config)?.read_all().collect()
}

/// Reads every frame of an in-memory stream.
///
/// # Errors
///
/// [`FormatError::UnalignedLength`] if `input` is not a whole number of words, otherwise
/// see [`FrameReader::next_frame`]
pub fn parse_buffer(input: &[u8], config: FrameConfig) -> Result<Vec<Frame>> {
    if input.len() % WORD_SIZE != 0 {
        return Err(FormatError::UnalignedLength {
            len: input.len() as u64,
        }
        .into());
    }
    FrameReader::new(Cursor::new(input), config)
        .read_all()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_big_endian_buffer() {
        // Two frames of [0x0102, 0x0304, 0x0506] and [0x1112, 0x1314, 0x1516]
        let (first, second) = if Endianness::NATIVE == Endianness::Little {
            ("AA0E", "F0C4")
        } else {
            ("DDBA", "8770")
        };
        let input = hex::decode(format!("010203040506{first}111213141516{second}A5A5")).unwrap();
        let config = FrameConfig::new(3).with_endianness(Endianness::Big);

        let frames = parse_buffer(&input, config).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].words().collect::<Vec<_>>(), vec![0x0102, 0x0304, 0x0506]);
        assert_eq!(frames[1].words().collect::<Vec<_>>(), vec![0x1112, 0x1314, 0x1516]);
    }

    #[test]
    fn parse_odd_buffer() {
        assert!(matches!(
            parse_buffer(&[0xA5, 0xA5, 0x00], FrameConfig::new(1)),
            Err(Error::Format(FormatError::UnalignedLength { len: 3 }))
        ));
    }

    #[test]
    fn parse_sentinel_only() {
        assert!(parse_buffer(&[0xA5, 0xA5], FrameConfig::new(4))
            .unwrap()
            .is_empty());
    }
}
