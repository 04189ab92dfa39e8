use nom::Finish;

use crate::{
    crc,
    error::{Error, FormatError, Result},
    parser::raw_frame,
};

/// Size in bytes of a stream word
pub const WORD_SIZE: usize = 2;

/// End-of-data marker written after the last frame
pub const SENTINEL: u16 = 0xA5A5;

/// Byte order a stream was written in
///
/// Words are always handed out in host order, swapped on load when the
/// stream was written in the other one.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::Big;
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::Little;

    pub fn is_native(self) -> bool {
        self == Self::NATIVE
    }

    /// Serializes a host-order word in this byte order
    pub fn word_bytes(self, word: u16) -> [u8; WORD_SIZE] {
        match self {
            Self::Big => word.to_be_bytes(),
            Self::Little => word.to_le_bytes(),
        }
    }
}

impl Default for Endianness {
    fn default() -> Self {
        Self::NATIVE
    }
}

/// Layout of a stream
///
/// The payload length is not stored in the file, both sides have to agree on it.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameConfig {
    /// Words of payload preceding each checksum word
    pub payload_words: usize,
    /// Byte order of the stream
    pub endianness: Endianness,
}

impl FrameConfig {
    /// Creates a config for a host-order stream.
    pub fn new(payload_words: usize) -> Self {
        Self {
            payload_words,
            endianness: Endianness::NATIVE,
        }
    }

    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Payload plus checksum, in words
    ///
    /// Sizes saturate at `usize::MAX`; no stream is long enough to hold such a frame,
    /// so reads against it end in [`FormatError::Truncated`].
    pub fn frame_words(&self) -> usize {
        self.payload_words.saturating_add(1)
    }

    /// Payload plus checksum, in bytes
    pub fn frame_len(&self) -> usize {
        self.frame_words().saturating_mul(WORD_SIZE)
    }

    pub fn payload_len(&self) -> usize {
        self.payload_words.saturating_mul(WORD_SIZE)
    }
}

/// A validated `[payload][checksum]` unit
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    /// Host-order bytes of the payload words, the bytes the checksum covers
    #[cfg_attr(feature = "serde", serde(with = "serde_bytes"))]
    pub payload: Vec<u8>,
    /// CRC16 calculated using the [MODBUS][crate::crc] table
    pub checksum: u16,
}

impl Frame {
    /// Parses one frame from the start of `input` and verifies its checksum.
    ///
    /// # Errors
    ///
    /// [`FormatError::Truncated`] if `input` holds less than a frame,
    /// [`Error::Integrity`] if the stored checksum does not match the payload.
    pub fn decode(input: &[u8], config: FrameConfig) -> Result<Self> {
        let truncated = FormatError::Truncated {
            expected: config.frame_words(),
            found: input.len() / WORD_SIZE,
        };
        if input.len() < config.frame_len() {
            return Err(truncated.into());
        }
        let (_, (words, checksum)) = raw_frame(config)(input).finish().map_err(|_| truncated)?;
        let payload: Vec<u8> = words.iter().flat_map(|word| word.to_ne_bytes()).collect();

        let actual = crc::checksum(&payload);
        if actual != checksum {
            return Err(Error::Integrity {
                expected: checksum,
                actual,
            });
        }
        Ok(Self { payload, checksum })
    }

    /// Payload as host-order words
    pub fn words(&self) -> impl Iterator<Item = u16> + '_ {
        self.payload
            .chunks_exact(WORD_SIZE)
            .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
    }
}

/// Outcome of a single [`next_frame`][crate::FrameReader::next_frame] call
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Next {
    Frame(Frame),
    EndOfStream,
}

impl Next {
    /// # Panics
    ///
    /// If this is [`Next::EndOfStream`]
    pub fn unwrap_frame(self) -> Frame {
        match self {
            Self::Frame(frame) => frame,
            Self::EndOfStream => panic!("Called unwrap_frame on EndOfStream"),
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

/// Why a read pass stopped cleanly
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Termination {
    /// The end-of-data marker was read where a frame would start
    Sentinel,
    /// The file ended exactly on a frame boundary
    EndOfFile,
}

/// Read pass state machine
///
/// `Terminated` and `Failed` are absorbing.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ReaderState {
    Reading,
    Terminated(Termination),
    Failed,
}

/// Turns a validated payload into a structured message
///
/// Implemented for any `FnMut(&[u8]) -> Result<T, E>`.
pub trait PayloadDecoder {
    type Message;
    type Error: std::error::Error + Send + Sync + 'static;

    fn decode(&mut self, payload: &[u8]) -> std::result::Result<Self::Message, Self::Error>;
}

impl<F, T, E> PayloadDecoder for F
where
    F: FnMut(&[u8]) -> std::result::Result<T, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Message = T;
    type Error = E;

    fn decode(&mut self, payload: &[u8]) -> std::result::Result<T, E> {
        self(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native_frame(words: &[u16]) -> Vec<u8> {
        let payload: Vec<u8> = words.iter().flat_map(|w| w.to_ne_bytes()).collect();
        let mut bytes = payload.clone();
        bytes.extend(crc::checksum(&payload).to_ne_bytes());
        bytes
    }

    #[test]
    fn config_sizes() {
        let config = FrameConfig::new(3);
        assert_eq!(config.frame_words(), 4);
        assert_eq!(config.frame_len(), 8);
        assert_eq!(config.payload_len(), 6);
        assert_eq!(config.endianness, Endianness::NATIVE);
        assert!(config.endianness.is_native());
    }

    #[test]
    fn huge_config_saturates() {
        let config = FrameConfig::new(usize::MAX);
        assert_eq!(config.frame_words(), usize::MAX);
        assert_eq!(config.frame_len(), usize::MAX);
        assert_eq!(config.payload_len(), usize::MAX);
        assert!(matches!(
            Frame::decode(&[0x01, 0x02, 0x03, 0x04], config),
            Err(Error::Format(FormatError::Truncated {
                expected: usize::MAX,
                found: 2
            }))
        ));
    }

    #[test]
    fn word_bytes() {
        assert_eq!(Endianness::Big.word_bytes(0x0102), [0x01, 0x02]);
        assert_eq!(Endianness::Little.word_bytes(0x0102), [0x02, 0x01]);
    }

    #[test]
    fn decode_frame() {
        let bytes = native_frame(&[0x0102, 0x0304, 0x0506]);
        let frame = Frame::decode(&bytes, FrameConfig::new(3)).unwrap();
        assert_eq!(frame.words().collect::<Vec<_>>(), vec![0x0102, 0x0304, 0x0506]);
        assert_eq!(frame.payload.len(), 6);
    }

    #[test]
    fn decode_empty_payload() {
        let frame = Frame::decode(&0xFFFFu16.to_ne_bytes(), FrameConfig::new(0)).unwrap();
        assert!(frame.payload.is_empty());
        assert_eq!(frame.checksum, 0xFFFF);
    }

    #[test]
    fn decode_bad_checksum() {
        let mut bytes = native_frame(&[0x0102, 0x0304, 0x0506]);
        bytes[0] ^= 0x01;
        assert!(matches!(
            Frame::decode(&bytes, FrameConfig::new(3)),
            Err(Error::Integrity { .. })
        ));
    }

    #[test]
    fn decode_short_input() {
        let bytes = native_frame(&[0x0102, 0x0304, 0x0506]);
        assert!(matches!(
            Frame::decode(&bytes[..6], FrameConfig::new(3)),
            Err(Error::Format(FormatError::Truncated {
                expected: 4,
                found: 3
            }))
        ));
    }

    #[test]
    fn closure_decoder() {
        let mut decoder = |payload: &[u8]| -> std::result::Result<usize, std::io::Error> {
            Ok(payload.len())
        };
        assert_eq!(decoder.decode(&[1, 2, 3, 4]).unwrap(), 4);
    }
}
