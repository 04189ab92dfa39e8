use std::io::Write;

use crate::{
    crc,
    error::{FormatError, Result},
    FrameConfig, SENTINEL, WORD_SIZE,
};

/// Writes checksummed frames followed by the end-of-data marker.
pub struct FrameWriter<W> {
    inner: W,
    config: FrameConfig,
    frames_written: usize,
}

impl<W> FrameWriter<W> {
    pub fn new(inner: W, config: FrameConfig) -> Self {
        Self {
            inner,
            config,
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }
}

impl<W: Write> FrameWriter<W> {
    /// Writes one frame from host-order payload bytes.
    /// Returns the checksum that was appended.
    ///
    /// # Errors
    ///
    /// [`FormatError::PayloadLength`] if `payload` is not exactly one frame's payload,
    /// [`FormatError::SentinelCollision`] if the frame would start with the end-of-data
    /// marker, which a reader takes as the end of the stream.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<u16> {
        if payload.len() != self.config.payload_len() {
            return Err(FormatError::PayloadLength {
                expected: self.config.payload_len(),
                found: payload.len(),
            }
            .into());
        }

        let checksum = crc::checksum(payload);
        let lead = match payload {
            [a, b, ..] => u16::from_ne_bytes([*a, *b]),
            _ => checksum,
        };
        if lead == SENTINEL {
            return Err(FormatError::SentinelCollision.into());
        }

        let mut frame = Vec::with_capacity(self.config.frame_len());
        for pair in payload.chunks_exact(WORD_SIZE) {
            let word = u16::from_ne_bytes([pair[0], pair[1]]);
            frame.extend(self.config.endianness.word_bytes(word));
        }
        frame.extend(self.config.endianness.word_bytes(checksum));

        self.inner.write_all(&frame)?;
        self.frames_written += 1;
        Ok(checksum)
    }

    /// Writes one frame from host-order payload words.
    pub fn write_words(&mut self, words: &[u16]) -> Result<u16> {
        let payload: Vec<u8> = words.iter().flat_map(|word| word.to_ne_bytes()).collect();
        self.write_frame(&payload)
    }

    /// Writes the end-of-data marker and flushes.
    pub fn finish(mut self) -> Result<W> {
        self.inner.write_all(&self.config.endianness.word_bytes(SENTINEL))?;
        self.inner.flush()?;
        log::debug!("Wrote {} frames and end-of-data marker", self.frames_written);
        Ok(self.inner)
    }
}
