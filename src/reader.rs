use std::{
    fs::File,
    io::{BufReader, Read},
    iter::FusedIterator,
    path::Path,
};

#[cfg(feature = "tokio")]
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    error::{Error, FormatError, Result},
    parser, Frame, FrameConfig, Next, PayloadDecoder, ReaderState, Termination, WORD_SIZE,
};

pub const DEFAULT_READ_BUF_CAPACITY: usize = 8192;

/// Result of reading one frame's worth of words, before the state machine sees it
enum Step {
    Frame(Frame),
    End(Termination),
}

/// Reads checksummed frames from a word stream until the end-of-data marker.
///
/// A reader makes a single pass: once it has terminated or failed it does not touch
/// the underlying stream again.
pub struct FrameReader<R> {
    inner: R,
    config: FrameConfig,
    state: ReaderState,
    frames_read: usize,
}

impl FrameReader<BufReader<File>> {
    /// Opens a stream file for reading.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be opened or its size queried,
    /// [`FormatError::UnalignedLength`] if its size is not a whole number of words.
    pub fn open(path: impl AsRef<Path>, config: FrameConfig) -> Result<Self> {
        Self::open_with_capacity(path, config, DEFAULT_READ_BUF_CAPACITY)
    }

    /// Same as [`FrameReader::open`] with a custom read buffer capacity.
    pub fn open_with_capacity(
        path: impl AsRef<Path>,
        config: FrameConfig,
        capacity: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len % WORD_SIZE as u64 != 0 {
            return Err(FormatError::UnalignedLength { len }.into());
        }

        log::debug!(
            "Opened {} ({} words, {} payload words per frame, {:?})",
            path.display(),
            len / WORD_SIZE as u64,
            config.payload_words,
            config.endianness
        );
        Ok(Self::new(BufReader::with_capacity(capacity, file), config))
    }
}

impl<R> FrameReader<R> {
    /// Creates a new [`FrameReader`] over an already open stream.
    ///
    /// The stream length is unknown here, so a trailing partial word shows up
    /// as a truncated frame instead of [`FormatError::UnalignedLength`].
    pub fn new(inner: R, config: FrameConfig) -> Self {
        Self {
            inner,
            config,
            state: ReaderState::Reading,
            frames_read: 0,
        }
    }

    pub fn config(&self) -> FrameConfig {
        self.config
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Number of frames validated so far
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Checks the state before touching the stream
    fn guard(&self) -> Option<Result<Next>> {
        match self.state {
            ReaderState::Reading => None,
            ReaderState::Terminated(_) => Some(Ok(Next::EndOfStream)),
            ReaderState::Failed => Some(Err(Error::Halted)),
        }
    }

    /// Applies the outcome of a read to the state machine
    fn advance(&mut self, step: Result<Step>) -> Result<Next> {
        match step {
            Ok(Step::Frame(frame)) => {
                self.frames_read += 1;
                log::trace!(
                    "Frame {} valid (checksum {:#06x})",
                    self.frames_read,
                    frame.checksum
                );
                Ok(Next::Frame(frame))
            }
            Ok(Step::End(termination)) => {
                log::debug!(
                    "Stream terminated by {:?} after {} frames",
                    termination,
                    self.frames_read
                );
                self.state = ReaderState::Terminated(termination);
                Ok(Next::EndOfStream)
            }
            Err(e) => {
                log::warn!("Read pass failed at frame {}: {}", self.frames_read + 1, e);
                self.state = ReaderState::Failed;
                Err(e)
            }
        }
    }

    /// Decides what the first word of a frame means
    ///
    /// `lead` holds whatever was read before the stream ended, at most one word.
    fn lead_word(&self, lead: &[u8]) -> Result<Option<Termination>> {
        match lead.len() {
            0 => Ok(Some(Termination::EndOfFile)),
            WORD_SIZE if parser::sentinel(self.config.endianness)(lead).is_ok() => {
                Ok(Some(Termination::Sentinel))
            }
            WORD_SIZE => Ok(None),
            _ => Err(truncated(self.config.frame_words(), 0)),
        }
    }

    fn frame_from(&self, buf: &[u8]) -> Result<Step> {
        if buf.len() < self.config.frame_len() {
            return Err(truncated(self.config.frame_words(), buf.len() / WORD_SIZE));
        }
        Frame::decode(buf, self.config).map(Step::Frame)
    }

    fn words_from(&self, buf: &[u8], count: usize) -> Result<Vec<u16>> {
        if (buf.len() as u64) < words_len(count) {
            return Err(truncated(count, buf.len() / WORD_SIZE));
        }
        let (_, words) = parser::words(self.config.endianness, count)(buf)
            .map_err(|_| truncated(count, buf.len() / WORD_SIZE))?;
        Ok(words)
    }

    /// Bytes left in a frame once its lead word is in
    fn frame_rest(&self) -> u64 {
        words_len(self.config.frame_words()).saturating_sub(WORD_SIZE as u64)
    }
}

fn truncated(expected: usize, found: usize) -> Error {
    FormatError::Truncated { expected, found }.into()
}

/// Byte length of `count` words, saturating past what any stream can hold
fn words_len(count: usize) -> u64 {
    (count as u64).saturating_mul(WORD_SIZE as u64)
}

impl<R: Read> FrameReader<R> {
    /// Reads `count` contiguous words in host order.
    ///
    /// # Errors
    ///
    /// [`FormatError::Truncated`] if the stream ends before `count` words,
    /// [`Error::Io`] if the underlying read fails.
    pub fn read_words(&mut self, count: usize) -> Result<Vec<u16>> {
        let mut buf = Vec::new();
        (&mut self.inner).take(words_len(count)).read_to_end(&mut buf)?;
        self.words_from(&buf, count)
    }

    /// Reads and validates the next frame.
    ///
    /// Returns [`Next::EndOfStream`] when the end-of-data marker is found where a frame
    /// would start, or when the stream ends exactly on a frame boundary.
    ///
    /// # Errors
    ///
    /// [`Error::Integrity`] on a checksum mismatch, [`FormatError::Truncated`] when the
    /// stream ends mid-frame, [`Error::Io`] on read failures and [`Error::Halted`] once
    /// any of those happened.
    pub fn next_frame(&mut self) -> Result<Next> {
        if let Some(next) = self.guard() {
            return next;
        }
        let step = self.read_step();
        self.advance(step)
    }

    fn read_step(&mut self) -> Result<Step> {
        let mut buf = Vec::with_capacity(WORD_SIZE);
        (&mut self.inner).take(WORD_SIZE as u64).read_to_end(&mut buf)?;
        if let Some(termination) = self.lead_word(&buf)? {
            return Ok(Step::End(termination));
        }

        let rest = self.frame_rest();
        (&mut self.inner).take(rest).read_to_end(&mut buf)?;
        self.frame_from(&buf)
    }

    /// Lazily yields every frame until the end of the stream or the first error.
    pub fn read_all(&mut self) -> Frames<'_, R> {
        Frames { reader: self }
    }
}

#[cfg(feature = "tokio")]
impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Reads `count` contiguous words in host order.
    ///
    /// # Errors
    ///
    /// Same as [`FrameReader::read_words`]
    pub async fn read_words_async(&mut self, count: usize) -> Result<Vec<u16>> {
        let mut buf = Vec::new();
        (&mut self.inner)
            .take(words_len(count))
            .read_to_end(&mut buf)
            .await?;
        self.words_from(&buf, count)
    }

    /// Reads and validates the next frame.
    ///
    /// # Errors
    ///
    /// Same as [`FrameReader::next_frame`]
    pub async fn next_frame_async(&mut self) -> Result<Next> {
        if let Some(next) = self.guard() {
            return next;
        }
        let step = self.read_step_async().await;
        self.advance(step)
    }

    async fn read_step_async(&mut self) -> Result<Step> {
        let mut buf = Vec::with_capacity(WORD_SIZE);
        (&mut self.inner)
            .take(WORD_SIZE as u64)
            .read_to_end(&mut buf)
            .await?;
        if let Some(termination) = self.lead_word(&buf)? {
            return Ok(Step::End(termination));
        }

        let rest = self.frame_rest();
        (&mut self.inner).take(rest).read_to_end(&mut buf).await?;
        self.frame_from(&buf)
    }
}

/// Single-pass iterator over the frames of a [`FrameReader`]
///
/// Yields the first error and then stops.
pub struct Frames<'a, R> {
    reader: &'a mut FrameReader<R>,
}

impl<'a, R: Read> Frames<'a, R> {
    /// Hands every validated payload to `decoder`.
    ///
    /// A decoder failure halts the pass like any other error.
    pub fn decoded<D: PayloadDecoder>(self, decoder: D) -> Decoded<'a, R, D> {
        Decoded {
            frames: self,
            decoder,
        }
    }
}

impl<R: Read> Iterator for Frames<'_, R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.state() != ReaderState::Reading {
            return None;
        }
        match self.reader.next_frame() {
            Ok(Next::Frame(frame)) => Some(Ok(frame)),
            Ok(Next::EndOfStream) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: Read> FusedIterator for Frames<'_, R> {}

/// Iterator over decoded payloads, see [`Frames::decoded`]
pub struct Decoded<'a, R, D> {
    frames: Frames<'a, R>,
    decoder: D,
}

impl<R: Read, D: PayloadDecoder> Iterator for Decoded<'_, R, D> {
    type Item = Result<D::Message>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = match self.frames.next()? {
            Ok(frame) => frame,
            Err(e) => return Some(Err(e)),
        };
        match self.decoder.decode(&frame.payload) {
            Ok(message) => Some(Ok(message)),
            Err(e) => {
                log::warn!("Decoder rejected frame {}: {}", self.frames.reader.frames_read(), e);
                self.frames.reader.state = ReaderState::Failed;
                Some(Err(Error::Decode(Box::new(e))))
            }
        }
    }
}

impl<R: Read, D: PayloadDecoder> FusedIterator for Decoded<'_, R, D> {}
