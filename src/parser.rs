use nom::{
    combinator::{map, verify},
    multi::count,
    number::{self, Endianness as NomEndianness},
    sequence::pair,
    IResult,
};

use crate::protocol::*;

/// Parse a single word
///
/// Reads the word in host order and swaps its bytes when the stream was
/// written in the other byte order.
pub fn word<'a>(endianness: Endianness) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], u16> {
    let swap = !endianness.is_native();
    map(number::complete::u16(NomEndianness::Native), move |word: u16| {
        if swap {
            word.swap_bytes()
        } else {
            word
        }
    })
}

/// Parse `n` contiguous words
pub fn words<'a>(
    endianness: Endianness,
    n: usize,
) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], Vec<u16>> {
    count(word(endianness), n)
}

/// Parse the end-of-data marker
pub fn sentinel<'a>(endianness: Endianness) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], u16> {
    verify(word(endianness), |word: &u16| *word == SENTINEL)
}

/// Parse a frame without checking its checksum
///
/// Returns the payload words and the stored checksum.
pub fn raw_frame<'a>(
    config: FrameConfig,
) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], (Vec<u16>, u16)> {
    pair(
        words(config.endianness, config.payload_words),
        word(config.endianness),
    )
}
