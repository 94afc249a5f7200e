//! Parsers for the BDMV metadata formats.
//!
//! Each module parses one file format: section-level navigation (magic,
//! version, offset tables) goes through [`Cursor`], the record grammars
//! inside a section are nom parsers. All formats are big-endian.
//!
//! [`Cursor`]: ../reader/struct.Cursor.html

use crate::error::ParseError;
use crate::reader::Cursor;
use crate::types::{Codec, TimeStamp};
use nom::{bytes::complete::take, combinator::map, number::complete::be_u32, IResult};

pub mod clpi;
pub mod igs;
pub mod index;
pub mod mobj;
pub mod mpls;

pub(crate) fn str_len(len: usize, input: &[u8]) -> IResult<&[u8], &str> {
    let (input, v) = take(len)(input)?;
    match std::str::from_utf8(v) {
        Ok(s) => Ok((input, s)),
        Err(_) => Err(nom::Err::Error((input, nom::error::ErrorKind::Char))),
    }
}

pub(crate) fn str_len_owned(len: usize, input: &[u8]) -> IResult<&[u8], String> {
    let (input, s) = str_len(len, input)?;
    Ok((input, s.into()))
}

pub(crate) fn clip_file_name(input: &[u8]) -> IResult<&[u8], &str> {
    str_len(5, input)
}

pub(crate) fn clip_codec_id(input: &[u8]) -> IResult<&[u8], &str> {
    str_len(4, input)
}

pub(crate) fn lang_code(input: &[u8]) -> IResult<&[u8], String> {
    str_len_owned(3, input)
}

pub(crate) fn time_stamp(input: &[u8]) -> IResult<&[u8], TimeStamp> {
    map(be_u32, TimeStamp)(input)
}

/// The format versions this crate understands, shared by all four
/// metadata formats.
const KNOWN_VERSIONS: [&str; 3] = ["0100", "0200", "0300"];

/// Checks the 4-byte magic and the 4-byte ASCII version that every BDMV
/// metadata file starts with, returning the version string.
pub(crate) fn file_header(cur: &mut Cursor, expected: &'static str) -> Result<String, ParseError> {
    let magic = cur.read_bytes(4)?;
    if magic != expected.as_bytes() {
        return Err(ParseError::MagicMismatch {
            expected,
            got: String::from_utf8_lossy(magic).into_owned(),
        });
    }
    let version = cur.read_bytes(4)?;
    match std::str::from_utf8(version) {
        Ok(v) if KNOWN_VERSIONS.contains(&v) => Ok(v.to_owned()),
        _ => Err(ParseError::UnsupportedVersion {
            got: String::from_utf8_lossy(version).into_owned(),
        }),
    }
}

/// Parses the body of a stream attributes block (the part after its u8
/// length prefix), shared between the MPLS stream number table and the
/// CLPI program info table.
///
/// Unknown coding types never fail the parse; the stream comes out with
/// [`Codec::Unknown`] and whatever attribute bytes follow are ignored.
///
/// [`Codec::Unknown`]: ../types/enum.Codec.html
pub(crate) fn stream_attributes(input: &[u8]) -> IResult<&[u8], (u8, Codec, Option<String>)> {
    use nom::number::complete::be_u8;

    let (rest, coding_type) = be_u8(input)?;
    let codec = Codec::from_coding_type(coding_type);
    let language = if codec.is_audio() {
        // audio format/sample rate byte, then the language tag
        let (rest, _) = take(1usize)(rest)?;
        let (_, lang) = lang_code(rest)?;
        Some(lang)
    } else {
        match codec {
            Codec::Pgs | Codec::Igs => {
                let (_, lang) = lang_code(rest)?;
                Some(lang)
            }
            Codec::TextSubtitle => {
                // character code byte, then the language tag
                let (rest, _) = take(1usize)(rest)?;
                let (_, lang) = lang_code(rest)?;
                Some(lang)
            }
            Codec::Unknown => {
                log::debug!("unknown stream coding type 0x{:02X}", coding_type);
                None
            }
            // video attributes carry format and frame rate, no language
            _ => None,
        }
    };
    Ok((&input[input.len()..], (coding_type, codec, language)))
}

/// Maps a nom error inside `section` to a [`ParseError`], recovering the
/// absolute failure offset from the unconsumed input. `base` must be the
/// slice the failing parser was started on.
pub(crate) fn malformed<'a>(
    section: &'static str,
    base: &'a [u8],
    err: nom::Err<(&'a [u8], nom::error::ErrorKind)>,
) -> ParseError {
    let offset = match &err {
        nom::Err::Error((rest, _)) | nom::Err::Failure((rest, _)) => base.len() - rest.len(),
        nom::Err::Incomplete(_) => base.len(),
    };
    ParseError::Malformed { section, offset }
}
