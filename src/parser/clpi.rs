//! Clip information (`*.clpi`) parser.
//!
//! Only the ProgramInfo section matters for structure analysis: it lists
//! the elementary streams of the clip with their PIDs, codecs, and
//! language tags. The attribute blocks share their layout with the MPLS
//! stream number table.

use super::{file_header, stream_attributes};
use crate::error::{ParseError, ParseWarning};
use crate::reader::Cursor;
use crate::types::{Clip, Stream, WarningCode};

/// Attempts to parse one `*.clpi` buffer. The clip id is derived from
/// the file name stem, which is how clips and play items are joined.
pub fn parse(file_name: &str, input: &[u8]) -> Result<(Clip, Vec<ParseWarning>), ParseError> {
    let mut warnings = Vec::new();
    let mut cur = Cursor::new(input);

    file_header(&mut cur, "HDMV")?;
    let _clip_info_start = cur.read_u32()?;
    let _sequence_info_start = cur.read_u32()?;
    let program_info_start = cur.read_u32()? as usize;
    let _cpi_start = cur.read_u32()?;
    let _clip_mark_start = cur.read_u32()?;
    let _extension_start = cur.read_u32()?;

    cur.seek(program_info_start)?;
    let section = cur.length_prefixed_section("ProgramInfo")?;
    let streams = program_info(section, &mut warnings)?;

    let clip_id = file_name
        .split('.')
        .next()
        .unwrap_or(file_name)
        .to_owned();
    Ok((Clip { clip_id, streams }, warnings))
}

fn program_info(
    section: &[u8],
    warnings: &mut Vec<ParseWarning>,
) -> Result<Vec<Stream>, ParseError> {
    let mut cur = Cursor::new(section);
    cur.skip(1)?; // reserved
    let n_streams = cur.read_u16()? as usize;

    let mut streams = Vec::with_capacity(n_streams);
    for i in 0..n_streams {
        let pid = match cur.read_u16() {
            Ok(pid) => pid & 0x1FFF,
            Err(_) => {
                warnings.push(ParseWarning::new(
                    WarningCode::MalformedSection,
                    format!("program info truncated after {} of {} streams", i, n_streams),
                ));
                break;
            }
        };
        let attrs = match cur
            .read_u8()
            .and_then(|len| cur.read_bytes(len as usize))
        {
            Ok(attrs) => attrs,
            Err(_) => {
                warnings.push(ParseWarning::new(
                    WarningCode::MalformedSection,
                    format!("program info truncated after {} of {} streams", i, n_streams),
                ));
                break;
            }
        };
        match stream_attributes(attrs) {
            Ok((_, (coding_type, codec, language))) => streams.push(Stream {
                pid,
                coding_type,
                codec,
                language,
            }),
            Err(_) => warnings.push(ParseWarning::new(
                WarningCode::MalformedSection,
                format!("stream {} has a malformed attributes block", i),
            )),
        }
    }
    Ok(streams)
}
