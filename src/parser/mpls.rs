//! Movie playlist (`*.mpls`) parser.
//!
//! An MPLS file names the clips a playback program concatenates, with
//! in/out times in 45 kHz ticks, per-item stream number tables, and a
//! chapter mark list. The header carries absolute offsets to the
//! PlayList and PlayListMark sections; each section is length-prefixed.
//!
//! The parser is deliberately tolerant inside a section: a play item or
//! stream table whose declared length does not match its contents is
//! skipped using that length and reported as a warning, so one damaged
//! item does not lose the rest of the playlist.

use super::{
    clip_codec_id, clip_file_name, file_header, malformed, stream_attributes, time_stamp,
};
use crate::error::{ParseError, ParseWarning};
use crate::reader::Cursor;
use crate::types::{Chapter, MarkType, PlayItem, Playlist, Stream, TimeStamp, WarningCode};
use nom::{
    bytes::complete::take,
    combinator::map,
    do_parse,
    number::complete::{be_u16, be_u8},
    take, IResult,
};

/// Attempts to parse a movie playlist from one `*.mpls` buffer.
///
/// `file_name` is recorded on the resulting [`Playlist`] and is what the
/// rest of the pipeline orders playlists by.
///
/// [`Playlist`]: ../../types/struct.Playlist.html
pub fn parse(
    file_name: &str,
    input: &[u8],
) -> Result<(Playlist, Vec<ParseWarning>), ParseError> {
    let mut warnings = Vec::new();
    let mut cur = Cursor::new(input);

    let version = file_header(&mut cur, "MPLS")?;
    let play_list_start = cur.read_u32()? as usize;
    let mark_start = cur.read_u32()? as usize;
    // extension data offset, may be zero
    let _extension_start = cur.read_u32()?;

    cur.seek(play_list_start)?;
    let section = cur.length_prefixed_section("PlayList")?;
    let play_items = play_list(section, &mut warnings)?;

    let chapters = if mark_start != 0 {
        cur.seek(mark_start)?;
        let section = cur.length_prefixed_section("PlayListMark")?;
        play_list_marks(section, &mut warnings)?
    } else {
        Vec::new()
    };

    Ok((
        Playlist {
            file_name: file_name.to_owned(),
            version,
            play_items,
            chapters,
            classification: None,
        },
        warnings,
    ))
}

fn play_list(
    section: &[u8],
    warnings: &mut Vec<ParseWarning>,
) -> Result<Vec<PlayItem>, ParseError> {
    let mut cur = Cursor::new(section);
    cur.skip(2)?; // reserved
    let n_items = cur.read_u16()?;
    let _n_sub_paths = cur.read_u16()?;
    if n_items == 0 {
        return Err(ParseError::Malformed {
            section: "PlayList",
            offset: 2,
        });
    }

    let mut items = Vec::with_capacity(n_items as usize);
    for i in 0..n_items {
        let len = match cur.read_u16() {
            Ok(len) => len as usize,
            Err(_) => {
                warnings.push(ParseWarning::new(
                    WarningCode::MalformedSection,
                    format!("play item table truncated after {} of {} items", i, n_items),
                ));
                break;
            }
        };
        if len > cur.remaining() {
            warnings.push(ParseWarning::new(
                WarningCode::MalformedSection,
                format!(
                    "play item {} declares {} bytes with only {} left in section",
                    i,
                    len,
                    cur.remaining()
                ),
            ));
            break;
        }
        let body = cur.read_bytes(len)?;
        match play_item(body, warnings) {
            Ok(item) => items.push(item),
            Err(e) => warnings.push(ParseWarning::new(
                WarningCode::MalformedSection,
                format!("play item {} skipped: {}", i, e),
            )),
        }
    }
    Ok(items)
}

struct ItemHeader {
    clip_id: String,
    codec_id: String,
    is_multi_angle: bool,
    in_time: TimeStamp,
    out_time: TimeStamp,
}

fn is_multi_angle(input: &[u8]) -> IResult<&[u8], bool> {
    let (input, b) = be_u16(input)?;
    // 0000 0000 000X .... <-- connection_condition
    // |-reserved -|^---- the bit we want
    Ok((input, ((b & 0x1F) >> 4) == 1))
}

fn item_header(input: &[u8]) -> IResult<&[u8], ItemHeader> {
    do_parse!(
        input,
        clip: clip_file_name >>
        codec: clip_codec_id >>
        is_multi_angle: is_multi_angle >>
        // RefToSTCID
        take!(1usize) >>
        in_time: time_stamp >>
        out_time: time_stamp >>
        // UO mask
        take!(8usize) >>
        // PlayItemRandomAccessFlag
        take!(1usize) >>
        // StillMode/StillTime
        take!(3usize) >>
        (ItemHeader {
            clip_id: clip.into(),
            codec_id: codec.into(),
            is_multi_angle,
            in_time,
            out_time,
        })
    )
}

/// Skips the multi-angle block. The main clip counts as an angle too, so
/// there are (n - 1) additional 10-byte angle clip entries after the two
/// header bytes.
fn skip_angles(input: &[u8]) -> IResult<&[u8], ()> {
    let (input, n) = map(be_u8, |n: u8| n.saturating_sub(1))(input)?;
    let (input, _) = take(1usize)(input)?;
    let (input, _) = take(n as usize * 10)(input)?;
    Ok((input, ()))
}

fn play_item(body: &[u8], warnings: &mut Vec<ParseWarning>) -> Result<PlayItem, ParseError> {
    let (rest, header) = item_header(body).map_err(|e| malformed("PlayItem", body, e))?;
    let rest = if header.is_multi_angle {
        let (rest, ()) = skip_angles(rest).map_err(|e| malformed("PlayItem", body, e))?;
        rest
    } else {
        rest
    };

    if header.out_time < header.in_time {
        warnings.push(ParseWarning::new(
            WarningCode::MalformedSection,
            format!(
                "clip {} has out time {} before in time {}",
                header.clip_id, header.out_time.0, header.in_time.0
            ),
        ));
    }

    let streams = stream_number_table(rest, &header.clip_id, warnings)?;
    Ok(PlayItem {
        clip_id: header.clip_id,
        codec_id: header.codec_id,
        in_time: header.in_time,
        out_time: header.out_time,
        streams,
        label: None,
    })
}

/// Parses the Stream Number Table at the tail of a play item: a u16
/// length, reserved word, six per-type stream counts, then for every
/// stream a length-prefixed entry (carrying the PID) and a
/// length-prefixed attributes block (codec and language).
fn stream_number_table(
    input: &[u8],
    clip_id: &str,
    warnings: &mut Vec<ParseWarning>,
) -> Result<Vec<Stream>, ParseError> {
    let mut cur = Cursor::new(input);
    let declared = cur.read_u16()? as usize;
    if declared > cur.remaining() {
        return Err(ParseError::LengthOverflow {
            section: "StreamNumberTable",
            declared: declared as u64,
            remaining: cur.remaining(),
        });
    }
    let body = cur.read_bytes(declared)?;

    let mut cur = Cursor::new(body);
    cur.skip(2)?; // reserved
    let n_video = cur.read_u8()? as usize;
    let n_audio = cur.read_u8()? as usize;
    let n_pg = cur.read_u8()? as usize;
    let n_ig = cur.read_u8()? as usize;
    let n_sec_audio = cur.read_u8()? as usize;
    let n_sec_video = cur.read_u8()? as usize;
    cur.skip(5)?; // reserved
    let total = n_video + n_audio + n_pg + n_ig + n_sec_audio + n_sec_video;

    let mut streams = Vec::with_capacity(total);
    for i in 0..total {
        let entry;
        let attrs;
        match read_block(&mut cur).and_then(|e| read_block(&mut cur).map(|a| (e, a))) {
            Ok((e, a)) => {
                entry = e;
                attrs = a;
            }
            Err(_) => {
                warnings.push(ParseWarning::new(
                    WarningCode::MalformedSection,
                    format!(
                        "stream table of clip {} truncated after {} of {} streams",
                        clip_id, i, total
                    ),
                ));
                break;
            }
        }
        let pid = match stream_entry_pid(entry) {
            Ok((_, pid)) => pid,
            Err(_) => {
                warnings.push(ParseWarning::new(
                    WarningCode::MalformedSection,
                    format!("stream {} of clip {} has an unknown entry kind", i, clip_id),
                ));
                continue;
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
                format!(
                    "stream {} of clip {} has a malformed attributes block",
                    i, clip_id
                ),
            )),
        }
    }
    Ok(streams)
}

/// Reads one u8-length-prefixed block off the cursor.
fn read_block<'a>(cur: &mut Cursor<'a>) -> Result<&'a [u8], ParseError> {
    let len = cur.read_u8()? as usize;
    cur.read_bytes(len)
}

/// Extracts the PID from a stream entry. Entry kind 1 refers into the
/// play item's own clip; kinds 2 to 4 refer through sub paths and carry
/// one or two extra reference bytes before the PID.
fn stream_entry_pid(input: &[u8]) -> IResult<&[u8], u16> {
    let (input, kind) = be_u8(input)?;
    let (input, pid) = match kind {
        0x1 => be_u16(input)?,
        0x2 => {
            let (input, _) = take(2usize)(input)?;
            be_u16(input)?
        }
        0x3 | 0x4 => {
            let (input, _) = take(1usize)(input)?;
            be_u16(input)?
        }
        _ => return Err(nom::Err::Error((input, nom::error::ErrorKind::Switch))),
    };
    Ok((input, pid & 0x1FFF))
}

fn mark_type(input: &[u8]) -> IResult<&[u8], MarkType> {
    map(be_u8, MarkType::from_raw)(input)
}

/// One 14-byte playlist mark: reserved byte, type, play item reference,
/// time stamp, entry ES PID, duration.
fn mark(input: &[u8]) -> IResult<&[u8], (MarkType, u16, TimeStamp)> {
    do_parse!(
        input,
        be_u8 >>
        mark_type: mark_type >>
        play_item: be_u16 >>
        ts: time_stamp >>
        // EntryESPID
        take!(2usize) >>
        // duration
        take!(4usize) >>
        ((mark_type, play_item, ts))
    )
}

fn play_list_marks(
    section: &[u8],
    warnings: &mut Vec<ParseWarning>,
) -> Result<Vec<Chapter>, ParseError> {
    let mut cur = Cursor::new(section);
    let n_marks = cur.read_u16()?;
    let mut chapters = Vec::with_capacity(n_marks as usize);
    for id in 0..n_marks {
        let body = match cur.read_bytes(14) {
            Ok(body) => body,
            Err(_) => {
                warnings.push(ParseWarning::new(
                    WarningCode::MalformedSection,
                    format!("mark table truncated after {} of {} marks", id, n_marks),
                ));
                break;
            }
        };
        match mark(body) {
            Ok((_, (mark_type, play_item, time_stamp))) => chapters.push(Chapter {
                id,
                mark_type,
                play_item,
                time_stamp,
            }),
            Err(_) => warnings.push(ParseWarning::new(
                WarningCode::MalformedSection,
                format!("mark {} is malformed", id),
            )),
        }
    }
    Ok(chapters)
}
