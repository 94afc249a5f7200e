//! `index.bdmv` parser.
//!
//! The index table maps First Play, Top Menu, and the numbered titles to
//! movie objects. Every entry is a 32-bit word carrying the object type
//! in its top two bits, followed by an 8-byte body; HDMV bodies carry
//! the movie object id, BD-J bodies name a JAR object and are recorded
//! without an id.

use super::file_header;
use crate::error::{ParseError, ParseWarning};
use crate::reader::Cursor;
use crate::types::{IndexTable, TitleEntry};

const OBJECT_TYPE_HDMV: u8 = 1;

/// Attempts to parse an `index.bdmv` buffer.
pub fn parse(input: &[u8]) -> Result<(IndexTable, Vec<ParseWarning>), ParseError> {
    let warnings = Vec::new();
    let mut cur = Cursor::new(input);

    file_header(&mut cur, "INDX")?;
    let indexes_start = cur.read_u32()? as usize;
    let _extension_start = cur.read_u32()?;

    cur.seek(indexes_start)?;
    let section = cur.length_prefixed_section("Indexes")?;
    let mut cur = Cursor::new(section);

    let first_play = entry(&mut cur)?;
    let top_menu = entry(&mut cur)?;
    let n_titles = cur.read_u16()?;

    let mut titles = Vec::with_capacity(n_titles as usize);
    for i in 0..n_titles {
        let (object_type, movie_object_id) = raw_entry(&mut cur)?;
        if let Some(movie_object_id) = movie_object_id {
            titles.push(TitleEntry {
                title_number: i + 1,
                object_type,
                movie_object_id,
            });
        }
    }

    Ok((
        IndexTable {
            first_play,
            top_menu,
            titles,
        },
        warnings,
    ))
}

fn entry(cur: &mut Cursor) -> Result<Option<u16>, ParseError> {
    let (_, id) = raw_entry(cur)?;
    Ok(id)
}

fn raw_entry(cur: &mut Cursor) -> Result<(u8, Option<u16>), ParseError> {
    let word = cur.read_u32()?;
    let object_type = (word >> 30) as u8;
    let body = cur.read_bytes(8)?;
    let id = if object_type == OBJECT_TYPE_HDMV {
        Some(u16::from_be_bytes([body[2], body[3]]))
    } else {
        None
    };
    Ok((object_type, id))
}
