//! `MovieObject.bdmv` parser.
//!
//! Movie objects are flat sequences of 12-byte HDMV navigation
//! instructions. The analysis only interprets the play family (PlayPL,
//! PlayPL at mark, PlayPL at chapter) to learn which playlists the disc
//! titles actually start; everything else is preserved raw.

use super::file_header;
use crate::error::{ParseError, ParseWarning};
use crate::reader::Cursor;
use crate::types::{Instruction, MovieObject, WarningCode};

/// Command group 3 is reserved; anything there is an opcode this crate
/// does not understand.
const GROUP_RESERVED: u8 = 3;

/// Attempts to parse a `MovieObject.bdmv` buffer.
pub fn parse(input: &[u8]) -> Result<(Vec<MovieObject>, Vec<ParseWarning>), ParseError> {
    let mut warnings = Vec::new();
    let mut cur = Cursor::new(input);

    file_header(&mut cur, "MOBJ")?;
    let _extension_start = cur.read_u32()?;
    cur.skip(28)?; // reserved

    let section = cur.length_prefixed_section("MovieObjects")?;
    let mut cur = Cursor::new(section);
    let n_objects = cur.read_u32()?;

    let mut objects = Vec::new();
    let mut unknown_opcodes = 0usize;
    for id in 0..n_objects {
        let _flags = cur.read_u16()?;
        let n_instructions = cur.read_u16()?;
        let mut instructions = Vec::with_capacity(n_instructions as usize);
        for _ in 0..n_instructions {
            let raw = cur.read_bytes(12)?;
            let instruction = Instruction {
                opcode: u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]),
                destination: u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]),
                source: u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]),
            };
            if instruction.group() == GROUP_RESERVED {
                unknown_opcodes += 1;
            }
            instructions.push(instruction);
        }
        let referenced_playlists = referenced_playlists(&instructions);
        objects.push(MovieObject {
            id: id as u16,
            instructions,
            referenced_playlists,
        });
    }

    if unknown_opcodes > 0 {
        warnings.push(ParseWarning::new(
            WarningCode::UnknownOpcode,
            format!(
                "{} instruction(s) with a reserved command group were preserved uninterpreted",
                unknown_opcodes
            ),
        ));
    }

    Ok((objects, warnings))
}

/// The zero-padded 5-digit stems of every playlist started by a PlayPL
/// family instruction, in first-use order without repeats.
fn referenced_playlists(instructions: &[Instruction]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for instruction in instructions {
        if let Some(number) = instruction.playlist_number() {
            if number > 99_999 {
                continue;
            }
            let stem = format!("{:05}", number);
            if !out.contains(&stem) {
                out.push(stem);
            }
        }
    }
    out
}
