//! Interactive Graphics menu stream scanner (experimental).
//!
//! Scans a menu `*.m2ts` for Interactive Composition Segments, the
//! structures that define menu pages, buttons, and the navigation
//! commands behind them. Buttons that start playlists at chapter marks
//! are a strong hint for where episodes begin, which is all the episode
//! inference needs from the menu system.
//!
//! The scanner is strictly defensive: malformed packets, PES payloads,
//! or segments are skipped with a warning and never fail the pipeline,
//! and at most [`MAX_TS_PACKETS`] transport packets are examined per
//! file.

use crate::error::{ParseError, ParseWarning};
use crate::reader::Cursor;
use crate::types::{IgButtonAction, Instruction, NavKind, WarningCode};
use std::collections::BTreeMap;

/// Transport packet budget per file, bounding worst-case cost on
/// malformed streams.
pub const MAX_TS_PACKETS: usize = 200_000;

const TS_PACKET_SIZE: usize = 188;
const TS_SYNC_BYTE: u8 = 0x47;
const IG_PID_FIRST: u16 = 0x1400;
const IG_PID_LAST: u16 = 0x141F;
const SEGMENT_TYPE_ICS: u8 = 0x18;

/// Everything the scanner recovered from one menu stream.
#[derive(Debug, Default)]
pub struct IgScan {
    pub actions: Vec<IgButtonAction>,
    /// Chapter mark numbers referenced by PlayPL-at-chapter commands,
    /// sorted and unique.
    pub chapter_marks: Vec<u32>,
}

#[derive(Default)]
struct PidState {
    pes: Vec<u8>,
    open: bool,
    ics_fragments: Vec<u8>,
}

/// Scans a menu transport stream for button navigation commands.
pub fn scan(input: &[u8]) -> (IgScan, Vec<ParseWarning>) {
    scan_with_budget(input, MAX_TS_PACKETS)
}

pub(crate) fn scan_with_budget(input: &[u8], max_packets: usize) -> (IgScan, Vec<ParseWarning>) {
    let mut warnings = Vec::new();
    let mut states: BTreeMap<u16, PidState> = BTreeMap::new();
    let mut out = IgScan::default();

    let n_packets = input.len() / TS_PACKET_SIZE;
    for i in 0..n_packets.min(max_packets) {
        let pkt = &input[i * TS_PACKET_SIZE..(i + 1) * TS_PACKET_SIZE];
        if pkt[0] != TS_SYNC_BYTE {
            log::debug!("transport packet {} lost sync", i);
            continue;
        }
        let pid = ((pkt[1] as u16 & 0x1F) << 8) | pkt[2] as u16;
        if !(IG_PID_FIRST..=IG_PID_LAST).contains(&pid) {
            continue;
        }
        let pusi = pkt[1] & 0x40 != 0;
        let afc = (pkt[3] >> 4) & 0x3;
        let mut payload_start = 4;
        if afc & 0x2 != 0 {
            payload_start = 5 + pkt[4] as usize;
        }
        if afc & 0x1 == 0 {
            continue;
        }
        if payload_start > TS_PACKET_SIZE {
            warnings.push(ParseWarning::new(
                WarningCode::MalformedSection,
                format!("transport packet {} has an oversized adaptation field", i),
            ));
            continue;
        }
        let payload = &pkt[payload_start..];

        let state = states.entry(pid).or_default();
        if pusi {
            if state.open {
                finish_pes(pid, state, &mut out, &mut warnings);
            }
            state.pes.clear();
            state.pes.extend_from_slice(payload);
            state.open = true;
        } else if state.open {
            state.pes.extend_from_slice(payload);
        }
    }

    if n_packets > max_packets {
        warnings.push(ParseWarning::new(
            WarningCode::IgScanTruncated,
            format!(
                "stopped after {} of {} transport packets",
                max_packets, n_packets
            ),
        ));
    }

    for (pid, state) in states.iter_mut() {
        if state.open {
            finish_pes(*pid, state, &mut out, &mut warnings);
        }
    }

    out.chapter_marks.sort_unstable();
    out.chapter_marks.dedup();
    (out, warnings)
}

/// Strips the PES header off a reassembled packet and walks its
/// segments. The PES length field, when set, trims away the transport
/// stuffing that padded the final packet.
fn finish_pes(
    pid: u16,
    state: &mut PidState,
    out: &mut IgScan,
    warnings: &mut Vec<ParseWarning>,
) {
    state.open = false;
    let buf = state.pes.as_slice();
    if buf.len() < 9 || buf[0..3] != [0x00, 0x00, 0x01] {
        warnings.push(ParseWarning::new(
            WarningCode::MalformedSection,
            format!("malformed PES header on pid 0x{:04X}", pid),
        ));
        return;
    }
    let pes_length = u16::from_be_bytes([buf[4], buf[5]]) as usize;
    let buf = if pes_length != 0 && buf.len() >= 6 + pes_length {
        &buf[..6 + pes_length]
    } else {
        buf
    };
    let header_length = buf[8] as usize;
    let payload = match buf.get(9 + header_length..) {
        Some(payload) => payload,
        None => {
            warnings.push(ParseWarning::new(
                WarningCode::MalformedSection,
                format!("PES header overruns packet on pid 0x{:04X}", pid),
            ));
            return;
        }
    };
    segments(pid, payload, &mut state.ics_fragments, out, warnings);
}

fn segments(
    pid: u16,
    mut input: &[u8],
    fragments: &mut Vec<u8>,
    out: &mut IgScan,
    warnings: &mut Vec<ParseWarning>,
) {
    while input.len() >= 3 {
        let segment_type = input[0];
        let len = u16::from_be_bytes([input[1], input[2]]) as usize;
        let rest = &input[3..];
        if len > rest.len() {
            warnings.push(ParseWarning::new(
                WarningCode::MalformedSection,
                format!(
                    "segment 0x{:02X} on pid 0x{:04X} overruns the PES payload",
                    segment_type, pid
                ),
            ));
            return;
        }
        if segment_type == SEGMENT_TYPE_ICS {
            ics_segment(pid, &rest[..len], fragments, out, warnings);
        }
        input = &rest[len..];
    }
}

/// An ICS may be split into fragments across PES packets; the sequence
/// descriptor says whether this one opens and/or closes the sequence.
fn ics_segment(
    pid: u16,
    body: &[u8],
    fragments: &mut Vec<u8>,
    out: &mut IgScan,
    warnings: &mut Vec<ParseWarning>,
) {
    // video descriptor (5), composition descriptor (3), sequence descriptor
    if body.len() < 9 {
        warnings.push(ParseWarning::new(
            WarningCode::MalformedSection,
            format!("interactive composition segment on pid 0x{:04X} is too short", pid),
        ));
        return;
    }
    let sequence = body[8];
    let first = sequence & 0x80 != 0;
    let last = sequence & 0x40 != 0;
    if first {
        fragments.clear();
    }
    fragments.extend_from_slice(&body[9..]);
    if last {
        let data = std::mem::take(fragments);
        if let Err(e) = interactive_composition(&data, out) {
            warnings.push(ParseWarning::new(
                WarningCode::MalformedSection,
                format!(
                    "interactive composition on pid 0x{:04X} skipped: {}",
                    pid, e
                ),
            ));
        }
    }
}

fn interactive_composition(data: &[u8], out: &mut IgScan) -> Result<(), ParseError> {
    let mut cur = Cursor::new(data);
    cur.skip(3)?; // 24-bit data length
    let model = cur.read_u8()?;
    if model & 0x80 == 0 {
        // composition and selection timeout PTS, 5 bytes each
        cur.skip(10)?;
    }
    cur.skip(3)?; // user timeout duration
    let n_pages = cur.read_u8()?;
    for _ in 0..n_pages {
        page(&mut cur, out)?;
    }
    Ok(())
}

fn page(cur: &mut Cursor, out: &mut IgScan) -> Result<(), ParseError> {
    let page_id = cur.read_u8()?;
    cur.skip(1)?; // page version
    cur.skip(8)?; // UO mask
    effect_sequence(cur)?; // in effects
    effect_sequence(cur)?; // out effects
    cur.skip(1)?; // animation frame rate
    cur.skip(4)?; // default selected / activated button
    cur.skip(1)?; // palette
    let n_bogs = cur.read_u8()?;
    for _ in 0..n_bogs {
        cur.skip(2)?; // default valid button
        let n_buttons = cur.read_u8()?;
        for _ in 0..n_buttons {
            button(cur, page_id, out)?;
        }
    }
    Ok(())
}

fn effect_sequence(cur: &mut Cursor) -> Result<(), ParseError> {
    let n_windows = cur.read_u8()?;
    cur.skip(n_windows as usize * 9)?;
    let n_effects = cur.read_u8()?;
    for _ in 0..n_effects {
        cur.skip(4)?; // duration, palette
        let n_objects = cur.read_u8()?;
        for _ in 0..n_objects {
            cur.skip(3)?; // object id, window id
            let flags = cur.read_u8()?;
            cur.skip(4)?; // x, y
            if flags & 0x80 != 0 {
                cur.skip(8)?; // crop rectangle
            }
        }
    }
    Ok(())
}

/// A button carries up to three command lists, one per state
/// (normal/selected/activated). All three feed the same action stream;
/// which state fires a command does not matter for structure analysis.
fn button(cur: &mut Cursor, page_id: u8, out: &mut IgScan) -> Result<(), ParseError> {
    let button_id = cur.read_u16()?;
    cur.skip(2)?; // numeric select value
    cur.skip(1)?; // auto action flag
    cur.skip(4)?; // x, y
    cur.skip(8)?; // neighbor info
    cur.skip(5)?; // normal state objects
    command_list(cur, page_id, button_id, out)?;
    cur.skip(6)?; // selected state sound and objects
    command_list(cur, page_id, button_id, out)?;
    cur.skip(5)?; // activated state sound and objects
    command_list(cur, page_id, button_id, out)?;
    Ok(())
}

fn command_list(
    cur: &mut Cursor,
    page_id: u8,
    button_id: u16,
    out: &mut IgScan,
) -> Result<(), ParseError> {
    let n_commands = cur.read_u16()?;
    for _ in 0..n_commands {
        let raw = cur.read_bytes(12)?;
        let instruction = Instruction {
            opcode: u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]),
            destination: u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]),
            source: u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]),
        };
        let kind = instruction.kind();
        if kind == NavKind::PlayPlAtChapter {
            out.chapter_marks.push(instruction.source);
        }
        out.actions.push(IgButtonAction {
            page_id,
            button_id,
            kind,
            destination: instruction.destination,
            source: instruction.source,
        });
    }
    Ok(())
}
