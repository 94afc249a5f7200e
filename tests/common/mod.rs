//! Synthetic BDMV fixture builders shared by the integration tests.
//!
//! Everything here produces the same big-endian layouts the parsers
//! read, byte by byte, so the tests exercise real parsing rather than
//! pre-built model values.

#![allow(dead_code)]

/// One play item of a playlist fixture.
pub struct MplsItem {
    pub clip_id: String,
    pub in_ticks: u32,
    pub out_ticks: u32,
    pub audio_streams: usize,
    pub subtitle_streams: usize,
    corrupt_stn: bool,
}

impl MplsItem {
    pub fn new(clip_id: &str, duration_secs: u64) -> MplsItem {
        MplsItem {
            clip_id: clip_id.to_owned(),
            in_ticks: 0,
            out_ticks: (duration_secs * 45_000) as u32,
            audio_streams: 1,
            subtitle_streams: 1,
            corrupt_stn: false,
        }
    }

    pub fn with_times(clip_id: &str, in_ticks: u32, out_ticks: u32) -> MplsItem {
        MplsItem {
            clip_id: clip_id.to_owned(),
            in_ticks,
            out_ticks,
            audio_streams: 1,
            subtitle_streams: 1,
            corrupt_stn: false,
        }
    }

    pub fn streams(mut self, audio: usize, subtitles: usize) -> MplsItem {
        self.audio_streams = audio;
        self.subtitle_streams = subtitles;
        self
    }

    /// Makes the stream number table declare more bytes than the play
    /// item holds.
    pub fn corrupt_stn(mut self) -> MplsItem {
        self.corrupt_stn = true;
        self
    }

    fn build(&self) -> Vec<u8> {
        let mut body: Vec<u8> = Vec::new();
        body.extend_from_slice(self.clip_id.as_bytes());
        body.extend_from_slice(b"M2TS");
        body.extend_from_slice(&0x0001u16.to_be_bytes()); // connection condition, no angles
        body.push(0); // STC id
        body.extend_from_slice(&self.in_ticks.to_be_bytes());
        body.extend_from_slice(&self.out_ticks.to_be_bytes());
        body.extend_from_slice(&0u64.to_be_bytes()); // UO mask
        body.push(0); // random access flag
        body.extend_from_slice(&[0u8; 3]); // still mode and time

        let mut stn: Vec<u8> = Vec::new();
        stn.extend_from_slice(&0u16.to_be_bytes()); // reserved
        stn.push(1); // primary video
        stn.push(self.audio_streams as u8);
        stn.push(self.subtitle_streams as u8);
        stn.push(0); // IG
        stn.push(0); // secondary audio
        stn.push(0); // secondary video
        stn.extend_from_slice(&[0u8; 5]); // reserved

        push_stream(&mut stn, 0x1011, &[0x1B, 0x16]);
        for i in 0..self.audio_streams {
            push_stream(&mut stn, 0x1100 + i as u16, &[0x81, 0x31, b'j', b'p', b'n']);
        }
        for i in 0..self.subtitle_streams {
            push_stream(&mut stn, 0x1200 + i as u16, &[0x90, b'j', b'p', b'n']);
        }

        let declared = if self.corrupt_stn {
            stn.len() + 200
        } else {
            stn.len()
        };
        body.extend_from_slice(&(declared as u16).to_be_bytes());
        body.extend_from_slice(&stn);
        body
    }
}

fn push_stream(stn: &mut Vec<u8>, pid: u16, attrs: &[u8]) {
    stn.push(3); // entry length: kind + pid
    stn.push(1); // kind: play item
    stn.extend_from_slice(&pid.to_be_bytes());
    stn.push(attrs.len() as u8);
    stn.extend_from_slice(attrs);
}

/// A playlist fixture: play items plus entry marks.
pub struct MplsFixture {
    items: Vec<MplsItem>,
    marks: Vec<(u16, u32)>,
}

impl MplsFixture {
    pub fn new() -> MplsFixture {
        MplsFixture {
            items: Vec::new(),
            marks: Vec::new(),
        }
    }

    pub fn item(mut self, item: MplsItem) -> MplsFixture {
        self.items.push(item);
        self
    }

    /// Adds an entry mark on `play_item` at `ticks`.
    pub fn mark(mut self, play_item: u16, ticks: u32) -> MplsFixture {
        self.marks.push((play_item, ticks));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut play_list: Vec<u8> = Vec::new();
        play_list.extend_from_slice(&0u16.to_be_bytes()); // reserved
        play_list.extend_from_slice(&(self.items.len() as u16).to_be_bytes());
        play_list.extend_from_slice(&0u16.to_be_bytes()); // sub paths
        for item in &self.items {
            let body = item.build();
            play_list.extend_from_slice(&(body.len() as u16).to_be_bytes());
            play_list.extend_from_slice(&body);
        }

        let mut mark_table: Vec<u8> = Vec::new();
        mark_table.extend_from_slice(&(self.marks.len() as u16).to_be_bytes());
        for (play_item, ticks) in &self.marks {
            mark_table.push(0); // reserved
            mark_table.push(1); // entry point
            mark_table.extend_from_slice(&play_item.to_be_bytes());
            mark_table.extend_from_slice(&ticks.to_be_bytes());
            mark_table.extend_from_slice(&0u16.to_be_bytes()); // entry ES PID
            mark_table.extend_from_slice(&0u32.to_be_bytes()); // duration
        }

        let play_list_start = 8 + 3 * 4 + 20;
        let mark_start = play_list_start + 4 + play_list.len();

        let mut data: Vec<u8> = Vec::new();
        data.extend_from_slice(b"MPLS0200");
        data.extend_from_slice(&(play_list_start as u32).to_be_bytes());
        data.extend_from_slice(&(mark_start as u32).to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes()); // no extension data
        data.extend_from_slice(&[0u8; 20]); // reserved
        data.extend_from_slice(&(play_list.len() as u32).to_be_bytes());
        data.extend_from_slice(&play_list);
        data.extend_from_slice(&(mark_table.len() as u32).to_be_bytes());
        data.extend_from_slice(&mark_table);
        data
    }
}

pub fn video_attrs() -> Vec<u8> {
    vec![0x1B, 0x16]
}

pub fn audio_attrs(lang: &str) -> Vec<u8> {
    let mut out = vec![0x81, 0x31];
    out.extend_from_slice(lang.as_bytes());
    out
}

pub fn pg_attrs(lang: &str) -> Vec<u8> {
    let mut out = vec![0x90];
    out.extend_from_slice(lang.as_bytes());
    out
}

/// A clip information fixture from (pid, attribute block body) pairs.
pub fn clpi(streams: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut program: Vec<u8> = Vec::new();
    program.push(0); // reserved
    program.extend_from_slice(&(streams.len() as u16).to_be_bytes());
    for (pid, attrs) in streams {
        program.extend_from_slice(&pid.to_be_bytes());
        program.push(attrs.len() as u8);
        program.extend_from_slice(attrs);
    }

    let mut data: Vec<u8> = Vec::new();
    data.extend_from_slice(b"HDMV0200");
    let program_info_start = 8 + 6 * 4;
    for offset in &[0u32, 0, program_info_start as u32, 0, 0, 0] {
        data.extend_from_slice(&offset.to_be_bytes());
    }
    data.extend_from_slice(&(program.len() as u32).to_be_bytes());
    data.extend_from_slice(&program);
    data
}

/// An `index.bdmv` fixture with one HDMV title per movie object id.
pub fn index_bdmv(title_objects: &[u16]) -> Vec<u8> {
    fn entry(id: u16) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(1u32 << 30).to_be_bytes()); // HDMV object
        out.extend_from_slice(&[0u8; 2]); // playback type
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out
    }

    let mut section: Vec<u8> = Vec::new();
    section.extend_from_slice(&entry(0)); // first play
    section.extend_from_slice(&entry(0)); // top menu
    section.extend_from_slice(&(title_objects.len() as u16).to_be_bytes());
    for id in title_objects {
        section.extend_from_slice(&entry(*id));
    }

    let mut data: Vec<u8> = Vec::new();
    data.extend_from_slice(b"INDX0200");
    let indexes_start = 8 + 2 * 4;
    data.extend_from_slice(&(indexes_start as u32).to_be_bytes());
    data.extend_from_slice(&0u32.to_be_bytes());
    data.extend_from_slice(&(section.len() as u32).to_be_bytes());
    data.extend_from_slice(&section);
    data
}

/// A 12-byte PlayPL instruction.
pub fn play_pl(playlist: u32) -> Vec<u8> {
    instruction((1 << 29) | (2 << 24), playlist, 0)
}

/// A 12-byte PlayPL-at-chapter instruction.
pub fn play_pl_at_chapter(playlist: u32, mark: u32) -> Vec<u8> {
    instruction((1 << 29) | (2 << 24) | (2 << 16), playlist, mark)
}

fn instruction(opcode: u32, destination: u32, source: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&opcode.to_be_bytes());
    out.extend_from_slice(&destination.to_be_bytes());
    out.extend_from_slice(&source.to_be_bytes());
    out
}

/// A `MovieObject.bdmv` fixture; one instruction list per object.
pub fn movie_object_bdmv(objects: &[Vec<Vec<u8>>]) -> Vec<u8> {
    let mut section: Vec<u8> = Vec::new();
    section.extend_from_slice(&(objects.len() as u32).to_be_bytes());
    for instructions in objects {
        section.extend_from_slice(&0u16.to_be_bytes()); // flags
        section.extend_from_slice(&(instructions.len() as u16).to_be_bytes());
        for i in instructions {
            section.extend_from_slice(i);
        }
    }

    let mut data: Vec<u8> = Vec::new();
    data.extend_from_slice(b"MOBJ0200");
    data.extend_from_slice(&0u32.to_be_bytes());
    data.extend_from_slice(&[0u8; 28]);
    data.extend_from_slice(&(section.len() as u32).to_be_bytes());
    data.extend_from_slice(&section);
    data
}

fn push_command_list(out: &mut Vec<u8>, commands: &[Vec<u8>]) {
    out.extend_from_slice(&(commands.len() as u16).to_be_bytes());
    for c in commands {
        out.extend_from_slice(c);
    }
}

/// A menu transport stream on an IG PID carrying one page with one
/// button running the given commands. The commands are spread over the
/// selected and activated state lists so both get exercised.
pub fn menu_stream(commands: &[Vec<u8>]) -> Vec<u8> {
    let (selected, activated) = commands.split_at(commands.len() / 2);

    let mut button: Vec<u8> = Vec::new();
    button.extend_from_slice(&1u16.to_be_bytes());
    button.extend_from_slice(&[0u8; 2 + 1 + 4 + 8]); // numeric, auto action, position, neighbors
    button.extend_from_slice(&[0u8; 5]); // normal state objects
    push_command_list(&mut button, &[]);
    button.extend_from_slice(&[0u8; 6]); // selected state sound and objects
    push_command_list(&mut button, selected);
    button.extend_from_slice(&[0u8; 5]); // activated state sound and objects
    push_command_list(&mut button, activated);

    let mut page: Vec<u8> = Vec::new();
    page.push(0); // page id
    page.push(0); // version
    page.extend_from_slice(&[0u8; 8]); // UO mask
    page.extend_from_slice(&[0, 0]); // in effects
    page.extend_from_slice(&[0, 0]); // out effects
    page.push(0); // animation frame rate
    page.extend_from_slice(&[0u8; 4]); // default buttons
    page.push(0); // palette
    page.push(1); // one BOG
    page.extend_from_slice(&0xFFFFu16.to_be_bytes());
    page.push(1); // one button
    page.extend_from_slice(&button);

    let mut ic: Vec<u8> = Vec::new();
    ic.extend_from_slice(&[0, 0, 0]); // length, unused
    ic.push(0x80); // multiplexed stream model
    ic.extend_from_slice(&[0, 0, 0]); // user timeout
    ic.push(1);
    ic.extend_from_slice(&page);

    let mut segment: Vec<u8> = Vec::new();
    segment.push(0x18);
    segment.extend_from_slice(&((ic.len() + 9) as u16).to_be_bytes());
    segment.extend_from_slice(&[0u8; 5]); // video descriptor
    segment.extend_from_slice(&[0u8; 3]); // composition descriptor
    segment.push(0xC0); // first and last in sequence
    segment.extend_from_slice(&ic);

    let mut pes: Vec<u8> = Vec::new();
    pes.extend_from_slice(&[0x00, 0x00, 0x01, 0xBD]);
    pes.extend_from_slice(&((segment.len() + 3) as u16).to_be_bytes());
    pes.extend_from_slice(&[0x80, 0x00, 0x00]);
    pes.extend_from_slice(&segment);

    let pid = 0x1400u16;
    let mut ts: Vec<u8> = Vec::new();
    for (i, chunk) in pes.chunks(184).enumerate() {
        let mut pkt: Vec<u8> = Vec::with_capacity(188);
        pkt.push(0x47);
        let pusi = if i == 0 { 0x40 } else { 0x00 };
        pkt.push(pusi | ((pid >> 8) as u8 & 0x1F));
        pkt.push(pid as u8);
        pkt.push(0x10 | (i as u8 & 0x0F));
        pkt.extend_from_slice(chunk);
        pkt.resize(188, 0xFF);
        ts.extend_from_slice(&pkt);
    }
    ts
}
