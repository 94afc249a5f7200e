use serde::Serialize;
use std::fmt::Debug;

/// A time stamp, relative to some System Time Clock sequence, expressed in
/// 45 KHz ticks.
///
/// Ticks are the source of truth everywhere in this crate; milliseconds and
/// seconds are derived views.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TimeStamp(pub u32);

impl TimeStamp {
    /// Returns this time stamp in units of seconds.
    pub fn seconds(&self) -> f64 {
        (self.0 as f64) / 45_000f64
    }

    /// Returns this time stamp rounded to whole milliseconds.
    pub fn millis(&self) -> u64 {
        ((self.0 as u64) * 2 + 45) / 90
    }
}

impl Debug for TimeStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeStamp")
            .field("raw", &self.0)
            .field("secs", &self.seconds())
            .finish()
    }
}

/// Rounds `ms` to the nearest multiple of `step`.
pub fn quantize(ms: u64, step: u64) -> u64 {
    (ms + step / 2) / step * step
}

/// The quantization step for segment keys, in milliseconds. Absorbs
/// sub-frame timing variance between near-duplicate authorings of the
/// same segment.
pub const SEGMENT_KEY_STEP_MS: u64 = 250;

/// Canonical identity of a clip segment across playlists.
///
/// Two play items that reference the same clip with in/out times within
/// the quantization tolerance compare equal, which is what lets the
/// analysis recognize an opening or ending reused by every episode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentKey {
    pub clip_id: String,
    pub in_ms: u64,
    pub out_ms: u64,
}

impl SegmentKey {
    pub fn duration_ms(&self) -> u64 {
        self.out_ms.saturating_sub(self.in_ms)
    }
}

/// Elementary stream codec, mapped from the 1-byte stream coding type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Codec {
    Mpeg1Video,
    Mpeg2Video,
    Mpeg1Audio,
    Mpeg2Audio,
    H264,
    H264Mvc,
    Hevc,
    Vc1,
    Lpcm,
    Ac3,
    Dts,
    TrueHd,
    Ac3Plus,
    DtsHdHra,
    DtsHdMa,
    Ac3PlusSecondary,
    DtsExpress,
    Pgs,
    Igs,
    TextSubtitle,
    Unknown,
}

impl Codec {
    pub fn from_coding_type(coding_type: u8) -> Codec {
        match coding_type {
            0x01 => Codec::Mpeg1Video,
            0x02 => Codec::Mpeg2Video,
            0x03 => Codec::Mpeg1Audio,
            0x04 => Codec::Mpeg2Audio,
            0x1B => Codec::H264,
            0x20 => Codec::H264Mvc,
            0x24 => Codec::Hevc,
            0xEA => Codec::Vc1,
            0x80 => Codec::Lpcm,
            0x81 => Codec::Ac3,
            0x82 => Codec::Dts,
            0x83 => Codec::TrueHd,
            0x84 => Codec::Ac3Plus,
            0x85 => Codec::DtsHdHra,
            0x86 => Codec::DtsHdMa,
            0xA1 => Codec::Ac3PlusSecondary,
            0xA2 => Codec::DtsExpress,
            0x90 => Codec::Pgs,
            0x91 => Codec::Igs,
            0x92 => Codec::TextSubtitle,
            _ => Codec::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Codec::Mpeg1Video => "MPEG-1",
            Codec::Mpeg2Video => "MPEG-2",
            Codec::Mpeg1Audio => "MPA1",
            Codec::Mpeg2Audio => "MPA2",
            Codec::H264 => "H264",
            Codec::H264Mvc => "MVC",
            Codec::Hevc => "HEVC",
            Codec::Vc1 => "VC-1",
            Codec::Lpcm => "LPCM",
            Codec::Ac3 => "AC3",
            Codec::Dts => "DTS",
            Codec::TrueHd => "TRUEHD",
            Codec::Ac3Plus => "EAC3",
            Codec::DtsHdHra => "DTSHD-HRA",
            Codec::DtsHdMa => "DTSHD-MA",
            Codec::Ac3PlusSecondary => "EAC3-SEC",
            Codec::DtsExpress => "DTS-EXP",
            Codec::Pgs => "PGS",
            Codec::Igs => "IGS",
            Codec::TextSubtitle => "TEXTST",
            Codec::Unknown => "UNKNOWN",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            Codec::Mpeg1Video
                | Codec::Mpeg2Video
                | Codec::H264
                | Codec::H264Mvc
                | Codec::Hevc
                | Codec::Vc1
        )
    }

    pub fn is_audio(&self) -> bool {
        matches!(
            self,
            Codec::Mpeg1Audio
                | Codec::Mpeg2Audio
                | Codec::Lpcm
                | Codec::Ac3
                | Codec::Dts
                | Codec::TrueHd
                | Codec::Ac3Plus
                | Codec::DtsHdHra
                | Codec::DtsHdMa
                | Codec::Ac3PlusSecondary
                | Codec::DtsExpress
        )
    }

    pub fn is_subtitle(&self) -> bool {
        matches!(self, Codec::Pgs | Codec::TextSubtitle)
    }
}

/// A media stream within a clip or play item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    /// 13-bit packet identifier within the transport stream.
    pub pid: u16,
    /// The raw stream coding type byte.
    pub coding_type: u8,
    pub codec: Codec,
    /// ISO 639-2 language tag, where the stream kind carries one.
    pub language: Option<String>,
}

/// Heuristic role of a segment within an episode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SegmentLabel {
    Legal,
    Op,
    Body,
    Ed,
    Preview,
    Unknown,
}

/// One entry of a playlist: a clip reference with a time range and the
/// stream number table that applies while it plays.
#[derive(Debug, Clone)]
pub struct PlayItem {
    /// Five-digit clip identifier, e.g. "00055".
    pub clip_id: String,
    /// Four-letter codec id, "M2TS" on BD-ROM discs.
    pub codec_id: String,
    pub in_time: TimeStamp,
    pub out_time: TimeStamp,
    pub streams: Vec<Stream>,
    /// Set by the segment classifier, `None` until the analysis ran.
    pub label: Option<SegmentLabel>,
}

impl PlayItem {
    pub fn duration_ticks(&self) -> u64 {
        (self.out_time.0 as u64).saturating_sub(self.in_time.0 as u64)
    }

    /// The stream file this item plays, derived from the clip id.
    pub fn m2ts_file_name(&self) -> String {
        format!("{}.m2ts", self.clip_id)
    }

    pub fn segment_key(&self) -> SegmentKey {
        SegmentKey {
            clip_id: self.clip_id.clone(),
            in_ms: quantize(self.in_time.millis(), SEGMENT_KEY_STEP_MS),
            out_ms: quantize(self.out_time.millis(), SEGMENT_KEY_STEP_MS),
        }
    }

    pub fn audio_stream_count(&self) -> usize {
        self.streams.iter().filter(|s| s.codec.is_audio()).count()
    }

    pub fn subtitle_stream_count(&self) -> usize {
        self.streams.iter().filter(|s| s.codec.is_subtitle()).count()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkType {
    EntryPoint,
    LinkPoint,
    Unknown,
}

impl MarkType {
    pub fn from_raw(raw: u8) -> MarkType {
        match raw {
            0x1 => MarkType::EntryPoint,
            0x2 => MarkType::LinkPoint,
            _ => MarkType::Unknown,
        }
    }
}

/// A chapter mark within a playlist, ordered by id.
#[derive(Debug, Copy, Clone)]
pub struct Chapter {
    pub id: u16,
    pub mark_type: MarkType,
    /// Index of the play item the mark points into.
    pub play_item: u16,
    pub time_stamp: TimeStamp,
}

/// Classification of a whole playlist, assigned by the analysis.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistClass {
    Episode,
    PlayAll,
    Bumper,
    CreditlessOp,
    CreditlessEd,
    Extra,
    DuplicateVariant,
}

/// One parsed `*.mpls` file.
#[derive(Debug, Clone)]
pub struct Playlist {
    /// The playlist file name, e.g. "00001.mpls".
    pub file_name: String,
    /// Four ASCII bytes, e.g. "0200".
    pub version: String,
    pub play_items: Vec<PlayItem>,
    pub chapters: Vec<Chapter>,
    /// Set by the playlist classifier, `None` until the analysis ran.
    pub classification: Option<PlaylistClass>,
}

impl Playlist {
    /// Total duration: the sum of all play item durations.
    pub fn duration_ticks(&self) -> u64 {
        self.play_items.iter().map(|p| p.duration_ticks()).sum()
    }

    pub fn duration_ms(&self) -> u64 {
        (self.duration_ticks() * 2 + 45) / 90
    }

    /// Ordered (clip id, in ticks, out ticks) triples; byte-exact identity.
    pub fn signature_exact(&self) -> Vec<(String, u32, u32)> {
        self.play_items
            .iter()
            .map(|p| (p.clip_id.clone(), p.in_time.0, p.out_time.0))
            .collect()
    }

    /// Ordered segment keys; identity up to the 250 ms quantization.
    pub fn signature_loose(&self) -> Vec<SegmentKey> {
        self.play_items.iter().map(|p| p.segment_key()).collect()
    }

    pub fn audio_stream_count(&self) -> usize {
        self.play_items
            .iter()
            .map(|p| p.audio_stream_count())
            .max()
            .unwrap_or(0)
    }

    pub fn subtitle_stream_count(&self) -> usize {
        self.play_items
            .iter()
            .map(|p| p.subtitle_stream_count())
            .max()
            .unwrap_or(0)
    }
}

/// One parsed `*.clpi` file.
#[derive(Debug, Clone)]
pub struct Clip {
    pub clip_id: String,
    pub streams: Vec<Stream>,
}

/// One title of the disc's index table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleEntry {
    /// 1-based title number.
    pub title_number: u16,
    pub object_type: u8,
    pub movie_object_id: u16,
}

/// The parsed `index.bdmv` table.
#[derive(Debug, Clone, Default)]
pub struct IndexTable {
    pub first_play: Option<u16>,
    pub top_menu: Option<u16>,
    pub titles: Vec<TitleEntry>,
}

/// Navigation command kind, shared between `MovieObject.bdmv` and IG
/// button command lists.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavKind {
    PlayPl,
    PlayPlAtMark,
    PlayPlAtChapter,
    JumpTitle,
    SetRegister,
    Other,
}

/// A raw 12-byte HDMV navigation instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u32,
    pub destination: u32,
    pub source: u32,
}

impl Instruction {
    /// Operand count field, bits 31..29 of the opcode word.
    pub fn operand_count(&self) -> u8 {
        ((self.opcode >> 29) & 0x7) as u8
    }

    /// Command group, bits 28..27: 0 branch, 1 compare, 2 set.
    pub fn group(&self) -> u8 {
        ((self.opcode >> 27) & 0x3) as u8
    }

    /// Sub-group within the command group, bits 26..24.
    pub fn sub_group(&self) -> u8 {
        ((self.opcode >> 24) & 0x7) as u8
    }

    /// Branch option, bits 19..16.
    pub fn branch_option(&self) -> u8 {
        ((self.opcode >> 16) & 0xF) as u8
    }

    pub fn kind(&self) -> NavKind {
        match (self.group(), self.sub_group(), self.branch_option()) {
            (0, 2, 0) => NavKind::PlayPl,
            (0, 2, 1) => NavKind::PlayPlAtMark,
            (0, 2, 2) => NavKind::PlayPlAtChapter,
            (0, 1, 1) => NavKind::JumpTitle,
            (2, _, _) => NavKind::SetRegister,
            _ => NavKind::Other,
        }
    }

    /// The playlist number this instruction plays, for the PlayPL family.
    pub fn playlist_number(&self) -> Option<u32> {
        match self.kind() {
            NavKind::PlayPl | NavKind::PlayPlAtMark | NavKind::PlayPlAtChapter => {
                Some(self.destination)
            }
            _ => None,
        }
    }
}

/// One navigation object of `MovieObject.bdmv`.
#[derive(Debug, Clone)]
pub struct MovieObject {
    pub id: u16,
    pub instructions: Vec<Instruction>,
    /// Zero-padded 5-digit stems of the playlists the object plays.
    pub referenced_playlists: Vec<String>,
}

/// A button navigation command recovered from an Interactive Composition
/// Segment of a menu stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgButtonAction {
    pub page_id: u8,
    pub button_id: u16,
    pub kind: NavKind,
    pub destination: u32,
    pub source: u32,
}

/// A title hint: which playlist a disc title resolves to through its
/// movie object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleHint {
    pub title_number: u16,
    pub playlist: String,
}

/// A group of playlists with equal loose signatures. The representative
/// carries the group in the analysis; the rest are duplicate variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupGroup {
    pub representative: String,
    pub alternates: Vec<String>,
}

/// One constituent segment of an inferred episode.
#[derive(Debug, Clone)]
pub struct EpisodeSegment {
    pub clip_id: String,
    pub in_time: TimeStamp,
    pub out_time: TimeStamp,
}

impl EpisodeSegment {
    pub fn duration_ticks(&self) -> u64 {
        (self.out_time.0 as u64).saturating_sub(self.in_time.0 as u64)
    }
}

/// An inferred episode.
#[derive(Debug, Clone)]
pub struct Episode {
    /// 1-based episode number in playback order.
    pub number: u32,
    /// The mpls file this episode is played from.
    pub playlist: String,
    pub duration_ticks: u64,
    /// Confidence in [0, 1] that this really is an episode at this position.
    pub confidence: f64,
    pub segments: Vec<EpisodeSegment>,
    /// Duplicate-variant playlists that play the same content.
    pub alternates: Vec<String>,
}

/// The strategy the episode inference settled on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceStrategy {
    Individual,
    PlayAllDecomposition,
    ChapterSplit,
    NoEpisodes,
}

/// Stable warning codes, usable for programmatic filtering.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    NoEpisodesFound,
    PlayAllOnly,
    LowConfidenceOrder,
    NoClpiFound,
    DuplicateVariants,
    MalformedSection,
    UnknownOpcode,
    IgScanTruncated,
}

impl WarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCode::NoEpisodesFound => "NO_EPISODES_FOUND",
            WarningCode::PlayAllOnly => "PLAY_ALL_ONLY",
            WarningCode::LowConfidenceOrder => "LOW_CONFIDENCE_ORDER",
            WarningCode::NoClpiFound => "NO_CLPI_FOUND",
            WarningCode::DuplicateVariants => "DUPLICATE_VARIANTS",
            WarningCode::MalformedSection => "MALFORMED_SECTION",
            WarningCode::UnknownOpcode => "UNKNOWN_OPCODE",
            WarningCode::IgScanTruncated => "IG_SCAN_TRUNCATED",
        }
    }
}

/// A non-fatal condition attached to the analysis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
    /// The file or stage the warning refers to.
    pub context: String,
}

/// The aggregate result of analyzing one disc backup.
///
/// Constructed once by [`analyze`] and read-only afterwards.
///
/// [`analyze`]: ../analysis/fn.analyze.html
#[derive(Debug, Clone)]
pub struct DiscAnalysis {
    pub path: String,
    pub playlists: Vec<Playlist>,
    pub clips: Vec<Clip>,
    pub index: Option<IndexTable>,
    pub movie_objects: Vec<MovieObject>,
    pub ig_actions: Vec<IgButtonAction>,
    /// Chapter mark numbers referenced by menu buttons, sorted, unique.
    pub ig_chapter_marks: Vec<u32>,
    pub title_hints: Vec<TitleHint>,
    pub dedup_groups: Vec<DedupGroup>,
    pub strategy: InferenceStrategy,
    pub episodes: Vec<Episode>,
    pub warnings: Vec<Warning>,
}

impl DiscAnalysis {
    pub fn playlist(&self, file_name: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.file_name == file_name)
    }
}
