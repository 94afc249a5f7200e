//! The analysis pipeline.
//!
//! Data flows strictly forward: parsers build the model, signatures
//! collapse duplicate playlists, duration clustering and the segment
//! graph feed the classifier, and the episode inference reads all of it
//! plus the navigation hints. Every stage is a pure function of its
//! predecessors' outputs; [`analyze`] just runs them in order and
//! collects the result.
//!
//! [`analyze`]: fn.analyze.html

pub mod classify;
pub mod cluster;
pub mod episodes;
pub mod explain;
pub mod graph;
pub mod signature;

pub use episodes::Hints;

use crate::error::ParseError;
use crate::parser;
use crate::types::{
    Clip, DiscAnalysis, IgButtonAction, IndexTable, MovieObject, Playlist, TitleHint, Warning,
    WarningCode,
};
use std::collections::BTreeSet;

/// One input file, read up-front by the caller.
#[derive(Debug, Clone)]
pub struct NamedBuffer {
    pub name: String,
    pub data: Vec<u8>,
}

/// All the bytes one disc analysis works from. The core never touches
/// the file system; [`load_disc`] fills this in for callers that want
/// the usual `BDMV/` layout read for them.
///
/// [`load_disc`]: ../disc/fn.load_disc.html
#[derive(Debug, Clone, Default)]
pub struct DiscInput {
    pub path: String,
    pub playlists: Vec<NamedBuffer>,
    pub clip_infos: Vec<NamedBuffer>,
    pub index: Option<Vec<u8>>,
    pub movie_object: Option<Vec<u8>>,
    /// Candidate menu streams for the experimental IG scan; attached
    /// explicitly because stream files are large and usually not needed.
    pub menu_streams: Vec<NamedBuffer>,
}

impl DiscInput {
    pub fn new(path: impl Into<String>) -> DiscInput {
        DiscInput {
            path: path.into(),
            ..DiscInput::default()
        }
    }

    pub fn add_playlist(&mut self, name: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.playlists.push(NamedBuffer {
            name: name.into(),
            data,
        });
        self
    }

    pub fn add_clip_info(&mut self, name: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.clip_infos.push(NamedBuffer {
            name: name.into(),
            data,
        });
        self
    }

    pub fn add_menu_stream(&mut self, name: impl Into<String>, data: Vec<u8>) -> &mut Self {
        self.menu_streams.push(NamedBuffer {
            name: name.into(),
            data,
        });
        self
    }
}

/// Runs the whole pipeline over the given buffers.
///
/// Never fails: file-level parse errors become warnings on the result,
/// and a disc with no readable playlists comes back as an empty
/// analysis carrying `NO_EPISODES_FOUND`.
pub fn analyze(input: &DiscInput) -> DiscAnalysis {
    let mut warnings: Vec<Warning> = Vec::new();

    let mut playlists = parse_playlists(input, &mut warnings);
    let clips = parse_clip_infos(input, &mut warnings);
    let index = parse_index(input, &mut warnings);
    let movie_objects = parse_movie_objects(input, &mut warnings);
    let (ig_actions, ig_chapter_marks) = scan_menus(input, &mut warnings);

    if playlists.is_empty() {
        warnings.push(Warning {
            code: WarningCode::NoEpisodesFound,
            message: "no readable playlists in PLAYLIST/".to_owned(),
            context: "scan".to_owned(),
        });
        return DiscAnalysis {
            path: input.path.clone(),
            playlists,
            clips,
            index,
            movie_objects,
            ig_actions,
            ig_chapter_marks,
            title_hints: Vec::new(),
            dedup_groups: Vec::new(),
            strategy: crate::types::InferenceStrategy::NoEpisodes,
            episodes: Vec::new(),
            warnings,
        };
    }

    if clips.is_empty() {
        warnings.push(Warning {
            code: WarningCode::NoClpiFound,
            message: "no readable clip information files in CLIPINF/".to_owned(),
            context: "scan".to_owned(),
        });
    }

    let groups = signature::dedup_playlists(&playlists);
    if groups.iter().any(|g| !g.alternates.is_empty()) {
        let dupes: Vec<String> = groups
            .iter()
            .filter(|g| !g.alternates.is_empty())
            .map(|g| format!("{} ~ {}", g.representative, g.alternates.join(", ")))
            .collect();
        warnings.push(Warning {
            code: WarningCode::DuplicateVariants,
            message: format!("near-duplicate playlists: {}", dupes.join("; ")),
            context: "dedup".to_owned(),
        });
    }

    let representatives = signature::representatives(&playlists, &groups);
    let duration_cluster = cluster::episode_length_cluster(&representatives);
    let candidates: BTreeSet<String> = duration_cluster
        .as_ref()
        .map(|c| c.members.iter().cloned().collect())
        .unwrap_or_default();
    let supersets = graph::play_all_supersets(&representatives, &candidates);

    classify::label_segments(&mut playlists, &candidates);
    classify::classify_playlists(
        &mut playlists,
        &groups,
        &supersets,
        duration_cluster.as_ref(),
    );

    let title_hints = resolve_title_hints(&index, &movie_objects, &playlists);
    let hints = Hints {
        titles: title_hints.clone(),
        ig_chapter_marks: ig_chapter_marks.clone(),
    };

    let inference = episodes::infer(&playlists, &groups, &hints);
    warnings.extend(inference.warnings);
    if !inference.episodes.is_empty()
        && inference
            .episodes
            .iter()
            .all(|e| e.confidence <= 0.6 + 1e-9)
    {
        warnings.push(Warning {
            code: WarningCode::LowConfidenceOrder,
            message: "episode order is inferred with low confidence".to_owned(),
            context: "analysis".to_owned(),
        });
    }

    DiscAnalysis {
        path: input.path.clone(),
        playlists,
        clips,
        index,
        movie_objects,
        ig_actions,
        ig_chapter_marks,
        title_hints,
        dedup_groups: groups,
        strategy: inference.strategy,
        episodes: inference.episodes,
        warnings,
    }
}

fn push_parse_warnings(
    warnings: &mut Vec<Warning>,
    file: &str,
    parsed: Vec<crate::error::ParseWarning>,
) {
    for w in parsed {
        warnings.push(Warning {
            code: w.code,
            message: w.message,
            context: file.to_owned(),
        });
    }
}

fn push_parse_error(warnings: &mut Vec<Warning>, file: &str, error: &ParseError) {
    warnings.push(Warning {
        code: WarningCode::MalformedSection,
        message: error.to_string(),
        context: file.to_owned(),
    });
}

fn sorted<'a>(buffers: &'a [NamedBuffer]) -> Vec<&'a NamedBuffer> {
    let mut out: Vec<&NamedBuffer> = buffers.iter().collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

fn parse_playlists(input: &DiscInput, warnings: &mut Vec<Warning>) -> Vec<Playlist> {
    let mut playlists = Vec::new();
    for buffer in sorted(&input.playlists) {
        match parser::mpls::parse(&buffer.name, &buffer.data) {
            Ok((playlist, parse_warnings)) => {
                push_parse_warnings(warnings, &buffer.name, parse_warnings);
                playlists.push(playlist);
            }
            Err(e) => push_parse_error(warnings, &buffer.name, &e),
        }
    }
    playlists
}

fn parse_clip_infos(input: &DiscInput, warnings: &mut Vec<Warning>) -> Vec<Clip> {
    let mut clips = Vec::new();
    for buffer in sorted(&input.clip_infos) {
        match parser::clpi::parse(&buffer.name, &buffer.data) {
            Ok((clip, parse_warnings)) => {
                push_parse_warnings(warnings, &buffer.name, parse_warnings);
                clips.push(clip);
            }
            Err(e) => push_parse_error(warnings, &buffer.name, &e),
        }
    }
    clips
}

fn parse_index(input: &DiscInput, warnings: &mut Vec<Warning>) -> Option<IndexTable> {
    let data = input.index.as_ref()?;
    match parser::index::parse(data) {
        Ok((table, parse_warnings)) => {
            push_parse_warnings(warnings, "index.bdmv", parse_warnings);
            Some(table)
        }
        Err(e) => {
            push_parse_error(warnings, "index.bdmv", &e);
            None
        }
    }
}

fn parse_movie_objects(input: &DiscInput, warnings: &mut Vec<Warning>) -> Vec<MovieObject> {
    let data = match input.movie_object.as_ref() {
        Some(data) => data,
        None => return Vec::new(),
    };
    match parser::mobj::parse(data) {
        Ok((objects, parse_warnings)) => {
            push_parse_warnings(warnings, "MovieObject.bdmv", parse_warnings);
            objects
        }
        Err(e) => {
            push_parse_error(warnings, "MovieObject.bdmv", &e);
            Vec::new()
        }
    }
}

fn scan_menus(input: &DiscInput, warnings: &mut Vec<Warning>) -> (Vec<IgButtonAction>, Vec<u32>) {
    let mut actions = Vec::new();
    let mut marks = Vec::new();
    for buffer in sorted(&input.menu_streams) {
        let (scan, parse_warnings) = parser::igs::scan(&buffer.data);
        push_parse_warnings(warnings, &buffer.name, parse_warnings);
        actions.extend(scan.actions);
        marks.extend(scan.chapter_marks);
    }
    marks.sort_unstable();
    marks.dedup();
    (actions, marks)
}

/// Joins the index table to the movie objects: every playlist a title's
/// movie object starts becomes a title hint, provided the playlist is
/// actually on the disc.
fn resolve_title_hints(
    index: &Option<IndexTable>,
    movie_objects: &[MovieObject],
    playlists: &[Playlist],
) -> Vec<TitleHint> {
    let index = match index {
        Some(index) => index,
        None => return Vec::new(),
    };
    let known: BTreeSet<&str> = playlists.iter().map(|p| p.file_name.as_str()).collect();
    let mut hints = Vec::new();
    for title in &index.titles {
        let object = movie_objects
            .iter()
            .find(|o| o.id == title.movie_object_id);
        if let Some(object) = object {
            for stem in &object.referenced_playlists {
                let file_name = format!("{}.mpls", stem);
                if known.contains(file_name.as_str()) {
                    let hint = TitleHint {
                        title_number: title.title_number,
                        playlist: file_name,
                    };
                    if !hints.contains(&hint) {
                        hints.push(hint);
                    }
                }
            }
        }
    }
    hints
}
