//! Human-auditable rendering of an analysis.
//!
//! Pure rendering: every decision was already taken by the earlier
//! stages, and the output is deterministic for a given analysis.

use crate::types::{DiscAnalysis, PlaylistClass};
use std::fmt::Write;

/// Renders a plain-text account of the analysis.
pub fn explain(analysis: &DiscAnalysis) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "== summary ==");
    let _ = writeln!(out, "disc: {}", analysis.path);
    let _ = writeln!(
        out,
        "playlists: {}, clips: {}, titles: {}, movie objects: {}",
        analysis.playlists.len(),
        analysis.clips.len(),
        analysis
            .index
            .as_ref()
            .map_or(0, |index| index.titles.len()),
        analysis.movie_objects.len()
    );
    let _ = writeln!(out, "strategy: {}", strategy_name(analysis));
    let _ = writeln!(out, "episodes: {}", analysis.episodes.len());

    let _ = writeln!(out, "\n== playlists ==");
    for playlist in &analysis.playlists {
        let _ = writeln!(
            out,
            "{}  {}  {} item(s)  {}",
            playlist.file_name,
            format_duration(playlist.duration_ticks()),
            playlist.play_items.len(),
            playlist
                .classification
                .map_or("unclassified", class_name),
        );
    }

    let _ = writeln!(out, "\n== episodes ==");
    for episode in &analysis.episodes {
        let clips: Vec<&str> = episode
            .segments
            .iter()
            .map(|s| s.clip_id.as_str())
            .collect();
        let _ = writeln!(
            out,
            "{:>2}  {}  {}  confidence {:.2}  clips {}",
            episode.number,
            episode.playlist,
            format_duration(episode.duration_ticks),
            episode.confidence,
            clips.join("+"),
        );
        if !episode.alternates.is_empty() {
            let _ = writeln!(out, "    alternates: {}", episode.alternates.join(", "));
        }
    }

    let _ = writeln!(out, "\n== hints ==");
    for hint in &analysis.title_hints {
        let _ = writeln!(out, "title {:>2} -> {}", hint.title_number, hint.playlist);
    }
    if !analysis.ig_chapter_marks.is_empty() {
        let marks: Vec<String> = analysis
            .ig_chapter_marks
            .iter()
            .map(u32::to_string)
            .collect();
        let _ = writeln!(out, "menu chapter marks: {}", marks.join(" "));
    }

    let _ = writeln!(out, "\n== warnings ==");
    for warning in &analysis.warnings {
        let _ = writeln!(
            out,
            "{} [{}] {}",
            warning.code.as_str(),
            warning.context,
            warning.message
        );
    }

    out
}

fn strategy_name(analysis: &DiscAnalysis) -> &'static str {
    use crate::types::InferenceStrategy::*;
    match analysis.strategy {
        Individual => "individual playlists",
        PlayAllDecomposition => "play-all decomposition",
        ChapterSplit => "chapter split",
        NoEpisodes => "none",
    }
}

fn class_name(class: PlaylistClass) -> &'static str {
    match class {
        PlaylistClass::Episode => "episode",
        PlaylistClass::PlayAll => "play_all",
        PlaylistClass::Bumper => "bumper",
        PlaylistClass::CreditlessOp => "creditless_op",
        PlaylistClass::CreditlessEd => "creditless_ed",
        PlaylistClass::Extra => "extra",
        PlaylistClass::DuplicateVariant => "duplicate_variant",
    }
}

fn format_duration(ticks: u64) -> String {
    let seconds = ticks / 45_000;
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}
