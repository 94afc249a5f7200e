//! Episode inference.
//!
//! Three strategies, tried in order of reliability: per-episode
//! playlists, decomposing a play-all concatenation, and splitting a
//! single long playlist at its chapter marks. Navigation hints from the
//! index table and the menu streams raise confidence but never decide
//! structure on their own.

use crate::types::{
    DedupGroup, Episode, EpisodeSegment, InferenceStrategy, MarkType, PlayItem, Playlist,
    PlaylistClass, SegmentLabel, TimeStamp, TitleHint, Warning, WarningCode,
};
use std::collections::BTreeSet;

const LONG_ITEM_TICKS: u64 = 10 * 60 * 45_000;
const LONG_PLAYLIST_TICKS: u64 = 40 * 60 * 45_000;
const DEFAULT_TARGET_TICKS: u64 = 22 * 60 * 45_000;
/// A chapter piece may close once it reaches this fraction of the
/// target episode length.
const TARGET_LOWER_FRACTION: f64 = 0.8;

const BASE_CONFIDENCE_INDIVIDUAL: f64 = 0.9;
const BASE_CONFIDENCE_PLAY_ALL: f64 = 0.7;
const BASE_CONFIDENCE_CHAPTER_SPLIT: f64 = 0.6;
const HINT_BOOST: f64 = 0.1;

/// Navigation hints feeding the inference.
#[derive(Debug, Default, Clone)]
pub struct Hints {
    pub titles: Vec<TitleHint>,
    pub ig_chapter_marks: Vec<u32>,
}

impl Hints {
    fn hinted_playlists(&self) -> BTreeSet<&str> {
        self.titles.iter().map(|t| t.playlist.as_str()).collect()
    }
}

/// The outcome of the inference stage.
#[derive(Debug)]
pub struct Inference {
    pub strategy: InferenceStrategy,
    pub episodes: Vec<Episode>,
    pub warnings: Vec<Warning>,
}

pub fn infer(playlists: &[Playlist], groups: &[DedupGroup], hints: &Hints) -> Inference {
    let episode_lists: Vec<&Playlist> = playlists
        .iter()
        .filter(|p| p.classification == Some(PlaylistClass::Episode))
        .collect();
    if episode_lists.len() >= 2 {
        return individual(episode_lists, groups, hints);
    }

    let play_all = playlists
        .iter()
        .filter(|p| p.classification == Some(PlaylistClass::PlayAll))
        .min_by(|a, b| a.file_name.cmp(&b.file_name));
    if let Some(play_all) = play_all {
        return decompose_play_all(play_all, hints);
    }

    let long: Vec<&Playlist> = playlists
        .iter()
        .filter(|p| p.duration_ticks() >= LONG_PLAYLIST_TICKS && entry_marks(p).len() >= 2)
        .collect();
    if long.len() == 1 {
        return chapter_split(long[0], hints);
    }

    Inference {
        strategy: InferenceStrategy::NoEpisodes,
        episodes: Vec::new(),
        warnings: vec![Warning {
            code: WarningCode::NoEpisodesFound,
            message: "no playlist structure could be mapped to episodes".to_owned(),
            context: "analysis".to_owned(),
        }],
    }
}

fn to_segment(item: &PlayItem) -> EpisodeSegment {
    EpisodeSegment {
        clip_id: item.clip_id.clone(),
        in_time: item.in_time,
        out_time: item.out_time,
    }
}

fn capped(confidence: f64) -> f64 {
    confidence.min(1.0)
}

fn first_body_clip(playlist: &Playlist) -> String {
    playlist
        .play_items
        .iter()
        .find(|i| i.label == Some(SegmentLabel::Body))
        .map(|i| i.clip_id.clone())
        .unwrap_or_default()
}

fn individual(
    mut episode_lists: Vec<&Playlist>,
    groups: &[DedupGroup],
    hints: &Hints,
) -> Inference {
    episode_lists.sort_by(|a, b| {
        first_body_clip(a)
            .cmp(&first_body_clip(b))
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
    let hinted = hints.hinted_playlists();

    let episodes = episode_lists
        .iter()
        .enumerate()
        .map(|(i, playlist)| {
            let mut confidence = BASE_CONFIDENCE_INDIVIDUAL;
            if hinted.contains(playlist.file_name.as_str()) {
                confidence += HINT_BOOST;
            }
            let alternates = groups
                .iter()
                .find(|g| g.representative == playlist.file_name)
                .map(|g| g.alternates.clone())
                .unwrap_or_default();
            Episode {
                number: (i + 1) as u32,
                playlist: playlist.file_name.clone(),
                duration_ticks: playlist.duration_ticks(),
                confidence: capped(confidence),
                segments: playlist.play_items.iter().map(to_segment).collect(),
                alternates,
            }
        })
        .collect();

    Inference {
        strategy: InferenceStrategy::Individual,
        episodes,
        warnings: Vec::new(),
    }
}

fn decompose_play_all(play_all: &Playlist, hints: &Hints) -> Inference {
    let hinted = hints.hinted_playlists();
    let mut confidence = BASE_CONFIDENCE_PLAY_ALL;
    if hinted.contains(play_all.file_name.as_str()) {
        confidence += HINT_BOOST;
    }

    let episodes: Vec<Episode> = play_all
        .play_items
        .iter()
        .filter(|i| i.duration_ticks() >= LONG_ITEM_TICKS)
        .enumerate()
        .map(|(i, item)| Episode {
            number: (i + 1) as u32,
            playlist: play_all.file_name.clone(),
            duration_ticks: item.duration_ticks(),
            confidence: capped(confidence),
            segments: vec![to_segment(item)],
            alternates: Vec::new(),
        })
        .collect();

    let warning = Warning {
        code: WarningCode::PlayAllOnly,
        message: format!(
            "only the play-all concatenation is on the disc; split into {} episodes",
            episodes.len()
        ),
        context: play_all.file_name.clone(),
    };
    Inference {
        strategy: InferenceStrategy::PlayAllDecomposition,
        episodes,
        warnings: vec![warning],
    }
}

fn entry_marks(playlist: &Playlist) -> Vec<(u16, u64)> {
    let mut timeline_start = 0u64;
    let mut item_starts = Vec::with_capacity(playlist.play_items.len());
    for item in &playlist.play_items {
        item_starts.push(timeline_start);
        timeline_start += item.duration_ticks();
    }
    let mut marks: Vec<(u16, u64)> = playlist
        .chapters
        .iter()
        .filter(|c| c.mark_type == MarkType::EntryPoint)
        .filter_map(|c| {
            let item = playlist.play_items.get(c.play_item as usize)?;
            let offset = (c.time_stamp.0 as u64).checked_sub(item.in_time.0 as u64)?;
            Some((c.id, item_starts[c.play_item as usize] + offset))
        })
        .collect();
    marks.sort_by_key(|(_, at)| *at);
    marks
}

/// Splits one long playlist at its chapter marks, merging adjacent
/// chapters until every piece approaches the target episode length. The
/// target comes from the spacing of menu-referenced chapter marks when
/// the menus were scanned, and defaults to 22 minutes otherwise.
fn chapter_split(playlist: &Playlist, hints: &Hints) -> Inference {
    let marks = entry_marks(playlist);
    let total = playlist.duration_ticks();

    // menu-referenced marks, as positions on the playlist timeline
    let ig_positions: Vec<u64> = hints
        .ig_chapter_marks
        .iter()
        .filter_map(|n| {
            marks
                .iter()
                .find(|(id, _)| *id as u32 == *n)
                .map(|(_, at)| *at)
        })
        .collect();
    let target = ig_target(&ig_positions).unwrap_or(DEFAULT_TARGET_TICKS);
    let close_at = (target as f64 * TARGET_LOWER_FRACTION) as u64;

    // piece boundaries: playlist start, mark positions, playlist end
    let mut boundaries: Vec<u64> = vec![0];
    boundaries.extend(marks.iter().map(|(_, at)| *at).filter(|at| *at > 0 && *at < total));
    boundaries.dedup();
    boundaries.push(total);

    let mut pieces: Vec<(u64, u64)> = Vec::new();
    let mut piece_start = 0u64;
    for window in boundaries.windows(2) {
        let end = window[1];
        if end - piece_start >= close_at {
            pieces.push((piece_start, end));
            piece_start = end;
        }
    }
    if piece_start < total {
        // leftover shorter than a plausible episode joins the last piece
        match pieces.last_mut() {
            Some(last) => last.1 = total,
            None => pieces.push((piece_start, total)),
        }
    }

    let hinted = hints.hinted_playlists();
    let mut confidence = BASE_CONFIDENCE_CHAPTER_SPLIT;
    if hinted.contains(playlist.file_name.as_str()) {
        confidence += HINT_BOOST;
    }
    if !ig_positions.is_empty() && splits_match_marks(&pieces, &marks, &hints.ig_chapter_marks) {
        confidence += HINT_BOOST;
    }

    let episodes = pieces
        .iter()
        .enumerate()
        .map(|(i, (start, end))| Episode {
            number: (i + 1) as u32,
            playlist: playlist.file_name.clone(),
            duration_ticks: end - start,
            confidence: capped(confidence),
            segments: piece_segments(playlist, *start, *end),
            alternates: Vec::new(),
        })
        .collect();

    Inference {
        strategy: InferenceStrategy::ChapterSplit,
        episodes,
        warnings: Vec::new(),
    }
}

/// The median spacing of the menu-referenced chapter marks, when at
/// least two of them resolved to positions.
fn ig_target(positions: &[u64]) -> Option<u64> {
    if positions.len() < 2 {
        return None;
    }
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    let mut spacings: Vec<u64> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
    spacings.sort_unstable();
    let median = spacings[spacings.len() / 2];
    if median == 0 {
        None
    } else {
        Some(median)
    }
}

/// Every piece must start within one chapter index of a menu-referenced
/// mark for the menu to corroborate the split.
fn splits_match_marks(pieces: &[(u64, u64)], marks: &[(u16, u64)], ig_marks: &[u32]) -> bool {
    pieces.iter().all(|(start, _)| {
        let mark_index = marks.iter().position(|(_, at)| at == start);
        let mark_index = match (mark_index, *start) {
            (Some(i), _) => i,
            // the playlist start is an implicit boundary even when no
            // mark sits at position zero
            (None, 0) => 0,
            (None, _) => return false,
        };
        ig_marks
            .iter()
            .any(|ig| (*ig as i64 - mark_index as i64).abs() <= 1)
    })
}

/// Maps an absolute timeline range back onto the playlist's items.
fn piece_segments(playlist: &Playlist, start: u64, end: u64) -> Vec<EpisodeSegment> {
    let mut segments = Vec::new();
    let mut item_start = 0u64;
    for item in &playlist.play_items {
        let item_end = item_start + item.duration_ticks();
        let overlap_start = start.max(item_start);
        let overlap_end = end.min(item_end);
        if overlap_start < overlap_end {
            segments.push(EpisodeSegment {
                clip_id: item.clip_id.clone(),
                in_time: TimeStamp(item.in_time.0 + (overlap_start - item_start) as u32),
                out_time: TimeStamp(item.in_time.0 + (overlap_end - item_start) as u32),
            });
        }
        item_start = item_end;
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chapter;

    fn item(clip: &str, seconds: u64) -> PlayItem {
        PlayItem {
            clip_id: clip.to_owned(),
            codec_id: "M2TS".to_owned(),
            in_time: TimeStamp(0),
            out_time: TimeStamp((seconds * 45_000) as u32),
            streams: Vec::new(),
            label: None,
        }
    }

    fn long_playlist_with_marks(mark_minutes: &[u64]) -> Playlist {
        let total_minutes = 110;
        let chapters = mark_minutes
            .iter()
            .enumerate()
            .map(|(id, m)| Chapter {
                id: id as u16,
                mark_type: MarkType::EntryPoint,
                play_item: 0,
                time_stamp: TimeStamp((m * 60 * 45_000) as u32),
            })
            .collect();
        Playlist {
            file_name: "00001.mpls".to_owned(),
            version: "0200".to_owned(),
            play_items: vec![item("00001", total_minutes * 60)],
            chapters,
            classification: Some(PlaylistClass::Extra),
        }
    }

    #[test]
    fn chapter_split_produces_target_sized_pieces() {
        let playlist = long_playlist_with_marks(&[0, 7, 22, 29, 44, 51, 66, 73, 88, 95, 103, 108]);
        let inference = infer(&[playlist], &[], &Hints::default());
        assert_eq!(inference.strategy, InferenceStrategy::ChapterSplit);
        assert_eq!(inference.episodes.len(), 5);
        for episode in &inference.episodes {
            let minutes = episode.duration_ticks / (60 * 45_000);
            assert!((18..=27).contains(&minutes), "piece of {} minutes", minutes);
            assert!((episode.confidence - 0.6).abs() < 1e-9);
        }
        assert_eq!(inference.episodes[0].number, 1);
        assert_eq!(inference.episodes[4].number, 5);
    }

    #[test]
    fn ig_marks_raise_chapter_split_confidence() {
        let playlist = long_playlist_with_marks(&[0, 7, 22, 29, 44, 51, 66, 73, 88, 95, 103, 108]);
        let hints = Hints {
            titles: Vec::new(),
            ig_chapter_marks: vec![0, 2, 4, 6, 8],
        };
        let inference = infer(&[playlist], &[], &hints);
        assert_eq!(inference.strategy, InferenceStrategy::ChapterSplit);
        assert_eq!(inference.episodes.len(), 5);
        for episode in &inference.episodes {
            assert!((episode.confidence - 0.7).abs() < 1e-9);
        }
    }

    #[test]
    fn nothing_to_infer_warns() {
        let playlist = Playlist {
            file_name: "00001.mpls".to_owned(),
            version: "0200".to_owned(),
            play_items: vec![item("00001", 30)],
            chapters: Vec::new(),
            classification: Some(PlaylistClass::Extra),
        };
        let inference = infer(&[playlist], &[], &Hints::default());
        assert_eq!(inference.strategy, InferenceStrategy::NoEpisodes);
        assert!(inference.episodes.is_empty());
        assert_eq!(inference.warnings[0].code, WarningCode::NoEpisodesFound);
    }
}
