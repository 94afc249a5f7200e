//! Segment labelling and playlist classification.
//!
//! Labels are statistical: a segment that opens most episode-length
//! playlists is an opening, one that closes them is an ending. The
//! playlist classification then reads those labels together with the
//! dedup groups and the play-all graph.

use super::cluster::DurationCluster;
use crate::types::{DedupGroup, Playlist, PlaylistClass, SegmentKey, SegmentLabel};
use std::collections::{BTreeMap, BTreeSet};

const LEGAL_MAX_MS: u64 = 8_000;
const OP_RANGE_MS: (u64, u64) = (60_000, 150_000);
const ED_RANGE_MS: (u64, u64) = (60_000, 180_000);
const PREVIEW_MAX_MS: u64 = 60_000;
const BODY_MIN_MS: u64 = 600_000;

const BUMPER_MAX_TICKS: u64 = 10 * 45_000;
const LONG_ITEM_TICKS: u64 = 10 * 60 * 45_000;
const PLAY_ALL_MIN_TICKS: u64 = 40 * 60 * 45_000;

#[derive(Default)]
struct KeyStats {
    /// Candidates containing the key.
    appears: usize,
    /// Candidates where the key is the very first segment.
    first: usize,
    /// Candidates where the key sits in the first two positions.
    prefix: usize,
    /// Candidates where the key sits in the last two positions.
    suffix: usize,
    /// Appearances directly after an ending-labelled segment.
    after_ed: usize,
}

/// Labels every segment key by frequency and position within the
/// episode-length candidates, then stamps the label onto every play
/// item of every playlist (candidates and extras alike, so a creditless
/// opening picks up the label of the opening it shares a clip with).
pub fn label_segments(
    playlists: &mut [Playlist],
    candidates: &BTreeSet<String>,
) -> BTreeMap<SegmentKey, SegmentLabel> {
    let mut stats: BTreeMap<SegmentKey, KeyStats> = BTreeMap::new();
    let mut n_candidates = 0usize;
    for playlist in playlists
        .iter()
        .filter(|p| candidates.contains(&p.file_name))
    {
        n_candidates += 1;
        let n = playlist.play_items.len();
        let mut seen: BTreeSet<SegmentKey> = BTreeSet::new();
        for (idx, item) in playlist.play_items.iter().enumerate() {
            let key = item.segment_key();
            let entry = stats.entry(key.clone()).or_default();
            if seen.insert(key) {
                entry.appears += 1;
                if idx == 0 {
                    entry.first += 1;
                }
                if idx <= 1 {
                    entry.prefix += 1;
                }
                if idx + 2 >= n {
                    entry.suffix += 1;
                }
            }
        }
    }

    let mut labels: BTreeMap<SegmentKey, SegmentLabel> = BTreeMap::new();
    if n_candidates > 0 {
        let frac = |count: usize| count as f64 / n_candidates as f64;
        for (key, s) in &stats {
            let dur = key.duration_ms();
            let label = if dur <= LEGAL_MAX_MS && frac(s.appears) >= 0.6 && s.first == s.appears {
                SegmentLabel::Legal
            } else if dur >= OP_RANGE_MS.0 && dur <= OP_RANGE_MS.1 && frac(s.prefix) >= 0.5 {
                SegmentLabel::Op
            } else if dur >= ED_RANGE_MS.0 && dur <= ED_RANGE_MS.1 && frac(s.suffix) >= 0.5 {
                SegmentLabel::Ed
            } else if dur >= BODY_MIN_MS {
                SegmentLabel::Body
            } else {
                SegmentLabel::Unknown
            };
            labels.insert(key.clone(), label);
        }

        // previews trail the ending; resolvable only once ED is known
        for playlist in playlists
            .iter()
            .filter(|p| candidates.contains(&p.file_name))
        {
            for idx in 1..playlist.play_items.len() {
                let prev_key = playlist.play_items[idx - 1].segment_key();
                let key = playlist.play_items[idx].segment_key();
                if labels.get(&prev_key) == Some(&SegmentLabel::Ed)
                    && labels.get(&key) == Some(&SegmentLabel::Unknown)
                    && key.duration_ms() <= PREVIEW_MAX_MS
                {
                    if let Some(s) = stats.get_mut(&key) {
                        s.after_ed += 1;
                    }
                }
            }
        }
        for (key, s) in &stats {
            if s.after_ed * 2 >= s.appears && s.after_ed > 0 {
                labels.insert(key.clone(), SegmentLabel::Preview);
            }
        }
    }

    for playlist in playlists.iter_mut() {
        for item in playlist.play_items.iter_mut() {
            let key = item.segment_key();
            item.label = Some(
                labels
                    .get(&key)
                    .copied()
                    .unwrap_or(SegmentLabel::Unknown),
            );
        }
    }
    labels
}

/// Classifies every playlist. Rules apply in order; the first match
/// wins.
pub fn classify_playlists(
    playlists: &mut [Playlist],
    groups: &[DedupGroup],
    supersets: &BTreeMap<String, Vec<String>>,
    cluster: Option<&DurationCluster>,
) {
    let alternates: BTreeSet<String> = groups
        .iter()
        .flat_map(|g| g.alternates.iter().cloned())
        .collect();
    let members: BTreeSet<String> = cluster
        .map(|c| c.members.iter().cloned().collect())
        .unwrap_or_default();

    for playlist in playlists.iter_mut() {
        let class = classify_one(playlist, &alternates, supersets, &members);
        playlist.classification = Some(class);
    }
}

fn classify_one(
    playlist: &Playlist,
    alternates: &BTreeSet<String>,
    supersets: &BTreeMap<String, Vec<String>>,
    members: &BTreeSet<String>,
) -> PlaylistClass {
    let name = &playlist.file_name;
    let duration = playlist.duration_ticks();

    if alternates.contains(name) {
        return PlaylistClass::DuplicateVariant;
    }

    let covered = supersets.get(name).map_or(0, Vec::len);
    let long_items = playlist
        .play_items
        .iter()
        .filter(|i| i.duration_ticks() >= LONG_ITEM_TICKS)
        .count();
    // a disc that ships only the concatenation has no per-episode
    // playlists for the graph to find, but the shape still gives it away
    if covered >= 2 || (long_items >= 2 && duration >= PLAY_ALL_MIN_TICKS) {
        return PlaylistClass::PlayAll;
    }

    if playlist.play_items.len() == 1 {
        let item = &playlist.play_items[0];
        let dur_ms = playlist.duration_ms();
        if duration <= BUMPER_MAX_TICKS {
            return PlaylistClass::Bumper;
        }
        match item.label {
            Some(SegmentLabel::Op)
                if dur_ms >= OP_RANGE_MS.0 && dur_ms <= OP_RANGE_MS.1 =>
            {
                return PlaylistClass::CreditlessOp;
            }
            Some(SegmentLabel::Ed)
                if dur_ms >= ED_RANGE_MS.0 && dur_ms <= ED_RANGE_MS.1 =>
            {
                return PlaylistClass::CreditlessEd;
            }
            _ => {}
        }
    }

    let has_body = playlist
        .play_items
        .iter()
        .any(|i| i.label == Some(SegmentLabel::Body));
    if members.contains(name) && has_body {
        return PlaylistClass::Episode;
    }

    PlaylistClass::Extra
}
