//! Segment occurrence counting and play-all detection.
//!
//! A "play all" playlist concatenates the play items of the per-episode
//! playlists. Its loose signature therefore contains each episode's
//! signature as a contiguous run, give or take one segment that the
//! authoring dropped (usually a next-episode preview).

use crate::types::{Playlist, SegmentKey};
use std::collections::{BTreeMap, BTreeSet};

/// How many segments of the candidate may be missing from the superset
/// run before the match is rejected.
const NEAR_CONTIGUOUS_SLACK: usize = 1;

/// Counts how many playlists contain each segment key.
pub fn segment_frequencies(playlists: &[Playlist]) -> BTreeMap<SegmentKey, usize> {
    let mut freq: BTreeMap<SegmentKey, usize> = BTreeMap::new();
    for playlist in playlists {
        let keys: BTreeSet<SegmentKey> = playlist.signature_loose().into_iter().collect();
        for key in keys {
            *freq.entry(key).or_insert(0) += 1;
        }
    }
    freq
}

/// Maps each playlist to the episode candidates whose loose signatures
/// appear as (nearly) contiguous subsequences of it. Only playlists in
/// `candidates` are considered as covered episodes.
pub fn play_all_supersets(
    representatives: &[&Playlist],
    candidates: &BTreeSet<String>,
) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for superset in representatives {
        let super_sig = superset.signature_loose();
        let mut covered = Vec::new();
        for candidate in representatives {
            if candidate.file_name == superset.file_name
                || !candidates.contains(&candidate.file_name)
            {
                continue;
            }
            let cand_sig = candidate.signature_loose();
            if cand_sig.is_empty() || cand_sig.len() >= super_sig.len() {
                continue;
            }
            if contains_near_contiguous(&super_sig, &cand_sig) {
                covered.push(candidate.file_name.clone());
            }
        }
        if !covered.is_empty() {
            covered.sort();
            out.insert(superset.file_name.clone(), covered);
        }
    }
    out
}

/// Whether `needle` occurs inside `haystack` as a contiguous run, with
/// up to [`NEAR_CONTIGUOUS_SLACK`] needle segments absent from the run.
/// Needles of fewer than three segments must match exactly; with slack
/// they would degenerate to matching any shared opening.
fn contains_near_contiguous(haystack: &[SegmentKey], needle: &[SegmentKey]) -> bool {
    let slack = if needle.len() >= 3 {
        NEAR_CONTIGUOUS_SLACK
    } else {
        0
    };
    for start in 0..haystack.len() {
        let mut pos = start;
        let mut missing = 0usize;
        let mut matched = 0usize;
        for key in needle {
            if pos < haystack.len() && haystack[pos] == *key {
                pos += 1;
                matched += 1;
            } else {
                missing += 1;
                if missing > slack {
                    break;
                }
            }
        }
        if missing <= slack && matched >= 1 && matched + missing == needle.len() {
            return true;
        }
    }
    false
}
