//! Playlist signatures and near-duplicate grouping.
//!
//! Discs frequently author the same program twice, differing only in
//! which audio or subtitle streams are exposed. Such variants share a
//! loose signature (the ordered segment keys of their play items) and
//! are collapsed into one group before any counting happens, so a
//! duplicate does not double-weigh its segments in the statistics.

use crate::types::{DedupGroup, Playlist, SegmentKey};
use std::collections::BTreeMap;

/// Groups playlists by equal loose signature.
///
/// Within a group the representative is chosen by, in order: more audio
/// streams, more subtitle streams, presence of chapters, and finally
/// the lower file name. Output groups are sorted by representative.
pub fn dedup_playlists(playlists: &[Playlist]) -> Vec<DedupGroup> {
    let mut by_signature: BTreeMap<Vec<SegmentKey>, Vec<&Playlist>> = BTreeMap::new();
    for playlist in playlists {
        by_signature
            .entry(playlist.signature_loose())
            .or_default()
            .push(playlist);
    }

    let mut groups: Vec<DedupGroup> = by_signature
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_by(|a, b| {
                b.audio_stream_count()
                    .cmp(&a.audio_stream_count())
                    .then(b.subtitle_stream_count().cmp(&a.subtitle_stream_count()))
                    .then(a.chapters.is_empty().cmp(&b.chapters.is_empty()))
                    .then(a.file_name.cmp(&b.file_name))
            });
            DedupGroup {
                representative: members[0].file_name.clone(),
                alternates: members[1..].iter().map(|p| p.file_name.clone()).collect(),
            }
        })
        .collect();
    groups.sort_by(|a, b| a.representative.cmp(&b.representative));
    groups
}

/// The representative playlists, in file name order.
pub fn representatives<'a>(
    playlists: &'a [Playlist],
    groups: &[DedupGroup],
) -> Vec<&'a Playlist> {
    groups
        .iter()
        .filter_map(|g| playlists.iter().find(|p| p.file_name == g.representative))
        .collect()
}
