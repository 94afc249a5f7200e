//! Duration clustering.
//!
//! Episodes on one disc share a characteristic length. Histogramming
//! the representative playlists by duration finds that length without
//! assuming it beforehand; whatever lands in the dominant bucket is an
//! episode-length candidate for the classifier.

use crate::types::Playlist;
use std::collections::BTreeMap;

/// Playlists shorter than this are extras or menu loops, never episodes.
pub const SHORT_THRESHOLD_TICKS: u64 = 3 * 60 * 45_000;

const MIN_BUCKET_WIDTH_TICKS: u64 = 30 * 45_000;

/// The dominant episode-length cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationCluster {
    /// Member playlist file names, sorted.
    pub members: Vec<String>,
    pub mean_ticks: u64,
}

/// Buckets the representatives of at least short-threshold length by
/// duration and selects the dominant bucket. Bucket width is 30 seconds
/// or 5% of the median duration, whichever is larger.
pub fn episode_length_cluster(representatives: &[&Playlist]) -> Option<DurationCluster> {
    let mut durations: Vec<(u64, &str)> = representatives
        .iter()
        .map(|p| (p.duration_ticks(), p.file_name.as_str()))
        .filter(|(d, _)| *d >= SHORT_THRESHOLD_TICKS)
        .collect();
    if durations.is_empty() {
        return None;
    }
    durations.sort();

    let median = durations[durations.len() / 2].0;
    let width = MIN_BUCKET_WIDTH_TICKS.max(median / 20);

    let mut buckets: BTreeMap<u64, Vec<(u64, &str)>> = BTreeMap::new();
    for (duration, name) in durations {
        buckets.entry(duration / width).or_default().push((duration, name));
    }

    // dominant bucket: most members, then larger total duration, then
    // the lower bucket index for a stable pick
    let (_, members) = buckets.into_iter().max_by(|(ia, a), (ib, b)| {
        a.len()
            .cmp(&b.len())
            .then_with(|| {
                let sum_a: u64 = a.iter().map(|(d, _)| d).sum();
                let sum_b: u64 = b.iter().map(|(d, _)| d).sum();
                sum_a.cmp(&sum_b)
            })
            .then(ib.cmp(ia))
    })?;

    let mean_ticks = members.iter().map(|(d, _)| d).sum::<u64>() / members.len() as u64;
    let mut names: Vec<String> = members.iter().map(|(_, n)| (*n).to_owned()).collect();
    names.sort();
    Some(DurationCluster {
        members: names,
        mean_ticks,
    })
}
