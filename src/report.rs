//! The serializable `bdpl.disc.v1` result schema.
//!
//! The core hands this structure, fully formed, to whatever encoder the
//! caller prefers; the structs only derive `Serialize`. All times are
//! milliseconds (ticks divided by 45), as doubles.

use crate::types::{
    DiscAnalysis, InferenceStrategy, MarkType, PlaylistClass, SegmentLabel, WarningCode,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: &str = "bdpl.disc.v1";

fn ms(ticks: u64) -> f64 {
    ticks as f64 / 45.0
}

#[derive(Debug, Serialize)]
pub struct DiscReport {
    pub schema_version: &'static str,
    pub disc: DiscMeta,
    pub playlists: Vec<PlaylistReport>,
    pub clips: Vec<ClipReport>,
    pub episodes: Vec<EpisodeReport>,
    pub warnings: Vec<WarningReport>,
    pub analysis: AnalysisReport,
}

#[derive(Debug, Serialize)]
pub struct DiscMeta {
    pub path: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PlaylistReport {
    pub mpls: String,
    pub duration_ms: f64,
    pub play_items: Vec<PlayItemReport>,
    pub chapters: Vec<ChapterReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<PlaylistClass>,
    pub signature_loose: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PlayItemReport {
    pub clip_id: String,
    pub m2ts: String,
    pub in_time_ms: f64,
    pub out_time_ms: f64,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<SegmentLabel>,
    pub streams: Vec<StreamReport>,
}

#[derive(Debug, Serialize)]
pub struct StreamReport {
    pub pid: u16,
    pub codec: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChapterReport {
    pub mark_id: u16,
    pub mark_type: MarkType,
    pub timestamp: f64,
}

#[derive(Debug, Serialize)]
pub struct ClipReport {
    pub clip_id: String,
    pub streams: Vec<StreamReport>,
}

#[derive(Debug, Serialize)]
pub struct EpisodeReport {
    pub episode: u32,
    pub playlist: String,
    pub duration_ms: f64,
    pub confidence: f64,
    pub segments: Vec<SegmentReport>,
    pub alternates: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SegmentReport {
    pub clip_id: String,
    pub in_time_ms: f64,
    pub out_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct WarningReport {
    pub code: WarningCode,
    pub message: String,
    pub context: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub strategy: InferenceStrategy,
    pub classifications: BTreeMap<String, PlaylistClass>,
    pub hints: HintsReport,
}

#[derive(Debug, Serialize)]
pub struct HintsReport {
    pub titles: Vec<TitleHintReport>,
    pub ig_chapter_marks: Vec<u32>,
}

#[derive(Debug, Serialize)]
pub struct TitleHintReport {
    pub title: u16,
    pub playlist: String,
}

/// Projects an analysis into the stable output schema. `generated_at`
/// is supplied by the caller so the projection itself stays
/// deterministic.
pub fn build_report(analysis: &DiscAnalysis, generated_at: DateTime<Utc>) -> DiscReport {
    let playlists = analysis
        .playlists
        .iter()
        .map(|p| PlaylistReport {
            mpls: p.file_name.clone(),
            duration_ms: ms(p.duration_ticks()),
            play_items: p
                .play_items
                .iter()
                .map(|i| PlayItemReport {
                    clip_id: i.clip_id.clone(),
                    m2ts: i.m2ts_file_name(),
                    in_time_ms: ms(i.in_time.0 as u64),
                    out_time_ms: ms(i.out_time.0 as u64),
                    duration_ms: ms(i.duration_ticks()),
                    label: i.label,
                    streams: i
                        .streams
                        .iter()
                        .map(|s| StreamReport {
                            pid: s.pid,
                            codec: s.codec.name(),
                            lang: s.language.clone(),
                        })
                        .collect(),
                })
                .collect(),
            chapters: p
                .chapters
                .iter()
                .map(|c| ChapterReport {
                    mark_id: c.id,
                    mark_type: c.mark_type,
                    timestamp: ms(c.time_stamp.0 as u64),
                })
                .collect(),
            classification: p.classification,
            signature_loose: p
                .signature_loose()
                .iter()
                .map(|k| format!("{}:{}:{}", k.clip_id, k.in_ms, k.out_ms))
                .collect(),
        })
        .collect();

    let clips = analysis
        .clips
        .iter()
        .map(|c| ClipReport {
            clip_id: c.clip_id.clone(),
            streams: c
                .streams
                .iter()
                .map(|s| StreamReport {
                    pid: s.pid,
                    codec: s.codec.name(),
                    lang: s.language.clone(),
                })
                .collect(),
        })
        .collect();

    let episodes = analysis
        .episodes
        .iter()
        .map(|e| EpisodeReport {
            episode: e.number,
            playlist: e.playlist.clone(),
            duration_ms: ms(e.duration_ticks),
            confidence: e.confidence,
            segments: e
                .segments
                .iter()
                .map(|s| SegmentReport {
                    clip_id: s.clip_id.clone(),
                    in_time_ms: ms(s.in_time.0 as u64),
                    out_time_ms: ms(s.out_time.0 as u64),
                })
                .collect(),
            alternates: e.alternates.clone(),
        })
        .collect();

    let warnings = analysis
        .warnings
        .iter()
        .map(|w| WarningReport {
            code: w.code,
            message: w.message.clone(),
            context: w.context.clone(),
        })
        .collect();

    let classifications = analysis
        .playlists
        .iter()
        .filter_map(|p| p.classification.map(|c| (p.file_name.clone(), c)))
        .collect();

    DiscReport {
        schema_version: SCHEMA_VERSION,
        disc: DiscMeta {
            path: analysis.path.clone(),
            generated_at,
        },
        playlists,
        clips,
        episodes,
        warnings,
        analysis: AnalysisReport {
            strategy: analysis.strategy,
            classifications,
            hints: HintsReport {
                titles: analysis
                    .title_hints
                    .iter()
                    .map(|h| TitleHintReport {
                        title: h.title_number,
                        playlist: h.playlist.clone(),
                    })
                    .collect(),
                ig_chapter_marks: analysis.ig_chapter_marks.clone(),
            },
        },
    }
}
