mod common;

use bdpl::parser::{clpi, index, mobj, mpls};
use bdpl::types::{Codec, MarkType, WarningCode};
use common::*;

#[test]
fn complete_playlist() {
    let data = MplsFixture::new()
        .item(MplsItem::new("00055", 120))
        .item(MplsItem::new("00059", 1440))
        .item(MplsItem::new("00061", 90))
        .build();

    let (playlist, warnings) = mpls::parse("00800.mpls", &data).unwrap();
    assert!(warnings.is_empty(), "warnings: {:?}", warnings);
    assert_eq!(playlist.file_name, "00800.mpls");
    assert_eq!(playlist.version, "0200");

    let segments: Vec<&str> = playlist
        .play_items
        .iter()
        .map(|i| i.clip_id.as_str())
        .collect();
    assert_eq!(segments, &["00055", "00059", "00061"]);
    assert_eq!(playlist.play_items[0].m2ts_file_name(), "00055.m2ts");
}

#[test]
fn playlist_duration_is_item_sum() {
    let data = MplsFixture::new()
        .item(MplsItem::new("00001", 90))
        .item(MplsItem::new("00007", 1440))
        .build();

    let (playlist, _) = mpls::parse("00001.mpls", &data).unwrap();
    let item_sum: u64 = playlist
        .play_items
        .iter()
        .map(|i| i.duration_ticks())
        .sum();
    assert_eq!(playlist.duration_ticks(), item_sum);
    assert_eq!(playlist.duration_ticks(), (90 + 1440) * 45_000);
}

#[test]
fn playlist_streams_and_marks() {
    let data = MplsFixture::new()
        .item(MplsItem::new("00055", 1440).streams(2, 1))
        .mark(0, 0)
        .mark(0, 45_000 * 600)
        .build();

    let (playlist, _) = mpls::parse("00001.mpls", &data).unwrap();
    let item = &playlist.play_items[0];
    // one video stream plus the requested audio and subtitle streams
    assert_eq!(item.streams.len(), 4);
    assert_eq!(item.streams[0].codec, Codec::H264);
    assert_eq!(item.streams[1].codec, Codec::Ac3);
    assert_eq!(item.streams[1].language.as_deref(), Some("jpn"));
    assert_eq!(item.audio_stream_count(), 2);
    assert_eq!(item.subtitle_stream_count(), 1);

    assert_eq!(playlist.chapters.len(), 2);
    assert_eq!(playlist.chapters[0].id, 0);
    assert_eq!(playlist.chapters[1].mark_type, MarkType::EntryPoint);
    assert_eq!(playlist.chapters[1].time_stamp.0, 45_000 * 600);
}

#[test]
fn segment_keys_stable_under_reparse() {
    let data = MplsFixture::new()
        .item(MplsItem::new("00001", 90))
        .item(MplsItem::new("00007", 1440))
        .build();

    let (first, _) = mpls::parse("00001.mpls", &data).unwrap();
    let (second, _) = mpls::parse("00001.mpls", &data).unwrap();
    assert_eq!(first.signature_loose(), second.signature_loose());
    assert_eq!(first.signature_exact(), second.signature_exact());
}

#[test]
fn corrupt_play_item_is_skipped() {
    let data = MplsFixture::new()
        .item(MplsItem::new("00001", 90))
        .item(MplsItem::new("00002", 1440).corrupt_stn())
        .item(MplsItem::new("00003", 90))
        .build();

    let (playlist, warnings) = mpls::parse("00001.mpls", &data).unwrap();
    let segments: Vec<&str> = playlist
        .play_items
        .iter()
        .map(|i| i.clip_id.as_str())
        .collect();
    assert_eq!(segments, &["00001", "00003"]);
    assert!(warnings
        .iter()
        .any(|w| w.code == WarningCode::MalformedSection));
}

#[test]
fn missing_magic_fails_the_file() {
    let mut data = MplsFixture::new().item(MplsItem::new("00001", 90)).build();
    data[0] = b'X';
    assert!(mpls::parse("00001.mpls", &data).is_err());
}

#[test]
fn truncated_section_fails_the_file() {
    let mut data = MplsFixture::new().item(MplsItem::new("00001", 90)).build();
    data.truncate(48);
    assert!(mpls::parse("00001.mpls", &data).is_err());
}

#[test]
fn clip_info_streams() {
    let data = clpi(&[
        (0x1011, video_attrs()),
        (0x1100, audio_attrs("eng")),
        (0x1200, pg_attrs("eng")),
    ]);
    let (clip, warnings) = clpi::parse("00055.clpi", &data).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(clip.clip_id, "00055");
    assert_eq!(clip.streams.len(), 3);
    assert_eq!(clip.streams[1].codec, Codec::Ac3);
    assert_eq!(clip.streams[2].language.as_deref(), Some("eng"));
}

#[test]
fn clip_info_unknown_coding_type() {
    let data = clpi(&[
        (0x1100, vec![0xFF, 0xAA, 0xBB]),
        (0x1101, audio_attrs("jpn")),
    ]);
    let (clip, _) = clpi::parse("00056.clpi", &data).unwrap();
    assert_eq!(clip.streams[0].codec, Codec::Unknown);
    assert_eq!(clip.streams[1].codec, Codec::Ac3);
    assert_eq!(clip.streams[1].language.as_deref(), Some("jpn"));
}

#[test]
fn index_titles() {
    let data = index_bdmv(&[5, 6]);
    let (table, _) = index::parse(&data).unwrap();
    assert_eq!(table.titles.len(), 2);
    assert_eq!(table.titles[0].title_number, 1);
    assert_eq!(table.titles[0].movie_object_id, 5);
    assert_eq!(table.titles[1].movie_object_id, 6);
}

#[test]
fn movie_object_playlist_references() {
    let data = movie_object_bdmv(&[
        vec![play_pl(1)],
        vec![play_pl_at_chapter(2, 4), play_pl(1)],
    ]);
    let (objects, warnings) = mobj::parse(&data).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].referenced_playlists, vec!["00001"]);
    assert_eq!(objects[1].referenced_playlists, vec!["00002", "00001"]);
}
