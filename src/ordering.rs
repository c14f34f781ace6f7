//! Block ordering and title kicker policy for scanned albums.
//!
//! Applied to albums built from a directory listing (with or without a
//! versioned sidecar). Legacy manifests keep the author's order.
//!
//! ## Effective timestamps
//!
//! | Block | Timestamp |
//! |-------|-----------|
//! | photo | `_build.exif.DateTimeOriginal` |
//! | video | `data.date` |
//! | text  | none, pinned first |
//!
//! Missing or unparseable timestamps sort as 0 (the epoch), so undated
//! photos gather at the start of an oldest-first album and at the end of a
//! newest-first one. The sort is stable: equal timestamps keep the listing
//! order.
//!
//! ## Kicker
//!
//! The leading text block gets a year range over the dated photos:
//!
//! | Photos span | oldest-first | newest-first |
//! |-------------|--------------|--------------|
//! | one year    | `2019`       | `2019`       |
//! | 2017–2019   | `2017–2019`  | `2019–2017`  |

use crate::types::{Album, Block, SortOrder};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Reverse;

/// Parse a date or datetime into milliseconds since the Unix epoch.
///
/// Accepts RFC 3339, naive ISO-8601 datetimes (taken as UTC), raw EXIF
/// `YYYY:MM:DD HH:MM:SS`, and plain `YYYY-MM-DD`.
pub fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y:%m:%d %H:%M:%S",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Timestamp a block sorts by, if it has one.
pub fn effective_timestamp(block: &Block) -> Option<i64> {
    match block {
        Block::Text(_) => None,
        Block::Photo(photo) => photo
            .build
            .exif
            .get("DateTimeOriginal")
            .and_then(|v| v.as_str())
            .and_then(parse_timestamp),
        Block::Video(video) => video.data.date.as_deref().and_then(parse_timestamp),
    }
}

/// Stable sort by effective timestamp in the given direction.
pub fn sort_blocks(blocks: &mut [Block], order: SortOrder) {
    let key = |b: &Block| effective_timestamp(b).unwrap_or(0);
    match order {
        SortOrder::OldestFirst => blocks.sort_by_key(key),
        SortOrder::NewestFirst => blocks.sort_by_key(|b| Reverse(key(b))),
    }
}

/// Move every text block to the front, keeping relative order on both sides.
pub fn pin_text_first(blocks: &mut Vec<Block>) {
    let (text, rest): (Vec<Block>, Vec<Block>) = std::mem::take(blocks)
        .into_iter()
        .partition(|b| matches!(b, Block::Text(_)));
    blocks.extend(text);
    blocks.extend(rest);
}

/// Earliest and latest timestamp over the dated photos.
pub fn timestamp_range(blocks: &[Block]) -> (Option<i64>, Option<i64>) {
    let dated = blocks
        .iter()
        .filter(|b| matches!(b, Block::Photo(_)))
        .filter_map(effective_timestamp);
    dated.fold((None, None), |(min, max), ts| {
        (
            Some(min.map_or(ts, |m: i64| m.min(ts))),
            Some(max.map_or(ts, |m: i64| m.max(ts))),
        )
    })
}

fn year(ms: i64) -> Option<i32> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.year())
}

/// Year-range kicker. `None` when no photo is dated.
pub fn kicker(range: (Option<i64>, Option<i64>), order: SortOrder) -> Option<String> {
    let start = year(range.0?)?;
    let end = year(range.1?)?;
    if start == end {
        return Some(start.to_string());
    }
    Some(match order {
        SortOrder::OldestFirst => format!("{start}\u{2013}{end}"),
        SortOrder::NewestFirst => format!("{end}\u{2013}{start}"),
    })
}

/// Sort, pin text blocks first, and set the kicker on the leading text
/// block. A kicker already set is replaced; with no dated photo it is left
/// as it was.
pub fn apply_title_policy(album: &mut Album) {
    let order = album.sort_order();
    sort_blocks(&mut album.blocks, order);
    pin_text_first(&mut album.blocks);

    let range = timestamp_range(&album.blocks);
    if let Some(kicker) = kicker(range, order)
        && let Some(Block::Text(title)) = album.blocks.first_mut()
    {
        title.data.kicker = Some(kicker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{album_of, photo_taken, text_block, video_on};

    fn ids(blocks: &[Block]) -> Vec<&str> {
        blocks.iter().map(|b| b.id()).collect()
    }

    // =========================================================================
    // parse_timestamp
    // =========================================================================

    #[test]
    fn parses_rfc3339_with_offset() {
        assert_eq!(
            parse_timestamp("2023-04-01T09:30:00+09:00"),
            parse_timestamp("2023-04-01T00:30:00Z")
        );
        assert_eq!(parse_timestamp("1970-01-01T00:00:01Z"), Some(1000));
    }

    #[test]
    fn parses_naive_iso_as_utc() {
        assert_eq!(parse_timestamp("1970-01-01T00:00:02"), Some(2000));
        assert_eq!(parse_timestamp("1970-01-01T00:00:02.500"), Some(2500));
    }

    #[test]
    fn parses_raw_exif_and_plain_dates() {
        assert_eq!(parse_timestamp("1970:01:01 00:01:00"), Some(60_000));
        assert_eq!(parse_timestamp("1970-01-02"), Some(86_400_000));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("0000:00:00 00:00:00"), None);
    }

    // =========================================================================
    // effective_timestamp
    // =========================================================================

    #[test]
    fn effective_timestamp_per_kind() {
        assert_eq!(effective_timestamp(&text_block("t", "Title")), None);
        assert_eq!(
            effective_timestamp(&photo_taken("p", Some("1970-01-01T00:00:01"))),
            Some(1000)
        );
        assert_eq!(effective_timestamp(&photo_taken("p", None)), None);
        assert_eq!(
            effective_timestamp(&video_on("v", Some("1970-01-02"))),
            Some(86_400_000)
        );
        assert_eq!(effective_timestamp(&video_on("v", None)), None);
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    #[test]
    fn sort_oldest_first_with_undated_at_start() {
        let mut blocks = vec![
            photo_taken("b", Some("2020-01-01T00:00:00")),
            photo_taken("undated", None),
            photo_taken("a", Some("2019-01-01T00:00:00")),
        ];
        sort_blocks(&mut blocks, SortOrder::OldestFirst);
        assert_eq!(ids(&blocks), vec!["undated", "a", "b"]);
    }

    #[test]
    fn sort_newest_first_with_undated_at_end() {
        let mut blocks = vec![
            photo_taken("undated", None),
            photo_taken("a", Some("2019-01-01T00:00:00")),
            video_on("v", Some("2021-06-01")),
            photo_taken("b", Some("2020-01-01T00:00:00")),
        ];
        sort_blocks(&mut blocks, SortOrder::NewestFirst);
        assert_eq!(ids(&blocks), vec!["v", "b", "a", "undated"]);
    }

    #[test]
    fn sort_is_stable_for_equal_timestamps() {
        let mut blocks = vec![
            photo_taken("first", Some("2020-01-01T00:00:00")),
            photo_taken("second", Some("2020-01-01T00:00:00")),
            photo_taken("third", Some("2020-01-01T00:00:00")),
        ];
        sort_blocks(&mut blocks, SortOrder::NewestFirst);
        assert_eq!(ids(&blocks), vec!["first", "second", "third"]);
    }

    #[test]
    fn pin_text_first_keeps_relative_order() {
        let mut blocks = vec![
            photo_taken("p1", None),
            text_block("t1", "One"),
            photo_taken("p2", None),
            text_block("t2", "Two"),
        ];
        pin_text_first(&mut blocks);
        assert_eq!(ids(&blocks), vec!["t1", "t2", "p1", "p2"]);
    }

    // =========================================================================
    // Range and kicker
    // =========================================================================

    #[test]
    fn timestamp_range_ignores_undated_and_videos() {
        let blocks = vec![
            photo_taken("a", Some("1970-01-01T00:00:05")),
            photo_taken("undated", None),
            video_on("v", Some("1980-01-01")),
            photo_taken("b", Some("1970-01-01T00:00:01")),
        ];
        assert_eq!(timestamp_range(&blocks), (Some(1000), Some(5000)));
    }

    #[test]
    fn timestamp_range_of_no_dated_photos() {
        let blocks = vec![text_block("t", "T"), photo_taken("p", None)];
        assert_eq!(timestamp_range(&blocks), (None, None));
    }

    #[test]
    fn kicker_single_year() {
        let ts = parse_timestamp("2019-05-01").unwrap();
        assert_eq!(kicker((Some(ts), Some(ts)), SortOrder::NewestFirst).as_deref(), Some("2019"));
    }

    #[test]
    fn kicker_range_is_direction_aware() {
        let range = (parse_timestamp("2017-05-01"), parse_timestamp("2019-05-01"));
        assert_eq!(kicker(range, SortOrder::OldestFirst).as_deref(), Some("2017–2019"));
        assert_eq!(kicker(range, SortOrder::NewestFirst).as_deref(), Some("2019–2017"));
    }

    #[test]
    fn kicker_none_without_dates() {
        assert_eq!(kicker((None, None), SortOrder::OldestFirst), None);
    }

    // =========================================================================
    // apply_title_policy
    // =========================================================================

    #[test]
    fn title_policy_sorts_pins_and_sets_kicker() {
        let mut album = album_of(vec![
            photo_taken("late", Some("2019-03-01T00:00:00")),
            text_block("title", "Kanto"),
            photo_taken("early", Some("2017-03-01T00:00:00")),
        ]);
        album.formatting.sort = Some(SortOrder::NewestFirst);

        apply_title_policy(&mut album);

        assert_eq!(ids(&album.blocks), vec!["title", "late", "early"]);
        let Block::Text(title) = &album.blocks[0] else {
            panic!("expected title first");
        };
        assert_eq!(title.data.kicker.as_deref(), Some("2019–2017"));
    }

    #[test]
    fn title_policy_without_dates_keeps_kicker() {
        let mut album = album_of(vec![text_block("title", "Kanto"), photo_taken("p", None)]);
        if let Block::Text(t) = &mut album.blocks[0] {
            t.data.kicker = Some("hand written".into());
        }
        apply_title_policy(&mut album);
        let Block::Text(title) = &album.blocks[0] else {
            panic!("expected title first");
        };
        assert_eq!(title.data.kicker.as_deref(), Some("hand written"));
    }

    #[test]
    fn title_policy_without_text_block_only_sorts() {
        let mut album = album_of(vec![
            photo_taken("b", Some("2020-01-01T00:00:00")),
            photo_taken("a", Some("2019-01-01T00:00:00")),
        ]);
        apply_title_policy(&mut album);
        assert_eq!(ids(&album.blocks), vec!["a", "b"]);
    }
}
