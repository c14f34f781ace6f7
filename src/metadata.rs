//! Photo metadata extraction.
//!
//! Two best-effort reads feed a photo's build record:
//!
//! - [`extract`] turns the EXIF block of a photo into a JSON object keyed by
//!   tag name (`Make`, `FNumber`, `DateTimeOriginal`, ...).
//! - [`get_dimensions`] asks the image backend for the pixel size.
//!
//! Neither fails. A photo without EXIF gets `{}`; an unreadable photo gets
//! the `100×100` sentinel so layout code always has something to divide by.
//!
//! ## Value mapping
//!
//! | EXIF | JSON |
//! |------|------|
//! | ASCII | string (trailing NULs stripped) |
//! | BYTE, SHORT, LONG, signed variants | number, or array when multi-valued |
//! | RATIONAL, SRATIONAL, FLOAT, DOUBLE | floating point number |
//! | UNDEFINED | omitted (maker notes, binary blobs) |
//!
//! Date tags are rewritten to ISO-8601 (`2023-04-01T09:30:00+09:00`), with
//! the offset taken from the matching `OffsetTime*` tag when present. GPS
//! coordinates are additionally folded into signed decimal `latitude` and
//! `longitude` entries.

use crate::imaging::{Dimensions, ImageBackend};
use crate::types::MetadataRecord;
use chrono::{FixedOffset, NaiveDateTime};
use exif::{Field, In, Tag, Value};
use serde_json::{Number, Value as Json};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Returned by [`get_dimensions`] when the photo can't be identified.
pub const FALLBACK_DIMENSIONS: Dimensions = Dimensions {
    width: 100,
    height: 100,
};

/// Date tags and the tag holding their UTC offset.
const DATE_TAGS: &[(Tag, Tag)] = &[
    (Tag::DateTime, Tag::OffsetTime),
    (Tag::DateTimeOriginal, Tag::OffsetTimeOriginal),
    (Tag::DateTimeDigitized, Tag::OffsetTimeDigitized),
];

/// Read the EXIF metadata of a photo. Any failure yields an empty record.
pub fn extract(path: &Path) -> MetadataRecord {
    let exif = File::open(path)
        .map_err(|e| e.to_string())
        .and_then(|file| {
            exif::Reader::new()
                .read_from_container(&mut BufReader::new(file))
                .map_err(|e| e.to_string())
        });
    match exif {
        Ok(exif) => record_from_fields(exif.fields()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no EXIF metadata");
            MetadataRecord::new()
        }
    }
}

/// Pixel dimensions of a photo, or [`FALLBACK_DIMENSIONS`].
pub fn get_dimensions(backend: &dyn ImageBackend, path: &Path) -> Dimensions {
    match backend.identify(path) {
        Ok(dims) if dims.width > 0 && dims.height > 0 => dims,
        Ok(_) => FALLBACK_DIMENSIONS,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "using fallback dimensions");
            FALLBACK_DIMENSIONS
        }
    }
}

fn record_from_fields<'a>(fields: impl Iterator<Item = &'a Field>) -> MetadataRecord {
    let primary: Vec<&Field> = fields.filter(|f| f.ifd_num == In::PRIMARY).collect();
    let find = |tag: Tag| primary.iter().find(|f| f.tag == tag).copied();

    let mut record = MetadataRecord::new();
    for field in &primary {
        let name = field.tag.to_string();
        // Tags the crate has no name for print as `Tag(Exif, 12345)`
        if name.starts_with("Tag(") {
            continue;
        }
        if let Some(value) = field_value(field) {
            record.insert(name, value);
        }
    }

    for &(date_tag, offset_tag) in DATE_TAGS {
        let Some(date) = find(date_tag) else { continue };
        let offset = find(offset_tag).and_then(|f| ascii(&f.value));
        if let Some(iso) =
            ascii(&date.value).and_then(|s| exif_date_to_iso(&s, offset.as_deref()))
        {
            record.insert(date_tag.to_string(), Json::String(iso));
        }
    }

    let lat = find(Tag::GPSLatitude).and_then(|f| gps_degrees(&f.value));
    let lat_ref = find(Tag::GPSLatitudeRef).and_then(|f| ascii(&f.value));
    let lon = find(Tag::GPSLongitude).and_then(|f| gps_degrees(&f.value));
    let lon_ref = find(Tag::GPSLongitudeRef).and_then(|f| ascii(&f.value));
    if let (Some(lat), Some(lon)) = (lat, lon) {
        let lat = if lat_ref.as_deref() == Some("S") { -lat } else { lat };
        let lon = if lon_ref.as_deref() == Some("W") { -lon } else { lon };
        if let (Some(lat), Some(lon)) = (Number::from_f64(lat), Number::from_f64(lon)) {
            record.insert("latitude".into(), Json::Number(lat));
            record.insert("longitude".into(), Json::Number(lon));
        }
    }

    record
}

fn ascii(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => {
            let first = parts.first()?;
            let s = String::from_utf8_lossy(first);
            Some(s.trim_end_matches('\0').trim().to_string())
        }
        _ => None,
    }
}

fn float(x: f64) -> Option<Json> {
    Number::from_f64(x).map(Json::Number)
}

/// Collapse single-element arrays.
fn collapse(values: Vec<Json>) -> Option<Json> {
    match values.len() {
        0 => None,
        1 => values.into_iter().next(),
        _ => Some(Json::Array(values)),
    }
}

fn field_value(field: &Field) -> Option<Json> {
    match &field.value {
        Value::Ascii(parts) => {
            let strings: Vec<Json> = parts
                .iter()
                .map(|p| {
                    Json::String(
                        String::from_utf8_lossy(p)
                            .trim_end_matches('\0')
                            .trim()
                            .to_string(),
                    )
                })
                .collect();
            collapse(strings)
        }
        Value::Byte(v) => collapse(v.iter().map(|&x| Json::from(x)).collect()),
        Value::Short(v) => collapse(v.iter().map(|&x| Json::from(x)).collect()),
        Value::Long(v) => collapse(v.iter().map(|&x| Json::from(x)).collect()),
        Value::SByte(v) => collapse(v.iter().map(|&x| Json::from(x)).collect()),
        Value::SShort(v) => collapse(v.iter().map(|&x| Json::from(x)).collect()),
        Value::SLong(v) => collapse(v.iter().map(|&x| Json::from(x)).collect()),
        Value::Rational(v) => collapse(v.iter().filter_map(|r| float(r.to_f64())).collect()),
        Value::SRational(v) => collapse(v.iter().filter_map(|r| float(r.to_f64())).collect()),
        Value::Float(v) => collapse(v.iter().filter_map(|&x| float(x as f64)).collect()),
        Value::Double(v) => collapse(v.iter().filter_map(|&x| float(x)).collect()),
        Value::Undefined(..) | Value::Unknown(..) => None,
    }
}

/// `YYYY:MM:DD HH:MM:SS` (+ optional `±HH:MM` offset) → ISO-8601.
///
/// Without an offset the result has none either; consumers treat such
/// values as UTC.
fn exif_date_to_iso(date: &str, offset: Option<&str>) -> Option<String> {
    // Cameras without a clock write all zeros, which doesn't parse
    let naive = NaiveDateTime::parse_from_str(date.trim(), "%Y:%m:%d %H:%M:%S").ok()?;
    match offset.and_then(parse_offset) {
        Some(tz) => naive
            .and_local_timezone(tz)
            .single()
            .map(|dt| dt.to_rfc3339()),
        None => Some(naive.format("%Y-%m-%dT%H:%M:%S").to_string()),
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (h, m) = rest.split_once(':')?;
    let secs = h.parse::<i32>().ok()? * 3600 + m.parse::<i32>().ok()? * 60;
    FixedOffset::east_opt(sign * secs)
}

/// Degrees/minutes/seconds rationals → decimal degrees.
fn gps_degrees(value: &Value) -> Option<f64> {
    match value {
        Value::Rational(v) if v.len() >= 3 => {
            let deg = v[0].to_f64() + v[1].to_f64() / 60.0 + v[2].to_f64() / 3600.0;
            deg.is_finite().then_some(deg)
        }
        _ => None,
    }
}
