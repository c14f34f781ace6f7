//! End-to-end build over real JPEG files.
//!
//! Drives the public API the way the `build`, `clean` and `export` commands
//! do: load config from the albums root, build every album with the
//! pure-Rust backend, rebuild from cache, then sweep after a config change.
//!
//! JPEG output keeps the encodes fast; the derivative logic is the same for
//! AVIF.

use album_forge::album::{BuildReport, build_albums};
use album_forge::cache::DerivativeCache;
use album_forge::codec::{BuildContext, serialize_album};
use album_forge::config::{BuildConfig, load_config};
use album_forge::imaging::RustBackend;
use album_forge::janitor::sweep_album;
use album_forge::manifest::ManifestMode;
use album_forge::tags::NoTags;
use album_forge::types::{Album, Block, PhotoBlock};
use image::{ImageEncoder, RgbImage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Two albums: a plain scan and a versioned newest-first one with videos.
fn setup_albums() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::write(
        root.join("config.toml"),
        "[images]\nsizes = [40, 80]\nformat = \"jpeg\"\n",
    )
    .unwrap();

    let kanto = root.join("kanto");
    fs::create_dir(&kanto).unwrap();
    create_test_jpeg(&kanto.join("a.jpg"), 120, 90);
    create_test_jpeg(&kanto.join("b-cover.jpg"), 60, 40);

    let trips = root.join("trips-newest-first");
    fs::create_dir(&trips).unwrap();
    create_test_jpeg(&trips.join("beach.jpg"), 100, 100);
    fs::write(
        trips.join("album.json"),
        r#"{"externals": [
            {"type": "youtube", "href": "https://youtu.be/old", "date": "2019-01-01"},
            {"type": "youtube", "href": "https://youtu.be/new", "date": "2021-06-01"}
        ]}"#,
    )
    .unwrap();

    tmp
}

fn build(root: &Path, config: &BuildConfig) -> (BuildReport, DerivativeCache) {
    let backend = RustBackend::new();
    let cache = DerivativeCache::from_config(config);
    let report = {
        let ctx = BuildContext {
            backend: &backend,
            tags: &NoTags,
            cache: &cache,
            widths: config.target_widths(),
        };
        build_albums(root, &ctx).unwrap()
    };
    (report, cache)
}

fn album<'a>(report: &'a BuildReport, name: &str) -> &'a Album {
    &report
        .albums
        .iter()
        .find(|b| b.album.name == name)
        .unwrap_or_else(|| panic!("album '{name}' not built"))
        .album
}

fn photo<'a>(album: &'a Album, filename: &str) -> &'a PhotoBlock {
    album
        .blocks
        .iter()
        .find_map(|b| match b {
            Block::Photo(p) if p.data.src.ends_with(&format!("/{filename}")) => Some(p),
            _ => None,
        })
        .unwrap_or_else(|| panic!("photo '{filename}' not in album '{}'", album.name))
}

#[test]
fn builds_scanned_album_with_derivatives() {
    let tmp = setup_albums();
    let config = load_config(tmp.path()).unwrap();
    let (report, cache) = build(tmp.path(), &config);

    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(report.albums.len(), 2);

    let kanto = album(&report, "kanto");
    assert_eq!(kanto.build.slug, "kanto");
    assert!(matches!(&kanto.blocks[0], Block::Text(t) if t.data.title == "kanto"));

    let a = photo(kanto, "a.jpg");
    assert_eq!((a.build.width, a.build.height), (120, 90));
    let widths: Vec<u32> = a.build.srcset.iter().map(|d| d.width).collect();
    assert_eq!(widths, vec![40, 80]);
    assert_eq!(a.build.srcset[0].height, 30);
    assert!(a.build.srcset[1].src.ends_with("/kanto/.resized_images/a.jpg@80.jpg"));
    assert!(tmp.path().join("kanto/.resized_images/a.jpg@40.jpg").is_file());

    // Narrower than the largest width: upscaled to it
    let cover = photo(kanto, "b-cover.jpg");
    assert_eq!(cover.formatting.as_ref().unwrap().cover, Some(true));
    assert_eq!((cover.build.srcset[1].width, cover.build.srcset[1].height), (80, 53));
    assert!(cover.build.srcset[1].src.ends_with("b-cover.jpg@80.jpg"));

    assert_eq!(cache.stats().misses, 6);
    assert_eq!(cache.stats().hits, 0);
}

#[test]
fn versioned_album_orders_videos_newest_first() {
    let tmp = setup_albums();
    let config = load_config(tmp.path()).unwrap();
    let (report, _) = build(tmp.path(), &config);

    let build = report
        .albums
        .iter()
        .find(|b| b.album.name == "trips-newest-first")
        .unwrap();
    assert_eq!(build.mode, ManifestMode::Versioned);

    let kinds: Vec<&str> = build.album.blocks.iter().map(|b| b.kind()).collect();
    assert_eq!(kinds, vec!["text", "video", "video", "photo"]);
    let Block::Video(first) = &build.album.blocks[1] else {
        panic!("expected a video");
    };
    assert_eq!(first.data.href, "https://youtu.be/new");
    // No dated photo: no kicker
    assert!(matches!(&build.album.blocks[0], Block::Text(t) if t.data.kicker.is_none()));
}

#[test]
fn rebuild_reuses_cached_derivatives() {
    let tmp = setup_albums();
    let config = load_config(tmp.path()).unwrap();
    let (first, _) = build(tmp.path(), &config);
    let (second, cache) = build(tmp.path(), &config);

    assert_eq!(cache.stats().misses, 0);
    assert_eq!(cache.stats().hits, 6);
    assert_eq!(
        photo(album(&first, "kanto"), "a.jpg").build.srcset,
        photo(album(&second, "kanto"), "a.jpg").build.srcset
    );
}

#[test]
fn sweep_after_config_change_removes_unused_widths() {
    let tmp = setup_albums();
    let config = load_config(tmp.path()).unwrap();
    build(tmp.path(), &config);

    fs::write(
        tmp.path().join("config.toml"),
        "[images]\nsizes = [40]\nformat = \"jpeg\"\n",
    )
    .unwrap();
    fs::remove_file(tmp.path().join("kanto/b-cover.jpg")).unwrap();
    let config = load_config(tmp.path()).unwrap();
    let cache = DerivativeCache::from_config(&config);

    let kanto = tmp.path().join("kanto");
    let derived = cache.derivative_dir(&kanto);
    let report = sweep_album(&kanto, &derived, &config.target_widths(), "jpg");
    assert!(report.errors.is_empty());
    assert_eq!(report.removed.len(), 3);

    let mut left: Vec<String> = fs::read_dir(kanto.join(".resized_images"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["a.jpg@40.jpg"]);
}

#[test]
fn export_drops_build_data() {
    let tmp = setup_albums();
    let config = load_config(tmp.path()).unwrap();
    let (report, _) = build(tmp.path(), &config);

    let persisted = serialize_album(album(&report, "kanto"));
    let json = serde_json::to_value(&persisted).unwrap();
    assert!(json.get("_build").is_none());
    for block in json["blocks"].as_array().unwrap() {
        assert!(block.get("_build").is_none());
    }
    // The inferred cover flag is not written back
    let cover = &json["blocks"][2];
    assert!(cover["data"]["src"].as_str().unwrap().ends_with("b-cover.jpg"));
    assert!(cover.get("formatting").is_none());
}
