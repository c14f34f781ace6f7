use album_forge::album::{self, BuildReport};
use album_forge::cache::DerivativeCache;
use album_forge::codec::{BuildContext, serialize_album};
use album_forge::config::{self, BuildConfig};
use album_forge::imaging::RustBackend;
use album_forge::types::Album;
use album_forge::{janitor, manifest, output, tags};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "album-forge")]
#[command(about = "Build photo-album directories into resolved album documents")]
#[command(long_about = "\
Build photo-album directories into resolved album documents

Every directory under the albums root is one album. How it is read depends
on which files it holds:

  albums/
  ├── config.toml                  # Build config (optional)
  ├── kanto/                       # Directory scan: photos sorted by name
  │   ├── a.jpg
  │   ├── b-cover.jpg              # \"cover\" in the name marks the cover photo
  │   └── .resized_images/         # Derivative cache (a.jpg@800.avif, ...)
  ├── trips-newest-first/          # \"newest-first\" in the name flips the order
  │   ├── album.json               # Versioned sidecar: sort, cover, videos
  │   └── ...
  └── archive/
      └── manifest.json            # Legacy manifest: used verbatim

Scanned albums are sorted by capture date and get a year-range kicker on
their title. Legacy manifests keep the author's order.

Run 'album-forge gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Albums root directory
    #[arg(long, default_value = "albums", global = true)]
    source: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Write the built albums as JSON to this file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Keep stale derivatives instead of sweeping them after the build
    #[arg(long)]
    no_clean: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Build every album: metadata, tags, derivatives, ordering
    Build(BuildArgs),
    /// Resolve every album manifest without touching any image
    Check,
    /// Delete derivatives of removed photos, unconfigured widths and old formats
    Clean,
    /// Build one album and print it as a persistable manifest
    Export {
        /// Album directory name under the root
        album: String,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => {
            let config = load_config(&cli.source)?;
            init_thread_pool(&config.processing);
            let backend = RustBackend::new();
            let tag_lookup = tags::open_tag_lookup(&config.tags);
            let cache = DerivativeCache::from_config(&config);
            let ctx = BuildContext {
                backend: &backend,
                tags: tag_lookup.as_ref(),
                cache: &cache,
                widths: config.target_widths(),
            };

            println!("==> Building albums in {}", cli.source.display());
            let report = album::build_albums(&cli.source, &ctx)?;
            output::print_build_output(&report, cache.stats());

            if let Some(path) = &args.output {
                let albums: Vec<&Album> = report.albums.iter().map(|b| &b.album).collect();
                std::fs::write(path, serde_json::to_string_pretty(&albums)?)?;
                println!("==> Wrote {}", path.display());
            }

            if !args.no_clean {
                println!("==> Sweeping derivative caches");
                let sweeps = sweep_built(&report, &cache, &ctx.widths);
                output::print_sweep_output(&sweeps);
            }

            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let results: Vec<_> = manifest::album_names(&cli.source)?
                .into_iter()
                .map(|name| {
                    let resolved = manifest::resolve(&cli.source.join(&name));
                    (name, resolved)
                })
                .collect();
            output::print_check_output(&results);
            if results.iter().any(|(_, r)| r.is_err()) {
                std::process::exit(1);
            }
            println!("==> Albums are valid");
        }
        Command::Clean => {
            let config = load_config(&cli.source)?;
            let cache = DerivativeCache::from_config(&config);
            let widths = config.target_widths();
            let extension = cache.format().extension();
            let sweeps: Vec<_> = manifest::album_names(&cli.source)?
                .into_iter()
                .map(|name| {
                    let dir = cli.source.join(&name);
                    let derived = cache.derivative_dir(&dir);
                    let report = janitor::sweep_album(&dir, &derived, &widths, extension);
                    (name, report)
                })
                .collect();
            output::print_sweep_output(&sweeps);
        }
        Command::Export { album: name } => {
            let config = load_config(&cli.source)?;
            init_thread_pool(&config.processing);
            let backend = RustBackend::new();
            let tag_lookup = tags::open_tag_lookup(&config.tags);
            let cache = DerivativeCache::from_config(&config);
            let ctx = BuildContext {
                backend: &backend,
                tags: tag_lookup.as_ref(),
                cache: &cache,
                widths: config.target_widths(),
            };
            let build = album::build_album(&cli.source.join(&name), &ctx)?;
            let persisted = serialize_album(&build.album);
            println!("{}", serde_json::to_string_pretty(&persisted)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, `warn` and above unless `RUST_LOG` says otherwise.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load `config.toml` from the albums root. A relative tag index path is
/// taken relative to the root.
fn load_config(source: &Path) -> Result<BuildConfig, config::ConfigError> {
    let mut config = config::load_config(source)?;
    config.tags.index = config.tags.index.take().map(|index| {
        if index.is_relative() {
            source.join(index)
        } else {
            index
        }
    });
    Ok(config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Sweep the derivative cache of every album that built.
fn sweep_built(
    report: &BuildReport,
    cache: &DerivativeCache,
    widths: &[u32],
) -> Vec<(String, janitor::SweepReport)> {
    report
        .albums
        .iter()
        .map(|b| {
            let dir = &b.album.build.srcdir;
            let extension = cache.format().extension();
            let sweep = janitor::sweep_album(dir, &cache.derivative_dir(dir), widths, extension);
            (b.album.name.clone(), sweep)
        })
        .collect()
}
