//! kumo operator tool.
//!
//! Loads a zip archive into an in-memory mount and inspects or re-exports it.
//!
//! Usage:
//!   kumo tree site.zip --strip 1
//!   kumo cat site.zip /docs/index.md
//!   kumo repack site.zip docs.zip --from /docs
//!
//! Set `RUST_LOG=debug` to see index notifications.

mod render;
mod searcher;

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path as FsPath, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use kumo_vfs::{MountPoint, Path, VfsConfig};

use crate::render::render_tree;
use crate::searcher::TracingSearcher;

/// Inspect and repack zip archives through the kumo VFS.
#[derive(Parser, Debug)]
#[command(name = "kumo")]
#[command(about = "Inspect and repack zip archives through the kumo VFS")]
struct Args {
    /// TOML config file (lock, archive and index settings)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tree of an archive with file sizes
    Tree {
        archive: PathBuf,

        /// Leading path segments to drop from every entry
        #[arg(long, default_value_t = 0)]
        strip: usize,
    },

    /// Print one file from an archive
    Cat {
        archive: PathBuf,

        /// Path inside the archive, e.g. /docs/index.md
        path: String,

        #[arg(long, default_value_t = 0)]
        strip: usize,
    },

    /// Load an archive and write it back out, optionally only a subfolder
    Repack {
        input: PathBuf,
        output: PathBuf,

        #[arg(long, default_value_t = 0)]
        strip: usize,

        /// Folder to export instead of the whole tree
        #[arg(long)]
        from: Option<String>,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => VfsConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => VfsConfig::default(),
    };

    match args.command {
        Command::Tree { archive, strip } => {
            let mount = load(config, &archive, strip)?;
            print!("{}", render_tree(mount.file(mount.root())?));
        }
        Command::Cat {
            archive,
            path,
            strip,
        } => {
            let mount = load(config, &archive, strip)?;
            let path = Path::parse(&path).with_context(|| format!("bad path {path:?}"))?;
            let file = mount.get(&path)?;
            let content = file
                .content()
                .with_context(|| format!("{path} is a folder"))?;
            std::io::stdout().write_all(content)?;
        }
        Command::Repack {
            input,
            output,
            strip,
            from,
        } => {
            let mount = load(config, &input, strip)?;
            let folder = match from.as_deref() {
                Some(from) => {
                    let path = Path::parse(from).with_context(|| format!("bad path {from:?}"))?;
                    let Some(id) = mount.by_path(&path) else {
                        bail!("{path} not found in {}", input.display());
                    };
                    id
                }
                None => mount.root(),
            };
            let out = File::create(&output)
                .with_context(|| format!("creating {}", output.display()))?;
            mount
                .zip_to(folder, out)
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!(output = %output.display(), "repacked archive");
        }
    }
    Ok(())
}

/// Fresh mount with `archive` unzipped into the root.
fn load(config: VfsConfig, archive: &FsPath, strip: usize) -> Result<MountPoint> {
    let mut mount = MountPoint::new()
        .with_config(config)
        .with_searcher_provider(TracingSearcher::provider());
    let file = File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
    let root = mount.root();
    mount
        .unzip(root, BufReader::new(file), false, strip)
        .with_context(|| format!("importing {}", archive.display()))?;
    tracing::info!(archive = %archive.display(), nodes = mount.len(), "loaded archive");
    Ok(mount)
}
