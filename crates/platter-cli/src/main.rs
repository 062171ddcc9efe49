//! Platter CLI - inspect and extract partitions from raw disk images

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use platter_core::{FilesystemProbe, PartitionMeta, ReadSeek};
use platter_stream::MmapStream;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "platter", version, about = "Inspect and extract partitions from raw disk images")]
struct Cli {
    /// Open the image with plain file I/O instead of a memory map
    #[arg(long, global = true)]
    no_mmap: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the detected partitions of an image
    Info {
        /// Path to the disk image
        image: PathBuf,

        /// Emit the partition list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy every partition's byte range into its own file
    Extract {
        /// Path to the disk image
        image: PathBuf,

        /// Directory the partition files are written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Info { image, json } => cmd_info(&image, json, cli.no_mmap),
        Command::Extract { image, out_dir } => cmd_extract(&image, &out_dir, cli.no_mmap),
    }
}

fn open_source(path: &Path, no_mmap: bool) -> Result<Box<dyn ReadSeek>> {
    let source: Box<dyn ReadSeek> = if no_mmap {
        Box::new(File::open(path).with_context(|| format!("opening {}", path.display()))?)
    } else {
        Box::new(MmapStream::open(path).with_context(|| format!("mapping {}", path.display()))?)
    };
    Ok(source)
}

/// Filesystem signatures consulted when an image has no partition table.
fn builtin_probes() -> Vec<FilesystemProbe> {
    vec![Box::new(probe_xfs), Box::new(probe_ext)]
}

/// XFS: "XFSB" at the start of the superblock (offset 0).
fn probe_xfs(stream: &mut dyn ReadSeek) -> bool {
    let mut magic = [0u8; 4];
    stream.read_exact(&mut magic).is_ok() && &magic == b"XFSB"
}

/// ext2/3/4: 0xEF53 at offset 56 of the superblock, which starts at 1024.
fn probe_ext(stream: &mut dyn ReadSeek) -> bool {
    if stream.seek(SeekFrom::Start(1080)).is_err() {
        return false;
    }
    let mut magic = [0u8; 2];
    stream.read_exact(&mut magic).is_ok() && u16::from_le_bytes(magic) == 0xEF53
}

fn cmd_info(image: &Path, json: bool, no_mmap: bool) -> Result<()> {
    let source = open_source(image, no_mmap)?;
    let mut driver = platter_schemes::open(source, &builtin_probes())
        .with_context(|| format!("detecting partitions in {}", image.display()))?;

    let mut metas: Vec<PartitionMeta> = Vec::new();
    while let Some(partition) = driver.next_partition()? {
        metas.push(partition.meta().clone());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&metas)?);
        return Ok(());
    }

    println!("{}", image.display());
    println!(
        "{:<10} {:<24} {:>12} {:>12}  {}",
        "NAME", "TYPE", "START", "SECTORS", "FLAGS"
    );
    for meta in &metas {
        let mut flags = Vec::new();
        if meta.bootable {
            flags.push("boot");
        }
        if !meta.supported {
            flags.push("unsupported");
        }
        println!(
            "{:<10} {:<24} {:>12} {:>12}  {}",
            meta.name,
            format_type_id(&meta.type_id),
            meta.start_sector,
            meta.sector_count,
            flags.join(",")
        );
    }

    Ok(())
}

fn cmd_extract(image: &Path, out_dir: &Path, no_mmap: bool) -> Result<()> {
    let source = open_source(image, no_mmap)?;
    let mut driver = platter_schemes::open(source, &builtin_probes())
        .with_context(|| format!("detecting partitions in {}", image.display()))?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut ordinal = 0usize;
    while let Some(mut partition) = driver.next_partition()? {
        if partition.sector_count() == 0 {
            ordinal += 1;
            continue;
        }

        let file_name = format!("{}_{}.bin", sanitize_name(partition.name()), ordinal);
        let target = out_dir.join(&file_name);
        let mut out = File::create(&target)
            .with_context(|| format!("creating {}", target.display()))?;

        let copied = io::copy(&mut partition, &mut out)
            .with_context(|| format!("extracting partition {}", partition.name()))?;
        tracing::info!("wrote {} ({} bytes)", target.display(), copied);
        println!("{}: {} bytes", target.display(), copied);

        ordinal += 1;
    }

    Ok(())
}

/// Render raw type identifier bytes: the single MBR type code as hex, a
/// 16-byte GPT GUID in its canonical form, anything else byte by byte.
fn format_type_id(type_id: &[u8]) -> String {
    match type_id.len() {
        0 => "-".to_string(),
        1 => format!("0x{:02X}", type_id[0]),
        16 => {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(type_id);
            uuid::Uuid::from_bytes_le(raw).to_string()
        }
        _ => type_id
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(""),
    }
}

/// Keep partition names safe to use as file names.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "partition".to_string()
    } else {
        cleaned
    }
}
