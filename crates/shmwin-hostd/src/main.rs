//! One-shot bring-up check for a shared physical-memory window.
//!
//! Walks the whole lifecycle once: parse the descriptor, install it into the
//! registry, activate the device, open a session, seek across the window,
//! install a one-page smoke mapping, then release and tear down. Exit status
//! is the report; `RUST_LOG` controls verbosity.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use shmwin_device::{Whence, WindowDevice};
use shmwin_mapper::{MappingRequest, PagingFacility, RecordingFacility};
use shmwin_region::{RegionDescriptor, RegionRegistry, PAGE_SIZE};

#[derive(Debug, Parser)]
#[command(
    name = "shmwin-hostd",
    about = "Bring up a shared physical-memory window once and report the outcome"
)]
struct Args {
    /// Window descriptor, `<address>,<size>` with decimal or 0x-hex fields
    /// (page-aligned, non-zero).
    #[arg(required_unless_present = "config", conflicts_with = "config")]
    window: Option<String>,

    /// JSON window config, `{"base": <u64>, "size": <u64>}`, as carried in
    /// machine configs.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Physical-memory backing file windows are mapped from.
    #[arg(long, default_value = "/dev/mem")]
    backing: PathBuf,

    /// Validate and record the smoke mapping without touching the backing
    /// file.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let descriptor = load_descriptor(&args)?;

    let registry = RegionRegistry::new();
    registry
        .install(descriptor)
        .context("window descriptor rejected")?;
    tracing::info!(
        "window configured: base {:#x}, size {:#x}",
        descriptor.base,
        descriptor.size
    );

    if args.dry_run {
        exercise(&registry, RecordingFacility::new())?;
    } else {
        run_on_backing(&args, &registry)?;
    }

    tracing::info!("window interface released");
    Ok(())
}

#[cfg(unix)]
fn run_on_backing(args: &Args, registry: &RegionRegistry) -> Result<()> {
    let facility = shmwin_mapper::PhysMapFile::open(&args.backing)
        .with_context(|| format!("failed to open backing file: {}", args.backing.display()))?;
    exercise(registry, facility)
}

#[cfg(not(unix))]
fn run_on_backing(_args: &Args, _registry: &RegionRegistry) -> Result<()> {
    anyhow::bail!("mapping a physical backing file requires a unix host; use --dry-run");
}

fn load_descriptor(args: &Args) -> Result<RegionDescriptor> {
    if let Some(path) = &args.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read window config: {}", path.display()))?;
        let descriptor: RegionDescriptor = serde_json::from_str(&text)
            .with_context(|| format!("invalid window config: {}", path.display()))?;
        return Ok(descriptor);
    }
    let window = args
        .window
        .as_deref()
        .context("a <address>,<size> descriptor or --config is required")?;
    let descriptor = window
        .parse::<RegionDescriptor>()
        .context("invalid window descriptor")?;
    Ok(descriptor)
}

// The init/exit pair in miniature: activate, run each consumer-facing
// operation once against the live window, release.
fn exercise<F: PagingFacility>(registry: &RegionRegistry, facility: F) -> Result<()> {
    let mut device =
        WindowDevice::activate(registry, facility).context("window activation refused")?;
    let region = device.region();

    let session = device.open();
    let end = device
        .seek(session, Whence::End, 0)
        .context("seek to window end failed")?;
    tracing::debug!("session {session} seeked to end: {end:#x}");

    let length = region.size.min(PAGE_SIZE);
    let (result, mapped) = device
        .map(
            session,
            MappingRequest {
                offset: 0,
                length,
            },
        )
        .context("smoke mapping failed")?;
    tracing::info!(
        "smoke window installed: target {:#x}, length {:#x}, policy {:?}, attrs {:?}",
        result.target(),
        result.length(),
        result.policy(),
        result.attrs()
    );
    drop(mapped);

    device.release(session).context("session release failed")?;
    Ok(())
}
