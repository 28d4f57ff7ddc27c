//! LVGL filesystem port simulator - drive the flash volume driver from a host.
//!
//! A host directory stands in for the flash partition. Every file command
//! goes through the registered driver callbacks, exactly as the UI toolkit
//! would call them on the device.
//!
//! Usage:
//!   lvfs-sim [--root DIR] [--config FILE] [-v...] <command>
//!
//! Examples:
//!   lvfs-sim info                          # Mount (formatting if needed), show usage
//!   lvfs-sim ls S:/                        # List the volume root
//!   lvfs-sim put logo.bin S:/img/logo.bin  # Copy a host file onto the volume
//!   lvfs-sim cat S:/img/logo.bin > out.bin # Copy it back out
//!   lvfs-sim provision assets.zip          # Install an asset bundle

use std::io::Write;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use log::{Level, LevelFilter, Log, Metadata, Record};

use lvfs_core::{
    init, install_bundle, load_bundle_from_path, mount_volume, DriverTable, FsResult,
    HostStorage, PortFs, Storage, VolumeConfig,
};

/// LVGL filesystem port simulator
#[derive(Parser, Debug)]
#[command(name = "lvfs-sim")]
#[command(about = "Drive the LVGL flash filesystem port against a host directory")]
struct Args {
    /// Host directory holding the simulated partition
    #[arg(long, default_value = "flash")]
    root: PathBuf,

    /// JSON volume configuration (letter, mountPoint, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reported partition capacity in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    capacity: u64,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mount the volume and print its capacity
    Info,
    /// List a directory
    Ls { path: String },
    /// Print a file to stdout
    Cat { path: String },
    /// Copy a host file onto the volume
    Put { source: PathBuf, dest: String },
    /// Install a ZIP asset bundle
    Provision { bundle: PathBuf },
}

/// Stderr logger in the device log layout: `I (lv_fs): message`.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => 'E',
            Level::Warn => 'W',
            Level::Info => 'I',
            Level::Debug => 'D',
            Level::Trace => 'V',
        };
        eprintln!("{} ({}): {}", tag, record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn load_config(path: Option<&PathBuf>) -> FsResult<VolumeConfig> {
    match path {
        Some(path) => VolumeConfig::from_json(&std::fs::read_to_string(path)?),
        None => Ok(VolumeConfig::default()),
    }
}

/// Run one command to completion. Blocking, like the driver itself.
fn run(command: Command, storage: HostStorage, config: &VolumeConfig) -> FsResult<()> {
    match command {
        Command::Info => {
            let mut storage = storage;
            mount_volume(&mut storage, config)?;
            let usage = storage.info(config.partition_label.as_deref())?;
            println!("volume   {}: -> {}", config.letter, config.mount_point);
            println!("host     {}", storage.root().display());
            println!("total    {} bytes", usage.total);
            println!("used     {} bytes", usage.used);
        }
        Command::Provision { bundle } => {
            let mut storage = storage;
            mount_volume(&mut storage, config)?;
            let bundle = load_bundle_from_path(&bundle)?;
            let mut port = PortFs::new(storage, config);
            let count = install_bundle(&mut port, &bundle)?;
            println!("installed {} files from {:?}", count, bundle.manifest.name);
        }
        Command::Ls { path } => {
            let mut table = DriverTable::new();
            init(storage, config, &mut table)?;
            for name in table.list_dir(&path)? {
                println!("{}", name);
            }
        }
        Command::Cat { path } => {
            let mut table = DriverTable::new();
            init(storage, config, &mut table)?;
            let data = table.read_to_end(&path)?;
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(&data)?;
            handle.flush()?;
        }
        Command::Put { source, dest } => {
            let data = std::fs::read(&source)?;
            let mut table = DriverTable::new();
            init(storage, config, &mut table)?;
            table.write_all(&dest, &data)?;
            eprintln!("wrote {} bytes to {}", data.len(), dest);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(args.config.as_ref())?;
    let storage = HostStorage::new(args.root, args.capacity);
    let command = args.command;

    // The driver is synchronous; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || run(command, storage, &config)).await?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return Err(e.into());
    }
    Ok(())
}
