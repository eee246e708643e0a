//! Packfs CLI - inspect and manipulate a mounted virtual tree
//!
//! Mount one or more sources, then run a single command against the
//! resulting virtual file system:
//!
//! ```text
//! packfs -m ./assets -m ./patch::patch ls patch
//! packfs -m ./assets cat themeinfo.txt
//! packfs -w ./save write slot0.txt "checkpoint 3"
//! ```

use clap::{Parser, Subcommand};
use packfs_core::{
    DirBackend, FileStream, FileType, InitGuard, LoggedBackend, OpenMode, PackResult,
};
use std::io::{Read, Write};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "packfs",
    about = "Virtual file system shell - mount directories and inspect the merged tree",
    version = "0.1.0"
)]
struct Cli {
    /// Mount a directory, optionally at a mount point: TARGET or TARGET::POINT
    #[arg(short = 'm', long = "mount", value_name = "TARGET[::POINT]")]
    mounts: Vec<String>,

    /// Directory receiving writes, removals and mkdir
    #[arg(short = 'w', long = "write-dir", value_name = "DIR")]
    write_dir: Option<String>,

    /// Log every backend operation
    #[arg(long)]
    log_vfs: bool,

    /// Verbose diagnostics (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show search paths, write dir and platform directories
    Info,
    /// List a virtual directory
    Ls { path: String },
    /// Print a virtual file to stdout
    Cat { path: String },
    /// Show metadata for a virtual path
    Stat { path: String },
    /// Write text to a file in the write dir
    Write { path: String, text: String },
    /// Append text to a file in the write dir
    Append { path: String, text: String },
    /// Remove a file or empty directory from the write dir
    Rm { path: String },
    /// Create a directory tree in the write dir
    Mkdir { path: String },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let _fs = match InitGuard::new() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = setup(&cli).and_then(|_| run(&cli.command)) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Apply mounts and the write dir from the command line.
fn setup(cli: &Cli) -> PackResult<()> {
    for spec in &cli.mounts {
        let (target, point) = match spec.split_once("::") {
            Some((target, point)) => (target, Some(point)),
            None => (spec.as_str(), None),
        };
        if cli.log_vfs {
            let backend = Arc::new(LoggedBackend::new(Arc::new(DirBackend::new(target))));
            packfs_core::mount_backend(target, backend, point, true)?;
        } else {
            packfs_core::mount(target, point, true)?;
        }
    }
    if let Some(dir) = &cli.write_dir {
        packfs_core::set_write_dir(dir)?;
    }
    Ok(())
}

fn run(command: &Command) -> PackResult<()> {
    match command {
        Command::Info => {
            println!("base dir:  {}", packfs_core::base_dir()?);
            println!(
                "write dir: {}",
                packfs_core::write_dir()?.unwrap_or_else(|| "(writing disabled)".to_string())
            );
            for source in packfs_core::search_paths()? {
                let point = packfs_core::mount_point_of(&source)?;
                let point = if point.is_empty() { "/" } else { &point };
                println!("mount:     {source} -> {point}");
            }
            Ok(())
        }
        Command::Ls { path } => {
            for name in packfs_core::enumerate(path)? {
                println!("{name}");
            }
            Ok(())
        }
        Command::Cat { path } => {
            let mut stream = FileStream::open(path, OpenMode::Read)?;
            let mut content = Vec::new();
            stream
                .read_to_end(&mut content)
                .map_err(|e| packfs_core::PackError::Io {
                    path: path.clone(),
                    source: e,
                })?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let _ = out.write_all(&content);
            Ok(())
        }
        Command::Stat { path } => {
            let stat = packfs_core::stat(path)?;
            let kind = match stat.file_type {
                FileType::Regular => "file",
                FileType::Directory => "directory",
                FileType::Symlink => "symlink",
                FileType::Other => "other",
            };
            println!("path:      {path}");
            println!("type:      {kind}");
            println!("size:      {}", stat.size);
            println!("read-only: {}", stat.read_only);
            if let Some(modified) = stat.modified {
                println!("modified:  {modified}");
            }
            if let Ok(source) = packfs_core::real_dir(path) {
                println!("source:    {source}");
            }
            Ok(())
        }
        Command::Write { path, text } => write_text(path, text, OpenMode::Write),
        Command::Append { path, text } => write_text(path, text, OpenMode::Append),
        Command::Rm { path } => packfs_core::remove(path),
        Command::Mkdir { path } => packfs_core::make_dir(path),
    }
}

fn write_text(path: &str, text: &str, mode: OpenMode) -> PackResult<()> {
    let mut stream = FileStream::open(path, mode)?;
    stream
        .write_all(text.as_bytes())
        .and_then(|_| stream.write_all(b"\n"))
        .map_err(|e| packfs_core::PackError::Io {
            path: path.to_string(),
            source: e,
        })?;
    stream.close()
}
