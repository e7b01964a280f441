#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::cast_precision_loss
)]

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use ftp_transfer::{
    AsyncTransferManager, FtpTransferManager, FtpTransferPlugin, FtpTransferSettings, LocalCache,
    RemoteFile, RemoteFileType,
};

type Manager = AsyncTransferManager<FtpTransferManager>;

/// Prompts for the password when the settings carry none
fn ensure_password(settings: &mut FtpTransferSettings) -> Result<()> {
    if settings.password.is_empty() {
        match rpassword::prompt_password(format!("Password for {}@{}: ", settings.username, settings.hostname)) {
            Ok(password) => settings.password = password,
            Err(_) => {
                let mut password = String::new();
                std::io::stdin().read_line(&mut password)?;
                settings.password = password.trim().to_string();
            }
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(author, version, about = "Use an FTP folder as a sync repository", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the FTP repository
    Config {
        #[arg(long)]
        hostname: Option<String>,

        #[arg(long)]
        username: Option<String>,

        /// Remote repository folder
        #[arg(long)]
        path: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    #[command(flatten)]
    Repo(RepoCommand),
}

#[derive(Subcommand)]
enum RepoCommand {
    /// Create the repository folder layout
    Init {
        /// Create the repository folder if it does not exist
        #[arg(long)]
        create: bool,
    },

    /// Check whether the target can hold a repository
    Test {
        /// Check that the repository folder could be created
        #[arg(long)]
        create_target: bool,
    },

    /// Upload files into a category folder
    Upload {
        /// File category (multichunk, database, action, ...)
        #[arg(short = 't', long = "type")]
        file_type: RemoteFileType,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Download a remote file
    Download {
        #[arg(short = 't', long = "type")]
        file_type: RemoteFileType,

        name: String,

        /// Local destination directory
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,
    },

    /// List the files of a category
    List {
        #[arg(short = 't', long = "type")]
        file_type: RemoteFileType,

        /// Only show names matching the category's naming scheme
        #[arg(long)]
        strict: bool,
    },

    /// Delete a remote file
    Delete {
        #[arg(short = 't', long = "type")]
        file_type: RemoteFileType,

        name: String,
    },

    /// Rename a remote file within a category
    Move {
        #[arg(short = 't', long = "type")]
        file_type: RemoteFileType,

        source: String,

        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings_path = cli
        .settings
        .or_else(FtpTransferSettings::default_path)
        .ok_or_else(|| anyhow!("Cannot determine the settings location, pass --settings"))?;

    match cli.command {
        Commands::Config {
            hostname,
            username,
            path,
            port,
        } => configure(&settings_path, hostname, username, path, port),
        Commands::Repo(command) => {
            let manager = open_manager(&settings_path)?;
            let result = run(command, &manager).await;
            manager.disconnect().await;
            result
        }
    }
}

async fn run(command: RepoCommand, manager: &Manager) -> Result<()> {
    match command {
        RepoCommand::Init { create } => {
            let spinner = spinner("Initializing repository...");
            let result = manager.init(create, RemoteFile::repo_file()).await;
            spinner.finish_and_clear();
            result?;
            println!("✓ Repository folders are in place");
        }
        RepoCommand::Test { create_target } => {
            let spinner = spinner("Testing target...");
            let result = manager.test(create_target).await;
            spinner.finish_and_clear();

            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.can_connect_to_repo() {
                println!("\nTarget holds a repository.");
            } else if result.can_init() {
                println!("\nTarget can be initialized.");
            } else {
                println!("\nTarget cannot be used.");
            }
        }
        RepoCommand::Upload { file_type, files } => {
            let mut successful = 0;
            let mut failed = 0;

            for file in files {
                match upload_one(manager, file_type, &file).await {
                    Ok(remote) => {
                        println!("✓ {:?} → {}", file, remote);
                        successful += 1;
                    }
                    Err(e) => {
                        println!("✗ {:?}: {:#}", file, e);
                        failed += 1;
                    }
                }
            }

            println!("\nUpload complete: {} successful, {} failed", successful, failed);
        }
        RepoCommand::Download {
            file_type,
            name,
            dest,
        } => {
            let remote = RemoteFile::new(file_type, name.as_str())?;
            tokio::fs::create_dir_all(&dest).await?;
            let local = dest.join(&name);

            let spinner = spinner(&format!("Downloading {}", remote));
            let result = manager.download(remote, local.clone()).await;
            spinner.finish_and_clear();
            result?;

            println!("✓ Downloaded to {:?}", local);
        }
        RepoCommand::List { file_type, strict } => {
            let mut names: Vec<String> = if strict {
                manager.list(file_type, file_type.factory()).await?
            } else {
                manager
                    .list(file_type, move |name: &str| RemoteFile::new(file_type, name))
                    .await?
            }
            .into_iter()
            .map(|file| file.name().to_string())
            .collect();
            names.sort();

            println!("{} files ({}):", file_type, names.len());
            for name in names {
                println!("  {}", name);
            }
        }
        RepoCommand::Delete { file_type, name } => {
            let remote = RemoteFile::new(file_type, name)?;
            if manager.delete(remote.clone()).await? {
                println!("✓ {} is gone", remote);
            } else {
                println!("✗ {} could not be deleted", remote);
            }
        }
        RepoCommand::Move {
            file_type,
            source,
            target,
        } => {
            let source = RemoteFile::new(file_type, source)?;
            let target = RemoteFile::new(file_type, target)?;
            manager.move_file(source.clone(), target.clone()).await?;
            println!("✓ {} → {}", source, target);
        }
    }

    Ok(())
}

fn configure(
    settings_path: &Path,
    hostname: Option<String>,
    username: Option<String>,
    path: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut settings = FtpTransferSettings::load(settings_path)?;

    if let Some(hostname) = hostname {
        settings.hostname = hostname;
    }
    if let Some(username) = username {
        settings.username = username;
    }
    if let Some(path) = path {
        settings.path = path;
    }
    if let Some(port) = port {
        settings.port = port;
    }

    settings.save(settings_path)?;
    println!("Settings saved to {:?}", settings_path);
    println!("{}", settings);

    if let Err(e) = settings.validate() {
        println!("\n⚠ Settings are incomplete: {}", e);
        println!("\nRecognized options:");
        for property in FtpTransferSettings::properties() {
            println!(
                "  {:<10} {}{}",
                property.name,
                property.label,
                if property.required { " (required)" } else { "" }
            );
        }
    }
    Ok(())
}

fn open_manager(settings_path: &Path) -> Result<Manager> {
    let mut settings = FtpTransferSettings::load(settings_path)?;
    settings
        .validate()
        .context("Run `ftp-transfer config` to set up the repository first")?;
    ensure_password(&mut settings)?;

    let plugin = FtpTransferPlugin::new();
    tracing::debug!(plugin = plugin.id(), version = plugin.version(), %settings, "opening transfer manager");

    let manager = plugin.create_transfer_manager(&settings, Arc::new(LocalCache::system()))?;
    Ok(AsyncTransferManager::new(manager))
}

async fn upload_one(manager: &Manager, file_type: RemoteFileType, file: &Path) -> Result<RemoteFile> {
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("File name is not valid UTF-8"))?;
    let remote = RemoteFile::new(file_type, name)?;

    let size = tokio::fs::metadata(file)
        .await
        .with_context(|| format!("File not found: {:?}", file))?
        .len();

    let spinner = spinner(&format!("Uploading {} ({})", name, human_bytes::human_bytes(size as f64)));
    let result = manager.upload(file.to_path_buf(), remote.clone()).await;
    spinner.finish_and_clear();

    result?;
    Ok(remote)
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
