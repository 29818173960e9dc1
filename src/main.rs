use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use zeroize::Zeroize;

use facelock::access::{
    AccessLog, AccessStateMachine, CancellationToken, FeatureExtractor, FrameSource, Monitor,
    MonitorEvent,
};
use facelock::config::GateConfig;
use facelock::custodian::{CustodianState, SecretCustodian};
use facelock::error::VaultResult;
use facelock::secure_memory::SecureString;
use facelock::vault::{EncodingVault, FeatureVector, TemplateMeta};

#[derive(Parser)]
#[command(name = "facelock")]
#[command(about = "Face-recognition console lock: admin panel and access monitor")]
#[command(
    long_about = "Face-recognition console lock: admin panel and access monitor.\n\n\
    Passwords are read one per line from standard input and are NOT masked: \
    the terminal echoes what is typed. Run on a private console or pipe the \
    password in."
)]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set the administrator password for the first time (input is echoed)
    Setup,
    /// Check the administrator password (input is echoed)
    Verify,
    /// Replace the administrator password (input is echoed)
    ChangePassword,
    /// Register or replace a face template
    Register {
        name: String,
        /// JSON array of floats holding the face encoding
        #[arg(long)]
        vector: PathBuf,
    },
    /// List registered users
    Users,
    /// Delete a registered user
    Delete { name: String },
    /// Show the access log
    Logs,
    /// Empty the access log
    ClearLogs,
    /// Show configuration state
    Status,
    /// Run the access monitor over recorded frames
    Replay {
        /// JSON array of frames, each an array of face encodings
        frames: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<GateConfig> {
    let mut config = match &cli.config {
        Some(path) => GateConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => GateConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Read one line from stdin; the terminal still echoes it
fn read_secret(prompt: &str) -> Option<SecureString> {
    eprint!("{}", prompt);
    io::stderr().flush().ok()?;
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            let entry = SecureString::from(line.trim_end_matches(['\r', '\n']));
            line.zeroize();
            Some(entry)
        }
    }
}

fn setup_prompt() -> Option<(SecureString, SecureString)> {
    eprintln!("No administrator password is set.");
    let password = read_secret("New administrator password: ")?;
    let confirmation = read_secret("Confirm password: ")?;
    Some((password, confirmation))
}

fn authenticate(custodian: &SecretCustodian) -> Result<()> {
    let mut prompt = |attempts_left: u32| {
        read_secret(&format!("Administrator password ({} attempts left): ", attempts_left))
    };
    if !custodian.ensure_and_verify(setup_prompt, &mut prompt)? {
        bail!("administrator authentication failed");
    }
    Ok(())
}

fn read_vector(path: &Path) -> Result<FeatureVector> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading face encoding from {}", path.display()))?;
    let values: Vec<f64> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of numbers", path.display()))?;
    Ok(FeatureVector::new(values))
}

/// Frames recorded as JSON, replayed in order
struct RecordedFrames(VecDeque<Vec<FeatureVector>>);

impl FrameSource for RecordedFrames {
    type Frame = Vec<FeatureVector>;

    fn next_frame(&mut self) -> VaultResult<Option<Self::Frame>> {
        Ok(self.0.pop_front())
    }
}

/// Recorded frames already hold encodings
struct Precomputed;

impl FeatureExtractor for Precomputed {
    type Frame = Vec<FeatureVector>;

    fn extract_features(&mut self, frame: &Self::Frame) -> VaultResult<Vec<FeatureVector>> {
        Ok(frame.clone())
    }
}

fn replay(config: &GateConfig, frames_path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(frames_path)
        .with_context(|| format!("reading frames from {}", frames_path.display()))?;
    let frames: Vec<Vec<FeatureVector>> =
        serde_json::from_str(&text).context("frames must be an array of arrays of encodings")?;

    let report = EncodingVault::new(config).load_all()?;
    if report.corrupt_count() > 0 {
        eprintln!("Warning: {} template(s) could not be decrypted", report.corrupt_count());
    }

    let machine =
        AccessStateMachine::new(report.templates, config.tolerance, config.grace_seconds);
    let (tx, rx) = mpsc::channel();
    let mut monitor = Monitor::new(RecordedFrames(frames.into()), Precomputed, machine, tx)
        .with_access_log(AccessLog::new(config.access_log_path()));

    let token = CancellationToken::new();
    let worker = thread::spawn(move || monitor.run(&token));

    for event in rx {
        match event {
            MonitorEvent::Unlocked { identity, at } => {
                println!("{}  unlocked by {}", at.format("%H:%M:%S%.3f"), identity)
            }
            MonitorEvent::Locked { at } => println!("{}  locked", at.format("%H:%M:%S%.3f")),
            MonitorEvent::Stopped { final_state } => println!("stopped ({:?})", final_state),
        }
    }

    if worker.join().is_err() {
        bail!("monitor thread panicked");
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("facelock=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let custodian = SecretCustodian::new(&config);
    let vault = EncodingVault::new(&config);
    let access_log = AccessLog::new(config.access_log_path());

    match &cli.command {
        Commands::Setup => {
            if custodian.state()? == CustodianState::Configured {
                bail!("an administrator password is already set; use change-password");
            }
            let (password, confirmation) = setup_prompt().context("setup cancelled")?;
            custodian.initialize_confirmed(password.as_str(), confirmation.as_str())?;
            println!("Administrator password set.");
        }
        Commands::Verify => {
            authenticate(&custodian)?;
            println!("Password correct.");
        }
        Commands::ChangePassword => {
            let old = read_secret("Current password: ").context("cancelled")?;
            let new = read_secret("New password: ").context("cancelled")?;
            let confirmation = read_secret("Confirm new password: ").context("cancelled")?;
            if new.as_str() != confirmation.as_str() {
                bail!("new passwords do not match");
            }
            custodian.rotate(old.as_str(), new.as_str())?;
            println!("Password changed.");
        }
        Commands::Register { name, vector } => {
            authenticate(&custodian)?;
            let encoding = read_vector(vector)?;
            let mut meta = TemplateMeta::new();
            meta.insert(
                "registered_at".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
            vault.register_with_meta(name, &encoding, meta)?;
            println!("Registered {}.", name);
        }
        Commands::Users => {
            authenticate(&custodian)?;
            for identity in vault.list_identities()? {
                println!("{}", identity);
            }
        }
        Commands::Delete { name } => {
            authenticate(&custodian)?;
            if vault.delete(name)? {
                println!("Deleted {}.", name);
            } else {
                println!("No user named {}.", name);
            }
        }
        Commands::Logs => {
            authenticate(&custodian)?;
            for entry in access_log.entries()? {
                println!("{}  {}", entry.time, entry.user);
            }
        }
        Commands::ClearLogs => {
            authenticate(&custodian)?;
            access_log.clear()?;
            println!("Access log cleared.");
        }
        Commands::Status => {
            let state = match custodian.state() {
                Ok(CustodianState::Configured) => "configured".to_string(),
                Ok(CustodianState::Unconfigured) => "not configured".to_string(),
                Err(e) => format!("inconsistent ({})", e.user_friendly_message()),
            };
            println!("data directory:  {}", config.data_dir.display());
            println!("admin password:  {}", state);
            println!("registered users: {}", vault.list_identities()?.len());
            println!("log entries:     {}", access_log.entries()?.len());
        }
        Commands::Replay { frames } => {
            replay(&config, frames)?;
        }
    }

    Ok(())
}
