use clap::Parser;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info, warn};
use vi_binder::config::RcLoader;
use vi_binder::document_model::{TextBuffer, default_clipboard};
use vi_binder::host::StatusMessage;
use vi_binder::keys::parse_keys;
use vi_binder::{CommandHandler, HostRequest, Session};

/// Runs vi key sequences and ex commands against a file, without a terminal UI.
#[derive(Parser, Debug)]
#[command(name = "vi-binder", version)]
struct Args {
    /// File to edit; created on `:w` when missing
    file: PathBuf,

    /// Key sequence to type in Normal mode, e.g. `dd` or `3x<Esc>` (repeatable)
    #[arg(short, long = "keys", value_name = "KEYS")]
    keys: Vec<String>,

    /// Ex command to run after the key sequences, e.g. `%s/a/b/g` (repeatable)
    #[arg(short = 'c', long = "command", value_name = "EXCMD")]
    commands: Vec<String>,

    /// Settings file to read instead of the default rc file
    #[arg(long, value_name = "PATH")]
    rc: Option<PathBuf>,

    /// Print the resulting text to stdout
    #[arg(long)]
    print: bool,
}

/// Status messages go to stderr, warnings marked.
struct StderrStatus;

impl StatusMessage for StderrStatus {
    fn show(&mut self, message: &str, _timeout_ms: u64, is_warning: bool) {
        if is_warning {
            eprintln!("warning: {}", message);
        } else {
            eprintln!("{}", message);
        }
    }
}

enum Step {
    Keys(String),
    Ex(String),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let args = Args::parse();

    let settings = match &args.rc {
        Some(path) => RcLoader::load_from(path)?,
        None => RcLoader::load_config(),
    };
    let mut buffer = TextBuffer::open(&args.file)?;
    let mut session = Session::builder()
        .settings(settings)
        .clipboard(default_clipboard())
        .status(Box::new(StderrStatus))
        .build();
    session.apply_settings(&mut buffer);
    info!("editing {}", args.file.display());

    let steps = args
        .keys
        .iter()
        .cloned()
        .map(Step::Keys)
        .chain(args.commands.iter().cloned().map(Step::Ex));

    'run: for step in steps {
        match step {
            Step::Keys(text) => {
                for key in parse_keys(&text)? {
                    session.handle_keypress(&mut buffer, key);
                }
            }
            Step::Ex(line) => session.run_ex_command(&mut buffer, &line),
        }

        for request in session.take_requests() {
            match request {
                HostRequest::Write => {
                    buffer.save_to(&args.file)?;
                    info!("wrote {}", args.file.display());
                }
                HostRequest::Quit { force } => {
                    debug!("quit (force: {})", force);
                    break 'run;
                }
                HostRequest::Shell(cmd) => {
                    let status = Command::new("sh").arg("-c").arg(&cmd).status()?;
                    if !status.success() {
                        warn!("shell command {:?} exited with {}", cmd, status);
                    }
                }
                HostRequest::Highlight(_) | HostRequest::ClearHighlight => {}
            }
        }
    }

    if args.print {
        print!("{}", buffer.contents_for_save());
    }
    Ok(())
}
