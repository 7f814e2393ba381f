use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use richmark_config::Config;
use richmark_engine::document::Document;
use richmark_engine::overlay::grid::InputMode;
use richmark_engine::{Editor, FileStorage, OutputView, PersistOutcome, StaticIdentity};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "richmark", version, about = "Rich-text editing surface with Markdown export")]
struct Cli {
    /// Storage directory, overriding the config file
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Signed-in user, overriding the config file
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the export of a markup file
    Export {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
    },
    /// Store a markup file in the document slot
    Save { file: PathBuf },
    /// Print the document stored in the slot
    Load {
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
    },
    /// Print toolbar state with the caret at the start of a markup file
    Toolbar { file: PathBuf },
    /// Write a config file
    Init {
        storage_path: PathBuf,
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Canonical,
    Markdown,
}

impl From<Format> for OutputView {
    fn from(format: Format) -> Self {
        match format {
            Format::Canonical => OutputView::Html,
            Format::Markdown => OutputView::Markdown,
        }
    }
}

/// Where the document slot lives and who is signed in.
#[derive(Debug)]
struct Session {
    storage: FileStorage,
    identity: StaticIdentity,
}

impl Session {
    fn resolve(cli_storage: Option<PathBuf>, cli_user: Option<String>) -> Result<Self> {
        let config = match Config::load() {
            Ok(config) => config,
            Err(e) if cli_storage.is_some() => {
                log::warn!("Ignoring config file: {e}");
                None
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_parts(cli_storage, cli_user, config)
    }

    fn from_parts(
        cli_storage: Option<PathBuf>,
        cli_user: Option<String>,
        config: Option<Config>,
    ) -> Result<Self> {
        let (config_storage, config_user) = match config {
            Some(config) => (Some(config.storage_path), config.user),
            None => (None, None),
        };
        let Some(storage_path) = cli_storage.or(config_storage) else {
            bail!(
                "No storage directory given and no config file found. \
                 Pass --storage or run `richmark init` to create {}",
                Config::config_path().display()
            );
        };
        log::info!("Using storage directory {}", storage_path.display());
        Ok(Self {
            storage: FileStorage::new(storage_path),
            identity: StaticIdentity::from_user(cli_user.or(config_user)),
        })
    }
}

fn open(file: &Path) -> Result<Editor<Document>> {
    let markup = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(Editor::with_engine(
        Document::from_markup(&markup),
        InputMode::Pointer,
    ))
}

fn export(file: &Path, format: Format) -> Result<String> {
    let mut editor = open(file)?;
    editor.set_view(format.into());
    Ok(editor.output().to_string())
}

fn save(file: &Path, session: &mut Session) -> Result<String> {
    let mut editor = open(file)?;
    match editor.save(&session.identity, &mut session.storage)? {
        PersistOutcome::NotSignedIn => bail!("Sign in to save: pass --user or set `user` in the config"),
        _ => Ok(notification_text(&editor)),
    }
}

fn load(session: &Session, format: Format) -> Result<String> {
    let mut editor = Editor::with_engine(Document::new(), InputMode::Pointer);
    match editor.load(&session.identity, &session.storage)? {
        PersistOutcome::NotSignedIn => bail!("Sign in to load: pass --user or set `user` in the config"),
        PersistOutcome::NothingStored => Ok(notification_text(&editor)),
        PersistOutcome::Done => {
            editor.set_view(format.into());
            Ok(editor.output().to_string())
        }
    }
}

fn notification_text(editor: &Editor<Document>) -> String {
    editor
        .notification()
        .map(|notification| notification.message.clone())
        .unwrap_or_default()
}

fn toolbar(file: &Path) -> Result<String> {
    Ok(open(file)?.toolbar().to_string())
}

fn init(storage_path: PathBuf, user: Option<String>, config_path: &Path) -> Result<String> {
    let mut config = Config::new(storage_path);
    config.user = user;
    config.save_to_path(config_path)?;
    Ok(format!("Wrote {}", config_path.display()))
}

fn run(cli: Cli) -> Result<String> {
    match cli.command {
        Command::Export { file, format } => export(&file, format),
        Command::Toolbar { file } => toolbar(&file),
        Command::Init { storage_path, user } => init(storage_path, user, &Config::config_path()),
        Command::Save { file } => {
            let mut session = Session::resolve(cli.storage, cli.user)?;
            save(&file, &mut session)
        }
        Command::Load { format } => {
            let session = Session::resolve(cli.storage, cli.user)?;
            load(&session, format)
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let output = run(Cli::parse())?;
    println!("{output}");
    Ok(())
}
