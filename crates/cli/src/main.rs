use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use margin_anchor::{capture_context, locate, Document, TextSource};
use margin_store::{
    discover_workspace_root, AnnotationStore, FileNotes, RootResolver, StoreConfig,
    WorkspaceResolver, DEFAULT_SIDECAR_FILENAME,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod render;

use config::{resolve_author, FileConfig, SortOrder, CONFIG_FILENAME};

#[derive(Parser)]
#[command(name = "margin")]
#[command(about = "Line-anchored annotations that survive edits", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Workspace root (default: discovered from the target path upward)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file (default: <root>/.margin.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach an annotation to a line (empty text deletes)
    Add(AddArgs),

    /// Remove the annotation at a line
    Remove(RemoveArgs),

    /// List every annotation in the workspace
    List(ListArgs),

    /// Show a file's annotations at their current positions
    Show(ShowArgs),

    /// Re-anchor a file's annotations and persist drifted line numbers
    Sync(SyncArgs),

    /// Move a file's annotations to a new path (after a rename)
    #[command(name = "move")]
    Move(MoveArgs),
}

#[derive(Args)]
struct AddArgs {
    /// File to annotate
    file: PathBuf,

    /// Line number (1-based)
    #[arg(short, long)]
    line: u32,

    /// Annotation text
    #[arg(short = 'm', long)]
    text: String,

    /// Capture the context snapshot from lines LINE..=END instead of the
    /// single target line (stands in for an editor selection)
    #[arg(long)]
    end: Option<u32>,

    /// Author identity (default: config, then $USER)
    #[arg(long)]
    author: Option<String>,
}

#[derive(Args)]
struct RemoveArgs {
    /// File holding the annotation
    file: PathBuf,

    /// Line number (1-based)
    #[arg(short, long)]
    line: u32,
}

#[derive(Args)]
struct ListArgs {
    /// Only show annotations whose path or text contains this string
    #[arg(long)]
    filter: Option<String>,

    /// Sort files alphabetically or by most recent annotation
    #[arg(long, value_enum)]
    sort: Option<SortOrder>,
}

#[derive(Args)]
struct ShowArgs {
    /// File whose annotations to show
    file: PathBuf,
}

#[derive(Args)]
struct SyncArgs {
    /// File whose annotations to reconcile
    file: PathBuf,
}

#[derive(Args)]
struct MoveArgs {
    /// Old file path
    old: PathBuf,
    /// New file path
    new: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    match &cli.command {
        Commands::Add(args) => run_add(&cli, args).await,
        Commands::Remove(args) => run_remove(&cli, args).await,
        Commands::List(args) => run_list(&cli, args).await,
        Commands::Show(args) => run_show(&cli, args).await,
        Commands::Sync(args) => run_sync(&cli, args).await,
        Commands::Move(args) => run_move(&cli, args).await,
    }
}

/// Everything a command needs: the workspace root, the resolved
/// configuration, and a store scoped to that root.
struct Session {
    root: PathBuf,
    file_config: FileConfig,
    store_config: StoreConfig,
    resolver: Arc<RootResolver>,
    store: AnnotationStore,
}

impl Session {
    fn open(cli: &Cli, anchor_path: &Path) -> Result<Self> {
        let root = match &cli.root {
            Some(root) => absolute(root)?,
            None => {
                let start = absolute(anchor_path)?;
                discover_workspace_root(&start, DEFAULT_SIDECAR_FILENAME).ok_or_else(|| {
                    anyhow!(
                        "{} is not inside a workspace (no {} or .git found); pass --root",
                        anchor_path.display(),
                        DEFAULT_SIDECAR_FILENAME
                    )
                })?
            }
        };

        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| root.join(CONFIG_FILENAME));
        let file_config = FileConfig::load(&config_path)?;
        let store_config = file_config.to_store_config();
        store_config
            .validate()
            .map_err(|msg| anyhow!("Invalid configuration: {msg}"))?;

        log::debug!("workspace root: {}", root.display());
        let resolver = Arc::new(RootResolver::single(root.clone()));
        let store = AnnotationStore::new(
            store_config.clone(),
            Arc::clone(&resolver) as Arc<dyn WorkspaceResolver>,
        );
        Ok(Self {
            root,
            file_config,
            store_config,
            resolver,
            store,
        })
    }

    /// Store key for a file, erroring when it lies outside the workspace.
    fn relative(&self, file: &Path) -> Result<String> {
        let file = absolute(file)?;
        self.resolver
            .resolve(&file)
            .map(|ws| ws.relative)
            .ok_or_else(|| {
                anyhow!(
                    "{} is outside the workspace {}",
                    file.display(),
                    self.root.display()
                )
            })
    }

    /// Any path inside the workspace keys the whole store; the sidecar
    /// itself is the one file guaranteed to be there.
    fn store_key_path(&self) -> PathBuf {
        self.root.join(&self.store_config.sidecar_filename)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

async fn read_document(file: &Path) -> Result<Document> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(Document::new(&content))
}

async fn run_add(cli: &Cli, args: &AddArgs) -> Result<()> {
    if args.line == 0 {
        bail!("Line numbers are 1-based");
    }
    let session = Session::open(cli, &args.file)?;
    let file = absolute(&args.file)?;
    let doc = read_document(&file).await?;

    let target = (args.line - 1) as usize;
    if target >= doc.line_count() {
        bail!(
            "{} has only {} line(s)",
            file.display(),
            doc.line_count()
        );
    }

    let selection = match args.end {
        Some(end) => {
            if end < args.line || (end as usize) > doc.line_count() {
                bail!("--end must be between --line and the last line");
            }
            Some(doc.range_text(target, (end - 1) as usize))
        }
        None => None,
    };
    let context = capture_context(&doc, target, selection.as_deref());
    let author = resolve_author(args.author.as_deref(), &session.store_config);

    // Editing in place: when an existing annotation's anchor resolves to the
    // target line under a different key, drop the stale key so the upsert
    // does not leave a duplicate behind.
    let rel = session.relative(&file)?;
    let existing = session.store.load(&file).await?;
    if let Some(notes) = existing.files.get(&rel) {
        for (&key, note) in notes {
            let found = locate(
                &doc,
                key as usize,
                &note.context,
                session.store_config.search_radius,
            );
            if found.line == target && key as usize != target {
                session.store.save(&file, key, "", &author, "").await?;
                break;
            }
        }
    }

    let changed = session
        .store
        .save(&file, target as u32, &args.text, &author, &context)
        .await?;

    if session.store_config.auto_sync_on_save {
        session.store.reconcile(&file, &doc).await?;
    }

    if args.text.is_empty() {
        println!(
            "{}",
            if changed {
                "Annotation removed."
            } else {
                "Nothing to remove."
            }
        );
    } else {
        println!("Annotated {}:{}.", rel, args.line);
    }
    Ok(())
}

async fn run_remove(cli: &Cli, args: &RemoveArgs) -> Result<()> {
    if args.line == 0 {
        bail!("Line numbers are 1-based");
    }
    let session = Session::open(cli, &args.file)?;
    let file = absolute(&args.file)?;

    let changed = session
        .store
        .save(&file, args.line - 1, "", "", "")
        .await?;
    println!(
        "{}",
        if changed {
            "Annotation removed."
        } else {
            "Nothing to remove."
        }
    );
    Ok(())
}

async fn run_list(cli: &Cli, args: &ListArgs) -> Result<()> {
    let anchor = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir()?,
    };
    let session = Session::open(cli, &anchor)?;
    let store = session.store.load(&session.store_key_path()).await?;
    if store.is_empty() {
        println!("No annotations yet.");
        return Ok(());
    }

    let filter = args.filter.as_deref().map(str::to_lowercase);
    let mut files: Vec<(&String, &FileNotes)> = store
        .files
        .iter()
        .filter(|(rel, notes)| match &filter {
            Some(needle) => {
                rel.to_lowercase().contains(needle)
                    || notes
                        .values()
                        .any(|n| n.text.to_lowercase().contains(needle))
            }
            None => true,
        })
        .collect();

    match args.sort.unwrap_or_else(|| session.file_config.sort_order()) {
        SortOrder::Alpha => files.sort_by_key(|(rel, _)| rel.to_string()),
        SortOrder::Date => {
            files.sort_by_key(|(_, notes)| {
                std::cmp::Reverse(notes.values().map(|n| n.updated_at).max().unwrap_or(0))
            });
        }
    }

    for (rel, notes) in files {
        println!("{}", render::file_heading(rel, notes.len()));
        // Re-anchor against the file's current content when it still
        // exists; otherwise trust the stored positions.
        let doc = read_document(&session.root.join(rel)).await.ok();
        let mut resolved: Vec<(usize, &margin_store::Note, bool)> = notes
            .iter()
            .map(|(&line, note)| match &doc {
                Some(doc) => {
                    let found = locate(
                        doc,
                        line as usize,
                        &note.context,
                        session.store_config.search_radius,
                    );
                    (found.line, note, found.is_match)
                }
                None => (line as usize, note, true),
            })
            .collect();
        resolved.sort_by_key(|(line, _, _)| *line);
        for (line, note, is_match) in resolved {
            println!("{}", render::note_line(line, note, is_match));
        }
    }
    Ok(())
}

async fn run_show(cli: &Cli, args: &ShowArgs) -> Result<()> {
    let session = Session::open(cli, &args.file)?;
    let file = absolute(&args.file)?;
    let rel = session.relative(&file)?;

    let store = session.store.load(&file).await?;
    let Some(notes) = store.files.get(&rel) else {
        println!("No annotations in {rel}.");
        return Ok(());
    };

    let doc = read_document(&file).await?;
    println!("{}", render::file_heading(&rel, notes.len()));
    let mut resolved: Vec<(usize, &margin_store::Note, bool)> = notes
        .iter()
        .map(|(&line, note)| {
            let found = locate(
                &doc,
                line as usize,
                &note.context,
                session.store_config.search_radius,
            );
            (found.line, note, found.is_match)
        })
        .collect();
    resolved.sort_by_key(|(line, _, _)| *line);
    for (line, note, is_match) in resolved {
        println!("{}", render::note_line(line, note, is_match));
    }
    Ok(())
}

async fn run_sync(cli: &Cli, args: &SyncArgs) -> Result<()> {
    let session = Session::open(cli, &args.file)?;
    let file = absolute(&args.file)?;
    let doc = read_document(&file).await?;

    let changed = session.store.reconcile(&file, &doc).await?;
    println!(
        "{}",
        if changed {
            "Annotations synchronized."
        } else {
            "Already in sync."
        }
    );
    Ok(())
}

async fn run_move(cli: &Cli, args: &MoveArgs) -> Result<()> {
    let session = Session::open(cli, &args.old)?;
    let old = absolute(&args.old)?;
    let new = absolute(&args.new)?;

    let changed = session.store.rename(&old, &new).await?;
    println!(
        "{}",
        if changed {
            "Annotations moved."
        } else {
            "Nothing to move."
        }
    );
    Ok(())
}
