use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;

use tateyomi::config::{self, Config};
use tateyomi::input::InputSource;
use tateyomi::paginate::{PageSet, paginate};
use tateyomi::preset::PresetStore;
use tateyomi::render;
use tateyomi::watch::FileWatcher;

#[derive(Parser)]
#[command(
    name = "tateyomi",
    about = "Ruby-safe pagination for vertical Japanese reading",
    long_version = env!("TATEYOMI_LONG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Input markup file (use `-` for stdin)
    #[arg(global = true)]
    input: Option<PathBuf>,

    /// Maximum visible characters per page
    #[arg(long, global = true)]
    max_chars: Option<usize>,

    /// Visible characters repeated from the previous page
    #[arg(long, global = true)]
    overlap: Option<usize>,

    /// Visible characters per render chunk
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Log output file path (logs go to stderr otherwise, filtered by RUST_LOG)
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Show character and page statistics (default)
    Info,

    /// Print pages as JSON
    Pages {
        /// Only this page (1-based)
        #[arg(long)]
        page: Option<usize>,
    },

    /// Write each page as a vertical-text HTML file
    Render {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Page title (defaults to the input file name)
        #[arg(long)]
        title: Option<String>,

        /// Re-render whenever the input file changes
        #[arg(long)]
        watch: bool,
    },

    /// Manage saved style presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// List preset names
    List,
    /// Print one preset as JSON
    Get { name: String },
    /// Import presets from a JSON file (use `-` for stdin)
    Import { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log {
        let file = match std::fs::File::create(log_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Error: failed to open log file {}: {e}", log_path.display());
                std::process::exit(1);
            }
        };
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    } else {
        env_logger::init();
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Load config file and merge CLI overrides
    let mut cfg = config::load_config()?;
    cfg.merge_cli(cli.max_chars, cli.overlap, cli.chunk_size);
    let config = cfg.resolve()?;

    match cli.command.unwrap_or(Command::Info) {
        Command::Preset { action } => cmd_preset(action, &config),
        command => cmd_document(command, cli.input.as_deref(), &config),
    }
}

fn cmd_document(command: Command, input: Option<&Path>, config: &Config) -> Result<()> {
    let source =
        InputSource::from_arg(input).context("input file required (or pipe via stdin)")?;

    match command {
        Command::Info => {
            let page_set = load_pages(&source, config)?;
            print_info(&source, &page_set);
            Ok(())
        }
        Command::Pages { page } => {
            let page_set = load_pages(&source, config)?;
            let json = match page {
                Some(n) => {
                    let p = n
                        .checked_sub(1)
                        .and_then(|i| page_set.page(i))
                        .with_context(|| {
                            format!("page {n} is out of range (1-{})", page_set.page_count())
                        })?;
                    serde_json::to_string_pretty(p)?
                }
                None => serde_json::to_string_pretty(&page_set)?,
            };
            println!("{json}");
            Ok(())
        }
        Command::Render {
            output,
            title,
            watch,
        } => {
            let title = title.unwrap_or_else(|| source.display_name().to_string());
            cmd_render(&source, config, &output, &title)?;
            if watch {
                let path = source
                    .path()
                    .context("--watch needs an input file, not stdin")?;
                watch_and_render(path, &source, config, &output, &title)?;
            }
            Ok(())
        }
        Command::Preset { action } => cmd_preset(action, config),
    }
}

fn load_pages(source: &InputSource, config: &Config) -> Result<PageSet> {
    let markup = source
        .read_to_string()
        .with_context(|| format!("failed to read {}", source.display_name()))?;
    Ok(paginate(&markup, &config.pagination))
}

fn print_info(source: &InputSource, page_set: &PageSet) {
    println!("{}", source.display_name());
    println!("  visible characters: {}", page_set.total_visible_chars());
    println!(
        "  pages:              {} ({} with content)",
        page_set.page_count(),
        page_set.valid_page_count()
    );
    println!("  chars per page:     {}", page_set.chars_per_page());
    for page in page_set.pages() {
        println!(
            "  page {:>3}: {:>6} chars (overlap {}, chunks {})",
            page.index + 1,
            page.visible_char_count,
            page.overlap_range().len(),
            page.main.len()
        );
    }
}

fn cmd_render(source: &InputSource, config: &Config, output: &Path, title: &str) -> Result<()> {
    let pipeline_start = Instant::now();

    let markup = source
        .read_to_string()
        .with_context(|| format!("failed to read {}", source.display_name()))?;
    if markup.trim().is_empty() {
        bail!("input file is empty or contains only whitespace");
    }

    let page_set = paginate(&markup, &config.pagination);
    let files = render::write_pages(&page_set, output, source.stem(), title)?;

    info!(
        "cmd_render: total pipeline completed in {:.1}ms",
        pipeline_start.elapsed().as_secs_f64() * 1000.0
    );

    eprintln!(
        "rendered {} -> {} page(s):",
        source.display_name(),
        files.len()
    );
    for (path, chars) in &files {
        eprintln!("  {} ({} chars)", path.display(), chars);
    }
    Ok(())
}

fn watch_and_render(
    path: &Path,
    source: &InputSource,
    config: &Config,
    output: &Path,
    title: &str,
) -> Result<()> {
    let watcher = FileWatcher::new(path)?;
    eprintln!("watching {} (Ctrl-C to stop)", path.display());
    while watcher.wait_for_change(config.watch_interval) {
        info!("watch: {} changed, re-rendering", path.display());
        // a broken intermediate save should not end the watch
        if let Err(e) = cmd_render(source, config, output, title) {
            eprintln!("Error: {e:#}");
        }
    }
    Ok(())
}

fn cmd_preset(action: PresetAction, config: &Config) -> Result<()> {
    let mut store = PresetStore::load(&config.presets_path)?;
    match action {
        PresetAction::List => {
            for name in store.names() {
                println!("{name}");
            }
        }
        PresetAction::Get { name } => {
            let preset = store
                .get(&name)
                .with_context(|| format!("{name} is not saved"))?;
            println!("{}", serde_json::to_string_pretty(preset)?);
        }
        PresetAction::Import { file } => {
            let source = InputSource::from_arg(Some(file.as_path()))
                .context("preset file required (or `-` for stdin)")?;
            let text = source
                .read_to_string()
                .with_context(|| format!("failed to read {}", source.display_name()))?;
            let names = store.import_json(&text)?;
            store.save()?;
            eprintln!(
                "imported {} preset(s) into {}: {}",
                names.len(),
                store.path().display(),
                names.join(", ")
            );
        }
    }
    Ok(())
}
