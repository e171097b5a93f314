use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use modclean::cleaner::{CleanEvent, ModClean, Options};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Remove unwanted files and directories from your node_modules folder",
    long_about = None
)]
struct Args {
    /// Run and report results without deleting files
    #[arg(short, long)]
    test: bool,

    /// Path to run in (defaults to current directory)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Modules directory name (defaults to "node_modules")
    #[arg(short = 'D', long)]
    modules_dir: Option<String>,

    /// Matches are case sensitive
    #[arg(short = 's', long)]
    case_sensitive: bool,

    /// Halt on the first deletion error
    #[arg(short, long)]
    error_halt: bool,

    /// Print every deleted path
    #[arg(short, long)]
    verbose: bool,

    /// Pattern sources/rules to use (defaults to "default:safe")
    #[arg(short = 'n', long, value_delimiter = ',')]
    patterns: Vec<String>,

    /// Additional glob patterns to search for
    #[arg(short, long, value_delimiter = ',')]
    additional_patterns: Vec<String>,

    /// Glob patterns to ignore
    #[arg(short = 'I', long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Exclude directories from being removed
    #[arg(long)]
    no_dirs: bool,

    /// Exclude dot files from being removed
    #[arg(long)]
    no_dotfiles: bool,

    /// Keep empty directories
    #[arg(short, long)]
    keep_empty: bool,

    /// Also clean inside symlinked packages
    #[arg(long)]
    follow_symlinks: bool,

    /// Hide the progress bar
    #[arg(short = 'P', long)]
    no_progress: bool,

    /// Load options from a TOML file; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    fn into_options(self) -> Result<Options> {
        let mut options = match &self.config {
            Some(path) => Options::load(path)
                .with_context(|| format!("Failed to load options from {}", path.display()))?,
            None => Options::default(),
        };

        if let Some(path) = self.path {
            options.cwd = path;
        }
        if let Some(modules_dir) = self.modules_dir {
            options.modules_dir = Some(modules_dir);
        }
        if !self.patterns.is_empty() {
            options.patterns = self.patterns;
        }
        if !self.additional_patterns.is_empty() {
            options.additional_patterns = self.additional_patterns;
        }
        if !self.ignore.is_empty() {
            options.ignore_patterns = self.ignore;
        }

        options.test |= self.test;
        options.error_halt |= self.error_halt;
        options.no_dirs |= self.no_dirs;
        options.follow_symlink |= self.follow_symlinks;
        if self.case_sensitive {
            options.ignore_case = false;
        }
        if self.no_dotfiles {
            options.dot_files = false;
        }
        if self.keep_empty {
            options.remove_empty_dirs = false;
        }

        Ok(options)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "modclean=debug" } else { "modclean=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let verbose = args.verbose;
    let show_progress = !args.no_progress;
    let options = args.into_options()?;

    println!("\n{} {}\n", "MODCLEAN".yellow().bold(), format!("Version {}", env!("CARGO_PKG_VERSION")).dimmed());
    if options.test {
        println!("{}", "RUNNING IN TEST MODE".cyan().bold());
        println!("{}\n", "Files will not be deleted from the file system.".dimmed());
    }

    let mut cleaner = ModClean::new(options).context("Invalid pattern configuration")?;

    let bar = if show_progress {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress template")?
                .progress_chars("=>-"),
        );
        Some(bar)
    } else {
        None
    };

    let listener_bar = bar.clone();
    cleaner.on(move |event| render(event, listener_bar.as_ref(), verbose));

    println!("Cleaning {}", cleaner.root().display().to_string().bold());
    let results = cleaner.clean().await.context("Clean failed")?;

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let stats = results.stats();
    println!(
        "\n{} {} of {} files/folders {}",
        "FINISHED".green().bold(),
        stats.deleted.to_string().green(),
        stats.files_found,
        if cleaner.options().test { "would be removed" } else { "removed" }
    );
    if stats.skipped > 0 {
        println!("{} skipped", stats.skipped.to_string().yellow());
    }
    if stats.empty_deleted > 0 {
        println!("{} empty directories removed", stats.empty_deleted);
    }
    println!(
        "{} freed in {:.2}s",
        format_size(stats.bytes_freed, BINARY),
        stats.elapsed.as_secs_f64()
    );
    if stats.errors > 0 {
        println!("{} errors occurred, run with --verbose for details", stats.errors.to_string().red());
    }

    Ok(())
}

fn render(event: &CleanEvent, bar: Option<&ProgressBar>, verbose: bool) {
    match event {
        CleanEvent::CandidatesReady(files) => {
            if let Some(bar) = bar {
                bar.set_length(files.len() as u64);
            }
        }
        CleanEvent::CandidateDeleted(candidate) => {
            if let Some(bar) = bar {
                bar.inc(1);
            }
            if verbose {
                let line = format!("{} {}", "deleted".red(), candidate.path.display());
                match bar {
                    Some(bar) => bar.println(line),
                    None => println!("{}", line),
                }
            }
        }
        CleanEvent::CandidateSkipped(_) => {
            if let Some(bar) = bar {
                bar.inc(1);
            }
        }
        CleanEvent::EmptyDirBegin => {
            if let Some(bar) = bar {
                bar.set_message("removing empty directories");
            }
        }
        CleanEvent::Error(record) => {
            if verbose {
                let line = format!("{} {}", "error".red().bold(), record);
                match bar {
                    Some(bar) => bar.println(line),
                    None => eprintln!("{}", line),
                }
            }
        }
        _ => {}
    }
}
