//! lifebook - export a life-story manuscript as finished books

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use lifebook::export::{self, Format};
use lifebook::{Book, FormatStyle, Metadata, Story};

#[derive(Parser)]
#[command(name = "lifebook")]
#[command(version, about = "Export life-story answers as DOCX, HTML, EPUB, PDF, RTF or ZIP", long_about = None)]
#[command(after_help = "EXAMPLES:
    lifebook story.json -o memoir.docx          Write one file
    lifebook story.json -f pdf -f epub          Write PDF and EPUB with dated names
    lifebook story.json --style biography       Every format, answers only")]
struct Cli {
    /// Manuscript JSON: { \"metadata\": {...}, \"stories\": [...] }
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file; the format comes from its extension (repeatable)
    #[arg(short, long = "output", value_name = "FILE")]
    output: Vec<PathBuf>,

    /// Format to write under the suggested file name (repeatable)
    #[arg(short, long = "format", value_name = "FORMAT")]
    format: Vec<Format>,

    /// Directory for files named by --format
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Override the book title
    #[arg(long)]
    title: Option<String>,

    /// Override the author
    #[arg(long)]
    author: Option<String>,

    /// interview, biography or narrative
    #[arg(long)]
    style: Option<FormatStyle>,

    /// Include a table of contents
    #[arg(long, overrides_with = "no_toc")]
    toc: bool,

    /// Leave out the table of contents
    #[arg(long)]
    no_toc: bool,

    /// Leave out story pictures
    #[arg(long)]
    no_images: bool,

    /// Use this image as the cover
    #[arg(long, value_name = "IMAGE")]
    cover: Option<PathBuf>,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,

    /// More logging (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Deserialize)]
struct Manuscript {
    #[serde(default)]
    metadata: Metadata,
    stories: Vec<Story>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let book = match load_book(&cli) {
        Ok(book) => book,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut failed = 0;
    for (format, path) in jobs(&cli, &book) {
        let Some(format) = format else {
            eprintln!("error: cannot tell the format of {}", path.display());
            failed += 1;
            continue;
        };
        match write_one(&book, format, &path) {
            Ok(size) => {
                if !cli.quiet {
                    println!("{format}: {} ({size} bytes)", path.display());
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("error: {e:#}");
                if let Some(hint) = e.downcast_ref::<lifebook::Error>().and_then(|e| e.hint()) {
                    eprintln!("hint: {hint}");
                }
            }
        }
    }

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_book(cli: &Cli) -> Result<Book> {
    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let Manuscript {
        mut metadata,
        stories,
    } = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", cli.input.display()))?;

    apply_overrides(&mut metadata, cli)?;
    Ok(Book::new(metadata, stories)?)
}

fn apply_overrides(metadata: &mut Metadata, cli: &Cli) -> Result<()> {
    if let Some(title) = &cli.title {
        metadata.title = title.clone();
    }
    if let Some(author) = &cli.author {
        metadata.author = author.clone();
    }
    if let Some(style) = cli.style {
        metadata.format_style = style;
    }
    if cli.toc {
        metadata.include_toc = true;
    } else if cli.no_toc {
        metadata.include_toc = false;
    }
    if cli.no_images {
        metadata.include_images = false;
    }
    if let Some(path) = &cli.cover {
        let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        *metadata = std::mem::take(metadata).with_cover(data);
    }
    if metadata.title.trim().is_empty() {
        bail!("the book needs a title (set metadata.title or pass --title)");
    }
    Ok(())
}

/// Requested outputs; with neither `-o` nor `-f`, every format.
fn jobs(cli: &Cli, book: &Book) -> Vec<(Option<Format>, PathBuf)> {
    let mut jobs: Vec<(Option<Format>, PathBuf)> = cli
        .output
        .iter()
        .map(|path| (Format::from_path(path), path.clone()))
        .collect();

    let formats: &[Format] = if cli.output.is_empty() && cli.format.is_empty() {
        Format::ALL.as_slice()
    } else {
        cli.format.as_slice()
    };
    for &format in formats {
        let path = cli.out_dir.join(book.filename(format.extension()));
        jobs.push((Some(format), path));
    }
    jobs
}

fn write_one(book: &Book, format: Format, path: &Path) -> Result<usize> {
    let result = export::export(book, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, &result.data).with_context(|| format!("writing {}", path.display()))?;
    Ok(result.data.len())
}
