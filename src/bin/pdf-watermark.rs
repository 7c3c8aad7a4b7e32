//! PDF Watermark CLI tool
//!
//! A command-line tool for stamping a repeated text watermark onto PDF pages.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use pdf_watermark::options::RawOptions;
use pdf_watermark::output::DirectorySink;
use pdf_watermark::pdf::font::DEFAULT_FONT_PATH;
use pdf_watermark::pdf::{extract_metadata, FileFontSource};
use pdf_watermark::watermark::{watermark_file, Diagnostic};

/// PDF Watermark - Stamp text watermarks onto PDFs
#[derive(Parser)]
#[command(name = "pdf-watermark")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Red diagonal DRAFT watermark, written to ./watermarked_report.pdf
    pdf-watermark apply report.pdf --text DRAFT --color \"#FF0000\" --rotation 30

    # Dense light-gray watermark using fractional RGB
    pdf-watermark apply report.pdf --text CONFIDENTIAL --color 0.6,0.6,0.6 --density 5 -o out/

    # Show page sizes
    pdf-watermark info report.pdf")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp a watermark onto every page of a PDF
    Apply {
        /// Input PDF file
        input: PathBuf,

        /// Directory for watermarked_<input name>
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Preferred font file (TrueType/OpenType); falls back to Helvetica-Bold
        #[arg(long, default_value = DEFAULT_FONT_PATH)]
        font: PathBuf,

        #[command(flatten)]
        style: StyleArgs,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

/// Watermark settings, accepted as raw text and normalized by the library
#[derive(Args)]
struct StyleArgs {
    /// Watermark text
    #[arg(long)]
    text: Option<String>,

    /// Color as #rgb, #rrggbb or r,g,b with components in 0..1
    #[arg(long, allow_hyphen_values = true)]
    color: Option<String>,

    /// Opacity from 0 to 1 (default 0.5)
    #[arg(long)]
    opacity: Option<String>,

    /// Base font size in points (default 50)
    #[arg(long)]
    font_size: Option<String>,

    /// Rotation in degrees, counter-clockwise (default -45)
    #[arg(long, allow_hyphen_values = true)]
    rotation: Option<String>,

    /// Density from 1 (sparse) to 5 (dense) (default 3)
    #[arg(long)]
    density: Option<String>,
}

impl From<StyleArgs> for RawOptions {
    fn from(args: StyleArgs) -> Self {
        RawOptions {
            text: args.text,
            color: args.color,
            opacity: args.opacity,
            font_size: args.font_size,
            rotation: args.rotation,
            density: args.density,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Apply { input, output_dir, font, style, open } => {
            cmd_apply(input, output_dir, font, style, open)
        }
        Commands::Info { input } => cmd_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Install a stderr subscriber, honoring RUST_LOG when set
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Open a file with the system default application
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

/// Watermark a PDF
fn cmd_apply(
    input: PathBuf,
    output_dir: PathBuf,
    font: PathBuf,
    style: StyleArgs,
    open: bool,
) -> Result<()> {
    let options = RawOptions::from(style).normalize();
    let fonts = FileFontSource::new(font);
    let sink = DirectorySink::new(&output_dir);

    eprintln!("Watermarking {}...", input.display());

    let result = watermark_file(&input, &options, &fonts, &sink)
        .with_context(|| format!("could not watermark {}", input.display()))?;

    for diagnostic in &result.report.diagnostics {
        match diagnostic {
            Diagnostic::ColorFallback { input } => {
                eprintln!("Warning: invalid color {:?}, using black", input)
            }
            Diagnostic::FontFallback { cause } => {
                eprintln!("Warning: using fallback font ({})", cause)
            }
            Diagnostic::TextSubstituted { original, replacement } => {
                eprintln!("Warning: fallback font cannot draw {:?}, drew {:?} instead", original, replacement)
            }
        }
    }

    let stamps: usize = result.report.pages.iter().map(|p| p.stamps).sum();
    eprintln!(
        "Stamped {} pages ({} watermarks)",
        result.report.pages.len(),
        stamps
    );
    eprintln!("Output: {}", result.path.display());

    if open {
        open_file(&result.path)?;
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let metadata = extract_metadata(&input)
        .with_context(|| format!("could not read {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    for (i, size) in metadata.page_sizes.iter().enumerate() {
        println!("  Page {}: {:.1} × {:.1} pt", i + 1, size.width, size.height);
    }

    Ok(())
}
