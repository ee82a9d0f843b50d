//! casestream CLI - render, validate and archive OCR'd legal volumes

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use casestream::detect::{detect_format_from_path, DocumentKind};
use casestream::redact::{self, RedactionKey};
use casestream::render::{self, PageSelection, RenderConfig};
use casestream::{load_archive, save_archive, ExtractOptions, Extractor, FontRegistry, Format};
use casestream::{VolumeBuilder, VolumeMetadata};

#[derive(Parser)]
#[command(name = "casestream")]
#[command(author = "casestream contributors")]
#[command(version)]
#[command(about = "Render, validate and archive OCR'd legal volumes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a token-stream archive from a directory of source documents
    Archive {
        /// Directory holding layout and canonical documents
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output archive file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Volume barcode (defaults to the directory name)
        #[arg(long)]
        barcode: Option<String>,

        /// Check every page and case against its source
        #[arg(long)]
        validate: bool,

        /// Disable parallel validation
        #[arg(long)]
        sequential: bool,
    },

    /// Render pages of an archive as layout documents
    RenderPage {
        /// Archive file
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Output directory (stdout if not specified)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Page range by physical order (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Omit redacted text
        #[arg(long)]
        redacted: bool,
    },

    /// Render cases of an archive
    RenderCase {
        /// Archive file
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Case id (all cases if not specified)
        #[arg(long)]
        case: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "html")]
        format: CaseFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Omit redacted text
        #[arg(long)]
        redacted: bool,
    },

    /// Check that source documents survive a round trip through the model
    Validate {
        /// Directory holding layout and canonical documents
        #[arg(value_name = "DIR")]
        input: PathBuf,
    },

    /// Seal the redacted text of every page of an archive
    Seal {
        /// Archive file (rewritten in place unless --output is given)
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// 32-byte key as hex
        #[arg(long, env = "CASESTREAM_KEY")]
        key: String,

        /// Output archive file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Restore the sealed text of every page of an archive
    Unseal {
        /// Archive file (rewritten in place unless --output is given)
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// 32-byte key as hex
        #[arg(long, env = "CASESTREAM_KEY")]
        key: String,

        /// Output archive file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Generate a random redaction key
    Keygen,

    /// Show archive information
    Info {
        /// Archive file
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Print the volume metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CaseFormat {
    /// Canonical case document
    Xml,
    /// Casebody with emphasis and page numbers
    Enriched,
    /// HTML casebody
    Html,
    /// Plain text
    Text,
}

impl From<CaseFormat> for Format {
    fn from(format: CaseFormat) -> Self {
        match format {
            CaseFormat::Xml => Format::OriginalCanonical,
            CaseFormat::Enriched => Format::EnrichedCanonical,
            CaseFormat::Html => Format::Html,
            CaseFormat::Text => Format::Text,
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Archive {
            input,
            output,
            barcode,
            validate,
            sequential,
        } => cmd_archive(&input, &output, barcode, validate, sequential),
        Commands::RenderPage {
            archive,
            output,
            pages,
            redacted,
        } => cmd_render_page(&archive, output.as_deref(), pages.as_deref(), redacted),
        Commands::RenderCase {
            archive,
            case,
            format,
            output,
            redacted,
        } => cmd_render_case(&archive, case.as_deref(), format, output.as_deref(), redacted),
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Seal {
            archive,
            key,
            output,
        } => cmd_seal(&archive, &key, output.as_deref()),
        Commands::Unseal {
            archive,
            key,
            output,
        } => cmd_unseal(&archive, &key, output.as_deref()),
        Commands::Keygen => {
            println!("{}", hex::encode(RedactionKey::generate().as_bytes()));
            Ok(())
        }
        Commands::Info { archive, json } => cmd_info(&archive, json),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Layout and canonical documents of a directory, each sorted by file name.
struct Sources {
    layouts: Vec<PathBuf>,
    cases: Vec<PathBuf>,
}

fn collect_sources(dir: &Path) -> Result<Sources, Box<dyn std::error::Error>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "xml"))
        .collect();
    paths.sort();

    let mut sources = Sources {
        layouts: Vec::new(),
        cases: Vec::new(),
    };
    for path in paths {
        match detect_format_from_path(&path) {
            Ok(DocumentKind::Layout) => sources.layouts.push(path),
            Ok(DocumentKind::Canonical) => sources.cases.push(path),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(sources)
}

fn case_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn progress(len: usize) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn load_key(hex_key: &str) -> Result<RedactionKey, Box<dyn std::error::Error>> {
    let bytes = hex::decode(hex_key.trim())?;
    Ok(RedactionKey::from_slice(&bytes)?)
}

fn cmd_archive(
    input: &Path,
    output: &Path,
    barcode: Option<String>,
    validate: bool,
    sequential: bool,
) -> CliResult {
    let sources = collect_sources(input)?;
    let barcode = barcode.unwrap_or_else(|| case_id(input));

    let mut options = ExtractOptions::new().with_validation(validate);
    if sequential {
        options = options.sequential();
    }
    let mut builder = VolumeBuilder::new(VolumeMetadata::new(barcode)).with_options(options);

    let pb = progress(sources.layouts.len() + sources.cases.len())?;
    pb.set_message("Extracting pages...");
    for path in &sources.layouts {
        let raw = fs::read_to_string(path)?;
        builder
            .add_page(&raw)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        pb.inc(1);
    }

    pb.set_message("Extracting cases...");
    for path in &sources.cases {
        let raw = fs::read_to_string(path)?;
        builder
            .add_case(&raw, &case_id(path))
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        pb.inc(1);
    }

    pb.set_message("Finishing volume...");
    let volume = builder.build()?;
    save_archive(&volume, output)?;
    pb.finish_with_message("Done!");

    println!(
        "\n{} {} ({} pages, {} cases, {} fonts)",
        "Saved to".green(),
        output.display(),
        volume.pages.len(),
        volume.cases.len(),
        volume.fonts.len()
    );
    Ok(())
}

fn cmd_render_page(
    archive: &Path,
    output: Option<&Path>,
    pages: Option<&str>,
    redacted: bool,
) -> CliResult {
    let selection = if let Some(p) = pages {
        PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?
    } else {
        PageSelection::All
    };

    let volume = load_archive(archive)?;
    let index = volume.index()?;
    let config = RenderConfig::new(&index, &volume.fonts).with_redacted(redacted);

    if let Some(dir) = output {
        fs::create_dir_all(dir)?;
    }

    let mut count = 0;
    for page in volume.pages.iter().filter(|p| selection.includes(p.order)) {
        let rendered = render::render_page(page, &config)?;
        match output {
            Some(dir) => {
                let path = dir.join(format!("{}.xml", page.id));
                fs::write(&path, &rendered)?;
                println!("{} {}", "Rendered".green(), path.display());
            }
            None => print!("{}", rendered),
        }
        count += 1;
    }

    if output.is_some() {
        println!("\n{} {} pages rendered", "Done!".green().bold(), count);
    }
    Ok(())
}

fn cmd_render_case(
    archive: &Path,
    case: Option<&str>,
    format: CaseFormat,
    output: Option<&Path>,
    redacted: bool,
) -> CliResult {
    let volume = load_archive(archive)?;

    let rendered = match case {
        Some(id) => {
            let case = volume
                .case(id)
                .ok_or_else(|| format!("No case {} in {}", id, archive.display()))?;
            let index = volume.index()?;
            let config = RenderConfig::new(&index, &volume.fonts)
                .with_format(format.into())
                .with_redacted(redacted);
            render::render_case(case, &config)?
        }
        None => volume
            .render_cases(format.into(), redacted, true)?
            .join("\n"),
    };

    if let Some(path) = output {
        fs::write(path, &rendered)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        print!("{}", rendered);
    }
    Ok(())
}

fn cmd_validate(input: &Path) -> CliResult {
    let sources = collect_sources(input)?;
    let mut fonts = FontRegistry::new();
    let mut pages = Vec::new();
    let mut failures = Vec::new();

    let pb = progress(sources.layouts.len() + sources.cases.len())?;
    pb.set_message("Validating...");
    {
        let mut extractor = Extractor::new(&mut fonts, ExtractOptions::new().with_validation(true));

        for path in &sources.layouts {
            let raw = fs::read_to_string(path)?;
            match extractor.extract_page(&raw) {
                Ok(page) => pages.push(page),
                Err(e) => failures.push((path.clone(), e.to_string())),
            }
            pb.inc(1);
        }

        for path in &sources.cases {
            let raw = fs::read_to_string(path)?;
            if let Err(e) = extractor.extract_case(&raw, &case_id(path), &mut pages) {
                failures.push((path.clone(), e.to_string()));
            }
            pb.inc(1);
        }
    }
    pb.finish_and_clear();

    let total = sources.layouts.len() + sources.cases.len();
    for (path, error) in &failures {
        println!("{} {}: {}", "✗".red().bold(), path.display(), error);
    }

    if failures.is_empty() {
        println!("{} {} documents validated", "✓".green().bold(), total);
        Ok(())
    } else {
        Err(format!("{} of {} documents failed validation", failures.len(), total).into())
    }
}

fn cmd_seal(archive: &Path, hex_key: &str, output: Option<&Path>) -> CliResult {
    let key = load_key(hex_key)?;
    let mut volume = load_archive(archive)?;

    let mut sealed = 0;
    for page in &mut volume.pages {
        if page.sealed.is_none() && redact::seal_page(page, &key)? {
            sealed += 1;
        }
    }

    let target = output.unwrap_or(archive);
    save_archive(&volume, target)?;
    println!(
        "{} {} pages sealed, saved to {}",
        "Done!".green().bold(),
        sealed,
        target.display()
    );
    Ok(())
}

fn cmd_unseal(archive: &Path, hex_key: &str, output: Option<&Path>) -> CliResult {
    let key = load_key(hex_key)?;
    let mut volume = load_archive(archive)?;

    let mut fragments = 0;
    for page in &mut volume.pages {
        if page.sealed.is_some() {
            fragments += redact::unseal_page(page, &key)?.len();
        }
    }

    let target = output.unwrap_or(archive);
    save_archive(&volume, target)?;
    println!(
        "{} {} fragments restored, saved to {}",
        "Done!".green().bold(),
        fragments,
        target.display()
    );
    Ok(())
}

fn cmd_info(archive: &Path, json: bool) -> CliResult {
    let volume = load_archive(archive)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&volume.metadata)?);
        return Ok(());
    }

    println!("{}", "Volume Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), archive.display());
    println!("{}: {}", "Barcode".bold(), volume.metadata.barcode);
    if let Some(ref reporter) = volume.metadata.reporter {
        println!("{}: {}", "Reporter".bold(), reporter);
    }
    if let Some(ref number) = volume.metadata.volume_number {
        println!("{}: {}", "Volume".bold(), number);
    }
    println!("{}: {}", "Pages".bold(), volume.pages.len());
    println!("{}: {}", "Cases".bold(), volume.cases.len());
    println!("{}: {}", "Fonts".bold(), volume.fonts.len());

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let index = volume.index()?;
    let config = RenderConfig::new(&index, &volume.fonts).with_format(Format::Text);
    let mut stats = render::RenderStats::new();
    for case in &volume.cases {
        stats.merge(&render::render_case_with_stats(case, &config)?.stats);
    }

    let blocks: usize = volume.pages.iter().map(|p| p.blocks.len()).sum();
    let redacted = volume.pages.iter().filter(|p| p.has_redactions()).count();
    let sealed = volume.pages.iter().filter(|p| p.sealed.is_some()).count();

    println!("{}: {}", "Blocks".bold(), blocks);
    println!("{}: {}", "Paragraphs".bold(), stats.paragraph_count);
    println!("{}: {}", "Footnotes".bold(), stats.footnote_count);
    println!("{}: {}", "Words".bold(), stats.word_count);
    println!("{}: {}", "Pages with redactions".bold(), redacted);
    println!("{}: {}", "Sealed pages".bold(), sealed);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "casestream".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Token-stream renderer and synchronizer for OCR'd legal volumes");
    println!();
    println!("License: MIT");
}
