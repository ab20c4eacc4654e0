//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use mdpress_core::{
    CancelSignal, ChromiumRenderer, DocumentAssembler, ExportResult, ProgressReporter,
    check_output_path, export_pdf,
};
use mdpress_pdf::{inject_outline_at, resolve_pages_at};
use mdpress_shared::{
    AppConfig, DEFAULT_NUMBERING_PATTERN, ExportOptions, FormattingOptions, MdPressError,
    PaperFormat, PublicHeading, SourceFile, TocBulletStyle, TocLayout, TocLeader, init_config,
    load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// mdpress: print markdown files as one PDF with numbering, TOC and bookmarks.
#[derive(Parser)]
#[command(
    name = "mdpress",
    version,
    about = "Combine markdown files into a numbered, bookmarked PDF.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.mdpress/mdpress.toml.
    #[arg(long, global = true)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Assemble the markdown files into a single HTML document.
    Html {
        /// Markdown files, in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output HTML file.
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the heading list as JSON.
        #[arg(long)]
        headings_json: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Print the markdown files to a PDF.
    Export {
        /// Markdown files, in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output PDF file.
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the heading list (with pages) as JSON.
        #[arg(long)]
        headings_json: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Resolve heading pages in an existing PDF and add bookmarks.
    Outline {
        /// PDF to modify in place.
        pdf: PathBuf,

        /// Heading list written by `html --headings-json`.
        #[arg(long)]
        headings: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Formatting overrides shared by `html` and `export`.
#[derive(Args, Debug, Default)]
pub(crate) struct FormatArgs {
    /// Number headings, optionally with a pattern such as `1.1.1` or `A.1`.
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_NUMBERING_PATTERN, value_name = "PATTERN")]
    pub numbering: Option<String>,

    /// Insert a table of contents.
    #[arg(long)]
    pub toc: bool,

    /// Place the table of contents after the first file.
    #[arg(long)]
    pub toc_after_first: bool,

    /// TOC layout: flat or tree.
    #[arg(long)]
    pub toc_layout: Option<TocLayout>,

    /// Leader between tree TOC titles and page numbers: dotted or none.
    #[arg(long)]
    pub toc_leader: Option<TocLeader>,

    /// Use `1.` markers in the flat TOC.
    #[arg(long)]
    pub toc_numbered: bool,

    /// Insert a page break between files.
    #[arg(long)]
    pub page_breaks: bool,
}

impl FormatArgs {
    fn apply(&self, opts: &mut FormattingOptions) {
        if let Some(pattern) = &self.numbering {
            opts.add_header_numbering = true;
            opts.header_numbering_pattern = pattern.clone();
        }
        if self.toc || self.toc_after_first {
            opts.add_table_of_contents = true;
        }
        if self.toc_after_first {
            opts.table_of_contents_after_first_file = true;
        }
        if let Some(layout) = self.toc_layout {
            opts.toc_layout = layout;
        }
        if let Some(leader) = self.toc_leader {
            opts.toc_leader = leader;
        }
        if self.toc_numbered {
            opts.toc_bullet_style = TocBulletStyle::Numbered;
        }
        if self.page_breaks {
            opts.insert_page_breaks_between_files = true;
        }
    }
}

/// Print overrides for `export`.
#[derive(Args, Debug, Default)]
pub(crate) struct ExportArgs {
    /// Paper format: A3, A4 or Letter.
    #[arg(long)]
    pub paper: Option<PaperFormat>,

    /// Landscape orientation.
    #[arg(long)]
    pub landscape: bool,

    /// Do not print page numbers.
    #[arg(long)]
    pub no_page_numbers: bool,

    /// Hide the page number on the first page.
    #[arg(long)]
    pub hide_first_page_number: bool,

    /// Browser executable used for printing.
    #[arg(long)]
    pub browser: Option<PathBuf>,
}

impl ExportArgs {
    fn apply(&self, opts: &mut ExportOptions) {
        if let Some(paper) = self.paper {
            opts.paper_format = paper;
        }
        if self.landscape {
            opts.landscape = true;
        }
        if self.no_page_numbers {
            opts.show_page_numbers = false;
        }
        if self.hide_first_page_number {
            opts.show_page_number_on_first_page = false;
        }
        if let Some(browser) = &self.browser {
            opts.browser_path = Some(browser.to_string_lossy().into_owned());
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "mdpress=info",
        1 => "mdpress=debug",
        _ => "mdpress=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_file.as_deref();
    match cli.command {
        Command::Html {
            files,
            output,
            headings_json,
            format,
        } => cmd_html(config_path, &files, &output, headings_json.as_deref(), &format).await,
        Command::Export {
            files,
            output,
            headings_json,
            format,
            export,
        } => {
            cmd_export(
                config_path,
                &files,
                &output,
                headings_json.as_deref(),
                &format,
                &export,
            )
            .await
        }
        Command::Outline { pdf, headings } => cmd_outline(&pdf, &headings).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_html(
    config_path: Option<&Path>,
    files: &[PathBuf],
    output: &Path,
    headings_json: Option<&Path>,
    format: &FormatArgs,
) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    format.apply(&mut config.formatting);

    let sources = read_sources(files)?;
    info!(files = sources.len(), output = %output.display(), "assembling html");

    let mut assembler = DocumentAssembler::new();
    let document = assembler.build(&sources, &config.formatting, &CancelSignal::none())?;

    std::fs::write(output, &document.html).map_err(|e| MdPressError::io(output, e))?;
    if let Some(path) = headings_json {
        write_headings(path, assembler.headings())?;
    }

    println!();
    println!("  HTML written!");
    println!("  Headings: {}", document.headings.len());
    println!("  Path:     {}", output.display());
    println!();

    Ok(())
}

async fn cmd_export(
    config_path: Option<&Path>,
    files: &[PathBuf],
    output: &Path,
    headings_json: Option<&Path>,
    format: &FormatArgs,
    export: &ExportArgs,
) -> Result<()> {
    check_output_path(output)?;
    let mut config = resolve_config(config_path)?;
    format.apply(&mut config.formatting);
    export.apply(&mut config.export);

    let sources = read_sources(files)?;
    info!(files = sources.len(), output = %output.display(), "exporting pdf");

    // Ctrl-C cancels the export instead of killing the process mid-write.
    let (cancel_tx, cancel) = CancelSignal::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let renderer = ChromiumRenderer::from_options(&config.export);
    let reporter = CliProgress::new();
    let outcome = export_pdf(
        &sources,
        &config.formatting,
        &config.export,
        output,
        &renderer,
        &reporter,
        &cancel,
    )
    .await;
    reporter.spinner.finish_and_clear();
    let result = outcome?;

    if let Some(path) = headings_json {
        write_headings(path, &result.headings)?;
    }

    println!();
    println!("  PDF exported successfully!");
    println!("  Headings:  {} ({} with pages)", result.headings.len(), result.resolved);
    println!("  Bookmarks: {}", result.bookmarks);
    println!("  Path:      {}", result.output_path.display());
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_outline(pdf: &Path, headings_path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(headings_path)
        .map_err(|e| MdPressError::io(headings_path, e))?;
    let mut headings: Vec<PublicHeading> = serde_json::from_str(&content)
        .wrap_err_with(|| format!("invalid heading list in {}", headings_path.display()))?;

    info!(pdf = %pdf.display(), headings = headings.len(), "adding outline");

    let resolved = resolve_pages_at(pdf, &mut headings)?;
    let bookmarks = inject_outline_at(pdf, &headings)?;

    println!();
    println!("  Outline added!");
    println!("  Resolved:  {resolved}");
    println!("  Bookmarks: {bookmarks}");
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config: AppConfig = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

fn read_sources(files: &[PathBuf]) -> Result<Vec<SourceFile>> {
    files
        .iter()
        .map(|path| {
            let content =
                std::fs::read_to_string(path).map_err(|e| MdPressError::io(path, e))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(SourceFile::new(name, content))
        })
        .collect()
}

fn write_headings(path: &Path, headings: &[PublicHeading]) -> Result<()> {
    let json = serde_json::to_string_pretty(headings)?;
    std::fs::write(path, json).map_err(|e| MdPressError::io(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &ExportResult) {
        self.spinner.finish_and_clear();
    }
}
