//! HTML-to-PDF rendering through a headless Chromium-family browser.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use mdpress_shared::{ExportOptions, MdPressError, PaperFormat, Result};

use crate::cancel::CancelSignal;

/// Executables tried in order when no browser path is configured.
const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "microsoft-edge",
    "msedge",
];

// ---------------------------------------------------------------------------
// Page layout
// ---------------------------------------------------------------------------

/// Print layout handed to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub paper: PaperFormat,
    pub landscape: bool,
    /// `[top, right, bottom, left]` in millimetres.
    pub margins_mm: [f64; 4],
    pub print_background: bool,
    /// Whether the renderer's own header/footer (with page numbers) is printed.
    pub header_footer: bool,
}

impl From<&ExportOptions> for PageLayout {
    fn from(opts: &ExportOptions) -> Self {
        Self {
            paper: opts.paper_format,
            landscape: opts.landscape,
            margins_mm: [
                opts.top_margin_mm,
                opts.right_margin_mm,
                opts.bottom_margin_mm,
                opts.left_margin_mm,
            ],
            print_background: opts.print_background,
            header_footer: opts.show_page_numbers,
        }
    }
}

/// `@page` rules for the layout.
pub fn page_css(layout: &PageLayout) -> String {
    let orientation = if layout.landscape { " landscape" } else { "" };
    let [top, right, bottom, left] = layout.margins_mm;
    let mut css = format!(
        "@page {{ size: {}{orientation}; margin: {top}mm {right}mm {bottom}mm {left}mm; }}\n",
        layout.paper.css_name()
    );
    if layout.print_background {
        css.push_str("html { -webkit-print-color-adjust: exact; print-color-adjust: exact; }\n");
    }
    css
}

/// Insert the layout's `@page` rules at the end of the document head.
pub fn with_page_css(html: &str, layout: &PageLayout) -> String {
    let style = format!("<style>\n{}</style>\n", page_css(layout));
    match html.find("</head>") {
        Some(pos) => format!("{}{style}{}", &html[..pos], &html[pos..]),
        None => format!("{style}{html}"),
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Turns a complete HTML document into a paginated PDF at `output`.
pub trait PageRenderer: Send + Sync {
    fn render(
        &self,
        html: &str,
        layout: &PageLayout,
        output: &Path,
        cancel: &CancelSignal,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Prints with `--print-to-pdf` of a headless Chromium, Chrome or Edge.
#[derive(Debug, Clone, Default)]
pub struct ChromiumRenderer {
    browser_path: Option<PathBuf>,
}

impl ChromiumRenderer {
    pub fn new(browser_path: Option<PathBuf>) -> Self {
        Self { browser_path }
    }

    pub fn from_options(opts: &ExportOptions) -> Self {
        Self::new(opts.browser_path.as_ref().map(PathBuf::from))
    }

    /// Configured executable, or the first known browser found on `PATH`.
    pub fn locate_browser(&self) -> Result<PathBuf> {
        if let Some(path) = &self.browser_path {
            if path.is_file() {
                return Ok(path.clone());
            }
            return Err(MdPressError::Render(format!(
                "configured browser not found: {}",
                path.display()
            )));
        }

        let path_var = std::env::var_os("PATH").unwrap_or_default();
        std::env::split_paths(&path_var)
            .flat_map(|dir| BROWSER_CANDIDATES.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                MdPressError::Render(
                    "no usable rendering backend: install Chromium, Chrome or Edge, or set export.browser_path"
                        .into(),
                )
            })
    }

    fn command(&self, browser: &Path, input: &Path, layout: &PageLayout, output: &Path) -> Command {
        let mut cmd = Command::new(browser);
        cmd.arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--disable-extensions")
            .arg("--run-all-compositor-stages-before-draw")
            .arg(format!("--print-to-pdf={}", output.display()));
        if !layout.header_footer {
            cmd.arg("--no-pdf-header-footer").arg("--print-to-pdf-no-header");
        }
        cmd.arg(format!("file://{}", input.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl PageRenderer for ChromiumRenderer {
    #[instrument(skip_all, fields(output = %output.display()))]
    async fn render(
        &self,
        html: &str,
        layout: &PageLayout,
        output: &Path,
        cancel: &CancelSignal,
    ) -> Result<()> {
        cancel.check()?;
        let browser = self.locate_browser()?;

        let input = std::env::temp_dir().join(format!("mdpress-{}.html", uuid::Uuid::now_v7()));
        let document = with_page_css(html, layout);
        tokio::fs::write(&input, document)
            .await
            .map_err(|e| MdPressError::io(&input, e))?;

        let output = absolute(output)?;
        let result = self.run(&browser, &input, layout, &output, cancel).await;

        if let Err(e) = tokio::fs::remove_file(&input).await {
            warn!(path = %input.display(), error = %e, "failed to remove temporary html");
        }
        result
    }
}

impl ChromiumRenderer {
    async fn run(
        &self,
        browser: &Path,
        input: &Path,
        layout: &PageLayout,
        output: &Path,
        cancel: &CancelSignal,
    ) -> Result<()> {
        debug!(browser = %browser.display(), "launching headless browser");
        let mut child = self
            .command(browser, input, layout, output)
            .spawn()
            .map_err(|e| MdPressError::Render(format!("failed to launch {}: {e}", browser.display())))?;

        tokio::select! {
            status = child.wait() => {
                let status = status
                    .map_err(|e| MdPressError::Render(format!("browser process failed: {e}")))?;
                if !status.success() {
                    return Err(MdPressError::Render(format!("browser exited with {status}")));
                }
            }
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill browser process");
                }
                return Err(MdPressError::Cancelled);
            }
        }

        if !output.is_file() {
            return Err(MdPressError::Render(format!(
                "browser produced no output at {}",
                output.display()
            )));
        }
        info!(output = %output.display(), "pdf printed");
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| MdPressError::io(".", e))?;
    Ok(cwd.join(path))
}
