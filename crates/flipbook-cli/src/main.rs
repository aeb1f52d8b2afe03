mod logger;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use flipbook_core::{
    BookLayout, CoverBaseline, OpeningFit, PageErrorPolicy, ProcessingOptions, RenderIntent,
    RenderedPage,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pflip", about = "Page-flip book preparation CLI", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which pages of a PDF are two-page spreads
    Detect {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        processing: ProcessingArgs,
    },

    /// Render a PDF into numbered page images and print the book openings
    Process {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for page images
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        processing: ProcessingArgs,

        /// Show the back and front covers together in the first opening
        #[arg(long)]
        covers_facing: bool,

        /// Directory containing the PDFium library
        #[arg(long)]
        pdfium_dir: Option<PathBuf>,

        /// Write the effective options to this JSON file
        #[arg(long)]
        save_config: Option<PathBuf>,
    },

    /// Size pages for a display area
    Fit {
        /// Container size in pixels, as WIDTHxHEIGHT
        #[arg(long, value_parser = parse_dimensions)]
        container: (f32, f32),

        /// Page size, as WIDTHxHEIGHT; omit to size a whole opening
        #[arg(long, value_parser = parse_dimensions)]
        page: Option<(f32, f32)>,

        /// Two pages share the container width
        #[arg(long)]
        spread: bool,

        /// Padding on every side, in pixels
        #[arg(long, default_value = "0")]
        padding: f32,

        /// Page width / height when sizing an opening
        #[arg(long, default_value = "0.7")]
        aspect: f32,

        /// Minimum opening width and page height, in pixels
        #[arg(long, default_value = "300")]
        min_size: f32,
    },
}

#[derive(Args)]
struct ProcessingArgs {
    /// Load options from a JSON file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rendering resolution
    #[arg(long)]
    dpi: Option<f32>,

    /// Maximum output width in pixels
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum output height in pixels
    #[arg(long)]
    max_height: Option<u32>,

    /// Minimum width/height ratio for a spread
    #[arg(long)]
    threshold: Option<f32>,

    /// Never split spreads
    #[arg(long)]
    no_split: bool,

    /// Split page 1 too when it is a double-wide cover spread
    #[arg(long)]
    cover_spread: bool,

    /// Emit a blank page instead of aborting when a page fails to render
    #[arg(long)]
    placeholder_on_error: bool,

    /// Rendering quality target
    #[arg(long, value_enum)]
    intent: Option<IntentArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum IntentArg {
    Display,
    Print,
}

impl From<IntentArg> for RenderIntent {
    fn from(arg: IntentArg) -> Self {
        match arg {
            IntentArg::Display => Self::Display,
            IntentArg::Print => Self::Print,
        }
    }
}

impl ProcessingArgs {
    async fn into_options(self) -> Result<ProcessingOptions> {
        let mut options = match &self.config {
            Some(path) => ProcessingOptions::load(path)
                .await
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ProcessingOptions::default(),
        };

        if let Some(dpi) = self.dpi {
            options.dpi = dpi;
        }
        if let Some(max_width) = self.max_width {
            options.max_width = max_width;
        }
        if let Some(max_height) = self.max_height {
            options.max_height = max_height;
        }
        if let Some(threshold) = self.threshold {
            options.spread_threshold = threshold;
        }
        if self.no_split {
            options.enable_spread_split = false;
        }
        if self.cover_spread {
            options.cover_baseline = CoverBaseline::DetectCoverSpread;
        }
        if self.placeholder_on_error {
            options.on_page_error = PageErrorPolicy::Placeholder;
        }
        if let Some(intent) = self.intent {
            options.render_intent = intent.into();
        }

        options.validate()?;
        Ok(options)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::CliLogger::new(cli.verbose).init()?;

    match cli.command {
        Commands::Detect { input, processing } => {
            let options = processing.into_options().await?;
            detect(&input, &options).await?;
        }

        Commands::Process {
            input,
            output,
            processing,
            covers_facing,
            pdfium_dir,
            save_config,
        } => {
            let options = processing.into_options().await?;
            if let Some(path) = &save_config {
                options.save(path).await?;
                println!("Saved options → {}", path.display());
            }

            let mut pages = render::process_pdf(&input, &options, pdfium_dir).await?;

            let written = flipbook_core::save_pages(&pages, &output).await?;
            println!("Wrote {} pages → {}", written.len(), output.display());

            print_openings(&pages, covers_facing)?;
            flipbook_core::release_pages(&mut pages);
        }

        Commands::Fit {
            container: (width, height),
            page,
            spread,
            padding,
            aspect,
            min_size,
        } => match page {
            Some((page_width, page_height)) => {
                let fitted =
                    flipbook_core::fit_page(width, height, page_width, page_height, spread, padding);
                println!(
                    "Page: {}x{} (scale {:.3})",
                    fitted.width, fitted.height, fitted.scale
                );
            }
            None => {
                let fit = OpeningFit {
                    padding,
                    min_width: min_size,
                    min_height: min_size,
                };
                let size = flipbook_core::fit_opening(width, height, aspect, &fit);
                println!("Opening: {}x{}", size.opening_width, size.page_height);
                println!("Page:    {}x{}", size.page_width, size.page_height);
            }
        },
    }

    Ok(())
}

/// Parse `WIDTHxHEIGHT`
fn parse_dimensions(value: &str) -> std::result::Result<(f32, f32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{}`", value))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f32>()
            .map_err(|e| format!("invalid dimension `{}`: {}", part, e))
    };
    Ok((parse(width)?, parse(height)?))
}

async fn detect(input: &Path, options: &ProcessingOptions) -> Result<()> {
    let sizes = flipbook_core::load_page_sizes(input).await?;
    let classes = flipbook_core::classify_sizes(&sizes, options)?;

    for (index, (size, class)) in sizes.iter().zip(&classes).enumerate() {
        let decision = flipbook_core::detect_spread(size.width, size.height, options.spread_threshold)?;
        println!(
            "Page {:>4}: {:>7.1} x {:>7.1}  ratio {:.3}  {:?} (confidence {:.2})",
            index + 1,
            size.width,
            size.height,
            decision.aspect_ratio,
            class,
            decision.confidence
        );
    }

    let stats = flipbook_core::calculate_statistics(&sizes, options)?;
    println!("Book Statistics:");
    println!("  Source pages: {}", stats.source_pages);
    println!("  Spreads detected: {}", stats.spreads_detected);
    println!("  Output pages: {}", stats.output_pages);
    println!("  Openings: {}", stats.openings);
    if stats.has_odd_pages {
        println!("  Last opening has an empty right page");
    }
    Ok(())
}

fn print_openings(pages: &[RenderedPage], covers_facing: bool) -> Result<()> {
    let layout: BookLayout<'_> = if covers_facing {
        flipbook_core::create_book_layout(flipbook_core::arrange_for_covers_facing(pages)?)
    } else {
        flipbook_core::create_book_layout(pages)
    };

    let label = |page: Option<&RenderedPage>| match page {
        Some(page) => page.page_number.to_string(),
        None => "-".to_string(),
    };

    println!("Openings ({}):", layout.total_spreads);
    for spread in &layout.spreads {
        println!(
            "  {:>4}: [{} | {}]",
            spread.id + 1,
            label(spread.left),
            label(spread.right)
        );
    }
    Ok(())
}

#[cfg(feature = "pdfium")]
mod render {
    use anyhow::{Result, anyhow, bail};
    use flipbook_async_runtime::{
        FlipbookCommand, FlipbookUpdate, PdfiumBackend, ProcessingOptions, RenderedPage,
        worker_task,
    };
    use flipbook_core::render::DecoderLocation;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Load and process a PDF through the worker, reporting progress on stderr
    pub async fn process_pdf(
        input: &Path,
        options: &ProcessingOptions,
        pdfium_dir: Option<PathBuf>,
    ) -> Result<Vec<RenderedPage>> {
        let backend = match pdfium_dir {
            Some(dir) => PdfiumBackend::with_location(DecoderLocation {
                library_dir: Some(dir),
            }),
            None => PdfiumBackend::new(),
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(worker_task(Arc::new(backend), command_rx, update_tx));

        let send = |cmd: FlipbookCommand| {
            command_tx
                .send(cmd)
                .map_err(|_| anyhow!("Worker stopped unexpectedly"))
        };
        send(FlipbookCommand::Load {
            path: input.to_owned(),
        })?;

        let mut result = Err(anyhow!("Worker stopped before processing finished"));
        let mut current = None;
        while let Some(update) = update_rx.recv().await {
            match update {
                FlipbookUpdate::Loaded { doc_id, page_count } => {
                    println!("Loaded {} ({} pages)", input.display(), page_count);
                    send(FlipbookCommand::Process {
                        doc_id,
                        options: options.clone(),
                    })?;
                }
                FlipbookUpdate::Started { run, .. } => current = Some(run),
                // Updates from a run other than the one we started
                FlipbookUpdate::Progress { run, .. }
                | FlipbookUpdate::Processed { run, .. }
                | FlipbookUpdate::Cancelled { run, .. }
                    if Some(run) != current => {}
                FlipbookUpdate::Progress { fraction, .. } => {
                    eprint!("\rProcessing... {:>3.0}%", fraction * 100.0);
                    let _ = std::io::stderr().flush();
                }
                FlipbookUpdate::Processed { pages, .. } => {
                    eprintln!();
                    result = Ok(pages);
                    break;
                }
                FlipbookUpdate::Cancelled { .. } => {
                    result = Err(anyhow!("Processing was cancelled"));
                    break;
                }
                FlipbookUpdate::Closed { .. } => {}
                FlipbookUpdate::Error { message, .. } => {
                    eprintln!();
                    result = Err(anyhow!(message));
                    break;
                }
            }
        }

        drop(command_tx);
        drop(update_rx);
        if let Err(e) = worker.await {
            bail!("Worker task failed: {}", e);
        }
        result
    }
}

#[cfg(not(feature = "pdfium"))]
mod render {
    use anyhow::{Result, bail};
    use flipbook_core::{ProcessingOptions, RenderedPage};
    use std::path::{Path, PathBuf};

    pub async fn process_pdf(
        _input: &Path,
        _options: &ProcessingOptions,
        _pdfium_dir: Option<PathBuf>,
    ) -> Result<Vec<RenderedPage>> {
        bail!("pflip was built without PDFium support; rebuild with the `pdfium` feature")
    }
}
