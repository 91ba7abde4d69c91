//! WSI Tiler - Cut Whole Slide Images into training patches.
//!
//! This binary wires the CLI to the tiling engine.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_tiler::{
    annotation::{check_annotation_alignment, discover_annotations, load_annotations},
    config::{Cli, Command, PlanConfig, ScanConfig, TileConfig},
    slide::{discover_slides, LocalSlideSource, SlideSource},
    tiling::{
        partition, BatchExtractor, PatchContent, SlideProcessingContext, StreamExtractor,
        TileCounts,
    },
    TilingError,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.into_command() {
        Command::Tile(config) => run_tile(config).await,
        Command::Scan(config) => run_scan(config).await,
        Command::Plan(config) => run_plan(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_tiler=debug"
    } else {
        "wsi_tiler=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Tile Command
// =============================================================================

async fn run_tile(config: TileConfig) -> Result<(), TilingError> {
    init_logging(config.extraction.verbose);

    let settings = config.extraction.validate()?;
    let slides = discover_slides(&config.slides)?;
    info!(
        "Found {} slide(s) in {}",
        slides.len(),
        config.slides.display()
    );

    let extractor = BatchExtractor::new(LocalSlideSource::new(), settings, &config.output)?;
    let report = extractor.tiling(&slides).await?;

    let totals = report.totals();
    info!(
        "Done: {} tile(s) saved, {} black and {} blank skipped, output in {}",
        totals.saved,
        totals.black,
        totals.blank,
        config.output.display()
    );
    Ok(())
}

// =============================================================================
// Scan Command
// =============================================================================

async fn run_scan(config: ScanConfig) -> Result<(), TilingError> {
    init_logging(config.extraction.verbose);

    let settings = config.extraction.validate()?;
    let mode = config.iteration_mode()?;
    let slides = discover_slides(&config.slides)?;

    let extractor = StreamExtractor::new(LocalSlideSource::new(), settings)?;
    let mut stream = extractor.stream(slides, mode, config.seed);

    println!("{:<40} {:>8} {:>8} {:>8}", "slide", "valid", "black", "blank");
    while let Some(next) = stream.next_slide().await {
        let (_, mut patches) = next?;
        let mut counts = TileCounts::default();

        while let Some(item) = patches.next().await {
            match item?.content {
                PatchContent::Valid(_) => counts.saved += 1,
                PatchContent::Black => counts.black += 1,
                PatchContent::Blank => counts.blank += 1,
            }
        }

        println!(
            "{:<40} {:>8} {:>8} {:>8}",
            patches.context().handle.stem,
            counts.saved,
            counts.black,
            counts.blank
        );
    }
    Ok(())
}

// =============================================================================
// Plan Command
// =============================================================================

async fn run_plan(config: PlanConfig) -> Result<(), TilingError> {
    init_logging(config.extraction.verbose);

    let settings = config.extraction.validate()?;
    let slides = discover_slides(&config.slides)?;
    let source = LocalSlideSource::new();

    println!(
        "{:<40} {:>12} {:>6} {:>8} {:>6} {:>8}",
        "slide", "size", "rows", "columns", "scale", "workers"
    );
    for (index, path) in slides.iter().enumerate() {
        let slide = source
            .open(path)
            .await
            .map_err(|e| TilingError::slide(path, e))?;
        let ctx = SlideProcessingContext::prepare(index, path, &slide, &settings)?;
        let plan = partition(ctx.grid.rows, settings.effective_workers())?;

        println!(
            "{:<40} {:>12} {:>6} {:>8} {:>6} {:>8}",
            ctx.handle.stem,
            format!("{}x{}", ctx.handle.width, ctx.handle.height),
            ctx.grid.rows,
            ctx.grid.columns,
            ctx.grid.scale,
            plan.effective_workers()
        );
    }

    if let Some(ref dir) = config.annotations {
        let files = discover_annotations(dir).await?;
        check_annotation_alignment(&slides, &files)?;

        println!();
        println!("Annotations:");
        for file in &files {
            let loaded = load_annotations(file).await?;
            println!(
                "  {:<38} {} region(s)",
                loaded.slide_stem,
                loaded.annotations.len()
            );
        }
    }
    Ok(())
}
