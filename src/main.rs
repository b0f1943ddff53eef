use anyhow::Context;
use clap::Parser;
use ocr_extract::cli::{BoxesArgs, Cli, Command, OsdArgs, TextArgs};
use ocr_extract::engine::EngineOptions;
use ocr_extract::output::{self, SaveOptions};
use ocr_extract::preprocessing::{Preset, Step};
use ocr_extract::{ocr, Config, Document};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// What `boxes --json` prints per page
#[derive(Serialize)]
struct AnnotationSummary {
    page: usize,
    boxes: usize,
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout only carries results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::try_from(&cli)?;
    tracing::debug!(
        "Starting ocr-extract v{} with {:?}",
        env!("CARGO_PKG_VERSION"),
        config
    );

    match &cli.command {
        Command::Text(args) => run_text(args, &config),
        Command::Boxes(args) => run_boxes(args, &config),
        Command::Osd(args) => run_osd(args, &config),
        Command::Preprocesses => {
            list_preprocesses();
            Ok(())
        }
        Command::Languages => {
            let engine = config.engine.build(&config)?;
            match engine.version() {
                Some(version) => println!("{} ({})", engine.name(), version),
                None => println!("{}", engine.name()),
            }
            println!("{}", engine.description());
            println!();
            println!("Languages:");
            for language in engine.supported_languages() {
                println!("  {}", language);
            }
            Ok(())
        }
    }
}

fn run_text(args: &TextArgs, config: &Config) -> anyhow::Result<()> {
    let pipeline = args.pipeline()?;

    let layered = if args.pdf_text_layer {
        ocr::text_layer(&args.file)?
    } else {
        None
    };

    let (extraction, default_name) = match layered {
        Some(extraction) => (extraction, "pdf_output"),
        None => {
            let document = Document::open(&args.file, config)?;
            let engine = config.engine.build(config)?;
            let options = EngineOptions::from(config);
            let extraction = document.extract_text(engine.as_ref(), &options, &pipeline)?;
            (extraction, document.kind().default_output_name())
        }
    };

    if args.save {
        let name = args.output_name.as_deref().unwrap_or(default_name);
        let save_options = SaveOptions::new(args.format, name).with_directory(&args.output_dir);
        let path = output::save(&extraction, &save_options)?;
        println!("{}", path.display());
    } else if args.json {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
    } else {
        for page in &extraction.pages {
            println!("{}", page.text);
        }
    }

    Ok(())
}

fn run_boxes(args: &BoxesArgs, config: &Config) -> anyhow::Result<()> {
    let kind = args.annotation()?;
    let style = args.style()?;

    let document = Document::open(&args.file, config)?;
    let engine = config.engine.build(config)?;
    let options = EngineOptions::from(config);

    let pages = document.annotate(engine.as_ref(), &options, &kind, &style)?;
    let paths = output::save_annotated(
        &pages,
        document.path(),
        kind.label(),
        args.output.as_deref(),
    )
    .context("could not save annotated image")?;

    let summary: Vec<_> = pages
        .iter()
        .zip(paths)
        .map(|(page, path)| AnnotationSummary {
            page: page.page,
            boxes: page.boxes,
            path,
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for entry in &summary {
            println!(
                "page {}: {} {} box(es) -> {}",
                entry.page,
                entry.boxes,
                kind,
                entry.path.display()
            );
        }
    }

    Ok(())
}

fn run_osd(args: &OsdArgs, config: &Config) -> anyhow::Result<()> {
    let document = Document::open(&args.file, config)?;
    let engine = config.engine.build(config)?;
    let options = EngineOptions::from(config);

    let pages = document.detect_orientation(engine.as_ref(), &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
        return Ok(());
    }

    for page in &pages {
        let o = &page.orientation;
        if pages.len() > 1 {
            println!("Page: {}", page.page);
        }
        println!("Rotate: {}", o.rotate);
        println!("Orientation in degrees: {}", o.orientation_degrees);
        println!("Orientation confidence: {:.2}", o.orientation_confidence);
        println!("Script: {}", o.script);
        println!("Script confidence: {:.2}", o.script_confidence);
    }

    Ok(())
}

fn list_preprocesses() {
    println!("Preprocessing steps:");
    for step in Step::all() {
        println!("  {:<10} {}", step.name(), step.description());
    }

    println!();
    println!("Presets:");
    for preset in [Preset::None, Preset::Minimal, Preset::Default, Preset::Aggressive] {
        let steps = preset
            .steps()
            .iter()
            .map(Step::name)
            .collect::<Vec<_>>()
            .join(", ");
        let steps = if steps.is_empty() { "-" } else { steps.as_str() };
        println!("  {:<10} {}", preset.as_str(), steps);
    }
}
