use std::time::Instant;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use collocations::config::{CollocateArgs, Config, ExportArgs, GlobalArgs};
use collocations::export::ExportOutcome;
use collocations::harvest::{DEFAULT_MAX_EXAMPLES, harvest_file};
use collocations::request::Context;
use collocations::upos::code_legend;
use collocations::{CollocateLookup, CollocationIndex, Request, Response, dispatch};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const DISPLAY_WIDTH: usize = 140;

/// Corpus-driven collocation extraction
#[derive(Parser, Debug)]
#[command(name = "colloc", version)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build (or refresh) the cached tables and exit
    Build,

    /// Strongest collocations in the whole corpus
    #[command(after_help = code_legend())]
    Top(GlobalArgs),

    /// Collocates of one or more lemmas
    #[command(after_help = code_legend())]
    Collocates {
        #[arg(required = true)]
        lemmas: Vec<String>,
        #[command(flatten)]
        args: CollocateArgs,
    },

    /// Write `<lemma>.tsv` export files
    Export {
        #[arg(required = true)]
        lemmas: Vec<String>,
        #[command(flatten)]
        args: ExportArgs,
    },

    /// Collect more example sentences for the rows of an export file
    Harvest {
        #[arg(long)]
        input: std::path::PathBuf,
        #[arg(long)]
        output: std::path::PathBuf,
        #[arg(long, default_value_t = DEFAULT_MAX_EXAMPLES)]
        max_examples: usize,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let sources = cli.config.sources();
    let options = cli.config.build_options();

    // harvesting only rereads the raw corpus
    if let Command::Harvest {
        input,
        output,
        max_examples,
    } = &cli.command
    {
        let stats = harvest_file(&sources.lemmas, &sources.surfaces, input, output, *max_examples)
            .context("failed to harvest examples")?;
        render(Response::Harvested(stats));
        return Ok(());
    }

    let start = Instant::now();
    let index = match cli.config.cache() {
        Some(cache) => CollocationIndex::load_or_build(&sources, &options, &cache),
        None => CollocationIndex::build(&sources, &options),
    }
    .context("failed to prepare collocation tables")?;
    info!("tables ready in {} ms", start.elapsed().as_millis());

    let export_args = match &cli.command {
        Command::Export { args, .. } => Some(args.clone()),
        _ => None,
    };
    let export_dir = export_args
        .as_ref()
        .map(|args| args.export_dir.clone())
        .unwrap_or_default();
    let export = export_args.map(|args| args.options()).unwrap_or_default();
    let ctx = Context {
        index: &index,
        sources: &sources,
        export_dir: &export_dir,
        export: &export,
    };

    for request in requests(cli.command) {
        render(dispatch(&ctx, request)?);
    }
    Ok(())
}

fn requests(command: Command) -> Vec<Request> {
    match command {
        Command::Build | Command::Harvest { .. } => Vec::new(),
        Command::Top(args) => vec![Request::Global(args.params())],
        Command::Collocates { lemmas, args } => lemmas
            .into_iter()
            .map(|lemma| Request::Collocates {
                target: lemma.trim().to_string(),
                params: args.params(),
            })
            .collect(),
        Command::Export { lemmas, .. } => lemmas
            .into_iter()
            .map(|lemma| Request::Export {
                target: lemma.trim().to_string(),
            })
            .collect(),
    }
}

fn render(response: Response) {
    match response {
        Response::Global(results) => {
            if results.is_empty() {
                println!("No collocations passed the filters.");
            }
            for (rank, c) in results.iter().enumerate() {
                println!(
                    "{:>3}. {} {}  (freq={}, pmi={:.3})",
                    rank + 1,
                    c.first,
                    c.second,
                    c.freq,
                    c.pmi
                );
                println!("     surface: {}", c.surface);
                println!("     example: {}", shorten(&c.example, DISPLAY_WIDTH));
            }
        }
        Response::Collocates { target, lookup } => match lookup {
            CollocateLookup::UnknownLemma(_) => println!("'{target}' not found in the corpus."),
            CollocateLookup::Found(collocates) if collocates.is_empty() => {
                println!("No collocates for '{target}' with these settings.")
            }
            CollocateLookup::Found(collocates) => {
                println!("Collocates of '{target}':");
                for (rank, c) in collocates.iter().enumerate() {
                    println!(
                        "{:>3}. {} [{}] {} {}  (freq={}, pmi={:.3})",
                        rank + 1,
                        c.other,
                        c.direction(),
                        c.collocation.first,
                        c.collocation.second,
                        c.collocation.freq,
                        c.collocation.pmi
                    );
                    println!("     surface: {}", c.collocation.surface);
                    println!(
                        "     example: {}",
                        shorten(&c.collocation.example, DISPLAY_WIDTH)
                    );
                }
            }
        },
        Response::Exported { target, outcome } => match outcome {
            ExportOutcome::Written { path, rows } => {
                println!("Exported {rows} collocations for '{target}' to {}", path.display())
            }
            ExportOutcome::NoCollocates => {
                println!("No collocates found for '{target}' with export thresholds.")
            }
            ExportOutcome::UnknownLemma => {
                println!("'{target}' not found in lemma vocabulary, nothing exported.")
            }
        },
        Response::Harvested(stats) => println!(
            "Collected {} examples for {} collocations.",
            stats.examples, stats.collocations
        ),
    }
}

/// Cut `text` to at most `max` characters, marking the cut with "..."
fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();
}
