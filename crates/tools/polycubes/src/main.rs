//! Polycubes CLI - enumerate 3D polycubes up to rotation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use polycube::{FileStore, GenerationStore, Generator, GeneratorConfig, Health, Progress};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polycubes")]
#[command(about = "Enumerate 3D polycubes up to rotation", long_about = None)]
struct Cli {
    /// Data directory for stored generations (overrides POLYCUBE_DATA)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute generations up to n, resuming from the last complete one
    Generate {
        /// Target polycube size
        n: usize,

        /// Shapes per bulk write (overrides POLYCUBE_BATCH_SIZE)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Trust fingerprint matches without comparing cells
        #[arg(long)]
        no_verify: bool,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the number of shapes in a complete generation
    Count {
        n: usize,
    },

    /// List the complete generations in the store
    Status,

    /// Print the shapes of a complete generation as layers
    Show {
        n: usize,

        /// Maximum number of shapes to print
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Check every stored generation, optionally discarding corrupt ones
    Verify {
        /// Rebuild an unreadable manifest, then discard corrupt generations and
        /// the generations grown from them
        #[arg(long)]
        repair: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = GeneratorConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::Generate {
            n,
            batch_size,
            no_verify,
            quiet,
        } => {
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            if no_verify {
                config.verify_matches = false;
            }
            config.validate()?;
            generate_command(&config, n, quiet)?;
        }
        Commands::Count { n } => {
            let store = open_store(&config)?;
            println!("{}", store.count_generation(n)?);
        }
        Commands::Status => status_command(&config)?,
        Commands::Show { n, limit } => show_command(&config, n, limit)?,
        Commands::Verify { repair } => verify_command(&config, repair)?,
    }

    Ok(())
}

fn open_store(config: &GeneratorConfig) -> Result<FileStore> {
    FileStore::open(&config.data_dir, config.batch_size)
        .with_context(|| format!("opening store at {}", config.data_dir.display()))
}

fn generate_command(config: &GeneratorConfig, n: usize, quiet: bool) -> Result<()> {
    let store = open_store(config)?;
    let already = store.max_complete_generation()?;

    let mut generator = Generator::new(store).with_verification(config.verify_matches);
    if !quiet {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:>6} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("=> "),
        );
        let reporter = bar.clone();
        generator = generator.with_progress(move |p: Progress| {
            if p.processed == 1 {
                reporter.reset();
                reporter.set_length(p.total as u64);
                reporter.set_message(format!("n={}", p.n));
            }
            reporter.set_position(p.processed as u64);
            if p.processed == p.total {
                reporter.finish_and_clear();
            }
        });
    }

    let generation = generator.advance_to(n)?;
    info!(
        n,
        shapes = generation.len(),
        resumed_from = already,
        computed = generator.computed().len(),
        "done"
    );

    let store = generator.store();
    for m in store.complete_generations()? {
        if m <= n {
            println!("n={:<3} {}", m, store.count_generation(m)?);
        }
    }
    Ok(())
}

fn status_command(config: &GeneratorConfig) -> Result<()> {
    let store = open_store(config)?;
    let complete = store.complete_generations()?;
    if complete.is_empty() {
        println!("No complete generations in {}", config.data_dir.display());
        return Ok(());
    }

    println!("Store: {}", config.data_dir.display());
    println!("Highest complete generation: {}", store.max_complete_generation()?);
    for n in complete {
        println!("  n={:<3} {} shapes", n, store.count_generation(n)?);
    }
    Ok(())
}

fn show_command(config: &GeneratorConfig, n: usize, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let shapes = store.get_generation(n)?;
    println!("n={} ({} shapes)", n, shapes.len());
    for (i, shape) in shapes.iter().take(limit).enumerate() {
        let e = shape.extent();
        println!();
        println!("#{} {}x{}x{}", i + 1, e.x, e.y, e.z);
        print!("{shape}");
    }
    if shapes.len() > limit {
        println!();
        println!("... {} more", shapes.len() - limit);
    }
    Ok(())
}

fn verify_command(config: &GeneratorConfig, repair: bool) -> Result<()> {
    if repair {
        let store = FileStore::recover(&config.data_dir, config.batch_size)
            .with_context(|| format!("recovering store at {}", config.data_dir.display()))?;
        let mut generator = Generator::new(store);
        let discarded = generator.discard_corrupt()?;
        if discarded.is_empty() {
            println!("All generations are intact");
        } else {
            println!("Discarded generations for recompute: {discarded:?}");
        }
        return Ok(());
    }

    let store = open_store(config).context("rerun with --repair to rebuild the manifest")?;
    let mut corrupt = 0;
    for health in Generator::new(store).check()? {
        match health {
            Health::Intact { n, shapes } => println!("n={:<3} ok ({} shapes)", n, shapes),
            Health::Corrupt { n, reason } => {
                corrupt += 1;
                println!("n={:<3} corrupt: {}", n, reason);
            }
        }
    }
    anyhow::ensure!(corrupt == 0, "{corrupt} generation(s) failed to load; rerun with --repair");
    Ok(())
}
