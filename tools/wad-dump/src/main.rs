//! Inspect and extract lumps from Ashfall asset containers.
//!
//! ```text
//! wad-dump list game.rom ashfall.pk3
//! wad-dump cat -s textures BRICK game.rom > brick.bin
//! ```

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use ashfall_wad::{Registry, Section};

#[derive(Parser)]
#[command(name = "wad-dump", about = "Inspect and extract lumps from asset containers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every lump, grouped by section
    List {
        /// Containers in load order; later ones shadow earlier ones
        #[arg(required = true)]
        containers: Vec<PathBuf>,

        /// Only list this section
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Write one lump's decoded bytes to stdout
    Cat {
        /// Lump name (case-insensitive)
        name: String,

        /// Containers in load order; later ones shadow earlier ones
        #[arg(required = true)]
        containers: Vec<PathBuf>,

        /// Section to look in
        #[arg(short, long, default_value = "normal")]
        section: String,
    },
}

fn parse_section(name: &str) -> Result<Section> {
    Section::ALL
        .into_iter()
        .find(|s| s.as_str() == name.to_ascii_lowercase())
        .with_context(|| format!("unknown section '{name}'"))
}

fn load(containers: &[PathBuf]) -> Result<Registry> {
    let mut registry = Registry::with_default_loaders();
    for path in containers {
        registry
            .add_device_path(path)
            .with_context(|| format!("failed to add '{}'", path.display()))?;
    }
    registry.merge();
    Ok(registry)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::List { containers, section } => {
            let registry = load(&containers)?;

            let sections: Vec<Section> = match section {
                Some(name) => vec![parse_section(&name)?],
                None => Section::ALL.to_vec(),
            };

            for section in sections {
                let lumps = registry.list_section(section);
                if lumps.is_empty() {
                    continue;
                }

                println!("{} ({} lumps)", section, lumps.len());
                for lump in lumps {
                    let index = lump
                        .global_index()
                        .map(|i| i.to_string())
                        .unwrap_or_default();
                    let mut versions = 0;
                    let mut v = lump.previous();
                    while let Some(older) = v {
                        versions += 1;
                        v = older.previous();
                    }
                    if versions > 0 {
                        println!("  {:>5} {} (+{} shadowed)", index, lump.name(), versions);
                    } else {
                        println!("  {:>5} {}", index, lump.name());
                    }
                }
            }
        }

        Command::Cat { name, containers, section } => {
            let registry = load(&containers)?;
            let section = parse_section(&section)?;

            let Some(mut lump) = registry.open(section, &name) else {
                bail!("no lump '{}' in section '{}'", name, section);
            };

            let bytes = lump.bytes()?;
            std::io::stdout().write_all(bytes)?;
        }
    }

    Ok(())
}
