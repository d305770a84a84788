//! Build automation tasks for movieshop
//!
//! Currently generates the CLI reference from the clap definitions.

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for movieshop", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<movieshop_etl::Cli>();

    let content = format!(
        r#"# movieshop-etl CLI Reference

This documentation is generated from the CLI source code. Last updated: {}.

## Overview

`movieshop-etl` moves movie catalog JSON through raw, bronze and silver tables.
Records that fail validation are held in quarantine until `repair-quarantine`
reprocesses them.

## Quick Start

```bash
# Build every silver table from the raw input
movieshop-etl run

# Rebuild the movies tables from scratch
movieshop-etl run --entity movies --reset

# Inspect quarantined bronze rows
movieshop-etl show movies_bronze --status quarantine

# Load corrected quarantined movies
movieshop-etl repair-quarantine
```

## Commands

{}

## Environment Variables

- `MOVIESHOP_RAW_PATH` - Raw JSON file or directory (default: `./data/raw/movieshop`)
- `MOVIESHOP_BRONZE_ROOT` - Bronze table root (default: `./data/bronze`)
- `MOVIESHOP_SILVER_ROOT` - Silver table root and catalog (default: `./data/silver`)
- `MOVIESHOP_DATA_SOURCE` - Lineage source tag (default: `movieshop_final_project`)
- `MOVIESHOP_MATCH_KEY` - `payload` or `movie-id` (default: `payload`)
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`, `LOG_FILTER` - Logging

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());
    Ok(())
}
