//! Budget import CLI - turn budget spreadsheets into priced line items
//!
//! # Main Commands
//!
//! ```bash
//! budget-import serve                  # Start HTTP server (port 3000)
//! budget-import extract budget.csv     # Extract line items as JSON
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! budget-import grid budget.csv        # Show the loaded grid
//! budget-import header budget.csv      # Score header candidates
//! budget-import columns budget.csv     # Show the column mapping
//! budget-import validate result.json   # Check a result against the schema
//! budget-import config                 # Print the default configuration
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use budget_import::{
    detect_header, enrich_with_config, extract_parsed, map_columns, parse_grid_file, score_rows,
    validate_extraction_result, ParserConfig,
};
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "budget-import")]
#[command(about = "Extract estimate line items from budget spreadsheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: CSV → header → columns → region → line items → totals
    Extract {
        /// Input CSV file
        input: PathBuf,

        /// Parser configuration JSON (default: $BUDGET_IMPORT_CONFIG or built-in)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run the classifier over the extracted items
        #[arg(long)]
        enrich: bool,
    },

    /// Show header scores for the scanned rows
    Header {
        /// Input CSV file
        input: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the column mapping for the detected header row
    Columns {
        /// Input CSV file
        input: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Load a CSV and print the grid as JSON
    Grid {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate an extraction result JSON against its schema
    Validate {
        /// Input JSON file
        input: PathBuf,
    },

    /// Print the default configuration
    Config {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input,
            config,
            output,
            enrich,
        } => cmd_extract(&input, config.as_deref(), output.as_deref(), enrich).await,

        Commands::Header { input, config } => cmd_header(&input, config.as_deref()),

        Commands::Columns { input, config } => cmd_columns(&input, config.as_deref()),

        Commands::Grid { input, output } => cmd_grid(&input, output.as_deref()),

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Config { output } => cmd_config(output.as_deref()),

        Commands::Serve { port, config } => cmd_serve(port, config.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<ParserConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => {
            eprintln!("⚙️  Config: {}", p.display());
            ParserConfig::from_file(p)?
        }
        None => ParserConfig::from_env()?,
    };
    Ok(config)
}

async fn cmd_extract(
    input: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    enrich: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Extracting: {}", input.display());

    let config = load_config(config)?;
    let parsed = parse_grid_file(input)?;
    let mut result = extract_parsed(&parsed, &config)?;

    if enrich || config.enrichment.enabled {
        enrich_with_config(&mut result, &config.enrichment).await;
    }

    eprintln!("\n{}", "=".repeat(60));
    eprintln!("📊 SUMMARY");
    eprintln!("{}", "=".repeat(60));
    eprintln!("   Header row:     {}", result.header_row_index + 1);
    eprintln!("   Items:          {}", result.items.len());
    eprintln!("   Rows split:     {}", result.compound_rows_split);
    eprintln!("   Total cost:     {}", result.total_cost);
    eprintln!("   Total price:    {}", result.total_price);
    eprintln!("   Confidence:     {:.2}", result.mapping_confidence);
    eprintln!("   Warnings:       {}", result.warnings.len());
    for warning in &result.warnings {
        eprintln!("     - {}", warning);
    }
    eprintln!("{}\n", "=".repeat(60));

    let json = serde_json::to_string_pretty(&result)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_header(input: &Path, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let parsed = parse_grid_file(input)?;

    let best = detect_header(&parsed.grid, &config).ok();
    for candidate in score_rows(&parsed.grid, &config) {
        let marker = if Some(candidate.row) == best { "◀" } else { "" };
        println!("row {:>3}  score {:>4}  {}", candidate.row + 1, candidate.score, marker);
    }

    match best {
        Some(row) => eprintln!("✅ Header row: {}", row + 1),
        None => eprintln!("❌ No row reached the minimum score of {}", config.min_header_score),
    }
    Ok(())
}

fn cmd_columns(input: &Path, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let parsed = parse_grid_file(input)?;

    let header_row = detect_header(&parsed.grid, &config)?;
    let mapping = map_columns(&parsed.grid, header_row, &config);

    eprintln!("✅ Header row: {}", header_row + 1);
    println!("{}", serde_json::to_string_pretty(&mapping)?);
    Ok(())
}

fn cmd_grid(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = parse_grid_file(input)?;

    eprintln!("   Encoding: {}", parsed.encoding);
    eprintln!("   Delimiter: '{}'", budget_import::extract::pipeline::format_delimiter(parsed.delimiter));
    eprintln!("✅ Loaded {} rows", parsed.grid.len());

    let json = serde_json::to_string_pretty(&parsed.grid)?;
    write_output(&json, output)?;
    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    let content = fs::read_to_string(input)?;
    let value: Value = serde_json::from_str(&content)?;

    match validate_extraction_result(&value) {
        Ok(()) => {
            eprintln!("✅ Valid extraction result");
            Ok(())
        }
        Err(errors) => {
            for err in errors.iter().take(10) {
                eprintln!("   - {}", err);
            }
            Err(format!("{} schema errors", errors.len()).into())
        }
    }
}

fn cmd_config(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let json = ParserConfig::default().to_json()?;
    write_output(&json, output)
}

async fn cmd_serve(port: u16, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    budget_import::server::start_server(port, config).await?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
