use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use mdpdf::Config;

/// Config file picked up from the input's directory when `--config` is not given
const DEFAULT_CONFIG_NAME: &str = "mdpdf.toml";

#[derive(Parser)]
#[command(name = "mdpdf")]
#[command(about = "Convert Markdown files to PDF")]
struct Cli {
    /// Input Markdown file
    input: PathBuf,

    /// Output PDF file (defaults to input name with .pdf extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            let dir = cli.input.parent().unwrap_or(Path::new("."));
            Config::load(&dir.join(DEFAULT_CONFIG_NAME))
        }
    };

    let markdown = match fs::read_to_string(&cli.input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {}: {}", cli.input.display(), e);
            std::process::exit(1);
        }
    };

    let output = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension("pdf"));

    if let Err(e) = mdpdf::transform_with_config(&markdown, &output, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    println!("Created {}", output.display());
}
