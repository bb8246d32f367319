use clap::{Parser, Subcommand};
use richcompose::config::ComposeConfig;
use richcompose::convert::{HtmlConverter, to_html};
use richcompose::image::PlaceholderResolver;
use richcompose::session::{load_state, save_state, state_file_path};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "richcompose")]
#[command(about = "Sanitize and convert compose HTML", long_about = None)]
struct Args {
    /// Configuration file (default: ~/.richcomposerc)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the sanitized markup
    Sanitize {
        /// Input file (default: stdin)
        file: Option<PathBuf>,
    },
    /// Print the styled text and its style ranges
    Convert {
        /// Input file (default: stdin)
        file: Option<PathBuf>,
    },
    /// Convert to styled text and back to HTML
    Roundtrip {
        /// Input file (default: stdin)
        file: Option<PathBuf>,
    },
    /// Show or change the saved raw paste mode
    Raw {
        /// on/off; prints the saved mode when omitted
        #[arg(value_parser = clap::builder::BoolishValueParser::new())]
        value: Option<bool>,
    },
}

fn read_input(file: Option<&Path>) -> Result<String, String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e)),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            Ok(input)
        }
    }
}

fn cmd_sanitize(converter: &HtmlConverter, file: Option<&Path>) -> Result<(), String> {
    let input = read_input(file)?;
    println!("{}", converter.sanitize(&input).to_html());
    Ok(())
}

fn cmd_convert(converter: &HtmlConverter, file: Option<&Path>) -> Result<(), String> {
    let input = read_input(file)?;
    let buffer = converter.spanned(&input);
    println!("{:?}", buffer.text());
    for range in buffer.ranges() {
        println!("{} {}..{}", range.kind.name(), range.start, range.end);
    }
    Ok(())
}

fn cmd_roundtrip(converter: &HtmlConverter, file: Option<&Path>) -> Result<(), String> {
    let input = read_input(file)?;
    println!("{}", to_html(&converter.spanned(&input)));
    Ok(())
}

fn cmd_raw(value: Option<bool>) -> Result<(), String> {
    let path = state_file_path().ok_or("Could not determine the data directory")?;
    let mut state = load_state(&path).unwrap_or_default();
    if let Some(raw) = value {
        state.raw = raw;
        save_state(&path, &state)
            .map_err(|e| format!("Failed to save {}: {}", path.display(), e))?;
    }
    println!("raw = {}", state.raw);
    Ok(())
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let config = ComposeConfig::load(args.config.as_deref());
    let converter = HtmlConverter::new(config.policy, config.theme, Arc::new(PlaceholderResolver));

    let result = match &args.command {
        Commands::Sanitize { file } => cmd_sanitize(&converter, file.as_deref()),
        Commands::Convert { file } => cmd_convert(&converter, file.as_deref()),
        Commands::Roundtrip { file } => cmd_roundtrip(&converter, file.as_deref()),
        Commands::Raw { value } => cmd_raw(*value),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
