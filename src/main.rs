//! foldmark - Command-line entry point
//!
//! Normalizes markdown through the document tree, or inspects its heading
//! outline and parsed structure.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use foldmark::config::{load_config, load_config_from, Settings};
use foldmark::document::Document;
use foldmark::error::{Error, Result};
use foldmark::markdown::{parse_markdown_with_options, serialize_document_with_options};
use foldmark::outline::extract_outline;
use log::{debug, error};

#[derive(Parser, Debug)]
#[command(name = "foldmark")]
#[command(version)]
#[command(about = "Markdown round-tripping with collapsible heading regions")]
struct Cli {
    /// Markdown file to read; reads stdin when omitted or '-'
    file: Option<PathBuf>,

    /// Print the heading outline with collapse state and visibility
    #[arg(long)]
    outline: bool,

    /// Print the parsed document tree as JSON
    #[arg(long, conflicts_with = "outline")]
    tree: bool,

    /// Settings file to use instead of the platform config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config(),
    };

    let input = read_input(cli.file.as_deref())?;
    let doc = parse_markdown_with_options(&input, &settings.markdown)?;
    debug!("Parsed {} top-level blocks", doc.blocks.len());

    if cli.outline {
        print_outline(&doc, &settings);
    } else if cli.tree {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("{}", serialize_document_with_options(&doc, &settings.markdown));
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).map_err(|source| Error::FileRead {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn print_outline(doc: &Document, settings: &Settings) {
    let outline = extract_outline(doc, &settings.collapse);
    for item in &outline.items {
        let marker = if item.collapsed { '▸' } else { '▾' };
        let visibility = if item.hidden { " (hidden)" } else { "" };
        println!(
            "{}{} H{} {}{}",
            "  ".repeat(item.indent_level()),
            marker,
            item.level,
            item.title,
            visibility
        );
    }
    println!("{} ({} hidden nodes)", outline.summary(), outline.hidden_count);
}
