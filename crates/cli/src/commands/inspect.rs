//! Deck inspection command

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use deckgen_common::{DeckExpectations, DeckInspector, DeckReport};

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct InspectArgs {
    /// Path to the exported .pptx deck
    pub path: PathBuf,

    /// Minimum number of slides
    #[arg(long, default_value = "1")]
    pub min_slides: usize,

    /// Keyword the deck text must contain (repeatable)
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,
}

pub async fn execute(args: InspectArgs, format: OutputFormat) -> anyhow::Result<bool> {
    let expect = DeckExpectations {
        min_slides: args.min_slides,
        keywords: args.keywords,
    };

    let report = DeckInspector::new().inspect(&args.path, &expect)?;

    match format {
        OutputFormat::Table => print_summary(&report),
        _ => output::print_item(&report, format),
    }

    Ok(report.valid)
}

fn print_summary(report: &DeckReport) {
    println!();
    println!("{}", "━".repeat(60).dimmed());
    println!("{}", " Deck Inspection Report".bold());
    println!("{}", "━".repeat(60).dimmed());
    println!();

    println!("{}  {}", "📦 Input:".bold(), report.path);
    println!("   Size:    {} bytes", report.size_bytes);
    if let Some(ref sha) = report.sha256 {
        println!("   SHA256:  {}", sha.dimmed());
    }
    println!();

    println!("{}", "🖼  Slides".bold());
    println!(
        "   Total: {} ({} empty)",
        report.slide_count, report.empty_slides
    );
    for slide in &report.slides {
        let text = if slide.text.is_empty() {
            "(empty)".dimmed().to_string()
        } else {
            truncate(&slide.text, 60)
        };
        println!("     {:>3}. {}", slide.index, text);
    }
    println!();

    if !report.found_keywords.is_empty() || !report.missing_keywords.is_empty() {
        println!("{}", "🔎 Keywords".bold());
        for keyword in &report.found_keywords {
            println!("   {} {}", "✓".green(), keyword);
        }
        for keyword in &report.missing_keywords {
            println!("   {} {}", "✗".red(), keyword);
        }
        println!();
    }

    if report.valid {
        output::print_success(&report.message);
    } else {
        output::print_error(&report.message);
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}…", head)
    }
}
