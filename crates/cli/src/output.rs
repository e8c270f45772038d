//! Output formatting for CLI

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use deckgen_common::DeckReport;
use deckgen_e2e::runner::ScenarioResult;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn table_of<T: TableDisplay>(items: &[T]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(T::headers());
    for item in items {
        table.add_row(item.row());
    }
    table
}

fn plain_lines<T: TableDisplay>(item: &T) -> Vec<String> {
    T::headers()
        .iter()
        .zip(item.row())
        .map(|(header, value)| format!("{}: {}", header, value))
        .collect()
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{}", table_of(std::slice::from_ref(item))),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(item).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for line in plain_lines(item) {
                println!("{}", line);
            }
        }
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => println!("{}", table_of(items)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                for line in plain_lines(item) {
                    println!("{}", line);
                }
            }
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

/// Outcome of a single wait command
#[derive(Debug, Clone, Serialize)]
pub struct WaitRow {
    pub entity: String,
    pub target: String,
    pub outcome: String,
    pub status: Option<String>,
    pub detail: Option<String>,
    pub elapsed_ms: u64,
}

impl TableDisplay for WaitRow {
    fn headers() -> Vec<&'static str> {
        vec!["Entity", "Target", "Outcome", "Status", "Detail", "Elapsed (ms)"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.entity.clone(),
            self.target.clone(),
            self.outcome.clone(),
            self.status.clone().unwrap_or_else(|| "-".to_string()),
            self.detail.clone().unwrap_or_else(|| "-".to_string()),
            self.elapsed_ms.to_string(),
        ]
    }
}

impl TableDisplay for ScenarioResult {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Result", "Stages", "Project", "Duration (ms)", "Error"]
    }

    fn row(&self) -> Vec<String> {
        let passed = self.stages.iter().filter(|s| s.success).count();
        vec![
            self.name.clone(),
            if self.success { "PASS" } else { "FAIL" }.to_string(),
            format!("{}/{}", passed, self.stages.len()),
            self.project_id.clone().unwrap_or_else(|| "-".to_string()),
            self.duration_ms.to_string(),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

impl TableDisplay for DeckReport {
    fn headers() -> Vec<&'static str> {
        vec!["Path", "Valid", "Size", "Slides", "Empty", "Missing keywords", "Message"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.path.clone(),
            self.valid.to_string(),
            self.size_bytes.to_string(),
            self.slide_count.to_string(),
            self.empty_slides.to_string(),
            self.missing_keywords.join(", "),
            self.message.clone(),
        ]
    }
}
