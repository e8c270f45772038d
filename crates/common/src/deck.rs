//! Exported Deck Inspection
//!
//! Checks that a `.pptx` file produced by the export endpoint is usable:
//! - the file exists and is not suspiciously small
//! - it is a readable Office Open XML package
//! - it has at least the expected number of slides
//! - it contains the expected keywords (case-insensitive)
//! - not every slide is empty

use std::fs::File;
use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::Result;

/// Files smaller than this cannot hold a real presentation
pub const MIN_DECK_BYTES: u64 = 1000;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// What an exported deck is expected to contain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckExpectations {
    #[serde(default = "default_min_slides")]
    pub min_slides: usize,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_min_slides() -> usize {
    1
}

impl Default for DeckExpectations {
    fn default() -> Self {
        Self {
            min_slides: default_min_slides(),
            keywords: Vec::new(),
        }
    }
}

/// Text and shape count of one slide
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SlideSummary {
    pub index: usize,
    pub shape_count: usize,
    pub text: String,
}

/// Result of inspecting an exported deck
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeckReport {
    pub path: String,
    pub exists: bool,
    pub size_bytes: u64,
    pub sha256: Option<String>,
    pub slide_count: usize,
    pub empty_slides: usize,
    pub slides: Vec<SlideSummary>,
    pub found_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub valid: bool,
    pub message: String,
}

impl DeckReport {
    fn reject(mut self, message: impl Into<String>) -> Self {
        self.valid = false;
        self.message = message.into();
        warn!("Deck {} rejected: {}", self.path, self.message);
        self
    }
}

/// Inspector for exported `.pptx` decks
#[derive(Debug, Default)]
pub struct DeckInspector;

impl DeckInspector {
    pub fn new() -> Self {
        Self
    }

    /// Inspect a deck on disk.
    ///
    /// Content problems are reported through `DeckReport::valid`; only I/O
    /// failures while reading an existing file are returned as errors.
    pub fn inspect<P: AsRef<Path>>(&self, path: P, expect: &DeckExpectations) -> Result<DeckReport> {
        let path = path.as_ref();
        let report = DeckReport {
            path: path.display().to_string(),
            ..Default::default()
        };

        debug!("Inspecting deck: {}", path.display());

        if !path.exists() {
            return Ok(report.reject(format!("file does not exist: {}", path.display())));
        }

        let mut report = DeckReport {
            exists: true,
            size_bytes: std::fs::metadata(path)?.len(),
            sha256: Some(compute_file_sha256(path)?),
            ..report
        };

        if report.size_bytes < MIN_DECK_BYTES {
            let size = report.size_bytes;
            return Ok(report.reject(format!(
                "file is too small ({} bytes), probably corrupt",
                size
            )));
        }

        let slides = match read_slides(path) {
            Ok(slides) => slides,
            Err(reason) => return Ok(report.reject(reason)),
        };

        report.slide_count = slides.len();
        report.empty_slides = slides.iter().filter(|s| s.shape_count == 0).count();
        report.slides = slides;

        if report.slide_count < expect.min_slides {
            let count = report.slide_count;
            return Ok(report.reject(format!(
                "not enough slides: expected at least {}, found {}",
                expect.min_slides, count
            )));
        }

        if !expect.keywords.is_empty() {
            let all_text = report
                .slides
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();

            for keyword in &expect.keywords {
                if all_text.contains(&keyword.to_lowercase()) {
                    report.found_keywords.push(keyword.clone());
                } else {
                    report.missing_keywords.push(keyword.clone());
                }
            }

            if !report.missing_keywords.is_empty() {
                let missing = report.missing_keywords.join(", ");
                return Ok(report.reject(format!("missing expected keywords: {}", missing)));
            }
        }

        if report.empty_slides == report.slide_count {
            return Ok(report.reject("every slide is empty"));
        }

        report.valid = true;
        report.message = format!(
            "valid: {} slide(s), {:.2} KB",
            report.slide_count,
            report.size_bytes as f64 / 1024.0
        );
        Ok(report)
    }
}

/// Read every slide part of the package, ordered by slide number.
///
/// Errors are returned as human-readable rejection reasons.
fn read_slides(path: &Path) -> std::result::Result<Vec<SlideSummary>, String> {
    let file = File::open(path).map_err(|e| format!("cannot open deck: {}", e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|_| "file is not a valid PPTX package".to_string())?;

    if archive.by_name(PRESENTATION_PART).is_err() {
        return Err(format!("package has no {}", PRESENTATION_PART));
    }

    let mut slide_parts: Vec<(usize, String)> = archive
        .file_names()
        .filter_map(|name| {
            SLIDE_PART
                .captures(name)
                .and_then(|c| c[1].parse::<usize>().ok())
                .map(|n| (n, name.to_string()))
        })
        .collect();
    slide_parts.sort_by_key(|(n, _)| *n);

    let mut slides = Vec::with_capacity(slide_parts.len());
    for (index, name) in slide_parts {
        let mut xml = String::new();
        archive
            .by_name(&name)
            .map_err(|e| format!("cannot read {}: {}", name, e))?
            .read_to_string(&mut xml)
            .map_err(|e| format!("cannot read {}: {}", name, e))?;

        slides.push(SlideSummary {
            index,
            shape_count: SHAPE.find_iter(&xml).count(),
            text: slide_text(&xml),
        });
    }

    Ok(slides)
}

static SLIDE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("static regex"));

static SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<p:(sp|pic|graphicFrame|grpSp|cxnSp)[\s>]").expect("static regex")
});

/// A text-bearing shape; shapes never nest inside one another
static TEXT_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<p:sp[\s>].*?</p:sp>").expect("static regex"));

static PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<a:p[\s>].*?</a:p>").expect("static regex"));

static TEXT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a:t(?:\s[^>]*)?>([^<]*)</a:t>").expect("static regex"));

static CHAR_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(?:x([0-9a-fA-F]+)|([0-9]+));").expect("static regex"));

/// Text of a slide, entity-decoded.
///
/// Runs of a paragraph are concatenated as written, paragraphs of a shape
/// are joined with newlines and shapes with a single space.
pub fn slide_text(xml: &str) -> String {
    TEXT_SHAPE
        .find_iter(xml)
        .map(|shape| shape_text(shape.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shape_text(shape: &str) -> String {
    PARAGRAPH
        .find_iter(shape)
        .map(|paragraph| {
            TEXT_RUN
                .captures_iter(paragraph.as_str())
                .map(|c| decode_entities(&c[1]))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(s: &str) -> String {
    let named = s
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'");

    // `&amp;` last so an escaped reference such as `&amp;#38;` stays literal
    CHAR_REF
        .replace_all(&named, |c: &regex::Captures| {
            let code = match (c.get(1), c.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
                _ => None,
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| c[0].to_string())
        })
        .replace("&amp;", "&")
}

/// Compute SHA256 hash of a file
pub fn compute_file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
