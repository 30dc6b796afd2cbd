//! TSV export of per-lemma collocates
//!
//! One file per target lemma, `<target>.tsv`, tab-separated with the
//! header `word, other_form, surface_form, direction, freq, pmi,
//! example_sentence`. PMI is written with exactly four fractional digits
//! and rows follow the per-lemma query order.

use crate::error::{CollocError, Result};
use crate::query::{
    Collocate, CollocateLookup, CollocateParams, Direction, TableView, collocates_for,
};
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const EXPORT_TOP_N: usize = 50;
pub const EXPORT_MIN_BIGRAM_FREQ: u64 = 2;
pub const EXPORT_MIN_UNIGRAM_FREQ: u64 = 20;

/// Looser thresholds and a larger cap than the interactive defaults
pub fn export_params() -> CollocateParams {
    CollocateParams {
        min_bigram_freq: EXPORT_MIN_BIGRAM_FREQ,
        min_unigram_freq: EXPORT_MIN_UNIGRAM_FREQ,
        top_n: EXPORT_TOP_N,
        require_positive_pmi: true,
        ..CollocateParams::default()
    }
}

/// One line of an export file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub word: String,
    pub other_form: String,
    pub surface_form: String,
    pub direction: Direction,
    pub freq: u64,
    #[serde(serialize_with = "four_decimals")]
    pub pmi: f64,
    pub example_sentence: String,
}

fn four_decimals<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{value:.4}"))
}

impl ExportRow {
    /// Row for one collocate; the direction comes from the pair itself
    pub fn from_collocate(collocate: &Collocate, lowercase_surface: bool) -> Self {
        let surface = collocate.collocation.surface.trim();
        Self {
            word: collocate.target.clone(),
            other_form: collocate.other.clone(),
            surface_form: if lowercase_surface {
                surface.to_lowercase()
            } else {
                surface.to_string()
            },
            direction: collocate.direction(),
            freq: collocate.collocation.freq,
            pmi: collocate.collocation.pmi,
            example_sentence: collocate.collocation.example.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub params: CollocateParams,
    /// Case-fold the surface_form column
    pub lowercase_surface: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            params: export_params(),
            lowercase_surface: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { path: PathBuf, rows: usize },
    /// The lemma exists but nothing survived the export thresholds;
    /// no file is written
    NoCollocates,
    UnknownLemma,
}

/// Path of the export file for `target` inside `dir`. Path separators and
/// NUL in the lemma become `_` so the file always lands directly in `dir`.
pub fn export_path(dir: &Path, target: &str) -> PathBuf {
    let name: String = target
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    dir.join(format!("{name}.tsv"))
}

fn writer_builder() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder.delimiter(b'\t');
    builder
}

/// Write `rows` (with header) to `writer`
pub fn write_rows<W: Write>(writer: W, rows: &[ExportRow]) -> Result<()> {
    let mut tsv = writer_builder().from_writer(writer);
    if rows.is_empty() {
        tsv.write_record([
            "word",
            "other_form",
            "surface_form",
            "direction",
            "freq",
            "pmi",
            "example_sentence",
        ])?;
    }
    for row in rows {
        tsv.serialize(row)?;
    }
    tsv.flush()?;
    Ok(())
}

/// Run the per-lemma query for `target` and write its export file to `dir`
pub fn export_collocates(
    view: TableView<'_>,
    target: &str,
    dir: &Path,
    options: &ExportOptions,
) -> Result<ExportOutcome> {
    let collocates = match collocates_for(view, target, &options.params) {
        CollocateLookup::UnknownLemma(_) => {
            info!("'{target}' not found in lemma vocabulary, nothing exported");
            return Ok(ExportOutcome::UnknownLemma);
        }
        CollocateLookup::Found(collocates) => collocates,
    };
    if collocates.is_empty() {
        info!("no collocates found for '{target}' with export thresholds");
        return Ok(ExportOutcome::NoCollocates);
    }

    let rows: Vec<ExportRow> = collocates
        .iter()
        .map(|c| ExportRow::from_collocate(c, options.lowercase_surface))
        .collect();

    fs::create_dir_all(dir)?;
    let path = export_path(dir, target);
    let file = fs::File::create(&path).map_err(|source| CollocError::FileOpen {
        path: path.clone(),
        source,
    })?;
    write_rows(file, &rows)?;

    info!("exported {} collocations for '{target}' to {}", rows.len(), path.display());
    Ok(ExportOutcome::Written {
        path,
        rows: rows.len(),
    })
}

/// Parse export rows from any reader
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<ExportRow>> {
    let mut tsv = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(reader);
    let headers = tsv.headers()?.clone();

    let mut rows = Vec::new();
    for record in tsv.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let row: ExportRow = record
            .deserialize(Some(&headers))
            .map_err(|err| CollocError::InvalidRow {
                line,
                message: err.to_string(),
            })?;
        if row.word.is_empty() || row.other_form.is_empty() {
            return Err(CollocError::InvalidRow {
                line,
                message: "empty word or other_form".to_string(),
            });
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Parse an export file
pub fn read_export(path: &Path) -> Result<Vec<ExportRow>> {
    let file = fs::File::open(path).map_err(|source| CollocError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    read_rows(file)
}
