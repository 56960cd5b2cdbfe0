use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::{debug, info};

use crate::error::ScrapeError;
use crate::parser::blocks::DataBlock;
use crate::parser::fields::FIELD_DELIMITER;
use crate::record::{ScrapeResult, Target, RECORD_COLUMNS};

/// Where finished targets go.
pub trait ResultSink {
    fn persist(&mut self, result: &ScrapeResult) -> Result<(), ScrapeError>;
}

/// `|`-delimited record file, appended to across runs. The header is written
/// only when the file starts out empty.
pub struct CsvOutput {
    path: PathBuf,
    writer: csv::Writer<File>,
    include_raw: bool,
}

impl CsvOutput {
    pub fn open(path: &Path, include_raw: bool) -> Result<Self, ScrapeError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = WriterBuilder::new()
            .delimiter(FIELD_DELIMITER as u8)
            .has_headers(false)
            .from_writer(file);

        if is_new {
            let mut header: Vec<&str> = RECORD_COLUMNS.to_vec();
            if include_raw {
                header.push("raw_fields");
            }
            writer.write_record(&header)?;
            writer.flush()?;
            debug!("Wrote header to {}", path.display());
        }

        Ok(CsvOutput {
            path: path.to_path_buf(),
            writer,
            include_raw,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvOutput {
    fn persist(&mut self, result: &ScrapeResult) -> Result<(), ScrapeError> {
        for review in &result.reviews {
            let mut row = review.record.to_row(&result.target.entry_url);
            if self.include_raw {
                row.push(raw_fields(&review.block));
            }
            self.writer.write_record(&row)?;
        }
        self.writer.flush()?;
        info!(
            "Saved {} records for {} to {}",
            result.len(),
            result.target.name,
            self.path.display()
        );
        Ok(())
    }
}

/// Pre-parse fragments joined into one delimiter-safe cell.
fn raw_fields(block: &DataBlock) -> String {
    block
        .fields
        .iter()
        .map(|f| f.replace(FIELD_DELIMITER, ",").replace(['\n', '\r'], " "))
        .collect::<Vec<_>>()
        .join(" ;; ")
}

/// Append-only, human-readable dump of every located block.
pub struct RawDump {
    out: BufWriter<File>,
}

impl RawDump {
    pub fn open(path: &Path) -> Result<Self, ScrapeError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(RawDump {
            out: BufWriter::new(file),
        })
    }

    pub fn write_block(&mut self, target: &Target, page: usize, block: &DataBlock) -> Result<(), ScrapeError> {
        writeln!(
            self.out,
            "=== {} | {} | page {} | [{}, {}) ===",
            target.name, target.entry_url, page, block.window.start, block.window.end
        )?;
        for (i, field) in block.fields.iter().enumerate() {
            writeln!(self.out, "{:>3}: {}", i, field)?;
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
