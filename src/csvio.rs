// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed CSV reading/writing for stage outputs, plus the collector's checkpoint writer
// role: io/csv
// inputs: Paths to stage CSVs; CsvRecord rows
// outputs: Vec<T> read back and validated; files written with header-first layout
// side_effects: Creates parent directories; renames checkpoint files on commit
// invariants:
// - read_records fails with MissingInput naming the producing stage when the file is absent
// - every row read is validated before being returned
// - a checkpoint is only renamed onto the final path by commit()
// errors: PipelineError::{MissingInput, InvalidRecord, Csv, Io}
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::model::CsvRecord;
use crate::util::ensure_dir;

pub fn read_records<T: CsvRecord>(path: &Path, stage: &'static str) -> Result<Vec<T>> {
  if !path.exists() {
    return Err(PipelineError::missing_input(path, stage));
  }

  let mut reader = csv::Reader::from_path(path)?;
  let mut out = Vec::new();

  for row in reader.deserialize::<T>() {
    let rec = row?;
    rec.validate().map_err(|reason| PipelineError::InvalidRecord {
      path: path.to_path_buf(),
      reason,
    })?;
    out.push(rec);
  }

  Ok(out)
}

pub fn write_records<T: CsvRecord>(path: &Path, rows: &[T]) -> Result<()> {
  if let Some(parent) = path.parent() {
    ensure_dir(parent)?;
  }

  let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
  writer.write_record(T::HEADERS)?;
  for row in rows {
    writer.serialize(row)?;
  }
  writer.flush()?;

  Ok(())
}

/// Append-only CSV writer backed by `<path>.partial`; rows are flushed one by one.
pub struct CheckpointWriter<T: CsvRecord> {
  final_path: PathBuf,
  partial_path: PathBuf,
  writer: csv::Writer<File>,
  previous: Vec<T>,
}

impl<T: CsvRecord> CheckpointWriter<T> {
  pub fn partial_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
  }

  /// Open the checkpoint for `path`. With `resume`, rows already in an existing
  /// checkpoint are kept (see `previous`); otherwise the checkpoint starts empty.
  pub fn open(path: &Path, resume: bool) -> Result<Self> {
    if let Some(parent) = path.parent() {
      ensure_dir(parent)?;
    }
    let partial_path = Self::partial_path_for(path);

    let previous: Vec<T> = if resume && partial_path.exists() {
      read_records(&partial_path, "collect-pulls")?
    } else {
      Vec::new()
    };

    let writer = if previous.is_empty() {
      let mut w = csv::WriterBuilder::new().has_headers(false).from_path(&partial_path)?;
      w.write_record(T::HEADERS)?;
      w.flush()?;
      w
    } else {
      let file = OpenOptions::new().append(true).open(&partial_path)?;
      csv::WriterBuilder::new().has_headers(false).from_writer(file)
    };

    Ok(CheckpointWriter {
      final_path: path.to_path_buf(),
      partial_path,
      writer,
      previous,
    })
  }

  /// Rows recovered from an earlier interrupted run.
  pub fn previous(&self) -> &[T] {
    &self.previous
  }

  pub fn push(&mut self, row: &T) -> Result<()> {
    self.writer.serialize(row)?;
    self.writer.flush()?;
    Ok(())
  }

  /// Move the checkpoint onto the final path.
  pub fn commit(mut self) -> Result<PathBuf> {
    self.writer.flush()?;
    drop(self.writer);
    std::fs::rename(&self.partial_path, &self.final_path)?;
    Ok(self.final_path)
  }
}
