use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::ir::Record;
use crate::progress::ConsoleProgress;
use crate::textutil::sanitize_dir_name;

pub const METADATA_FILE: &str = "metadata.json";
pub const DATA_FILE: &str = "data.json";

#[derive(Debug, Default)]
pub struct EmitReport {
    pub written: Vec<PathBuf>,
    /// (directory name, error chain) for every record that could not be written.
    pub failed: Vec<(String, String)>,
    pub images: usize,
}

impl EmitReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One directory name per record, in order. Titles that sanitize to the same name get a
/// `_2`, `_3`, ... suffix.
pub fn record_dir_names(records: &[Record]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(records.len());
    for r in records {
        let base = sanitize_dir_name(&r.metadata.title);
        let mut name = base.clone();
        let mut n = 2usize;
        while !seen.insert(name.clone()) {
            name = format!("{base}_{n}");
            n += 1;
        }
        if name != base {
            tracing::warn!(title = %r.metadata.title, dir = %name, "record directory name collision");
        }
        out.push(name);
    }
    out
}

/// Writes `metadata.json`, `data.json` and the record's image files into `dir`.
pub fn write_record(dir: &Path, record: &Record) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create record dir: {}", dir.display()))?;

    let meta = serde_json::to_vec_pretty(&record.metadata).context("serialize metadata")?;
    let meta_path = dir.join(METADATA_FILE);
    std::fs::write(&meta_path, meta)
        .with_context(|| format!("write metadata: {}", meta_path.display()))?;

    let data = serde_json::to_vec_pretty(&record.content_document()).context("serialize content")?;
    let data_path = dir.join(DATA_FILE);
    std::fs::write(&data_path, data)
        .with_context(|| format!("write content: {}", data_path.display()))?;

    for asset in &record.assets {
        let path = dir.join(&asset.file_name);
        std::fs::write(&path, &asset.bytes)
            .with_context(|| format!("write image: {}", path.display()))?;
    }
    Ok(())
}

/// Writes every record below `output_dir`. A failing record is reported and skipped; the
/// rest are still written.
pub fn emit_records(
    output_dir: &Path,
    records: &[Record],
    progress: &ConsoleProgress,
) -> anyhow::Result<EmitReport> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create output dir: {}", output_dir.display()))?;

    let mut report = EmitReport::default();
    let names = record_dir_names(records);
    for (idx, (record, name)) in records.iter().zip(names).enumerate() {
        progress.record(idx + 1, records.len(), &name);
        let dir = output_dir.join(&name);
        match write_record(&dir, record) {
            Ok(()) => {
                report.images += record.assets.len();
                report.written.push(dir);
            }
            Err(err) => {
                tracing::error!(record = %name, "write failed: {err:#}");
                report.failed.push((name, format!("{err:#}")));
            }
        }
    }
    Ok(report)
}
