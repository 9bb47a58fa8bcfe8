pub mod emit;
pub mod equation;
pub mod reconstruct;
pub mod segment;

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::config::ParseRules;
use crate::error::HwpxError;
use crate::hwpx::{HwpxPackage, PartMap, ResourceIndex, StyleTable};
use crate::ir::Record;
use crate::progress::ConsoleProgress;

pub use emit::{emit_records, record_dir_names, write_record, EmitReport};
pub use reconstruct::ParagraphBuilder;
pub use segment::{collect_paragraphs, RecordSegmenter};

/// Runs style, manifest and segmentation passes over already loaded parts.
pub fn extract_records(parts: &PartMap, rules: &ParseRules) -> Vec<Record> {
    let styles = StyleTable::from_header(parts.xml(&rules.parts.header));
    let resources =
        ResourceIndex::from_manifest(parts.xml(&rules.parts.manifest), &rules.images.media_type_prefix);

    let sections: Vec<_> = parts.section_parts().into_iter().map(|s| &s.root).collect();
    let paragraphs = collect_paragraphs(&sections);
    tracing::debug!(sections = sections.len(), paragraphs = paragraphs.len(), "collected paragraphs");

    let builder = ParagraphBuilder::new(&styles, &resources, parts, rules);
    RecordSegmenter::new(rules, builder)
        .resolve_section_style(&styles)
        .segment(&paragraphs)
}

pub fn load_parts(input: &Path, rules: &ParseRules) -> anyhow::Result<PartMap> {
    let pkg = HwpxPackage::read(input)
        .with_context(|| format!("open hwpx: {}", input.display()))?;
    let parts = pkg
        .load_parts(&rules.parts)
        .with_context(|| format!("load parts: {}", input.display()))?;
    if parts.section_parts().is_empty() {
        return Err(HwpxError::MissingPart(format!("{}*.xml", rules.parts.section_prefix)))
            .with_context(|| format!("not an hwpx document: {}", input.display()));
    }
    Ok(parts)
}

/// Full conversion: read the package, split it into records and write them below `output_dir`.
pub fn convert_hwpx(
    input: &Path,
    output_dir: &Path,
    rules: &ParseRules,
    progress: &ConsoleProgress,
) -> anyhow::Result<EmitReport> {
    progress.info(format!("reading {}", input.display()));
    let parts = load_parts(input, rules)?;
    let records = extract_records(&parts, rules);
    progress.info(format!("found {} records", records.len()));
    if records.is_empty() {
        tracing::warn!(
            title_text_height = rules.metadata.title_text_height,
            "no title paragraphs matched; nothing to write"
        );
    }
    let report = emit_records(output_dir, &records, progress)?;
    progress.info(format!(
        "wrote {} records ({} images) to {}",
        report.written.len(),
        report.images,
        output_dir.display()
    ));
    Ok(report)
}

#[derive(Debug, Serialize)]
pub struct PackageSummary {
    pub parts: Vec<String>,
    pub sections: Vec<String>,
    pub char_styles: usize,
    pub para_styles: Vec<StyleSummary>,
    pub images: Vec<ImageSummary>,
    pub records: Vec<RecordSummary>,
}

#[derive(Debug, Serialize)]
pub struct StyleSummary {
    pub id: String,
    pub name: String,
    pub eng_name: String,
}

#[derive(Debug, Serialize)]
pub struct ImageSummary {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub embedded: bool,
}

#[derive(Debug, Serialize)]
pub struct RecordSummary {
    pub dir_name: String,
    pub order: u32,
    pub section: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub paragraphs: usize,
    pub images: usize,
}

/// Dry-run view of a package: what it contains and which records it would produce. Helps
/// pick `section_style_id` and `title_text_height` for an unfamiliar document.
pub fn inspect_hwpx(input: &Path, rules: &ParseRules) -> anyhow::Result<PackageSummary> {
    let parts = load_parts(input, rules)?;
    let styles = StyleTable::from_header(parts.xml(&rules.parts.header));
    let resources =
        ResourceIndex::from_manifest(parts.xml(&rules.parts.manifest), &rules.images.media_type_prefix);
    let records = extract_records(&parts, rules);
    let names = record_dir_names(&records);

    Ok(PackageSummary {
        parts: parts.names().map(|s| s.to_string()).collect(),
        sections: parts.section_parts().iter().map(|p| p.name.clone()).collect(),
        char_styles: styles.char_styles().len(),
        para_styles: styles
            .para_styles()
            .iter()
            .map(|(id, s)| StyleSummary {
                id: id.clone(),
                name: s.name.clone(),
                eng_name: s.eng_name.clone(),
            })
            .collect(),
        images: resources
            .iter()
            .map(|(id, e)| ImageSummary {
                id: id.to_string(),
                href: e.href.clone(),
                media_type: e.media_type.clone(),
                embedded: e.embedded,
            })
            .collect(),
        records: records
            .iter()
            .zip(names)
            .map(|(r, dir_name)| RecordSummary {
                dir_name,
                order: r.metadata.order,
                section: r.metadata.section.clone(),
                title: r.metadata.title.clone(),
                subtitle: r.metadata.subtitle.clone(),
                paragraphs: r.body.len(),
                images: r.assets.len(),
            })
            .collect(),
    })
}
