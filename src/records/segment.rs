use crate::config::ParseRules;
use crate::hwpx::xml::XmlElement;
use crate::hwpx::StyleTable;
use crate::ir::{Record, RecordMetadata};
use crate::records::reconstruct::{paragraph_text, ParagraphBuilder};
use crate::textutil::pick_title_pair;

enum SegmentState {
    NoCurrentRecord,
    InRecord(Record),
}

/// Splits the flat paragraph stream into records. Each title-marked paragraph plus its
/// follower opens a record; later paragraphs go into that record's body.
pub struct RecordSegmenter<'a> {
    rules: &'a ParseRules,
    builder: ParagraphBuilder<'a>,
    section_style: Option<String>,
}

impl<'a> RecordSegmenter<'a> {
    pub fn new(rules: &'a ParseRules, builder: ParagraphBuilder<'a>) -> Self {
        Self {
            rules,
            builder,
            section_style: rules.section_style_id().map(str::to_string),
        }
    }

    /// Lets `section_style_id` name a paragraph style (`name` or `engName`) instead of an id.
    pub fn resolve_section_style(mut self, styles: &StyleTable) -> Self {
        if let Some(configured) = self.section_style.as_deref() {
            if styles.para_style(configured).is_none() {
                if let Some(id) = styles.para_style_id_by_name(configured) {
                    tracing::debug!(name = configured, id, "section style resolved by name");
                    self.section_style = Some(id.to_string());
                }
            }
        }
        self
    }

    pub fn segment(&self, paragraphs: &[&XmlElement]) -> Vec<Record> {
        let mut records: Vec<Record> = Vec::new();
        let mut state = SegmentState::NoCurrentRecord;
        let mut section: Option<String> = None;
        let mut order: u32 = 1;

        let mut i = 0usize;
        while i < paragraphs.len() {
            let p = paragraphs[i];

            if self.is_section_header(p) {
                let text = paragraph_text(p);
                if !text.is_empty() {
                    tracing::debug!(section = %text, "section header");
                    section = Some(text);
                    order = 1;
                }
            }

            if self.is_title_marker(p) {
                let first = paragraph_text(p);
                let second = paragraphs
                    .get(i + 1)
                    .map(|next| paragraph_text(next))
                    .unwrap_or_default();
                let (title, subtitle) = pick_title_pair(&first, &second);
                tracing::debug!(%title, %subtitle, order, "record opened");

                if let SegmentState::InRecord(done) = std::mem::replace(
                    &mut state,
                    SegmentState::InRecord(Record::new(RecordMetadata {
                        chapter: self.rules.metadata.chapter.clone(),
                        section: section.clone(),
                        title,
                        subtitle,
                        order,
                    })),
                ) {
                    records.push(done);
                }
                order += 1;
                i += 2;
                continue;
            }

            if let SegmentState::InRecord(record) = &mut state {
                let node = self.builder.build(p, &mut record.assets);
                if !node.children.is_empty() {
                    record.body.push(node);
                }
            }
            i += 1;
        }

        if let SegmentState::InRecord(done) = state {
            records.push(done);
        }
        records
    }

    fn is_section_header(&self, p: &XmlElement) -> bool {
        let Some(want) = self.section_style.as_deref() else {
            return false;
        };
        p.attr("styleIDRef")
            .map(|s| s.strip_prefix("style-").unwrap_or(s))
            .is_some_and(|s| s == want)
    }

    /// A title paragraph's first line segment has the configured text height.
    fn is_title_marker(&self, p: &XmlElement) -> bool {
        p.find_within("lineseg", "p")
            .and_then(|seg| seg.attr("textheight"))
            .and_then(|h| h.trim().parse::<u32>().ok())
            .is_some_and(|h| h == self.rules.metadata.title_text_height)
    }
}

/// Every `hp:p` of the given section roots, in document order (nested paragraphs included).
pub fn collect_paragraphs<'x>(sections: &[&'x XmlElement]) -> Vec<&'x XmlElement> {
    sections
        .iter()
        .copied()
        .flat_map(|root| root.descendants("p"))
        .collect()
}
