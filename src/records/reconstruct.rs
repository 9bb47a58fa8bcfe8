use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::config::{EquationMode, ParseRules};
use crate::hwpx::xml::{XmlElement, XmlNode};
use crate::hwpx::{PartMap, ResourceIndex, StyleTable};
use crate::ir::{
    merge_adjacent_text, EquationNode, ImageAsset, ImageNode, InlineNode, ParagraphKind,
    ParagraphNode, TextFormat, TextNode,
};
use crate::records::equation::script_to_latex;

/// Turns `hp:p` elements into rich-text paragraph nodes.
pub struct ParagraphBuilder<'a> {
    styles: &'a StyleTable,
    resources: &'a ResourceIndex,
    parts: &'a PartMap,
    rules: &'a ParseRules,
}

impl<'a> ParagraphBuilder<'a> {
    pub fn new(
        styles: &'a StyleTable,
        resources: &'a ResourceIndex,
        parts: &'a PartMap,
        rules: &'a ParseRules,
    ) -> Self {
        Self {
            styles,
            resources,
            parts,
            rules,
        }
    }

    /// Builds one paragraph. Image binaries referenced by the paragraph are pushed to `assets`.
    pub fn build(&self, p: &XmlElement, assets: &mut Vec<ImageAsset>) -> ParagraphNode {
        let mut children: Vec<InlineNode> = Vec::new();
        for run in p.descendants_within("run", "p") {
            let fmt = run
                .attr("charPrIDRef")
                .and_then(|id| self.styles.char_style(id))
                .map(TextFormat::from_char_style)
                .unwrap_or_default();

            if let Some(image) = self.image_node(run, assets) {
                children.push(image);
            }
            if let Some(eq) = run.find_within("equation", "p") {
                children.push(InlineNode::Equation(self.equation_node(eq)));
            }
            for t in run.descendants_within("t", "p") {
                let text = fragment_text(t);
                if text.trim().is_empty() {
                    continue;
                }
                children.push(InlineNode::Text(TextNode {
                    text,
                    fmt: fmt.clone(),
                }));
            }
        }

        let kind = if p.find_within("heading", "p").is_some() {
            ParagraphKind::Heading
        } else {
            ParagraphKind::Paragraph
        };
        ParagraphNode {
            kind,
            children: merge_adjacent_text(children),
        }
    }

    fn image_node(&self, run: &XmlElement, assets: &mut Vec<ImageAsset>) -> Option<InlineNode> {
        let pic = run.child("pic")?;
        let id = pic
            .child("img")
            .and_then(|img| img.attr("binaryItemIDRef"))
            .filter(|s| !s.is_empty())?;

        let Some(entry) = self.resources.get(id) else {
            tracing::warn!(id, "image reference not in manifest; skipped");
            return None;
        };
        let Some((part_name, bytes)) = self.parts.resolve_binary(&entry.href) else {
            tracing::warn!(id, href = %entry.href, "image binary missing from package; skipped");
            return None;
        };

        let ext = entry.extension();
        let src = self
            .rules
            .wants_inline_preview(&ext)
            .then(|| data_uri(&ext, bytes));
        tracing::debug!(id, part = part_name, inline = src.is_some(), "resolved image");
        let file_name = attach_asset(assets, part_name, entry.file_name(), bytes);

        Some(InlineNode::Image(ImageNode {
            resource_id: id.to_string(),
            src,
            saved_path: file_name,
        }))
    }

    fn equation_node(&self, eq: &XmlElement) -> EquationNode {
        let eqr = &self.rules.equations;
        if eqr.mode == EquationMode::Latex {
            let script = eq.child("script").map(|s| s.direct_text()).unwrap_or_default();
            let latex = script_to_latex(&script);
            if !latex.is_empty() {
                return EquationNode::Latex { equation: latex };
            }
        }
        EquationNode::Placeholder {
            text: eqr.placeholder_text.clone(),
            style: eqr.placeholder_style.clone(),
        }
    }
}

/// Adds the binary behind `part_name` to `assets` once and returns its file name. A different
/// part with the same file name is stored as `<stem>_2.<ext>`, `<stem>_3.<ext>`, ...
fn attach_asset(
    assets: &mut Vec<ImageAsset>,
    part_name: &str,
    file_name: &str,
    bytes: &[u8],
) -> String {
    if let Some(existing) = assets.iter().find(|a| a.source_part == part_name) {
        return existing.file_name.clone();
    }
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };
    let mut name = file_name.to_string();
    let mut n = 2usize;
    while assets.iter().any(|a| a.file_name == name) {
        name = match ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        n += 1;
    }
    if name != file_name {
        tracing::warn!(part = part_name, saved = %name, "image file name collision; renamed");
    }
    assets.push(ImageAsset {
        file_name: name.clone(),
        source_part: part_name.to_string(),
        bytes: bytes.to_vec(),
    });
    name
}

/// Text of one `hp:t`, with inline tab and line-break controls mapped to characters.
fn fragment_text(t: &XmlElement) -> String {
    let mut out = String::new();
    for c in &t.children {
        match c {
            XmlNode::Text(s) => out.push_str(s),
            XmlNode::Element(e) if e.is("tab") => out.push('\t'),
            XmlNode::Element(e) if e.is("lineBreak") => out.push('\n'),
            XmlNode::Element(_) => {}
        }
    }
    out
}

fn data_uri(ext: &str, bytes: &[u8]) -> String {
    let mime = if ext == "jpg" { "jpeg" } else { ext };
    format!("data:image/{mime};base64,{}", STANDARD.encode(bytes))
}

/// Plain text of a paragraph: every non-blank `hp:t` fragment, trimmed and joined by a space.
pub fn paragraph_text(p: &XmlElement) -> String {
    let mut parts: Vec<String> = Vec::new();
    for run in p.descendants_within("run", "p") {
        for t in run.descendants_within("t", "p") {
            let text = fragment_text(t);
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
    }
    parts.join(" ")
}
