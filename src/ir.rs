//! Rich-text node tree written into each record's `data.json`.

use serde::{Serialize, Serializer};

use crate::hwpx::styles::CharStyle;

pub const FORMAT_BOLD: u32 = 1;
pub const FORMAT_ITALIC: u32 = 2;
pub const FORMAT_UNDERLINE: u32 = 4;

/// Formatting carried by a text node. Two runs merge only when these are fully equal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextFormat {
    pub format: u32,
    pub style: String,
    pub text_style: &'static str,
}

impl TextFormat {
    /// Single format code from a character style: bold, then italic, then underline, then the
    /// script code. A higher-priority flag hides every lower one, including the script marker.
    pub fn from_char_style(style: &CharStyle) -> Self {
        let (format, text_style) = if style.bold {
            (FORMAT_BOLD, "")
        } else if style.italic {
            (FORMAT_ITALIC, "")
        } else if style.underline {
            (FORMAT_UNDERLINE, "")
        } else {
            (style.script.format_code(), style.script.text_style())
        };
        Self {
            format,
            style: String::new(),
            text_style,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextNode {
    pub text: String,
    pub fmt: TextFormat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageNode {
    pub resource_id: String,
    /// `data:` URI, only for formats that can be previewed inline.
    pub src: Option<String>,
    /// File name of the copied binary, relative to the record directory.
    pub saved_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EquationNode {
    Placeholder { text: String, style: String },
    Latex { equation: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InlineNode {
    Text(TextNode),
    Image(ImageNode),
    Equation(EquationNode),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParagraphKind {
    Paragraph,
    Heading,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParagraphNode {
    pub kind: ParagraphKind,
    pub children: Vec<InlineNode>,
}

impl ParagraphNode {
    /// Concatenated text of all text children.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for c in &self.children {
            if let InlineNode::Text(t) = c {
                out.push_str(&t.text);
            }
        }
        out
    }
}

/// Concatenates consecutive text nodes with equal formatting. Images and equations break a
/// merge group.
pub fn merge_adjacent_text(nodes: Vec<InlineNode>) -> Vec<InlineNode> {
    let mut out: Vec<InlineNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let (Some(InlineNode::Text(prev)), InlineNode::Text(cur)) = (out.last_mut(), &node) {
            if prev.fmt == cur.fmt {
                prev.text.push_str(&cur.text);
                continue;
            }
        }
        out.push(node);
    }
    out
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordMetadata {
    pub chapter: Option<String>,
    pub section: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub order: u32,
}

/// Binary copied beside a record's `data.json`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAsset {
    pub file_name: String,
    /// Package part the bytes came from.
    pub source_part: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub metadata: RecordMetadata,
    pub body: Vec<ParagraphNode>,
    pub assets: Vec<ImageAsset>,
}

impl Record {
    pub fn new(metadata: RecordMetadata) -> Self {
        Self {
            metadata,
            body: Vec::new(),
            assets: Vec::new(),
        }
    }

    pub fn content_document(&self) -> ContentDocument<'_> {
        ContentDocument {
            root: RootNode {
                kind: "root",
                version: 1,
                direction: "ltr",
                format: "",
                indent: 0,
                children: &self.body,
            },
        }
    }
}

#[derive(Serialize)]
pub struct ContentDocument<'a> {
    pub root: RootNode<'a>,
}

#[derive(Serialize)]
pub struct RootNode<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u32,
    direction: &'static str,
    format: &'static str,
    indent: u32,
    children: &'a [ParagraphNode],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextJson<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u32,
    text: &'a str,
    format: u32,
    detail: u32,
    mode: &'static str,
    style: &'a str,
    text_style: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageJson<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u32,
    alt_text: &'a str,
    caption: serde_json::Value,
    height: u32,
    max_width: u32,
    show_caption: bool,
    src: Option<&'a str>,
    saved_path: &'a str,
}

#[derive(Serialize)]
struct EquationJson<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u32,
    equation: &'a str,
    inline: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParagraphJson<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u32,
    direction: &'static str,
    format: &'static str,
    indent: u32,
    text_format: u32,
    text_style: &'static str,
    children: &'a [InlineNode],
}

fn empty_caption() -> serde_json::Value {
    serde_json::json!({
        "editorState": {
            "root": {
                "children": [],
                "direction": null,
                "format": "",
                "indent": 0,
                "type": "root",
                "version": 1
            }
        }
    })
}

impl Serialize for InlineNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            InlineNode::Text(t) => TextJson {
                kind: "text",
                version: 1,
                text: &t.text,
                format: t.fmt.format,
                detail: 0,
                mode: "normal",
                style: &t.fmt.style,
                text_style: t.fmt.text_style,
            }
            .serialize(serializer),
            InlineNode::Image(img) => ImageJson {
                kind: "image",
                version: 1,
                alt_text: &img.resource_id,
                caption: empty_caption(),
                height: 0,
                max_width: 500,
                show_caption: false,
                src: img.src.as_deref(),
                saved_path: &img.saved_path,
            }
            .serialize(serializer),
            InlineNode::Equation(EquationNode::Placeholder { text, style }) => TextJson {
                kind: "text",
                version: 1,
                text,
                format: FORMAT_BOLD,
                detail: 0,
                mode: "normal",
                style,
                text_style: "",
            }
            .serialize(serializer),
            InlineNode::Equation(EquationNode::Latex { equation }) => EquationJson {
                kind: "equation",
                version: 1,
                equation,
                inline: true,
            }
            .serialize(serializer),
        }
    }
}

impl Serialize for ParagraphNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = match self.kind {
            ParagraphKind::Paragraph => "paragraph",
            ParagraphKind::Heading => "heading",
        };
        ParagraphJson {
            kind,
            version: 1,
            direction: "ltr",
            format: "",
            indent: 0,
            text_format: 0,
            text_style: "",
            children: &self.children,
        }
        .serialize(serializer)
    }
}
