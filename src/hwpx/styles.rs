use std::collections::BTreeMap;

use serde::Serialize;

use crate::hwpx::xml::XmlPart;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptOffset {
    #[default]
    None,
    Super,
    Sub,
}

impl ScriptOffset {
    /// Raw format code carried by a text node when the script flag wins the precedence chain.
    pub fn format_code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Sub => 32,
            Self::Super => 64,
        }
    }

    pub fn text_style(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Sub => "sub",
            Self::Super => "sup",
        }
    }
}

/// Character formatting of one `charPr` entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CharStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub script: ScriptOffset,
}

/// One named paragraph/character `style` entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParaStyle {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub eng_name: String,
    #[serde(rename = "paraPrIDRef")]
    pub para_pr_id_ref: String,
    #[serde(rename = "charPrIDRef")]
    pub char_pr_id_ref: String,
    #[serde(rename = "nextStyleIDRef")]
    pub next_style_id_ref: String,
    #[serde(rename = "langID")]
    pub lang_id: String,
    pub lock_form: bool,
}

#[derive(Clone, Debug, Default)]
pub struct StyleTable {
    chars: BTreeMap<String, CharStyle>,
    paras: BTreeMap<String, ParaStyle>,
}

impl StyleTable {
    /// Builds the table from the header part; a missing part yields an empty table.
    pub fn from_header(header: Option<&XmlPart>) -> Self {
        let Some(header) = header else {
            tracing::debug!("no header part; character styles default to plain");
            return Self::default();
        };

        let mut chars: BTreeMap<String, CharStyle> = BTreeMap::new();
        for char_pr in header.root.descendants("charPr") {
            let Some(id) = char_pr.attr("id").filter(|s| !s.is_empty()) else {
                continue;
            };
            let underline = char_pr
                .find("underline")
                .is_some_and(|u| u.attr("type").unwrap_or("NONE") != "NONE");
            let script = if char_pr.find("subscript").is_some() {
                ScriptOffset::Sub
            } else if char_pr.find("superscript").is_some() {
                ScriptOffset::Super
            } else {
                ScriptOffset::None
            };
            chars.insert(
                id.to_string(),
                CharStyle {
                    bold: char_pr.find("bold").is_some(),
                    italic: char_pr.find("italic").is_some(),
                    underline,
                    script,
                },
            );
        }

        let mut paras: BTreeMap<String, ParaStyle> = BTreeMap::new();
        for style in header.root.descendants("style") {
            let Some(id) = style.attr("id").filter(|s| !s.is_empty()) else {
                continue;
            };
            let get = |k: &str| style.attr(k).unwrap_or("").to_string();
            paras.insert(
                id.to_string(),
                ParaStyle {
                    kind: get("type"),
                    name: get("name"),
                    eng_name: get("engName"),
                    para_pr_id_ref: get("paraPrIDRef"),
                    char_pr_id_ref: get("charPrIDRef"),
                    next_style_id_ref: get("nextStyleIDRef"),
                    lang_id: get("langID"),
                    lock_form: style.attr("lockForm") == Some("1"),
                },
            );
        }

        tracing::debug!(
            char_styles = chars.len(),
            para_styles = paras.len(),
            "built style table"
        );
        Self { chars, paras }
    }

    pub fn char_style(&self, id: &str) -> Option<&CharStyle> {
        self.chars.get(id)
    }

    pub fn para_style(&self, id: &str) -> Option<&ParaStyle> {
        self.paras.get(id)
    }

    /// Id of the first paragraph style whose name or English name matches.
    pub fn para_style_id_by_name(&self, name: &str) -> Option<&str> {
        self.paras
            .iter()
            .find(|(_, s)| s.name == name || s.eng_name == name)
            .map(|(id, _)| id.as_str())
    }

    pub fn char_styles(&self) -> &BTreeMap<String, CharStyle> {
        &self.chars
    }

    pub fn para_styles(&self) -> &BTreeMap<String, ParaStyle> {
        &self.paras
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwpx::xml::parse_xml_part;

    const HEADER: &str = r#"<hh:head xmlns:hh="http://www.hancom.co.kr/hwpml/2011/head">
  <hh:refList>
    <hh:charProperties>
      <hh:charPr id="0"><hh:underline type="NONE"/></hh:charPr>
      <hh:charPr id="1"><hh:bold/><hh:underline type="BOTTOM"/></hh:charPr>
      <hh:charPr id="2"><hh:italic/><hh:superscript/></hh:charPr>
      <hh:charPr id="3"><hh:subscript/><hh:superscript/></hh:charPr>
      <hh:charPr><hh:bold/></hh:charPr>
    </hh:charProperties>
    <hh:styles>
      <hh:style id="0" type="PARA" name="바탕글" engName="Normal" paraPrIDRef="0" charPrIDRef="0" nextStyleIDRef="0" langID="1042" lockForm="0"/>
      <hh:style id="2" type="PARA" name="약품분류" engName="Category" paraPrIDRef="3" charPrIDRef="1" nextStyleIDRef="0" langID="1042" lockForm="1"/>
    </hh:styles>
  </hh:refList>
</hh:head>"#;

    #[test]
    fn reads_char_flags() {
        let part = parse_xml_part("Contents/header.xml", HEADER).expect("parse");
        let table = StyleTable::from_header(Some(&part));
        assert_eq!(table.char_styles().len(), 4);

        assert_eq!(table.char_style("0"), Some(&CharStyle::default()));
        let bold = table.char_style("1").expect("1");
        assert!(bold.bold && bold.underline && !bold.italic);
        let sup = table.char_style("2").expect("2");
        assert!(sup.italic);
        assert_eq!(sup.script, ScriptOffset::Super);
        assert_eq!(table.char_style("3").expect("3").script, ScriptOffset::Sub);
    }

    #[test]
    fn reads_named_styles() {
        let part = parse_xml_part("Contents/header.xml", HEADER).expect("parse");
        let table = StyleTable::from_header(Some(&part));
        let cat = table.para_style("2").expect("style 2");
        assert_eq!(cat.eng_name, "Category");
        assert!(cat.lock_form);
        assert_eq!(table.para_style_id_by_name("Category"), Some("2"));
        assert_eq!(table.para_style_id_by_name("약품분류"), Some("2"));
    }

    #[test]
    fn missing_header_is_empty() {
        let table = StyleTable::from_header(None);
        assert!(table.char_styles().is_empty());
        assert!(table.char_style("1").is_none());
    }
}
