use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

pub const DEFAULT_RULES_FILENAME: &str = "hwpx-records.toml";

/// Field paths and constants that drive record extraction.
#[derive(Clone, Debug, Deserialize)]
pub struct ParseRules {
    pub version: u32,

    #[serde(default)]
    pub metadata: MetadataRules,

    #[serde(default)]
    pub parts: PartRules,

    #[serde(default)]
    pub images: ImageRules,

    #[serde(default)]
    pub equations: EquationRules,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MetadataRules {
    /// Constant written into every record's `chapter` field.
    #[serde(default)]
    pub chapter: Option<String>,

    /// Paragraph `styleIDRef` marking a section header (a `style-` prefix is ignored).
    #[serde(default)]
    pub section_style_id: Option<String>,

    /// `textheight` of the first line segment that marks a title paragraph.
    #[serde(default = "default_title_text_height")]
    pub title_text_height: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PartRules {
    #[serde(default = "default_content_prefix")]
    pub content_prefix: String,
    #[serde(default = "default_binary_prefix")]
    pub binary_prefix: String,
    #[serde(default = "default_header_part")]
    pub header: String,
    #[serde(default = "default_manifest_part")]
    pub manifest: String,
    #[serde(default = "default_section_prefix")]
    pub section_prefix: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ImageRules {
    #[serde(default = "default_media_type_prefix")]
    pub media_type_prefix: String,
    /// Lowercase extensions (no dot) that get an inline data URI.
    #[serde(default = "default_inline_extensions")]
    pub inline_extensions: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EquationMode {
    #[default]
    Placeholder,
    Latex,
}

impl EquationMode {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placeholder" => Ok(Self::Placeholder),
            "latex" => Ok(Self::Latex),
            other => Err(anyhow!(
                "unknown equation mode: {other} (expected placeholder or latex)"
            )),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EquationRules {
    #[serde(default)]
    pub mode: EquationMode,
    #[serde(default = "default_placeholder_text")]
    pub placeholder_text: String,
    #[serde(default = "default_placeholder_style")]
    pub placeholder_style: String,
}

fn default_title_text_height() -> u32 {
    1100
}

fn default_content_prefix() -> String {
    "Contents/".to_string()
}

fn default_binary_prefix() -> String {
    "BinData/".to_string()
}

fn default_header_part() -> String {
    "Contents/header.xml".to_string()
}

fn default_manifest_part() -> String {
    "Contents/content.hpf".to_string()
}

fn default_section_prefix() -> String {
    "Contents/section".to_string()
}

fn default_media_type_prefix() -> String {
    "image/".to_string()
}

fn default_inline_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "bmp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_placeholder_text() -> String {
    "수식".to_string()
}

fn default_placeholder_style() -> String {
    "color: #ff0000;".to_string()
}

impl Default for MetadataRules {
    fn default() -> Self {
        Self {
            chapter: None,
            section_style_id: None,
            title_text_height: default_title_text_height(),
        }
    }
}

impl Default for PartRules {
    fn default() -> Self {
        Self {
            content_prefix: default_content_prefix(),
            binary_prefix: default_binary_prefix(),
            header: default_header_part(),
            manifest: default_manifest_part(),
            section_prefix: default_section_prefix(),
        }
    }
}

impl Default for ImageRules {
    fn default() -> Self {
        Self {
            media_type_prefix: default_media_type_prefix(),
            inline_extensions: default_inline_extensions(),
        }
    }
}

impl Default for EquationRules {
    fn default() -> Self {
        Self {
            mode: EquationMode::default(),
            placeholder_text: default_placeholder_text(),
            placeholder_style: default_placeholder_style(),
        }
    }
}

impl Default for ParseRules {
    fn default() -> Self {
        Self {
            version: 1,
            metadata: MetadataRules::default(),
            parts: PartRules::default(),
            images: ImageRules::default(),
            equations: EquationRules::default(),
        }
    }
}

impl ParseRules {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let rules: ParseRules = toml::from_str(s).context("parse rules (toml)")?;
        if rules.version != 1 {
            return Err(anyhow!(
                "unsupported rules version: {} (expected 1)",
                rules.version
            ));
        }
        Ok(rules)
    }

    pub fn from_toml_path(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read rules: {}", path.display()))?;
        let s = String::from_utf8(bytes).context("rules must be utf-8")?;
        Self::from_toml_str(&s).with_context(|| format!("load rules: {}", path.display()))
    }

    /// The configured section style id without the `style-` prefix.
    pub fn section_style_id(&self) -> Option<&str> {
        self.metadata
            .section_style_id
            .as_deref()
            .map(|s| s.trim())
            .map(|s| s.strip_prefix("style-").unwrap_or(s))
            .filter(|s| !s.is_empty())
    }

    pub fn wants_inline_preview(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        self.images
            .inline_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&ext))
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_rules(workdir: &Path) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, DEFAULT_RULES_FILENAME, 8) {
            return Some(p);
        }
    }
    if let Some(p) = find_file_upwards(workdir, DEFAULT_RULES_FILENAME, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, DEFAULT_RULES_FILENAME, 4) {
                return Some(p);
            }
        }
    }
    None
}

pub fn init_default_rules(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create rules dir: {}", dir.display()))?;
    let path = dir.join(DEFAULT_RULES_FILENAME);
    if path.exists() && !force {
        return Err(anyhow!(
            "rules file already exists: {} (use --force to overwrite)",
            path.display()
        ));
    }
    std::fs::write(&path, DEFAULT_RULES_TOML)
        .with_context(|| format!("write rules: {}", path.display()))?;
    Ok(path)
}

const DEFAULT_RULES_TOML: &str = r#"version = 1

[metadata]
# Written verbatim into every record's metadata.json.
# chapter = "Part 2"
# Paragraph styleIDRef that marks a section header ("style-" prefix optional).
# section_style_id = "2"
# First line-segment textheight of a title paragraph.
title_text_height = 1100

[parts]
content_prefix = "Contents/"
binary_prefix = "BinData/"
header = "Contents/header.xml"
manifest = "Contents/content.hpf"
section_prefix = "Contents/section"

[images]
media_type_prefix = "image/"
inline_extensions = ["png", "jpg", "jpeg", "gif", "bmp"]

[equations]
# "placeholder" or "latex"
mode = "placeholder"
placeholder_text = "수식"
placeholder_style = "color: #ff0000;"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_matches_defaults() {
        let rules = ParseRules::from_toml_str(DEFAULT_RULES_TOML).expect("template");
        let defaults = ParseRules::default();
        assert_eq!(rules.metadata.title_text_height, defaults.metadata.title_text_height);
        assert_eq!(rules.parts.header, defaults.parts.header);
        assert_eq!(rules.images.inline_extensions, defaults.images.inline_extensions);
        assert_eq!(rules.equations.mode, EquationMode::Placeholder);
        assert_eq!(rules.equations.placeholder_text, "수식");
    }

    #[test]
    fn partial_rules_fill_defaults() {
        let rules = ParseRules::from_toml_str(
            "version = 1\n[metadata]\nchapter = \"2장\"\nsection_style_id = \"style-7\"\n[equations]\nmode = \"latex\"\n",
        )
        .expect("rules");
        assert_eq!(rules.metadata.chapter.as_deref(), Some("2장"));
        assert_eq!(rules.section_style_id(), Some("7"));
        assert_eq!(rules.metadata.title_text_height, 1100);
        assert_eq!(rules.parts.binary_prefix, "BinData/");
        assert_eq!(rules.equations.mode, EquationMode::Latex);
    }

    #[test]
    fn rejects_unknown_version() {
        assert!(ParseRules::from_toml_str("version = 2\n").is_err());
    }

    #[test]
    fn inline_preview_allow_list() {
        let rules = ParseRules::default();
        assert!(rules.wants_inline_preview("PNG"));
        assert!(rules.wants_inline_preview(".jpeg"));
        assert!(!rules.wants_inline_preview("tiff"));
    }

    #[test]
    fn init_refuses_to_clobber() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init_default_rules(dir.path(), false).expect("init");
        assert!(path.is_file());
        assert!(init_default_rules(dir.path(), false).is_err());
        assert!(init_default_rules(dir.path(), true).is_ok());
        assert!(ParseRules::from_toml_path(&path).is_ok());
    }
}
