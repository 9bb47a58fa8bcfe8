use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Component, Path};

use anyhow::{anyhow, Context};
use encoding_rs::{Encoding, UTF_8};
use zip::ZipArchive;

use crate::config::PartRules;
use crate::error::{HwpxError, Result};
use crate::hwpx::xml::{parse_xml_part, XmlPart};

pub struct HwpxPackage {
    pub entries: Vec<HwpxEntry>,
}

pub struct HwpxEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub is_dir: bool,
}

impl HwpxPackage {
    pub fn read(path: &Path) -> Result<Self> {
        let f = File::open(path)?;
        Self::from_reader(f)
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut zip = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push(HwpxEntry {
                name: file.name().to_string(),
                data,
                is_dir: file.is_dir(),
            });
        }
        Ok(Self { entries })
    }

    /// Loads the content and binary parts: XML parts (`.xml`, `.hpf`) are decoded and parsed,
    /// everything else under the two prefixes is kept as raw bytes.
    pub fn load_parts(&self, rules: &PartRules) -> Result<PartMap> {
        let mut parts: BTreeMap<String, PartData> = BTreeMap::new();
        for ent in &self.entries {
            if ent.is_dir || ent.name.ends_with('/') {
                continue;
            }
            if !ent.name.starts_with(&rules.content_prefix)
                && !ent.name.starts_with(&rules.binary_prefix)
            {
                continue;
            }
            if is_xml_part(&ent.name) {
                let text = decode_xml(&ent.name, &ent.data)?;
                let part = parse_xml_part(&ent.name, &text)?;
                parts.insert(ent.name.clone(), PartData::Xml(part));
            } else {
                parts.insert(ent.name.clone(), PartData::Binary(ent.data.clone()));
            }
        }
        tracing::debug!(count = parts.len(), "loaded package parts");
        Ok(PartMap {
            parts,
            binary_prefix: rules.binary_prefix.clone(),
            section_prefix: rules.section_prefix.clone(),
        })
    }

    /// Extracts every entry below `dir`, returning the number of files written.
    pub fn unpack_to(&self, dir: &Path) -> anyhow::Result<usize> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create unpack dir: {}", dir.display()))?;
        let mut written = 0usize;
        for ent in &self.entries {
            let rel = Path::new(&ent.name);
            if !rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(anyhow!("refusing to unpack entry outside target: {}", ent.name));
            }
            let target = dir.join(rel);
            if ent.is_dir || ent.name.ends_with('/') {
                std::fs::create_dir_all(&target)
                    .with_context(|| format!("create dir: {}", target.display()))?;
                continue;
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create dir: {}", parent.display()))?;
            }
            std::fs::write(&target, &ent.data)
                .with_context(|| format!("write entry: {}", target.display()))?;
            written += 1;
        }
        Ok(written)
    }
}

fn is_xml_part(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".xml") || lower.ends_with(".hpf")
}

/// Decodes an XML part using its BOM or declared encoding, defaulting to UTF-8.
fn decode_xml(name: &str, bytes: &[u8]) -> Result<String> {
    let (encoding, bom_len) = match Encoding::for_bom(bytes) {
        Some((enc, len)) => (enc, len),
        None => (declared_encoding(bytes).unwrap_or(UTF_8), 0),
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        .map(|s| s.into_owned())
        .ok_or_else(|| HwpxError::malformed(name, format!("invalid {} data", encoding.name())))
}

fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(256)];
    let head = std::str::from_utf8(head).ok().or_else(|| {
        let end = head.iter().position(|&b| b == b'>')?;
        std::str::from_utf8(&head[..=end]).ok()
    })?;
    let decl = head.strip_prefix("<?xml")?;
    let decl = &decl[..decl.find("?>")?];
    let at = decl.find("encoding")?;
    let rest = decl[at + "encoding".len()..].trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let value = &rest[1..];
    let label = &value[..value.find(quote)?];
    Encoding::for_label(label.as_bytes())
}

#[derive(Clone, Debug)]
pub enum PartData {
    Xml(XmlPart),
    Binary(Vec<u8>),
}

/// Archive-internal path to decoded part.
#[derive(Clone, Debug)]
pub struct PartMap {
    parts: BTreeMap<String, PartData>,
    binary_prefix: String,
    section_prefix: String,
}

impl PartMap {
    pub fn new(rules: &PartRules) -> Self {
        Self {
            parts: BTreeMap::new(),
            binary_prefix: rules.binary_prefix.clone(),
            section_prefix: rules.section_prefix.clone(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, data: PartData) {
        self.parts.insert(name.into(), data);
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(|k| k.as_str())
    }

    pub fn xml(&self, name: &str) -> Option<&XmlPart> {
        match self.parts.get(name)? {
            PartData::Xml(p) => Some(p),
            PartData::Binary(_) => None,
        }
    }

    pub fn binary(&self, name: &str) -> Option<&[u8]> {
        match self.parts.get(name)? {
            PartData::Binary(b) => Some(b.as_slice()),
            PartData::Xml(_) => None,
        }
    }

    /// Section parts (`<prefix><N>.xml`) ordered by their numeric suffix.
    pub fn section_parts(&self) -> Vec<&XmlPart> {
        let mut sections: Vec<(u32, &XmlPart)> = self
            .parts
            .iter()
            .filter_map(|(name, data)| {
                let n = name
                    .strip_prefix(&self.section_prefix)?
                    .strip_suffix(".xml")?
                    .parse::<u32>()
                    .ok()?;
                match data {
                    PartData::Xml(p) => Some((n, p)),
                    PartData::Binary(_) => None,
                }
            })
            .collect();
        sections.sort_by_key(|(n, _)| *n);
        sections.into_iter().map(|(_, p)| p).collect()
    }

    /// Finds the bytes behind a manifest `href`: the exact path first, then the file name
    /// under the binary prefix.
    pub fn resolve_binary(&self, href: &str) -> Option<(&str, &[u8])> {
        let href = href.replace('\\', "/");
        let trimmed = href.trim_start_matches('/').trim_start_matches("../");
        let basename = trimmed.rsplit('/').next().unwrap_or(trimmed);
        let fallback = format!("{}{}", self.binary_prefix, basename);
        for cand in [trimmed, fallback.as_str()] {
            if let Some((name, PartData::Binary(b))) = self.parts.get_key_value(cand) {
                return Some((name.as_str(), b.as_slice()));
            }
        }
        None
    }
}
