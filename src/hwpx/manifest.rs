use std::collections::BTreeMap;

use serde::Serialize;

use crate::hwpx::xml::XmlPart;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    pub href: String,
    pub media_type: String,
    pub embedded: bool,
}

impl ResourceEntry {
    /// Lowercase file extension of the referenced path, without the dot.
    pub fn extension(&self) -> String {
        let name = self.href.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(&self.href);
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => String::new(),
        }
    }

    pub fn file_name(&self) -> &str {
        self.href.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(&self.href)
    }
}

/// Manifest item id to binary resource, restricted to accepted media types.
#[derive(Clone, Debug, Default)]
pub struct ResourceIndex {
    items: BTreeMap<String, ResourceEntry>,
}

impl ResourceIndex {
    pub fn from_manifest(manifest: Option<&XmlPart>, media_type_prefix: &str) -> Self {
        let Some(manifest) = manifest else {
            tracing::debug!("no manifest part; images will not resolve");
            return Self::default();
        };
        let mut items: BTreeMap<String, ResourceEntry> = BTreeMap::new();
        for list in manifest.root.descendants("manifest") {
            for item in list.children_named("item") {
                let media_type = item.attr("media-type").unwrap_or("");
                if !media_type.starts_with(media_type_prefix) {
                    continue;
                }
                let Some(id) = item.attr("id").filter(|s| !s.is_empty()) else {
                    continue;
                };
                items.insert(
                    id.to_string(),
                    ResourceEntry {
                        href: item.attr("href").unwrap_or("").to_string(),
                        media_type: media_type.to_string(),
                        embedded: item.attr("isEmbeded") == Some("1"),
                    },
                );
            }
        }
        tracing::debug!(resources = items.len(), "built resource index");
        Self { items }
    }

    pub fn get(&self, id: &str) -> Option<&ResourceEntry> {
        self.items.get(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, entry: ResourceEntry) {
        self.items.insert(id.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceEntry)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwpx::xml::parse_xml_part;

    #[test]
    fn keeps_only_image_items() {
        let xml = r#"<opf:package xmlns:opf="http://www.idpf.org/2007/opf/">
  <opf:manifest>
    <opf:item id="header" href="Contents/header.xml" media-type="application/xml"/>
    <opf:item id="image1" href="BinData/image1.PNG" media-type="image/png" isEmbeded="1"/>
    <opf:item id="image2" href="BinData/image2.tif" media-type="image/tiff" isEmbeded="0"/>
  </opf:manifest>
</opf:package>"#;
        let part = parse_xml_part("Contents/content.hpf", xml).expect("parse");
        let index = ResourceIndex::from_manifest(Some(&part), "image/");
        assert_eq!(index.len(), 2);
        let png = index.get("image1").expect("image1");
        assert!(png.embedded);
        assert_eq!(png.extension(), "png");
        assert_eq!(png.file_name(), "image1.PNG");
        let tif = index.get("image2").expect("image2");
        assert!(!tif.embedded);
        assert_eq!(tif.media_type, "image/tiff");
        assert!(index.get("header").is_none());
    }

    #[test]
    fn missing_manifest_is_empty() {
        assert!(ResourceIndex::from_manifest(None, "image/").is_empty());
    }
}
