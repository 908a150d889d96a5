//! Metadata document schema (v1 item array, v2 region tree)

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::LoaderError;

/// Item `Type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum ItemType {
    Surfaces,
    Glyph,
    Points,
    Lines,
    View,
    Settings,
    #[serde(other)]
    Unknown,
}

impl ItemType {
    /// Primitive items are counted toward completion in both schemas
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            ItemType::Surfaces | ItemType::Glyph | ItemType::Points | ItemType::Lines
        )
    }
}

/// Payload carried inside the document instead of behind a URL
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InlineContent {
    #[serde(rename = "URL")]
    pub url: Option<Value>,
    #[serde(rename = "GlyphGeometriesURL")]
    pub glyph_geometries_url: Option<Value>,
}

/// Scene timing settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SettingsBlock {
    #[serde(rename = "Duration")]
    pub duration: Option<String>,
    #[serde(rename = "OriginalDuration")]
    pub original_duration: Option<String>,
    #[serde(rename = "TimeStamps", default)]
    pub time_stamps: BTreeMap<String, String>,
}

/// One level of an item's `LOD` block
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LodLevelSource {
    #[serde(rename = "URL")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LodBlock {
    #[serde(rename = "Levels", default)]
    pub levels: BTreeMap<String, LodLevelSource>,
}

/// One entry of the document
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Item {
    #[serde(rename = "Type")]
    pub kind: ItemType,
    #[serde(rename = "URL")]
    pub url: Option<String>,
    #[serde(rename = "Inline")]
    pub inline: Option<InlineContent>,
    #[serde(rename = "GroupName")]
    pub group_name: Option<String>,
    #[serde(rename = "MorphVertices", default)]
    pub morph_vertices: bool,
    #[serde(rename = "MorphColours", default)]
    pub morph_colours: bool,
    #[serde(rename = "FileFormat")]
    pub file_format: Option<String>,
    #[serde(rename = "AnatomicalId")]
    pub anatomical_id: Option<String>,
    #[serde(rename = "RegionPath")]
    pub region_path: Option<String>,
    #[serde(rename = "Order")]
    pub order: Option<i32>,
    #[serde(rename = "DisplayLabels", default)]
    pub display_labels: bool,
    #[serde(rename = "GlyphGeometriesURL")]
    pub glyph_geometries_url: Option<String>,
    #[serde(rename = "LOD")]
    pub lod: Option<LodBlock>,
    #[serde(flatten)]
    pub settings: SettingsBlock,
}

/// A view entry of a v2 document
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViewEntry {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "URL")]
    pub url: Option<String>,
    #[serde(rename = "Inline")]
    pub inline: Option<InlineContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ViewsBlock {
    #[serde(rename = "Default")]
    pub default: Option<String>,
    #[serde(rename = "Entries", default)]
    pub entries: Vec<ViewEntry>,
}

/// A node of the v2 region tree
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegionNode {
    #[serde(rename = "Primitives", default)]
    pub primitives: Vec<Item>,
    /// Row-major 4x4 matrix
    #[serde(rename = "Transformation")]
    pub transformation: Option<Vec<f32>>,
    #[serde(rename = "Children", default)]
    pub children: BTreeMap<String, RegionNode>,
}

impl RegionNode {
    pub fn countable_items(&self) -> usize {
        self.primitives
            .iter()
            .filter(|item| item.kind.is_primitive())
            .count()
            + self
                .children
                .values()
                .map(RegionNode::countable_items)
                .sum::<usize>()
    }

    /// The transformation as a fixed-size array, when it has 16 values
    pub fn transformation(&self) -> Option<[f32; 16]> {
        self.transformation
            .as_deref()
            .and_then(|values| values.try_into().ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DocumentV2 {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Regions", default)]
    pub regions: RegionNode,
    #[serde(rename = "Views")]
    pub views: Option<ViewsBlock>,
    #[serde(rename = "Settings")]
    pub settings: Option<SettingsBlock>,
}

/// A parsed metadata document
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataDocument {
    /// Items paired with their position in the source array
    V1(Vec<(usize, Item)>),
    V2(DocumentV2),
}

impl MetadataDocument {
    /// Detect the schema from the top-level shape and parse
    ///
    /// v1 entries that do not parse as items are skipped. Parsed items keep
    /// their array index, which fixes their render order.
    pub fn parse(data: &[u8]) -> Result<Self, LoaderError> {
        let value: Value =
            serde_json::from_slice(data).map_err(|e| LoaderError::MalformedDocument(e.to_string()))?;
        let is_v2 = value
            .get("Version")
            .and_then(Value::as_str)
            .is_some_and(|v| v.starts_with('2'));
        match value {
            Value::Array(entries) => {
                let items = entries
                    .into_iter()
                    .enumerate()
                    .filter_map(|(index, entry)| match Item::deserialize(entry) {
                        Ok(item) => Some((index, item)),
                        Err(e) => {
                            warn!("Skipping metadata entry {}: {}", index, e);
                            None
                        }
                    })
                    .collect();
                Ok(MetadataDocument::V1(items))
            }
            Value::Object(_) if is_v2 => {
                let document = DocumentV2::deserialize(value)
                    .map_err(|e| LoaderError::MalformedDocument(e.to_string()))?;
                Ok(MetadataDocument::V2(document))
            }
            _ => Err(LoaderError::MalformedDocument(
                "expected an item array or a version 2 object".to_string(),
            )),
        }
    }

    /// Number of items the "all complete" notification waits for
    ///
    /// Primitive items count in both schemas, views only in v1.
    pub fn countable_items(&self) -> usize {
        match self {
            MetadataDocument::V1(items) => items
                .iter()
                .filter(|(_, item)| item.kind.is_primitive() || item.kind == ItemType::View)
                .count(),
            MetadataDocument::V2(document) => document.regions.countable_items(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: Value) -> Result<MetadataDocument, LoaderError> {
        MetadataDocument::parse(value.to_string().as_bytes())
    }

    #[test]
    fn test_v1_items() {
        let document = parse(json!([
            { "Type": "Settings", "Duration": "PT2S", "TimeStamps": { "a": "PT1S" } },
            { "Type": "View", "URL": "view.json" },
            { "Type": "Surfaces", "URL": "a.json", "GroupName": "skin", "MorphVertices": true },
            { "Type": "Points", "Inline": { "URL": { "vertices": [0, 0, 0] } } },
            { "Type": "Texture", "URL": "t.json" },
            42
        ]))
        .unwrap();
        let MetadataDocument::V1(items) = &document else {
            panic!("expected v1");
        };
        assert_eq!(items.len(), 5);
        assert_eq!(items[0].1.settings.duration.as_deref(), Some("PT2S"));
        assert_eq!(items[0].1.settings.time_stamps.len(), 1);
        assert!(items[2].1.morph_vertices);
        assert!(!items[2].1.morph_colours);
        assert!(items[3].1.inline.as_ref().unwrap().url.is_some());
        assert_eq!(items[4].1.kind, ItemType::Unknown);
        assert_eq!(document.countable_items(), 3);
    }

    #[test]
    fn test_v2_tree() {
        let document = parse(json!({
            "Version": "2.0",
            "Regions": {
                "Primitives": [{ "Type": "Surfaces", "URL": "root.json" }],
                "Children": {
                    "heart": {
                        "Transformation": [1, 0, 0, 5, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1],
                        "Primitives": [
                            { "Type": "Lines", "URL": "l.json", "Order": 3 },
                            { "Type": "Settings" }
                        ]
                    }
                }
            },
            "Views": { "Default": "front", "Entries": [{ "Id": "front", "URL": "front.json" }] }
        }))
        .unwrap();
        let MetadataDocument::V2(v2) = &document else {
            panic!("expected v2");
        };
        assert_eq!(document.countable_items(), 2);
        let heart = &v2.regions.children["heart"];
        assert_eq!(heart.transformation().unwrap()[3], 5.0);
        assert_eq!(heart.primitives[0].order, Some(3));
        assert_eq!(v2.views.as_ref().unwrap().default.as_deref(), Some("front"));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            MetadataDocument::parse(b"{not json"),
            Err(LoaderError::MalformedDocument(_))
        ));
        assert!(matches!(
            parse(json!({ "Version": "1.0" })),
            Err(LoaderError::MalformedDocument(_))
        ));
        assert!(parse(json!("surfaces")).is_err());
    }
}
