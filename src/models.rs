//! Registry documents consumed by the pipeline
//!
//! These mirror the JSON shapes returned by a Girder registry. Only the
//! fields the pipeline reads are modeled; everything else is ignored on
//! deserialization.

use serde::{Deserialize, Serialize};

/// Link between a base item and the item holding its overlay raster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(rename = "overlayItemId")]
    pub overlay_item_id: String,
}

/// A file stored under a registry item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileDescriptor {
    /// True when the declared media type is an image type.
    pub fn is_image(&self) -> bool {
        self.mime_type.as_deref().is_some_and(|m| m.starts_with("image"))
    }

    /// File name extension including the leading dot, e.g. `.tiff`.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
    }
}

/// An item descriptor, as returned by `item/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "largeImage", default, skip_serializing_if = "Option::is_none")]
    pub large_image: Option<LargeImageInfo>,
}

impl ItemDescriptor {
    /// Id of the file holding the tiled "large image" representation, if any.
    pub fn large_image_file_id(&self) -> Option<&str> {
        self.large_image.as_ref().and_then(|l| l.file_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargeImageInfo {
    #[serde(rename = "fileId", default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

/// Entry of the paginated `annotation?itemId=` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSummary {
    #[serde(rename = "_id")]
    pub id: String,
}

/// A full annotation record attached to a base item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub annotation: AnnotationBody,
}

impl Annotation {
    /// Label used for color lookup; `None` when the record is unlabeled.
    pub fn label(&self) -> Option<&str> {
        self.annotation.name.as_deref()
    }

    pub fn elements(&self) -> &[Element] {
        &self.annotation.elements
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// One geometric primitive of an annotation.
///
/// The type tag is kept as a plain string so that unknown element kinds
/// survive deserialization and are reported by the renderer instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Vec<f64>>>,
}

impl Element {
    pub fn point(x: f64, y: f64) -> Self {
        Self {
            kind: "point".to_string(),
            center: Some(vec![x, y, 0.0]),
            width: None,
            height: None,
            points: None,
        }
    }

    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            kind: "rectangle".to_string(),
            center: Some(vec![x, y, 0.0]),
            width: Some(width),
            height: Some(height),
            points: None,
        }
    }

    pub fn polyline(points: &[(f64, f64)]) -> Self {
        Self {
            kind: "polyline".to_string(),
            center: None,
            width: None,
            height: None,
            points: Some(points.iter().map(|&(x, y)| vec![x, y, 0.0]).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overlay_parse() {
        let overlay: Overlay = serde_json::from_value(json!({
            "_id": "ov1",
            "itemId": "base",
            "overlayItemId": "over",
            "opacity": 0.5
        }))
        .unwrap();
        assert_eq!(overlay.item_id, "base");
        assert_eq!(overlay.overlay_item_id, "over");
    }

    #[test]
    fn test_file_descriptor_helpers() {
        let file: FileDescriptor = serde_json::from_value(json!({
            "_id": "f1", "name": "slide.thumb.png", "mimeType": "image/png"
        }))
        .unwrap();
        assert!(file.is_image());
        assert_eq!(file.extension().as_deref(), Some(".png"));

        let file: FileDescriptor =
            serde_json::from_value(json!({"_id": "f2", "name": "notes"})).unwrap();
        assert!(!file.is_image());
        assert_eq!(file.extension(), None);
    }

    #[test]
    fn test_item_large_image_id() {
        let item: ItemDescriptor = serde_json::from_value(json!({
            "_id": "i1", "largeImage": {"fileId": "f9", "sourceName": "tiff"}
        }))
        .unwrap();
        assert_eq!(item.large_image_file_id(), Some("f9"));

        let item: ItemDescriptor =
            serde_json::from_value(json!({"_id": "i1", "largeImage": {}})).unwrap();
        assert_eq!(item.large_image_file_id(), None);
    }

    #[test]
    fn test_annotation_label_and_unknown_element() {
        let ann: Annotation = serde_json::from_value(json!({
            "_id": "a1",
            "annotation": {
                "name": "tumor",
                "elements": [
                    {"type": "ellipse", "center": [1, 2, 0], "width": 3, "height": 4}
                ]
            }
        }))
        .unwrap();
        assert_eq!(ann.label(), Some("tumor"));
        assert_eq!(ann.elements()[0].kind, "ellipse");

        let unlabeled: Annotation =
            serde_json::from_value(json!({"annotation": {"elements": []}})).unwrap();
        assert_eq!(unlabeled.label(), None);
    }
}
