//! Selection of the overlay raster among an overlay item's files

use crate::error::{AnnotateError, AnnotateResult};
use crate::models::{FileDescriptor, ItemDescriptor};
use crate::registry::{decode_reply, RegistryClient};

/// Listing page size; two entries are enough to detect "more than one".
const FILE_PAGE_LIMIT: &str = "2";

/// Find the single image file of an overlay item.
///
/// When both a tiled "large image" and a plain image are stored on the
/// item, the large image file is set aside and the plain one is used.
pub fn locate_overlay_file<C: RegistryClient + ?Sized>(
    client: &C,
    overlay_item_id: &str,
) -> AnnotateResult<FileDescriptor> {
    let path = format!("item/{}/files", overlay_item_id);
    let files: Vec<FileDescriptor> =
        decode_reply(&path, client.get(&path, &[("limit", FILE_PAGE_LIMIT)])?)?;
    if files.is_empty() {
        return Err(AnnotateError::not_found(format!("no files for overlay {}", overlay_item_id)));
    }

    let mut candidates: Vec<FileDescriptor> = files.into_iter().filter(|f| f.is_image()).collect();

    if candidates.len() > 1 {
        let item_path = format!("item/{}", overlay_item_id);
        let item: ItemDescriptor = decode_reply(&item_path, client.get_item(overlay_item_id)?)?;
        if let Some(large_image_id) = item.large_image_file_id() {
            tracing::debug!(file = large_image_id, "setting aside large image file");
            candidates.retain(|f| f.id != large_image_id);
        }
    }

    match candidates.len() {
        0 => Err(AnnotateError::not_found(format!(
            "no image file for overlay {}",
            overlay_item_id
        ))),
        1 => {
            let file = candidates.remove(0);
            tracing::info!(file = %file.id, name = %file.name, "selected overlay file");
            Ok(file)
        }
        _ => Err(AnnotateError::ambiguous(format!(
            "multiple files for overlay {}",
            overlay_item_id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;
    use serde_json::json;

    fn registry_with_files(files: serde_json::Value) -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        registry.insert("item/over/files", &[("limit", "2")], files);
        registry
    }

    #[test]
    fn test_single_image_file() {
        let registry =
            registry_with_files(json!([{"_id": "f1", "name": "a.png", "mimeType": "image/png"}]));

        let file = locate_overlay_file(&registry, "over").unwrap();
        assert_eq!(file.id, "f1");
        // No item lookup when the listing is already unambiguous
        assert_eq!(registry.call_count(), 1);
    }

    #[test]
    fn test_no_files_is_not_found() {
        let registry = registry_with_files(json!([]));
        let err = locate_overlay_file(&registry, "over").unwrap_err();
        assert!(matches!(err, AnnotateError::NotFound(ref m) if m == "no files for overlay over"));
    }

    #[test]
    fn test_non_image_files_are_ignored() {
        let registry = registry_with_files(json!([
            {"_id": "f1", "name": "a.json", "mimeType": "application/json"},
            {"_id": "f2", "name": "a.png", "mimeType": "image/png"}
        ]));

        assert_eq!(locate_overlay_file(&registry, "over").unwrap().id, "f2");
    }

    #[test]
    fn test_only_non_image_files_is_not_found() {
        let registry = registry_with_files(json!([
            {"_id": "f1", "name": "a.json", "mimeType": "application/json"}
        ]));

        let err = locate_overlay_file(&registry, "over").unwrap_err();
        assert!(matches!(err, AnnotateError::NotFound(_)));
    }

    #[test]
    fn test_large_image_file_is_excluded() {
        let registry = registry_with_files(json!([
            {"_id": "tiled", "name": "a.tiff", "mimeType": "image/tiff"},
            {"_id": "flat", "name": "a.png", "mimeType": "image/png"}
        ]));
        registry.insert(
            "item/over",
            &[],
            json!({"_id": "over", "largeImage": {"fileId": "tiled"}}),
        );

        assert_eq!(locate_overlay_file(&registry, "over").unwrap().id, "flat");
    }

    #[test]
    fn test_multiple_files_without_large_image_is_ambiguous() {
        let registry = registry_with_files(json!([
            {"_id": "f1", "name": "a.png", "mimeType": "image/png"},
            {"_id": "f2", "name": "b.png", "mimeType": "image/png"}
        ]));
        registry.insert("item/over", &[], json!({"_id": "over"}));

        let err = locate_overlay_file(&registry, "over").unwrap_err();
        assert!(
            matches!(err, AnnotateError::Ambiguous(ref m) if m == "multiple files for overlay over")
        );
    }
}
