//! Resolution of the base item / overlay item pair

use crate::error::{AnnotateError, AnnotateResult};
use crate::models::Overlay;
use crate::registry::{decode_reply, RegistryClient};

/// What the identifier given by the user refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierKind {
    /// The annotated base item; its single overlay is looked up
    #[default]
    Item,
    /// The overlay document itself
    Overlay,
}

/// The linked pair of items a render works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPair {
    /// Item carrying the annotations
    pub item_id: String,
    /// Item carrying the overlay raster
    pub overlay_item_id: String,
}

impl From<Overlay> for ResolvedPair {
    fn from(overlay: Overlay) -> Self {
        Self { item_id: overlay.item_id, overlay_item_id: overlay.overlay_item_id }
    }
}

/// Resolve `identifier` into its base item and overlay item.
///
/// For [`IdentifierKind::Item`] the item must have exactly one overlay.
pub fn resolve_pair<C: RegistryClient + ?Sized>(
    client: &C,
    identifier: &str,
    kind: IdentifierKind,
) -> AnnotateResult<ResolvedPair> {
    let pair = match kind {
        IdentifierKind::Item => {
            let reply = client.get("overlay", &[("itemId", identifier)])?;
            let mut overlays: Vec<Overlay> = decode_reply("overlay", reply)?;
            match overlays.len() {
                0 => {
                    return Err(AnnotateError::not_found(format!(
                        "no overlay for item {}",
                        identifier
                    )))
                }
                1 => ResolvedPair::from(overlays.remove(0)),
                n => {
                    return Err(AnnotateError::ambiguous(format!(
                        "{} overlays for item {}, specify the overlay",
                        n, identifier
                    )))
                }
            }
        }
        IdentifierKind::Overlay => {
            let path = format!("overlay/{}", identifier);
            let overlay: Overlay = decode_reply(&path, client.get(&path, &[])?)?;
            ResolvedPair::from(overlay)
        }
    };

    tracing::info!(
        item = %pair.item_id,
        overlay_item = %pair.overlay_item_id,
        "resolved {} {}",
        match kind {
            IdentifierKind::Item => "item",
            IdentifierKind::Overlay => "overlay",
        },
        identifier
    );
    Ok(pair)
}
