//! End-to-end labeling of one item
//!
//! [`LabelAnnotator`] ties the pipeline together: choosing an identifier
//! derives a fresh [`ResolvedState`] (pair, overlay file, annotations) and
//! [`LabelAnnotator::save`] renders that state onto the overlay raster.

use image::DynamicImage;
use std::path::Path;

use crate::acquire::{acquire_overlay, default_decoders, RasterDecoder};
use crate::color::ColorMap;
use crate::error::{AnnotateError, AnnotateResult};
use crate::fetch::fetch_annotations;
use crate::group::group_annotations;
use crate::locate::locate_overlay_file;
use crate::models::{Annotation, FileDescriptor};
use crate::output::save_image;
use crate::registry::RegistryClient;
use crate::render::render_annotations;
use crate::resolve::{resolve_pair, IdentifierKind, ResolvedPair};

/// Everything derived from one identifier.
///
/// The default value is the cleared state: no identifier, nothing resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedState {
    pub pair: Option<ResolvedPair>,
    pub overlay_file: Option<FileDescriptor>,
    /// `None` when no identifier is set; `Some(vec![])` when the item has no annotations
    pub annotations: Option<Vec<Annotation>>,
}

impl ResolvedState {
    /// Derive the state for `identifier`; `None` yields the cleared state
    /// without contacting the registry.
    pub fn derive<C: RegistryClient + ?Sized>(
        client: &C,
        identifier: Option<&str>,
        kind: IdentifierKind,
    ) -> AnnotateResult<Self> {
        let Some(identifier) = identifier else {
            return Ok(Self::default());
        };

        let pair = resolve_pair(client, identifier, kind)?;
        let overlay_file = locate_overlay_file(client, &pair.overlay_item_id)?;
        let annotations = fetch_annotations(client, &pair.item_id)?;

        Ok(Self {
            pair: Some(pair),
            overlay_file: Some(overlay_file),
            annotations: Some(annotations),
        })
    }

    pub fn is_cleared(&self) -> bool {
        self.pair.is_none()
    }
}

/// Renders the annotations of one base item onto its overlay.
pub struct LabelAnnotator<C> {
    client: C,
    colormap: Option<ColorMap>,
    kind: IdentifierKind,
    decoders: Vec<Box<dyn RasterDecoder>>,
    state: ResolvedState,
    create_dirs: bool,
}

impl<C: RegistryClient> LabelAnnotator<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            colormap: None,
            kind: IdentifierKind::default(),
            decoders: default_decoders(),
            state: ResolvedState::default(),
            create_dirs: true,
        }
    }

    /// Replace the decoder chain, in priority order.
    pub fn with_decoders(mut self, decoders: Vec<Box<dyn RasterDecoder>>) -> Self {
        self.decoders = decoders;
        self
    }

    /// Whether [`save`](Self::save) creates missing output directories.
    pub fn with_create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn set_colormap(&mut self, colormap: Option<ColorMap>) {
        self.colormap = colormap;
    }

    /// Load the color map from a JSON file.
    pub fn load_colormap(&mut self, path: &Path) -> AnnotateResult<()> {
        self.colormap = Some(ColorMap::load(path)?);
        Ok(())
    }

    pub fn colormap(&self) -> Option<&ColorMap> {
        self.colormap.as_ref()
    }

    /// Choose what the next identifier refers to.
    pub fn set_identifier_kind(&mut self, kind: IdentifierKind) {
        self.kind = kind;
    }

    pub fn identifier_kind(&self) -> IdentifierKind {
        self.kind
    }

    /// Set the identifier and derive the new state.
    ///
    /// The previous state is discarded first, so on error the annotator is
    /// left cleared.
    pub fn set_identifier(&mut self, identifier: Option<&str>) -> AnnotateResult<&ResolvedState> {
        self.state = ResolvedState::default();
        self.state = ResolvedState::derive(&self.client, identifier, self.kind)?;
        Ok(&self.state)
    }

    pub fn state(&self) -> &ResolvedState {
        &self.state
    }

    /// Download the overlay and draw every labeled annotation onto it.
    pub fn render(&self) -> AnnotateResult<DynamicImage> {
        let (Some(file), Some(annotations)) = (&self.state.overlay_file, &self.state.annotations)
        else {
            return Err(AnnotateError::config("no identifier set"));
        };

        // Every label must be mapped before the overlay is downloaded
        let groups = group_annotations(annotations, self.colormap.as_ref())?
            .collect::<AnnotateResult<Vec<_>>>()?;
        let mut image = acquire_overlay(&self.client, file, &self.decoders)?;
        render_annotations(&mut image, groups.into_iter().map(Ok))?;
        Ok(image)
    }

    /// Render and write the result to `output`; nothing is written on failure.
    pub fn save(&self, output: &Path) -> AnnotateResult<()> {
        let image = self.render()?;
        save_image(&image, output, self.create_dirs)?;
        Ok(())
    }
}
