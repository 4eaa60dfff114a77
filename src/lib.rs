//! overlay-labels - Library for burning registry annotations onto overlays
//!
//! This library provides functionality to:
//! - Resolve a base item and its linked overlay item on a Girder registry
//! - Fetch the base item's annotations, with a per-record fallback
//! - Group annotations by label and color them from a JSON color map
//! - Rasterize points, rectangles and polylines onto the overlay raster

pub mod acquire;
pub mod annotator;
pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod fetch;
pub mod group;
pub mod locate;
pub mod models;
pub mod output;
pub mod registry;
pub mod render;
pub mod resolve;
pub mod shapes;

pub use annotator::{LabelAnnotator, ResolvedState};
pub use color::ColorMap;
pub use error::{AnnotateError, AnnotateResult};
pub use registry::{GirderClient, MemoryRegistry, RegistryClient, RegistryError};
pub use resolve::{IdentifierKind, ResolvedPair};
