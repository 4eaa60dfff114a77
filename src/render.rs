//! Drawing of grouped annotations onto the overlay raster

use image::{DynamicImage, GenericImage, GenericImageView, Luma, LumaA, Pixel, Rgba};

use crate::error::{AnnotateError, AnnotateResult};
use crate::group::AnnotationGroup;
use crate::models::Element;
use crate::shapes::{rasterize_box, rasterize_polygon, Clip};

/// A drawable element in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// A single pixel
    Point(i32, i32),
    /// A filled box between two corners, both included
    Rectangle { from: (i32, i32), to: (i32, i32) },
    /// A closed, filled polygon
    Polygon(Vec<(i32, i32)>),
}

/// Truncate a registry coordinate to a pixel index.
fn to_pixel(v: f64) -> i32 {
    v as i32
}

fn xy(coords: &[f64], kind: &str, field: &str) -> AnnotateResult<(i32, i32)> {
    match coords {
        [x, y, ..] => Ok((to_pixel(*x), to_pixel(*y))),
        _ => Err(AnnotateError::validation(format!(
            "{} element has fewer than two coordinates in '{}'",
            kind, field
        ))),
    }
}

fn required<T: Copy>(value: Option<T>, kind: &str, field: &str) -> AnnotateResult<T> {
    value.ok_or_else(|| {
        AnnotateError::validation(format!("{} element is missing '{}'", kind, field))
    })
}

impl TryFrom<&Element> for Shape {
    type Error = AnnotateError;

    fn try_from(element: &Element) -> AnnotateResult<Self> {
        let kind = element.kind.as_str();
        match kind {
            "point" => {
                let center = required(element.center.as_deref(), kind, "center")?;
                let (x, y) = xy(center, kind, "center")?;
                Ok(Shape::Point(x, y))
            }
            "rectangle" => {
                // `center` is used as the anchor corner, not the box center
                let center = required(element.center.as_deref(), kind, "center")?;
                let from = xy(center, kind, "center")?;
                let width = required(element.width, kind, "width")?;
                let height = required(element.height, kind, "height")?;
                let to = (to_pixel(center[0] + width), to_pixel(center[1] + height));
                Ok(Shape::Rectangle { from, to })
            }
            "polyline" => {
                let points = required(element.points.as_deref(), kind, "points")?;
                let vertices = points
                    .iter()
                    .map(|p| xy(p, kind, "points"))
                    .collect::<AnnotateResult<Vec<_>>>()?;
                Ok(Shape::Polygon(vertices))
            }
            other => Err(AnnotateError::validation(format!("invalid element type: {}", other))),
        }
    }
}

impl Shape {
    /// Hand every visible pixel of the shape, outline and fill, to `plot`.
    pub fn rasterize(&self, clip: Clip, plot: &mut dyn FnMut(u32, u32)) {
        match self {
            Shape::Point(x, y) => rasterize_box((*x, *y), (*x, *y), clip, plot),
            Shape::Rectangle { from, to } => rasterize_box(*from, *to, clip, plot),
            Shape::Polygon(vertices) => rasterize_polygon(vertices, clip, plot),
        }
    }
}

/// Fill `shape` with `color`, clipped to the image.
///
/// 16-bit grayscale rasters are label maps: they receive the 8-bit
/// luminance of `color` unscaled, so label `v` stays `v`. Every other
/// pixel type goes through the `image` crate's color conversion.
fn paint(image: &mut DynamicImage, shape: &Shape, color: Rgba<u8>) {
    let (width, height) = image.dimensions();
    let clip = Clip::new(width, height);

    match image {
        DynamicImage::ImageLuma16(buffer) => {
            let value = Luma([u16::from(color.to_luma()[0])]);
            shape.rasterize(clip, &mut |x, y| buffer.put_pixel(x, y, value));
        }
        DynamicImage::ImageLumaA16(buffer) => {
            let value = LumaA([u16::from(color.to_luma()[0]), u16::from(color[3]) * 257]);
            shape.rasterize(clip, &mut |x, y| buffer.put_pixel(x, y, value));
        }
        other => shape.rasterize(clip, &mut |x, y| other.put_pixel(x, y, color)),
    }
}

/// Draw a single element in `color`.
pub fn draw_element(
    image: &mut DynamicImage,
    element: &Element,
    color: Rgba<u8>,
) -> AnnotateResult<()> {
    let shape = Shape::try_from(element)?;
    paint(image, &shape, color);
    Ok(())
}

/// Draw every element of every grouped record onto `image`, in place.
///
/// Stops at the first grouping error or undrawable element.
pub fn render_annotations<'a, I>(image: &mut DynamicImage, groups: I) -> AnnotateResult<()>
where
    I: IntoIterator<Item = AnnotateResult<AnnotationGroup<'a>>>,
{
    for group in groups {
        let group = group?;
        let mut drawn = 0usize;
        for record in &group.records {
            for element in record.elements() {
                draw_element(image, element, group.color)?;
                drawn += 1;
            }
        }
        tracing::debug!(
            label = group.label,
            records = group.records.len(),
            elements = drawn,
            "drew group"
        );
    }
    Ok(())
}
