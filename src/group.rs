//! Partition of annotation records into same-label runs
//!
//! Grouping is a single linear pass over the records as delivered by the
//! registry: consecutive records with the same label form one group, and the
//! same label appearing again after a different one starts a new group.
//! Unlabeled records are skipped without breaking the run around them.

use image::Rgba;
use std::iter::Peekable;

use crate::color::ColorMap;
use crate::error::{AnnotateError, AnnotateResult};
use crate::models::Annotation;

/// A run of records sharing one label, with the label's color.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationGroup<'a> {
    pub label: &'a str,
    pub color: Rgba<u8>,
    pub records: Vec<&'a Annotation>,
}

/// Lazy iterator over [`AnnotationGroup`]s.
///
/// Yields an error for the first label missing from the color map and
/// nothing after it.
pub struct AnnotationGroups<'a> {
    records: Peekable<Box<dyn Iterator<Item = (&'a str, &'a Annotation)> + 'a>>,
    colormap: &'a ColorMap,
    failed: bool,
}

/// Group `annotations` into same-label runs colored by `colormap`.
///
/// Fails before yielding anything when no color map is set.
///
/// # Examples
///
/// ```
/// use overlay_labels::color::ColorMap;
/// use overlay_labels::group::group_annotations;
/// use overlay_labels::models::Annotation;
///
/// let records: Vec<Annotation> = serde_json::from_str(
///     r#"[{"annotation": {"name": "a", "elements": []}},
///         {"annotation": {"elements": []}},
///         {"annotation": {"name": "a", "elements": []}},
///         {"annotation": {"name": "b", "elements": []}}]"#,
/// ).unwrap();
/// let colors = ColorMap::from_json_str(r#"{"a": "red", "b": "blue"}"#).unwrap();
///
/// let groups: Vec<_> = group_annotations(&records, Some(&colors))
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0].records.len(), 2);
/// ```
pub fn group_annotations<'a>(
    annotations: &'a [Annotation],
    colormap: Option<&'a ColorMap>,
) -> AnnotateResult<AnnotationGroups<'a>> {
    let colormap = colormap.ok_or_else(|| AnnotateError::config("no color mapping set"))?;
    let labeled: Box<dyn Iterator<Item = (&'a str, &'a Annotation)> + 'a> =
        Box::new(annotations.iter().filter_map(|a| a.label().map(|label| (label, a))));

    Ok(AnnotationGroups { records: labeled.peekable(), colormap, failed: false })
}

impl<'a> Iterator for AnnotationGroups<'a> {
    type Item = AnnotateResult<AnnotationGroup<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let (label, first) = self.records.next()?;
        let mut records = vec![first];
        while let Some((_, record)) = self.records.next_if(|(next, _)| *next == label) {
            records.push(record);
        }

        match self.colormap.get(label) {
            Some(color) => Some(Ok(AnnotationGroup { label, color, records })),
            None => {
                self.failed = true;
                Some(Err(AnnotateError::config(format!(
                    "no color mapping for annotation \"{}\"",
                    label
                ))))
            }
        }
    }
}
