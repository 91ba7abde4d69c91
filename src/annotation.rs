//! Pathologist annotations.
//!
//! Each slide may come with a `{stem}.xml` file in the Camelyon (ASAP)
//! layout, listing named polygon regions in level-0 pixel coordinates:
//!
//! ```xml
//! <ASAP_Annotations>
//!   <Annotations>
//!     <Annotation Name="_0" Type="Polygon" PartOfGroup="Tumor" Color="#F4FA58">
//!       <Coordinates>
//!         <Coordinate Order="0" X="1520.5" Y="880" />
//!         <Coordinate Order="1" X="1610" Y="902.25" />
//!       </Coordinates>
//!     </Annotation>
//!   </Annotations>
//! </ASAP_Annotations>
//! ```
//!
//! Annotations are carried alongside slides as opaque records; they do not
//! influence which tiles are extracted.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::TilingError;
use crate::slide::slide_stem;

/// Extension of annotation files.
pub const ANNOTATION_EXTENSION: &str = "xml";

/// One named polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRegion {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub color: String,

    /// Ordered `(x, y)` vertices in level-0 pixels
    pub points: Vec<(f64, f64)>,
}

impl AnnotationRegion {
    /// Bounding box `(min_x, min_y, max_x, max_y)`, or `None` without points.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let (&(x0, y0), rest) = self.points.split_first()?;
        Some(rest.iter().fold(
            (x0, y0, x0, y0),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        ))
    }
}

/// All regions drawn on one slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideAnnotations {
    /// Stem of the slide these regions belong to
    pub slide_stem: String,

    pub annotations: Vec<AnnotationRegion>,
}

/// Load an annotation file; the slide stem is taken from the file name.
pub async fn load_annotations(path: &Path) -> Result<SlideAnnotations, TilingError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TilingError::Annotation(format!("{}: {}", path.display(), e)))?;
    let annotations = parse_annotations(&text)
        .map_err(|message| TilingError::Annotation(format!("{}: {}", path.display(), message)))?;

    Ok(SlideAnnotations {
        slide_stem: slide_stem(path),
        annotations,
    })
}

/// Parse the `Annotation` elements of an annotation document, in document order.
pub fn parse_annotations(text: &str) -> Result<Vec<AnnotationRegion>, String> {
    let doc = roxmltree::Document::parse(text).map_err(|e| e.to_string())?;

    doc.descendants()
        .filter(|node| node.has_tag_name("Annotation"))
        .map(|node| {
            let points = node
                .descendants()
                .filter(|child| child.has_tag_name("Coordinate"))
                .map(|coord| Ok((coordinate(&coord, "X")?, coordinate(&coord, "Y")?)))
                .collect::<Result<Vec<_>, String>>()?;

            Ok(AnnotationRegion {
                name: node.attribute("Name").unwrap_or_default().to_string(),
                kind: node.attribute("Type").unwrap_or_default().to_string(),
                color: node.attribute("Color").unwrap_or_default().to_string(),
                points,
            })
        })
        .collect()
}

fn coordinate(node: &roxmltree::Node<'_, '_>, axis: &str) -> Result<f64, String> {
    let raw = node.attribute(axis).ok_or_else(|| {
        format!(
            "Coordinate without {} attribute at byte {}",
            axis,
            node.range().start
        )
    })?;
    raw.trim()
        .parse()
        .map_err(|_| format!("invalid {} coordinate '{}'", axis, raw))
}

/// List annotation files directly inside `dir`, sorted by path.
pub async fn discover_annotations(dir: &Path) -> Result<Vec<PathBuf>, TilingError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|_| TilingError::PathNotFound {
            path: dir.to_path_buf(),
        })?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TilingError::Annotation(format!("{}: {}", dir.display(), e)))?
    {
        let path = entry.path();
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if is_file
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(ANNOTATION_EXTENSION))
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Every annotation file must name a slide that is present.
pub fn check_annotation_alignment(
    slides: &[PathBuf],
    annotations: &[PathBuf],
) -> Result<(), TilingError> {
    let slide_stems: BTreeSet<String> = slides.iter().map(|p| slide_stem(p)).collect();
    let orphans: Vec<String> = annotations
        .iter()
        .map(|p| slide_stem(p))
        .filter(|stem| !slide_stems.contains(stem))
        .collect();

    if orphans.is_empty() {
        Ok(())
    } else {
        Err(TilingError::Annotation(format!(
            "no slide found for annotation(s): {}",
            orphans.join(", ")
        )))
    }
}
