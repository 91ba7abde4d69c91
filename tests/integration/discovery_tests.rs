//! Tests for slide and annotation discovery on a real directory tree.

use std::fs;
use std::path::Path;

use wsi_tiler::annotation::{check_annotation_alignment, discover_annotations, load_annotations};
use wsi_tiler::slide::discover_slides;
use wsi_tiler::TilingError;

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"").unwrap();
}

#[test]
fn test_discovers_nested_slides_sorted() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    touch(&root.join("site_b/case_2.SVS"));
    touch(&root.join("site_a/deep/case_1.ndpi"));
    touch(&root.join("site_a/case_0.tif"));
    touch(&root.join("site_a/notes.txt"));
    touch(&root.join("scan.mrxs"));
    touch(&root.join("thumb.png"));

    let slides = discover_slides(root).unwrap();
    let relative: Vec<String> = slides
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(
        relative,
        vec![
            "scan.mrxs",
            "site_a/case_0.tif",
            "site_a/deep/case_1.ndpi",
            "site_b/case_2.SVS",
        ]
    );
}

#[test]
fn test_directory_without_slides() {
    let tmp = tempfile::tempdir().unwrap();
    touch(&tmp.path().join("readme.md"));

    let result = discover_slides(tmp.path());
    match result {
        Err(TilingError::NoSlidesFound { extensions, .. }) => {
            assert!(extensions.contains("svs"));
            assert!(extensions.contains("tiff"));
        }
        other => panic!("expected NoSlidesFound, got {:?}", other),
    }
}

#[test]
fn test_missing_root() {
    let tmp = tempfile::tempdir().unwrap();
    let result = discover_slides(&tmp.path().join("nope"));
    assert!(matches!(result, Err(TilingError::PathNotFound { .. })));
}

#[tokio::test]
async fn test_annotations_match_slides() {
    let tmp = tempfile::tempdir().unwrap();
    let slides_dir = tmp.path().join("slides");
    let notes_dir = tmp.path().join("annotations");
    touch(&slides_dir.join("tumor_001.svs"));
    touch(&slides_dir.join("normal_002.tif"));
    fs::create_dir_all(&notes_dir).unwrap();
    fs::write(
        notes_dir.join("tumor_001.xml"),
        r##"<ASAP_Annotations><Annotations>
            <Annotation Name="Annotation 0" Type="Polygon" PartOfGroup="None" Color="#F4FA58">
              <Coordinates>
                <Coordinate Order="0" X="10" Y="20" />
                <Coordinate Order="1" X="110" Y="20" />
                <Coordinate Order="2" X="60" Y="90" />
              </Coordinates>
            </Annotation>
          </Annotations></ASAP_Annotations>"##,
    )
    .unwrap();

    let slides = discover_slides(&slides_dir).unwrap();
    let files = discover_annotations(&notes_dir).await.unwrap();
    check_annotation_alignment(&slides, &files).unwrap();

    let loaded = load_annotations(&files[0]).await.unwrap();
    assert_eq!(loaded.slide_stem, "tumor_001");
    assert_eq!(loaded.annotations[0].bounds(), Some((10.0, 20.0, 110.0, 90.0)));

    fs::write(
        notes_dir.join("lost_003.xml"),
        "<ASAP_Annotations><Annotations /></ASAP_Annotations>",
    )
    .unwrap();
    let files = discover_annotations(&notes_dir).await.unwrap();
    let result = check_annotation_alignment(&slides, &files);
    assert!(matches!(result, Err(TilingError::Annotation(msg)) if msg.contains("lost_003")));
}
