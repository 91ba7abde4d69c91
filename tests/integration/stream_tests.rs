//! Tests for lazy tile streaming.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use super::test_utils::{settings, MockSlide, MockSlideSource};

use wsi_tiler::tiling::{
    IterationMode, PatchContent, PatchStream, StreamExtractor, TileClass, TilingSettings,
};
use wsi_tiler::TilingError;

/// Four rows of two columns at patch size 400.
fn four_row_source() -> MockSlideSource {
    MockSlideSource::new().with_slide("/in/s.svs", MockSlide::new(1600, 800, 128))
}

async fn drain(patches: &mut PatchStream<MockSlide>) -> Vec<(u64, u64, TileClass)> {
    let mut items = Vec::new();
    while let Some(item) = patches.next().await {
        let item = item.unwrap();
        items.push((item.row, item.column, item.content.class()));
    }
    items
}

async fn seeded_order(seed: u64) -> Vec<(u64, u64)> {
    let extractor = StreamExtractor::new(four_row_source(), settings(400, 3)).unwrap();
    let mut slides = extractor.stream(
        vec![PathBuf::from("/in/s.svs")],
        IterationMode::Random,
        Some(seed),
    );
    let (_, mut patches) = slides.next_slide().await.unwrap().unwrap();
    drain(&mut patches)
        .await
        .into_iter()
        .map(|(row, column, _)| (row, column))
        .collect()
}

#[tokio::test]
async fn test_sequence_mode_order() {
    let extractor = StreamExtractor::new(four_row_source(), settings(400, 3)).unwrap();
    let mut slides = extractor.stream(
        vec![PathBuf::from("/in/s.svs")],
        IterationMode::Sequence,
        None,
    );

    let (index, mut patches) = slides.next_slide().await.unwrap().unwrap();
    assert_eq!(index, 0);
    assert_eq!(patches.len(), 8);
    assert_eq!(patches.row_order(), &[0, 1, 2, 3]);

    let order: Vec<(u64, u64)> = drain(&mut patches)
        .await
        .into_iter()
        .map(|(row, column, _)| (row, column))
        .collect();
    assert_eq!(
        order,
        vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1), (3, 0), (3, 1)]
    );
    assert!(patches.next().await.is_none());
    assert_eq!(patches.remaining(), 0);
}

#[tokio::test]
async fn test_random_mode_is_a_row_permutation() {
    let order = seeded_order(7).await;
    assert_eq!(order.len(), 8);

    // Columns ascend inside every row block
    for block in order.chunks(2) {
        assert_eq!(block[0].0, block[1].0);
        assert_eq!((block[0].1, block[1].1), (0, 1));
    }

    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(
        sorted,
        vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1), (3, 0), (3, 1)]
    );
}

#[tokio::test]
async fn test_same_seed_same_order() {
    assert_eq!(seeded_order(42).await, seeded_order(42).await);
    assert_eq!(seeded_order(0).await, seeded_order(0).await);
}

#[tokio::test]
async fn test_filtered_stream_marks_black_and_blank() {
    let slide = MockSlide::new(800, 400, 128)
        .with_value((0, 0), 5)
        .with_value((400, 0), 210);
    let source = MockSlideSource::new().with_slide("/in/s.svs", slide);

    let extractor = StreamExtractor::new(source, settings(400, 3)).unwrap();
    let mut slides = extractor.stream(
        vec![PathBuf::from("/in/s.svs")],
        IterationMode::Sequence,
        None,
    );
    let (_, mut patches) = slides.next_slide().await.unwrap().unwrap();

    let first = patches.next().await.unwrap().unwrap();
    assert_eq!(first.content, PatchContent::Black);
    assert!(first.content.tile().is_none());

    let second = patches.next().await.unwrap().unwrap();
    assert_eq!((second.row, second.column), (1, 0));
    assert_eq!(second.content, PatchContent::Blank);

    assert!(patches.next().await.is_none());
}

#[tokio::test]
async fn test_unfiltered_stream_keeps_pixels() {
    let slide = MockSlide::new(800, 400, 128).with_value((0, 0), 5);
    let source = MockSlideSource::new().with_slide("/in/s.svs", slide);

    let settings = TilingSettings {
        remove_black: false,
        remove_blank: false,
        ..settings(400, 3)
    };
    let extractor = StreamExtractor::new(source, settings).unwrap();
    let mut slides = extractor.stream(
        vec![PathBuf::from("/in/s.svs")],
        IterationMode::Sequence,
        None,
    );
    let (_, mut patches) = slides.next_slide().await.unwrap().unwrap();

    let first = patches.next().await.unwrap().unwrap();
    let tile = first.content.into_tile().unwrap();
    assert_eq!(tile.dimensions(), (400, 400));
    assert_eq!(tile.get_pixel(0, 0).0, [5, 5, 5]);
}

#[tokio::test]
async fn test_tiles_read_on_demand() {
    let slide = MockSlide::new(1600, 800, 128);
    let reads = slide.read_counter();
    let source = MockSlideSource::new().with_slide("/in/s.svs", slide);

    let extractor = StreamExtractor::new(source, settings(400, 3)).unwrap();
    let mut slides = extractor.stream(
        vec![PathBuf::from("/in/s.svs")],
        IterationMode::Sequence,
        None,
    );
    assert_eq!(reads.load(Ordering::SeqCst), 0);

    let (_, mut patches) = slides.next_slide().await.unwrap().unwrap();
    assert_eq!(reads.load(Ordering::SeqCst), 0);

    patches.next().await.unwrap().unwrap();
    assert_eq!(reads.load(Ordering::SeqCst), 1);
    assert_eq!(patches.remaining(), 7);

    // Dropping the stream early leaves the rest unread
    drop(patches);
    assert_eq!(reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_mode_rejected() {
    let extractor = StreamExtractor::new(four_row_source(), settings(400, 3)).unwrap();
    let result = extractor.stream_with_mode(vec![PathBuf::from("/in/s.svs")], "zigzag", None);
    assert!(matches!(result, Err(TilingError::InvalidArgument(_))));

    assert!(extractor
        .stream_with_mode(vec![PathBuf::from("/in/s.svs")], "random", Some(1))
        .is_ok());
}

#[tokio::test]
async fn test_slides_yielded_in_order() {
    let source = MockSlideSource::new()
        .with_slide("/in/a.svs", MockSlide::new(800, 400, 128))
        .with_slide("/in/b.svs", MockSlide::new(400, 400, 128));

    let extractor = StreamExtractor::new(source, settings(400, 3)).unwrap();
    let mut slides = extractor.stream(
        vec![PathBuf::from("/in/a.svs"), PathBuf::from("/in/b.svs")],
        IterationMode::Random,
        None,
    );
    assert_eq!(slides.remaining(), 2);

    let (index, patches) = slides.next_slide().await.unwrap().unwrap();
    assert_eq!(index, 0);
    assert_eq!(patches.context().handle.stem, "a");

    let (index, patches) = slides.next_slide().await.unwrap().unwrap();
    assert_eq!(index, 1);
    assert_eq!(patches.context().handle.stem, "b");
    assert_eq!(patches.len(), 1);

    assert!(slides.next_slide().await.is_none());
    assert_eq!(slides.remaining(), 0);
}

#[tokio::test]
async fn test_unopenable_slide_yields_error_and_continues() {
    let source = MockSlideSource::new().with_slide("/in/b.svs", MockSlide::new(400, 400, 128));

    let extractor = StreamExtractor::new(source, settings(400, 3)).unwrap();
    let mut slides = extractor.stream(
        vec![PathBuf::from("/in/missing.svs"), PathBuf::from("/in/b.svs")],
        IterationMode::Sequence,
        None,
    );

    let first = slides.next_slide().await.unwrap();
    assert!(matches!(first, Err(TilingError::Slide { .. })));

    let (index, _) = slides.next_slide().await.unwrap().unwrap();
    assert_eq!(index, 1);
}

#[tokio::test]
async fn test_failed_read_surfaces_in_item() {
    let slide = MockSlide::new(800, 400, 128).failing_at((400, 0));
    let source = MockSlideSource::new().with_slide("/in/s.svs", slide);

    let extractor = StreamExtractor::new(source, settings(400, 3)).unwrap();
    let mut slides = extractor.stream(
        vec![PathBuf::from("/in/s.svs")],
        IterationMode::Sequence,
        None,
    );
    let (_, mut patches) = slides.next_slide().await.unwrap().unwrap();

    assert!(patches.next().await.unwrap().is_ok());
    assert!(matches!(
        patches.next().await.unwrap(),
        Err(TilingError::Slide { .. })
    ));
}
