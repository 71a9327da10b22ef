use super::*;

#[test]
fn size_preserves_aspect_and_never_upsamples() {
    assert_eq!(thumbnail_size(1000, 500, 100), (100, 50));
    assert_eq!(thumbnail_size(500, 1000, 100), (50, 100));
    assert_eq!(thumbnail_size(80, 40, 100), (80, 40));
    assert_eq!(thumbnail_size(10_000, 1, 100), (100, 1));
    assert_eq!(thumbnail_size(0, 0, 100), (0, 0));
}

#[test]
fn size_rounds_short_side() {
    // 300 * 100 / 1000 = 30, 333 * 100 / 1000 = 33.3 -> 33, 335 -> 33.5 -> 34
    assert_eq!(thumbnail_size(1000, 333, 100), (100, 33));
    assert_eq!(thumbnail_size(1000, 335, 100), (100, 34));
}

#[test]
fn make_thumbnail_downsamples() {
    let src = Raster::from_rgba8(8, 4, [10u8, 20, 30, 255].repeat(32)).unwrap();
    let t = make_thumbnail(&src, 4).unwrap();
    assert_eq!((t.width(), t.height()), (4, 2));
    let want = [10u8, 20, 30, 255];
    assert!(
        t.data()
            .chunks_exact(4)
            .all(|px| px.iter().zip(want).all(|(a, b)| a.abs_diff(b) <= 1))
    );
}

#[test]
fn transparent_pixels_do_not_darken_colors() {
    let pattern = [[255u8, 0, 0, 255], [0, 0, 0, 0]].concat();
    let src = Raster::from_rgba8(8, 1, pattern.repeat(4)).unwrap();
    let t = make_thumbnail(&src, 4).unwrap();
    assert_eq!((t.width(), t.height()), (4, 1));
    for px in t.data().chunks_exact(4) {
        assert!(px[0] >= 254, "{px:?}");
        assert_eq!((px[1], px[2]), (0, 0));
        assert!(px[3].abs_diff(128) <= 1, "{px:?}");
    }
}

#[test]
fn fully_transparent_areas_stay_transparent() {
    let src = Raster::from_rgba8(4, 4, vec![0; 64]).unwrap();
    let t = make_thumbnail(&src, 2).unwrap();
    assert!(t.data().iter().all(|&b| b == 0));
}

#[test]
fn small_and_empty_rasters_are_copied() {
    let src = Raster::from_rgba8(2, 2, vec![7; 16]).unwrap();
    assert_eq!(make_thumbnail(&src, 4).unwrap(), src);
    assert_eq!(make_thumbnail(&Raster::empty(), 4).unwrap(), Raster::empty());
}

#[test]
fn zero_max_dim_is_rejected() {
    assert!(matches!(
        make_thumbnail(&Raster::empty(), 0),
        Err(PsdError::Validation(_))
    ));
}
