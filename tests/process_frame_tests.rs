//! Boundary-level behaviour of `process_frame` and `FrameEdgeFilter`.

use std::sync::Arc;
use std::thread;

use edgeframe::frame::GrayFrameBuf;
use edgeframe::{process_frame, FrameEdgeFilter, FrameError, FrameGeometry, RgbaFrame, TestPattern};

fn pattern(width: usize, height: usize, stride: usize, pattern: TestPattern) -> GrayFrameBuf {
    GrayFrameBuf::test_pattern(FrameGeometry::new(width, height, stride).unwrap(), pattern)
}

fn run(buf: &GrayFrameBuf) -> Vec<u8> {
    let g = buf.geometry;
    process_frame(g.width() as i32, g.height() as i32, &buf.data, g.row_stride() as i32).unwrap()
}

fn assert_replicated(rgba: &[u8]) {
    for px in rgba.chunks_exact(4) {
        assert!(px.iter().all(|&c| c == px[0]), "channels differ: {px:?}");
    }
}

#[test]
fn output_length_is_width_height_times_four() {
    for &(w, h) in &[(4usize, 4usize), (16, 9), (33, 17), (64, 48)] {
        let out = run(&pattern(w, h, w, TestPattern::Gradient));
        assert_eq!(out.len(), w * h * 4, "{w}x{h}");
    }
}

#[test]
fn every_pixel_has_equal_channels() {
    for kind in [TestPattern::Gradient, TestPattern::Checkerboard, TestPattern::Noise] {
        let out = run(&pattern(80, 60, 80, kind));
        assert_replicated(&out);
    }
}

#[test]
fn filtering_is_deterministic() {
    let source = pattern(96, 64, 96, TestPattern::Noise);
    let first = run(&source);
    let second = run(&source);
    assert_eq!(first, second);
}

#[test]
fn row_padding_does_not_change_output() {
    let tight = pattern(70, 50, 70, TestPattern::Checkerboard);
    let padded = tight.with_stride(128).unwrap();
    assert_eq!(run(&tight), run(&padded));

    let noisy = pattern(45, 31, 45, TestPattern::Noise);
    assert_eq!(run(&noisy), run(&noisy.with_stride(48).unwrap()));
}

#[test]
fn extra_trailing_bytes_are_ignored() {
    let source = pattern(32, 32, 32, TestPattern::Gradient);
    let mut longer = source.data.clone();
    longer.extend_from_slice(&[0xFF; 100]);
    let out = process_frame(32, 32, &longer, 32).unwrap();
    assert_eq!(out, run(&source));
}

#[test]
fn flat_4x4_frame_has_no_edges() {
    let out = process_frame(4, 4, &[0u8; 16], 4).unwrap();
    assert_eq!(out, vec![0u8; 64]);

    let gray = run(&pattern(32, 32, 32, TestPattern::Flat(128)));
    assert!(gray.iter().all(|&b| b == 0));
}

#[test]
fn vertical_step_is_a_one_pixel_line() {
    let (w, h, step) = (32usize, 24usize, 16usize);
    let data: Vec<u8> = (0..w * h).map(|i| if i % w < step { 0 } else { 255 }).collect();
    let out = process_frame(w as i32, h as i32, &data, w as i32).unwrap();

    for y in 0..h {
        let edge_columns: Vec<usize> = (0..w)
            .filter(|&x| {
                let px = &out[(y * w + x) * 4..(y * w + x + 1) * 4];
                assert!(px == [0; 4] || px == [255; 4], "pixel ({x},{y}) is {px:?}");
                px == [255; 4]
            })
            .collect();
        assert_eq!(edge_columns, vec![step - 1], "row {y}");
    }
}

#[test]
fn padded_step_matches_tight_step() {
    let tight = pattern(40, 20, 40, TestPattern::Step { column: 25 });
    assert_eq!(run(&tight), run(&tight.with_stride(64).unwrap()));
}

#[test]
fn stride_smaller_than_width_is_invalid() {
    let err = process_frame(8, 4, &[0u8; 64], 7).unwrap_err();
    assert!(matches!(err, FrameError::InvalidArgument(_)));
}

#[test]
fn malformed_arguments_are_invalid() {
    let data = [0u8; 64];
    let cases: [(i32, i32, usize, i32); 6] = [
        (0, 4, 64, 4),
        (4, 0, 64, 4),
        (-4, 4, 64, 4),
        (4, -4, 64, 4),
        (4, 4, 64, -4),
        (8, 8, 63, 8),
    ];
    for (w, h, len, stride) in cases {
        let err = process_frame(w, h, &data[..len], stride).unwrap_err();
        assert!(
            matches!(err, FrameError::InvalidArgument(_)),
            "({w}, {h}, len {len}, stride {stride}) gave {err:?}"
        );
    }
}

#[test]
fn output_is_a_fresh_buffer() {
    let source = pattern(16, 16, 16, TestPattern::Checkerboard);
    let out = run(&source);
    let in_range = source.data.as_ptr_range();
    assert!(!in_range.contains(&out.as_ptr()));
}

#[test]
fn filter_is_shared_across_threads() {
    let filter = Arc::new(FrameEdgeFilter::new());
    let source = Arc::new(pattern(64, 64, 80, TestPattern::Noise));
    let expected = filter.process(&source.view().unwrap()).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let filter = Arc::clone(&filter);
            let source = Arc::clone(&source);
            thread::spawn(move || filter.process(&source.view().unwrap()).unwrap())
        })
        .collect();

    for handle in handles {
        let got: RgbaFrame = handle.join().unwrap();
        assert_eq!(got, expected);
    }
}
