use descale_fast_mask::{
    BlurSpec, DetailMaskParams, ErrorMaskNode, ErrorMaskParams, MaskSource, build_error_mask,
};
use descale_fast_ops::{XxpandMode, abs_diff, binarize, box_blur, expand, limiter};
use descale_fast_types::{Frame, FrameFormat, FrameSource, Plane, SharedSource, VecSource};

fn gray(plane: Plane) -> Frame {
    Frame::gray(FrameFormat::GRAYS, plane).unwrap()
}

fn checkerboard(size: usize) -> Plane {
    Plane::from_fn(size, size, |x, y| if (x / 2 + y / 2) % 2 == 0 { 0.9 } else { 0.1 }).unwrap()
}

#[test]
fn reduced_error_mask_matches_manual_pipeline() {
    let source = gray(checkerboard(16));
    let rescaled = gray(Plane::filled(16, 16, 0.5).unwrap());
    let params = ErrorMaskParams::new(vec![3.0], (1, 0, 0), BlurSpec::Box(2), 1.0, 1).unwrap();

    let mask = build_error_mask(&source, &rescaled, &params).unwrap();

    let diff = abs_diff(source.luma(), rescaled.luma()).unwrap();
    let grown = expand(&diff, 1, XxpandMode::Rectangle).unwrap();
    let binary = binarize(&grown, 0.3, 0.0, 1.0).unwrap();
    let expected = limiter(&box_blur(&binary, 2).unwrap(), 0.0, 1.0).unwrap();
    assert_eq!(mask.luma(), &expected);
}

#[test]
fn hysteresis_growth_stops_at_the_ring() {
    // A strong island ringed by weak error, plus a detached weak blob.
    let error = Plane::from_fn(16, 16, |x, y| {
        let (dx, dy) = (x as i32 - 4, y as i32 - 4);
        if dx == 0 && dy == 0 {
            0.8
        } else if dx.abs() <= 2 && dy.abs() <= 2 {
            0.3
        } else if (11..14).contains(&x) && (11..14).contains(&y) {
            0.3
        } else {
            0.0
        }
    })
    .unwrap();
    let source = gray(error);
    let rescaled = gray(Plane::filled(16, 16, 0.0).unwrap());
    let params =
        ErrorMaskParams::new(vec![2.0, 6.0], (0, 0, 0), BlurSpec::Box(0), 1.0, 1).unwrap();

    let mask = build_error_mask(&source, &rescaled, &params).unwrap();
    let plane = mask.luma();
    assert_eq!(plane.get(4, 4), 1.0);
    assert_eq!(plane.get(2, 2), 1.0);
    assert_eq!(plane.get(6, 6), 1.0);
    assert_eq!(plane.get(7, 4), 0.0);
    assert_eq!(plane.get(12, 12), 0.0);
    assert_eq!(plane.data().iter().filter(|&&v| v > 0.0).count(), 25);
}

fn static_clip(frames: usize) -> (SharedSource, SharedSource) {
    let source = VecSource::shared(vec![gray(checkerboard(12)); frames]).unwrap();
    let rescaled = VecSource::shared(vec![gray(Plane::filled(12, 12, 0.5).unwrap()); frames])
        .unwrap();
    (source, rescaled)
}

#[test]
fn temporal_stabilization_keeps_static_masks() {
    let (source, rescaled) = static_clip(5);
    let spatial = ErrorMaskParams::new(vec![3.8], (2, 2, 3), BlurSpec::Box(1), 1.0, 1).unwrap();
    let temporal = ErrorMaskParams::new(vec![3.8], (2, 2, 3), BlurSpec::Box(1), 1.0, 3).unwrap();
    let plain = ErrorMaskNode::new(source.clone(), rescaled.clone(), spatial).unwrap();
    let stable = ErrorMaskNode::new(source, rescaled, temporal).unwrap();
    for n in 0..5 {
        assert_eq!(plain.frame(n).unwrap().luma(), stable.frame(n).unwrap().luma());
    }
}

#[test]
fn temporal_stabilization_drops_a_single_frame_flash() {
    let mut frames = vec![gray(Plane::filled(8, 8, 0.5).unwrap()); 7];
    frames[3] = gray(Plane::filled(8, 8, 1.0).unwrap());
    let source = VecSource::shared(frames).unwrap();
    let rescaled = VecSource::shared(vec![gray(Plane::filled(8, 8, 0.5).unwrap()); 7]).unwrap();
    let params = ErrorMaskParams::new(vec![3.8], (0, 0, 0), BlurSpec::Box(0), 1.0, 2).unwrap();
    let node = ErrorMaskNode::new(source, rescaled, params).unwrap();
    let flash = node.frame(3).unwrap();
    assert!(flash.luma().data().iter().all(|&v| v == 0.0));
}

#[test]
fn mask_clips_follow_the_source_length() {
    let (source, rescaled) = static_clip(3);
    let build = MaskSource::DefaultDetail(DetailMaskParams::default())
        .resolve()
        .unwrap()
        .unwrap();
    let mask = build(&source, &rescaled).unwrap();
    assert_eq!(mask.num_frames(), 3);
    assert_eq!(mask.info().format, FrameFormat::GRAYS);
    assert!(mask.frame(3).is_err());
}
