use std::time::Duration;

use ndarray::Array3;
use nifti::writer::WriterOptions;
use xe_gasmap::config::{MaskMergeOp, SegmentationKey};
use xe_gasmap::error::PipelineError;
use xe_gasmap::segmentation::{
    merge_masks, read_mask_nifti, reconcile, ExternalCnnSegmenter, SegmentationCapability,
};
use xe_gasmap::volume::{MaskVolume, ScalarVolume};

struct FakeSegmenter {
    mask: MaskVolume,
}

impl SegmentationCapability for FakeSegmenter {
    fn infer(&self, _image: &ScalarVolume) -> Result<MaskVolume, PipelineError> {
        Ok(self.mask.clone())
    }
}

fn anatomical(shape: (usize, usize, usize)) -> ScalarVolume {
    ScalarVolume::from_elem(shape, 1.0)
}

fn checker_mask(shape: (usize, usize, usize), offset: usize) -> MaskVolume {
    let mut mask = MaskVolume::from_elem(shape, false);
    for ((i, j, k), v) in mask.indexed_iter_mut() {
        *v = (i + j + k + offset) % 2 == 0;
    }
    mask
}

#[test]
fn cnn_mask_on_matching_grid_is_accepted() {
    let image = anatomical((8, 8, 8));
    let fake = FakeSegmenter { mask: checker_mask((8, 8, 8), 0) };
    let mask = reconcile(SegmentationKey::CnnVent, &image, None, Some(&fake)).unwrap();
    assert_eq!(mask.dim(), image.dim());
}

#[test]
fn cnn_mask_shape_mismatch_is_a_segmentation_error() {
    let image = anatomical((8, 8, 8));
    let fake = FakeSegmenter { mask: checker_mask((4, 4, 4), 0) };
    let err = reconcile(SegmentationKey::CnnVent, &image, None, Some(&fake)).unwrap_err();
    assert!(matches!(err, PipelineError::Segmentation(_)));
}

#[test]
fn empty_mask_is_a_segmentation_error() {
    let image = anatomical((8, 8, 8));
    let fake = FakeSegmenter { mask: MaskVolume::from_elem((8, 8, 8), false) };
    let err = reconcile(SegmentationKey::CnnVent, &image, None, Some(&fake)).unwrap_err();
    assert!(matches!(err, PipelineError::Segmentation(_)));
}

#[test]
fn missing_cnn_capability_is_a_segmentation_error() {
    let image = anatomical((8, 8, 8));
    let err = reconcile(SegmentationKey::CnnVent, &image, None, None).unwrap_err();
    assert!(matches!(err, PipelineError::Segmentation(_)));
}

#[test]
fn skip_yields_full_mask() {
    let image = anatomical((6, 6, 6));
    let mask = reconcile(SegmentationKey::Skip, &image, None, None).unwrap();
    assert!(mask.iter().all(|&m| m));
}

#[test]
fn manual_without_path_is_a_segmentation_error() {
    let image = anatomical((8, 8, 8));
    let err = reconcile(SegmentationKey::ManualVent, &image, None, None).unwrap_err();
    assert!(matches!(err, PipelineError::Segmentation(_)));
}

#[test]
fn manual_mask_roundtrips_through_nifti() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mask.nii");
    let data: Array3<f64> = checker_mask((8, 8, 8), 0).mapv(|m| if m { 1.0 } else { 0.0 });
    WriterOptions::new(&path).write_nifti(&data).unwrap();

    let mask = read_mask_nifti(&path).unwrap();
    assert_eq!(mask, checker_mask((8, 8, 8), 0));

    let image = anatomical((8, 8, 8));
    let reconciled =
        reconcile(SegmentationKey::ManualVent, &image, Some(path.as_path()), None).unwrap();
    assert_eq!(reconciled, mask);
}

#[test]
fn manual_mask_shape_mismatch_is_a_segmentation_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mask.nii");
    let data: Array3<f64> = Array3::from_elem((4, 4, 4), 1.0);
    WriterOptions::new(&path).write_nifti(&data).unwrap();

    let image = anatomical((8, 8, 8));
    let err = reconcile(SegmentationKey::ManualVent, &image, Some(path.as_path()), None).unwrap_err();
    assert!(matches!(err, PipelineError::Segmentation(_)));
}

#[test]
fn merge_is_commutative_and_associative() {
    let a = checker_mask((6, 6, 6), 0);
    let b = checker_mask((6, 6, 6), 1);
    let mut c = checker_mask((6, 6, 6), 0);
    c[(0, 0, 0)] = false;
    c[(5, 5, 5)] = true;

    for op in [MaskMergeOp::Union, MaskMergeOp::Intersection] {
        let ab = merge_masks(&a, &b, op).unwrap();
        let ba = merge_masks(&b, &a, op).unwrap();
        assert_eq!(ab, ba, "{op:?} not commutative");

        let ab_c = merge_masks(&ab, &c, op).unwrap();
        let bc = merge_masks(&b, &c, op).unwrap();
        let a_bc = merge_masks(&a, &bc, op).unwrap();
        assert_eq!(ab_c, a_bc, "{op:?} not associative");
    }
}

#[test]
fn merge_semantics_differ_between_operators() {
    let a = checker_mask((4, 4, 4), 0);
    let b = checker_mask((4, 4, 4), 1);
    let union = merge_masks(&a, &b, MaskMergeOp::Union).unwrap();
    let inter = merge_masks(&a, &b, MaskMergeOp::Intersection).unwrap();
    assert!(union.iter().all(|&m| m));
    assert!(inter.iter().all(|&m| !m));
}

#[test]
fn merge_grid_mismatch_is_a_segmentation_error() {
    let a = checker_mask((4, 4, 4), 0);
    let b = checker_mask((6, 6, 6), 0);
    let err = merge_masks(&a, &b, MaskMergeOp::Union).unwrap_err();
    assert!(matches!(err, PipelineError::Segmentation(_)));
}

#[test]
fn external_segmenter_timeout_is_a_segmentation_error() {
    let dir = tempfile::tempdir().unwrap();
    let segmenter = ExternalCnnSegmenter {
        cmd: vec!["sh".to_string(), "-c".to_string(), "sleep 5".to_string()],
        work_dir: dir.path().to_path_buf(),
        timeout: Duration::from_millis(200),
    };
    let err = segmenter.infer(&anatomical((4, 4, 4))).unwrap_err();
    match err {
        PipelineError::Segmentation(msg) => assert!(msg.contains("timed out"), "{msg}"),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn external_segmenter_failure_is_a_segmentation_error() {
    let dir = tempfile::tempdir().unwrap();
    let segmenter = ExternalCnnSegmenter {
        cmd: vec!["false".to_string()],
        work_dir: dir.path().to_path_buf(),
        timeout: Duration::from_secs(5),
    };
    let err = segmenter.infer(&anatomical((4, 4, 4))).unwrap_err();
    assert!(matches!(err, PipelineError::Segmentation(_)));
}

#[test]
fn external_segmenter_reads_produced_mask() {
    use ndarray_npy::WriteNpyExt;

    let dir = tempfile::tempdir().unwrap();
    // pre-write the output the "model" would produce, then run a no-op
    let output = dir.path().join("seg_output.npy");
    let mask_u8: Array3<u8> = checker_mask((4, 4, 4), 0).mapv(u8::from);
    mask_u8.write_npy(std::fs::File::create(&output).unwrap()).unwrap();

    let segmenter = ExternalCnnSegmenter {
        cmd: vec!["true".to_string()],
        work_dir: dir.path().to_path_buf(),
        timeout: Duration::from_secs(5),
    };
    let mask = segmenter.infer(&anatomical((4, 4, 4))).unwrap();
    assert_eq!(mask, checker_mask((4, 4, 4), 0));
}
