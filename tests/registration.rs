use std::time::Duration;

use xe_gasmap::error::PipelineError;
use xe_gasmap::registration::{
    ExternalRegistration, RegistrationCapability, RegistrationTransform,
};
use xe_gasmap::volume::{Affine3, MaskVolume, ScalarVolume};

#[test]
fn identity_transform_preserves_maps_and_masks() {
    let mut map = ScalarVolume::zeros((6, 6, 6));
    map[(2, 3, 4)] = 5.0;
    let mut mask = MaskVolume::from_elem((6, 6, 6), false);
    mask[(2, 3, 4)] = true;

    let t = RegistrationTransform::identity();
    assert_eq!(t.apply_to_map(&map, (6, 6, 6)), map);
    assert_eq!(t.apply_to_mask(&mask, (6, 6, 6)), mask);
}

#[test]
fn translation_shifts_volume_contents() {
    let mut map = ScalarVolume::zeros((6, 6, 6));
    map[(3, 3, 3)] = 1.0;

    // pull-back: output voxel (2,3,3) samples input (3,3,3)
    let t = RegistrationTransform { affine: Affine3::translation(1.0, 0.0, 0.0) };
    let out = t.apply_to_map(&map, (6, 6, 6));
    assert_eq!(out[(2, 3, 3)], 1.0);
    assert_eq!(out[(3, 3, 3)], 0.0);

    let mut mask = MaskVolume::from_elem((6, 6, 6), false);
    mask[(3, 3, 3)] = true;
    let out = t.apply_to_mask(&mask, (6, 6, 6));
    assert!(out[(2, 3, 3)]);
    assert!(!out[(3, 3, 3)]);
}

#[test]
fn out_of_grid_samples_become_zero() {
    let map = ScalarVolume::from_elem((4, 4, 4), 1.0);
    let t = RegistrationTransform { affine: Affine3::translation(10.0, 0.0, 0.0) };
    let out = t.apply_to_map(&map, (4, 4, 4));
    assert!(out.iter().all(|&v| v == 0.0));
}

fn small_volume() -> ScalarVolume {
    ScalarVolume::from_elem((4, 4, 4), 1.0)
}

#[test]
fn non_zero_exit_is_a_registration_error_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let reg = ExternalRegistration {
        cmd: vec!["false".to_string()],
        work_dir: dir.path().to_path_buf(),
        timeout: Duration::from_secs(5),
    };
    let err = reg.register(&small_volume(), &small_volume()).unwrap_err();
    assert!(matches!(err, PipelineError::Registration(_)));
}

#[test]
fn timeout_is_a_registration_error() {
    let dir = tempfile::tempdir().unwrap();
    let reg = ExternalRegistration {
        cmd: vec!["sh".to_string(), "-c".to_string(), "sleep 5".to_string()],
        work_dir: dir.path().to_path_buf(),
        timeout: Duration::from_millis(200),
    };
    let err = reg.register(&small_volume(), &small_volume()).unwrap_err();
    match err {
        PipelineError::Registration(msg) => assert!(msg.contains("timed out"), "{msg}"),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn missing_transform_file_is_a_registration_error() {
    let dir = tempfile::tempdir().unwrap();
    let reg = ExternalRegistration {
        cmd: vec!["true".to_string()],
        work_dir: dir.path().to_path_buf(),
        timeout: Duration::from_secs(5),
    };
    let err = reg.register(&small_volume(), &small_volume()).unwrap_err();
    assert!(matches!(err, PipelineError::Registration(_)));
}

#[test]
fn well_formed_transform_file_is_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let transform_path = dir.path().join("reg_transform.json");
    let affine: Vec<f64> = vec![
        1.0, 0.0, 0.0, 2.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];
    std::fs::write(
        &transform_path,
        serde_json::to_string(&serde_json::json!({ "affine": affine })).unwrap(),
    )
    .unwrap();

    let reg = ExternalRegistration {
        cmd: vec!["true".to_string()],
        work_dir: dir.path().to_path_buf(),
        timeout: Duration::from_secs(5),
    };
    let transform = reg.register(&small_volume(), &small_volume()).unwrap();
    assert_eq!(transform.affine.matrix[0][3], 2.0);
    assert_eq!(transform.affine.matrix[1][1], 1.0);
}

#[test]
fn malformed_transform_file_is_a_registration_error() {
    let dir = tempfile::tempdir().unwrap();
    let transform_path = dir.path().join("reg_transform.json");
    std::fs::write(&transform_path, r#"{ "affine": [1.0, 2.0, 3.0] }"#).unwrap();

    let reg = ExternalRegistration {
        cmd: vec!["true".to_string()],
        work_dir: dir.path().to_path_buf(),
        timeout: Duration::from_secs(5),
    };
    let err = reg.register(&small_volume(), &small_volume()).unwrap_err();
    match err {
        PipelineError::Registration(msg) => assert!(msg.contains("16"), "{msg}"),
        other => panic!("unexpected error {other}"),
    }
}
