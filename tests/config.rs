use std::path::Path;

use xe_gasmap::config::{Config, HbCorrectionKey, MaskMergeOp, RegistrationKey, SegmentationKey};

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("config.json");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn minimal_config_loads_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"{ "data_dir": "/data/sub001", "subject_id": "sub001" }"#,
    );
    let config = Config::load(&path).unwrap();
    assert_eq!(config.subject_id, "sub001");
    assert_eq!(config.segmentation_key, SegmentationKey::CnnVent);
    assert_eq!(config.registration_key, RegistrationKey::Skip);
    assert_eq!(config.hb_correction_key, HbCorrectionKey::None);
    assert_eq!(config.mask_merge, MaskMergeOp::Union);
    assert!(config.rbc_m_ratio.is_none());
    assert!(!config.force_reprocess);
}

#[test]
fn unknown_keys_are_rejected_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"{ "data_dir": "/d", "subject_id": "s", "kernel_sharpness": 0.32 }"#,
    );
    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("invalid configuration"), "{err:#}");
}

#[test]
fn manual_vent_requires_a_mask_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"{ "data_dir": "/d", "subject_id": "s", "segmentation_key": "manual_vent" }"#,
    );
    assert!(Config::load(&path).is_err());

    let path = write_config(
        dir.path(),
        r#"{
            "data_dir": "/d",
            "subject_id": "s",
            "segmentation_key": "manual_vent",
            "manual_seg_filepath": "/d/mask.nii"
        }"#,
    );
    assert!(Config::load(&path).is_ok());
}

#[test]
fn manual_registration_requires_a_proton_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"{ "data_dir": "/d", "subject_id": "s", "registration_key": "manual" }"#,
    );
    assert!(Config::load(&path).is_err());
}

#[test]
fn rbc_m_ratio_must_be_in_unit_interval() {
    let dir = tempfile::tempdir().unwrap();
    for bad in ["0.0", "-0.1", "1.5"] {
        let path = write_config(
            dir.path(),
            &format!(r#"{{ "data_dir": "/d", "subject_id": "s", "rbc_m_ratio": {bad} }}"#),
        );
        assert!(Config::load(&path).is_err(), "accepted rbc_m_ratio {bad}");
    }
    let path = write_config(
        dir.path(),
        r#"{ "data_dir": "/d", "subject_id": "s", "rbc_m_ratio": 0.57 }"#,
    );
    assert_eq!(Config::load(&path).unwrap().rbc_m_ratio, Some(0.57));
}

#[test]
fn hb_correction_requires_a_positive_hb() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"{ "data_dir": "/d", "subject_id": "s", "hb_correction_key": "rbc_only" }"#,
    );
    assert!(Config::load(&path).is_err());

    let path = write_config(
        dir.path(),
        r#"{ "data_dir": "/d", "subject_id": "s", "hb_correction_key": "rbc_only", "hb": 13.1 }"#,
    );
    assert!(Config::load(&path).is_ok());
}

#[test]
fn empty_subject_or_data_dir_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), r#"{ "data_dir": "/d", "subject_id": "" }"#);
    assert!(Config::load(&path).is_err());
    let path = write_config(dir.path(), r#"{ "data_dir": "", "subject_id": "s" }"#);
    assert!(Config::load(&path).is_err());
}
