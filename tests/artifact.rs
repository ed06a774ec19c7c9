use ndarray::Array3;
use num_complex::Complex64;
use xe_gasmap::acquisition::{AcqMeta, DixonPair};
use xe_gasmap::calibration::{CalibrationResult, CalibrationSource};
use xe_gasmap::decompose::CompartmentMaps;
use xe_gasmap::io::artifact::{
    find_snapshot, read_snapshot, snapshot_filename, write_snapshot, Snapshot,
};
use xe_gasmap::volume::{MaskVolume, ScalarVolume};

fn meta() -> AcqMeta {
    AcqMeta {
        te90: 450e-6,
        tr: 15e-3,
        fa_gas: 0.5,
        fa_dis: 20.0,
        field_strength: 3.0,
        fov: 400.0,
        scan_date: "2024-03-14".to_string(),
    }
}

fn snapshot() -> Snapshot {
    let shape = (6, 6, 6);
    let mut gas = Array3::zeros(shape);
    for (idx, v) in gas.iter_mut().enumerate() {
        *v = Complex64::new(idx as f64 * 0.017, -(idx as f64) * 0.003);
    }
    let dissolved = gas.mapv(|v: Complex64| v * Complex64::new(0.1, 0.2));
    let pair = DixonPair::new(gas, dissolved, meta()).unwrap();
    let maps = CompartmentMaps {
        gas: ScalarVolume::from_elem(shape, 1.25),
        membrane: ScalarVolume::from_elem(shape, 0.33),
        rbc: ScalarVolume::from_elem(shape, 0.07),
    };
    Snapshot {
        subject_id: "sub001".to_string(),
        pairs: vec![pair],
        proton: None,
        calibration_scan: None,
        calibration: CalibrationResult {
            rbc_m_ratio: 0.47,
            dissolved_phase: -1.234_567,
            noise_floor: 0.125,
            source: CalibrationSource::CalibrationScan,
            warnings: vec!["example caveat".to_string()],
        },
        maps: vec![maps],
        masks: Some(vec![MaskVolume::from_elem(shape, true)]),
    }
}

#[test]
fn snapshot_roundtrips_bit_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(snapshot_filename("sub001"));
    let original = snapshot();
    write_snapshot(&path, &original).unwrap();
    let loaded = read_snapshot(&path).unwrap();

    assert_eq!(loaded.subject_id, original.subject_id);
    assert_eq!(loaded.pairs[0].gas, original.pairs[0].gas);
    assert_eq!(loaded.pairs[0].dissolved, original.pairs[0].dissolved);
    assert_eq!(loaded.maps[0].gas, original.maps[0].gas);
    assert_eq!(loaded.maps[0].membrane, original.maps[0].membrane);
    assert_eq!(loaded.maps[0].rbc, original.maps[0].rbc);
    assert_eq!(loaded.masks, original.masks);
    assert_eq!(loaded.calibration.rbc_m_ratio, original.calibration.rbc_m_ratio);
    assert_eq!(loaded.calibration.dissolved_phase, original.calibration.dissolved_phase);
    assert_eq!(loaded.calibration.warnings, original.calibration.warnings);
}

#[test]
fn find_snapshot_prefers_the_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(out_dir.join("sub001")).unwrap();
    std::fs::create_dir_all(&data_dir).unwrap();

    assert!(find_snapshot(&out_dir, &data_dir, "sub001").is_none());

    let in_data = data_dir.join(snapshot_filename("sub001"));
    write_snapshot(&in_data, &snapshot()).unwrap();
    assert_eq!(find_snapshot(&out_dir, &data_dir, "sub001").unwrap(), in_data);

    let in_out = out_dir.join("sub001").join(snapshot_filename("sub001"));
    write_snapshot(&in_out, &snapshot()).unwrap();
    assert_eq!(find_snapshot(&out_dir, &data_dir, "sub001").unwrap(), in_out);
}
