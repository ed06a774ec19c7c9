use xe_gasmap::biomarkers::quantify::quantify;
use xe_gasmap::config::ReferenceKey;
use xe_gasmap::corrections::CorrectedMaps;
use xe_gasmap::decompose::CompartmentMaps;
use xe_gasmap::error::PipelineError;
use xe_gasmap::reference::ReferenceCohort;
use xe_gasmap::volume::{MaskVolume, ScalarVolume};

const SHAPE: (usize, usize, usize) = (8, 8, 8);
const FOV: f64 = 400.0;

fn reference() -> ReferenceCohort {
    ReferenceCohort::for_key(ReferenceKey::Reference218Ppm)
}

fn uniform_maps(gas: f64, membrane: f64, rbc: f64) -> CompartmentMaps {
    CompartmentMaps {
        gas: ScalarVolume::from_elem(SHAPE, gas),
        membrane: ScalarVolume::from_elem(SHAPE, membrane),
        rbc: ScalarVolume::from_elem(SHAPE, rbc),
    }
}

fn uniform_corrected(rbc2gas: f64, membrane2gas: f64) -> CorrectedMaps {
    CorrectedMaps {
        rbc2gas: ScalarVolume::from_elem(SHAPE, rbc2gas),
        membrane2gas: ScalarVolume::from_elem(SHAPE, membrane2gas),
        rbc_m_ratio: 0.4,
        rbc_hb_factor: 1.0,
        membrane_hb_factor: 1.0,
    }
}

#[test]
fn full_mask_yields_finite_nonnegative_biomarkers() {
    let maps = uniform_maps(10.0, 2.0, 0.8);
    let corrected = uniform_corrected(0.004, 0.008);
    let mask = MaskVolume::from_elem(SHAPE, true);

    let b = quantify(&maps, &corrected, &mask, &reference(), FOV).unwrap();
    for v in [
        b.vent.defect_pct,
        b.vent.low_pct,
        b.vent.high_pct,
        b.rbc.defect_pct,
        b.rbc.mean,
        b.membrane.mean,
        b.inflation,
        b.alveolar_volume,
        b.kco_est,
        b.dlco_est,
    ] {
        assert!(v.is_finite());
        assert!(v >= 0.0);
    }
    assert_eq!(b.reference_key, ReferenceKey::Reference218Ppm);
}

#[test]
fn uniform_ratios_are_recovered_exactly() {
    let maps = uniform_maps(10.0, 2.0, 0.8);
    let corrected = uniform_corrected(0.004, 0.008);
    let mask = MaskVolume::from_elem(SHAPE, true);

    let b = quantify(&maps, &corrected, &mask, &reference(), FOV).unwrap();
    assert!((b.rbc.mean - 0.004).abs() < 1e-12);
    assert!((b.rbc.median - 0.004).abs() < 1e-12);
    assert!(b.rbc.stddev.abs() < 1e-12);
    assert!((b.membrane.mean - 0.008).abs() < 1e-12);
    // uniform gas normalizes to 1.0 everywhere
    assert!((b.vent.mean - 1.0).abs() < 1e-12);
    assert_eq!(b.vent.defect_pct, 0.0);
}

#[test]
fn empty_mask_is_a_quantification_error_not_zeros() {
    let maps = uniform_maps(10.0, 2.0, 0.8);
    let corrected = uniform_corrected(0.004, 0.008);
    let mask = MaskVolume::from_elem(SHAPE, false);

    let err = quantify(&maps, &corrected, &mask, &reference(), FOV).unwrap_err();
    assert!(matches!(err, PipelineError::Quantification(_)));
}

#[test]
fn mask_grid_mismatch_is_a_quantification_error() {
    let maps = uniform_maps(10.0, 2.0, 0.8);
    let corrected = uniform_corrected(0.004, 0.008);
    let mask = MaskVolume::from_elem((4, 4, 4), true);

    let err = quantify(&maps, &corrected, &mask, &reference(), FOV).unwrap_err();
    assert!(matches!(err, PipelineError::Quantification(_)));
}

#[test]
fn defect_region_shows_up_in_vent_defect_pct() {
    let mut maps = uniform_maps(10.0, 2.0, 0.8);
    // one 4x4x4 corner of the lung has no gas signal
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                maps.gas[(i, j, k)] = 0.0;
            }
        }
    }
    let corrected = uniform_corrected(0.004, 0.008);
    let mask = MaskVolume::from_elem(SHAPE, true);

    let b = quantify(&maps, &corrected, &mask, &reference(), FOV).unwrap();
    let expected = 100.0 * 64.0 / 512.0;
    assert!((b.vent.defect_pct - expected).abs() < 1e-9);
    // ventilated volume shrinks accordingly
    assert!(b.alveolar_volume < b.inflation * 1.43);
}

#[test]
fn statistics_ignore_voxels_outside_the_mask() {
    let mut corrected = uniform_corrected(0.004, 0.008);
    let maps = uniform_maps(10.0, 2.0, 0.8);
    let mut mask = MaskVolume::from_elem(SHAPE, true);
    // poison an excluded voxel; results must not move
    mask[(0, 0, 0)] = false;
    corrected.rbc2gas[(0, 0, 0)] = 1e9;

    let b = quantify(&maps, &corrected, &mask, &reference(), FOV).unwrap();
    assert!((b.rbc.mean - 0.004).abs() < 1e-12);
}
