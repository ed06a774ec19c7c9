use std::path::PathBuf;

use crate::acquisition::{Acquisition, DixonPair};
use crate::biomarkers::Biomarkers;
use crate::calibration::CalibrationResult;
use crate::config::Config;
use crate::corrections::CorrectedMaps;
use crate::decompose::CompartmentMaps;
use crate::pipeline::RunState;
use crate::registration::RegistrationCapability;
use crate::schema::v1::GxReportV1;
use crate::segmentation::SegmentationCapability;
use crate::volume::{ComplexVolume, MaskVolume, ScalarVolume};

#[derive(Debug)]
pub struct OutputPaths {
    /// Everything is written here first.
    pub staging_dir: PathBuf,
    /// Renamed from staging only when the run reaches `Reported`.
    pub final_dir: PathBuf,
}

/// One subject run: the only cross-stage state in the pipeline.
///
/// Stages fill the `Option` slots in order; numerical components stay
/// stateless transforms over explicit inputs.
pub struct Ctx {
    pub config: Config,
    pub state: RunState,
    /// True when this run resumed from a snapshot artifact.
    pub resumed: bool,
    /// True when the snapshot supplied masks that were kept.
    pub masks_from_snapshot: bool,

    /// Raw bundle as loaded; consumed when acquisitions materialize.
    pub input: Option<crate::io::bundle::SubjectInput>,
    pub pairs: Vec<DixonPair>,
    pub proton: Option<ComplexVolume>,
    pub calibration_scan: Option<Acquisition>,

    pub calibration: Option<CalibrationResult>,
    pub maps: Vec<CompartmentMaps>,
    pub corrected: Vec<CorrectedMaps>,
    pub masks: Vec<MaskVolume>,

    /// Single-scan result slots; in the dual case these hold the merged
    /// data on scan 1's grid.
    pub merged_mask: Option<MaskVolume>,
    pub merged_maps: Option<CompartmentMaps>,
    pub merged_corrected: Option<CorrectedMaps>,
    pub proton_reg: Option<ScalarVolume>,

    pub biomarkers: Option<Biomarkers>,
    pub report: Option<GxReportV1>,
    pub warnings: Vec<String>,

    pub segmenter: Option<Box<dyn SegmentationCapability>>,
    pub registrar: Option<Box<dyn RegistrationCapability>>,

    pub output: OutputPaths,
}

impl std::fmt::Debug for Ctx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ctx")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("resumed", &self.resumed)
            .field("masks_from_snapshot", &self.masks_from_snapshot)
            .field("input", &self.input)
            .field("pairs", &self.pairs)
            .field("proton", &self.proton)
            .field("calibration_scan", &self.calibration_scan)
            .field("calibration", &self.calibration)
            .field("maps", &self.maps)
            .field("corrected", &self.corrected)
            .field("masks", &self.masks)
            .field("merged_mask", &self.merged_mask)
            .field("merged_maps", &self.merged_maps)
            .field("merged_corrected", &self.merged_corrected)
            .field("proton_reg", &self.proton_reg)
            .field("biomarkers", &self.biomarkers)
            .field("report", &self.report)
            .field("warnings", &self.warnings)
            .field("segmenter", &self.segmenter.is_some())
            .field("registrar", &self.registrar.is_some())
            .field("output", &self.output)
            .finish()
    }
}

impl Ctx {
    pub fn new(config: Config) -> Self {
        let staging_dir = config.out_dir.join(format!(".staging-{}", config.subject_id));
        let final_dir = config.out_dir.join(&config.subject_id);
        Self {
            config,
            state: RunState::Loaded,
            resumed: false,
            masks_from_snapshot: false,
            input: None,
            pairs: Vec::new(),
            proton: None,
            calibration_scan: None,
            calibration: None,
            maps: Vec::new(),
            corrected: Vec::new(),
            masks: Vec::new(),
            merged_mask: None,
            merged_maps: None,
            merged_corrected: None,
            proton_reg: None,
            biomarkers: None,
            report: None,
            warnings: Vec::new(),
            segmenter: None,
            registrar: None,
            output: OutputPaths { staging_dir, final_dir },
        }
    }

    pub fn dual_acquisition(&self) -> bool {
        self.pairs.len() == 2
    }
}
