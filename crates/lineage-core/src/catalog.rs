//! Reference catalogs: the N-CMAPSS turbofan feature set and the NAS
//! reference layers, dataset, and hardware.

use std::collections::BTreeMap;

use crate::types::{Category, DatasetSpec, FeatureSet, FeatureSpec, HardwareSpec, LayerSpec};

/// Name of the single feature carried by label-only (RUL) files.
pub const RUL_FEATURE: &str = "RUL_Value";

/// File type assigned to label-only files.
pub const RUL_FILE_TYPE: &str = "RUL";

const UNITS: &[(&str, &str)] = &[
    ("R", "Rankine temperature scale"),
    ("psia", "Pounds per square inch absolute"),
    ("rpm", "Revolutions per minute"),
    ("pps/psia", "Pounds per second per psi absolute"),
];

const INDEX_COLUMNS: &[&str] = &["engine", "cycle"];

const SETTING_COLUMNS: &[&str] = &["setting_1", "setting_2", "setting_3"];

const SENSOR_COLUMNS: &[(&str, Option<&str>)] = &[
    ("(Fan inlet temperature) (◦R)", Some("R")),
    ("(LPC outlet temperature) (◦R)", Some("R")),
    ("(HPC outlet temperature) (◦R)", Some("R")),
    ("(LPT outlet temperature) (◦R)", Some("R")),
    ("(Fan inlet Pressure) (psia)", Some("psia")),
    ("(bypass-duct pressure) (psia)", Some("psia")),
    ("(HPC outlet pressure) (psia)", Some("psia")),
    ("(Physical fan speed) (rpm)", Some("rpm")),
    ("(Physical core speed) (rpm)", Some("rpm")),
    ("(Engine pressure ratio(P50/P2)", None),
    ("(HPC outlet Static pressure) (psia)", Some("psia")),
    ("(Ratio of fuel flow to Ps30) (pps/psia)", Some("pps/psia")),
    ("(Corrected fan speed) (rpm)", Some("rpm")),
    ("(Corrected core speed) (rpm)", Some("rpm")),
    ("(Bypass Ratio) ", None),
    ("(Burner fuel-air ratio)", None),
    ("(Bleed Enthalpy)", None),
    ("(Required fan speed)", None),
    ("(Required fan conversion speed)", None),
    ("(High-pressure turbines Cool air flow)", None),
    ("(Low-pressure turbines Cool air flow)", None),
];

/// Unit descriptions shared by every C-MAPSS file.
pub fn cmapss_units() -> BTreeMap<String, String> {
    UNITS
        .iter()
        .map(|(u, d)| (u.to_string(), d.to_string()))
        .collect()
}

/// Full column set of a C-MAPSS train/test file: index, operational settings, sensors.
pub fn cmapss_feature_set() -> FeatureSet {
    let features = INDEX_COLUMNS
        .iter()
        .map(|n| FeatureSpec::new(n, Category::Index, None))
        .chain(
            SETTING_COLUMNS
                .iter()
                .map(|n| FeatureSpec::new(n, Category::Setting, None)),
        )
        .chain(
            SENSOR_COLUMNS
                .iter()
                .map(|(n, u)| FeatureSpec::new(n, Category::Sensor, *u)),
        )
        .collect();

    FeatureSet {
        features,
        units: cmapss_units(),
    }
}

/// Layers every search-space entry is built from.
pub fn reference_layers() -> Vec<LayerSpec> {
    vec![
        LayerSpec {
            name: "Conv3x3".to_string(),
            layer_type: "Conv".to_string(),
            kernel: Some(3),
            params: Some(1792),
        },
        LayerSpec {
            name: "ReLU".to_string(),
            layer_type: "Activation".to_string(),
            kernel: None,
            params: None,
        },
        LayerSpec {
            name: "MaxPool2x2".to_string(),
            layer_type: "Pooling".to_string(),
            kernel: Some(2),
            params: None,
        },
    ]
}

pub fn reference_dataset() -> DatasetSpec {
    DatasetSpec {
        name: "CIFAR-10".to_string(),
        samples: 60_000,
        classes: 10,
    }
}

pub fn reference_hardware() -> HardwareSpec {
    HardwareSpec {
        name: "Jetson-Nano".to_string(),
        max_memory_mb: 4096,
        max_latency_ms: 20.0,
    }
}
