/// Parameter alias table.
///
/// The EcoDetection sensor export and the lab sampling export name the same
/// quantity differently ("Nephelo Turbidity" vs "Turbidity", "Nitrate
/// Concentration" vs "Nitrate - Nitrogen"). This table maps both naming
/// schemes onto `Parameter`. Rows whose name has no entry are not tracked.
use crate::model::{Parameter, Source};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Alias table
// ---------------------------------------------------------------------------

pub struct ParameterAliases {
    pub parameter: Parameter,
    pub sensor: &'static [&'static str],
    pub lab: &'static [&'static str],
    /// Source units accepted as already canonical (besides `ppb`).
    pub units: &'static [&'static str],
}

pub static PARAMETER_ALIASES: &[ParameterAliases] = &[
    ParameterAliases {
        parameter: Parameter::Turbidity,
        sensor: &["Nephelo Turbidity"],
        lab: &["Turbidity"],
        units: &["NTU"],
    },
    ParameterAliases {
        parameter: Parameter::Nitrate,
        sensor: &["Nitrate Concentration"],
        lab: &["Nitrate - Nitrogen"],
        units: &["mg/L"],
    },
    ParameterAliases {
        parameter: Parameter::Nitrite,
        sensor: &["Nitrite Concentration"],
        lab: &["Nitrite - Nitrogen"],
        units: &["mg/L"],
    },
    ParameterAliases {
        parameter: Parameter::Phosphate,
        sensor: &["Phosphate Concentration"],
        lab: &["Phosphate"],
        units: &["mg/L"],
    },
    ParameterAliases {
        parameter: Parameter::Conductivity,
        sensor: &["Conductivity"],
        lab: &["Electrical Conductivity"],
        units: &["uS/cm", "µS/cm"],
    },
    ParameterAliases {
        parameter: Parameter::Chloride,
        sensor: &["Chloride Concentration"],
        lab: &[],
        units: &["mg/L"],
    },
    ParameterAliases {
        parameter: Parameter::Fluoride,
        sensor: &["Fluoride Concentration"],
        lab: &[],
        units: &["mg/L"],
    },
    ParameterAliases {
        parameter: Parameter::Sulphate,
        sensor: &["Sulphate Concentration"],
        lab: &[],
        units: &["mg/L"],
    },
    ParameterAliases {
        parameter: Parameter::Oxygen,
        sensor: &["Oxygen"],
        lab: &[],
        units: &["mg/L", "%"],
    },
    ParameterAliases {
        parameter: Parameter::Ph,
        sensor: &["pH"],
        lab: &[],
        units: &["pH", ""],
    },
    ParameterAliases {
        parameter: Parameter::Temperature,
        sensor: &["Temperature"],
        lab: &[],
        units: &["degC", "°C", "C"],
    },
    ParameterAliases {
        parameter: Parameter::EnclosureTemperature,
        sensor: &["Enclosure Temperature"],
        lab: &[],
        units: &["degC", "°C", "C"],
    },
];

/// Looks up the canonical parameter for a source-specific measurement name.
///
/// Matching ignores case and surrounding whitespace. `None` means the
/// measurement is not tracked and the row should be dropped.
pub fn resolve_parameter_alias(source: Source, raw_name: &str) -> Option<Parameter> {
    let needle = raw_name.trim();
    PARAMETER_ALIASES
        .iter()
        .find(|entry| {
            let names = match source {
                Source::Sensor => entry.sensor,
                Source::Lab => entry.lab,
            };
            names.iter().any(|name| name.eq_ignore_ascii_case(needle))
        })
        .map(|entry| entry.parameter)
}

/// Units accepted as canonical for `parameter`. Rainfall and streamflow
/// arrive in their canonical unit without a unit column.
pub fn accepted_units(parameter: Parameter) -> &'static [&'static str] {
    PARAMETER_ALIASES
        .iter()
        .find(|entry| entry.parameter == parameter)
        .map(|entry| entry.units)
        .unwrap_or(&[])
}

// ---------------------------------------------------------------------------
// Parameter groups
// ---------------------------------------------------------------------------

/// Chart groups for a site's sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ParameterGroup {
    InorganicChemicals,
    Nutrients,
    PhysicalProperties,
    Environmental,
    Hydrology,
}

pub fn group_of(parameter: Parameter) -> ParameterGroup {
    match parameter {
        Parameter::Chloride | Parameter::Fluoride | Parameter::Sulphate => {
            ParameterGroup::InorganicChemicals
        }
        Parameter::Nitrate | Parameter::Nitrite | Parameter::Phosphate => ParameterGroup::Nutrients,
        Parameter::Conductivity | Parameter::Turbidity | Parameter::Oxygen | Parameter::Ph => {
            ParameterGroup::PhysicalProperties
        }
        Parameter::Temperature | Parameter::EnclosureTemperature => ParameterGroup::Environmental,
        Parameter::Rainfall | Parameter::Streamflow => ParameterGroup::Hydrology,
    }
}
