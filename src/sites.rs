/// Site registry for the catchment reconciliation service.
///
/// Defines the monitoring sites tracked by this service, the external
/// station codes feeding each one (rainfall, streamflow), the names each
/// data source uses for it, and the alarm configuration that applies to it.
/// This is the single source of truth for site lookups; no other module
/// should compare site name strings directly.
///
/// Also holds the catalog of every monitoring station in the catchment,
/// which map consumers filter by station type.
use crate::model::{Site, Source};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Site metadata
// ---------------------------------------------------------------------------

/// The alarm a site is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SiteAlarmKind {
    /// Sensor readings disagree with certified lab samples.
    EcoLabDifference,
    /// Water quality upstream of the Woodend recycled water plant.
    PreTreatmentQuality,
    /// Water quality downstream of the Woodend recycled water plant.
    PostTreatmentQuality,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SiteAlarm {
    pub kind: SiteAlarmKind,
    /// Default sensitivity on a 0–100 scale. Used as the mismatch
    /// percentage ceiling unless a session overrides it.
    pub default_sensitivity: f64,
}

/// Metadata for a single monitoring site.
pub struct SiteInfo {
    pub site: Site,
    /// Location names used by the EcoDetection sensor export.
    pub sensor_aliases: &'static [&'static str],
    /// `Subsite_Code` values used by the lab sampling export.
    pub lab_aliases: &'static [&'static str],
    /// BOM rainfall station number, where one is close enough to be useful.
    pub rainfall_station: Option<u32>,
    /// DEECA streamflow station number.
    pub streamflow_station: u32,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    pub alarm: SiteAlarm,
}

pub const DEFAULT_SENSITIVITY: f64 = 50.0;

pub static SITE_REGISTRY: &[SiteInfo] = &[
    SiteInfo {
        site: Site::KangarooCreek,
        sensor_aliases: &["Kangaroo Creek"],
        lab_aliases: &["SITE17", "Kangaroo Creek"],
        rainfall_station: None, // no BOM gauge near enough
        streamflow_station: 406281,
        latitude: -37.23092,
        longitude: 144.34361,
        alarm: SiteAlarm {
            kind: SiteAlarmKind::EcoLabDifference,
            default_sensitivity: DEFAULT_SENSITIVITY,
        },
    },
    SiteInfo {
        site: Site::LittleColibanRiver,
        sensor_aliases: &["Little Coliban River"],
        lab_aliases: &["SITE2", "Little Coliban River"],
        rainfall_station: Some(88037),
        streamflow_station: 406280,
        latitude: -37.28939,
        longitude: 144.43381,
        alarm: SiteAlarm {
            kind: SiteAlarmKind::EcoLabDifference,
            default_sensitivity: DEFAULT_SENSITIVITY,
        },
    },
    SiteInfo {
        site: Site::FiveMileCreekSite1,
        sensor_aliases: &[
            "Five Mile Creek - Site 1",
            "Five Mile Creek - Woodend RWP Site 1",
        ],
        lab_aliases: &[],
        rainfall_station: Some(88061),
        streamflow_station: 406266,
        latitude: -37.33819,
        longitude: 144.51067,
        alarm: SiteAlarm {
            kind: SiteAlarmKind::PreTreatmentQuality,
            default_sensitivity: DEFAULT_SENSITIVITY,
        },
    },
    SiteInfo {
        site: Site::FiveMileCreekSite2,
        sensor_aliases: &[
            "Five Mile Creek - Site 2",
            "Five Mile Creek - Woodend RWP Site 2",
        ],
        lab_aliases: &[],
        rainfall_station: Some(88061), // shared with Site 1
        streamflow_station: 406266,    // shared with Site 1
        latitude: -37.33288,
        longitude: 144.51034,
        alarm: SiteAlarm {
            kind: SiteAlarmKind::PostTreatmentQuality,
            default_sensitivity: DEFAULT_SENSITIVITY,
        },
    },
];

/// Looks up the registry entry for a site.
///
/// The registry is ordered like the `Site` enum, so this is a direct index.
pub fn site_info(site: Site) -> &'static SiteInfo {
    &SITE_REGISTRY[site as usize]
}

/// Resolves a source-specific location name to a site.
///
/// Matching ignores case and surrounding whitespace. Returns `None` for
/// locations this service does not track.
pub fn resolve_site(source: Source, raw_location: &str) -> Option<Site> {
    let needle = raw_location.trim();
    SITE_REGISTRY
        .iter()
        .find(|info| {
            let aliases = match source {
                Source::Sensor => info.sensor_aliases,
                Source::Lab => info.lab_aliases,
            };
            aliases.iter().any(|alias| alias.eq_ignore_ascii_case(needle))
        })
        .map(|info| info.site)
}

/// Resolves a user-supplied site name (CLI, config) against every alias.
pub fn find_site(name: &str) -> Option<Site> {
    resolve_site(Source::Sensor, name).or_else(|| resolve_site(Source::Lab, name))
}

/// Sites whose rainfall data comes from `station`.
pub fn sites_for_rainfall_station(station: u32) -> Vec<Site> {
    SITE_REGISTRY
        .iter()
        .filter(|info| info.rainfall_station == Some(station))
        .map(|info| info.site)
        .collect()
}

/// Sites whose streamflow data comes from `station`.
pub fn sites_for_streamflow_station(station: u32) -> Vec<Site> {
    SITE_REGISTRY
        .iter()
        .filter(|info| info.streamflow_station == station)
        .map(|info| info.site)
        .collect()
}

// ---------------------------------------------------------------------------
// Station catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StationType {
    WaterQualitySensor,
    WaterQualityLab,
    Rainfall,
    Temperature,
    Streamflow,
}

/// A physical monitoring station, as shown on the catchment map.
#[derive(Debug, Serialize)]
pub struct Station {
    pub owner: &'static str,
    pub reference: &'static str,
    pub name: &'static str,
    pub station_type: StationType,
    pub latitude: f64,
    pub longitude: f64,
}

pub static STATION_CATALOG: &[Station] = &[
    Station { owner: "Coliban Water", reference: "cw_a", name: "Kangaroo Creek", station_type: StationType::WaterQualitySensor, latitude: -37.23092, longitude: 144.34361 },
    Station { owner: "Coliban Water", reference: "cw_b", name: "Little Coliban River", station_type: StationType::WaterQualitySensor, latitude: -37.28939, longitude: 144.43381 },
    Station { owner: "Greater Western Water", reference: "gww_a", name: "Five Mile Creek - Site 1", station_type: StationType::WaterQualitySensor, latitude: -37.33819, longitude: 144.51067 },
    Station { owner: "Greater Western Water", reference: "gww_b", name: "Five Mile Creek - Site 2", station_type: StationType::WaterQualitySensor, latitude: -37.33288, longitude: 144.51034 },
    Station { owner: "Bureau of Meteorology", reference: "88037", name: "Lauriston Reservoir", station_type: StationType::Rainfall, latitude: -37.2535, longitude: 144.3825 },
    Station { owner: "Bureau of Meteorology", reference: "88061", name: "Woodend", station_type: StationType::Rainfall, latitude: -37.3578, longitude: 144.539 },
    Station { owner: "Bureau of Meteorology", reference: "88051", name: "Redesdale", station_type: StationType::Temperature, latitude: -37.0194, longitude: 144.5203 },
    Station { owner: "DEECA", reference: "406281", name: "Kangaroo Creek", station_type: StationType::Streamflow, latitude: -37.23897, longitude: 144.3392 },
    Station { owner: "DEECA", reference: "406280", name: "Little Coliban River", station_type: StationType::Streamflow, latitude: -37.28958, longitude: 144.4339 },
    Station { owner: "DEECA", reference: "406266", name: "Five Mile Creek", station_type: StationType::Streamflow, latitude: -37.33775, longitude: 144.5115 },
    Station { owner: "Coliban Water", reference: "Site2", name: "Little Coliban River", station_type: StationType::WaterQualityLab, latitude: -37.2893731, longitude: 144.4338769 },
    Station { owner: "Coliban Water", reference: "Site17", name: "Kangaroo Creek", station_type: StationType::WaterQualityLab, latitude: -37.2391, longitude: 144.3397 },
];

/// Catalog entries of one station type, in catalog order.
pub fn stations_of_type(station_type: StationType) -> Vec<&'static Station> {
    STATION_CATALOG
        .iter()
        .filter(|s| s.station_type == station_type)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
