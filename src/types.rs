use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One named neighborhood polygon, as loaded from the boundary GeoJSON.
/// Names are unique within the ungrouped feature set.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Group name -> member neighborhood names. BTreeMap so resolution
/// order (and therefore output order) is deterministic.
pub type GroupMap = BTreeMap<String, Vec<String>>;

/// Age and income tabulations for one neighborhood (or one merged
/// group). Bucket labels are the keys; absent buckets count as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicRecord {
    #[serde(default)]
    pub age: HashMap<String, u32>,
    #[serde(default)]
    pub income: HashMap<String, u32>,
}

impl DemographicRecord {
    pub fn age_total(&self) -> u64 {
        self.age.values().map(|&v| u64::from(v)).sum()
    }

    pub fn income_total(&self) -> u64 {
        self.income.values().map(|&v| u64::from(v)).sum()
    }
}

/// Everything the renderer and server need, fully materialized up
/// front. Immutable after loading.
#[derive(Debug, Clone)]
pub struct MapData {
    pub neighborhoods: Vec<Neighborhood>,
    pub groups: GroupMap,
    pub demographics: HashMap<String, DemographicRecord>,
}
