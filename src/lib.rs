use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use derive_more::Display;
use serde::{Deserialize, Serialize};

pub mod anomaly;
pub mod config;
pub mod db;
pub mod fetch;
pub mod formulae;
pub mod normals;
pub mod profile;
pub mod season;

pub use anomaly::*;
pub use config::*;
pub use normals::*;
pub use season::*;

/// One timestamped temperature reading (°C) for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub city: String,
    pub season: Season,
    pub temperature: f64,
}

impl Observation {
    /// Builds an observation with the season taken from the timestamp's month.
    pub fn new(timestamp: NaiveDateTime, city: impl Into<String>, temperature: f64) -> Observation {
        Observation {
            timestamp,
            city: city.into(),
            season: Season::of(&timestamp),
            temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum StatsError {
    #[display(fmt = "invalid parameter `{}`: {}", name, reason)]
    InvalidParameter { name: &'static str, reason: String },
}

impl std::error::Error for StatsError {}

pub(crate) fn temperatures<'a, I>(observations: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Observation>,
{
    observations.into_iter().map(|o| o.temperature).collect()
}

// Row indices per city, each list in chronological order. Rows with equal
// timestamps keep their input order.
pub fn by_city(observations: &[Observation]) -> BTreeMap<&str, Vec<usize>> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

    for (i, o) in observations.iter().enumerate() {
        groups.entry(o.city.as_str()).or_default().push(i);
    }

    for indices in groups.values_mut() {
        indices.sort_by_key(|&i| observations[i].timestamp);
    }

    groups
}
