use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{Observation, RollingBand, Season};

pub use crate::by_city;

#[derive(Debug, Deserialize)]
struct CsvRow {
    city: String,

    #[serde(deserialize_with = "deserialize_timestamp")]
    timestamp: NaiveDateTime,

    temperature: f64,

    // derived from the month when the column is absent or blank
    #[serde(default)]
    season: Option<String>,
}

impl CsvRow {
    fn into_observation(self) -> Result<Observation> {
        if self.city.trim().is_empty() {
            bail!("city is empty");
        }
        if !self.temperature.is_finite() {
            bail!("temperature {} is not a finite number", self.temperature);
        }

        let from_month = Season::of(&self.timestamp);

        let season = match self.season.as_deref().map(str::trim) {
            None | Some("") => from_month,
            Some(label) => {
                let s = Season::from_str(label).map_err(|_| anyhow!("unknown season '{label}'"))?;
                if s != from_month {
                    warn!(
                        "{} at {} is labelled {s} but falls in {from_month}",
                        self.city, self.timestamp
                    );
                }
                s
            }
        };

        Ok(Observation {
            timestamp: self.timestamp,
            city: self.city.trim().to_string(),
            season,
            temperature: self.temperature,
        })
    }
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        // keep the wall-clock date, that's what picks the season
        return Ok(dt.naive_local());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("unrecognized timestamp '{s}'"))?;

    date.and_hms_opt(0, 0, 0)
        .ok_or(anyhow!("failed to build midnight for {date}"))
}

fn deserialize_timestamp<'de, D>(des: D) -> Result<NaiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(des)?;
    parse_timestamp(&s).map_err(serde::de::Error::custom)
}

/// Reads `city,timestamp,temperature[,season]` rows. Malformed rows are
/// rejected here so the statistics never see them.
pub fn load_csv<R: Read>(reader: R) -> Result<Vec<Observation>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut observations = vec![];

    for (i, entry_result) in rdr.deserialize().enumerate() {
        let line = i + 2; // header is line 1
        let entry: CsvRow = entry_result.with_context(|| format!("Failed to read CSV line {line}"))?;
        let ob = entry
            .into_observation()
            .with_context(|| format!("Invalid observation on CSV line {line}"))?;
        observations.push(ob);
    }

    info!(
        "loaded {} observations for {} cities",
        observations.len(),
        cities(&observations).len()
    );

    Ok(observations)
}

pub fn load_csv_file<P: AsRef<Path>>(path: P) -> Result<Vec<Observation>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    load_csv(file)
}

/// Unique cities in order of first appearance.
pub fn cities(observations: &[Observation]) -> Vec<&str> {
    let mut seen = HashSet::new();
    observations
        .iter()
        .map(|o| o.city.as_str())
        .filter(|c| seen.insert(*c))
        .collect()
}

/// An observation alongside its rolling band, flattened for export.
#[derive(Debug, Serialize)]
pub struct AnnotatedObservation<'a> {
    #[serde(flatten)]
    pub observation: &'a Observation,
    #[serde(flatten)]
    pub band: &'a RollingBand,
}

pub fn annotate<'a>(observations: &'a [Observation], bands: &'a [RollingBand]) -> Vec<AnnotatedObservation<'a>> {
    observations
        .iter()
        .zip(bands)
        .map(|(observation, band)| AnnotatedObservation { observation, band })
        .collect()
}

pub fn export_json<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    serde_json::ser::to_writer(writer, rows)?;
    Ok(())
}
