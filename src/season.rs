use chrono::{Datelike, Local, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Meteorological season, fixed by calendar month.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

// indexed by month - 1
const MONTH_TO_SEASON: [Season; 12] = [
    Season::Winter, // jan
    Season::Winter,
    Season::Spring,
    Season::Spring,
    Season::Spring,
    Season::Summer,
    Season::Summer,
    Season::Summer,
    Season::Autumn,
    Season::Autumn,
    Season::Autumn,
    Season::Winter, // dec
];

impl Season {
    pub fn from_month(month: u32) -> Option<Season> {
        let idx = month.checked_sub(1)? as usize;
        MONTH_TO_SEASON.get(idx).copied()
    }

    pub fn of<D: Datelike>(date: &D) -> Season {
        // month() is always 1..=12
        MONTH_TO_SEASON[date.month0() as usize]
    }

    pub fn current() -> Season {
        Season::of(&Local::now())
    }

    pub fn current_in(tz: Tz) -> Season {
        Season::of(&Utc::now().with_timezone(&tz))
    }

    pub fn months(&self) -> [u32; 3] {
        match self {
            Season::Winter => [12, 1, 2],
            Season::Spring => [3, 4, 5],
            Season::Summer => [6, 7, 8],
            Season::Autumn => [9, 10, 11],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn month_table() {
        let expected = [
            (1, Season::Winter),
            (2, Season::Winter),
            (3, Season::Spring),
            (5, Season::Spring),
            (6, Season::Summer),
            (8, Season::Summer),
            (9, Season::Autumn),
            (11, Season::Autumn),
            (12, Season::Winter),
        ];
        for (month, season) in expected {
            assert_eq!(Season::from_month(month), Some(season), "month {month}");
        }

        assert_eq!(Season::from_month(0), None);
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn months_round_trip_through_table() {
        for season in Season::iter() {
            for m in season.months() {
                assert_eq!(Season::from_month(m), Some(season));
            }
        }
    }

    #[test]
    fn season_of_date() {
        let d = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(Season::of(&d), Season::Winter);

        let d = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        assert_eq!(Season::of(&d), Season::Summer);
    }

    #[test]
    fn labels() {
        assert_eq!(Season::Autumn.to_string(), "autumn");
        assert_eq!(Season::from_str("winter").unwrap(), Season::Winter);
        assert_eq!(Season::from_str("Summer").unwrap(), Season::Summer);
        assert!(Season::from_str("fall").is_err());
        assert_eq!(serde_json::to_string(&Season::Spring).unwrap(), "\"spring\"");
    }

    #[test]
    fn current_is_consistent_with_table() {
        let now = Local::now();
        assert_eq!(Season::current(), Season::of(&now));
        assert_eq!(Season::current_in(Tz::UTC), Season::of(&Utc::now()));
    }
}
