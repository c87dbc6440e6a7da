//! Fixed enumerations behind the map controls and the query string.
//!
//! Every control value is validated against one of these sets before it can
//! reach a query. Invalid values are warned about and ignored; the previous
//! valid value stays in effect.

use serde::{Deserialize, Serialize};

use crate::console_warn;
use crate::error::{LodesError, Result};

/// A value drawn from a closed set of strings.
pub trait Parameter: Sized + Copy + 'static {
    /// Name used in warnings.
    const NAME: &'static str;

    fn all() -> &'static [Self];

    fn as_str(&self) -> &'static str;

    fn allowed() -> String {
        Self::all()
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn parse(candidate: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == candidate)
            .ok_or_else(|| LodesError::InvalidParameter {
                name: Self::NAME,
                value: candidate.to_string(),
                allowed: Self::allowed(),
            })
    }
}

/// Census GEOIDs are 5 (county) to 12 (block group) digits. Empty means "no selection".
pub fn valid_id(candidate: &str) -> bool {
    let well_formed = (5..=12).contains(&candidate.len())
        && candidate.bytes().all(|b| b.is_ascii_digit());
    if candidate.is_empty() || well_formed {
        return true;
    }
    console_warn!("Invalid ID input {}. Please enter a valid Census GEOID.", candidate);
    false
}

/// Which end of the commute the clicked unit represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Home,
    Work,
}

impl Origin {
    /// Column holding the clicked unit's GEOID.
    pub fn source_column(self) -> &'static str {
        match self {
            Origin::Work => "w_geo",
            Origin::Home => "h_geo",
        }
    }

    /// Column holding the GEOIDs that get painted.
    pub fn destination_column(self) -> &'static str {
        match self {
            Origin::Work => "h_geo",
            Origin::Home => "w_geo",
        }
    }

    /// Zoom levels at which the legend and fill are refreshed.
    pub fn zoom_thresholds(self) -> [f64; 2] {
        match self {
            Origin::Home => [6.0, 8.0],
            Origin::Work => [6.0, 8.0],
        }
    }
}

impl Parameter for Origin {
    const NAME: &'static str = "mode";

    fn all() -> &'static [Self] {
        &[Origin::Home, Origin::Work]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Origin::Home => "home",
            Origin::Work => "work",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobSegment {
    S000,
    SA01,
    SA02,
    SA03,
    SE01,
    SE02,
    SE03,
    SI01,
    SI02,
    SI03,
}

impl JobSegment {
    /// Column name in the LODES file, identical to the segment code.
    pub fn column(self) -> &'static str {
        self.as_str()
    }

    pub fn label(self) -> &'static str {
        match self {
            JobSegment::S000 => "Total jobs",
            JobSegment::SA01 => "Jobs for workers age 29 or younger",
            JobSegment::SA02 => "Jobs for workers age 30 to 54",
            JobSegment::SA03 => "Jobs for workers age 55 or older",
            JobSegment::SE01 => "Jobs with earnings $1250/month or less",
            JobSegment::SE02 => "Jobs with earnings $1251/month to $3333/month",
            JobSegment::SE03 => "Jobs with earnings greater than $3333/month",
            JobSegment::SI01 => "Jobs in Goods Producing industry",
            JobSegment::SI02 => "Jobs in Trade, Transportation, and Utilities industry",
            JobSegment::SI03 => "Jobs in All Other Services industry",
        }
    }
}

impl Parameter for JobSegment {
    const NAME: &'static str = "job segment";

    fn all() -> &'static [Self] {
        &[
            JobSegment::S000,
            JobSegment::SA01,
            JobSegment::SA02,
            JobSegment::SA03,
            JobSegment::SE01,
            JobSegment::SE02,
            JobSegment::SE03,
            JobSegment::SI01,
            JobSegment::SI02,
            JobSegment::SI03,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            JobSegment::S000 => "S000",
            JobSegment::SA01 => "SA01",
            JobSegment::SA02 => "SA02",
            JobSegment::SA03 => "SA03",
            JobSegment::SE01 => "SE01",
            JobSegment::SE02 => "SE02",
            JobSegment::SE03 => "SE03",
            JobSegment::SI01 => "SI01",
            JobSegment::SI02 => "SI02",
            JobSegment::SI03 => "SI03",
        }
    }
}

/// Published LODES data years.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Year {
    #[serde(rename = "2022")]
    Y2022,
}

impl Parameter for Year {
    const NAME: &'static str = "data year";

    fn all() -> &'static [Self] {
        &[Year::Y2022]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Year::Y2022 => "2022",
        }
    }
}

/// Census geography levels, finest to coarsest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Geography {
    BlockGroup,
    Tract,
    Supertract,
    County,
}

impl Geography {
    /// GEOID length at this level; coarser IDs are prefixes of finer ones.
    pub fn id_len(self) -> usize {
        match self {
            Geography::BlockGroup => 12,
            Geography::Tract => 11,
            Geography::Supertract => 7,
            Geography::County => 5,
        }
    }

    /// Human-readable name, e.g. "Block Group".
    pub fn title(self) -> String {
        title_case(self.as_str())
    }
}

impl Parameter for Geography {
    const NAME: &'static str = "geography";

    fn all() -> &'static [Self] {
        &[
            Geography::BlockGroup,
            Geography::Tract,
            Geography::Supertract,
            Geography::County,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Geography::BlockGroup => "block_group",
            Geography::Tract => "tract",
            Geography::Supertract => "supertract",
            Geography::County => "county",
        }
    }
}

/// Cuts a block-group GEOID down to the containing unit at `geography`.
pub fn truncate_id(geography: Geography, id: &str) -> &str {
    id.get(..geography.id_len()).unwrap_or(id)
}

/// "block_group" -> "Block Group"
pub fn title_case(value: &str) -> String {
    value
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_values_and_rejects_others() {
        assert_eq!(Origin::parse("work").unwrap(), Origin::Work);
        assert_eq!(JobSegment::parse("SE02").unwrap(), JobSegment::SE02);
        assert_eq!(Geography::parse("block_group").unwrap(), Geography::BlockGroup);
        assert_eq!(Year::parse("2022").unwrap(), Year::Y2022);

        let err = Geography::parse("zcta").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid geography zcta. Must be one of: block_group, tract, supertract, county."
        );
        assert!(Year::parse("2019").is_err());
        assert!(JobSegment::parse("s000").is_err());
    }

    #[test]
    fn parse_rejects_outsiders() {
        assert!(Origin::parse("home").is_ok());
        assert!(Origin::parse("commute").is_err());
        assert!(Year::parse("2031").is_err());
        assert!(Geography::parse("supertract").is_ok());
    }

    #[test]
    fn id_validation_bounds() {
        assert!(valid_id(""));
        assert!(valid_id("36061"));
        assert!(valid_id("360610001001"));
        assert!(!valid_id("3606"));
        assert!(!valid_id("3606100010011"));
        assert!(!valid_id("36061a"));
    }

    #[test]
    fn truncation_by_geography() {
        let id = "360610001001";
        assert_eq!(truncate_id(Geography::BlockGroup, id), id);
        assert_eq!(truncate_id(Geography::Tract, id), "36061000100");
        assert_eq!(truncate_id(Geography::Supertract, id), "3606100");
        assert_eq!(truncate_id(Geography::County, id), "36061");
        // Shorter than the level keeps the input.
        assert_eq!(truncate_id(Geography::Tract, "36061"), "36061");
    }

    #[test]
    fn origin_columns_are_mirrored() {
        assert_eq!(Origin::Work.source_column(), "w_geo");
        assert_eq!(Origin::Work.destination_column(), "h_geo");
        assert_eq!(Origin::Home.source_column(), "h_geo");
        assert_eq!(Origin::Home.destination_column(), "w_geo");
    }

    #[test]
    fn titles() {
        assert_eq!(Geography::BlockGroup.title(), "Block Group");
        assert_eq!(title_case("tract"), "Tract");
        assert_eq!(title_case("HOME"), "Home");
    }

    #[cfg(not(target_arch = "wasm32"))]
    mod properties {
        use super::super::*;
        use proptest::prelude::*;

        fn geography() -> impl Strategy<Value = Geography> {
            prop::sample::select(Geography::all().to_vec())
        }

        proptest! {
            #[test]
            fn truncation_is_idempotent(g in geography(), id in "[0-9]{12}") {
                let once = truncate_id(g, &id);
                prop_assert_eq!(truncate_id(g, once), once);
                prop_assert_eq!(once.len(), g.id_len());
                prop_assert!(id.starts_with(once));
            }

            #[test]
            fn validators_reject_everything_outside_the_set(candidate in "[a-zA-Z0-9_]{1,12}") {
                let known = Geography::all().iter().any(|g| g.as_str() == candidate);
                prop_assert_eq!(Geography::parse(&candidate).is_ok(), known);
            }
        }
    }
}
