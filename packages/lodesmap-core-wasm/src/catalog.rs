// Remote file layout for the LODES parquet files and the pmtiles archives.
use crate::config::MapConfig;
use crate::error::{LodesError, Result};
use crate::params::{Geography, Origin, Parameter, Year};

/// State FIPS code to the lower-case postal abbreviation used in TIGER paths.
const FIPS_TO_STATE_ABBR: [(&str, &str); 51] = [
    ("01", "al"),
    ("02", "ak"),
    ("04", "az"),
    ("05", "ar"),
    ("06", "ca"),
    ("08", "co"),
    ("09", "ct"),
    ("10", "de"),
    ("11", "dc"),
    ("12", "fl"),
    ("13", "ga"),
    ("15", "hi"),
    ("16", "id"),
    ("17", "il"),
    ("18", "in"),
    ("19", "ia"),
    ("20", "ks"),
    ("21", "ky"),
    ("22", "la"),
    ("23", "me"),
    ("24", "md"),
    ("25", "ma"),
    ("26", "mi"),
    ("27", "mn"),
    ("28", "ms"),
    ("29", "mo"),
    ("30", "mt"),
    ("31", "ne"),
    ("32", "nv"),
    ("33", "nh"),
    ("34", "nj"),
    ("35", "nm"),
    ("36", "ny"),
    ("37", "nc"),
    ("38", "nd"),
    ("39", "oh"),
    ("40", "ok"),
    ("41", "or"),
    ("42", "pa"),
    ("44", "ri"),
    ("45", "sc"),
    ("46", "sd"),
    ("47", "tn"),
    ("48", "tx"),
    ("49", "ut"),
    ("50", "vt"),
    ("51", "va"),
    ("53", "wa"),
    ("54", "wv"),
    ("55", "wi"),
    ("56", "wy"),
];

pub fn state_abbr(fips: &str) -> Option<&'static str> {
    FIPS_TO_STATE_ABBR
        .iter()
        .find(|(code, _)| *code == fips)
        .map(|(_, abbr)| *abbr)
}

/// Source id of the vector tiles for `geography`.
pub fn source_id(geography: Geography) -> String {
    format!("protomap-{}", geography.as_str())
}

#[derive(Clone, Debug)]
pub struct Catalog {
    lodes_base_url: String,
    tiles_base_url: String,
    tiles_year: String,
    split_by_origin: bool,
}

impl Catalog {
    pub fn new(config: &MapConfig) -> Self {
        Catalog {
            lodes_base_url: config.lodes_base_url.trim_end_matches('/').to_string(),
            tiles_base_url: config.tiles_base_url.trim_end_matches('/').to_string(),
            tiles_year: config.tiles_year.clone(),
            split_by_origin: config.split_by_origin,
        }
    }

    /// Parquet file holding every flow for one state at one geography.
    pub fn lodes_url(&self, year: Year, geography: Geography, origin: Origin, state_fips: &str) -> Result<String> {
        let state = state_abbr(state_fips).ok_or_else(|| LodesError::UnknownState(state_fips.to_string()))?;
        let year = year.as_str();
        let geography = geography.as_str();
        let origin_segment = if self.split_by_origin {
            format!("origin={}/", origin.as_str())
        } else {
            String::new()
        };
        Ok(format!(
            "{}/year={}/geography={}/{}state={}/lodes-{}-{}-{}.parquet",
            self.lodes_base_url, year, geography, origin_segment, state, year, geography, state
        ))
    }

    /// `pmtiles://` URL of the tile archive for `geography`.
    pub fn tiles_url(&self, geography: Geography) -> String {
        format!(
            "pmtiles://{}/year={}/geography={}/tiles-{}-{}.pmtiles",
            self.tiles_base_url,
            self.tiles_year,
            geography.as_str(),
            self.tiles_year,
            geography.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lodes_url_uses_postal_abbreviation() {
        let catalog = Catalog::new(&MapConfig::default());
        let url = catalog
            .lodes_url(Year::Y2022, Geography::Tract, Origin::Home, "36")
            .unwrap();
        assert_eq!(
            url,
            "https://data.lodesmap.com/lodes/year=2022/geography=tract/state=ny/lodes-2022-tract-ny.parquet"
        );
    }

    #[test]
    fn split_layout_adds_origin_segment() {
        let config = MapConfig {
            split_by_origin: true,
            lodes_base_url: "http://localhost/lodes/".to_string(),
            ..MapConfig::default()
        };
        let url = Catalog::new(&config)
            .lodes_url(Year::Y2022, Geography::County, Origin::Work, "06")
            .unwrap();
        assert_eq!(
            url,
            "http://localhost/lodes/year=2022/geography=county/origin=work/state=ca/lodes-2022-county-ca.parquet"
        );
    }

    #[test]
    fn unknown_state_is_an_error() {
        let catalog = Catalog::new(&MapConfig::default());
        let err = catalog
            .lodes_url(Year::Y2022, Geography::Tract, Origin::Home, "72")
            .unwrap_err();
        assert!(matches!(err, LodesError::UnknownState(code) if code == "72"));
    }

    #[test]
    fn tiles_always_use_tiles_year() {
        let catalog = Catalog::new(&MapConfig::default());
        assert_eq!(
            catalog.tiles_url(Geography::BlockGroup),
            "pmtiles://https://data.lodesmap.com/tiles/year=2023/geography=block_group/tiles-2023-block_group.pmtiles"
        );
        assert_eq!(source_id(Geography::County), "protomap-county");
    }

    #[test]
    fn fips_table_covers_states_and_dc() {
        assert_eq!(FIPS_TO_STATE_ABBR.len(), 51);
        assert_eq!(state_abbr("11"), Some("dc"));
        assert_eq!(state_abbr("03"), None);
    }
}
