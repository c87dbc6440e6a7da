//! Count-to-color mapping, legend and control models.
//!
//! Thresholds are per geography: `count < thresholds[i]` selects bucket `i`,
//! first match wins, and counts past the last threshold get no color.

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::RenderStrategy;
use crate::params::{title_case, Geography, JobSegment, Origin, Parameter, Year};
use crate::selection::Control;

pub const LEGEND_TITLE: &str = "Number of People";

/// Fill colors of the five buckets, lightest to darkest.
pub const BUCKET_COLORS: [&str; 5] = [
    "rgba(253, 231, 37, 0.4)",
    "rgba(122, 209, 81, 0.4)",
    "rgba(34, 168, 132, 0.4)",
    "rgba(42, 120, 142, 0.4)",
    "rgba(65, 68, 135, 0.4)",
];

pub const NO_DATA_COLOR: &str = "rgba(255, 255, 255, 0.0)";

/// Legend swatches reference the page stylesheet.
pub const LEGEND_SWATCHES: [&str; 5] = [
    "var(--map-color-1)",
    "var(--map-color-2)",
    "var(--map-color-3)",
    "var(--map-color-4)",
    "var(--map-color-5)",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ColorBucket {
    #[serde(rename = "color_1")]
    Color1,
    #[serde(rename = "color_2")]
    Color2,
    #[serde(rename = "color_3")]
    Color3,
    #[serde(rename = "color_4")]
    Color4,
    #[serde(rename = "color_5")]
    Color5,
    #[serde(rename = "none")]
    None,
}

impl ColorBucket {
    const ORDERED: [ColorBucket; 5] = [
        ColorBucket::Color1,
        ColorBucket::Color2,
        ColorBucket::Color3,
        ColorBucket::Color4,
        ColorBucket::Color5,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ColorBucket::Color1 => "color_1",
            ColorBucket::Color2 => "color_2",
            ColorBucket::Color3 => "color_3",
            ColorBucket::Color4 => "color_4",
            ColorBucket::Color5 => "color_5",
            ColorBucket::None => "none",
        }
    }
}

pub fn thresholds(geography: Geography) -> [u64; 5] {
    match geography {
        Geography::Tract => [2, 11, 21, 30, 10_000_000],
        Geography::County => [2, 101, 1001, 10001, 100_000_000],
        Geography::BlockGroup | Geography::Supertract => [2, 6, 11, 16, 10_000_000],
    }
}

pub fn labels(geography: Geography) -> [&'static str; 5] {
    match geography {
        Geography::County => ["1", "2-100", "101-1,000", "1,001-10,000", "10,000+"],
        _ => ["1", "2-10", "11-20", "21-30", "30+"],
    }
}

pub fn color_for_count(count: u64, geography: Geography) -> ColorBucket {
    thresholds(geography)
        .iter()
        .position(|threshold| count < *threshold)
        .map(|index| ColorBucket::ORDERED[index])
        .unwrap_or(ColorBucket::None)
}

/// Turns counts into feature-state and fill expressions for one render strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorScale {
    strategy: RenderStrategy,
}

impl ColorScale {
    pub fn new(strategy: RenderStrategy) -> Self {
        ColorScale { strategy }
    }

    pub fn strategy(&self) -> RenderStrategy {
        self.strategy
    }

    /// Feature-state written for a unit with `count` flows.
    pub fn feature_state(&self, count: u64, geography: Geography) -> Value {
        match self.strategy {
            RenderStrategy::Discrete => json!({ "geoColor": color_for_count(count, geography) }),
            RenderStrategy::Continuous => json!({ "count": count }),
        }
    }

    /// Feature-state meaning "no data"; the entry is overwritten, never removed.
    pub fn cleared_state(&self) -> Value {
        match self.strategy {
            RenderStrategy::Discrete => json!({ "geoColor": ColorBucket::None }),
            RenderStrategy::Continuous => json!({ "count": Value::Null }),
        }
    }

    /// `fill-color` paint expression for the fill layer of `geography`.
    pub fn fill_color(&self, geography: Geography) -> Value {
        match self.strategy {
            RenderStrategy::Discrete => {
                let mut expr = vec![json!("case")];
                for (bucket, color) in ColorBucket::ORDERED.iter().zip(BUCKET_COLORS) {
                    expr.push(json!(["==", ["feature-state", "geoColor"], bucket.as_str()]));
                    expr.push(json!(color));
                }
                expr.push(json!(NO_DATA_COLOR));
                Value::Array(expr)
            }
            RenderStrategy::Continuous => {
                // Stops at 1 and the lower bound of each following bucket
                let bounds = thresholds(geography);
                let mut interpolate = vec![json!("interpolate"), json!(["linear"]), json!(["feature-state", "count"])];
                let stops = std::iter::once(1).chain(bounds[..4].iter().copied());
                for (stop, color) in stops.zip(BUCKET_COLORS) {
                    interpolate.push(json!(stop));
                    interpolate.push(json!(color));
                }
                json!([
                    "case",
                    ["==", ["typeof", ["feature-state", "count"]], "number"],
                    Value::Array(interpolate),
                    NO_DATA_COLOR
                ])
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegendItem {
    pub swatch: &'static str,
    pub label: &'static str,
}

/// Legend contents; the DOM layer mirrors it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Legend {
    pub title: &'static str,
    pub items: Vec<LegendItem>,
    pub collapsed: bool,
}

impl Legend {
    pub fn new(geography: Geography) -> Self {
        Legend {
            title: LEGEND_TITLE,
            items: LEGEND_SWATCHES
                .iter()
                .zip(labels(geography))
                .map(|(swatch, label)| LegendItem { swatch: *swatch, label })
                .collect(),
            collapsed: false,
        }
    }

    pub fn update_labels(&mut self, geography: Geography) {
        for (item, label) in self.items.iter_mut().zip(labels(geography)) {
            item.label = label;
        }
    }

    /// Flips collapsed state and returns it.
    pub fn toggle(&mut self) -> bool {
        self.collapsed = !self.collapsed;
        self.collapsed
    }

    pub fn toggle_glyph(&self) -> &'static str {
        if self.collapsed {
            "\u{2b}"
        } else {
            "\u{2212}"
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropdownOption {
    pub value: &'static str,
    pub text: String,
    pub selected: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dropdown {
    pub control: Control,
    pub options: Vec<DropdownOption>,
}

impl Dropdown {
    pub fn for_control(control: Control, selected: &str) -> Self {
        let values: Vec<(&'static str, String)> = match control {
            Control::Origin => Origin::all().iter().map(|o| (o.as_str(), title_case(o.as_str()))).collect(),
            Control::JobSegment => JobSegment::all().iter().map(|j| (j.as_str(), j.label().to_string())).collect(),
            Control::Geography => Geography::all().iter().map(|g| (g.as_str(), g.title())).collect(),
            Control::Year => Year::all().iter().map(|y| (y.as_str(), y.as_str().to_string())).collect(),
        };
        Dropdown {
            control,
            options: values
                .into_iter()
                .map(|(value, text)| DropdownOption {
                    value,
                    text,
                    selected: value == selected,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tract_buckets() {
        let g = Geography::Tract;
        assert_eq!(color_for_count(0, g), ColorBucket::Color1);
        assert_eq!(color_for_count(1, g), ColorBucket::Color1);
        assert_eq!(color_for_count(2, g), ColorBucket::Color2);
        assert_eq!(color_for_count(10, g), ColorBucket::Color2);
        assert_eq!(color_for_count(29, g), ColorBucket::Color4);
        assert_eq!(color_for_count(42, g), ColorBucket::Color5);
        assert_eq!(color_for_count(10_000_000, g), ColorBucket::None);
    }

    #[test]
    fn county_buckets() {
        let g = Geography::County;
        assert_eq!(color_for_count(100, g), ColorBucket::Color2);
        assert_eq!(color_for_count(101, g), ColorBucket::Color3);
        assert_eq!(color_for_count(50_000, g), ColorBucket::Color5);
    }

    #[test]
    fn discrete_state_and_clear() {
        let scale = ColorScale::new(RenderStrategy::Discrete);
        assert_eq!(scale.feature_state(42, Geography::Tract), json!({"geoColor": "color_5"}));
        assert_eq!(scale.cleared_state(), json!({"geoColor": "none"}));
    }

    #[test]
    fn continuous_state_and_clear() {
        let scale = ColorScale::new(RenderStrategy::Continuous);
        assert_eq!(scale.feature_state(42, Geography::Tract), json!({"count": 42}));
        assert_eq!(scale.cleared_state(), json!({"count": null}));
    }

    #[test]
    fn continuous_fill_has_ascending_stops() {
        let expr = ColorScale::new(RenderStrategy::Continuous).fill_color(Geography::County);
        let interpolate = expr[2].as_array().unwrap();
        let stops: Vec<u64> = interpolate[3..].iter().step_by(2).map(|v| v.as_u64().unwrap()).collect();
        assert_eq!(stops, vec![1, 2, 101, 1001, 10001]);
    }

    #[test]
    fn discrete_fill_lists_every_bucket() {
        let expr = ColorScale::new(RenderStrategy::Discrete).fill_color(Geography::Tract);
        let arr = expr.as_array().unwrap();
        assert_eq!(arr.len(), 1 + 5 * 2 + 1);
        assert_eq!(arr.last().unwrap(), &json!(NO_DATA_COLOR));
    }

    #[test]
    fn legend_relabels_per_geography() {
        let mut legend = Legend::new(Geography::Tract);
        assert_eq!(legend.items[4].label, "30+");
        legend.update_labels(Geography::County);
        assert_eq!(legend.items[4].label, "10,000+");
        assert_eq!(legend.items[0].swatch, "var(--map-color-1)");
        assert_eq!(legend.toggle_glyph(), "\u{2212}");
        assert!(legend.toggle());
        assert_eq!(legend.toggle_glyph(), "+");
    }

    #[test]
    fn dropdown_texts() {
        let geo = Dropdown::for_control(Control::Geography, "tract");
        assert_eq!(geo.options[0].text, "Block Group");
        let selected: Vec<_> = geo.options.iter().filter(|o| o.selected).map(|o| o.value).collect();
        assert_eq!(selected, vec!["tract"]);

        let jobs = Dropdown::for_control(Control::JobSegment, "XX");
        assert_eq!(jobs.options[0].text, "Total jobs");
        assert!(jobs.options.iter().all(|o| !o.selected));
    }

    #[cfg(not(target_arch = "wasm32"))]
    mod properties {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn buckets_never_decrease(a in 0u64..200_000_000, b in 0u64..200_000_000, gi in 0usize..4) {
                let g = Geography::all()[gi];
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                let (blo, bhi) = (color_for_count(lo, g), color_for_count(hi, g));
                // None sorts after every colored bucket
                prop_assert!(blo <= bhi);
            }
        }
    }
}
