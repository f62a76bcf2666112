//! Chart factory: turns a table and a few parameters into a renderer-agnostic `ChartSpec`.
//!
//! Builders are pure. Missing or non-numeric y values are left out of the
//! series (and out of averages) instead of failing the chart.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::loader::WINE_TYPE;
use crate::table::{category_values, distinct_in_order, numeric_values, require_column};

/// Rendered height in pixels for every dashboard chart.
pub const CHART_HEIGHT: u32 = 600;

pub const BAR_TITLE: &str = "Average ingredient per wine type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Scatter,
    Bar,
    Histogram,
}

/// X position of a point: numeric for scatter, a category label for bar and histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum XValue {
    Number(f64),
    Category(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: XValue,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x: String,
    pub y: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_by: Option<String>,
    pub height: u32,
    pub series: Vec<Series>,
}

impl ChartSpec {
    /// Total number of points across all series.
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}

/// Aggregate applied to the values that fall in a histogram bin.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistFunc {
    Count,
    Sum,
    #[default]
    Avg,
    Min,
    Max,
}

impl HistFunc {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// None when the bin has no values and the function needs at least one.
    fn apply(self, values: &[f64]) -> Option<f64> {
        match self {
            Self::Count => Some(values.len() as f64),
            _ if values.is_empty() => None,
            Self::Sum => Some(values.iter().sum()),
            Self::Avg => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Min => values.iter().copied().reduce(f64::min),
            Self::Max => values.iter().copied().reduce(f64::max),
        }
    }
}

/// First character upper-cased, the rest lower-cased ("malic_acid" -> "Malic_acid").
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Scatter of `y` against `x`, optionally one series per WineType.
pub fn scatter(table: &DataFrame, x: &str, y: &str, color_by_wine_type: bool) -> Result<ChartSpec> {
    let xs = numeric_values(table, x)?;
    let ys = numeric_values(table, y)?;

    let point = |i: usize| -> Option<Point> {
        Some(Point {
            x: XValue::Number(xs[i]?),
            y: ys[i]?,
        })
    };

    let series = if color_by_wine_type {
        let types = category_values(table, WINE_TYPE)?;
        distinct_in_order(&types)
            .into_iter()
            .map(|wine_type| Series {
                points: (0..table.height())
                    .filter(|&i| types[i].as_deref() == Some(wine_type.as_str()))
                    .filter_map(&point)
                    .collect(),
                name: wine_type,
            })
            .collect()
    } else {
        vec![Series {
            name: y.to_string(),
            points: (0..table.height()).filter_map(&point).collect(),
        }]
    };

    Ok(ChartSpec {
        kind: ChartKind::Scatter,
        title: format!("{} vs {}", capitalize(x), capitalize(y)),
        x: x.to_string(),
        y: vec![y.to_string()],
        color_by: color_by_wine_type.then(|| WINE_TYPE.to_string()),
        height: CHART_HEIGHT,
        series,
    })
}

/// Grouped bars of the averaged `ingredients`, one series per ingredient, x = WineType.
pub fn bar(aggregate: &DataFrame, ingredients: &[String]) -> Result<ChartSpec> {
    let types = category_values(aggregate, WINE_TYPE)?;
    let mut series = Vec::with_capacity(ingredients.len());
    for ingredient in ingredients {
        let values = numeric_values(aggregate, ingredient)?;
        let points = types
            .iter()
            .zip(values)
            .filter_map(|(wine_type, value)| {
                Some(Point {
                    x: XValue::Category(wine_type.clone()?),
                    y: value?,
                })
            })
            .collect();
        series.push(Series {
            name: ingredient.clone(),
            points,
        });
    }

    Ok(ChartSpec {
        kind: ChartKind::Bar,
        title: BAR_TITLE.to_string(),
        x: WINE_TYPE.to_string(),
        y: ingredients.to_vec(),
        color_by: None,
        height: CHART_HEIGHT,
        series,
    })
}

/// One bar per distinct `group` value; bar height is `func` over that bin's `value`s.
pub fn histogram(table: &DataFrame, group: &str, value: &str, func: HistFunc) -> Result<ChartSpec> {
    require_column(table, group)?;
    let groups = category_values(table, group)?;
    let values = numeric_values(table, value)?;

    let points = distinct_in_order(&groups)
        .into_iter()
        .filter_map(|bin| {
            let in_bin: Vec<f64> = groups
                .iter()
                .zip(&values)
                .filter(|(g, _)| g.as_deref() == Some(bin.as_str()))
                .filter_map(|(_, v)| *v)
                .collect();
            func.apply(&in_bin).map(|y| Point {
                x: XValue::Category(bin),
                y,
            })
        })
        .collect();

    Ok(ChartSpec {
        kind: ChartKind::Histogram,
        title: format!("{} of {} by {}", func.as_str(), value, group),
        x: group.to_string(),
        y: vec![value.to_string()],
        color_by: None,
        height: CHART_HEIGHT,
        series: vec![Series {
            name: format!("{} of {}", func.as_str(), value),
            points,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashError;
    use polars::df;

    fn wine() -> DataFrame {
        df!(
            "alcohol" => &[14.2_f64, 13.2, 12.4, 12.9],
            "malic_acid" => &[Some(1.7_f64), Some(1.8), None, Some(1.3)],
            "WineType" => &["class_0", "class_0", "class_1", "class_2"]
        )
        .unwrap()
    }

    #[test]
    fn capitalize_matches_title_case_of_first_word() {
        assert_eq!(capitalize("malic_acid"), "Malic_acid");
        assert_eq!(capitalize("OD280"), "Od280");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn scatter_single_series_skips_missing() {
        let chart = scatter(&wine(), "alcohol", "malic_acid", false).unwrap();
        assert_eq!(chart.title, "Alcohol vs Malic_acid");
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.point_count(), 3);
        assert_eq!(chart.color_by, None);
    }

    #[test]
    fn scatter_color_encoded_by_wine_type() {
        let chart = scatter(&wine(), "alcohol", "alcohol", true).unwrap();
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["class_0", "class_1", "class_2"]);
        assert_eq!(chart.series[0].points.len(), 2);
        assert_eq!(chart.point_count(), 4);
        assert_eq!(chart.color_by.as_deref(), Some("WineType"));
    }

    #[test]
    fn scatter_unknown_column() {
        let err = scatter(&wine(), "alcohol", "sugar", false).unwrap_err();
        assert!(matches!(err, DashError::UnknownColumn(c) if c == "sugar"));
    }

    #[test]
    fn bar_one_series_per_ingredient() {
        let avg = crate::loader::average_by(&wine(), "WineType").unwrap();
        let chart = bar(&avg, &["alcohol".to_string(), "malic_acid".to_string()]).unwrap();
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].points.len(), 3);
        assert_eq!(chart.series[0].points[0].x, XValue::Category("class_0".into()));
        assert!((chart.series[0].points[0].y - 13.7).abs() < 1e-9);
        // class_1 has no malic_acid value, so its bar is absent
        assert_eq!(chart.series[1].points.len(), 2);
    }

    #[test]
    fn bar_empty_selection() {
        let avg = crate::loader::average_by(&wine(), "WineType").unwrap();
        let chart = bar(&avg, &[]).unwrap();
        assert!(chart.series.is_empty());
        assert_eq!(chart.title, BAR_TITLE);
    }

    #[test]
    fn histogram_averages_per_bin() {
        let penguins = df!(
            "island" => &[Some("Torgersen"), Some("Biscoe"), Some("Torgersen"), None],
            "bill_length_mm" => &[Some(39.0_f64), Some(46.0), Some(41.0), Some(50.0)]
        )
        .unwrap();
        let chart = histogram(&penguins, "island", "bill_length_mm", HistFunc::Avg).unwrap();
        let points = &chart.series[0].points;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].x, XValue::Category("Torgersen".into()));
        assert_eq!(points[0].y, 40.0);
        assert_eq!(points[1].y, 46.0);
        assert_eq!(chart.title, "avg of bill_length_mm by island");
    }

    #[test]
    fn histogram_other_functions() {
        let df = df!(
            "g" => &["a", "a", "b"],
            "v" => &[Some(1.0_f64), Some(3.0), None]
        )
        .unwrap();
        let ys = |f| {
            histogram(&df, "g", "v", f).unwrap().series[0]
                .points
                .iter()
                .map(|p| p.y)
                .collect::<Vec<_>>()
        };
        assert_eq!(ys(HistFunc::Count), vec![2.0, 0.0]);
        assert_eq!(ys(HistFunc::Sum), vec![4.0]);
        assert_eq!(ys(HistFunc::Min), vec![1.0]);
        assert_eq!(ys(HistFunc::Max), vec![3.0]);
    }

    #[test]
    fn histogram_unknown_group() {
        let err = histogram(&wine(), "island", "alcohol", HistFunc::Avg).unwrap_err();
        assert!(matches!(err, DashError::UnknownColumn(_)));
    }
}
