//! Startup dataset loading: penguins CSV, wine dataset, and the per-WineType averages.

use std::io::Cursor;
use std::time::{Duration, Instant};

use polars::prelude::*;

use crate::config::DataConfig;
use crate::error::{DashError, Result};
use crate::source::fetch_bytes;
use crate::table::has_column;

/// Category column of the wine table.
pub const WINE_TYPE: &str = "WineType";

/// scikit-learn's `wine_data.csv`, used when no wine source is configured.
pub const BUNDLED_WINE: &[u8] = include_bytes!("../data/wine_data.csv");

/// Feature names of the scikit-learn wine dataset, in file order.
pub const WINE_FEATURES: [&str; 13] = [
    "alcohol",
    "malic_acid",
    "ash",
    "alcalinity_of_ash",
    "magnesium",
    "total_phenols",
    "flavanoids",
    "nonflavanoid_phenols",
    "proanthocyanins",
    "color_intensity",
    "hue",
    "od280/od315_of_diluted_wines",
    "proline",
];

/// The immutable data every session and rule reads from.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub penguins: DataFrame,
    pub wine: DataFrame,
    /// One row per WineType (first-seen order), mean of every numeric wine column.
    pub wine_avg: DataFrame,
    /// Wine columns offered by the tab 2 pickers (everything except WineType).
    pub ingredients: Vec<String>,
}

impl Datasets {
    /// Fetches and decodes both datasets. Called once at startup; any failure is fatal.
    pub fn load(config: &DataConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.fetch_timeout_secs);
        let started = Instant::now();

        let penguin_bytes = fetch_bytes("penguins", &config.penguins_url, timeout)?;
        let penguins = decode_penguins(penguin_bytes)?;

        let wine = match config.wine_source.as_deref() {
            Some(location) => decode_wine(&fetch_bytes("wine", location, timeout)?)?,
            None => {
                tracing::debug!("using bundled wine dataset");
                decode_wine(BUNDLED_WINE)?
            }
        };

        let datasets = Self::from_frames(penguins, wine)?;
        tracing::info!(
            penguins_rows = datasets.penguins.height(),
            wine_rows = datasets.wine.height(),
            wine_types = datasets.wine_avg.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "datasets loaded"
        );
        Ok(datasets)
    }

    /// Builds the context from already decoded tables.
    pub fn from_frames(penguins: DataFrame, wine: DataFrame) -> Result<Self> {
        if !has_column(&wine, WINE_TYPE) {
            return Err(DashError::data_unavailable(
                "wine",
                format!("missing {} column", WINE_TYPE),
            ));
        }
        let wine_avg = average_by(&wine, WINE_TYPE)?;
        let ingredients = wine
            .get_columns()
            .iter()
            .map(|c| c.name().to_string())
            .filter(|name| name != WINE_TYPE)
            .collect();
        Ok(Self {
            penguins,
            wine,
            wine_avg,
            ingredients,
        })
    }
}

fn read_csv(bytes: Vec<u8>, has_header: bool) -> PolarsResult<DataFrame> {
    let options = CsvReadOptions::default()
        .with_has_header(has_header)
        .map_parse_options(|opts| {
            opts.with_null_values(Some(NullValues::AllColumnsSingle("NA".into())))
        });
    CsvReader::new(Cursor::new(bytes))
        .with_options(options)
        .finish()
}

fn decode_penguins(bytes: Vec<u8>) -> Result<DataFrame> {
    read_csv(bytes, true)
        .map_err(|e| DashError::data_unavailable("penguins", crate::error::user_message_from_polars(&e)))
}

/// Decodes the scikit-learn `wine_data.csv` layout
/// (`n_samples,n_features,class names...` header, then features + class index per row),
/// or a headed CSV that already has a WineType column.
pub fn decode_wine(bytes: &[u8]) -> Result<DataFrame> {
    let fail = |reason: String| DashError::data_unavailable("wine", reason);

    let text = std::str::from_utf8(bytes).map_err(|e| fail(format!("not UTF-8 text: {}", e)))?;
    let (first_line, rest) = text.split_once('\n').unwrap_or((text, ""));
    let header: Vec<&str> = first_line.trim().split(',').map(str::trim).collect();

    let n_samples = header.first().and_then(|s| s.parse::<usize>().ok());
    let n_features = header.get(1).and_then(|s| s.parse::<usize>().ok());
    let (Some(n_samples), Some(n_features)) = (n_samples, n_features) else {
        let df = read_csv(bytes.to_vec(), true)
            .map_err(|e| fail(crate::error::user_message_from_polars(&e)))?;
        if !has_column(&df, WINE_TYPE) {
            return Err(fail(format!("headed CSV has no {} column", WINE_TYPE)));
        }
        return Ok(df);
    };

    if n_features != WINE_FEATURES.len() {
        return Err(fail(format!(
            "expected {} features, header declares {}",
            WINE_FEATURES.len(),
            n_features
        )));
    }
    let class_names: Vec<String> = header[2..].iter().map(|s| s.to_string()).collect();
    if class_names.is_empty() {
        return Err(fail("header declares no class names".to_string()));
    }

    let raw = read_csv(rest.as_bytes().to_vec(), false)
        .map_err(|e| fail(crate::error::user_message_from_polars(&e)))?;
    if raw.width() != n_features + 1 {
        return Err(fail(format!(
            "expected {} fields per row, found {}",
            n_features + 1,
            raw.width()
        )));
    }
    if raw.height() != n_samples {
        return Err(fail(format!(
            "header declares {} samples, found {}",
            n_samples,
            raw.height()
        )));
    }

    let mut columns: Vec<Column> = Vec::with_capacity(n_features + 1);
    for (source, name) in raw.get_columns().iter().zip(WINE_FEATURES) {
        columns.push(source.cast(&DataType::Float64)?.with_name(name.into()));
    }

    let class_column = raw.get_columns()[n_features].cast(&DataType::Int64)?;
    let mut wine_types = Vec::with_capacity(raw.height());
    for (row, class) in class_column.i64()?.into_iter().enumerate() {
        let name = class
            .and_then(|c| usize::try_from(c).ok())
            .and_then(|c| class_names.get(c))
            .ok_or_else(|| fail(format!("row {} has an invalid class index", row + 1)))?;
        wine_types.push(name.clone());
    }
    columns.push(Series::new(WINE_TYPE.into(), wine_types).into());

    Ok(DataFrame::new(columns)?)
}

/// Groups `df` by `key` (first-seen order) and averages every other numeric column.
/// Null cells are left out of each mean.
pub fn average_by(df: &DataFrame, key: &str) -> Result<DataFrame> {
    crate::table::require_column(df, key)?;
    let aggregates: Vec<Expr> = df
        .get_columns()
        .iter()
        .filter(|c| c.name().as_str() != key && c.dtype().is_numeric())
        .map(|c| col(c.name().as_str()).cast(DataType::Float64).mean())
        .collect();

    let averaged = df
        .clone()
        .lazy()
        .group_by_stable([col(key)])
        .agg(aggregates)
        .collect()?;
    Ok(averaged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::numeric_values;

    const SKLEARN_SAMPLE: &str = "3,13,class_0,class_1,class_2\n\
        14.23,1.71,2.43,15.6,127,2.8,3.06,.28,2.29,5.64,1.04,3.92,1065,0\n\
        12.37,.94,1.36,10.6,88,1.98,.57,.28,.42,1.95,1.05,1.82,520,1\n\
        12.86,1.35,2.32,18,122,1.51,1.25,.21,.94,4.1,.76,1.29,630,2\n";

    #[test]
    fn decodes_sklearn_layout() {
        let wine = decode_wine(SKLEARN_SAMPLE.as_bytes()).unwrap();
        assert_eq!(wine.height(), 3);
        assert_eq!(wine.width(), 14);
        let types = crate::table::category_values(&wine, WINE_TYPE).unwrap();
        assert_eq!(
            types,
            vec![
                Some("class_0".to_string()),
                Some("class_1".to_string()),
                Some("class_2".to_string())
            ]
        );
        let alcohol = numeric_values(&wine, "alcohol").unwrap();
        assert_eq!(alcohol[0], Some(14.23));
        assert_eq!(numeric_values(&wine, "proline").unwrap()[2], Some(630.0));
    }

    #[test]
    fn bundled_wine_is_the_full_dataset() {
        let wine = decode_wine(BUNDLED_WINE).unwrap();
        assert_eq!(wine.height(), 178);
        assert_eq!(wine.width(), 14);
        let avg = average_by(&wine, WINE_TYPE).unwrap();
        assert_eq!(avg.height(), 3);
        let types = crate::table::category_values(&wine, WINE_TYPE).unwrap();
        let count = |name: &str| types.iter().filter(|t| t.as_deref() == Some(name)).count();
        assert_eq!((count("class_0"), count("class_1"), count("class_2")), (59, 71, 48));
        assert_eq!(numeric_values(&wine, "proline").unwrap()[0], Some(1065.0));
    }

    #[test]
    fn rejects_sample_count_mismatch() {
        let bad = SKLEARN_SAMPLE.replacen("3,13", "4,13", 1);
        let err = decode_wine(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, DashError::DataUnavailable { .. }));
    }

    #[test]
    fn rejects_out_of_range_class() {
        let bad = SKLEARN_SAMPLE.replace(",630,2\n", ",630,7\n");
        let err = decode_wine(bad.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid class index"));
    }

    #[test]
    fn accepts_headed_csv_with_wine_type() {
        let csv = "alcohol,ash,WineType\n13.0,2.1,red\n12.0,2.5,white\n";
        let wine = decode_wine(csv.as_bytes()).unwrap();
        assert_eq!(wine.height(), 2);
        assert!(has_column(&wine, WINE_TYPE));
    }

    #[test]
    fn rejects_headed_csv_without_wine_type() {
        let csv = "alcohol,ash\n13.0,2.1\n";
        assert!(decode_wine(csv.as_bytes()).is_err());
    }

    #[test]
    fn average_by_first_seen_order() {
        let df = df!(
            "WineType" => &["b", "a", "b", "a"],
            "x" => &[1.0_f64, 10.0, 3.0, 20.0],
            "y" => &[Some(2_i64), None, Some(4), Some(6)]
        )
        .unwrap();
        let avg = average_by(&df, "WineType").unwrap();
        assert_eq!(avg.height(), 2);
        assert_eq!(
            crate::table::category_values(&avg, "WineType").unwrap(),
            vec![Some("b".to_string()), Some("a".to_string())]
        );
        assert_eq!(numeric_values(&avg, "x").unwrap(), vec![Some(2.0), Some(15.0)]);
        assert_eq!(numeric_values(&avg, "y").unwrap(), vec![Some(3.0), Some(6.0)]);
    }

    #[test]
    fn from_frames_requires_wine_type() {
        let penguins = df!("island" => &["Dream"]).unwrap();
        let wine = df!("alcohol" => &[13.0_f64]).unwrap();
        assert!(Datasets::from_frames(penguins, wine).is_err());
    }
}
