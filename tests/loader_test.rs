mod common;

use std::fs;

use tabdash::config::DataConfig;
use tabdash::{DashError, Datasets};
use tempfile::TempDir;

const PENGUINS_CSV: &str = "species,island,bill_length_mm,bill_depth_mm,flipper_length_mm,body_mass_g,sex\n\
    Adelie,Torgersen,39.1,18.7,181,3750,male\n\
    Adelie,Torgersen,NA,NA,NA,NA,NA\n\
    Gentoo,Biscoe,46.1,13.2,211,4500,female\n";

fn write_sources(dir: &TempDir) -> DataConfig {
    let penguins = dir.path().join("penguins.csv");
    let wine = dir.path().join("wine_data.csv");
    fs::write(&penguins, PENGUINS_CSV).unwrap();
    fs::write(&wine, common::WINE_SAMPLE).unwrap();
    DataConfig {
        penguins_url: penguins.to_string_lossy().into_owned(),
        wine_source: Some(wine.to_string_lossy().into_owned()),
        fetch_timeout_secs: 5,
    }
}

#[test]
fn loads_both_datasets_from_local_files() {
    let dir = TempDir::new().unwrap();
    let datasets = Datasets::load(&write_sources(&dir)).unwrap();

    assert_eq!(datasets.penguins.height(), 3);
    assert_eq!(datasets.penguins.width(), 7);
    // NA is read as null
    assert_eq!(
        datasets
            .penguins
            .column("bill_length_mm")
            .unwrap()
            .null_count(),
        1
    );
    assert_eq!(datasets.wine.height(), 6);
    assert_eq!(datasets.wine_avg.height(), 3);
    assert_eq!(datasets.ingredients.len(), 13);
    assert_eq!(datasets.ingredients[0], "alcohol");
    assert!(!datasets.ingredients.iter().any(|c| c == "WineType"));
}

#[test]
fn default_wine_is_bundled() {
    let dir = TempDir::new().unwrap();
    let penguins = dir.path().join("penguins.csv");
    fs::write(&penguins, PENGUINS_CSV).unwrap();
    let config = DataConfig {
        penguins_url: penguins.to_string_lossy().into_owned(),
        ..DataConfig::default()
    };
    assert!(config.wine_source.is_none());

    // Only the penguins file is read; the wine table comes from the binary
    let datasets = Datasets::load(&config).unwrap();
    assert_eq!(datasets.wine.height(), 178);
    assert_eq!(datasets.wine_avg.height(), 3);
    assert_eq!(datasets.ingredients.len(), 13);
}

#[test]
fn missing_penguins_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = write_sources(&dir);
    config.penguins_url = dir.path().join("gone.csv").to_string_lossy().into_owned();

    let err = Datasets::load(&config).unwrap_err();
    assert!(
        matches!(err, DashError::DataUnavailable { ref source_name, .. } if source_name == "penguins")
    );
}

#[test]
fn unreachable_wine_url_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = write_sources(&dir);
    config.wine_source = Some("http://127.0.0.1:1/wine_data.csv".to_string());
    config.fetch_timeout_secs = 2;

    let err = Datasets::load(&config).unwrap_err();
    assert!(err.to_string().starts_with("wine dataset unavailable"));
}

#[test]
fn penguins_over_http() {
    let dir = TempDir::new().unwrap();
    let mut config = write_sources(&dir);
    config.penguins_url = common::serve_once("200 OK", PENGUINS_CSV);

    let datasets = Datasets::load(&config).unwrap();
    assert_eq!(datasets.penguins.height(), 3);
}

#[test]
fn penguins_http_error_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = write_sources(&dir);
    config.penguins_url = common::serve_once("500 Internal Server Error", "boom");

    let err = Datasets::load(&config).unwrap_err();
    assert!(err.to_string().contains("500"), "{}", err);
}
