#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use polars::prelude::*;
use tabdash::loader::{decode_wine, Datasets};

/// Six samples in the scikit-learn wine_data.csv layout, two per class.
pub const WINE_SAMPLE: &str = "6,13,class_0,class_1,class_2\n\
    14.23,1.71,2.43,15.6,127,2.8,3.06,.28,2.29,5.64,1.04,3.92,1065,0\n\
    13.2,1.78,2.14,11.2,100,2.65,2.76,.26,1.28,4.38,1.05,3.4,1050,0\n\
    12.37,.94,1.36,10.6,88,1.98,.57,.28,.42,1.95,1.05,1.82,520,1\n\
    12.33,1.1,2.28,16,101,2.05,1.09,.63,.41,3.27,1.25,1.67,680,1\n\
    12.86,1.35,2.32,18,122,1.51,1.25,.21,.94,4.1,.76,1.29,630,2\n\
    12.88,2.99,2.4,20,104,1.3,1.22,.24,.83,5.4,.74,1.42,530,2\n";

pub fn penguins() -> DataFrame {
    df!(
        "species" => &["Adelie", "Adelie", "Gentoo", "Chinstrap", "Adelie"],
        "island" => &["Torgersen", "Torgersen", "Biscoe", "Dream", "Biscoe"],
        "bill_length_mm" => &[Some(39.1_f64), Some(39.5), Some(46.1), Some(46.5), None],
        "bill_depth_mm" => &[Some(18.7_f64), Some(17.4), Some(13.2), Some(17.9), None],
        "flipper_length_mm" => &[Some(181_i64), Some(186), Some(211), Some(192), None],
        "body_mass_g" => &[Some(3750_i64), Some(3800), Some(4500), Some(3500), None],
        "sex" => &[Some("male"), Some("female"), Some("female"), Some("female"), None]
    )
    .unwrap()
}

pub fn wine() -> DataFrame {
    decode_wine(WINE_SAMPLE.as_bytes()).unwrap()
}

pub fn datasets() -> Arc<Datasets> {
    Arc::new(Datasets::from_frames(penguins(), wine()).unwrap())
}

/// Browser-style data URL for `bytes`.
pub fn data_url(bytes: &[u8]) -> String {
    format!("data:text/csv;base64,{}", STANDARD.encode(bytes))
}

/// Serves exactly one HTTP response with `status` and `body`; returns the URL to request.
pub fn serve_once(status: &'static str, body: &'static str) -> String {
    serve_once_after(Duration::ZERO, status, body)
}

/// Like [`serve_once`], but waits `delay` after reading the request before answering.
pub fn serve_once_after(delay: Duration, status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            thread::sleep(delay);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{}/", addr)
}
