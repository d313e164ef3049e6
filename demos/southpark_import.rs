//! Imports South Park script lines into `southpark/scripts`, twenty records per batch.
//!
//! ```text
//! KINTO_URL=http://localhost:8888/v1 KINTO_TOKEN=s3cr3t \
//!     cargo run --example southpark_import -- datasets/lines.json
//! ```
//!
//! The dataset is a JSON array of `{"season", "episode", "character", "line"}` objects.
//! Without a path a handful of built-in lines is imported.

use std::error::Error;
use std::time::Instant;

use kinto_rs_sdk::client::KintoClient;
use kinto_rs_sdk::gateway::{sync_batch_results, Gateway};
use kinto_rs_sdk::kinto_model;
use kinto_rs_sdk::model::{KintoModel, RecordMeta};
use serde::{Deserialize, Serialize};

const PAGE_SIZE: usize = 20;
const MAX_LINES: usize = 1_000;

#[derive(Debug, Serialize)]
struct Line {
    season: u32,
    episode: u32,
    character: String,
    text: String,
    #[serde(skip)]
    meta: RecordMeta,
}

kinto_model!(Line, bucket = "southpark", collection = "scripts", meta = meta);

#[derive(Deserialize)]
struct Row {
    season: u32,
    episode: u32,
    character: String,
    line: String,
}

impl From<Row> for Line {
    fn from(row: Row) -> Self {
        Self {
            season: row.season,
            episode: row.episode,
            character: row.character,
            text: row.line,
            meta: RecordMeta::default(),
        }
    }
}

fn sample_rows() -> Vec<Row> {
    [
        (10, 1, "Stan", "You guys, you guys! Chef is going away."),
        (10, 1, "Kyle", "Going away? For how long?"),
        (10, 1, "Cartman", "Screw you guys, I'm going home."),
        (10, 2, "Kenny", "Mmmph mmph."),
    ]
    .into_iter()
    .map(|(season, episode, character, line)| Row {
        season,
        episode,
        character: character.to_owned(),
        line: line.to_owned(),
    })
    .collect()
}

fn load_rows() -> Result<Vec<Row>, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(sample_rows()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // KINTO_URL is required, KINTO_TOKEN is optional.
    let client = KintoClient::from_env()?;
    let gateway = Gateway::new(client);

    gateway.ensure_buckets([Line::config()])?;
    gateway.ensure_collections([Line::config()])?;

    let mut lines: Vec<Line> = load_rows()?
        .into_iter()
        .take(MAX_LINES)
        .map(Line::from)
        .collect();

    for page in lines.chunks_mut(PAGE_SIZE) {
        let started = Instant::now();
        let outcome = gateway.batch(&*page)?;
        let elapsed = started.elapsed();

        if !outcome.all_succeeded() {
            for (index, failure) in outcome.failures() {
                eprintln!("line {index} rejected with {}: {}", failure.status, failure.body);
            }
            return Err(format!("{} of {} lines rejected", outcome.failures().len(), page.len()).into());
        }

        let saved = sync_batch_results(page, &outcome)?;
        println!("imported {saved} lines in {:.3}s", elapsed.as_secs_f64());
    }

    if let Some(last) = lines.last() {
        println!("last record id: {:?}", last.id());
    }
    Ok(())
}
