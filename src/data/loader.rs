// ============================================================
// Layer 4 — Traffic and Spatial Embedding Loaders
// ============================================================
// Two on-disk formats are read here:
//
// 1. Traffic readings (CSV):
//      timestamp,773869,767541,767542,...
//      2012-03-01 00:00:00,64.375,67.625,67.125,...
//    One row per time step, one column per sensor. An empty
//    cell is a missing reading and becomes 0.0.
//
// 2. Spatial embedding (node2vec text output):
//      207 64
//      0 0.1 -0.3 ...
//      1 ...
//    The first line is "V D"; each following line starts with
//    the vertex index. Rows may appear in any order.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::{
    spatial::SpatialEmbedding,
    traffic::{TrafficSeries, NULL_READING},
    traits::{EmbeddingSource, TrafficSource},
};

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses one timestamp cell; RFC 3339 offsets are dropped after
/// converting to the local wall-clock time of the sensor network.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    bail!("cannot parse timestamp '{s}'")
}

// ─── CsvTrafficLoader ─────────────────────────────────────────────────────────
pub struct CsvTrafficLoader {
    path: PathBuf,
}

impl CsvTrafficLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl TrafficSource for CsvTrafficLoader {
    fn load_series(&self) -> Result<TrafficSeries> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open traffic file '{}'", self.path.display()))?;

        let headers = reader.headers()?.clone();
        if headers.len() < 2 {
            bail!(
                "traffic file '{}' needs a timestamp column and at least one sensor column",
                self.path.display()
            );
        }
        let sensors: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut timestamps = Vec::new();
        let mut readings   = Vec::new();

        for (row, record) in reader.records().enumerate() {
            // +2: one for the header, one for 1-based line numbers
            let line   = row + 2;
            let record = record.with_context(|| format!("Bad CSV record on line {line}"))?;
            if record.len() != headers.len() {
                bail!("line {line}: expected {} columns, found {}", headers.len(), record.len());
            }

            let ts = parse_timestamp(&record[0]).with_context(|| format!("line {line}"))?;
            timestamps.push(ts);

            for (col, cell) in record.iter().enumerate().skip(1) {
                let value = if cell.is_empty() {
                    NULL_READING
                } else {
                    cell.parse::<f32>().with_context(|| {
                        format!("line {line}, sensor '{}': invalid reading '{cell}'", sensors[col - 1])
                    })?
                };
                readings.push(value);
            }
        }

        if timestamps.is_empty() {
            bail!("traffic file '{}' has no rows", self.path.display());
        }

        let series = TrafficSeries::new(sensors, timestamps, readings);
        tracing::info!(
            "Loaded {} steps × {} sensors from '{}' ({:.2}% missing)",
            series.num_steps(),
            series.num_sensors(),
            self.path.display(),
            series.missing_ratio() * 100.0,
        );
        Ok(series)
    }
}

// ─── SpatialEmbeddingLoader ───────────────────────────────────────────────────
pub struct SpatialEmbeddingLoader {
    path: PathBuf,
}

impl SpatialEmbeddingLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl EmbeddingSource for SpatialEmbeddingLoader {
    fn load_embedding(&self) -> Result<SpatialEmbedding> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read spatial embedding '{}'", self.path.display()))?;
        let se = parse_spatial_embedding(&text)
            .with_context(|| format!("Invalid spatial embedding '{}'", self.path.display()))?;
        tracing::info!("Loaded spatial embedding: {} vertices × {} dims", se.num_vertex, se.dim);
        Ok(se)
    }
}

pub fn parse_spatial_embedding(text: &str) -> Result<SpatialEmbedding> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().context("empty file")?;
    let dims: Vec<usize> = header
        .split_whitespace()
        .map(|t| t.parse::<usize>().with_context(|| format!("bad header token '{t}'")))
        .collect::<Result<_>>()?;
    let [num_vertex, dim] = dims[..] else {
        bail!("header must be 'V D', got '{header}'");
    };
    if num_vertex == 0 || dim == 0 {
        bail!("header declares an empty embedding ({num_vertex} × {dim})");
    }

    let mut values = vec![0.0f32; num_vertex * dim];
    let mut seen   = vec![false; num_vertex];

    for line in lines {
        let mut tokens = line.split_whitespace();
        let index: usize = tokens
            .next()
            .context("missing vertex index")?
            .parse()
            .with_context(|| format!("bad vertex index in '{line}'"))?;
        if index >= num_vertex {
            bail!("vertex index {index} out of range 0..{num_vertex}");
        }
        if seen[index] {
            bail!("vertex {index} listed twice");
        }

        let row: Vec<f32> = tokens
            .map(|t| t.parse::<f32>().with_context(|| format!("vertex {index}: bad value '{t}'")))
            .collect::<Result<_>>()?;
        if row.len() != dim {
            bail!("vertex {index}: expected {dim} values, found {}", row.len());
        }

        values[index * dim..(index + 1) * dim].copy_from_slice(&row);
        seen[index] = true;
    }

    if let Some(missing) = seen.iter().position(|s| !s) {
        bail!("vertex {missing} has no embedding row");
    }
    Ok(SpatialEmbedding::new(num_vertex, dim, values))
}
