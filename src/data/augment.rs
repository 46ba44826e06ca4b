// ============================================================
// Layer 4 — Sensor Failure Augmentation
// ============================================================
// Simulates a broken sensor: every history reading of that
// sensor becomes the null reading, expressed in normalised
// units so the model sees exactly what a missing value in the
// raw file would have produced. Labels are left untouched.

use anyhow::{bail, Result};

use crate::data::{dataset::TrafficDataset, scaler::StandardScaler};
use crate::domain::traffic::NULL_READING;

pub fn fail_sensor(
    dataset: &TrafficDataset,
    sensor:  usize,
    scaler:  &StandardScaler,
) -> Result<TrafficDataset> {
    let v = dataset.num_vertex();
    if sensor >= v {
        bail!("sensor {sensor} out of range 0..{v}");
    }
    let null = scaler.transform(NULL_READING);
    Ok(dataset.map_history(|x| {
        for row in x.chunks_mut(v) {
            row[sensor] = null;
        }
    }))
}
