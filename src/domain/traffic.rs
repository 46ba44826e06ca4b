// ============================================================
// Layer 3 — Traffic Series
// ============================================================
// Readings of V sensors at consecutive time steps, stored
// row-major as [steps, V]. A reading of 0.0 means "missing".

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Value used for missing readings, both in files and in labels.
pub const NULL_READING: f32 = 0.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficSeries {
    /// Sensor identifiers in column order (the vertex order)
    pub sensors:    Vec<String>,
    /// One timestamp per row
    pub timestamps: Vec<NaiveDateTime>,
    /// Row-major readings, `timestamps.len() × sensors.len()`
    pub readings:   Vec<f32>,
}

impl TrafficSeries {
    pub fn new(sensors: Vec<String>, timestamps: Vec<NaiveDateTime>, readings: Vec<f32>) -> Self {
        debug_assert_eq!(readings.len(), sensors.len() * timestamps.len());
        Self { sensors, timestamps, readings }
    }

    pub fn num_steps(&self) -> usize {
        self.timestamps.len()
    }

    pub fn num_sensors(&self) -> usize {
        self.sensors.len()
    }

    /// Rows `range` as a new series sharing the sensor list.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        let v = self.num_sensors();
        Self {
            sensors:    self.sensors.clone(),
            timestamps: self.timestamps[range.clone()].to_vec(),
            readings:   self.readings[range.start * v..range.end * v].to_vec(),
        }
    }

    /// Fraction of readings equal to [`NULL_READING`].
    pub fn missing_ratio(&self) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        let missing = self.readings.iter().filter(|&&r| r == NULL_READING).count();
        missing as f64 / self.readings.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series() -> TrafficSeries {
        let t0 = NaiveDate::from_ymd_opt(2012, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let timestamps = (0..3).map(|i| t0 + chrono::Duration::minutes(5 * i)).collect();
        TrafficSeries::new(
            vec!["a".into(), "b".into()],
            timestamps,
            vec![1.0, 2.0, 3.0, 0.0, 5.0, 6.0],
        )
    }

    #[test]
    fn test_slice_keeps_sensor_order() {
        let s = series().slice(1..3);
        assert_eq!(s.num_steps(), 2);
        assert_eq!(s.sensors, vec!["a", "b"]);
        assert_eq!(s.readings, vec![3.0, 0.0, 5.0, 6.0]);
    }

    #[test]
    fn test_missing_ratio() {
        assert!((series().missing_ratio() - 1.0 / 6.0).abs() < 1e-12);
    }
}
