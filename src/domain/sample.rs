// ============================================================
// Layer 3 — Traffic Sample
// ============================================================
// One sliding window cut from a traffic series:
//
//   x:  [num_his,  V]              normalised history
//   te: [num_his + num_pred, 2]    (day_of_week, time_of_day)
//   y:  [num_pred, V]              raw future readings
//
// All three are stored flat, row-major.

use serde::{Deserialize, Serialize};

/// Calendar position of one time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEncoding {
    /// Monday = 0 … Sunday = 6
    pub day_of_week: u32,
    /// Slot index within the day, `0..steps_per_day`
    pub time_of_day: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSample {
    pub x:  Vec<f32>,
    pub te: Vec<TimeEncoding>,
    pub y:  Vec<f32>,
}

impl TrafficSample {
    pub fn num_his(&self, num_vertex: usize) -> usize {
        self.x.len() / num_vertex
    }

    pub fn num_pred(&self, num_vertex: usize) -> usize {
        self.y.len() / num_vertex
    }
}
