// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case drives the other layers through one workflow:
//
//   train_use_case.rs    — load data, train, score the best model
//   evaluate_use_case.rs — per-step metrics on validation + test
//   failure_use_case.rs  — simulated sensor failures on validation
//
// No model math and no file formats here; only coordination.

/// The training workflow and its persisted configuration
pub mod train_use_case;

/// Checkpoint evaluation
pub mod evaluate_use_case;

/// Sensor-failure simulation
pub mod failure_use_case;
