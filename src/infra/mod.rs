// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the training loop and the
// stylize command:
//
//   checkpoint.rs — weights, optimiser state, training state and
//                   config persistence (CompactRecorder + JSON)
//
//   metrics.rs    — per-epoch loss averages appended to a CSV
//
//   samples.rs    — PNG preview grids (content | style | stylized)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Preview image grids
pub mod samples;
