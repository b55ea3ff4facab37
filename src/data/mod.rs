// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From image folders on disk to GPU-ready tensor batches:
//
//   image folder
//       │
//       ▼
//   ImageFolderLoader   → lists decodable images (header only)
//       │
//       ▼
//   split_train_val     → seeded hold-out of content images
//       │
//       ▼
//   ImageDataset        → decodes + ImagePreprocessor per sample
//       │
//       ▼
//   ImageBatcher        → stacks samples into [N, 3, H, W]
//       │
//       ▼
//   DataLoader          → feeds batches to the training loop

/// Recursively lists images in a directory
pub mod loader;

/// Resize / crop / flip and pixel-buffer conversions
pub mod preprocessor;

/// Implements Burn's Dataset trait for image files
pub mod dataset;

/// Implements Burn's Batcher trait to create image batches
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
