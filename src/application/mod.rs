// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (training or stylizing an image).
//
// Rules for this layer:
//   - No network or loss code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination

// The training workflow
pub mod train_use_case;

// Inference: content + style image → stylized PNG
pub mod stylize_use_case;
