// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing what the system works
// with: images found on disk, the style-loss flavour, and the
// two abstractions the other layers implement.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// An image discovered on disk
pub mod image_record;

// Which feature statistics the style loss compares
pub mod style;

// Core abstractions (traits) that other layers implement
pub mod traits;
