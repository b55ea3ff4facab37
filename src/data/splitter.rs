// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles the content images with a seeded RNG and holds out a
// fraction for validation. The seed makes the split stable
// across resumed runs, so validation images never leak into
// training after a restart.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// With two or more samples and `val_fraction > 0`, each side keeps
/// at least one sample.
pub fn split_train_val<T>(mut samples: Vec<T>, val_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let mut val_len = ((total as f64) * val_fraction.clamp(0.0, 1.0)).round() as usize;
    if total >= 2 && val_fraction > 0.0 {
        val_len = val_len.clamp(1, total - 1);
    } else {
        val_len = val_len.min(total);
    }

    let val = samples.split_off(total - val_len);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}
