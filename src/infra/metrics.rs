// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch to checkpoints/metrics.csv:
//
//   epoch,step,d_loss,g_loss,content_loss,style_loss,adv_loss,val_content_loss,val_style_loss
//   1,250,0.693100,4.210000,1.880000,0.212000,0.701000,1.950000,0.230000
//
// Training columns are averages over the epoch's batches.
// Validation columns are NaN when the validation split is empty.
//
// Reading the curves:
//   - d_loss pinned near 0 → the discriminator has won; lower its lr
//   - content_loss rising while style_loss falls → style weight too high

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const CSV_HEADER: &str =
    "epoch,step,d_loss,g_loss,content_loss,style_loss,adv_loss,val_content_loss,val_style_loss";

/// Loss values of one optimisation step (or an average of many).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepLosses {
    pub d_loss:       f64,
    pub g_loss:       f64,
    pub content_loss: f64,
    pub style_loss:   f64,
    pub adv_loss:     f64,
}

/// Running mean of [`StepLosses`].
#[derive(Debug, Clone, Default)]
pub struct LossAccumulator {
    sum:   StepLosses,
    count: usize,
}

impl LossAccumulator {
    pub fn add(&mut self, l: StepLosses) {
        self.sum.d_loss       += l.d_loss;
        self.sum.g_loss       += l.g_loss;
        self.sum.content_loss += l.content_loss;
        self.sum.style_loss   += l.style_loss;
        self.sum.adv_loss     += l.adv_loss;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Average so far; all NaN if nothing was added.
    pub fn mean(&self) -> StepLosses {
        if self.count == 0 {
            return StepLosses {
                d_loss:       f64::NAN,
                g_loss:       f64::NAN,
                content_loss: f64::NAN,
                style_loss:   f64::NAN,
                adv_loss:     f64::NAN,
            };
        }
        let n = self.count as f64;
        StepLosses {
            d_loss:       self.sum.d_loss / n,
            g_loss:       self.sum.g_loss / n,
            content_loss: self.sum.content_loss / n,
            style_loss:   self.sum.style_loss / n,
            adv_loss:     self.sum.adv_loss / n,
        }
    }
}

/// One row of the metrics CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number
    pub epoch: usize,
    /// Global step at the end of the epoch
    pub step:  usize,
    pub train: StepLosses,
    pub val_content_loss: f64,
    pub val_style_loss:   f64,
}

impl EpochMetrics {
    fn csv_row(&self) -> String {
        format!(
            "{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            self.epoch,
            self.step,
            self.train.d_loss,
            self.train.g_loss,
            self.train.content_loss,
            self.train.style_loss,
            self.train.adv_loss,
            self.val_content_loss,
            self.val_style_loss,
        )
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the header only when the file is new, so a resumed run
    /// keeps appending to the same log.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let csv_path = Self::prepare(dir)?;
        if !csv_path.exists() {
            Self::write_header(&csv_path)?;
        }
        Ok(Self { csv_path })
    }

    /// Start an empty log, discarding rows from any earlier run.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let csv_path = Self::prepare(dir)?;
        Self::write_header(&csv_path)?;
        Ok(Self { csv_path })
    }

    fn prepare(dir: impl Into<PathBuf>) -> Result<PathBuf> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(dir.join("metrics.csv"))
    }

    fn write_header(csv_path: &Path) -> Result<()> {
        let mut f = fs::File::create(csv_path)?;
        writeln!(f, "{CSV_HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        Ok(())
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(f, "{}", m.csv_row())?;

        tracing::debug!(
            "Logged epoch {} metrics: d_loss={:.4}, g_loss={:.4}",
            m.epoch,
            m.train.d_loss,
            m.train.g_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn losses(v: f64) -> StepLosses {
        StepLosses { d_loss: v, g_loss: v, content_loss: v, style_loss: v, adv_loss: v }
    }

    #[test]
    fn test_accumulator_mean() {
        let mut acc = LossAccumulator::default();
        acc.add(losses(1.0));
        acc.add(losses(3.0));
        assert_eq!(acc.count(), 2);
        assert_eq!(acc.mean(), losses(2.0));
    }

    #[test]
    fn test_empty_accumulator_is_nan() {
        assert!(LossAccumulator::default().mean().g_loss.is_nan());
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let tmp = tempfile::tempdir().unwrap();
        let m = EpochMetrics {
            epoch: 1,
            step:  10,
            train: losses(0.5),
            val_content_loss: f64::NAN,
            val_style_loss:   0.25,
        };

        MetricsLogger::new(tmp.path()).unwrap().log(&m).unwrap();
        // A second logger (resumed run) must not repeat the header
        MetricsLogger::new(tmp.path()).unwrap().log(&m).unwrap();

        let text  = fs::read_to_string(tmp.path().join("metrics.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "1,10,0.500000,0.500000,0.500000,0.500000,0.500000,NaN,0.250000");
    }

    #[test]
    fn test_create_discards_earlier_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let m = EpochMetrics {
            epoch: 1,
            step:  4,
            train: losses(1.0),
            val_content_loss: 0.1,
            val_style_loss:   0.2,
        };
        MetricsLogger::new(tmp.path()).unwrap().log(&m).unwrap();

        let logger = MetricsLogger::create(tmp.path()).unwrap();
        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec![CSV_HEADER]);
    }
}
