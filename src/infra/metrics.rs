// ============================================================
// Layer 6 - Loss Curve Logger
// ============================================================
// Records one row per evaluation point to a CSV file:
//
//   step,epoch,train_loss,val_loss,lr
//   100,0,6.912345,6.801234,0.000300
//   200,0,5.702211,5.650027,0.000300
//   ...
//
// A resumed run appends to the file so the history of one training
// run stays in one place. A fresh run starts a new file.
//
// Output file: <checkpoint_dir>/loss_curve.csv

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One evaluation point on the loss curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalPoint {
    /// Global training step (counted across epochs)
    pub step: usize,

    /// Epoch the step belongs to (starts at 0)
    pub epoch: usize,

    /// Mean training loss since the previous evaluation
    pub train_loss: f64,

    /// Mean loss over the whole validation set
    pub val_loss: f64,

    /// Learning rate in effect at this step
    pub lr: f64,
}

/// Appends evaluation points to `loss_curve.csv`.
pub struct LossCurveLogger {
    csv_path: PathBuf,
}

impl LossCurveLogger {
    /// Create the logger. With `append` an existing curve is continued,
    /// otherwise the file is truncated and gets a fresh header.
    pub fn new(dir: impl AsRef<Path>, append: bool) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("loss_curve.csv");

        if !append || !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "step,epoch,train_loss,val_loss,lr")?;
            tracing::debug!("Started loss curve CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one evaluation point as a new row.
    pub fn log(&self, p: &EvalPoint) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6e}",
            p.step, p.epoch, p.train_loss, p.val_loss, p.lr,
        )?;

        tracing::debug!(
            "step {}: train_loss={:.4}, val_loss={:.4}",
            p.step,
            p.train_loss,
            p.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn point(step: usize) -> EvalPoint {
        EvalPoint { step, epoch: 0, train_loss: 2.5, val_loss: 2.25, lr: 3e-4 }
    }

    #[test]
    fn test_header_then_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = LossCurveLogger::new(dir.path(), false).unwrap();
        logger.log(&point(100)).unwrap();
        logger.log(&point(200)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "step,epoch,train_loss,val_loss,lr");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("100,0,2.500000,2.250000,"));
    }

    #[test]
    fn test_append_continues_the_curve() {
        let dir = tempfile::tempdir().unwrap();
        LossCurveLogger::new(dir.path(), false).unwrap().log(&point(1)).unwrap();
        LossCurveLogger::new(dir.path(), true).unwrap().log(&point(2)).unwrap();

        let text = fs::read_to_string(dir.path().join("loss_curve.csv")).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_fresh_logger_discards_old_rows() {
        let dir = tempfile::tempdir().unwrap();
        let old = LossCurveLogger::new(dir.path(), false).unwrap();
        old.log(&point(1)).unwrap();
        old.log(&point(2)).unwrap();

        LossCurveLogger::new(dir.path(), false).unwrap().log(&point(1)).unwrap();

        let text  = fs::read_to_string(dir.path().join("loss_curve.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "step,epoch,train_loss,val_loss,lr");
        assert!(lines[1].starts_with("1,"));
    }

    #[test]
    fn test_append_to_missing_file_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        LossCurveLogger::new(dir.path(), true).unwrap().log(&point(5)).unwrap();

        let text = fs::read_to_string(dir.path().join("loss_curve.csv")).unwrap();
        assert!(text.starts_with("step,epoch"));
    }
}
