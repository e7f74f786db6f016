//! Training loggers for the subtrainers.
//!
//! Provides different logging backends for per-step and per-epoch metrics.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// Metrics of one optimizer step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Name of the subtrainer that took the step ("value" or "policy").
    pub trainer: String,
    /// Epoch index of the subtrainer.
    pub epoch: usize,
    /// Global optimizer step (counts across epochs).
    pub step: usize,
    /// Loss before the update.
    pub loss: f32,
    /// Learning rate used for the update.
    pub learning_rate: f64,
}

impl StepRecord {
    pub fn new(trainer: impl Into<String>, epoch: usize, step: usize, loss: f32) -> Self {
        Self {
            trainer: trainer.into(),
            epoch,
            step,
            loss,
            learning_rate: 0.0,
        }
    }

    /// Set learning rate.
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }
}

/// Aggregate metrics of one subtrainer epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    pub trainer: String,
    pub epoch: usize,
    /// Steps run in this epoch.
    pub steps: usize,
    /// Mean loss over the epoch's steps (0 when no step ran).
    pub mean_loss: f32,
    /// Loss of the final step.
    pub last_loss: f32,
    /// Learning rate of the final step.
    pub learning_rate: f64,
}

impl EpochSummary {
    /// Summary of an epoch from its per-step records.
    pub fn from_records(trainer: impl Into<String>, epoch: usize, records: &[StepRecord]) -> Self {
        let steps = records.len();
        let mean_loss = if steps == 0 {
            0.0
        } else {
            records.iter().map(|r| r.loss).sum::<f32>() / steps as f32
        };
        let (last_loss, learning_rate) = records
            .last()
            .map(|r| (r.loss, r.learning_rate))
            .unwrap_or((0.0, 0.0));

        Self {
            trainer: trainer.into(),
            epoch,
            steps,
            mean_loss,
            last_loss,
            learning_rate,
        }
    }
}

/// Logger trait for different logging backends.
pub trait MetricsLogger: Send {
    /// Log one optimizer step.
    fn log_step(&mut self, record: &StepRecord);

    /// Log the end of an epoch.
    fn log_epoch(&mut self, _summary: &EpochSummary) {}

    /// Flush any buffered output.
    fn flush(&mut self);
}

/// Logger writing through the `log` facade.
///
/// Steps go to `debug` every `log_interval` steps; epoch summaries go to `info`.
pub struct LogLogger {
    log_interval: usize,
    last_log_step: Option<usize>,
}

impl LogLogger {
    /// # Arguments
    ///
    /// * `log_interval` - Steps between step entries
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
            last_log_step: None,
        }
    }

    fn due(&self, step: usize) -> bool {
        match self.last_log_step {
            None => true,
            Some(last) => step >= last + self.log_interval,
        }
    }
}

impl Default for LogLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl MetricsLogger for LogLogger {
    fn log_step(&mut self, record: &StepRecord) {
        if !self.due(record.step) {
            return;
        }
        log::debug!(
            "[{}] epoch {} step {}: loss {:.6}, lr {:.3e}",
            record.trainer,
            record.epoch,
            record.step,
            record.loss,
            record.learning_rate
        );
        self.last_log_step = Some(record.step);
    }

    fn log_epoch(&mut self, summary: &EpochSummary) {
        log::info!(
            "[{}] epoch {} done: {} steps, mean loss {:.6}, last loss {:.6}",
            summary.trainer,
            summary.epoch,
            summary.steps,
            summary.mean_loss,
            summary.last_loss
        );
    }

    fn flush(&mut self) {}
}

/// CSV file logger, one row per step.
///
/// Appends to an existing file so that a resumed run keeps its history; the
/// header is written only into an empty file.
pub struct CSVLogger {
    writer: BufWriter<File>,
    start_time: Instant,
}

impl CSVLogger {
    pub const HEADER: &'static str = "trainer,epoch,step,loss,learning_rate,elapsed_secs";

    /// Open (or create) the CSV file at `path`.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);

        if is_empty {
            writeln!(writer, "{}", Self::HEADER)?;
        }

        Ok(Self {
            writer,
            start_time: Instant::now(),
        })
    }
}

impl MetricsLogger for CSVLogger {
    fn log_step(&mut self, record: &StepRecord) {
        let elapsed = self.start_time.elapsed().as_secs_f32();
        if let Err(e) = writeln!(
            self.writer,
            "{},{},{},{:.6},{:.8},{:.2}",
            record.trainer, record.epoch, record.step, record.loss, record.learning_rate, elapsed
        ) {
            log::warn!("failed to write metrics row: {e}");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::warn!("failed to flush metrics file: {e}");
        }
    }
}

impl Drop for CSVLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Multi-logger that writes to multiple backends.
pub struct MultiLogger {
    loggers: Vec<Box<dyn MetricsLogger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self {
            loggers: Vec::new(),
        }
    }

    /// Add a logger.
    pub fn add<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl Default for MultiLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsLogger for MultiLogger {
    fn log_step(&mut self, record: &StepRecord) {
        for logger in &mut self.loggers {
            logger.log_step(record);
        }
    }

    fn log_epoch(&mut self, summary: &EpochSummary) {
        for logger in &mut self.loggers {
            logger.log_epoch(summary);
        }
    }

    fn flush(&mut self) {
        for logger in &mut self.loggers {
            logger.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<StepRecord> {
        vec![
            StepRecord::new("value", 0, 1, 2.0).with_learning_rate(1e-3),
            StepRecord::new("value", 0, 2, 1.0).with_learning_rate(2e-3),
        ]
    }

    fn temp_csv() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("metrics-{}.csv", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_epoch_summary_from_records() {
        let summary = EpochSummary::from_records("value", 0, &records());
        assert_eq!(summary.steps, 2);
        assert!((summary.mean_loss - 1.5).abs() < 1e-6);
        assert!((summary.last_loss - 1.0).abs() < 1e-6);
        assert!((summary.learning_rate - 2e-3).abs() < 1e-12);
    }

    #[test]
    fn test_epoch_summary_without_steps() {
        let summary = EpochSummary::from_records("policy", 3, &[]);
        assert_eq!(summary.steps, 0);
        assert_eq!(summary.mean_loss, 0.0);
    }

    #[test]
    fn test_log_logger_interval() {
        let mut logger = LogLogger::new(10);
        assert!(logger.due(0));
        logger.log_step(&StepRecord::new("value", 0, 0, 1.0));
        assert!(!logger.due(5));
        assert!(logger.due(10));
    }

    #[test]
    fn test_csv_logger_appends_rows() {
        let path = temp_csv();
        {
            let mut logger = CSVLogger::new(&path).unwrap();
            for record in records() {
                logger.log_step(&record);
            }
        }
        {
            // Reopening must not write a second header.
            let mut logger = CSVLogger::new(&path).unwrap();
            logger.log_step(&StepRecord::new("value", 1, 3, 0.5));
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CSVLogger::HEADER);
        assert!(lines[1].starts_with("value,0,1,2.000000"));
        assert!(lines[3].starts_with("value,1,3,0.500000"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_multi_logger() {
        let path = temp_csv();
        let mut multi = MultiLogger::new()
            .add(LogLogger::new(1))
            .add(CSVLogger::new(&path).unwrap());
        assert_eq!(multi.len(), 2);

        let records = records();
        for record in &records {
            multi.log_step(record);
        }
        multi.log_epoch(&EpochSummary::from_records("value", 0, &records));
        multi.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);

        drop(multi);
        std::fs::remove_file(&path).unwrap();
    }
}
