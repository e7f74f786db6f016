//! Generic supervised training loop over a [`LayeredModule`].

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;

use super::adam::{AdamConfig, LayerAdam};
use super::layered::LayeredModule;
use super::objective::Objective;
use super::{BatchStream, InputStream, SubTrainer};
use crate::core::tensor::to_vec_f32;
use crate::core::{ModelWeights, OptimizerState};
use crate::error::{Result, TrainerError};
use crate::metrics::{CSVLogger, EpochSummary, LogLogger, MetricsLogger, MultiLogger, StepRecord};
use crate::scheduling::{LRScheduler, ScheduleConfig};

/// File the per-step metrics are appended to inside the output directory.
pub const METRICS_FILE: &str = "metrics.csv";

/// Trains one model on batches pulled from an [`InputStream`].
///
/// Each step pulls exactly one batch, computes the objective, runs
/// `backward()` and applies one [`LayerAdam`] update with the learning rate
/// of the schedule at that step.
pub struct ModuleTrainer<B, M, O>
where
    B: AutodiffBackend,
    M: LayeredModule<B> + AutodiffModule<B>,
    O: Objective<B, M>,
{
    name: String,
    model: M,
    objective: O,
    inputs: InputStream<O::Batch>,
    stream: Option<BatchStream<O::Batch>>,
    optimizer: LayerAdam<B, M>,
    schedule: Box<dyn LRScheduler>,
    epoch: usize,
    output_dir: Option<PathBuf>,
    logger: MultiLogger,
    _backend: PhantomData<B>,
}

impl<B, M, O> ModuleTrainer<B, M, O>
where
    B: AutodiffBackend,
    M: LayeredModule<B> + AutodiffModule<B>,
    O: Objective<B, M>,
{
    /// Create a trainer with default Adam, the default schedule and no
    /// output directory.
    pub fn new(
        name: impl Into<String>,
        model: M,
        objective: O,
        inputs: InputStream<O::Batch>,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            objective,
            inputs,
            stream: None,
            optimizer: AdamConfig::default().init(),
            schedule: ScheduleConfig::default().build(),
            epoch: 0,
            output_dir: None,
            logger: MultiLogger::new().add(LogLogger::default()),
            _backend: PhantomData,
        }
    }

    /// Replace the optimizer; its state restarts from zero.
    pub fn with_optimizer(mut self, config: &AdamConfig) -> Self {
        self.optimizer = config.init();
        self
    }

    pub fn with_schedule(mut self, schedule: &ScheduleConfig) -> Self {
        self.schedule = schedule.build();
        self
    }

    /// Write metrics under `dir`, creating it (and missing parents) if absent.
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let csv = CSVLogger::new(dir.join(METRICS_FILE))?;
        self.logger = std::mem::take(&mut self.logger).add(csv);
        self.output_dir = Some(dir.to_path_buf());
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn objective(&self) -> &O {
        &self.objective
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Completed epochs.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Optimizer updates applied so far.
    pub fn step(&self) -> usize {
        self.optimizer.step_count()
    }

    fn next_batch(&mut self) -> Result<O::Batch> {
        let epoch = self.epoch;
        let stream = self
            .stream
            .get_or_insert_with(|| (self.inputs)(epoch));
        match stream.next() {
            Some(batch) => batch,
            None => Err(TrainerError::StreamExhausted(self.name.clone())),
        }
    }

    /// One optimizer update on the next batch.
    pub fn train_step(&mut self) -> Result<StepRecord> {
        let batch = self.next_batch()?;
        let loss = self.objective.loss(&self.model, batch)?;
        let loss_value = to_vec_f32(loss.clone())?.first().copied().unwrap_or_default();

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        let step = self.optimizer.step_count() + 1;
        let lr = self.schedule.get_lr(step);
        self.model = self.optimizer.step(lr, self.model.clone(), grads);

        if !loss_value.is_finite() {
            log::warn!("[{}] non-finite loss at step {}", self.name, step);
        }

        let record = StepRecord::new(self.name.clone(), self.epoch, step, loss_value)
            .with_learning_rate(lr);
        self.logger.log_step(&record);
        Ok(record)
    }
}

impl<B, M, O> SubTrainer for ModuleTrainer<B, M, O>
where
    B: AutodiffBackend,
    M: LayeredModule<B> + AutodiffModule<B>,
    O: Objective<B, M>,
{
    fn train_epoch(&mut self, n_steps: usize, n_epochs: usize) -> Result<EpochSummary> {
        let mut records = Vec::with_capacity(n_steps * n_epochs);
        for _ in 0..n_epochs {
            for _ in 0..n_steps {
                records.push(self.train_step()?);
            }
            self.epoch += 1;
        }

        let summary = EpochSummary::from_records(self.name.clone(), self.epoch, &records);
        self.logger.log_epoch(&summary);
        self.logger.flush();
        Ok(summary)
    }

    fn model_weights(&self) -> Result<ModelWeights> {
        self.model.weights()
    }

    fn set_model_weights(&mut self, weights: &ModelWeights) -> Result<()> {
        self.model = self.model.clone().load_weights(weights)?;
        Ok(())
    }

    fn optimizer_state(&self) -> Result<OptimizerState> {
        self.optimizer.state(&self.model)
    }

    fn set_optimizer_state(&mut self, state: OptimizerState) -> Result<()> {
        self.optimizer.set_state(&self.model, state)
    }
}
