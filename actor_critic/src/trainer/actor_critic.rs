//! Actor-critic orchestration.
//!
//! [`ActorCriticTrainer`] alternates a value subtrainer and a policy
//! subtrainer over batches sampled from one task:
//!
//! ```text
//!            ┌──────────── task ────────────┐
//!            │                              │
//!   value batches                     policy slices (+td)
//!            │                              │
//!            ▼                              ▼
//!     value trainer ──weights──▶ eval value model ──values──▶ policy_inputs
//!            ▲                                                     │
//!            │            shared layers [0, n)                     ▼
//!            └───────────── copy ◀──────▶ copy ───────────── policy trainer
//! ```
//!
//! Each epoch trains the value model, copies the shared prefix value→policy,
//! trains the policy and copies the prefix back policy→value.

use std::cell::{Ref, RefCell};
use std::fs;
use std::iter;
use std::marker::PhantomData;
use std::rc::Rc;

use burn::module::AutodiffModule;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;

use super::sharing::copy_model_weights;
use crate::algorithms::PolicyLoss;
use crate::config::ActorCriticConfig;
use crate::core::{
    BatchRequest, EpochScope, PolicyBatch, TrajectoryBatch, TrajectorySource, ValueBatch,
};
use crate::engine::{
    BatchStream, InputStream, LayeredModule, ModuleTrainer, PolicyObjective, SequenceModel,
    SubTrainer, ValueObjective,
};
use crate::error::{ensure_shape, Result, TrainerError};
use crate::metrics::EpochSummary;

/// Subtrainer regressing the value model on returns.
pub type ValueTrainer<B, V> = ModuleTrainer<B, V, ValueObjective>;

/// Subtrainer optimizing the policy model with loss `L`.
pub type PolicyTrainer<B, P, L> = ModuleTrainer<B, P, PolicyObjective<L>>;

/// A concrete actor-critic algorithm: how trajectories and value estimates
/// become policy inputs, and which loss the policy is trained with.
pub trait ActorCriticAlgorithm<B: Backend> {
    type Loss: PolicyLoss<B>;

    fn name(&self) -> &'static str;

    /// Whether the policy may only learn from the most recent epoch of data.
    fn on_policy(&self) -> bool;

    /// Build policy inputs from a trajectory batch and matching value
    /// estimates `[B, L]`.
    ///
    /// `td` is the extra look-ahead length of policy slices. Every algorithm
    /// must provide this; the default fails with
    /// [`TrainerError::NotImplemented`].
    fn policy_inputs(
        &self,
        _trajectory: &TrajectoryBatch<B>,
        _values: Tensor<B, 2>,
        _gamma: f32,
        _td: usize,
    ) -> Result<PolicyBatch<B>> {
        Err(TrainerError::NotImplemented("policy_inputs"))
    }

    /// The policy loss bound to this algorithm's parameters.
    fn policy_loss(&self) -> Self::Loss;
}

/// Losses of one actor-critic epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorCriticEpoch {
    pub epoch: usize,
    pub value: EpochSummary,
    pub policy: EpochSummary,
}

// ============================================================================
// Batch sources
// ============================================================================

/// Draws value batches from the task.
struct ValueBatchSource<B: Backend, T> {
    task: Rc<RefCell<T>>,
    request: BatchRequest,
    _backend: PhantomData<B>,
}

impl<B: Backend, T> Clone for ValueBatchSource<B, T> {
    fn clone(&self) -> Self {
        Self {
            task: Rc::clone(&self.task),
            request: self.request.clone(),
            _backend: PhantomData,
        }
    }
}

impl<B: Backend, T: TrajectorySource<B> + 'static> ValueBatchSource<B, T> {
    fn next_batch(&self) -> Result<ValueBatch<B>> {
        let trajectory = self.task.borrow_mut().trajectory_batch(&self.request)?;
        trajectory.validate()?;
        let [b, l] = trajectory.returns.dims();
        Ok(ValueBatch {
            observations: trajectory.observations,
            targets: trajectory.returns.reshape([b, l, 1]),
            mask: trajectory.mask.reshape([b, l, 1]),
        })
    }

    fn into_stream(self) -> BatchStream<ValueBatch<B>> {
        Box::new(iter::repeat_with(move || self.next_batch()))
    }
}

/// Draws policy batches from the task, scoring them with the latest value
/// model.
struct PolicyBatchSource<B, T, V, A>
where
    B: AutodiffBackend,
    V: SequenceModel<B> + AutodiffModule<B>,
{
    task: Rc<RefCell<T>>,
    value_trainer: Rc<RefCell<ValueTrainer<B, V>>>,
    value_eval_model: Rc<RefCell<V>>,
    algorithm: Rc<A>,
    request: BatchRequest,
    td: usize,
}

impl<B, T, V, A> Clone for PolicyBatchSource<B, T, V, A>
where
    B: AutodiffBackend,
    V: SequenceModel<B> + AutodiffModule<B>,
{
    fn clone(&self) -> Self {
        Self {
            task: Rc::clone(&self.task),
            value_trainer: Rc::clone(&self.value_trainer),
            value_eval_model: Rc::clone(&self.value_eval_model),
            algorithm: Rc::clone(&self.algorithm),
            request: self.request.clone(),
            td: self.td,
        }
    }
}

impl<B, T, V, A> PolicyBatchSource<B, T, V, A>
where
    B: AutodiffBackend,
    T: TrajectorySource<B> + 'static,
    V: SequenceModel<B> + AutodiffModule<B> + 'static,
    A: ActorCriticAlgorithm<B> + 'static,
{
    fn next_batch(&self) -> Result<PolicyBatch<B>> {
        let (trajectory, gamma) = {
            let mut task = self.task.borrow_mut();
            (task.trajectory_batch(&self.request)?, task.gamma())
        };
        trajectory.validate()?;

        // The value model keeps improving, so refresh before every estimate.
        let weights = self.value_trainer.borrow().model_weights()?;
        let model = self.value_eval_model.borrow().clone().load_weights(&weights)?;
        let values = model.forward(trajectory.observations.clone()).detach();
        *self.value_eval_model.borrow_mut() = model;

        let (batch_size, length) = (self.request.batch_size, self.request.max_slice_length);
        ensure_shape("value estimate", &values.dims(), &[batch_size, length, 1])?;
        let values = values.reshape([batch_size, length]);

        self.algorithm
            .policy_inputs(&trajectory, values, gamma, self.td)
    }

    fn into_stream(self) -> BatchStream<PolicyBatch<B>> {
        Box::new(iter::repeat_with(move || self.next_batch()))
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Trains a policy and a value model together.
///
/// The task, the value subtrainer and the evaluation copy of the value model
/// are shared with the lazy batch streams through `Rc<RefCell<_>>`; the two
/// subtrainers never run at the same time, so borrows never overlap.
pub struct ActorCriticTrainer<B, T, V, P, A>
where
    B: AutodiffBackend,
    V: SequenceModel<B> + AutodiffModule<B>,
    P: SequenceModel<B> + AutodiffModule<B>,
    A: ActorCriticAlgorithm<B>,
{
    task: Rc<RefCell<T>>,
    algorithm: Rc<A>,
    config: ActorCriticConfig,
    value_source: ValueBatchSource<B, T>,
    policy_source: PolicyBatchSource<B, T, V, A>,
    value_trainer: Rc<RefCell<ValueTrainer<B, V>>>,
    policy_trainer: PolicyTrainer<B, P, A::Loss>,
    epoch: usize,
}

impl<B, T, V, P, A> ActorCriticTrainer<B, T, V, P, A>
where
    B: AutodiffBackend,
    T: TrajectorySource<B> + 'static,
    V: SequenceModel<B> + AutodiffModule<B> + 'static,
    P: SequenceModel<B> + AutodiffModule<B>,
    A: ActorCriticAlgorithm<B> + 'static,
{
    /// Build both subtrainers.
    ///
    /// `value_model` is called twice: once for the trained value model and
    /// once for its evaluation copy. Construction pulls exactly one value
    /// batch from the task to check the value model's output shape.
    pub fn new<F>(
        task: T,
        value_model: F,
        policy_model: P,
        algorithm: A,
        config: ActorCriticConfig,
        device: &B::Device,
    ) -> Result<Self>
    where
        F: Fn(&B::Device) -> V,
    {
        config.validate()?;
        let max_slice_length = config.require_max_slice_length()?;
        let trained_value_model = value_model(device);
        check_shared_layers(&config, &trained_value_model, &policy_model)?;

        let task = Rc::new(RefCell::new(task));
        let algorithm = Rc::new(algorithm);

        let value_output_dir = config.output_dir.as_ref().map(|dir| dir.join("value"));
        if let Some(dir) = &value_output_dir {
            fs::create_dir_all(dir)?;
        }

        let value_source = ValueBatchSource {
            task: Rc::clone(&task),
            request: value_request(&config, max_slice_length),
            _backend: PhantomData,
        };
        let value_inputs: InputStream<ValueBatch<B>> = {
            let source = value_source.clone();
            Box::new(move |_epoch| source.clone().into_stream())
        };

        let mut value_trainer =
            ModuleTrainer::new("value", trained_value_model, ValueObjective, value_inputs)
                .with_optimizer(&config.value_optimizer)
                .with_schedule(&config.value_lr_schedule);
        if let Some(dir) = &value_output_dir {
            value_trainer = value_trainer.with_output_dir(dir)?;
        }
        let value_trainer = Rc::new(RefCell::new(value_trainer));

        let value_eval_model = value_model(device);
        let sample = value_source.next_batch()?;
        let output = value_eval_model.forward(sample.observations);
        ensure_shape("value model output", &output.dims(), &sample.targets.dims())?;
        let value_eval_model = Rc::new(RefCell::new(value_eval_model));

        let policy_source = PolicyBatchSource {
            task: Rc::clone(&task),
            value_trainer: Rc::clone(&value_trainer),
            value_eval_model: Rc::clone(&value_eval_model),
            algorithm: Rc::clone(&algorithm),
            request: policy_request(&config, algorithm.on_policy())?,
            td: config.added_policy_slice_length,
        };
        let policy_inputs: InputStream<PolicyBatch<B>> = {
            let source = policy_source.clone();
            Box::new(move |_epoch| source.clone().into_stream())
        };

        let objective = PolicyObjective::new(algorithm.policy_loss());
        let mut policy_trainer =
            ModuleTrainer::new("policy", policy_model, objective, policy_inputs)
                .with_optimizer(&config.policy_optimizer)
                .with_schedule(&config.policy_lr_schedule);
        if let Some(dir) = &config.output_dir {
            policy_trainer = policy_trainer.with_output_dir(dir)?;
        }

        log::info!(
            "{} trainer ready: slices {}+{}, batches {}/{}, {} shared layers",
            algorithm.name(),
            max_slice_length,
            config.added_policy_slice_length,
            config.value_batch_size,
            config.policy_batch_size,
            config.n_shared_layers
        );

        Ok(Self {
            task,
            algorithm,
            config,
            value_source,
            policy_source,
            value_trainer,
            policy_trainer,
            epoch: 0,
        })
    }

    /// Lazy, unbounded stream of value batches: observations, returns
    /// `[B, L, 1]` and mask `[B, L, 1]`.
    pub fn value_batches_stream(&self) -> BatchStream<ValueBatch<B>> {
        self.value_source.clone().into_stream()
    }

    /// Lazy, unbounded stream of policy batches built by the algorithm from
    /// fresh trajectories and current value estimates.
    pub fn policy_batches_stream(&self) -> BatchStream<PolicyBatch<B>> {
        self.policy_source.clone().into_stream()
    }

    /// Policy inputs for `trajectory` and value estimates `[B, L]`.
    pub fn policy_inputs(
        &self,
        trajectory: &TrajectoryBatch<B>,
        values: Tensor<B, 2>,
    ) -> Result<PolicyBatch<B>> {
        let gamma = self.task.borrow().gamma();
        self.algorithm.policy_inputs(
            trajectory,
            values,
            gamma,
            self.config.added_policy_slice_length,
        )
    }

    /// One value epoch and one policy epoch, with shared layers copied
    /// value→policy in between and policy→value afterwards.
    pub fn train_epoch(&mut self) -> Result<ActorCriticEpoch> {
        let n_shared = self.config.n_shared_layers;

        let value = self
            .value_trainer
            .borrow_mut()
            .train_epoch(self.config.value_train_steps_per_epoch, 1)?;
        if n_shared > 0 {
            copy_model_weights(
                0,
                n_shared,
                &*self.value_trainer.borrow(),
                &mut self.policy_trainer,
                true,
            )?;
        }

        let policy = self
            .policy_trainer
            .train_epoch(self.config.policy_train_steps_per_epoch, 1)?;
        if n_shared > 0 {
            copy_model_weights(
                0,
                n_shared,
                &self.policy_trainer,
                &mut *self.value_trainer.borrow_mut(),
                true,
            )?;
        }

        log::info!(
            "{} epoch {}: value loss {:.6}, policy loss {:.6}",
            self.algorithm.name(),
            self.epoch,
            value.mean_loss,
            policy.mean_loss
        );

        let summary = ActorCriticEpoch {
            epoch: self.epoch,
            value,
            policy,
        };
        self.epoch += 1;
        Ok(summary)
    }

    /// Train for `n_epochs`, telling the task after each epoch.
    pub fn run(&mut self, n_epochs: usize) -> Result<Vec<ActorCriticEpoch>> {
        let mut history = Vec::with_capacity(n_epochs);
        for _ in 0..n_epochs {
            let summary = self.train_epoch()?;
            self.task.borrow_mut().end_epoch(summary.epoch)?;
            history.push(summary);
        }
        Ok(history)
    }

    /// Completed epochs.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn config(&self) -> &ActorCriticConfig {
        &self.config
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    pub fn task(&self) -> Ref<'_, T> {
        self.task.borrow()
    }

    pub fn value_trainer(&self) -> Ref<'_, ValueTrainer<B, V>> {
        self.value_trainer.borrow()
    }

    pub fn policy_trainer(&self) -> &PolicyTrainer<B, P, A::Loss> {
        &self.policy_trainer
    }
}

fn check_shared_layers<B, V, P>(config: &ActorCriticConfig, value: &V, policy: &P) -> Result<()>
where
    B: Backend,
    V: LayeredModule<B>,
    P: LayeredModule<B>,
{
    let n = config.n_shared_layers;
    let available = value.num_layers().min(policy.num_layers());
    if n > available {
        return Err(TrainerError::Config(format!(
            "n_shared_layers = {n} but the value model has {} layers and the policy model {}",
            value.num_layers(),
            policy.num_layers()
        )));
    }
    Ok(())
}

fn value_request(config: &ActorCriticConfig, max_slice_length: usize) -> BatchRequest {
    BatchRequest {
        batch_size: config.value_batch_size,
        epochs: EpochScope::All,
        max_slice_length,
        include_final_state: false,
    }
}

fn policy_request(config: &ActorCriticConfig, on_policy: bool) -> Result<BatchRequest> {
    let length = config.policy_slice_length()?;
    Ok(BatchRequest {
        batch_size: config.policy_batch_size,
        epochs: EpochScope::for_on_policy(on_policy),
        max_slice_length: length,
        include_final_state: length > 1,
    })
}
