//! Fixtures shared by the unit tests: a two-layer model and a random task.

use std::path::PathBuf;

use burn::backend::{Autodiff, NdArray};
use burn::module::ModuleMapper;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::tanh;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::tensor::from_vec_f32;
use crate::core::{BatchRequest, TrajectoryBatch, TrajectorySource};
use crate::engine::{LayeredModule, SequenceModel};
use crate::error::Result;

pub type TestBackend = NdArray<f32>;
pub type TestAutodiffBackend = Autodiff<NdArray<f32>>;

/// Unique, not yet created directory under the system temp dir.
pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("actor-critic-{}", uuid::Uuid::new_v4()))
}

/// `Linear -> tanh -> Linear`, applied per timestep.
#[derive(Module, Debug)]
pub struct TwoLayerNet<B: Backend> {
    hidden: Linear<B>,
    head: Linear<B>,
}

impl<B: Backend> TwoLayerNet<B> {
    pub fn new(d_input: usize, d_hidden: usize, d_output: usize, device: &B::Device) -> Self {
        Self {
            hidden: LinearConfig::new(d_input, d_hidden).init(device),
            head: LinearConfig::new(d_hidden, d_output).init(device),
        }
    }
}

impl<B: Backend> LayeredModule<B> for TwoLayerNet<B> {
    fn num_layers(&self) -> usize {
        2
    }

    fn map_layer<M: ModuleMapper<B>>(self, index: usize, mapper: &mut M) -> Self {
        match index {
            0 => Self {
                hidden: self.hidden.map(mapper),
                ..self
            },
            1 => Self {
                head: self.head.map(mapper),
                ..self
            },
            _ => self,
        }
    }
}

impl<B: Backend> SequenceModel<B> for TwoLayerNet<B> {
    fn forward(&self, observations: Tensor<B, 3>) -> Tensor<B, 3> {
        self.head.forward(tanh(self.hidden.forward(observations)))
    }
}

/// Random discrete-action task.
///
/// Records every request and every `end_epoch` call. With `fixed_shape`
/// set, it ignores the requested batch size and length.
pub struct ToyTask<B: Backend> {
    rng: StdRng,
    device: B::Device,
    pub obs_dim: usize,
    pub n_actions: usize,
    pub gamma: f32,
    pub fixed_shape: Option<(usize, usize)>,
    pub requests: Vec<BatchRequest>,
    pub ended_epochs: Vec<usize>,
}

impl<B: Backend> ToyTask<B> {
    pub fn new(obs_dim: usize, n_actions: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            device: Default::default(),
            obs_dim,
            n_actions,
            gamma: 0.9,
            fixed_shape: None,
            requests: Vec::new(),
            ended_epochs: Vec::new(),
        }
    }

    pub fn with_fixed_shape(mut self, batch_size: usize, length: usize) -> Self {
        self.fixed_shape = Some((batch_size, length));
        self
    }
}

impl<B: Backend> TrajectorySource<B> for ToyTask<B> {
    fn trajectory_batch(&mut self, request: &BatchRequest) -> Result<TrajectoryBatch<B>> {
        self.requests.push(request.clone());
        let (b, l) = self
            .fixed_shape
            .unwrap_or((request.batch_size, request.max_slice_length));

        let observations: Vec<f32> = (0..b * l * self.obs_dim)
            .map(|_| self.rng.gen_range(-1.0..1.0))
            .collect();
        let actions: Vec<f32> = (0..b * l)
            .map(|_| self.rng.gen_range(0..self.n_actions) as f32)
            .collect();
        let rewards: Vec<f32> = (0..b * l).map(|_| self.rng.gen::<f32>()).collect();

        let mut returns = vec![0.0; b * l];
        for row in 0..b {
            let mut running = 0.0;
            for t in (0..l).rev() {
                running = rewards[row * l + t] + self.gamma * running;
                returns[row * l + t] = running;
            }
        }

        let uniform_log_prob = -(self.n_actions as f32).ln();
        Ok(TrajectoryBatch {
            observations: from_vec_f32(observations, [b, l, self.obs_dim], &self.device)?,
            actions: from_vec_f32(actions, [b, l, 1], &self.device)?,
            rewards: from_vec_f32(rewards, [b, l], &self.device)?,
            returns: from_vec_f32(returns, [b, l], &self.device)?,
            log_probs: Tensor::full([b, l], uniform_log_prob, &self.device),
            mask: Tensor::ones([b, l], &self.device),
        })
    }

    fn gamma(&self) -> f32 {
        self.gamma
    }

    fn end_epoch(&mut self, epoch: usize) -> Result<()> {
        self.ended_epochs.push(epoch);
        Ok(())
    }
}
