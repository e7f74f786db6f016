//! Advantage estimation for policy batches.
//!
//! With a TD horizon `n` (the extra slice length of policy batches):
//!
//! ```text
//! n = 0:  A_t = G_t - V(s_t)
//! n > 0:  A_t = Σ_{i=0}^{n-1} γ^i r_{t+i} + γ^n V(s_{t+n}) - V(s_t),   t < L - n
//! ```
//!
//! where `G_t` is the recorded return. The last `n` timesteps only serve as
//! look-ahead, so the output is `n` steps shorter than the input.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::core::tensor::{from_vec_f32, to_vec_f32};
use crate::error::{ensure_shape, Result, TrainerError};

/// Advantages for one trajectory slice.
///
/// # Arguments
///
/// * `rewards` - rewards r_t [L]
/// * `returns` - recorded returns G_t [L]
/// * `values` - value estimates V(s_t) [L]
/// * `gamma` - discount factor
/// * `td` - TD horizon n
///
/// # Returns
///
/// Advantages [L - n]. Fails if the inputs differ in length or if `td`
/// leaves no timesteps.
pub fn advantage_row(
    rewards: &[f32],
    returns: &[f32],
    values: &[f32],
    gamma: f32,
    td: usize,
) -> Result<Vec<f32>> {
    let len = rewards.len();
    ensure_shape("advantage returns", &[returns.len()], &[len])?;
    ensure_shape("advantage values", &[values.len()], &[len])?;
    check_horizon(td, len)?;

    if td == 0 {
        return Ok(returns.iter().zip(values).map(|(g, v)| g - v).collect());
    }

    let bootstrap_discount = gamma.powi(td as i32);
    let advantages = (0..len - td)
        .map(|t| {
            let mut discount = 1.0f32;
            let mut n_step_return = 0.0f32;
            for reward in &rewards[t..t + td] {
                n_step_return += discount * reward;
                discount *= gamma;
            }
            n_step_return + bootstrap_discount * values[t + td] - values[t]
        })
        .collect();
    Ok(advantages)
}

fn check_horizon(td: usize, len: usize) -> Result<()> {
    if td >= len {
        return Err(TrainerError::Config(format!(
            "td horizon {td} leaves no timesteps in slices of length {len}"
        )));
    }
    Ok(())
}

/// Batched advantages: `[B, L]` inputs to `[B, L - td]` output.
pub fn calculate_advantage<B: Backend>(
    rewards: Tensor<B, 2>,
    returns: Tensor<B, 2>,
    values: Tensor<B, 2>,
    gamma: f32,
    td: usize,
) -> Result<Tensor<B, 2>> {
    let dims = rewards.dims();
    ensure_shape("advantage returns", &returns.dims(), &dims)?;
    ensure_shape("advantage values", &values.dims(), &dims)?;
    let [batch, len] = dims;
    check_horizon(td, len)?;

    let device = rewards.device();
    let rewards = to_vec_f32(rewards)?;
    let returns = to_vec_f32(returns)?;
    let values = to_vec_f32(values)?;

    let out_len = len - td;
    let mut advantages = Vec::with_capacity(batch * out_len);
    for row in 0..batch {
        let span = row * len..(row + 1) * len;
        advantages.extend(advantage_row(
            &rewards[span.clone()],
            &returns[span.clone()],
            &values[span],
            gamma,
            td,
        )?);
    }

    from_vec_f32(advantages, [batch, out_len], &device)
}
