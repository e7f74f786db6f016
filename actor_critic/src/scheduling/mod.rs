//! Learning rate scheduling module.
//!
//! ## Available Schedulers
//!
//! - [`ConstantLR`]: No scheduling (constant rate)
//! - [`LinearDecay`]: Linear interpolation from start to end LR
//! - [`Warmup`]: Wrapper for linear warmup phase before any scheduler
//! - [`MultifactorSchedule`]: `constant * linear_warmup * rsqrt_decay`
//!
//! [`ScheduleConfig`] is the serializable form used in trainer configs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use actor_critic::scheduling::{LRScheduler, MultifactorSchedule};
//!
//! let schedule = MultifactorSchedule::new(0.1, 400);
//! let lr = schedule.get_lr(step);
//! ```

pub mod lr_scheduler;

#[cfg(test)]
mod tests;

pub use lr_scheduler::{
    ConstantLR, LRScheduler, LinearDecay, MultifactorSchedule, ScheduleConfig, Warmup,
};
