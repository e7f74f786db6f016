//! Learning rate schedulers for the subtrainers.
//!
//! Provides common learning rate scheduling strategies:
//! - `ConstantLR`: Fixed learning rate
//! - `LinearDecay`: Linear interpolation from start to end LR
//! - `Warmup`: Wrapper for linear warmup phase
//! - `MultifactorSchedule`: `constant * linear_warmup * rsqrt_decay`, the
//!   default schedule of both subtrainers
//!
//! Schedulers are pure functions of the step: the engine owns the step
//! counter and asks for `get_lr(step)` before every optimizer update.
//!
//! # Data Integrity
//!
//! Constructors validate inputs in debug builds and sanitize them in release
//! builds, so a bad configuration never feeds NaN/Inf into the optimizer.

use serde::{Deserialize, Serialize};

/// Learning rate scheduler trait.
pub trait LRScheduler: Send + Sync {
    /// Get the learning rate for a given step.
    fn get_lr(&self, step: usize) -> f64;
}

fn sanitize_lr(lr: f64) -> f64 {
    if lr.is_finite() && lr >= 0.0 {
        lr
    } else {
        0.0
    }
}

/// Constant learning rate (no scheduling).
#[derive(Debug, Clone)]
pub struct ConstantLR {
    lr: f64,
}

impl ConstantLR {
    /// Create a new constant LR scheduler.
    ///
    /// # Panics (debug only)
    ///
    /// Panics if `lr` is NaN, Inf, or negative.
    pub fn new(lr: f64) -> Self {
        debug_assert!(lr.is_finite(), "ConstantLR: lr must be finite, got {}", lr);
        debug_assert!(lr >= 0.0, "ConstantLR: lr must be non-negative, got {}", lr);

        Self {
            lr: sanitize_lr(lr),
        }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }
}

impl LRScheduler for ConstantLR {
    fn get_lr(&self, _step: usize) -> f64 {
        self.lr
    }
}

/// Linear decay from start LR to end LR over total_steps.
///
/// After total_steps, returns end_lr (doesn't go below).
#[derive(Debug, Clone)]
pub struct LinearDecay {
    start_lr: f64,
    end_lr: f64,
    total_steps: usize,
}

impl LinearDecay {
    /// Create a new linear decay scheduler.
    ///
    /// # Panics (debug only)
    ///
    /// Panics if `total_steps` is 0 or either LR is non-finite or negative.
    pub fn new(start_lr: f64, end_lr: f64, total_steps: usize) -> Self {
        debug_assert!(
            total_steps > 0,
            "LinearDecay: total_steps must be > 0, got {}",
            total_steps
        );
        debug_assert!(
            start_lr.is_finite() && start_lr >= 0.0,
            "LinearDecay: start_lr must be finite and non-negative, got {}",
            start_lr
        );
        debug_assert!(
            end_lr.is_finite() && end_lr >= 0.0,
            "LinearDecay: end_lr must be finite and non-negative, got {}",
            end_lr
        );

        Self {
            start_lr: sanitize_lr(start_lr),
            end_lr: sanitize_lr(end_lr),
            total_steps,
        }
    }

    pub fn start_lr(&self) -> f64 {
        self.start_lr
    }

    pub fn end_lr(&self) -> f64 {
        self.end_lr
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }
}

impl LRScheduler for LinearDecay {
    fn get_lr(&self, step: usize) -> f64 {
        if self.total_steps == 0 {
            return self.start_lr;
        }

        let progress = ((step as f64) / (self.total_steps as f64)).min(1.0);
        let lr = self.start_lr + (self.end_lr - self.start_lr) * progress;

        if lr.is_finite() {
            lr
        } else {
            self.end_lr
        }
    }
}

/// Warmup wrapper for any scheduler.
///
/// Linear warmup from `warmup_start_lr` to the inner scheduler's LR over
/// `warmup_steps`, then delegates to the inner scheduler with the step shifted
/// by `warmup_steps`. `warmup_steps = 0` means no warmup phase.
#[derive(Debug, Clone)]
pub struct Warmup<S: LRScheduler> {
    inner: S,
    warmup_steps: usize,
    warmup_start_lr: f64,
}

impl<S: LRScheduler> Warmup<S> {
    /// # Panics (debug only)
    ///
    /// Panics if `warmup_start_lr` is NaN, Inf, or negative.
    pub fn new(inner: S, warmup_steps: usize, warmup_start_lr: f64) -> Self {
        debug_assert!(
            warmup_start_lr.is_finite() && warmup_start_lr >= 0.0,
            "Warmup: warmup_start_lr must be finite and non-negative, got {}",
            warmup_start_lr
        );

        Self {
            inner,
            warmup_steps,
            warmup_start_lr: sanitize_lr(warmup_start_lr),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }
}

impl<S: LRScheduler> LRScheduler for Warmup<S> {
    fn get_lr(&self, step: usize) -> f64 {
        if step >= self.warmup_steps {
            return self.inner.get_lr(step - self.warmup_steps);
        }

        let target_lr = self.inner.get_lr(0);
        let progress = (step as f64) / (self.warmup_steps as f64);
        let lr = self.warmup_start_lr + (target_lr - self.warmup_start_lr) * progress;

        if lr.is_finite() {
            lr
        } else {
            self.warmup_start_lr
        }
    }
}

/// Product-of-factors schedule: `constant * linear_warmup * rsqrt_decay`.
///
/// ```text
/// linear_warmup(step) = min(1, step / warmup_steps)
/// rsqrt_decay(step)   = 1 / sqrt(max(step, warmup_steps))
/// ```
///
/// The LR ramps up linearly to `constant / sqrt(warmup_steps)` and then
/// decays with the inverse square root of the step.
#[derive(Debug, Clone)]
pub struct MultifactorSchedule {
    constant: f64,
    warmup_steps: usize,
}

impl MultifactorSchedule {
    /// # Panics (debug only)
    ///
    /// Panics if `constant` is non-finite or negative, or `warmup_steps` is 0.
    pub fn new(constant: f64, warmup_steps: usize) -> Self {
        debug_assert!(
            constant.is_finite() && constant >= 0.0,
            "MultifactorSchedule: constant must be finite and non-negative, got {}",
            constant
        );
        debug_assert!(
            warmup_steps > 0,
            "MultifactorSchedule: warmup_steps must be > 0, got {}",
            warmup_steps
        );

        Self {
            constant: sanitize_lr(constant),
            warmup_steps: warmup_steps.max(1),
        }
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }
}

impl Default for MultifactorSchedule {
    fn default() -> Self {
        Self::new(0.1, 400)
    }
}

impl LRScheduler for MultifactorSchedule {
    fn get_lr(&self, step: usize) -> f64 {
        let warmup = self.warmup_steps as f64;
        let step = step as f64;
        let linear_warmup = (step / warmup).min(1.0);
        let rsqrt_decay = 1.0 / step.max(warmup).sqrt();
        self.constant * linear_warmup * rsqrt_decay
    }
}

/// Serializable description of a schedule.
///
/// ```json
/// { "type": "multifactor", "constant": 0.1, "warmup_steps": 400 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleConfig {
    Constant {
        lr: f64,
    },
    LinearDecay {
        start_lr: f64,
        end_lr: f64,
        total_steps: usize,
    },
    /// Linear warmup from 0 followed by a constant LR.
    WarmupConstant {
        lr: f64,
        warmup_steps: usize,
    },
    Multifactor {
        constant: f64,
        warmup_steps: usize,
    },
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig::Multifactor {
            constant: 0.1,
            warmup_steps: 400,
        }
    }
}

impl ScheduleConfig {
    /// Instantiate the described scheduler.
    pub fn build(&self) -> Box<dyn LRScheduler> {
        match *self {
            ScheduleConfig::Constant { lr } => Box::new(ConstantLR::new(lr)),
            ScheduleConfig::LinearDecay {
                start_lr,
                end_lr,
                total_steps,
            } => Box::new(LinearDecay::new(start_lr, end_lr, total_steps)),
            ScheduleConfig::WarmupConstant { lr, warmup_steps } => {
                Box::new(Warmup::new(ConstantLR::new(lr), warmup_steps, 0.0))
            }
            ScheduleConfig::Multifactor {
                constant,
                warmup_steps,
            } => Box::new(MultifactorSchedule::new(constant, warmup_steps)),
        }
    }
}
