//! Tensor-level tests for the policy losses.
