//! Workload profiles and utilities for benchmarking vmarena.
//!
//! A [`Workload`] is the allocation pattern of a small dense network (MNIST
//! shaped: 784 inputs, one hidden layer, 10 outputs) living in one large
//! arena:
//!
//! - [`training_step_profile`]: parameters and their gradients stay live,
//!   and every step pushes activations and activation gradients, then pops
//!   back.
//! - [`inference_profile`]: parameters stay live, and every step pushes
//!   only the forward activations.
//!
//! [`run_step`] replays one step against an arena.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use vmarena_arena::Arena;
use vmarena_core::{mib, ArenaConfig, ArenaError, PageBackend};

const F32: usize = std::mem::size_of::<f32>();

/// An allocation pattern: buffers pushed once, then buffers pushed per step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workload {
    /// Arena the workload is sized for.
    pub config: ArenaConfig,
    /// Byte sizes pushed once when the model is built.
    pub persistent: Vec<usize>,
    /// Byte sizes pushed on every step and popped at its end.
    pub per_step: Vec<usize>,
}

impl Workload {
    /// Total bytes requested by one step, before alignment.
    pub fn step_bytes(&self) -> usize {
        self.per_step.iter().sum()
    }

    /// Total bytes requested when building the model, before alignment.
    pub fn persistent_bytes(&self) -> usize {
        self.persistent.iter().sum()
    }
}

/// One model per arena: 256 MiB reserved, committed 1 MiB at a time.
fn model_arena() -> ArenaConfig {
    ArenaConfig::new(mib(256), mib(1))
}

fn layer_params(inputs: usize, outputs: usize) -> [usize; 2] {
    [inputs * outputs * F32, outputs * F32]
}

/// Training on batches of `batch` images through a `hidden`-wide layer.
///
/// Persistent: weights and biases for both layers plus a gradient buffer
/// for each. Per step: labels, the activations of every layer including
/// the softmax output, and a gradient for every activation past the input.
pub fn training_step_profile(batch: usize, hidden: usize) -> Workload {
    let mut persistent = Vec::new();
    for (inputs, outputs) in [(784, hidden), (hidden, 10)] {
        let params = layer_params(inputs, outputs);
        persistent.extend(params);
        persistent.extend(params);
    }
    let activations = [784, hidden, hidden, 10, 10].map(|width| batch * width * F32);
    let mut per_step = vec![batch * 10 * F32];
    per_step.extend(activations);
    per_step.extend(&activations[1..]);
    Workload {
        config: model_arena(),
        persistent,
        per_step,
    }
}

/// Single-image inference through a `hidden`-wide layer.
pub fn inference_profile(hidden: usize) -> Workload {
    let mut persistent = Vec::new();
    for (inputs, outputs) in [(784, hidden), (hidden, 10)] {
        persistent.extend(layer_params(inputs, outputs));
    }
    Workload {
        config: model_arena(),
        persistent,
        per_step: [784, hidden, 10, 10].map(|width| width * F32).to_vec(),
    }
}

/// Push the workload's persistent buffers, zeroed.
pub fn build_model<B: PageBackend>(arena: &Arena<B>, workload: &Workload) -> Result<(), ArenaError> {
    for &size in &workload.persistent {
        arena.push(size, true)?;
    }
    Ok(())
}

/// Push one step's buffers and rewind. Returns the high-water offset.
pub fn run_step<B: PageBackend>(
    arena: &mut Arena<B>,
    workload: &Workload,
) -> Result<usize, ArenaError> {
    let start = arena.pos();
    for &size in &workload.per_step {
        arena.push(size, false)?;
    }
    let high = arena.pos();
    arena.pop_to(start);
    Ok(high)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_profile_fits_its_arena() {
        let workload = training_step_profile(64, 16);
        let mut arena = Arena::new(workload.config).unwrap();
        build_model(&arena, &workload).unwrap();
        let model_end = arena.pos();
        let high = run_step(&mut arena, &workload).unwrap();
        assert!(high - model_end >= workload.step_bytes());
        assert_eq!(arena.pos(), model_end);
    }

    #[test]
    fn steps_reuse_committed_memory() {
        let workload = training_step_profile(32, 16);
        let mut arena = Arena::new(workload.config).unwrap();
        build_model(&arena, &workload).unwrap();
        run_step(&mut arena, &workload).unwrap();
        let commit_pos = arena.commit_pos();
        for _ in 0..10 {
            run_step(&mut arena, &workload).unwrap();
        }
        assert_eq!(arena.commit_pos(), commit_pos);
    }

    #[test]
    fn inference_is_smaller_than_training() {
        let infer = inference_profile(16);
        let train = training_step_profile(1, 16);
        assert!(infer.persistent_bytes() < train.persistent_bytes());
        assert!(infer.step_bytes() < train.step_bytes());
    }

    #[test]
    fn mnist_parameter_count() {
        let workload = inference_profile(16);
        let params = 784 * 16 + 16 + 16 * 10 + 10;
        assert_eq!(workload.persistent_bytes(), params * 4);
    }
}
