//! Policy-gradient loss over padded batches of token sequences.
//!
//! `reinforce_loss` is the per-training-step objective: negative log-likelihood
//! of the reinforced sequences weighted by `reward - baseline`, minus a decayed
//! entropy bonus. Everything is a pure function of its inputs; gradients flow
//! only through `logits`.

use anyhow::{ensure, Result};
use candle_core::{DType, Tensor};
use candle_nn::ops::{log_softmax, softmax};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::ops::{entropy_decay_mask, length_mask, safe_cross_entropy};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReinforceConfig {
    /// Offset subtracted from rewards to reduce gradient variance.
    pub baseline: f64,
    /// Base of the `gamma^t` entropy weighting along the sequence.
    /// `< 1` favors exploration on early tokens, `> 1` on late tokens.
    pub gamma_decay: f64,
    /// Weight of the entropy bonus. `0` disables it.
    pub entropy_weight: f64,
}

impl Default for ReinforceConfig {
    fn default() -> Self {
        Self {
            baseline: 0.0,
            gamma_decay: 1.0,
            entropy_weight: 0.0,
        }
    }
}

/// Loss scalar plus its components, all live tensors on the input device.
/// `total` is the one to backpropagate; `policy` and `entropy` are exposed for
/// metric logging (`entropy` is the mean decayed entropy before weighting).
#[derive(Debug, Clone)]
pub struct ReinforceLoss {
    pub total: Tensor,
    pub policy: Tensor,
    pub entropy: Tensor,
}

/// REINFORCE loss with entropy regularization and length masking.
///
/// - `logits`:      [T, N, C] unnormalized scores per step, sequence, choice
/// - `ideal_probs`: [T, N, C] target distribution per step (typically one-hot
///   of the sampled token); rows must sum to 1 along C
/// - `rewards`:     [N] scalar reward per sequence
/// - `lengths`:     [N] integer valid token count; steps `>= lengths[n]` are
///   padding and contribute nothing to either term
///
/// Returns the scalar `mean_n[(R - baseline) * neglogp_n]
/// - entropy_weight * mean_n[entropy_n]` ready for `backward()`. Rewards,
/// lengths and masks are constants with respect to the gradient.
pub fn reinforce_loss(
    logits: &Tensor,
    ideal_probs: &Tensor,
    rewards: &Tensor,
    lengths: &Tensor,
    cfg: &ReinforceConfig,
) -> Result<ReinforceLoss> {
    let (max_steps, n_train, _n_choices) = ideal_probs.dims3()?;
    ensure!(
        logits.dims() == ideal_probs.dims(),
        "reinforce_loss: logits {:?} and ideal_probs {:?} must have identical shapes",
        logits.shape(),
        ideal_probs.shape()
    );
    ensure!(
        rewards.dims1()? == n_train,
        "reinforce_loss: rewards has {} entries, expected {}",
        rewards.dims1()?,
        n_train
    );
    ensure!(
        lengths.dims1()? == n_train,
        "reinforce_loss: lengths has {} entries, expected {}",
        lengths.dims1()?,
        n_train
    );

    let device = logits.device();
    let dtype = logits.dtype();

    let lengths = lengths.to_dtype(DType::U32)?.to_vec1::<u32>()?;
    let mask_length = length_mask(&lengths, max_steps, device)?.to_dtype(dtype)?;
    let decay_mask =
        entropy_decay_mask(&lengths, max_steps, cfg.gamma_decay, device)?.to_dtype(dtype)?;

    // Normalize over the choice dim.
    let probs = softmax(logits, 2)?; // [T, N, C]
    let logprobs = log_softmax(logits, 2)?; // [T, N, C]

    // Policy gradient term: mean over the batch of (R - baseline) * neglogp.
    let neglogp_per_step = safe_cross_entropy(ideal_probs, &logprobs, 2)?; // [T, N]
    let neglogp = (neglogp_per_step * &mask_length)?.sum(0)?; // [N]
    let advantage = rewards.to_dtype(dtype)?.affine(1.0, -cfg.baseline)?; // [N]
    let policy = (advantage * neglogp)?.mean_all()?;

    // Entropy term, decayed along the sequence dim.
    let entropy_per_step = safe_cross_entropy(&probs, &logprobs, 2)?; // [T, N]
    let entropy = (entropy_per_step * decay_mask)?.sum(0)?.mean_all()?;

    let entropy_term = entropy.affine(-cfg.entropy_weight, 0.0)?;
    let total = (&policy + &entropy_term)?;
    trace!(max_steps, n_train, "reinforce loss assembled");

    Ok(ReinforceLoss {
        total,
        policy,
        entropy,
    })
}
