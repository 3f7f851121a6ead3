use anyhow::{ensure, Result};
use candle_core::{Device, Tensor};

/// Cross-entropy `-Σ_dim p · logq` that tolerates degenerate log-probabilities.
/// Wherever `p == 0` exactly, `logq` is replaced by `1` before the product, so a
/// `0 · (-inf)` entry contributes exactly 0 instead of NaN. Entries with `p > 0`
/// are untouched; a `-inf` there propagates as plain math says it should.
pub fn safe_cross_entropy<D: candle_core::shape::Dim>(
    p: &Tensor,
    logq: &Tensor,
    dim: D,
) -> Result<Tensor> {
    ensure!(
        p.shape() == logq.shape(),
        "safe_cross_entropy: p {:?} and logq {:?} must have identical shapes",
        p.shape(),
        logq.shape()
    );
    let zero = p.zeros_like()?;
    let p_is_zero = p.eq(&zero)?;
    let safe_logq = p_is_zero.where_cond(&logq.ones_like()?, logq)?;
    Ok((p * &safe_logq)?.sum(dim)?.neg()?)
}

/// Per-step validity mask for a padded batch of variable-length sequences.
/// - `lengths`: effective token count per sequence
/// - `max_steps`: padded sequence length (time dimension)
/// Returns [max_steps, N] f32 with `1.0` where `t < lengths[n]`, else `0.0`.
pub fn length_mask(lengths: &[u32], max_steps: usize, device: &Device) -> Result<Tensor> {
    let n = lengths.len();
    let mut mask = Vec::with_capacity(max_steps * n);
    for t in 0..max_steps {
        for &len in lengths {
            mask.push(if (t as u32) < len { 1.0f32 } else { 0.0 });
        }
    }
    Ok(Tensor::from_vec(mask, (max_steps, n), device)?)
}

/// Length mask scaled by `gamma_decay^t` along the time dimension, used to
/// weight the entropy bonus along the sequence. `gamma_decay < 1` favors
/// exploration on early tokens, `gamma_decay > 1` on late tokens, and
/// `gamma_decay == 1` degenerates to the plain length mask.
pub fn entropy_decay_mask(
    lengths: &[u32],
    max_steps: usize,
    gamma_decay: f64,
    device: &Device,
) -> Result<Tensor> {
    let decay: Vec<f32> = (0..max_steps)
        .map(|t| gamma_decay.powi(t as i32) as f32)
        .collect();
    let decay = Tensor::from_vec(decay, (max_steps, 1), device)?;
    let mask = length_mask(lengths, max_steps, device)?;
    Ok(mask.broadcast_mul(&decay)?)
}
