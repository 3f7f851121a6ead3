//! REINFORCE-style loss for sequence policies that emit symbolic-program tokens.
//!
//! The loss reinforces whole token sequences ("programs") from a scalar reward
//! per sequence, with an entropy bonus decayed along the sequence dimension and
//! a length mask so padding steps of variable-length programs carry no gradient.
//!
//! The crate is a thin layer over candle: [`loss::reinforce_loss`] returns the
//! scalar as a live `Tensor` so the caller can `backward()` through it.

pub mod loss;
pub mod ops;

pub use loss::{reinforce_loss, ReinforceConfig, ReinforceLoss};
pub use ops::{entropy_decay_mask, length_mask, safe_cross_entropy};

use candle_core::{DType, Device};

pub fn device() -> Device {
    if cfg!(feature = "candle-cuda") {
        Device::new_cuda(0).unwrap()
    } else if cfg!(feature = "candle-metal") {
        Device::new_metal(0).unwrap()
    } else {
        Device::Cpu
    }
}

pub fn fdtype() -> DType {
    DType::F32
}
