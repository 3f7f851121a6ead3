//! REINFORCE demo: recover a hidden token sequence from reward alone.
//!
//! The policy is a bare logits table over (step, choice) shared across the
//! batch. Each step samples a batch of programs, rewards them by how many
//! tokens match the hidden target, and reinforces the sampled tokens with the
//! batch mean reward as the baseline.

use anyhow::Result;
use candle_core::{Tensor, Var};
use candle_nn::ops::softmax;
use candle_nn::{AdamW, Optimizer};
use clap::Parser;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;
use tracing::{info, Level};

use symbolic_reinforce::{device, fdtype, reinforce_loss, ReinforceConfig};

#[derive(Debug, Parser)]
#[command(about = "Train a toy sequence policy with the REINFORCE loss")]
struct Args {
    #[arg(long, default_value = "300", help = "Number of training steps")]
    steps: usize,

    #[arg(long, default_value = "64", help = "Programs sampled per step")]
    batch_size: usize,

    #[arg(long, default_value = "8", help = "Length of the hidden program")]
    seq_len: usize,

    #[arg(long, default_value = "6", help = "Token vocabulary size")]
    n_choices: usize,

    #[arg(long, default_value = "0.05")]
    lr: f64,

    #[arg(long, default_value = "0.9", help = "Entropy decay base gamma^t")]
    gamma_decay: f64,

    #[arg(long, default_value = "0.005")]
    entropy_weight: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
    let args = Args::parse();
    let device = device();
    let dtype = fdtype();
    let mut rng = rand::rng();

    // Hidden program the policy has to rediscover from reward alone.
    let target: Vec<usize> = (0..args.seq_len)
        .map(|_| rng.random_range(0..args.n_choices))
        .collect();
    info!(?target, "hidden program");

    let logits_table = Var::zeros((args.seq_len, args.n_choices), dtype, &device)?;
    let mut optimizer = AdamW::new_lr(vec![logits_table.clone()], args.lr)?;

    // All sampled programs run the full padded length in this toy task.
    let lengths = Tensor::from_vec(
        vec![args.seq_len as u32; args.batch_size],
        (args.batch_size,),
        &device,
    )?;

    for step in 0..args.steps {
        // Sample a batch of programs from the current policy.
        let probs = softmax(logits_table.as_tensor(), 1)?.to_vec2::<f32>()?;
        let mut actions = vec![vec![0usize; args.batch_size]; args.seq_len];
        for (t, step_probs) in probs.iter().enumerate() {
            let dist = WeightedIndex::new(step_probs.iter().copied())?;
            for n in 0..args.batch_size {
                actions[t][n] = dist.sample(&mut rng);
            }
        }

        // Reward: fraction of tokens matching the hidden program.
        let rewards_host: Vec<f32> = (0..args.batch_size)
            .map(|n| {
                let matches = (0..args.seq_len)
                    .filter(|&t| actions[t][n] == target[t])
                    .count();
                matches as f32 / args.seq_len as f32
            })
            .collect();
        let mean_reward = rewards_host.iter().sum::<f32>() / args.batch_size as f32;

        // One-hot targets for the sampled tokens.
        let mut one_hot = vec![0.0f32; args.seq_len * args.batch_size * args.n_choices];
        for t in 0..args.seq_len {
            for n in 0..args.batch_size {
                one_hot[(t * args.batch_size + n) * args.n_choices + actions[t][n]] = 1.0;
            }
        }
        let ideal_probs = Tensor::from_vec(
            one_hot,
            (args.seq_len, args.batch_size, args.n_choices),
            &device,
        )?;
        let rewards = Tensor::from_vec(rewards_host, (args.batch_size,), &device)?;

        // The table is shared across the batch; broadcast it to [T, N, C].
        let logits = logits_table
            .as_tensor()
            .unsqueeze(1)?
            .broadcast_as((args.seq_len, args.batch_size, args.n_choices))?;

        let cfg = ReinforceConfig {
            baseline: mean_reward as f64,
            gamma_decay: args.gamma_decay,
            entropy_weight: args.entropy_weight,
        };
        let loss = reinforce_loss(&logits, &ideal_probs, &rewards, &lengths, &cfg)?;
        optimizer.backward_step(&loss.total)?;

        if step % 20 == 0 {
            let total = loss.total.to_scalar::<f32>()?;
            let entropy = loss.entropy.to_scalar::<f32>()?;
            info!(step, mean_reward, total, entropy, "reinforce step");
        }
    }

    let greedy = logits_table
        .as_tensor()
        .argmax(1)?
        .to_vec1::<u32>()?
        .into_iter()
        .map(|c| c as usize)
        .collect::<Vec<_>>();
    info!(?target, ?greedy, "final greedy decode");
    Ok(())
}
