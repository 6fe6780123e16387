//! Basics examples

use crate::Example;
use anyhow::Result;

/// # Backpropagation, one weight at a time
///
/// #### Id
/// 00.01
///
/// #### CLI command
/// ```sh
/// cargo run example 00.01
/// ```
pub struct EG01;

impl Example for EG01 {
    fn description(&self) -> String {
        String::from("Train a single weight with gradient descent, narrating every step.")
    }

    fn main(&self) -> Result<()> {
        use crate::listings::backprop::{gradient_descent, step, TrainConfig};

        let cfg = TrainConfig::default();

        println!("{}", "=".repeat(60));
        println!("Backpropagation, one weight at a time");
        println!("{}", "=".repeat(60));
        println!("Goal: map input {} to target {}", cfg.x, cfg.y);
        println!("Initial weight: {}\n", cfg.w0);

        let steps = gradient_descent(&cfg);
        for s in &steps {
            println!(
                "epoch {:2}: pred={:.3}, error={:.3}, loss={:.3}, gradient={:.3}, weight={:.3}",
                s.epoch, s.pred, s.error, s.loss, s.gradient, s.weight
            );
        }

        let final_w = steps.last().map(|s| s.weight).unwrap_or(cfg.w0);
        println!(
            "\nFinal: input {} -> output {:.3} (target: {})",
            cfg.x,
            cfg.x * final_w,
            cfg.y
        );
        println!("Learned weight: {final_w:.3}");

        println!("\n{}", "=".repeat(60));
        println!("The first step in detail");
        println!("{}", "=".repeat(60));

        let s = step(cfg.x, cfg.y, cfg.w0, cfg.lr);
        println!("\n[Setup]");
        println!("  input (x)         = {}", cfg.x);
        println!("  target (y)        = {}", cfg.y);
        println!("  weight (w)        = {}", cfg.w0);
        println!("  learning rate     = {}", cfg.lr);

        println!("\n[1. Forward pass]");
        println!("  pred = x * w = {} * {} = {}", cfg.x, cfg.w0, s.pred);

        println!("\n[2. Loss]");
        println!("  error = y - pred = {} - {} = {}", cfg.y, s.pred, s.error);
        println!("  loss  = error^2 = {}^2 = {}", s.error, s.loss);

        println!("\n[3. Backward pass]");
        println!("  loss = (y - x*w)^2, so d(loss)/dw = -2 * error * x");
        println!(
            "  gradient = -2 * {} * {} = {}",
            s.error, cfg.x, s.gradient
        );

        println!("\n[4. Weight update]");
        println!(
            "  w = w - lr * gradient = {} - {} * {} = {}",
            cfg.w0, cfg.lr, s.gradient, s.weight
        );
        println!(
            "\nThe gradient is negative, so the update *increases* the weight:"
        );
        println!("a larger weight moves the prediction toward the target.");

        println!("\n{}", "=".repeat(60));
        println!("Recap");
        println!("{}", "=".repeat(60));
        println!("1. Forward:  pred = x * w");
        println!("2. Loss:     error = y - pred, loss = error^2");
        println!("3. Backward: gradient = -2 * error * x");
        println!("4. Update:   w = w - lr * gradient");
        println!("Repeat, and the weight converges on the value that maps x to y.");
        Ok(())
    }
}
