//! Single-weight gradient descent
//!
//! The smallest possible backpropagation setup: one input, one weight, a
//! squared-error loss. The goal is to learn `w` such that `x * w == y`.

/// Hyperparameters for the walkthrough.
#[derive(Debug, Clone, Copy)]
pub struct TrainConfig {
    pub x: f64,
    pub y: f64,
    pub w0: f64,
    pub lr: f64,
    pub epochs: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 1.0,
            w0: 0.1,
            lr: 0.5,
            epochs: 20,
        }
    }
}

/// Everything computed in one forward/backward pass. `weight` is the value
/// after the update, ready for the next epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradStep {
    pub epoch: usize,
    pub pred: f64,
    pub error: f64,
    pub loss: f64,
    pub gradient: f64,
    pub weight: f64,
}

/// One gradient-descent step on `loss = (y - x*w)^2`.
///
/// The gradient is `d(loss)/dw = -2 * (y - x*w) * x`.
pub fn step(x: f64, y: f64, w: f64, lr: f64) -> GradStep {
    let pred = x * w;
    let error = y - pred;
    let loss = error * error;
    let gradient = -2.0 * error * x;
    let weight = w - lr * gradient;
    GradStep {
        epoch: 0,
        pred,
        error,
        loss,
        gradient,
        weight,
    }
}

/// Runs exactly `cfg.epochs` steps, threading the updated weight through.
pub fn gradient_descent(cfg: &TrainConfig) -> Vec<GradStep> {
    let mut w = cfg.w0;
    let mut steps = Vec::with_capacity(cfg.epochs);
    for epoch in 1..=cfg.epochs {
        let mut s = step(cfg.x, cfg.y, w, cfg.lr);
        s.epoch = epoch;
        w = s.weight;
        steps.push(s);
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rstest::*;

    const TOL: f64 = 1e-12;

    #[fixture]
    pub fn cfg() -> TrainConfig {
        TrainConfig::default()
    }

    #[rstest]
    fn test_first_step_values(cfg: TrainConfig) -> Result<()> {
        let s = step(cfg.x, cfg.y, cfg.w0, cfg.lr);

        assert!((s.pred - 0.05).abs() < TOL);
        assert!((s.error - 0.95).abs() < TOL);
        assert!((s.loss - 0.9025).abs() < TOL);
        assert!((s.gradient - (-0.95)).abs() < TOL);
        assert!((s.weight - 0.575).abs() < TOL);
        Ok(())
    }

    #[rstest]
    fn test_runs_exactly_epochs_steps(cfg: TrainConfig) -> Result<()> {
        let steps = gradient_descent(&cfg);

        assert_eq!(steps.len(), 20_usize);
        assert_eq!(steps.first().unwrap().epoch, 1_usize);
        assert_eq!(steps.last().unwrap().epoch, 20_usize);
        Ok(())
    }

    #[rstest]
    fn test_loss_is_non_increasing(cfg: TrainConfig) -> Result<()> {
        let steps = gradient_descent(&cfg);

        for pair in steps.windows(2) {
            assert!(pair[1].loss <= pair[0].loss);
        }
        Ok(())
    }

    #[rstest]
    fn test_weight_converges_to_two(cfg: TrainConfig) -> Result<()> {
        // x=0.5, y=1.0 has the exact solution w=2
        let steps = gradient_descent(&cfg);
        let w = steps.last().unwrap().weight;

        assert!((w - 2.0).abs() < 0.01);
        Ok(())
    }

    #[rstest]
    fn test_step_chains_through_loop() -> Result<()> {
        let cfg = TrainConfig::default();
        let steps = gradient_descent(&cfg);

        // the second epoch must start from the first epoch's updated weight
        let replayed = step(cfg.x, cfg.y, steps[0].weight, cfg.lr);
        assert!((replayed.pred - steps[1].pred).abs() < TOL);
        assert!((replayed.weight - steps[1].weight).abs() < TOL);
        Ok(())
    }
}
