use std::path::Path;

use burn::grad_clipping::GradientClippingConfig;
use burn::optim::{AdamWConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::CompactRecorder;
use burn::tensor::ElementConversion;
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::AutodiffBackend;

use crate::context::RunContext;
use crate::curriculum::CurriculumConfig;
use crate::error::NtmError;
use crate::ntm::{Ntm, NtmConfig};
use crate::problem::Problem;
use crate::utils::loss::{LossKind, MaskedLoss, MaskedReduction};

/// Episode-level training configuration.
#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub curriculum: CurriculumConfig,

    /// Training stops once this many episodes completed.
    pub max_episodes: usize,

    /// Training stops once an episode's loss falls below this.
    #[config(default = 1e-4)]
    pub loss_stop: f64,

    #[config(default = 16)]
    pub batch_size: usize,

    #[config(default = 1e-3)]
    pub lr: f64,

    /// Maximum gradient norm; absence disables clipping entirely.
    pub gradient_clipping: Option<f32>,

    #[config(default = "LossKind::Bce")]
    pub loss: LossKind,

    #[config(default = "MaskedReduction::Mean")]
    pub loss_reduction: MaskedReduction,

    #[config(default = 0)]
    pub seed: u64,
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), NtmError> {
        if self.max_episodes == 0 {
            return Err(NtmError::Config("max episodes must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(NtmError::Config("batch size must be at least 1".into()));
        }
        if !self.loss_stop.is_finite() || self.loss_stop < 0.0 {
            return Err(NtmError::Config(format!(
                "loss stop {} must be finite and >= 0",
                self.loss_stop
            )));
        }
        if let Some(max_norm) = self.gradient_clipping {
            if !max_norm.is_finite() || max_norm <= 0.0 {
                return Err(NtmError::Config(format!(
                    "gradient clipping norm {max_norm} must be finite and > 0"
                )));
            }
        }
        Ok(())
    }

    /// Optimizer with the configured gradient clipping attached.
    pub fn optimizer(&self) -> AdamWConfig {
        AdamWConfig::new()
            .with_grad_clipping(self.gradient_clipping.map(GradientClippingConfig::Norm))
    }
}

/// Why training stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StopReason {
    MaxEpisodes,
    LossStop,
}

/// Dual stopping conditions, checked after every episode.
///
/// The comparison uses the raw last-episode loss, not a smoothed value;
/// when both conditions trigger on the same episode, `LossStop` wins.
#[derive(Debug, Clone)]
pub struct Termination {
    max_episodes: usize,
    loss_stop: f64,
    episodes: usize,
}

impl Termination {
    pub fn new(max_episodes: usize, loss_stop: f64) -> Result<Self, NtmError> {
        if max_episodes == 0 {
            return Err(NtmError::Config("max episodes must be at least 1".into()));
        }
        if !loss_stop.is_finite() || loss_stop < 0.0 {
            return Err(NtmError::Config(format!(
                "loss stop {loss_stop} must be finite and >= 0"
            )));
        }
        Ok(Self {
            max_episodes,
            loss_stop,
            episodes: 0,
        })
    }

    /// Completed episodes so far.
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Registers one completed episode; returns the stop reason once a
    /// condition triggers.
    pub fn update(&mut self, loss: f64) -> Option<StopReason> {
        self.episodes += 1;
        if loss < self.loss_stop {
            Some(StopReason::LossStop)
        } else if self.episodes >= self.max_episodes {
            Some(StopReason::MaxEpisodes)
        } else {
            None
        }
    }
}

/// Serializable end-of-run record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrainSummary {
    pub stop_reason: StopReason,
    pub episodes: usize,
    pub final_loss: f64,
    pub final_max_length: usize,
}

/// Final model and run summary returned by [`train`].
#[derive(Debug)]
pub struct TrainOutcome<B: AutodiffBackend> {
    pub model: Ntm<B>,
    pub summary: TrainSummary,
}

/// Runs episodes until a termination condition triggers.
///
/// Per episode: a batch bounded by the curriculum scheduler, one forward
/// pass over all time steps, the masked loss, one optimizer step with
/// the configured gradient clipping, then the scheduler and termination
/// updates. Fails fast on configuration defects and aborts without retry
/// when the loss turns non-finite.
pub fn train<B: AutodiffBackend>(
    model_config: &NtmConfig,
    config: &TrainingConfig,
    problem: &mut dyn Problem<B>,
    device: &B::Device,
) -> Result<TrainOutcome<B>, NtmError> {
    model_config.validate()?;
    config.validate()?;
    if problem.input_size() != model_config.input_size {
        return Err(NtmError::Config(format!(
            "problem input size {} does not match the model input size {}",
            problem.input_size(),
            model_config.input_size
        )));
    }
    if problem.output_size() != model_config.output_size {
        return Err(NtmError::Config(format!(
            "problem output size {} does not match the model output size {}",
            problem.output_size(),
            model_config.output_size
        )));
    }

    let ctx = RunContext::new(config.seed);
    ctx.seed_backend::<B>(device);

    let mut model = model_config.init::<B>(device);
    let mut optim = config.optimizer().init::<B, Ntm<B>>();
    let mut curriculum = config.curriculum.init()?;
    let mut termination = Termination::new(config.max_episodes, config.loss_stop)?;
    let loss_fn = MaskedLoss::new(config.loss.clone(), config.loss_reduction.clone());

    loop {
        let episode = termination.episodes() + 1;
        let batch = problem.generate(curriculum.current_max_length(), config.batch_size, device);
        let [batch_size, _sequence, _input_size] = batch.input.dims();

        let state = model.init_state(batch_size, device);
        let (logits, _state) = model.forward(batch.input.clone(), state);

        let loss = loss_fn.forward(logits.clone(), batch.target.clone(), batch.mask.clone());
        let loss_value: f64 = loss.clone().into_scalar().elem();
        if !loss_value.is_finite() {
            return Err(NtmError::NumericalInstability {
                episode,
                loss: loss_value,
            });
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(config.lr, model, grads);

        let accuracy = masked_accuracy(logits.detach(), batch.target, batch.mask);
        log::info!(
            "episode {episode}: loss {loss_value:.6}, accuracy {accuracy:.4}, max length {}",
            curriculum.current_max_length()
        );

        curriculum.advance();
        if let Some(stop_reason) = termination.update(loss_value) {
            log::info!(
                "training stopped after {} episodes: {stop_reason:?}",
                termination.episodes()
            );
            return Ok(TrainOutcome {
                model,
                summary: TrainSummary {
                    stop_reason,
                    episodes: termination.episodes(),
                    final_loss: loss_value,
                    final_max_length: curriculum.current_max_length(),
                },
            });
        }
    }
}

/// Fraction of correctly recalled bits over the contributing positions.
///
/// Predictions are the rounded sigmoids of the logits.
pub fn masked_accuracy<B: Backend>(
    logits: Tensor<B, 3>,
    targets: Tensor<B, 3>,
    mask: Tensor<B, 2>,
) -> f64 {
    let [_batch, _sequence, output_size] = logits.dims();

    let predictions = sigmoid(logits).greater_equal_elem(0.5).float();
    let errors = (predictions - targets).abs();
    let mask: Tensor<B, 3> = mask.unsqueeze_dim(2);

    let wrong: f64 = (errors * mask.clone()).sum().into_scalar().elem();
    let count: f64 = (mask.sum() * (output_size as f32)).into_scalar().elem();
    if count == 0.0 {
        return 1.0;
    }
    1.0 - wrong / count
}

/// Persists the full mutable parameter set (controller, head
/// projections, output layer). The record format is the recorder's
/// concern.
pub fn save_checkpoint<B: Backend>(model: &Ntm<B>, path: impl AsRef<Path>) -> Result<(), NtmError> {
    model
        .clone()
        .save_file(path.as_ref().to_path_buf(), &CompactRecorder::new())?;
    Ok(())
}

/// Rebuilds a model from a checkpoint produced by [`save_checkpoint`].
pub fn load_checkpoint<B: Backend>(
    config: &NtmConfig,
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<Ntm<B>, NtmError> {
    config.validate()?;
    let model = config
        .init::<B>(device)
        .load_file(path.as_ref().to_path_buf(), &CompactRecorder::new(), device)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ntm::ControllerConfig;
    use crate::problem::SerialRecallConfig;

    type TB = burn::backend::NdArray<f32>;
    type AB = burn::backend::Autodiff<TB>;

    #[test]
    fn termination_reports_max_episodes_when_the_loss_never_drops() {
        let mut termination = Termination::new(10_000, 1e-4).unwrap();
        let mut stopped = None;
        for _ in 0..10_000 {
            assert!(stopped.is_none());
            stopped = termination.update(1.0);
        }
        assert_eq!(Some(StopReason::MaxEpisodes), stopped);
        assert_eq!(10_000, termination.episodes());
    }

    #[test]
    fn termination_reports_loss_stop_as_soon_as_the_loss_drops() {
        let mut termination = Termination::new(10_000, 1e-4).unwrap();
        assert_eq!(None, termination.update(0.5));
        assert_eq!(None, termination.update(2e-4));
        assert_eq!(Some(StopReason::LossStop), termination.update(5e-5));
        assert_eq!(3, termination.episodes());
    }

    #[test]
    fn termination_rejects_bad_bounds() {
        assert!(Termination::new(0, 1e-4).is_err());
        assert!(Termination::new(10, -1.0).is_err());
        assert!(Termination::new(10, f64::NAN).is_err());
    }

    #[test]
    fn masked_accuracy_ignores_masked_positions() {
        let device = Default::default();
        let logits =
            Tensor::<TB, 3>::from_floats([[[5.0, -5.0], [-5.0, -5.0]]], &device);
        let targets = Tensor::<TB, 3>::from_floats([[[1.0, 0.0], [1.0, 1.0]]], &device);
        let mask = Tensor::<TB, 2>::from_floats([[1.0, 0.0]], &device);

        let accuracy = masked_accuracy(logits, targets, mask);
        assert_eq!(1.0, accuracy);
    }

    fn smoke_configs() -> (NtmConfig, TrainingConfig) {
        let model = NtmConfig::new(6, 4, ControllerConfig::new(16))
            .with_memory_addresses(8)
            .with_memory_content_size(6);
        let training = TrainingConfig::new(CurriculumConfig::new(50, 2), 2)
            .with_batch_size(2)
            .with_loss_stop(0.0)
            .with_gradient_clipping(Some(1.0));
        (model, training)
    }

    #[test]
    fn a_short_run_completes_and_records_its_reason() {
        let device = Default::default();
        let (model_config, training_config) = smoke_configs();
        let mut ctx = RunContext::new(1);
        let mut problem = SerialRecallConfig::new().with_data_bits(4).init(&mut ctx);

        let outcome = train::<AB>(&model_config, &training_config, &mut problem, &device).unwrap();
        assert_eq!(StopReason::MaxEpisodes, outcome.summary.stop_reason);
        assert_eq!(2, outcome.summary.episodes);
        assert!(outcome.summary.final_loss.is_finite());
    }

    #[test]
    fn mismatched_problem_widths_fail_at_construction() {
        let device = Default::default();
        let (model_config, training_config) = smoke_configs();
        let mut ctx = RunContext::new(1);
        // data_bits = 8 yields input width 10, not the model's 6
        let mut problem = SerialRecallConfig::new().init(&mut ctx);

        let result = train::<AB>(&model_config, &training_config, &mut problem, &device);
        assert!(matches!(result, Err(NtmError::Config(_))));
    }

    #[test]
    fn checkpoints_round_trip_through_the_recorder() {
        let device = Default::default();
        let (model_config, _training_config) = smoke_configs();
        let model = model_config.init::<TB>(&device);

        let dir = std::env::temp_dir().join("burn-ntm-checkpoint-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("model");

        save_checkpoint(&model, &path).unwrap();
        let restored = load_checkpoint::<TB>(&model_config, &path, &device).unwrap();

        let state = restored.init_state(1, &device);
        assert_eq!([1, 8, 6], state.memory.dims());
    }
}
