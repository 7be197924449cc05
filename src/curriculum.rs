use burn::prelude::*;

use crate::error::NtmError;

/// Grows the maximum sequence length presented to the model over
/// training episodes.
#[derive(Config, Debug)]
pub struct CurriculumConfig {
    /// Completed episodes between two consecutive increases.
    pub interval: usize,

    /// Maximum sequence length at the start of training.
    pub initial_max_length: usize,

    /// Length added at each increase.
    #[config(default = 1)]
    pub step: usize,

    /// Upper bound for the maximum length; the scheduler freezes there.
    pub ceiling: Option<usize>,
}

impl CurriculumConfig {
    /// Returns the initialized scheduler.
    ///
    /// A ceiling below the initial length or a zero interval is a fatal
    /// configuration error.
    pub fn init(&self) -> Result<Curriculum, NtmError> {
        if self.interval == 0 {
            return Err(NtmError::Config(
                "curriculum interval must be at least 1".into(),
            ));
        }
        if self.initial_max_length == 0 {
            return Err(NtmError::Config(
                "curriculum initial maximum length must be at least 1".into(),
            ));
        }
        if self.step == 0 {
            return Err(NtmError::Config("curriculum step must be at least 1".into()));
        }
        if let Some(ceiling) = self.ceiling {
            if ceiling < self.initial_max_length {
                return Err(NtmError::Config(format!(
                    "curriculum ceiling {ceiling} is below the initial maximum length {}",
                    self.initial_max_length
                )));
            }
        }
        Ok(Curriculum {
            current_max_length: self.initial_max_length,
            episodes_since_increase: 0,
            interval: self.interval,
            step: self.step,
            ceiling: self.ceiling,
        })
    }
}

/// Scheduler state machine, advanced once per completed episode.
#[derive(Debug, Clone)]
pub struct Curriculum {
    current_max_length: usize,
    episodes_since_increase: usize,
    interval: usize,
    step: usize,
    ceiling: Option<usize>,
}

impl Curriculum {
    /// Current bound for the problem collaborator to respect.
    pub fn current_max_length(&self) -> usize {
        self.current_max_length
    }

    /// Registers one completed episode.
    ///
    /// Once the ceiling is reached, further episodes leave the state
    /// unchanged.
    pub fn advance(&mut self) {
        if self.ceiling == Some(self.current_max_length) {
            return;
        }
        self.episodes_since_increase += 1;
        if self.episodes_since_increase >= self.interval {
            self.episodes_since_increase = 0;
            let next = self.current_max_length + self.step;
            self.current_max_length = match self.ceiling {
                Some(ceiling) => next.min(ceiling),
                None => next,
            };
        }
    }
}
