use std::collections::HashMap;

use burn::prelude::*;

use crate::context::RunContext;
use crate::error::NtmError;
use crate::ntm::CellKind;
use crate::problem::{Problem, SerialRecallConfig};

/// Explicit name → value registry backing config-driven construction.
///
/// Populated at process start; no reflection involved.
pub struct Registry<T> {
    kind: &'static str,
    entries: HashMap<&'static str, T>,
}

impl<T> Registry<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    pub fn register(mut self, name: &'static str, value: T) -> Self {
        self.entries.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Result<&T, NtmError> {
        self.entries.get(name).ok_or_else(|| NtmError::UnknownName {
            kind: self.kind,
            name: name.to_owned(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

/// Controller cell variants selectable by name.
pub fn cell_registry() -> Registry<CellKind> {
    Registry::new("controller cell")
        .register("lstm", CellKind::Lstm)
        .register("gru", CellKind::Gru)
}

pub type ProblemFactory<B> = fn(&mut RunContext) -> Box<dyn Problem<B>>;

/// Problem generators selectable by name.
pub fn problem_registry<B: Backend>() -> Registry<ProblemFactory<B>> {
    Registry::new("problem").register("serial_recall", |ctx| {
        Box::new(SerialRecallConfig::new().init(ctx))
    })
}
