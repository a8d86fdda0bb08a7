use tracing::warn;

use crate::model::RunWarning;

mod dedup;
mod mapper;
mod netscape;
pub(crate) mod normalize;
mod readers;
mod run;
mod safari;
mod writer;

pub use run::run;

/// Explicit per-run accumulator for soft warnings, threaded through every
/// pipeline stage and drained into the run manifest at the end. Warnings
/// are logged as they occur so an interrupted run still shows them.
pub struct RunContext {
    warnings: Vec<RunWarning>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    pub fn record(&mut self, warning: RunWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[RunWarning] {
        &self.warnings
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<RunWarning> {
        self.warnings
    }
}
