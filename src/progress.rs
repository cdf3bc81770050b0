//! Progress reporting hooks for long-running passes

use std::fmt;

/// A full pass over the record source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Pass 1: reading records and inferring the schema
    Inference,
    /// Pass 2: writing records into the store
    Ingestion,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Inference => write!(f, "[1/2] Reading records & inferring schema"),
            Phase::Ingestion => write!(f, "[2/2] Ingesting records"),
        }
    }
}

/// Receives progress notifications from the pipeline
pub trait Progress {
    /// A pass begins over `total` records
    fn start(&mut self, phase: Phase, total: usize);

    /// `records` more records were processed
    fn advance(&mut self, records: usize);

    /// The current pass is complete
    fn finish(&mut self);
}

/// Discards all progress notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _phase: Phase, _total: usize) {}

    fn advance(&mut self, _records: usize) {}

    fn finish(&mut self) {}
}
