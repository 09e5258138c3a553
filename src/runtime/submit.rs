//! Submission of a compiled topology to the runtime.
//!
//! The runtime picks up a JSON submission document:
//! { "name": ..., "mode": {...}, "config": {...}, "topology": {...} }

use crate::error::SubmitError;
use crate::runtime::config::TopologyConfig;
use crate::runtime::graph::Topology;
use serde::Serialize;
use std::io::Write;

/// Ephemeral local execution vs. durable cluster submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmitMode {
    Local { debug: bool },
    Cluster,
}

#[derive(Debug, Serialize)]
pub struct Submission<'a> {
    pub name: &'a str,
    pub mode: SubmitMode,
    pub config: &'a TopologyConfig,
    pub topology: &'a Topology,
}

pub trait Submitter {
    fn submit(&mut self, submission: &Submission<'_>) -> Result<(), SubmitError>;
}

/// Writes the submission document as pretty JSON.
pub struct ManifestSubmitter<W: Write> {
    out: W,
}

impl<W: Write> ManifestSubmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Submitter for ManifestSubmitter<W> {
    fn submit(&mut self, submission: &Submission<'_>) -> Result<(), SubmitError> {
        serde_json::to_writer_pretty(&mut self.out, submission)?;
        writeln!(self.out)?;
        self.out.flush()?;
        tracing::info!(
            "submitted topology '{}' ({} spouts, {} bolts)",
            submission.name,
            submission.topology.spouts.len(),
            submission.topology.bolts.len()
        );
        Ok(())
    }
}
