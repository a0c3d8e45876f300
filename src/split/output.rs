//! Bookkeeping of the per-group output files.

use std::{fs::File, path::PathBuf};

use indexmap::IndexMap;
use noodles_bgzf as bgzf;
use noodles_vcf as vcf;

use crate::{common::open_write_bgzf, err::Error};

/// Statistics of one written output file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OutputSummary {
    /// Path of the output file.
    pub path: PathBuf,
    /// Samples in the output file.
    pub samples: Vec<String>,
    /// Number of records written.
    pub records_written: usize,
}

/// An open output file.
struct Output {
    path: PathBuf,
    header: vcf::Header,
    writer: vcf::Writer<bgzf::Writer<File>>,
    records_written: usize,
}

/// The output files of a run, each registered exactly once per group key.
#[derive(Default)]
pub struct OutputRegistry {
    outputs: IndexMap<String, Output>,
}

impl OutputRegistry {
    /// Create the output file for `key` at `path` and write `header` to it.
    pub fn register(
        &mut self,
        key: &str,
        path: PathBuf,
        header: vcf::Header,
    ) -> Result<(), anyhow::Error> {
        if self.outputs.contains_key(key)
            || self.outputs.values().any(|output| output.path == path)
        {
            return Err(Error::DuplicateOutput(key.to_string()).into());
        }

        let mut writer = vcf::Writer::new(open_write_bgzf(&path).map_err(|e| {
            anyhow::anyhow!("could not open output file {}: {}", path.display(), e)
        })?);
        writer
            .write_header(&header)
            .map_err(|e| anyhow::anyhow!("could not write header to {}: {}", path.display(), e))?;
        tracing::debug!("opened {} for group {}", path.display(), key);

        self.outputs.insert(
            key.to_string(),
            Output {
                path,
                header,
                writer,
                records_written: 0,
            },
        );
        Ok(())
    }

    /// Append `record` to the output of `key`.
    pub fn write_record(&mut self, key: &str, record: &vcf::Record) -> Result<(), anyhow::Error> {
        let output = self
            .outputs
            .get_mut(key)
            .ok_or_else(|| anyhow::anyhow!("no output registered for group {}", key))?;
        output
            .writer
            .write_record(&output.header, record)
            .map_err(|e| anyhow::anyhow!("failed to write record: {}", e))?;
        output.records_written += 1;
        Ok(())
    }

    /// Flush and close all outputs and return their statistics.
    pub fn finish(self) -> Result<IndexMap<String, OutputSummary>, anyhow::Error> {
        self.outputs
            .into_iter()
            .map(|(key, output)| {
                output.writer.into_inner().finish().map_err(|e| {
                    anyhow::anyhow!("could not close {}: {}", output.path.display(), e)
                })?;
                let summary = OutputSummary {
                    samples: output.header.sample_names().iter().cloned().collect(),
                    path: output.path,
                    records_written: output.records_written,
                };
                Ok::<_, anyhow::Error>((key, summary))
            })
            .collect()
    }
}
