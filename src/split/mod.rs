//! Implementation of `vcf split` subcommand.
//!
//! Splits a multi-sample VCF file into one biallelic VCF file per sample or
//! per taxonomy. Each output file only contains the records where at least one
//! of its samples carries an ALT allele; multiallelic records are written as
//! one biallelic record per ALT allele in use.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use noodles_vcf as vcf;
use thousands::Separable;

use crate::{
    common::{self, open_read_maybe_gz},
    err::Error,
};

pub mod genotype;
pub mod grouping;
pub mod header;
pub mod output;
pub mod project;

use grouping::{Group, Grouping, TaxonomyMapping};
use output::{OutputRegistry, OutputSummary};

/// Command line arguments for `vcf split` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "split VCF into biallelic per-sample or per-taxonomy files", long_about = None)]
pub struct Args {
    /// Path to input VCF file (.vcf or .vcf.gz).
    #[clap(long)]
    pub vcf: String,
    /// Output directory for VCF files.
    #[clap(long, default_value = ".")]
    pub output_dir: String,
    /// Optional prefix for output filenames.
    #[clap(long)]
    pub prefix: Option<String>,
    /// Path to TSV file mapping sample names to taxonomy (columns: sample,
    /// taxonomy); switches to one output file per taxonomy.
    #[clap(long)]
    pub taxonomy_file: Option<String>,
    /// Optional path to write the run summary to as JSON.
    #[clap(long)]
    pub path_summary: Option<String>,
}

/// Summary of a `split_vcf` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Summary {
    /// Number of records read from the input.
    pub total_records: usize,
    /// Output files by group key.
    pub outputs: IndexMap<String, OutputSummary>,
}

/// Name of the output file for `key`.
pub fn output_file_name(prefix: Option<&str>, key: &str) -> String {
    format!("{}{}.vcf.gz", prefix.unwrap_or_default(), key)
}

/// Union of the ALT allele indices carried by the `samples` of `group`.
fn group_alt_indices(
    header: &vcf::Header,
    record: &vcf::Record,
    group: &Group,
) -> Result<BTreeSet<usize>, Error> {
    let mut result = BTreeSet::new();
    for sample in &group.samples {
        let source = header
            .sample_names()
            .get_index_of(sample)
            .and_then(|idx| record.genotypes().get_index(idx))
            .ok_or_else(|| Error::UnknownSample(sample.clone()))?;
        let gt = genotype::sample_genotype(&source).map_err(|source| Error::MalformedGenotype {
            chrom: record.chromosome().to_string(),
            pos: usize::from(record.position()),
            source,
        })?;
        result.extend(genotype::alt_allele_indices(gt.as_ref()));
    }
    Ok(result)
}

/// Split the VCF file at `path_vcf` into one file per group in `output_dir`.
///
/// Returns an empty summary without writing any file if the input has no
/// samples or no sample ends up in a group.
pub fn split_vcf<P, Q>(
    path_vcf: P,
    output_dir: Q,
    prefix: Option<&str>,
    grouping: &Grouping,
) -> Result<Summary, anyhow::Error>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_vcf = path_vcf.as_ref();
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir).map_err(|e| {
        anyhow::anyhow!(
            "could not create output directory {}: {}",
            output_dir.display(),
            e
        )
    })?;

    let mut reader = open_read_maybe_gz(path_vcf)
        .map(vcf::Reader::new)
        .map_err(|e| anyhow::anyhow!("could not open input file {}: {}", path_vcf.display(), e))?;
    let header = reader
        .read_header()
        .map_err(|e| anyhow::anyhow!("problem reading VCF header: {}", e))?;

    if header.sample_names().is_empty() {
        tracing::warn!("No samples found in {}", path_vcf.display());
        return Ok(Summary::default());
    }

    let groups = grouping.groups(&header);
    if groups.is_empty() {
        return Ok(Summary::default());
    }
    tracing::info!(
        "Found {} samples in VCF, split into {} output files",
        header.sample_names().len(),
        groups.len()
    );
    for group in &groups {
        tracing::debug!("  {}: {} samples", &group.key, group.samples.len());
    }

    let mut registry = OutputRegistry::default();
    for group in &groups {
        let output_header = header::project_header(&header, &group.samples)?;
        let path: PathBuf = output_dir.join(output_file_name(prefix, &group.key));
        registry.register(&group.key, path, output_header)?;
    }

    let start = std::time::Instant::now();
    let mut prev = std::time::Instant::now();
    let mut total_records = 0usize;
    for result in reader.records(&header) {
        let record = result.map_err(|e| anyhow::anyhow!("problem reading record: {}", e))?;
        total_records += 1;

        for group in &groups {
            for alt_index in group_alt_indices(&header, &record, group)? {
                let biallelic = project::project_record(&header, &record, alt_index, &group.samples)?;
                registry.write_record(&group.key, &biallelic)?;
            }
        }

        if prev.elapsed().as_secs() >= 60 {
            tracing::info!("at {}:{}", record.chromosome(), record.position());
            prev = std::time::Instant::now();
        }
    }

    let outputs = registry.finish()?;
    tracing::info!(
        "Processed {} variants from {} in {:?}",
        total_records.separate_with_commas(),
        path_vcf.display(),
        start.elapsed()
    );
    for (key, output) in &outputs {
        tracing::info!(
            "  {}: {} variant records written to {}",
            key,
            output.records_written.separate_with_commas(),
            output.path.display()
        );
    }

    Ok(Summary {
        total_records,
        outputs,
    })
}

/// Main entry point for `vcf split` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    common::trace_rss_now();

    let grouping = if let Some(taxonomy_file) = &args.taxonomy_file {
        tracing::info!("loading taxonomy mapping...");
        let mapping = TaxonomyMapping::from_path(taxonomy_file)?;
        tracing::info!(
            "Loaded taxonomy mapping: {} samples across {} taxonomies",
            mapping.sample_count(),
            mapping.taxonomy_to_samples().len()
        );
        Grouping::PerTaxonomy(mapping)
    } else {
        Grouping::PerSample
    };

    tracing::info!("splitting input file...");
    let summary = split_vcf(
        &args.vcf,
        &args.output_dir,
        args.prefix.as_deref(),
        &grouping,
    )?;
    common::trace_rss_now();

    if let Some(path_summary) = &args.path_summary {
        tracing::info!("writing summary to {}", path_summary);
        let file = std::fs::File::create(path_summary)
            .map_err(|e| anyhow::anyhow!("could not create {}: {}", path_summary, e))?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &summary)
            .map_err(|e| anyhow::anyhow!("could not write summary: {}", e))?;
        std::io::Write::flush(&mut writer)?;
    }

    tracing::info!(
        "All of `vcf split` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
