//! Assignment of samples to output groups.

use std::path::Path;

use indexmap::IndexMap;
use itertools::Itertools;

use noodles_vcf as vcf;

/// Mapping from sample name to taxonomy, loaded from a TSV file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonomyMapping {
    /// Taxonomy of each sample.
    sample_to_taxonomy: IndexMap<String, String>,
    /// Samples of each taxonomy, derived from `sample_to_taxonomy`.
    taxonomy_to_samples: IndexMap<String, Vec<String>>,
}

impl TaxonomyMapping {
    /// Build from `(sample, taxonomy)` pairs; a later pair for the same sample
    /// replaces an earlier one.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut sample_to_taxonomy = IndexMap::new();
        for (sample, taxonomy) in pairs {
            if let Some(previous) = sample_to_taxonomy.insert(sample.clone(), taxonomy.clone()) {
                if previous != taxonomy {
                    tracing::warn!(
                        "Sample {} is mapped to taxonomy {} and {}, using {}",
                        &sample,
                        &previous,
                        &taxonomy,
                        &taxonomy
                    );
                }
            }
        }

        let mut taxonomy_to_samples: IndexMap<String, Vec<String>> = IndexMap::new();
        for (sample, taxonomy) in &sample_to_taxonomy {
            taxonomy_to_samples
                .entry(taxonomy.clone())
                .or_default()
                .push(sample.clone());
        }

        Self {
            sample_to_taxonomy,
            taxonomy_to_samples,
        }
    }

    /// Read the tab-separated `sample<TAB>taxonomy` rows from `reader`.
    ///
    /// There is no header row. Both columns are trimmed and rows with fewer
    /// than two columns are ignored.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, anyhow::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut pairs = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| anyhow::anyhow!("problem reading taxonomy row: {}", e))?;
            if let (Some(sample), Some(taxonomy)) = (record.get(0), record.get(1)) {
                pairs.push((sample.trim().to_string(), taxonomy.trim().to_string()));
            }
        }

        Ok(Self::from_pairs(pairs))
    }

    /// Load the mapping from the TSV file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            anyhow::anyhow!(
                "could not open taxonomy file {}: {}",
                path.as_ref().display(),
                e
            )
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Taxonomy of `sample`, if mapped.
    pub fn taxonomy(&self, sample: &str) -> Option<&str> {
        self.sample_to_taxonomy.get(sample).map(String::as_str)
    }

    pub fn taxonomy_to_samples(&self) -> &IndexMap<String, Vec<String>> {
        &self.taxonomy_to_samples
    }

    /// Number of mapped samples.
    pub fn sample_count(&self) -> usize {
        self.sample_to_taxonomy.len()
    }
}

/// One output group: its key and member samples in output column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Group key, used to name the output file.
    pub key: String,
    /// Member samples.
    pub samples: Vec<String>,
}

/// How samples are assigned to output groups.
#[derive(Debug, Clone)]
pub enum Grouping {
    /// One group per sample.
    PerSample,
    /// One group per taxonomy with all its samples.
    PerTaxonomy(TaxonomyMapping),
}

impl Grouping {
    /// Compute the groups for the samples of `header`.
    ///
    /// Groups are ordered by first appearance of their samples in the header
    /// and members follow header order. For `PerTaxonomy`, samples without a
    /// taxonomy are left out of all groups.
    pub fn groups(&self, header: &vcf::Header) -> Vec<Group> {
        match self {
            Grouping::PerSample => header
                .sample_names()
                .iter()
                .map(|sample| Group {
                    key: sample.clone(),
                    samples: vec![sample.clone()],
                })
                .collect(),
            Grouping::PerTaxonomy(mapping) => {
                let unmapped = header
                    .sample_names()
                    .iter()
                    .filter(|sample| mapping.taxonomy(sample).is_none())
                    .collect::<Vec<_>>();
                if !unmapped.is_empty() {
                    tracing::warn!(
                        "Samples without taxonomy mapping will be skipped: {}",
                        unmapped.iter().join(", ")
                    );
                }

                let mut groups: IndexMap<&str, Vec<String>> = IndexMap::new();
                for sample in header.sample_names() {
                    if let Some(taxonomy) = mapping.taxonomy(sample) {
                        groups.entry(taxonomy).or_default().push(sample.clone());
                    }
                }
                if groups.is_empty() {
                    tracing::warn!("No samples with taxonomy mapping found in VCF");
                }

                groups
                    .into_iter()
                    .map(|(key, samples)| Group {
                        key: key.to_string(),
                        samples,
                    })
                    .collect()
            }
        }
    }
}
