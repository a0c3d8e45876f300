//! Genotypes and the ALT alleles they refer to.

use std::collections::BTreeSet;

use noodles_vcf::record::genotypes::{keys::key, sample::Value, Sample};

/// Error type for `Genotype::from_str()` and `sample_genotype()`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty genotype")]
    Empty,
    #[error("invalid allele {allele:?} in genotype {genotype:?}")]
    InvalidAllele { allele: String, genotype: String },
    #[error("GT value is not a string: {0}")]
    InvalidValueType(String),
}

/// Separator written before an allele.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phasing {
    /// `|`
    Phased,
    /// `/`
    Unphased,
}

impl Phasing {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '|' => Some(Phasing::Phased),
            '/' => Some(Phasing::Unphased),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Phasing::Phased => '|',
            Phasing::Unphased => '/',
        }
    }
}

/// One allele of a genotype.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Allele {
    /// Allele index, 0 is the reference allele; `None` for a no-call.
    pub position: Option<usize>,
    /// Separator in front of the allele; `None` for a first allele without
    /// explicit phasing prefix.
    pub phasing: Option<Phasing>,
}

/// A called genotype.
///
/// The separators are kept per allele so that mixed phasing (`0|1/2`) and the
/// VCF 4.4 leading phasing prefix (`|0|1`) are written back unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Genotype {
    pub alleles: Vec<Allele>,
}

impl Genotype {
    /// Project onto a biallelic site for the ALT allele at `alt_index` (1-based).
    ///
    /// The target allele becomes `1`, any other ALT allele is folded into the
    /// reference, and no-calls stay no-calls. Separators are kept.
    pub fn remap(&self, alt_index: usize) -> Self {
        Self {
            alleles: self
                .alleles
                .iter()
                .map(|allele| Allele {
                    position: allele.position.map(|position| {
                        if position == alt_index && position != 0 {
                            1
                        } else {
                            0
                        }
                    }),
                    phasing: allele.phasing,
                })
                .collect(),
        }
    }
}

impl std::str::FromStr for Genotype {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut alleles = Vec::new();
        let mut phasing = None;
        let mut rest = s;
        loop {
            let end = rest.find(['/', '|']).unwrap_or(rest.len());
            let (raw, tail) = rest.split_at(end);
            // a leading separator is a phasing prefix, not an empty allele
            if !(raw.is_empty() && alleles.is_empty() && phasing.is_none() && !tail.is_empty()) {
                let position = match raw {
                    "." => None,
                    _ => Some(raw.parse().map_err(|_| ParseError::InvalidAllele {
                        allele: raw.to_string(),
                        genotype: s.to_string(),
                    })?),
                };
                alleles.push(Allele { position, phasing });
            }

            let mut chars = tail.chars();
            match chars.next().and_then(Phasing::from_char) {
                Some(next) => {
                    phasing = Some(next);
                    rest = chars.as_str();
                }
                None => break,
            }
        }

        Ok(Self { alleles })
    }
}

impl std::fmt::Display for Genotype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for allele in &self.alleles {
            if let Some(phasing) = allele.phasing {
                write!(f, "{}", phasing.as_char())?;
            }
            match allele.position {
                Some(position) => write!(f, "{}", position)?,
                None => write!(f, ".")?,
            }
        }
        Ok(())
    }
}

/// Parse the `GT` value of one sample, if any.
pub fn sample_genotype(sample: &Sample<'_>) -> Result<Option<Genotype>, ParseError> {
    match sample.get(&key::GENOTYPE) {
        Some(Some(Value::String(value))) => value.parse().map(Some),
        Some(Some(value)) => Err(ParseError::InvalidValueType(value.to_string())),
        Some(None) | None => Ok(None),
    }
}

/// The ALT allele indices (1-based) carried by `genotype`.
///
/// Empty for a missing, all no-call or homozygous reference genotype.
pub fn alt_allele_indices(genotype: Option<&Genotype>) -> BTreeSet<usize> {
    genotype
        .map(|genotype| {
            genotype
                .alleles
                .iter()
                .filter_map(|allele| allele.position)
                .filter(|position| *position > 0)
                .collect()
        })
        .unwrap_or_default()
}
