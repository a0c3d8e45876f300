use crate::split::genotype;

/// Errors raised while projecting and writing VCF files.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("sample {0:?} is not present in the source header")]
    UnknownSample(String),
    #[error("sample {0:?} is selected more than once")]
    DuplicateSample(String),
    #[error(
        "ALT allele index {index} is out of range for {chrom}:{pos} with {count} ALT allele(s)"
    )]
    AltIndexOutOfRange {
        chrom: String,
        pos: usize,
        index: usize,
        count: usize,
    },
    #[error("output for group {0:?} has already been registered")]
    DuplicateOutput(String),
    #[error("malformed genotype in {chrom}:{pos}: {source}")]
    MalformedGenotype {
        chrom: String,
        pos: usize,
        #[source]
        source: genotype::ParseError,
    },
}
