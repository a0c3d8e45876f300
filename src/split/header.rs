//! Derivation of per-group output headers.

use noodles_vcf as vcf;

use crate::err::Error;

/// Build the header of an output file holding only `samples`.
///
/// All header records of `source` are kept, including declarations that the
/// selected samples do not use. The sample columns follow the order of
/// `samples`.
pub fn project_header(source: &vcf::Header, samples: &[String]) -> Result<vcf::Header, Error> {
    let mut sample_names = vcf::header::SampleNames::new();
    for sample in samples {
        if !source.sample_names().contains(sample) {
            return Err(Error::UnknownSample(sample.clone()));
        }
        if !sample_names.insert(sample.clone()) {
            return Err(Error::DuplicateSample(sample.clone()));
        }
    }

    let mut header = source.clone();
    *header.sample_names_mut() = sample_names;
    Ok(header)
}
