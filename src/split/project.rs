//! Projection of a (possibly multiallelic) record onto one ALT allele.

use noodles_vcf::{
    self as vcf,
    header::{
        record::value::{map, Map},
        Number,
    },
    record::{
        genotypes::{
            keys::{key, Key as FormatKey},
            sample::{value::Array as SampleArray, Value as SampleValue},
            Keys,
        },
        info::field::{value::Array as InfoArray, Key as InfoKey, Value as InfoValue},
        AlternateBases, Genotypes, Info,
    },
};

use super::genotype;
use crate::err::Error;

/// Cardinality of an INFO field, from the header or the reserved definitions.
fn info_number(header: &vcf::Header, key: &InfoKey) -> Number {
    header
        .infos()
        .get(key)
        .map(|info| info.number())
        .unwrap_or_else(|| Map::<map::Info>::from((header.file_format(), key)).number())
}

/// Cardinality of a FORMAT field, from the header or the reserved definitions.
fn format_number(header: &vcf::Header, key: &FormatKey) -> Number {
    header
        .formats()
        .get(key)
        .map(|format| format.number())
        .unwrap_or_else(|| Map::<map::Format>::from((header.file_format(), key)).number())
}

/// Slice allele-specific entries down to the ones for `alt_index`.
///
/// `Number=A` keeps the entry of the ALT allele, `Number=R` keeps the
/// reference entry and the one of the ALT allele. `None` if there are fewer
/// entries than expected or the number is not allele-specific.
fn slice<T: Clone>(values: &[T], number: Number, alt_index: usize) -> Option<Vec<T>> {
    match number {
        Number::A => values.get(alt_index - 1).map(|alt| vec![alt.clone()]),
        Number::R => values
            .first()
            .zip(values.get(alt_index))
            .map(|(reference, alt)| vec![reference.clone(), alt.clone()]),
        _ => None,
    }
}

fn slice_info_value(value: &InfoValue, number: Number, alt_index: usize) -> InfoValue {
    let sliced = match value {
        InfoValue::Array(InfoArray::Integer(values)) => {
            slice(values, number, alt_index).map(InfoArray::Integer)
        }
        InfoValue::Array(InfoArray::Float(values)) => {
            slice(values, number, alt_index).map(InfoArray::Float)
        }
        InfoValue::Array(InfoArray::Character(values)) => {
            slice(values, number, alt_index).map(InfoArray::Character)
        }
        InfoValue::Array(InfoArray::String(values)) => {
            slice(values, number, alt_index).map(InfoArray::String)
        }
        _ => None,
    };
    sliced.map(InfoValue::Array).unwrap_or_else(|| value.clone())
}

fn slice_sample_value(value: &SampleValue, number: Number, alt_index: usize) -> SampleValue {
    let sliced = match value {
        SampleValue::Array(SampleArray::Integer(values)) => {
            slice(values, number, alt_index).map(SampleArray::Integer)
        }
        SampleValue::Array(SampleArray::Float(values)) => {
            slice(values, number, alt_index).map(SampleArray::Float)
        }
        SampleValue::Array(SampleArray::Character(values)) => {
            slice(values, number, alt_index).map(SampleArray::Character)
        }
        SampleValue::Array(SampleArray::String(values)) => {
            slice(values, number, alt_index).map(SampleArray::String)
        }
        _ => None,
    };
    sliced.map(SampleValue::Array).unwrap_or_else(|| value.clone())
}

/// Build the biallelic record for ALT allele `alt_index` (1-based) of `record`.
///
/// The result has the single ALT allele `alt_index`, allele-specific INFO and
/// FORMAT values sliced accordingly, and the FORMAT values of `samples` only,
/// with genotypes remapped such that the chosen allele is `1` and all other
/// ALT alleles are folded into `0`. Values that do not have as many entries
/// as their `Number` asks for are copied unchanged.
///
/// `Number=G` FORMAT fields are dropped as their values cannot be carried over
/// to the smaller genotype space without recomputation.
///
/// # Errors
///
/// * `Error::AltIndexOutOfRange` if `alt_index` does not point into the ALT
///   alleles of `record`.
/// * `Error::UnknownSample` if one of `samples` is not in `header`.
/// * `Error::MalformedGenotype` if a `GT` value cannot be parsed.
pub fn project_record(
    header: &vcf::Header,
    record: &vcf::Record,
    alt_index: usize,
    samples: &[String],
) -> Result<vcf::Record, Error> {
    let chrom = || record.chromosome().to_string();
    let pos = usize::from(record.position());

    let count = record.alternate_bases().len();
    let alt = alt_index
        .checked_sub(1)
        .and_then(|idx| record.alternate_bases().get(idx).cloned())
        .ok_or_else(|| Error::AltIndexOutOfRange {
            chrom: chrom(),
            pos,
            index: alt_index,
            count,
        })?;

    let info: Info = record
        .info()
        .as_ref()
        .iter()
        .filter_map(|(key, value)| {
            value.as_ref().map(|value| {
                (
                    key.clone(),
                    Some(slice_info_value(
                        value,
                        info_number(header, key),
                        alt_index,
                    )),
                )
            })
        })
        .collect();

    let keys = record.genotypes().keys();
    let numbers = keys
        .iter()
        .map(|key| format_number(header, key))
        .collect::<Vec<_>>();

    let mut values = Vec::with_capacity(samples.len());
    for sample in samples {
        let source = header
            .sample_names()
            .get_index_of(sample)
            .and_then(|idx| record.genotypes().get_index(idx))
            .ok_or_else(|| Error::UnknownSample(sample.clone()))?;

        let mut sample_values = Vec::with_capacity(keys.len());
        for (idx, (key, number)) in keys.iter().zip(numbers.iter()).enumerate() {
            let value = if *key == key::GENOTYPE {
                genotype::sample_genotype(&source)
                    .map_err(|source| Error::MalformedGenotype {
                        chrom: chrom(),
                        pos,
                        source,
                    })?
                    .map(|gt| SampleValue::String(gt.remap(alt_index).to_string()))
            } else if *number == Number::G {
                None
            } else {
                source
                    .values()
                    .get(idx)
                    .and_then(Option::as_ref)
                    .map(|value| slice_sample_value(value, *number, alt_index))
            };
            sample_values.push(value);
        }
        values.push(sample_values);
    }

    // GT is always kept, other keys only when one of the samples has a value
    let mut kept = keys
        .iter()
        .enumerate()
        .filter(|(idx, key)| {
            **key == key::GENOTYPE
                || values
                    .iter()
                    .any(|sample_values| matches!(sample_values.get(*idx), Some(Some(_))))
        })
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();
    if kept.is_empty() && !samples.is_empty() {
        kept.extend(numbers.iter().position(|number| *number != Number::G));
    }

    let mut out_keys = Keys::default();
    for idx in &kept {
        if let Some(key) = keys.get_index(*idx) {
            out_keys.insert(key.clone());
        }
    }

    let out_values = values
        .into_iter()
        .map(|sample_values| {
            let mut out = kept
                .iter()
                .map(|idx| sample_values.get(*idx).cloned().flatten())
                .collect::<Vec<_>>();
            while matches!(out.last(), Some(None)) {
                out.pop();
            }
            // an all-missing sample is written as "."
            if out.is_empty() {
                out.push(None);
            }
            out
        })
        .collect::<Vec<_>>();

    let mut projected = record.clone();
    *projected.alternate_bases_mut() = AlternateBases::from(vec![alt]);
    *projected.info_mut() = info;
    *projected.genotypes_mut() = if out_values.is_empty() || out_keys.is_empty() {
        Genotypes::default()
    } else {
        Genotypes::new(out_keys, out_values)
    };
    Ok(projected)
}

#[cfg(test)]
mod test {
    use noodles_vcf::record::genotypes::Sample;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn header() -> vcf::Header {
        [
            "##fileformat=VCFv4.2",
            r#"##INFO=<ID=DP,Number=1,Type=Integer,Description="Depth">"#,
            r#"##INFO=<ID=AC,Number=A,Type=Integer,Description="Allele count">"#,
            r#"##INFO=<ID=AF,Number=A,Type=Float,Description="Allele frequency">"#,
            r#"##INFO=<ID=RD,Number=R,Type=Integer,Description="Per-allele depth">"#,
            r#"##INFO=<ID=GX,Number=G,Type=Integer,Description="Per-genotype value">"#,
            r#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#,
            r#"##FORMAT=<ID=GQ,Number=1,Type=Integer,Description="Genotype quality">"#,
            r#"##FORMAT=<ID=AD,Number=R,Type=Integer,Description="Allelic depths">"#,
            r#"##FORMAT=<ID=AO,Number=A,Type=Integer,Description="ALT observations">"#,
            r#"##FORMAT=<ID=PL,Number=G,Type=Integer,Description="Phred likelihoods">"#,
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\tS3",
            "",
        ]
        .join("\n")
        .parse()
        .expect("invalid header")
    }

    fn record(header: &vcf::Header, line: &str) -> vcf::Record {
        vcf::Record::try_from((header, line)).expect("invalid record")
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    /// Write `record` through the VCF writer, without the trailing newline.
    fn to_line(header: &vcf::Header, record: &vcf::Record) -> Result<String, anyhow::Error> {
        let mut writer = vcf::Writer::new(Vec::new());
        writer.write_record(header, record)?;
        let line = String::from_utf8(writer.into_inner())?;
        Ok(line.trim_end_matches('\n').to_string())
    }

    fn sample_value<'r>(sample: &Sample<'r>, key: &str) -> Option<&'r SampleValue> {
        sample
            .keys()
            .get_index_of(key)
            .and_then(|idx| sample.values().get(idx))
            .and_then(Option::as_ref)
    }

    fn info_value<'r>(record: &'r vcf::Record, key: &str) -> Option<&'r InfoValue> {
        record.info().as_ref().get(key).and_then(Option::as_ref)
    }

    fn integers(values: &[i32]) -> Vec<Option<i32>> {
        values.iter().copied().map(Some).collect()
    }

    const MULTI: &str = "1\t100\trs1\tA\tG,T\t50\tPASS\t\
        DP=30;AC=1,2;AF=0.25,0.5;RD=10,11,12;GX=1,2,3,4,5,6\t\
        GT:GQ:AD:AO:PL\t\
        1/2:40:10,11,12:11,12:0,1,2,3,4,5\t\
        0|2:30:9,0,8:0,8:0,1,2,3,4,5\t\
        0/0:20:5,0,0:0,0:0,1,2,3,4,5";

    #[rstest]
    #[case::first_alt(1, "G", "1/0", "0|0")]
    #[case::second_alt(2, "T", "0/1", "0|1")]
    fn multiallelic_fan_out(
        #[case] alt_index: usize,
        #[case] alt: &str,
        #[case] gt_s1: &str,
        #[case] gt_s2: &str,
    ) -> Result<(), anyhow::Error> {
        let header = header();
        let source = record(&header, MULTI);
        let projected = project_record(&header, &source, alt_index, &strings(&["S1", "S2"]))?;

        assert_eq!(projected.chromosome().to_string(), "1");
        assert_eq!(usize::from(projected.position()), 100);
        assert_eq!(projected.ids().to_string(), "rs1");
        assert_eq!(projected.reference_bases().to_string(), "A");
        assert_eq!(projected.alternate_bases().to_string(), alt);
        assert_eq!(projected.quality_score(), source.quality_score());
        assert_eq!(projected.filters(), source.filters());

        let genotypes = projected.genotypes();
        assert_eq!(genotypes.values().count(), 2);
        let gts = genotypes
            .values()
            .map(|sample| sample_value(&sample, "GT").cloned())
            .collect::<Vec<_>>();
        assert_eq!(
            gts,
            vec![
                Some(SampleValue::from(gt_s1)),
                Some(SampleValue::from(gt_s2))
            ]
        );
        Ok(())
    }

    #[test]
    fn slices_info_fields() -> Result<(), anyhow::Error> {
        let header = header();
        let source = record(&header, MULTI);
        let projected = project_record(&header, &source, 2, &strings(&["S1"]))?;

        assert_eq!(info_value(&projected, "DP"), Some(&InfoValue::Integer(30)));
        assert_eq!(
            info_value(&projected, "AC"),
            Some(&InfoValue::Array(InfoArray::Integer(integers(&[2]))))
        );
        assert_eq!(
            info_value(&projected, "AF"),
            Some(&InfoValue::Array(InfoArray::Float(vec![Some(0.5)])))
        );
        assert_eq!(
            info_value(&projected, "RD"),
            Some(&InfoValue::Array(InfoArray::Integer(integers(&[10, 12]))))
        );
        // not allele-specific in the A/R sense, copied unchanged
        assert_eq!(
            info_value(&projected, "GX"),
            Some(&InfoValue::Array(InfoArray::Integer(integers(&[
                1, 2, 3, 4, 5, 6
            ]))))
        );
        Ok(())
    }

    #[test]
    fn slices_format_fields_and_drops_g() -> Result<(), anyhow::Error> {
        let header = header();
        let source = record(&header, MULTI);
        let projected = project_record(&header, &source, 1, &strings(&["S1", "S2"]))?;

        assert_eq!(projected.format().to_string(), "GT:GQ:AD:AO");
        assert_eq!(
            to_line(&header, &projected)?,
            "1\t100\trs1\tA\tG\t50\tPASS\tDP=30;AC=1;AF=0.25;RD=10,11;GX=1,2,3,4,5,6\t\
             GT:GQ:AD:AO\t1/0:40:10,11:11\t0|0:30:9,0:0"
        );
        Ok(())
    }

    #[test]
    fn short_allele_specific_values_are_copied() -> Result<(), anyhow::Error> {
        let header = header();
        let source = record(
            &header,
            "1\t100\t.\tA\tG,T\t.\t.\tAC=1;RD=10,11\tGT:AD:AO\t0/2:10,11:3\t0/0\t0/0",
        );
        let projected = project_record(&header, &source, 2, &strings(&["S1"]))?;

        assert_eq!(
            info_value(&projected, "AC"),
            Some(&InfoValue::Array(InfoArray::Integer(integers(&[1]))))
        );
        assert_eq!(
            info_value(&projected, "RD"),
            Some(&InfoValue::Array(InfoArray::Integer(integers(&[10, 11]))))
        );
        let sample = projected
            .genotypes()
            .get_index(0)
            .expect("missing sample");
        assert_eq!(
            sample_value(&sample, "AD"),
            Some(&SampleValue::Array(SampleArray::Integer(integers(&[10, 11]))))
        );
        assert_eq!(
            sample_value(&sample, "AO"),
            Some(&SampleValue::Array(SampleArray::Integer(integers(&[3]))))
        );
        Ok(())
    }

    #[test]
    fn short_allele_specific_values_are_written_unchanged() -> Result<(), anyhow::Error> {
        let header = header();
        let source = record(
            &header,
            "1\t100\t.\tA\tG,T\t.\t.\tAC=1\tGT:AD\t0/2:10,11\t0/0\t0/0",
        );
        let projected = project_record(&header, &source, 2, &strings(&["S1"]))?;

        assert_eq!(
            to_line(&header, &projected)?,
            "1\t100\t.\tA\tT\t.\t.\tAC=1\tGT:AD\t0/1:10,11"
        );
        Ok(())
    }

    #[test]
    fn missing_values_are_skipped() -> Result<(), anyhow::Error> {
        let header = header();
        let source = record(&header, "1\t100\t.\tA\tG\t.\t.\tDP=.\tGT:GQ:AD\t0/1:.:.\t./.\t.");
        let projected = project_record(&header, &source, 1, &strings(&["S1", "S3"]))?;

        assert!(projected.info().is_empty());
        assert_eq!(projected.format().to_string(), "GT");
        assert_eq!(
            to_line(&header, &projected)?,
            "1\t100\t.\tA\tG\t.\t.\t.\tGT\t0/1\t."
        );
        Ok(())
    }

    #[rstest]
    #[case::integer("50")]
    #[case::decimals("29.17")]
    #[case::small("0.1")]
    #[case::large("1234.56")]
    fn quality_is_written_unchanged(#[case] qual: &str) -> Result<(), anyhow::Error> {
        let header = header();
        let line = format!("1\t100\t.\tA\tG\t{}\t.\t.\tGT\t0/1\t0/0\t0/0", qual);
        let projected = project_record(&header, &record(&header, &line), 1, &strings(&["S1"]))?;

        assert_eq!(
            to_line(&header, &projected)?,
            format!("1\t100\t.\tA\tG\t{}\t.\t.\tGT\t0/1", qual)
        );
        Ok(())
    }

    #[test]
    fn keeps_phasing_of_each_allele() -> Result<(), anyhow::Error> {
        let header = header();
        let source = record(&header, "1\t100\t.\tA\tG,T\t.\t.\t.\tGT\t0|1/2\t|2|0\t0/0");
        let projected = project_record(&header, &source, 2, &strings(&["S1", "S2"]))?;

        assert_eq!(
            to_line(&header, &projected)?,
            "1\t100\t.\tA\tT\t.\t.\t.\tGT\t0|0/1\t|1|0"
        );
        Ok(())
    }

    #[test]
    fn sample_order_follows_selection() -> Result<(), anyhow::Error> {
        let header = header();
        let source = record(&header, MULTI);
        let projected = project_record(&header, &source, 2, &strings(&["S2", "S1"]))?;

        let gts = projected
            .genotypes()
            .values()
            .map(|sample| sample_value(&sample, "GT").map(|value| value.to_string()))
            .collect::<Vec<_>>();
        assert_eq!(gts, vec![Some("0|1".to_string()), Some("0/1".to_string())]);
        Ok(())
    }

    #[test]
    fn no_samples_selected() -> Result<(), anyhow::Error> {
        let header = header();
        let source = record(&header, MULTI);
        let projected = project_record(&header, &source, 1, &[])?;

        assert!(projected.genotypes().is_empty());
        Ok(())
    }

    #[rstest]
    #[case::zero(0)]
    #[case::too_large(3)]
    fn alt_index_out_of_range(#[case] alt_index: usize) {
        let header = header();
        let source = record(&header, MULTI);
        let result = project_record(&header, &source, alt_index, &strings(&["S1"]));

        assert!(matches!(
            result,
            Err(Error::AltIndexOutOfRange { index, count: 2, .. }) if index == alt_index
        ));
    }

    #[test]
    fn unknown_sample() {
        let header = header();
        let source = record(&header, MULTI);
        let result = project_record(&header, &source, 1, &strings(&["S9"]));

        assert!(matches!(result, Err(Error::UnknownSample(name)) if name == "S9"));
    }

    #[test]
    fn malformed_genotype() {
        let header = header();
        let source = record(&header, "1\t100\t.\tA\tG\t.\t.\t.\tGT\t0/x\t0/0\t0/0");
        let result = project_record(&header, &source, 1, &strings(&["S1"]));

        assert!(matches!(result, Err(Error::MalformedGenotype { pos: 100, .. })));
    }
}
