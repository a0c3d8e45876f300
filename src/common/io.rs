//! Common, IO-related code.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use flate2::bufread::MultiGzDecoder;
use noodles_bgzf as bgzf;

/// Transparently open a file with gzip decoder.
///
/// BGZF files are multi-member gzip files and are decoded here as well.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let file = File::open(path)?;
        let bufreader = BufReader::new(file);
        let decoder = MultiGzDecoder::new(bufreader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Open a file for writing with BGZF compression.
///
/// Call `finish()` on the result to write the EOF marker block.
pub fn open_write_bgzf<P>(path: P) -> Result<bgzf::Writer<File>, anyhow::Error>
where
    P: AsRef<Path>,
{
    tracing::trace!("Opening {:?} as BGZF for writing", path.as_ref());
    let file = File::create(path)?;
    Ok(bgzf::Writer::new(file))
}

#[cfg(test)]
mod test {
    use std::io::{Read, Write};

    use pretty_assertions::assert_eq;

    #[rstest::rstest]
    #[case("test.txt.gz")]
    #[case("test.txt")]
    fn open_write_bgzf_read_back(#[case] filename: &str) -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();

        {
            let mut f = super::open_write_bgzf(tmp_dir.join(filename))?;
            f.write_all(b"hello\nworld\n")?;
            f.finish()?;
        }

        // Only the `.gz` suffix triggers decompression on reading.
        let mut buf = Vec::new();
        if filename.ends_with(".gz") {
            super::open_read_maybe_gz(tmp_dir.join(filename))?.read_to_end(&mut buf)?;
            assert_eq!(String::from_utf8(buf)?, "hello\nworld\n");
        } else {
            std::fs::File::open(tmp_dir.join(filename))?.read_to_end(&mut buf)?;
            assert_eq!(&buf[..2], &[0x1f, 0x8b]);
        }

        Ok(())
    }

    #[test]
    fn open_read_plain() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("plain.txt");
        std::fs::write(&path, "plain\n")?;

        let mut buf = String::new();
        super::open_read_maybe_gz(&path)?.read_to_string(&mut buf)?;

        assert_eq!(buf, "plain\n");
        Ok(())
    }
}
