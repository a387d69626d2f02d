//! FASTA parsing over `bio::io::fasta`, with transparent gzip support.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context as _, Result};
use bio::io::fasta;
use flate2::read::GzDecoder;

use crate::io::Record;
use crate::sequence::Sequence;

/// Reads every record of a FASTA file, decompressing on the fly when the
/// file carries a `.gz` suffix.
pub fn parse(path: &Path) -> Result<Vec<Record>> {
    let file =
        File::open(path).with_context(|| format!("cannot open {}", path.display()))?;

    let source: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut records = Vec::new();
    for record in fasta::Reader::new(source).records() {
        let record = record.with_context(|| format!("malformed record in {}", path.display()))?;

        let description = match record.desc() {
            Some(desc) => format!("{} {desc}", record.id()),
            None => record.id().to_owned(),
        };
        records.push((description, Sequence::from(record.seq())));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let dir = std::path::Path::new("target/fasta_fixtures");
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn parses_descriptions_and_residues() {
        let path = fixture(
            "plain.fasta",
            b">first sample one\nGATTACA\n>second\nGCAT\nGCU\n",
        );

        let records = parse(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "first sample one");
        assert_eq!(records[0].1.residues(), b"GATTACA");
        assert_eq!(records[1].0, "second");
        assert_eq!(records[1].1.residues(), b"GCATGCU");
    }

    #[test]
    fn parses_gzip_compressed_input() {
        let mut compressed = Vec::new();
        {
            let mut encoder = flate2::write::GzEncoder::new(
                &mut compressed,
                flate2::Compression::default(),
            );
            encoder.write_all(b">only\nACGTACGT\n").unwrap();
            encoder.finish().unwrap();
        }
        let path = fixture("packed.fasta.gz", &compressed);

        let records = parse(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1.residues(), b"ACGTACGT");
    }

    #[test]
    fn missing_file_reports_its_path() {
        let error = parse(Path::new("target/fasta_fixtures/absent.fasta")).unwrap_err();
        assert!(error.to_string().contains("absent.fasta"));
    }
}
