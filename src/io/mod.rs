//! Sequence file loading.
//!
//! Parsers are looked up by file extension through a registry, so new
//! formats only need one more entry. A trailing `.gz` is transparent: it is
//! stripped before the lookup and handled by the parser itself.

pub mod fasta;

use std::path::Path;

use anyhow::{anyhow, Context as _, Result};

use crate::database::SequenceDb;
use crate::sequence::Sequence;

/// A parsed record: the description line and the sequence payload.
pub type Record = (String, Sequence);

/// A file parser: reads every record out of one file.
pub type Parser = fn(&Path) -> Result<Vec<Record>>;

/// Extension-keyed parser registry.
pub struct ParserRegistry {
    entries: Vec<(&'static str, Parser)>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        ParserRegistry {
            entries: vec![
                ("fasta", fasta::parse as Parser),
                ("fa", fasta::parse as Parser),
                ("fna", fasta::parse as Parser),
            ],
        }
    }
}

impl ParserRegistry {
    /// Finds the parser responsible for the given file, ignoring any `.gz`
    /// compression suffix.
    pub fn lookup(&self, path: &Path) -> Result<Parser> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("invalid file name: {}", path.display()))?;

        let plain = name.strip_suffix(".gz").unwrap_or(name);
        let extension = plain.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

        self.entries
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(extension))
            .map(|(_, parser)| *parser)
            .ok_or_else(|| {
                anyhow!(
                    "no parser registered for '{}' (supported: {})",
                    path.display(),
                    self.known_extensions().join(", ")
                )
            })
    }

    /// Parses one file and appends its records to the database.
    pub fn load(&self, path: &Path, db: &mut SequenceDb) -> Result<usize> {
        let parser = self.lookup(path)?;
        let records =
            parser(path).with_context(|| format!("while loading {}", path.display()))?;

        let loaded = records.len();
        for (description, sequence) in records {
            db.push(description, sequence);
        }
        Ok(loaded)
    }

    fn known_extensions(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(known, _)| *known).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_resolves_known_extensions() {
        let registry = ParserRegistry::default();
        assert!(registry.lookup(Path::new("input.fasta")).is_ok());
        assert!(registry.lookup(Path::new("input.FA")).is_ok());
        assert!(registry.lookup(Path::new("dir/input.fna.gz")).is_ok());
    }

    #[test]
    fn lookup_rejects_unknown_extensions() {
        let registry = ParserRegistry::default();
        let error = registry.lookup(Path::new("notes.txt")).unwrap_err();
        assert!(error.to_string().contains("no parser registered"));
        assert!(registry.lookup(Path::new("bare")).is_err());
    }
}
