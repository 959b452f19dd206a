use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AnnotateError;

/// Strand orientation of a genomic interval. Both the GENCODE annotation and
/// the eCLIP peak files carry an explicit `+` or `-` for every row we keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn as_str(self) -> &'static str {
        match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strand {
    type Err = AnnotateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            other => Err(AnnotateError::InvalidStrand(other.to_string())),
        }
    }
}

static ACCESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ENCFF[0-9]{3}[A-Z]{3}$").unwrap());

/// ENCODE file accession, e.g. `ENCFF123ABC`. Interval files are named
/// `<accession>.bed.gz`, and the accession is the join key into the
/// experiment metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileAccession(String);

impl FileAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the accession from an interval-file basename: the token
    /// before the first `.` (`ENCFF123ABC.bed.gz` -> `ENCFF123ABC`).
    pub fn from_filename(name: &str) -> Result<Self, AnnotateError> {
        let token = name.split('.').next().unwrap_or(name);
        token.parse()
    }
}

impl fmt::Display for FileAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileAccession {
    type Err = AnnotateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !ACCESSION_RE.is_match(trimmed) {
            return Err(AnnotateError::InvalidAccession(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// One `transcript` row of the annotation file. Coordinates are the GTF's
/// 1-based inclusive span. Chromosome names are kept exactly as annotated;
/// the experiment records are normalized toward them, not vice versa.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptFeature {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
    pub gene_id: String,
    pub transcript_id: String,
}

/// One peak row of an eCLIP interval file, enriched with the protein target
/// and cell line looked up from the experiment metadata. The `score`,
/// `q_value` and `peak` columns are constant placeholders in the source data
/// and are carried through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRecord {
    pub chromosome: String,
    pub start: u64,
    pub stop: u64,
    pub dataset_label: String,
    pub score: i64,
    pub strand: Strand,
    pub fold_enrichment: f64,
    pub neg_log10_pvalue: f64,
    pub q_value: f64,
    pub peak: i64,
    pub protein_target: String,
    pub cell_line: String,
}

/// An experiment record stamped with the transcript feature that contains
/// it. One record contained by k overlapping transcripts yields k annotated
/// rows; the duplication is intentional.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRecord {
    pub record: ExperimentRecord,
    pub feature_start: u64,
    pub feature_end: u64,
    pub frame: Strand,
    pub ensg: String,
    pub enst: String,
}

/// Strip a trailing `.N` version suffix from an Ensembl identifier:
/// `ENSG00000123.4` -> `ENSG00000123`.
pub fn strip_version(id: &str) -> &str {
    id.split('.').next().unwrap_or(id)
}
