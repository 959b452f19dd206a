use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::domain::FileAccession;
use crate::error::AnnotateError;

const COL_ACCESSION: &str = "File accession";
const COL_ASSEMBLY: &str = "File assembly";
const COL_REPLICATES: &str = "Biological replicate(s)";
const COL_URL: &str = "File download URL";
const COL_BIOSAMPLE: &str = "Biosample term name";
const COL_TARGET: &str = "Experiment target";

/// One row of the ENCODE experiment metadata table.
#[derive(Debug, Clone)]
pub struct ExperimentMetadata {
    pub accession: String,
    pub assembly: String,
    pub replicates: String,
    pub download_url: String,
    pub biosample: String,
    pub target: String,
}

impl ExperimentMetadata {
    /// Protein target name: the first `-`-separated token of the
    /// `Experiment target` column (`RBFOX2-human` -> `RBFOX2`).
    pub fn protein_target(&self) -> &str {
        self.target.split('-').next().unwrap_or(&self.target)
    }
}

/// The experiment metadata table, indexed by file accession for O(1)
/// lookup while loading interval files.
#[derive(Debug, Clone)]
pub struct MetadataTable {
    rows: Vec<ExperimentMetadata>,
    by_accession: HashMap<String, usize>,
}

impl MetadataTable {
    /// Parse the tab-separated metadata table. The header row must name all
    /// required columns; extra columns are ignored.
    pub fn load(path: &Path) -> Result<Self, AnnotateError> {
        let display = path.display().to_string();
        let file =
            File::open(path).map_err(|err| AnnotateError::parse(&display, err.to_string()))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|err| AnnotateError::parse(&display, err.to_string()))?
            .clone();
        let index_of = |name: &str| -> Result<usize, AnnotateError> {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| AnnotateError::MissingColumn {
                    file: display.clone(),
                    column: name.to_string(),
                })
        };
        let accession_idx = index_of(COL_ACCESSION)?;
        let assembly_idx = index_of(COL_ASSEMBLY)?;
        let replicates_idx = index_of(COL_REPLICATES)?;
        let url_idx = index_of(COL_URL)?;
        let biosample_idx = index_of(COL_BIOSAMPLE)?;
        let target_idx = index_of(COL_TARGET)?;

        let mut rows = Vec::new();
        let mut by_accession = HashMap::new();
        for result in reader.records() {
            let record =
                result.map_err(|err| AnnotateError::parse(&display, err.to_string()))?;
            let field = |idx: usize| record.get(idx).unwrap_or("").to_string();
            let row = ExperimentMetadata {
                accession: field(accession_idx),
                assembly: field(assembly_idx),
                replicates: field(replicates_idx),
                download_url: field(url_idx),
                biosample: field(biosample_idx),
                target: field(target_idx),
            };
            by_accession.insert(row.accession.clone(), rows.len());
            rows.push(row);
        }

        Ok(Self { rows, by_accession })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Metadata row for a file accession. A missing row is a data-integrity
    /// error: without it the record's target and cell line cannot be
    /// resolved, so the run must stop.
    pub fn lookup(&self, accession: &FileAccession) -> Result<&ExperimentMetadata, AnnotateError> {
        self.by_accession
            .get(accession.as_str())
            .map(|&idx| &self.rows[idx])
            .ok_or_else(|| AnnotateError::MetadataNotFound(accession.as_str().to_string()))
    }

    /// Download URLs of the rows matching the given assembly and replicate
    /// label. The pipeline restricts itself to dual-replicate GRCh38
    /// experiments; everything downstream assumes its input files passed
    /// this filter.
    pub fn download_urls(&self, assembly: &str, replicates: &str) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|row| row.assembly == assembly && row.replicates == replicates)
            .map(|row| row.download_url.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;

    use super::*;

    const HEADER: &str = "File accession\tFile assembly\tBiological replicate(s)\tBiosample term name\tExperiment target\tFile download URL";

    fn write_table(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn lookup_by_accession() {
        let file = write_table(&[
            "ENCFF111AAA\tGRCh38\t1, 2\tHepG2\tRBFOX2-human\thttps://example.org/ENCFF111AAA.bed.gz",
            "ENCFF222BBB\thg19\t1\tK562\tQKI-human\thttps://example.org/ENCFF222BBB.bed.gz",
        ]);
        let table = MetadataTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 2);

        let acc: FileAccession = "ENCFF111AAA".parse().unwrap();
        let row = table.lookup(&acc).unwrap();
        assert_eq!(row.biosample, "HepG2");
        assert_eq!(row.protein_target(), "RBFOX2");
    }

    #[test]
    fn lookup_missing_is_fatal() {
        let file = write_table(&[]);
        let table = MetadataTable::load(file.path()).unwrap();
        let acc: FileAccession = "ENCFF999ZZZ".parse().unwrap();
        let err = table.lookup(&acc).unwrap_err();
        assert_matches!(err, AnnotateError::MetadataNotFound(_));
    }

    #[test]
    fn replicate_filter() {
        let file = write_table(&[
            "ENCFF111AAA\tGRCh38\t1, 2\tHepG2\tRBFOX2-human\thttps://example.org/a.bed.gz",
            "ENCFF222BBB\tGRCh38\t1\tHepG2\tRBFOX2-human\thttps://example.org/b.bed.gz",
            "ENCFF333CCC\thg19\t1, 2\tK562\tQKI-human\thttps://example.org/c.bed.gz",
        ]);
        let table = MetadataTable::load(file.path()).unwrap();
        assert_eq!(
            table.download_urls("GRCh38", "1, 2"),
            vec!["https://example.org/a.bed.gz"]
        );
    }

    #[test]
    fn missing_required_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "File accession\tFile assembly").unwrap();
        let err = MetadataTable::load(file.path()).unwrap_err();
        assert_matches!(err, AnnotateError::MissingColumn { .. });
    }
}
