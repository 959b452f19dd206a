//! eCLIP interval-file loading: 10-column narrowPeak rows, enriched with the
//! protein target and cell line resolved from the experiment metadata.

use std::fs::File;
use std::io::Read;

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;

use crate::chrom;
use crate::domain::{ExperimentRecord, FileAccession};
use crate::error::AnnotateError;
use crate::metadata::MetadataTable;

/// Load and concatenate all given interval files, in the order given.
///
/// Precondition: every file was selected by the GRCh38 / dual-replicate
/// metadata filter upstream; the loader only resolves accessions, it does
/// not re-check the filter. After concatenation every record's chromosome
/// is rewritten to the annotation's naming convention.
pub fn load_experiments(
    files: &[impl AsRef<Utf8Path>],
    metadata: &MetadataTable,
) -> Result<Vec<ExperimentRecord>, AnnotateError> {
    let mut records = Vec::new();
    for file in files {
        records.extend(load_file(file.as_ref(), metadata)?);
    }
    for record in &mut records {
        record.chromosome = chrom::normalize(&record.chromosome);
    }
    Ok(records)
}

/// Load a single interval file and stamp every row with its experiment
/// metadata.
fn load_file(
    path: &Utf8Path,
    metadata: &MetadataTable,
) -> Result<Vec<ExperimentRecord>, AnnotateError> {
    let name = path
        .file_name()
        .ok_or_else(|| AnnotateError::Filesystem(format!("not a file path: {path}")))?;
    let accession = FileAccession::from_filename(name)?;
    let row = metadata.lookup(&accession)?;
    let protein_target = row.protein_target().to_string();
    let cell_line = row.biosample.clone();

    let file = File::open(path.as_std_path())
        .map_err(|err| AnnotateError::parse(path.as_str(), err.to_string()))?;
    let reader: Box<dyn Read> = if path.as_str().ends_with(".gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|err| AnnotateError::parse(path.as_str(), err.to_string()))?;
        if record.len() != 10 {
            return Err(AnnotateError::parse(
                path.as_str(),
                format!("row {}: expected 10 columns, got {}", row_no + 1, record.len()),
            ));
        }
        let parse_err = |what: &str, value: &str| {
            AnnotateError::parse(
                path.as_str(),
                format!("row {}: invalid {what} '{value}'", row_no + 1),
            )
        };

        let start: u64 = record[1].parse().map_err(|_| parse_err("start", &record[1]))?;
        let stop: u64 = record[2].parse().map_err(|_| parse_err("stop", &record[2]))?;
        let score: i64 = record[4].parse().map_err(|_| parse_err("score", &record[4]))?;
        let strand = record[5]
            .parse()
            .map_err(|_| parse_err("strand", &record[5]))?;
        let fold_enrichment: f64 = record[6]
            .parse()
            .map_err(|_| parse_err("fold enrichment", &record[6]))?;
        let neg_log10_pvalue: f64 = record[7]
            .parse()
            .map_err(|_| parse_err("p-value", &record[7]))?;
        let q_value: f64 = record[8].parse().map_err(|_| parse_err("q-value", &record[8]))?;
        let peak: i64 = record[9].parse().map_err(|_| parse_err("peak", &record[9]))?;

        rows.push(ExperimentRecord {
            chromosome: record[0].to_string(),
            start,
            stop,
            dataset_label: record[3].to_string(),
            score,
            strand,
            fold_enrichment,
            neg_log10_pvalue,
            q_value,
            peak,
            protein_target: protein_target.clone(),
            cell_line: cell_line.clone(),
        });
    }

    repair_dataset_labels(&mut rows, &protein_target, &cell_line);
    Ok(rows)
}

/// Some experiments ship with a literal `.` in every dataset-label cell. If
/// any row of a file carries the placeholder, relabel the whole file as
/// `{target}_{cell_line}_.`, keeping the trailing marker so the repaired
/// rows stay recognizable.
fn repair_dataset_labels(rows: &mut [ExperimentRecord], target: &str, cell_line: &str) {
    if rows.iter().any(|row| row.dataset_label == ".") {
        let label = format!("{target}_{cell_line}_.");
        for row in rows {
            row.dataset_label = label.clone();
        }
    }
}
