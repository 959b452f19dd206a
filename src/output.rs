use std::fs::File;
use std::io::{self, Write};

use camino::Utf8Path;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;

use crate::app::{AnnotateResult, FetchResult, ProgressEvent, ProgressSink};
use crate::domain::AnnotatedRecord;
use crate::error::AnnotateError;

/// Output column order: the experiment record's ten columns, the metadata
/// enrichment, then the four feature attributes. Header names keep the
/// upstream dataset's literal conventions, placeholder columns included.
const HEADER: [&str; 17] = [
    "chr",
    "start",
    "stop",
    "dataset_label",
    "1000",
    "strand",
    "log2(eCLIP fold-enrichment over size-matched input)",
    "-log10(eCLIP vs size-matched input p-value)",
    "-1",
    "-1.1",
    "RBP",
    "cell_line",
    "featureStart",
    "featureEnd",
    "frame",
    "ENSG",
    "ENST",
];

/// Serialize the annotated records, in join order, to a gzip-compressed
/// comma-delimited file with a header row. An empty record set produces a
/// header-only file.
pub fn write_annotated(
    path: &Utf8Path,
    records: &[AnnotatedRecord],
) -> Result<(), AnnotateError> {
    let file = File::create(path.as_std_path())
        .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = csv::Writer::from_writer(encoder);

    writer
        .write_record(HEADER)
        .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;

    for annotated in records {
        let record = &annotated.record;
        writer
            .write_record([
                record.chromosome.clone(),
                record.start.to_string(),
                record.stop.to_string(),
                record.dataset_label.clone(),
                record.score.to_string(),
                record.strand.to_string(),
                record.fold_enrichment.to_string(),
                record.neg_log10_pvalue.to_string(),
                record.q_value.to_string(),
                record.peak.to_string(),
                record.protein_target.clone(),
                record.cell_line.clone(),
                annotated.feature_start.to_string(),
                annotated.feature_end.to_string(),
                annotated.frame.to_string(),
                annotated.ensg.clone(),
                annotated.enst.clone(),
            ])
            .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
    }

    let encoder = writer
        .into_inner()
        .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
    encoder
        .finish()
        .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
    Ok(())
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_annotate(result: &AnnotateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
