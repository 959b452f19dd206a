//! GTF annotation parsing, reduced to what the join needs: the `transcript`
//! rows projected onto coordinates, strand and gene/transcript ids.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::domain::TranscriptFeature;
use crate::error::AnnotateError;

/// Load all `transcript` features from a GTF file, plain or gzip
/// (`.gz` extension decides).
pub fn load_transcripts(path: &Path) -> Result<Vec<TranscriptFeature>, AnnotateError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|err| AnnotateError::parse(&display, err.to_string()))?;
    let reader: Box<dyn Read> = if display.ends_with(".gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let reader = BufReader::new(reader);

    let mut features = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| AnnotateError::parse(&display, err.to_string()))?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        if let Some(feature) = parse_line(&line, line_no + 1, &display)? {
            features.push(feature);
        }
    }
    Ok(features)
}

/// Parse one GTF data line; returns `None` for non-transcript rows.
fn parse_line(
    line: &str,
    line_no: usize,
    file: &str,
) -> Result<Option<TranscriptFeature>, AnnotateError> {
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() != 9 {
        return Err(AnnotateError::parse(
            file,
            format!("line {line_no}: expected 9 columns, got {}", columns.len()),
        ));
    }

    if columns[2] != "transcript" {
        return Ok(None);
    }

    let start: u64 = columns[3].parse().map_err(|err| {
        AnnotateError::parse(file, format!("line {line_no}: invalid start '{}': {err}", columns[3]))
    })?;
    let end: u64 = columns[4].parse().map_err(|err| {
        AnnotateError::parse(file, format!("line {line_no}: invalid end '{}': {err}", columns[4]))
    })?;
    let strand = columns[6].parse().map_err(|_| {
        AnnotateError::parse(file, format!("line {line_no}: invalid strand '{}'", columns[6]))
    })?;

    let gene_id = attribute(columns[8], "gene_id").ok_or_else(|| {
        AnnotateError::parse(file, format!("line {line_no}: transcript row missing gene_id"))
    })?;
    let transcript_id = attribute(columns[8], "transcript_id").ok_or_else(|| {
        AnnotateError::parse(
            file,
            format!("line {line_no}: transcript row missing transcript_id"),
        )
    })?;

    Ok(Some(TranscriptFeature {
        chromosome: columns[0].to_string(),
        start,
        end,
        strand,
        gene_id,
        transcript_id,
    }))
}

/// Extract one attribute from GTF column 9 (`key "value"; key "value";`).
fn attribute(attrs: &str, key: &str) -> Option<String> {
    for pair in attrs.split(';') {
        let pair = pair.trim();
        let Some((name, value)) = pair.split_once(' ') else {
            continue;
        };
        if name == key {
            return Some(value.trim().trim_matches('"').to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;

    use crate::domain::Strand;

    use super::*;

    const TRANSCRIPT_LINE: &str = "chr1\tHAVANA\ttranscript\t11869\t14409\t.\t+\t.\tgene_id \"ENSG00000223972.5\"; transcript_id \"ENST00000456328.2\"; gene_type \"transcribed_unprocessed_pseudogene\";";
    const EXON_LINE: &str = "chr1\tHAVANA\texon\t11869\t12227\t.\t+\t.\tgene_id \"ENSG00000223972.5\"; transcript_id \"ENST00000456328.2\";";

    #[test]
    fn parses_transcript_rows_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "##description: test annotation").unwrap();
        writeln!(file, "{TRANSCRIPT_LINE}").unwrap();
        writeln!(file, "{EXON_LINE}").unwrap();

        let features = load_transcripts(file.path()).unwrap();
        assert_eq!(features.len(), 1);
        let feature = &features[0];
        assert_eq!(feature.chromosome, "chr1");
        assert_eq!(feature.start, 11869);
        assert_eq!(feature.end, 14409);
        assert_eq!(feature.strand, Strand::Forward);
        assert_eq!(feature.gene_id, "ENSG00000223972.5");
        assert_eq!(feature.transcript_id, "ENST00000456328.2");
    }

    #[test]
    fn scaffold_chromosome_kept_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let line = TRANSCRIPT_LINE.replace("chr1", "chrUn_KI270742v1");
        writeln!(file, "{line}").unwrap();

        // The annotation is ground truth: experiment records are normalized
        // toward it, never the other way around.
        let features = load_transcripts(file.path()).unwrap();
        assert_eq!(features[0].chromosome, "chrUn_KI270742v1");
    }

    #[test]
    fn wrong_column_count_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr1\ttranscript\t11869").unwrap();
        let err = load_transcripts(file.path()).unwrap_err();
        assert_matches!(err, AnnotateError::Parse { .. });
    }

    #[test]
    fn non_numeric_coordinate_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "chr1\tHAVANA\ttranscript\toops\t14409\t.\t+\t.\tgene_id \"G\"; transcript_id \"T\";"
        )
        .unwrap();
        let err = load_transcripts(file.path()).unwrap_err();
        assert_matches!(err, AnnotateError::Parse { .. });
    }

    #[test]
    fn missing_transcript_id_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "chr1\tHAVANA\ttranscript\t11869\t14409\t.\t+\t.\tgene_id \"ENSG00000223972.5\";"
        )
        .unwrap();
        let err = load_transcripts(file.path()).unwrap_err();
        assert_matches!(err, AnnotateError::Parse { .. });
    }

    #[test]
    fn attribute_extraction() {
        let attrs = "gene_id \"ENSG1.1\"; transcript_id \"ENST2.2\";";
        assert_eq!(attribute(attrs, "gene_id").unwrap(), "ENSG1.1");
        assert_eq!(attribute(attrs, "transcript_id").unwrap(), "ENST2.2");
        assert!(attribute(attrs, "gene_name").is_none());
    }
}
