//! Interval-containment join: every experiment record fully inside a
//! transcript span, on the same chromosome and strand, is stamped with that
//! transcript's attributes. Overlapping transcripts each claim their own
//! copy of a record.

use std::collections::HashMap;

use crate::domain::{
    AnnotatedRecord, ExperimentRecord, Strand, TranscriptFeature, strip_version,
};

/// Strict full containment within the transcript span, inclusive bounds,
/// exact chromosome and strand equality. No tolerance, no partial overlap.
pub fn contains(feature: &TranscriptFeature, record: &ExperimentRecord) -> bool {
    record.start >= feature.start
        && record.stop <= feature.end
        && record.chromosome == feature.chromosome
        && record.strand == feature.strand
}

struct IndexedInterval {
    start: u64,
    index: usize,
}

/// Join experiment records into transcript features.
///
/// Output is feature-major, and within one feature the matches follow the
/// input record order. Record indices are grouped per (chromosome, strand)
/// and start-sorted so each feature only scans its own span; the collected
/// matches are re-sorted by input index before emission, so the index never
/// changes observable order relative to the naive nested loop.
pub fn annotate(
    features: &[TranscriptFeature],
    records: &[ExperimentRecord],
) -> Vec<AnnotatedRecord> {
    let mut groups: HashMap<(&str, Strand), Vec<IndexedInterval>> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        groups
            .entry((record.chromosome.as_str(), record.strand))
            .or_default()
            .push(IndexedInterval {
                start: record.start,
                index,
            });
    }
    for group in groups.values_mut() {
        group.sort_by_key(|interval| interval.start);
    }

    let mut annotated = Vec::new();
    let mut matches = Vec::new();
    for feature in features {
        let Some(group) = groups.get(&(feature.chromosome.as_str(), feature.strand)) else {
            continue;
        };
        matches.clear();
        let from = group.partition_point(|interval| interval.start < feature.start);
        for interval in &group[from..] {
            if interval.start > feature.end {
                break;
            }
            if contains(feature, &records[interval.index]) {
                matches.push(interval.index);
            }
        }
        if matches.is_empty() {
            continue;
        }
        matches.sort_unstable();

        let ensg = strip_version(&feature.gene_id).to_string();
        let enst = strip_version(&feature.transcript_id).to_string();
        for &index in &matches {
            annotated.push(AnnotatedRecord {
                record: records[index].clone(),
                feature_start: feature.start,
                feature_end: feature.end,
                frame: feature.strand,
                ensg: ensg.clone(),
                enst: enst.clone(),
            });
        }
    }
    annotated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(chromosome: &str, start: u64, end: u64, strand: Strand) -> TranscriptFeature {
        TranscriptFeature {
            chromosome: chromosome.to_string(),
            start,
            end,
            strand,
            gene_id: "ENSG00000123.4".to_string(),
            transcript_id: "ENST00000456.7".to_string(),
        }
    }

    fn record(chromosome: &str, start: u64, stop: u64, strand: Strand) -> ExperimentRecord {
        ExperimentRecord {
            chromosome: chromosome.to_string(),
            start,
            stop,
            dataset_label: "label".to_string(),
            score: 1000,
            strand,
            fold_enrichment: 3.0,
            neg_log10_pvalue: 5.0,
            q_value: -1.0,
            peak: -1,
            protein_target: "RBFOX2".to_string(),
            cell_line: "HepG2".to_string(),
        }
    }

    #[test]
    fn containment_predicate() {
        let f = feature("chr1", 100, 200, Strand::Forward);
        assert!(contains(&f, &record("chr1", 110, 190, Strand::Forward)));
        // inclusive bounds
        assert!(contains(&f, &record("chr1", 100, 200, Strand::Forward)));
        // start before the feature
        assert!(!contains(&f, &record("chr1", 90, 190, Strand::Forward)));
        // stop past the feature
        assert!(!contains(&f, &record("chr1", 110, 210, Strand::Forward)));
        // strand mismatch
        assert!(!contains(&f, &record("chr1", 110, 190, Strand::Reverse)));
        // chromosome mismatch
        assert!(!contains(&f, &record("chr2", 110, 190, Strand::Forward)));
    }

    #[test]
    fn join_selects_contained_records_only() {
        let features = vec![feature("chr1", 100, 200, Strand::Forward)];
        let records = vec![
            record("chr1", 110, 190, Strand::Forward),
            record("chr1", 90, 190, Strand::Forward),
            record("chr1", 110, 190, Strand::Reverse),
        ];

        let annotated = annotate(&features, &records);
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated[0].record.start, 110);
        assert_eq!(annotated[0].feature_start, 100);
        assert_eq!(annotated[0].feature_end, 200);
        assert_eq!(annotated[0].frame, Strand::Forward);
    }

    #[test]
    fn overlapping_features_duplicate_the_record() {
        let mut first = feature("chr1", 100, 200, Strand::Forward);
        first.gene_id = "ENSG00000001.1".to_string();
        first.transcript_id = "ENST00000001.1".to_string();
        let mut second = feature("chr1", 105, 250, Strand::Forward);
        second.gene_id = "ENSG00000002.2".to_string();
        second.transcript_id = "ENST00000002.2".to_string();

        let records = vec![record("chr1", 110, 190, Strand::Forward)];
        let annotated = annotate(&[first, second], &records);

        assert_eq!(annotated.len(), 2);
        assert_eq!(annotated[0].ensg, "ENSG00000001");
        assert_eq!(annotated[0].enst, "ENST00000001");
        assert_eq!(annotated[1].ensg, "ENSG00000002");
        assert_eq!(annotated[1].enst, "ENST00000002");
    }

    #[test]
    fn version_suffix_is_stripped() {
        let features = vec![feature("chr1", 100, 200, Strand::Forward)];
        let records = vec![record("chr1", 110, 190, Strand::Forward)];

        let annotated = annotate(&features, &records);
        assert_eq!(annotated[0].ensg, "ENSG00000123");
        assert_eq!(annotated[0].enst, "ENST00000456");
    }

    #[test]
    fn per_feature_matches_follow_input_record_order() {
        let features = vec![feature("chr1", 100, 500, Strand::Forward)];
        // deliberately not sorted by start
        let records = vec![
            record("chr1", 300, 350, Strand::Forward),
            record("chr1", 110, 190, Strand::Forward),
            record("chr1", 200, 260, Strand::Forward),
        ];

        let annotated = annotate(&features, &records);
        let starts: Vec<u64> = annotated.iter().map(|a| a.record.start).collect();
        assert_eq!(starts, vec![300, 110, 200]);
    }

    #[test]
    fn feature_without_matches_contributes_nothing() {
        let features = vec![
            feature("chr2", 100, 200, Strand::Forward),
            feature("chr1", 100, 200, Strand::Forward),
        ];
        let records = vec![record("chr1", 110, 190, Strand::Forward)];

        let annotated = annotate(&features, &records);
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated[0].record.chromosome, "chr1");
    }

    #[test]
    fn empty_inputs_yield_empty_output() {
        assert!(annotate(&[], &[]).is_empty());
        let features = vec![feature("chr1", 100, 200, Strand::Forward)];
        assert!(annotate(&features, &[]).is_empty());
    }
}
