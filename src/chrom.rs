//! Chromosome naming differs between the GENCODE annotation and the eCLIP
//! peak files: primary assembly chromosomes match as-is, but scaffolds and
//! alternate loci appear as `chrUn_KI270742v1` on one side and `KI270742.1`
//! on the other. This module maps the raw labels to the annotation's form.

/// Normalize a raw chromosome label to the annotation's convention.
///
/// Labels without an underscore (primary chromosomes such as `chr1`) are
/// returned unchanged. Otherwise the segment between the first and second
/// underscore is the scaffold identifier; every `v` in it is replaced with
/// `.` (`KI270742v1` -> `KI270742.1`) and all other segments are discarded,
/// so `chr1_KI270706v1_random` also yields `KI270706.1`.
pub fn normalize(label: &str) -> String {
    match label.split('_').nth(1) {
        None => label.to_string(),
        Some(scaffold) => scaffold.replace('v', "."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_chromosome_unchanged() {
        assert_eq!(normalize("chr1"), "chr1");
        assert_eq!(normalize("chrX"), "chrX");
        assert_eq!(normalize("chrM"), "chrM");
    }

    #[test]
    fn unplaced_scaffold() {
        assert_eq!(normalize("chrUn_KI270742v1"), "KI270742.1");
        assert_eq!(normalize("chrUn_GL000195v1"), "GL000195.1");
    }

    #[test]
    fn multi_underscore_takes_second_segment() {
        assert_eq!(normalize("chr1_KI270706v1_random"), "KI270706.1");
        assert_eq!(normalize("chr19_KI270938v1_alt"), "KI270938.1");
    }

    #[test]
    fn empty_label() {
        assert_eq!(normalize(""), "");
    }
}
