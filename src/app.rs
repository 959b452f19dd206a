use std::fs;
use std::time::Duration;

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::eclip;
use crate::encode::EncodeClient;
use crate::error::AnnotateError;
use crate::gtf;
use crate::join;
use crate::metadata::MetadataTable;
use crate::output;
use crate::store::{ManifestEntry, Store, filename_from_url};

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub force: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotateOptions {
    /// Skip Source Acquisition and annotate whatever the store holds.
    pub offline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub selected: usize,
    pub downloaded: usize,
    pub cached: usize,
    pub failed: Vec<String>,
    pub annotation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotateResult {
    pub features: usize,
    pub experiment_files: usize,
    pub experiment_records: usize,
    pub annotated_records: usize,
    pub output_path: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

/// Injected progress reporting. The library never configures process-wide
/// logging; user-facing progress goes through whatever sink the caller
/// wires in.
pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn event(sink: &dyn ProgressSink, message: String) {
    sink.event(ProgressEvent {
        message,
        elapsed: None,
    });
}

pub fn gencode_url(release: &str) -> String {
    format!(
        "https://ftp.ebi.ac.uk/pub/databases/gencode/Gencode_human/release_{release}/gencode.v{release}.primary_assembly.annotation.gtf.gz"
    )
}

#[derive(Clone)]
pub struct App<C: EncodeClient> {
    store: Store,
    client: C,
}

impl<C: EncodeClient> App<C> {
    pub fn new(store: Store, client: C) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Source Acquisition: select the dual-replicate GRCh38 files from the
    /// metadata table and fetch whatever is not yet in the store, one file
    /// at a time. A failed experiment download is reported and skipped, so
    /// the pipeline proceeds with a smaller experiment set; nothing is
    /// retried.
    pub fn fetch(
        &self,
        config: &ResolvedConfig,
        options: FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, AnnotateError> {
        self.store.ensure_layout()?;

        let metadata = MetadataTable::load(config.metadata_file.as_std_path())?;
        let urls = metadata.download_urls(&config.assembly, &config.replicates);
        event(
            sink,
            format!(
                "phase=Fetch; {} of {} metadata rows selected ({}, replicates \"{}\")",
                urls.len(),
                metadata.len(),
                config.assembly,
                config.replicates
            ),
        );

        let mut downloaded = 0usize;
        let mut cached = 0usize;
        let mut failed = Vec::new();
        for &url in &urls {
            let dest = self.store.eclip_path_for_url(url)?;
            if !options.force && Store::exists(&dest) {
                cached += 1;
                continue;
            }
            match self.download_to(url, &dest) {
                Ok(()) => {
                    downloaded += 1;
                    event(sink, format!("phase=Fetch; downloaded {}", dest.file_name().unwrap_or(url)));
                }
                Err(err) => {
                    let name = filename_from_url(url).unwrap_or_else(|_| url.to_string());
                    tracing::warn!(file = %name, error = %err, "experiment download failed, skipping");
                    event(sink, format!("phase=Fetch; skipping {name}: {err}"));
                    failed.push(name);
                }
            }
        }

        let annotation = self.fetch_annotation(config, options, sink)?;

        Ok(FetchResult {
            selected: urls.len(),
            downloaded,
            cached,
            failed,
            annotation,
        })
    }

    /// The annotation file is fetched with the same skip-if-present rule.
    /// During `fetch` a failure is only reported; `annotate` fails later if
    /// the file still is not there.
    fn fetch_annotation(
        &self,
        config: &ResolvedConfig,
        options: FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<String, AnnotateError> {
        let dest = self.store.gtf_path(&config.gencode_release);
        if !options.force && Store::exists(&dest) {
            return Ok("cache".to_string());
        }
        let url = gencode_url(&config.gencode_release);
        event(
            sink,
            format!("phase=Fetch; downloading GENCODE v{}", config.gencode_release),
        );
        match self.download_to(&url, &dest) {
            Ok(()) => Ok("download".to_string()),
            Err(err) => {
                tracing::warn!(error = %err, "annotation download failed");
                event(sink, format!("phase=Fetch; annotation download failed: {err}"));
                Ok("failed".to_string())
            }
        }
    }

    /// Download into a `.part` sidecar first so an aborted transfer never
    /// leaves a half-written file at a destination path the cache check
    /// would treat as complete.
    fn download_to(&self, url: &str, dest: &camino::Utf8Path) -> Result<(), AnnotateError> {
        let part = camino::Utf8PathBuf::from(format!("{dest}.part"));
        match self.client.download(url, part.as_std_path()) {
            Ok(()) => fs::rename(part.as_std_path(), dest.as_std_path())
                .map_err(|err| AnnotateError::Filesystem(err.to_string()))
                .and_then(|()| self.store.write_manifest(&ManifestEntry::new(url, dest))),
            Err(err) => {
                let _ = fs::remove_file(part.as_std_path());
                Err(err)
            }
        }
    }

    /// The full pipeline: acquire (unless offline), load both tables, join,
    /// write the merged csv.gz.
    pub fn annotate(
        &self,
        config: &ResolvedConfig,
        options: AnnotateOptions,
        sink: &dyn ProgressSink,
    ) -> Result<AnnotateResult, AnnotateError> {
        if options.offline {
            self.store.ensure_layout()?;
        } else {
            self.fetch(config, FetchOptions::default(), sink)?;
        }

        let gtf_path = self.store.gtf_path(&config.gencode_release);
        if !Store::exists(&gtf_path) {
            return Err(AnnotateError::AnnotationNotFound(gtf_path.to_string()));
        }
        event(sink, "phase=Features; loading transcripts".to_string());
        let features = gtf::load_transcripts(gtf_path.as_std_path())?;
        event(sink, format!("phase=Features; {} transcripts", features.len()));

        let metadata = MetadataTable::load(config.metadata_file.as_std_path())?;
        let files = self.store.list_eclip_files()?;
        event(
            sink,
            format!("phase=Experiments; loading {} interval files", files.len()),
        );
        let records = eclip::load_experiments(&files, &metadata)?;
        event(
            sink,
            format!("phase=Experiments; {} records loaded", records.len()),
        );

        event(sink, "phase=Join; matching records to transcripts".to_string());
        let annotated = join::annotate(&features, &records);
        if annotated.is_empty() {
            // Valid outcome: the output is a header-only table.
            tracing::warn!("no experiment record was contained in any transcript");
            event(sink, "phase=Join; no containment matches found".to_string());
        } else {
            event(sink, format!("phase=Join; {} annotated records", annotated.len()));
        }

        let output_path = self.store.output_path(&config.output_file);
        output::write_annotated(&output_path, &annotated)?;
        event(sink, format!("phase=Write; wrote {output_path}"));

        Ok(AnnotateResult {
            features: features.len(),
            experiment_files: files.len(),
            experiment_records: records.len(),
            annotated_records: annotated.len(),
            output_path: output_path.to_string(),
        })
    }
}
