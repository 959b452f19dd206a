use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::AnnotateError;

/// Project-local data store. Downloaded files land in fixed subdirectories
/// and are addressed by their URL-derived filename; a file that already
/// exists at its destination path is never fetched again.
#[derive(Debug, Clone)]
pub struct Store {
    data_root: Utf8PathBuf,
}

impl Store {
    pub fn new_with_root(data_root: Utf8PathBuf) -> Self {
        Self { data_root }
    }

    pub fn data_root(&self) -> &Utf8Path {
        &self.data_root
    }

    pub fn eclip_dir(&self) -> Utf8PathBuf {
        self.data_root.join("eCLIP")
    }

    pub fn gtf_dir(&self) -> Utf8PathBuf {
        self.data_root.join("gtf")
    }

    pub fn output_dir(&self) -> Utf8PathBuf {
        self.data_root.join("output")
    }

    pub fn manifest_dir(&self) -> Utf8PathBuf {
        self.data_root.join("manifest")
    }

    pub fn ensure_layout(&self) -> Result<(), AnnotateError> {
        for dir in [
            self.eclip_dir(),
            self.gtf_dir(),
            self.output_dir(),
            self.manifest_dir(),
        ] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    /// Destination path for a downloaded eCLIP file, keyed by the URL's last
    /// path segment.
    pub fn eclip_path_for_url(&self, url: &str) -> Result<Utf8PathBuf, AnnotateError> {
        let name = filename_from_url(url)?;
        Ok(self.eclip_dir().join(name))
    }

    pub fn gtf_path(&self, release: &str) -> Utf8PathBuf {
        self.gtf_dir()
            .join(format!("gencode.v{release}.primary_assembly.annotation.gtf.gz"))
    }

    pub fn output_path(&self, file_name: &str) -> Utf8PathBuf {
        self.output_dir().join(file_name)
    }

    pub fn manifest_path(&self, file_name: &str) -> Utf8PathBuf {
        self.manifest_dir().join(format!("{file_name}.json"))
    }

    pub fn exists(path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }

    /// All `.bed.gz` files currently in the eCLIP directory, sorted by path
    /// so that repeat runs see the files in the same order.
    pub fn list_eclip_files(&self) -> Result<Vec<Utf8PathBuf>, AnnotateError> {
        let dir = self.eclip_dir();
        if !dir.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        let entries = fs::read_dir(dir.as_std_path())
            .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
            let path = Utf8PathBuf::from_path_buf(entry.path())
                .map_err(|_| AnnotateError::Filesystem("non-utf8 path in store".to_string()))?;
            if path.as_str().ends_with(".bed.gz") && path.as_std_path().is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), AnnotateError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
        Ok(())
    }

    /// Record a successful download next to the store.
    pub fn write_manifest(&self, entry: &ManifestEntry) -> Result<(), AnnotateError> {
        let path = self.manifest_path(&entry.file_name);
        let content = serde_json::to_vec_pretty(entry)
            .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(&path, &content)
    }
}

/// Provenance of one downloaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file_name: String,
    pub url: String,
    pub resolved_path: String,
    pub downloaded_at: String,
}

impl ManifestEntry {
    pub fn new(url: &str, resolved_path: &Utf8Path) -> Self {
        let file_name = resolved_path
            .file_name()
            .unwrap_or_default()
            .to_string();
        Self {
            file_name,
            url: url.to_string(),
            resolved_path: resolved_path.to_string(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Extract the destination filename from a URL's last path segment.
pub fn filename_from_url(url: &str) -> Result<String, AnnotateError> {
    let path = url
        .split('?')
        .next()
        .unwrap_or(url)
        .split('#')
        .next()
        .unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or("");
    if name.is_empty() || name == ".." {
        return Err(AnnotateError::Filesystem(format!(
            "cannot derive filename from URL: {url}"
        )));
    }
    Ok(name.to_string())
}
