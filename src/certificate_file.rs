//! Scoped temporary PEM/DER certificate files.
//!
//! A [`CertificateFile`] owns at most one output file at a time: creating a
//! new one deletes the previous one, and dropping the `CertificateFile`
//! deletes whichever file it still owns. Consumers pass the resulting path
//! to code that insists on a filesystem path (OpenSSL's `SSL_CTX` loaders,
//! in the sampled source) rather than an in-memory buffer.

use std::{
    fs,
    io::Write as _,
    path::{Path, PathBuf},
};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

const PEM_HEADER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_FOOTER: &str = "-----END CERTIFICATE-----";

/// Writes PEM or DER certificate material to a file under `root_directory`,
/// deleting the file it owns whenever a new one replaces it or it is
/// dropped.
pub struct CertificateFile {
    root_directory: PathBuf,
    output_file: Option<PathBuf>,
}

impl CertificateFile {
    /// Creates a `CertificateFile` that writes under `root_directory`. The
    /// directory is created lazily, on first write.
    #[must_use]
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self { root_directory: root_directory.into(), output_file: None }
    }

    /// The directory new output files are written under.
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// The file currently owned by this `CertificateFile`, if any.
    #[must_use]
    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    /// Wraps each of `pem_strings` in a PEM header/footer and writes the
    /// concatenation to a fresh output file, replacing (and deleting) any
    /// file this `CertificateFile` previously owned.
    ///
    /// Each input string may already be a full PEM block (the header and
    /// footer are stripped back out and re-added) or bare base64 body text.
    /// Returns `None`, leaving the previous output file untouched, if any
    /// input string contains no extractable hex data.
    pub fn create_pem_from_strings(&mut self, pem_strings: &[String]) -> Option<PathBuf> {
        let mut content = String::new();
        for pem_string in pem_strings {
            let hex_data = Self::extract_hex_data(pem_string);
            if hex_data.is_empty() {
                return None;
            }
            content.push_str(PEM_HEADER);
            content.push('\n');
            content.push_str(&hex_data);
            content.push_str(PEM_FOOTER);
            content.push('\n');
        }
        self.write_output_file(content.as_bytes())
    }

    /// Base64-decodes `pem_string` (whitespace is stripped first, matching a
    /// tolerant PEM body) and writes the raw bytes to a fresh output file.
    ///
    /// Returns `None` if the input is not valid base64.
    pub fn create_der_from_string(&mut self, pem_string: &str) -> Option<PathBuf> {
        let stripped: String = pem_string.chars().filter(|c| !c.is_whitespace()).collect();
        let der = BASE64.decode(stripped).ok()?;
        self.write_output_file(&der)
    }

    /// Extracts the hex-encoded body of a PEM-formatted certificate,
    /// stripping the header/footer markers and blank lines. If `pem_data`
    /// carries neither marker, it is returned verbatim (trimmed line by
    /// line). A footer with no preceding header, a header with no following
    /// footer, or a footer preceding the header all extract no data.
    fn extract_hex_data(pem_data: &str) -> String {
        let lines: Vec<&str> = pem_data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let header = lines.iter().position(|line| *line == PEM_HEADER);
        let footer = lines.iter().position(|line| *line == PEM_FOOTER);
        match (header, footer) {
            (None, None) => lines.iter().map(|line| format!("{line}\n")).collect(),
            (Some(header), Some(footer)) if footer > header => {
                lines[header + 1..footer].iter().map(|line| format!("{line}\n")).collect()
            }
            _ => String::new(),
        }
    }

    fn write_output_file(&mut self, data: &[u8]) -> Option<PathBuf> {
        fs::create_dir_all(&self.root_directory).ok()?;
        let mut temp_file = tempfile::Builder::new()
            .prefix("shill-cert-")
            .suffix(".pem")
            .tempfile_in(&self.root_directory)
            .ok()?;
        temp_file.write_all(data).ok()?;
        let (_file, path) = temp_file.keep().ok()?;

        if let Some(previous) = self.output_file.take() {
            let _ = fs::remove_file(previous);
        }
        self.output_file = Some(path.clone());
        Some(path)
    }
}

impl Drop for CertificateFile {
    fn drop(&mut self) {
        if let Some(path) = self.output_file.take() {
            let _ = fs::remove_file(path);
        }
    }
}
