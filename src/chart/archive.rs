use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use super::{Chart, ChartFile};
use crate::error::{Error, Result};

/// Loads an unpacked chart directory.
pub fn load_dir(dir: &Path) -> Result<Chart> {
    if !dir.is_dir() {
        return Err(Error::Chart(format!(
            "{} is not a chart directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Chart(format!("walk {}: {e}", dir.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| Error::Chart(e.to_string()))?;
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(ChartFile {
            path,
            data: fs::read(entry.path())?,
        });
    }

    Chart::from_files(files)
}

/// Loads a gzipped tar chart archive. Entries are expected under a single
/// top-level directory named after the chart.
pub fn load_archive<R: Read>(reader: R) -> Result<Chart> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let entry_path = entry.path()?.into_owned();
        let mut components = entry_path.components();
        // Drop the chart directory.
        components.next();
        let path = components
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if path.is_empty() {
            continue;
        }

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        files.push(ChartFile { path, data });
    }

    Chart::from_files(files)
}

impl Chart {
    /// Packages the chart as a gzipped tar archive with entries under
    /// `<name>/`.
    pub fn package(&self) -> Result<Vec<u8>> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for file in &self.files {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(file.data.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(0);
            builder.append_data(
                &mut header,
                format!("{}/{}", self.name(), file.path),
                file.data.as_slice(),
            )?;
        }

        let mut encoder = builder.into_inner()?;
        encoder.flush()?;
        Ok(encoder.finish()?)
    }
}

/// Hex SHA-256 of a packaged archive.
#[must_use]
pub fn digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
