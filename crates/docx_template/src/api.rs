//! Public API for filling DOCX templates
//!
//! This module provides path and byte-slice entry points on top of
//! [`DocxTemplate`].

use crate::archive::{DocxTemplate, FillReport};
use crate::config::FillConfig;
use crate::error::{FillError, FillResult};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Fill a DOCX file on disk and write the result to `destination`
///
/// # Arguments
///
/// * `source` - Path to the template DOCX
/// * `destination` - Path where the filled DOCX will be saved
/// * `config` - Dictionary, delimiters and target part
///
/// The output is written to a temporary file next to `destination` and
/// renamed into place only once the whole package has been written, so a
/// failed fill never leaves a truncated document behind.
///
/// # Example
///
/// ```ignore
/// use docx_template::{fill_docx, FillConfig};
/// use std::path::Path;
///
/// let config = FillConfig::new([("[name]", "Ada")].into_iter().collect::<docx_template::Dictionary>());
/// fill_docx(Path::new("letter.docx"), Path::new("out/letter-ada.docx"), &config)?;
/// ```
pub fn fill_docx(source: &Path, destination: &Path, config: &FillConfig) -> FillResult<FillReport> {
    let file = File::open(source).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FillError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", source.display()),
            ))
        } else {
            FillError::Io(e)
        }
    })?;
    let mut template = DocxTemplate::new(BufReader::new(file))?;

    // Create parent directories if they don't exist
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let partial = partial_path(destination);
    let result = write_through(&mut template, config, &partial);
    match result {
        Ok(report) => {
            std::fs::rename(&partial, destination)?;
            Ok(report)
        }
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&partial) {
                warn!(path = %partial.display(), "failed to remove partial output: {}", cleanup);
            }
            Err(e)
        }
    }
}

fn write_through(
    template: &mut DocxTemplate<BufReader<File>>,
    config: &FillConfig,
    path: &Path,
) -> FillResult<FillReport> {
    let mut writer = BufWriter::new(File::create(path)?);
    let report = template.transcode(config, &mut writer)?;
    writer.flush()?;
    Ok(report)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    destination.with_file_name(name)
}

/// Fill a DOCX held in memory and return the new package bytes
///
/// # Example
///
/// ```ignore
/// use docx_template::{fill_docx_bytes, FillConfig};
///
/// let template: Vec<u8> = std::fs::read("letter.docx")?;
/// let filled = fill_docx_bytes(&template, &FillConfig::default())?;
/// ```
pub fn fill_docx_bytes(bytes: &[u8], config: &FillConfig) -> FillResult<Vec<u8>> {
    let mut template = DocxTemplate::new(Cursor::new(bytes))?;
    let mut out = Cursor::new(Vec::new());
    template.transcode(config, &mut out)?;
    Ok(out.into_inner())
}
