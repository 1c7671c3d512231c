//! Archive passthrough copier
//!
//! Copies a DOCX package entry by entry. Every entry except the target part
//! is raw-copied (compressed bytes and metadata untouched); the target part
//! is streamed through the [`transcode_part`] pipeline.

use crate::buffer::TranscodeStats;
use crate::config::FillConfig;
use crate::error::{FillError, FillResult};
use crate::transcoder::transcode_part;
use std::io::{BufReader, Read, Seek, Write};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Summary of one transcode call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Entries written to the destination
    pub entries: usize,
    /// Uncompressed bytes of the entries copied verbatim
    pub bytes_copied: u64,
    /// Statistics of the target part
    pub part: TranscodeStats,
}

/// A DOCX package opened for filling
pub struct DocxTemplate<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> DocxTemplate<R> {
    /// Open a package from a source that implements Read + Seek
    pub fn new(reader: R) -> FillResult<Self> {
        let archive = ZipArchive::new(reader).map_err(FillError::ArchiveOpen)?;
        Ok(Self { archive })
    }

    /// Names of all entries in archive order
    pub fn entry_names(&mut self) -> FillResult<Vec<String>> {
        (0..self.archive.len())
            .map(|index| self.entry_name(index))
            .collect()
    }

    /// Check if an entry exists in the archive
    pub fn has_part(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    fn entry_name(&mut self, index: usize) -> FillResult<String> {
        let entry = self
            .archive
            .by_index_raw(index)
            .map_err(|source| FillError::ArchiveRead {
                entry: format!("#{}", index),
                source,
            })?;
        Ok(entry.name().to_string())
    }

    /// Write a filled copy of the package to `writer`.
    ///
    /// Fails with [`FillError::MissingTargetEntry`] before anything is written
    /// if the target part is not in the archive.
    pub fn transcode<W: Write + Seek>(
        &mut self,
        config: &FillConfig,
        writer: W,
    ) -> FillResult<FillReport> {
        config.validate()?;
        if !self.has_part(&config.target_part) {
            return Err(FillError::MissingTargetEntry(config.target_part.clone()));
        }

        let mut zip = ZipWriter::new(writer);
        let mut report = FillReport::default();

        for (index, name) in self.entry_names()?.into_iter().enumerate() {
            if name == config.target_part {
                report.part = self.transcode_entry(config, index, &name, &mut zip)?;
            } else {
                let entry = self
                    .archive
                    .by_index_raw(index)
                    .map_err(|source| FillError::ArchiveRead {
                        entry: name.clone(),
                        source,
                    })?;
                debug!(entry = %name, size = entry.size(), "copying entry verbatim");
                report.bytes_copied += entry.size();
                zip.raw_copy_file(entry).map_err(FillError::Write)?;
            }
            report.entries += 1;
        }

        zip.finish().map_err(FillError::Write)?;

        info!(
            entries = report.entries,
            bytes_copied = report.bytes_copied,
            substitutions = report.part.substitutions,
            unmatched = report.part.unmatched_candidates,
            forced_flushes = report.part.forced_flushes,
            unbalanced = report.part.unbalanced_spans,
            "filled template"
        );
        Ok(report)
    }

    fn transcode_entry<W: Write + Seek>(
        &mut self,
        config: &FillConfig,
        index: usize,
        name: &str,
        zip: &mut ZipWriter<W>,
    ) -> FillResult<TranscodeStats> {
        let entry = self
            .archive
            .by_index(index)
            .map_err(|source| FillError::ArchiveRead {
                entry: name.to_string(),
                source,
            })?;

        let options = SimpleFileOptions::default().compression_method(entry.compression());
        zip.start_file(name, options).map_err(FillError::Write)?;

        debug!(entry = %name, "transcoding target part");
        transcode_part(config, BufReader::new(entry), zip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn package(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_entry_names_in_order() {
        let bytes = package(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", "<w:document/>"),
            ("docProps/app.xml", "<Properties/>"),
        ]);
        let mut template = DocxTemplate::new(Cursor::new(bytes)).unwrap();

        assert_eq!(
            template.entry_names().unwrap(),
            vec!["[Content_Types].xml", "word/document.xml", "docProps/app.xml"]
        );
        assert!(template.has_part("word/document.xml"));
        assert!(!template.has_part("word/styles.xml"));
    }

    #[test]
    fn test_not_a_zip() {
        let result = DocxTemplate::new(Cursor::new(b"plain text".to_vec()));
        assert!(matches!(result, Err(FillError::ArchiveOpen(_))));
    }

    #[test]
    fn test_missing_target_entry() {
        let bytes = package(&[("word/styles.xml", "<w:styles/>")]);
        let mut template = DocxTemplate::new(Cursor::new(bytes)).unwrap();

        let mut out = Vec::new();
        let err = template
            .transcode(&FillConfig::default(), Cursor::new(&mut out))
            .unwrap_err();

        assert!(matches!(err, FillError::MissingTargetEntry(ref name) if name == "word/document.xml"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_invalid_config_writes_nothing() {
        let bytes = package(&[("word/document.xml", "<w:document/>")]);
        let mut template = DocxTemplate::new(Cursor::new(bytes)).unwrap();
        let config = FillConfig::default().with_buffer_capacity(0);

        let mut out = Vec::new();
        let err = template.transcode(&config, Cursor::new(&mut out)).unwrap_err();

        assert!(matches!(err, FillError::InvalidConfig(_)));
        assert!(out.is_empty());
    }
}
