//! Export step
//!
//! Copies a library entry's input file into the output directory under a
//! name rendered from a pattern such as `"{Camelot} - {BPM} - {OriginalName}"`.
//! The input is never moved, so an entry can be exported repeatedly under
//! different patterns.

use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tracing::{info, warn};
use uuid::Uuid;

use crate::library::MetadataStore;

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Entry, its input path, or the file on disk is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Pattern cannot be rendered into a file name
    #[error("Invalid naming pattern: {0}")]
    InvalidPattern(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Naming request for one export
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    /// Library entry filename
    pub filename: String,
    /// Naming pattern with `{OriginalName}`, `{Key}`, `{BPM}`, `{Camelot}`
    pub pattern: String,
    pub bpm: f64,
    pub key: String,
    pub camelot: String,
}

/// Completed export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub id: Uuid,
    pub output_filename: String,
}

/// Renders export names and copies files into the output directory
#[derive(Debug, Clone)]
pub struct Exporter {
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl Exporter {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Copy the entry's input to a fresh, collision-free output name and
    /// record it as the entry's output
    pub async fn export(
        &self,
        store: &MetadataStore,
        request: &ExportRequest,
    ) -> Result<ExportOutcome, ExportError> {
        let entry = store
            .get_entry_by_filename(&request.filename)
            .await
            .ok_or_else(|| ExportError::NotFound(format!("No library entry for {}", request.filename)))?;
        let input_path = entry
            .input_path
            .as_deref()
            .ok_or_else(|| ExportError::NotFound(format!("Input file not in library: {}", request.filename)))?;

        let source = self.input_dir.join(input_path);
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            return Err(ExportError::NotFound(format!(
                "Source file missing on disk: {}",
                input_path
            )));
        }

        let original = Path::new(&request.filename);
        let original_name = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = original
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let rendered = render_pattern(
            &request.pattern,
            &original_name,
            &request.key,
            &format_bpm(request.bpm),
            &request.camelot,
        )?;
        let stem = sanitize(&rendered);
        if stem.trim_matches('.').trim().is_empty() {
            return Err(ExportError::InvalidPattern(format!(
                "pattern {:?} renders to an empty file name",
                request.pattern
            )));
        }

        let (destination, output_filename) = self.copy_to_free_name(&source, &stem, &extension).await?;
        store.set_output(entry.id, &output_filename).await;

        info!(
            id = %entry.id,
            source = %source.display(),
            destination = %destination.display(),
            "Entry exported"
        );

        Ok(ExportOutcome {
            id: entry.id,
            output_filename,
        })
    }

    /// Reserve `stem.ext`, else `stem_1.ext`, `stem_2.ext`, ... and copy into it
    async fn copy_to_free_name(
        &self,
        source: &Path,
        stem: &str,
        extension: &str,
    ) -> Result<(PathBuf, String), ExportError> {
        let mut counter = 0usize;
        loop {
            let filename = match counter {
                0 => format!("{}{}", stem, extension),
                n => format!("{}_{}{}", stem, n, extension),
            };
            let destination = self.output_dir.join(&filename);

            match OpenOptions::new().write(true).create_new(true).open(&destination).await {
                Ok(mut target) => {
                    if let Err(e) = copy_contents(source, &mut target).await {
                        drop(target);
                        if let Err(cleanup) = tokio::fs::remove_file(&destination).await {
                            warn!(path = %destination.display(), error = %cleanup, "Failed to remove partial export");
                        }
                        return Err(e.into());
                    }
                    return Ok((destination, filename));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

async fn copy_contents(source: &Path, target: &mut File) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut reader = File::open(source).await?;
    tokio::io::copy(&mut reader, target).await?;
    target.flush().await
}

/// Substitute naming placeholders
///
/// `{{` and `}}` produce literal braces. Unknown placeholders and unbalanced
/// braces are rejected.
pub fn render_pattern(
    pattern: &str,
    original_name: &str,
    key: &str,
    bpm: &str,
    camelot: &str,
) -> Result<String, ExportError> {
    let mut rendered = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                rendered.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => {
                            return Err(ExportError::InvalidPattern(format!(
                                "unclosed placeholder in {:?}",
                                pattern
                            )))
                        }
                    }
                }
                let value = match name.as_str() {
                    "OriginalName" => original_name,
                    "Key" => key,
                    "BPM" => bpm,
                    "Camelot" => camelot,
                    other => {
                        return Err(ExportError::InvalidPattern(format!(
                            "unknown placeholder {{{}}}",
                            other
                        )))
                    }
                };
                rendered.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                rendered.push('}');
            }
            '}' => {
                return Err(ExportError::InvalidPattern(format!(
                    "unmatched '}}' in {:?}",
                    pattern
                )))
            }
            _ => rendered.push(c),
        }
    }

    Ok(rendered)
}

/// Keep only alphanumerics, space, hyphen, underscore and period
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect()
}

/// Decimal rendering of a tempo: `128.0`, `127.5`
pub fn format_bpm(bpm: f64) -> String {
    if bpm.is_finite() && bpm.fract() == 0.0 && bpm.abs() < 1e16 {
        format!("{:.1}", bpm)
    } else {
        format!("{}", bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        input: PathBuf,
        output: PathBuf,
        store: MetadataStore,
        exporter: Exporter,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input");
        let output = dir.path().join("output");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::create_dir_all(&output).unwrap();
        let store = MetadataStore::open(dir.path().join("library.json")).await;
        let exporter = Exporter::new(&input, &output);
        Fixture {
            _dir: dir,
            input,
            output,
            store,
            exporter,
        }
    }

    fn request(filename: &str, pattern: &str) -> ExportRequest {
        ExportRequest {
            filename: filename.to_string(),
            pattern: pattern.to_string(),
            bpm: 128.0,
            key: "C Major".to_string(),
            camelot: "8B".to_string(),
        }
    }

    #[tokio::test]
    async fn test_export_renames_and_avoids_collisions() {
        let fx = fixture().await;
        std::fs::write(fx.input.join("test.mp3"), b"audio bytes").unwrap();
        let entry = fx.store.add_entry("test.mp3").await;
        let req = request("test.mp3", "{Camelot} - {BPM} - {OriginalName}");

        let first = fx.exporter.export(&fx.store, &req).await.unwrap();
        assert_eq!(first.id, entry.id);
        assert_eq!(first.output_filename, "8B - 128.0 - test.mp3");

        let second = fx.exporter.export(&fx.store, &req).await.unwrap();
        assert_eq!(second.output_filename, "8B - 128.0 - test_1.mp3");

        assert_eq!(std::fs::read(fx.output.join("8B - 128.0 - test_1.mp3")).unwrap(), b"audio bytes");
        assert!(fx.input.join("test.mp3").exists());

        let stored = fx.store.get_entry(entry.id).await.unwrap();
        assert_eq!(stored.output_path.as_deref(), Some("8B - 128.0 - test_1.mp3"));
        assert_eq!(stored.input_path.as_deref(), Some("test.mp3"));
    }

    #[tokio::test]
    async fn test_export_uses_smallest_free_suffix() {
        let fx = fixture().await;
        std::fs::write(fx.input.join("song.wav"), b"x").unwrap();
        std::fs::write(fx.output.join("song.wav"), b"old").unwrap();
        std::fs::write(fx.output.join("song_2.wav"), b"old").unwrap();
        fx.store.add_entry("song.wav").await;

        let outcome = fx
            .exporter
            .export(&fx.store, &request("song.wav", "{OriginalName}"))
            .await
            .unwrap();
        assert_eq!(outcome.output_filename, "song_1.wav");
    }

    #[tokio::test]
    async fn test_export_without_entry_is_not_found() {
        let fx = fixture().await;
        let err = fx
            .exporter
            .export(&fx.store, &request("nope.mp3", "{OriginalName}"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_export_with_missing_source_is_not_found() {
        let fx = fixture().await;
        fx.store.add_entry("ghost.mp3").await;

        let err = fx
            .exporter
            .export(&fx.store, &request("ghost.mp3", "{OriginalName}"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NotFound(_)));
        assert_eq!(std::fs::read_dir(&fx.output).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_export_after_input_cleared_is_not_found() {
        let fx = fixture().await;
        std::fs::write(fx.input.join("a.mp3"), b"x").unwrap();
        let entry = fx.store.add_entry("a.mp3").await;
        fx.store.set_output(entry.id, "a_out.mp3").await;
        fx.store.delete_input(entry.id).await;

        let err = fx
            .exporter
            .export(&fx.store, &request("a.mp3", "{OriginalName}"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_export_rejects_empty_name() {
        let fx = fixture().await;
        std::fs::write(fx.input.join("a.mp3"), b"x").unwrap();
        fx.store.add_entry("a.mp3").await;

        let err = fx
            .exporter
            .export(&fx.store, &request("a.mp3", "///"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidPattern(_)));
    }

    #[test]
    fn test_render_pattern_substitutes_all_placeholders() {
        let rendered = render_pattern("{Key} | {BPM} | {Camelot} | {OriginalName}", "intro", "A Minor", "127.5", "8A").unwrap();
        assert_eq!(rendered, "A Minor | 127.5 | 8A | intro");
    }

    #[test]
    fn test_render_pattern_escapes_and_errors() {
        assert_eq!(render_pattern("{{x}}", "n", "k", "1.0", "c").unwrap(), "{x}");
        assert!(matches!(render_pattern("{Tempo}", "n", "k", "1.0", "c"), Err(ExportError::InvalidPattern(_))));
        assert!(matches!(render_pattern("{Key", "n", "k", "1.0", "c"), Err(ExportError::InvalidPattern(_))));
        assert!(matches!(render_pattern("Key}", "n", "k", "1.0", "c"), Err(ExportError::InvalidPattern(_))));
    }

    #[test]
    fn test_sanitize_strips_disallowed_characters() {
        assert_eq!(sanitize("8B - 128.0 - test"), "8B - 128.0 - test");
        assert_eq!(sanitize("C#/Major: remix?"), "CMajor remix");
        assert_eq!(sanitize("../etc/passwd"), "..etcpasswd");
        assert_eq!(sanitize("Café_01"), "Café_01");
    }

    #[test]
    fn test_format_bpm() {
        assert_eq!(format_bpm(128.0), "128.0");
        assert_eq!(format_bpm(127.5), "127.5");
        assert_eq!(format_bpm(90.25), "90.25");
    }
}
