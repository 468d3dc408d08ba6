//! Batch documentation generation for local source files.
//!
//! Reads each input file, requests a document for it, and either echoes
//! the document to stdout as it streams or writes it into an output
//! directory.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use docstream::{
    DEFAULT_RETRY_AFTER_SECS, DocType, ErrorKind, GenerateError, GenerationRequest,
    GenerationResult, Generator,
};
use tracing::{debug, warn};

/// Configuration for a batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Documentation flavor to request.
    pub doc_type: DocType,
    /// Language override; detected from the file extension when `None`.
    pub language: Option<String>,
    /// Directory generated documents are written into. When `None`,
    /// documents stream to stdout instead.
    pub out_dir: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            doc_type: DocType::Readme,
            language: None,
            out_dir: None,
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Files that produced a document.
    pub succeeded: usize,
    /// Files that did not.
    pub failed: usize,
    /// Wall-clock time the whole batch took.
    pub duration: Duration,
}

impl BatchReport {
    /// Number of files attempted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Drives documentation generation over a list of files.
#[derive(Debug)]
pub struct BatchRunner {
    generator: Generator,
    config: BatchConfig,
}

impl BatchRunner {
    /// Create a runner with the given generator and configuration.
    #[must_use]
    pub fn new(generator: Generator, config: BatchConfig) -> Self {
        Self { generator, config }
    }

    /// Generate documentation for every input, continuing past per-file
    /// failures. A rate-limit failure stops the rest of the batch, since
    /// the remaining requests would be rejected too. Ends with a summary
    /// of how many files succeeded and how long the batch took.
    pub async fn run(&self, inputs: &[PathBuf]) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::default();
        for (index, input) in inputs.iter().enumerate() {
            if inputs.len() > 1 {
                println!("==> {}", input.display());
            }
            match self.generate_one(input).await {
                Ok(()) => report.succeeded += 1,
                Err(error) => {
                    report.failed += 1;
                    warn!(input = %input.display(), %error, "generation failed");
                    if let Some(generate) = error.downcast_ref::<GenerateError>()
                        && generate.kind == ErrorKind::RateLimit
                    {
                        let wait = generate
                            .retry_after_seconds
                            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                        let remaining = inputs.len() - index - 1;
                        if remaining > 0 {
                            eprintln!(
                                "Rate limited; retry in {wait}s. Skipping {remaining} remaining file(s)."
                            );
                        } else {
                            eprintln!("Rate limited; retry in {wait}s.");
                        }
                        break;
                    }
                }
            }
        }
        report.duration = started.elapsed();
        eprintln!(
            "{} ok, {} failed in {:.1}s",
            report.succeeded,
            report.failed,
            report.duration.as_secs_f64()
        );
        report
    }

    async fn generate_one(&self, input: &Path) -> anyhow::Result<()> {
        let code = std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?;
        let filename = input.file_name().map_or_else(
            || input.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        );

        let mut request = GenerationRequest::new(code, self.config.doc_type, filename);
        let language = self
            .config
            .language
            .clone()
            .or_else(|| language_for(input).map(String::from));
        if let Some(language) = language {
            request = request.with_language(language);
        }

        let result = match &self.config.out_dir {
            Some(out_dir) => {
                let result = self.generator.generate(request).await?;
                let path = output_path(input, self.config.doc_type, out_dir);
                write_output(&path, &result.documentation)?;
                println!("wrote {}", path.display());
                result
            }
            None => self.stream_to_stdout(request).await?,
        };

        if let Some(score) = result.quality_score {
            debug!(%score, "quality score");
        }
        Ok(())
    }

    /// Run one generation, printing the document to stdout as it streams.
    async fn stream_to_stdout(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, GenerateError> {
        let mut updates = self.generator.subscribe();
        let mut printed = 0;

        let mut generation = pin!(self.generator.generate(request));
        let result = loop {
            tokio::select! {
                biased;
                result = &mut generation => break result,
                Ok(()) = updates.changed() => {
                    let delta = {
                        let state = updates.borrow_and_update();
                        (state.document.len() > printed)
                            .then(|| state.document[printed..].to_string())
                    };
                    if let Some(text) = delta {
                        printed += text.len();
                        print!("{text}");
                        io::stdout().flush().ok();
                    }
                }
            }
        };

        // The final state update can race the generation future; print
        // whatever the loop did not get to.
        if let Ok(result) = &result {
            if result.documentation.len() > printed {
                print!("{}", &result.documentation[printed..]);
            }
            println!();
            io::stdout().flush().ok();
        }
        result
    }
}

/// Best-effort source language from a file extension.
#[must_use]
pub fn language_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?;
    let language = match extension.to_ascii_lowercase().as_str() {
        "rs" => "rust",
        "py" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "ts" | "mts" => "typescript",
        "tsx" => "tsx",
        "go" => "go",
        "rb" => "ruby",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "swift" => "swift",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "sh" | "bash" => "shell",
        _ => return None,
    };
    Some(language)
}

/// Output path for an input, e.g. `src/demo.py` documented as a README
/// becomes `<out_dir>/demo.readme.md`.
fn output_path(input: &Path, doc_type: DocType, out_dir: &Path) -> PathBuf {
    let stem = input.file_stem().map_or_else(
        || "out".to_string(),
        |stem| stem.to_string_lossy().into_owned(),
    );
    out_dir.join(format!(
        "{stem}.{}.md",
        doc_type.as_str().to_ascii_lowercase()
    ))
}

/// Write a generated document, creating parent directories as needed.
fn write_output(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_for_known_extensions() {
        assert_eq!(language_for(Path::new("lib.rs")), Some("rust"));
        assert_eq!(language_for(Path::new("src/app.PY")), Some("python"));
        assert_eq!(language_for(Path::new("index.tsx")), Some("tsx"));
        assert_eq!(language_for(Path::new("notes.txt")), None);
        assert_eq!(language_for(Path::new("Makefile")), None);
    }

    #[test]
    fn test_output_path_uses_stem_and_doc_type() {
        let path = output_path(Path::new("src/demo.py"), DocType::Readme, Path::new("docs"));
        assert_eq!(path, Path::new("docs/demo.readme.md"));

        let path = output_path(Path::new("handler.ts"), DocType::Api, Path::new("."));
        assert_eq!(path, Path::new("./handler.api.md"));
    }

    #[test]
    fn test_write_output_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/demo.readme.md");
        write_output(&path, "# Demo\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Demo\n");
    }

    #[tokio::test]
    async fn test_run_reports_counts_and_duration() {
        let generator = docstream::Client::new("http://127.0.0.1:9").generator();
        let runner = BatchRunner::new(generator, BatchConfig::default());

        // The read fails before any request is issued.
        let report = runner.run(&[PathBuf::from("no/such/input.py")]).await;

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total(), 1);
        assert!(report.duration > Duration::ZERO);
    }
}
