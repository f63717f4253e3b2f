/*!
 * The `document_translator` tool.
 *
 * This is the only surface a dispatching agent sees: a file path goes in and
 * a one-line status message comes out. The document itself never crosses the
 * boundary. Rust callers that want typed errors use `try_translate`.
 */

use log::{debug, error, info};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

use crate::app_config::Config;
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::providers::Provider;
use crate::translation::{
    CancellationFlag, JobReport, ModelTranslator, ProgressCallback, Sequencer, SequencerProgress,
    TranslationJob,
};

/// Name under which the tool is registered with a dispatcher
pub const TOOL_NAME: &str = "document_translator";

/// Usage text shown to a dispatcher
pub const TOOL_DESCRIPTION: &str = "Translates long documents. \
Input: the path of the source file (file_path). \
Output: the path of the file holding the translation. \
The tool reads the file itself, translates it segment by segment and saves the result.";

/// Output paths currently being produced by a job in this process
static IN_FLIGHT_OUTPUTS: LazyLock<Mutex<HashSet<PathBuf>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Claim on an output path, released on drop
struct OutputReservation {
    path: PathBuf,
}

/// Registry key for `path`: canonical parent directory plus file name.
///
/// Falls back to the absolute path when the directory does not exist yet.
fn reservation_key(path: &Path) -> PathBuf {
    let canonical = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            parent.canonicalize().ok().map(|dir| dir.join(name))
        }
        _ => None,
    };
    canonical.unwrap_or_else(|| std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()))
}

impl OutputReservation {
    fn acquire(path: &Path) -> Result<Self, PipelineError> {
        let key = reservation_key(path);
        if !IN_FLIGHT_OUTPUTS.lock().insert(key.clone()) {
            return Err(PipelineError::Persistence {
                path: path.to_path_buf(),
                message: "output path is in use by another translation job".to_string(),
            });
        }
        Ok(Self { path: key })
    }
}

impl Drop for OutputReservation {
    fn drop(&mut self) {
        IN_FLIGHT_OUTPUTS.lock().remove(&self.path);
    }
}

/// Result of a successful tool call
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// Id of the job that produced the file
    pub job_id: Uuid,
    /// Where the translation was written
    pub output_path: PathBuf,
    /// Statistics of the run
    pub report: JobReport,
}

/// One-line status text for the outcome of a tool call
pub fn status_message(result: &Result<ToolOutcome, PipelineError>) -> String {
    match result {
        Ok(outcome) => format!(
            "Translation succeeded. Result saved to: {}",
            outcome.output_path.display()
        ),
        Err(e) => format!("Translation failed: {}", e),
    }
}

/// Translates a document file and saves the result next to it.
pub struct DocumentTranslatorTool {
    config: Config,
    provider: Arc<dyn Provider>,
    cancellation: CancellationFlag,
    progress: Option<ProgressCallback>,
}

impl DocumentTranslatorTool {
    pub fn new(config: Config, provider: Arc<dyn Provider>) -> Self {
        Self {
            config,
            provider,
            cancellation: CancellationFlag::new(),
            progress: None,
        }
    }

    /// Observe chunk progress of every job run by this tool
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SequencerProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn name(&self) -> &'static str {
        TOOL_NAME
    }

    pub fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Output file a call with `file_path` would write
    pub fn output_path_for<P: AsRef<Path>>(&self, file_path: P) -> Result<PathBuf, PipelineError> {
        let file_path = file_path.as_ref();
        FileManager::derive_output_path(
            file_path,
            self.config.output.directory.as_deref(),
            &self.config.output.prefix,
        )
        .map_err(|e| PipelineError::Input {
            path: file_path.to_path_buf(),
            message: format!("{:#}", e),
        })
    }

    /// Translate `file_path` and report the outcome as one line of text.
    ///
    /// Never fails: errors are folded into the returned message.
    pub async fn translate(&self, file_path: &str) -> String {
        status_message(&self.try_translate(file_path).await)
    }

    /// Translate `file_path` and write the result file.
    pub async fn try_translate<P: AsRef<Path>>(&self, file_path: P) -> Result<ToolOutcome, PipelineError> {
        let file_path = file_path.as_ref();
        info!("Tool {} called with file: {:?}", TOOL_NAME, file_path);

        let result = self.run(file_path).await;
        if let Err(e) = &result {
            error!("Translation of {:?} failed at {} stage: {}", file_path, e.stage(), e);
        }
        result
    }

    async fn run(&self, file_path: &Path) -> Result<ToolOutcome, PipelineError> {
        let source_text = FileManager::read_text(file_path).map_err(|e| PipelineError::Input {
            path: file_path.to_path_buf(),
            message: format!("{:#}", e),
        })?;

        let output_path = self.output_path_for(file_path)?;
        let _reservation = OutputReservation::acquire(&output_path)?;

        let translator = ModelTranslator::from_config(Arc::clone(&self.provider), &self.config);
        debug!("System prompt: {}", translator.system_prompt());
        let mut sequencer = Sequencer::from_config(&self.config, translator)
            .with_cancellation(self.cancellation.clone());
        if let Some(progress) = &self.progress {
            sequencer = sequencer.with_progress_callback(Arc::clone(progress));
        }

        let mut job = TranslationJob::new(source_text, self.config.chunking.context_chars);
        let report = sequencer.run(&mut job).await?;
        let job_id = job.id();
        let output = job.into_output().unwrap_or_default();

        FileManager::write_atomic(
            &output_path,
            &output,
            &job_id.to_string(),
            self.config.output.overwrite,
        )
        .map_err(|e| PipelineError::Persistence {
            path: output_path.clone(),
            message: format!("{:#}", e),
        })?;

        info!(
            "Job {}: {} chunk(s) translated, result saved to {:?}",
            job_id, report.chunks, output_path
        );

        Ok(ToolOutcome {
            job_id,
            output_path,
            report,
        })
    }
}

impl std::fmt::Debug for DocumentTranslatorTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentTranslatorTool")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}
