//! The sequential pipeline that drives a code-interpreter assistant.
//!
//! Upload an input file, provision an assistant around it, seed a thread with
//! the user query, poll the run to a terminal state, then download whatever
//! artifacts the run's messages point at. Every remote resource the pipeline
//! creates is recorded in a [`RemoteResources`] set and deleted best-effort
//! on both the success and the error exit.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::time::sleep;

use crate::client::types::{
    Annotation, AssistantId, CodeInterpreterOutput, CreateAssistantRequest, CreateMessageRequest,
    FileId, Message, MessageContent, MessageRole, RunId, RunStatus, StepDetails, ThreadId,
    ToolCall, ToolSpec,
};
use crate::client::{ClientError, OpenAIClient};
use crate::config::WorkflowConfig;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("run {run_id} ended as {status}: {detail}")]
    RunFailed {
        run_id: RunId,
        status: RunStatus,
        detail: String,
    },
    #[error("run {run_id} still {status} after {attempts} status checks")]
    PollTimeout {
        run_id: RunId,
        status: RunStatus,
        attempts: u32,
    },
    #[error("the run produced no downloadable output file")]
    NoOutputFile,
    #[error("File write error: {0}")]
    Io(#[from] std::io::Error),
}

/// Generated files picked out of the run's messages, by inferred kind.
#[derive(Debug, Default, PartialEq)]
pub struct OutputFiles {
    pub image: Option<FileId>,
    pub code: Option<FileId>,
}

/// Remote resources created during one pipeline pass, kept so cleanup can
/// delete exactly what exists regardless of where the pass stopped.
#[derive(Debug, Default)]
pub struct RemoteResources {
    pub uploaded_file: Option<FileId>,
    pub generated_files: Vec<FileId>,
    pub assistant: Option<AssistantId>,
    pub thread: Option<ThreadId>,
}

/// Local paths the pipeline wrote artifacts to.
#[derive(Debug, Default)]
pub struct WorkflowReport {
    pub image: Option<PathBuf>,
    pub code: Option<PathBuf>,
}

pub struct Workflow {
    client: OpenAIClient,
    config: WorkflowConfig,
}

impl Workflow {
    pub fn new(config: WorkflowConfig) -> Self {
        let client = OpenAIClient::with_base_url(config.api_key.clone(), &config.base_url);
        Self { client, config }
    }

    /// Run the whole pipeline, then delete the remote resources it created.
    ///
    /// Cleanup runs on every exit path; its own failures are logged and
    /// swallowed so they never mask the pipeline result.
    pub async fn run(&self) -> Result<WorkflowReport, WorkflowError> {
        let mut resources = RemoteResources::default();
        let result = self.drive(&mut resources).await;
        if let Err(err) = &result {
            tracing::error!(error = %err, "workflow failed");
        }
        self.cleanup(&resources).await;
        result
    }

    async fn drive(
        &self,
        resources: &mut RemoteResources,
    ) -> Result<WorkflowReport, WorkflowError> {
        let file_id = self.upload(&self.config.input_file).await?;
        resources.uploaded_file = Some(file_id.clone());

        let assistant_id = self.create_assistant(&file_id).await?;
        resources.assistant = Some(assistant_id.clone());

        let thread_id = self.start_conversation(&self.config.query).await?;
        resources.thread = Some(thread_id.clone());

        let (run_id, messages) = self.execute(&assistant_id, &thread_id).await?;

        self.log_transcript(&messages);
        self.log_code_interpreter_steps(&thread_id, &run_id).await;

        let outputs = select_output_files(&messages);
        resources.generated_files.extend(
            outputs
                .image
                .iter()
                .chain(outputs.code.iter())
                .cloned(),
        );
        if outputs.image.is_none() && outputs.code.is_none() {
            return Err(WorkflowError::NoOutputFile);
        }

        let mut report = WorkflowReport::default();
        if let Some(image) = &outputs.image {
            self.download(image, &self.config.image_output).await?;
            report.image = Some(self.config.image_output.clone());
        }
        if let Some(code) = &outputs.code {
            self.download(code, &self.config.code_output).await?;
            report.code = Some(self.config.code_output.clone());
        }
        Ok(report)
    }

    /// Upload the local input file, yielding its remote handle.
    pub async fn upload(&self, path: &Path) -> Result<FileId, WorkflowError> {
        let file = self.client.upload_file(path).await?;
        tracing::info!(
            file_id = %file.id,
            filename = %file.filename,
            bytes = file.bytes,
            "input file uploaded"
        );
        Ok(file.id)
    }

    /// Create the assistant and attach the uploaded file to it.
    pub async fn create_assistant(&self, file: &FileId) -> Result<AssistantId, WorkflowError> {
        let request = CreateAssistantRequest {
            name: self.config.assistant_name.clone(),
            instructions: self.config.instructions.clone(),
            model: self.config.model.clone(),
            tools: vec![ToolSpec::CodeInterpreter],
        };
        let assistant = self.client.create_assistant(&request).await?;
        // The create endpoint does not take files; they are attached in a
        // second call once the assistant exists.
        self.client
            .update_assistant_files(&assistant.id, std::slice::from_ref(file))
            .await?;
        tracing::info!(assistant_id = %assistant.id, model = %request.model, "assistant created");
        Ok(assistant.id)
    }

    /// Create a thread pre-seeded with the user query.
    pub async fn start_conversation(&self, query: &str) -> Result<ThreadId, WorkflowError> {
        let seed = CreateMessageRequest {
            role: MessageRole::User,
            content: query.to_string(),
        };
        let thread = self.client.create_thread(&[seed]).await?;
        tracing::info!(thread_id = %thread.id, "conversation thread created");
        Ok(thread.id)
    }

    /// Start a run and poll it until it settles, then list the thread.
    ///
    /// The loop sleeps one interval before the first status check and after
    /// every non-terminal one, so at least one check always happens. A
    /// non-success terminal status aborts with [`WorkflowError::RunFailed`];
    /// a run that never settles within `max_polls` checks aborts with
    /// [`WorkflowError::PollTimeout`].
    pub async fn execute(
        &self,
        assistant: &AssistantId,
        thread: &ThreadId,
    ) -> Result<(RunId, Vec<Message>), WorkflowError> {
        let run = self.client.create_run(thread, assistant).await?;
        let run_id = run.id;
        tracing::info!(run_id = %run_id, status = %run.status, "run created");

        sleep(self.config.poll_interval).await;

        let mut attempts: u32 = 0;
        loop {
            let run = self.client.retrieve_run(thread, &run_id).await?;
            attempts += 1;
            tracing::info!(run_id = %run_id, status = %run.status, attempts, "run status");

            if run.status.is_success() {
                break;
            }
            if run.status.is_terminal() {
                let detail = run
                    .last_error
                    .map(|error| match error.code {
                        Some(code) => format!("{code}: {}", error.message),
                        None => error.message,
                    })
                    .unwrap_or_else(|| "no failure detail reported".to_string());
                return Err(WorkflowError::RunFailed {
                    run_id,
                    status: run.status,
                    detail,
                });
            }
            if attempts >= self.config.max_polls {
                return Err(WorkflowError::PollTimeout {
                    run_id,
                    status: run.status,
                    attempts,
                });
            }
            sleep(self.config.poll_interval).await;
        }

        let messages = self.client.list_messages(thread).await?;
        Ok((run_id, messages))
    }

    /// Fetch a generated file and write it to `dest`, overwriting.
    pub async fn download(&self, file: &FileId, dest: &Path) -> Result<(), WorkflowError> {
        let bytes = self.client.retrieve_file_content(file).await?;
        fs::write(dest, &bytes)?;
        tracing::info!(
            file_id = %file,
            path = %dest.display(),
            bytes = bytes.len(),
            "output file downloaded"
        );
        Ok(())
    }

    /// Delete the remote resources recorded in `resources`, best-effort.
    ///
    /// Safe to call again on handles the service has already deleted: the
    /// resulting errors are logged and swallowed.
    pub async fn cleanup(&self, resources: &RemoteResources) {
        for file in &resources.generated_files {
            if let Err(err) = self.client.delete_file(file).await {
                tracing::warn!(file_id = %file, error = %err, "could not delete generated file");
            }
        }
        if let Some(file) = &resources.uploaded_file {
            if let Err(err) = self.client.delete_file(file).await {
                tracing::warn!(file_id = %file, error = %err, "could not delete uploaded file");
            }
        }
        if let Some(assistant) = &resources.assistant {
            if let Err(err) = self.client.delete_assistant(assistant).await {
                tracing::warn!(assistant_id = %assistant, error = %err, "could not delete assistant");
            }
        }
        if let Some(thread) = &resources.thread {
            if let Err(err) = self.client.delete_thread(thread).await {
                tracing::warn!(thread_id = %thread, error = %err, "could not delete thread");
            }
        }
    }

    /// Log every text block of the conversation, oldest first as listed.
    fn log_transcript(&self, messages: &[Message]) {
        for message in messages {
            for block in &message.content {
                if let MessageContent::Text { text } = block {
                    tracing::info!(role = %message.role, "{}", text.value);
                }
            }
        }
    }

    /// Log what the code interpreter ran and emitted during the run.
    ///
    /// Step logs are diagnostics only, so a failure to fetch them is logged
    /// and does not fail the pipeline.
    async fn log_code_interpreter_steps(&self, thread: &ThreadId, run: &RunId) {
        let steps = match self.client.list_run_steps(thread, run).await {
            Ok(steps) => steps,
            Err(err) => {
                tracing::warn!(run_id = %run, error = %err, "could not list run steps");
                return;
            }
        };

        for step in &steps {
            if let StepDetails::ToolCalls { tool_calls } = &step.step_details {
                for call in tool_calls {
                    if let ToolCall::CodeInterpreter { code_interpreter } = call {
                        tracing::info!(
                            step_id = %step.id,
                            "code interpreter input:\n{}",
                            code_interpreter.input
                        );
                        for output in &code_interpreter.outputs {
                            match output {
                                CodeInterpreterOutput::Logs { logs } => {
                                    tracing::info!(step_id = %step.id, "code interpreter logs:\n{logs}");
                                }
                                CodeInterpreterOutput::Image { image } => {
                                    tracing::info!(
                                        step_id = %step.id,
                                        file_id = %image.file_id,
                                        "code interpreter produced an image"
                                    );
                                }
                                CodeInterpreterOutput::Other => {}
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Scan every text block's annotations and classify generated files by the
/// path text: `.png` marks an image, `.py` marks code. The path substring is
/// the only type information the service provides; when several annotations
/// match the same kind, the last one wins.
pub fn select_output_files(messages: &[Message]) -> OutputFiles {
    let mut outputs = OutputFiles::default();
    for message in messages {
        for block in &message.content {
            if let MessageContent::Text { text } = block {
                for annotation in &text.annotations {
                    if let Annotation::FilePath { text: path, file_path } = annotation {
                        if path.contains(".png") {
                            outputs.image = Some(file_path.file_id.clone());
                        } else if path.contains(".py") {
                            outputs.code = Some(file_path.file_id.clone());
                        }
                    }
                }
            }
        }
    }
    outputs
}
