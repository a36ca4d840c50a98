//! Wire types for the Assistants API surface the workflow touches.
//!
//! Only the fields the driver reads are modeled; serde ignores the rest of
//! each payload. Unknown content-block and annotation types deserialize into
//! catch-all variants instead of failing the whole message list.

use derive_more::{Deref, Display, From};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a file stored by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, From, Deref, Display, Serialize, Deserialize)]
pub struct FileId(String);

/// Identifier of a configured assistant.
#[derive(Debug, Clone, PartialEq, Eq, From, Deref, Display, Serialize, Deserialize)]
pub struct AssistantId(String);

/// Identifier of a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, From, Deref, Display, Serialize, Deserialize)]
pub struct ThreadId(String);

/// Identifier of one run of an assistant against a thread.
#[derive(Debug, Clone, PartialEq, Eq, From, Deref, Display, Serialize, Deserialize)]
pub struct RunId(String);

/// A file stored by the remote service.
#[derive(Debug, Clone, Deserialize)]
pub struct FileObject {
    pub id: FileId,
    pub filename: String,
    pub bytes: u64,
    pub purpose: String,
}

/// An assistant with its attached tool set and files.
#[derive(Debug, Clone, Deserialize)]
pub struct Assistant {
    pub id: AssistantId,
    pub name: Option<String>,
    pub model: String,
    pub instructions: Option<String>,
    #[serde(default)]
    pub file_ids: Vec<FileId>,
}

/// A conversation thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
}

/// One execution of an assistant against a thread.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub thread_id: ThreadId,
    pub assistant_id: AssistantId,
    pub status: RunStatus,
    pub last_error: Option<RunError>,
}

/// Failure detail the service attaches to a run that did not complete.
#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    pub code: Option<String>,
    pub message: String,
}

/// The closed set of run states the service reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
}

impl RunStatus {
    /// True once the service will never change the status again.
    ///
    /// `RequiresAction` and `Cancelling` are still in flight: a run parked in
    /// `RequiresAction` waits for tool outputs this driver never submits, so
    /// it is left to the poll bound rather than treated as settled.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired
        )
    }

    /// True only for the success terminal state.
    pub fn is_success(self) -> bool {
        self == RunStatus::Completed
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Expired => "expired",
        };
        write!(f, "{name}")
    }
}

/// Message role in a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in a thread, as returned by the message list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: Vec<MessageContent>,
}

/// One content block of a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    ImageFile { image_file: FileRef },
    #[serde(other)]
    Other,
}

/// Text value plus the annotations the service attached to it.
#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// Annotation on a text block.
///
/// `file_path` is the one kind the workflow acts on: its `text` is the
/// sandbox path the assistant printed (the only type information upstream
/// provides) and `file_path.file_id` is the generated file behind it.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    FilePath { text: String, file_path: FileRef },
    #[serde(other)]
    Other,
}

/// Reference to a file by id, as nested in annotations and image blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub file_id: FileId,
}

/// One step of a run, as returned by the step list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RunStep {
    pub id: String,
    pub step_details: StepDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepDetails {
    ToolCalls { tool_calls: Vec<ToolCall> },
    MessageCreation { message_creation: MessageCreationRef },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreationRef {
    pub message_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolCall {
    CodeInterpreter { code_interpreter: CodeInterpreterCall },
    #[serde(other)]
    Other,
}

/// The source the interpreter ran and everything it emitted.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeInterpreterCall {
    pub input: String,
    #[serde(default)]
    pub outputs: Vec<CodeInterpreterOutput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodeInterpreterOutput {
    Logs { logs: String },
    Image { image: FileRef },
    #[serde(other)]
    Other,
}

/// `{ "data": [...] }` envelope around message and step lists.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Acknowledgement returned by the delete endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletionStatus {
    pub id: String,
    pub deleted: bool,
}

/// Request to create an assistant.
#[derive(Debug, Clone, Serialize)]
pub struct CreateAssistantRequest {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<ToolSpec>,
}

/// Tool capability declared on an assistant.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolSpec {
    CodeInterpreter,
}

/// Request to seed a thread with a message.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest {
    pub role: MessageRole,
    pub content: String,
}

/// The service's error payload, as carried inside non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_deserializes_with_failure_detail() {
        let payload = serde_json::json!({
            "id": "run_abc",
            "object": "thread.run",
            "created_at": 1_699_000_000,
            "thread_id": "thread_abc",
            "assistant_id": "asst_abc",
            "status": "failed",
            "last_error": { "code": "server_error", "message": "sandbox crashed" },
            "model": "gpt-3.5-turbo"
        });

        let run: Run = serde_json::from_value(payload).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        let error = run.last_error.unwrap();
        assert_eq!(error.code.as_deref(), Some("server_error"));
        assert_eq!(error.message, "sandbox crashed");
    }

    #[test]
    fn run_status_terminal_set() {
        let terminal = [
            RunStatus::Completed,
            RunStatus::Failed,
            RunStatus::Cancelled,
            RunStatus::Expired,
        ];
        let in_flight = [
            RunStatus::Queued,
            RunStatus::InProgress,
            RunStatus::RequiresAction,
            RunStatus::Cancelling,
        ];

        for status in terminal {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
        for status in in_flight {
            assert!(!status.is_terminal(), "{status} should not be terminal");
        }
        assert!(RunStatus::Completed.is_success());
        assert!(!RunStatus::Failed.is_success());
    }

    #[test]
    fn message_parses_file_path_annotations() {
        let payload = serde_json::json!({
            "id": "msg_abc",
            "object": "thread.message",
            "role": "assistant",
            "content": [
                {
                    "type": "text",
                    "text": {
                        "value": "Your file is ready: sandbox:/mnt/data/script.py",
                        "annotations": [
                            {
                                "type": "file_path",
                                "text": "sandbox:/mnt/data/script.py",
                                "start_index": 20,
                                "end_index": 47,
                                "file_path": { "file_id": "file-out" }
                            }
                        ]
                    }
                },
                { "type": "image_file", "image_file": { "file_id": "file-img" } }
            ]
        });

        let message: Message = serde_json::from_value(payload).unwrap();
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.content.len(), 2);

        match &message.content[0] {
            MessageContent::Text { text } => {
                assert_eq!(text.annotations.len(), 1);
                match &text.annotations[0] {
                    Annotation::FilePath { text, file_path } => {
                        assert_eq!(text, "sandbox:/mnt/data/script.py");
                        assert_eq!(file_path.file_id, FileId::from("file-out".to_string()));
                    }
                    other => panic!("unexpected annotation: {other:?}"),
                }
            }
            other => panic!("unexpected content block: {other:?}"),
        }
        assert!(matches!(&message.content[1], MessageContent::ImageFile { .. }));
    }

    #[test]
    fn unknown_block_and_annotation_types_are_tolerated() {
        let payload = serde_json::json!({
            "id": "msg_abc",
            "role": "assistant",
            "content": [
                { "type": "refusal", "refusal": "no" },
                {
                    "type": "text",
                    "text": {
                        "value": "see citation",
                        "annotations": [
                            {
                                "type": "file_citation",
                                "text": "[1]",
                                "file_citation": { "file_id": "file-x", "quote": "..." }
                            }
                        ]
                    }
                }
            ]
        });

        let message: Message = serde_json::from_value(payload).unwrap();
        assert!(matches!(&message.content[0], MessageContent::Other));
        match &message.content[1] {
            MessageContent::Text { text } => {
                assert!(matches!(&text.annotations[0], Annotation::Other));
            }
            other => panic!("unexpected content block: {other:?}"),
        }
    }

    #[test]
    fn run_step_parses_code_interpreter_details() {
        let payload = serde_json::json!({
            "id": "step_abc",
            "object": "thread.run.step",
            "type": "tool_calls",
            "status": "completed",
            "step_details": {
                "type": "tool_calls",
                "tool_calls": [
                    {
                        "id": "call_abc",
                        "type": "code_interpreter",
                        "code_interpreter": {
                            "input": "print('hi')",
                            "outputs": [
                                { "type": "logs", "logs": "hi\n" },
                                { "type": "image", "image": { "file_id": "file-img" } }
                            ]
                        }
                    }
                ]
            }
        });

        let step: RunStep = serde_json::from_value(payload).unwrap();
        match &step.step_details {
            StepDetails::ToolCalls { tool_calls } => match &tool_calls[0] {
                ToolCall::CodeInterpreter { code_interpreter } => {
                    assert_eq!(code_interpreter.input, "print('hi')");
                    assert_eq!(code_interpreter.outputs.len(), 2);
                    assert!(matches!(
                        &code_interpreter.outputs[1],
                        CodeInterpreterOutput::Image { image } if *image.file_id == "file-img"
                    ));
                }
                other => panic!("unexpected tool call: {other:?}"),
            },
            other => panic!("unexpected step details: {other:?}"),
        }
    }

    #[test]
    fn create_assistant_request_declares_code_interpreter() {
        let request = CreateAssistantRequest {
            name: "Coding Bot".to_string(),
            instructions: "write code".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            tools: vec![ToolSpec::CodeInterpreter],
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["tools"][0]["type"], "code_interpreter");
        assert_eq!(body["name"], "Coding Bot");
    }
}
