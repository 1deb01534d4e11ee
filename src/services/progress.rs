//! Progress events published by the workflows
//!
//! Events go out over an unbounded channel so the coordinating task never
//! waits on a slow front end. A reporter without a receiver drops events.

use tokio::sync::mpsc;

use crate::models::TestResult;

/// Phase of the auto workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Testing,
    TestsComplete,
    Cancelled,
    Processing,
    Done,
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BatchState::Idle => "idle",
            BatchState::Testing => "testing",
            BatchState::TestsComplete => "tests_complete",
            BatchState::Cancelled => "cancelled",
            BatchState::Processing => "processing",
            BatchState::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Phase(BatchState),
    /// One link finished testing
    LinkTested {
        index: usize,
        total: usize,
        url: String,
        result: TestResult,
        working: usize,
        failed: usize,
        percent: f32,
    },
    /// A link is being processed
    Processing {
        index: usize,
        total: usize,
        label: String,
        percent: f32,
    },
    Log(String),
    FileWritten {
        filename: String,
        channels: usize,
    },
    Completed {
        channels_seen: usize,
        channels_written: usize,
        files_written: usize,
    },
}

/// Sending half handed to the workflows
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    /// Create a reporter and the receiver a front end listens on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A reporter that discards everything
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            // A closed receiver only means nobody is watching
            let _ = sender.send(event);
        }
    }

    pub fn phase(&self, state: BatchState) {
        self.emit(ProgressEvent::Phase(state));
    }

    pub fn log(&self, line: impl Into<String>) {
        self.emit(ProgressEvent::Log(line.into()));
    }
}

/// Percentage of `done` out of `total`, 100 for an empty total
pub fn percent(done: usize, total: usize) -> f32 {
    if total == 0 {
        100.0
    } else {
        done as f32 * 100.0 / total as f32
    }
}
