//! Workflow services: link testing, the auto and manual workflows, progress
//! reporting and output files

pub mod batch;
pub mod link_tester;
pub mod manual_export;
pub mod output_sink;
pub mod progress;

pub use batch::{BatchOrchestrator, BatchReport, FileManifestEntry, TestPhaseReport};
pub use link_tester::LinkTester;
pub use manual_export::ManualSession;
pub use output_sink::{LocalOutputDirectory, OutputSink};
pub use progress::{BatchState, ProgressEvent, ProgressReporter};
