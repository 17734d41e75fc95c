pub mod artifacts;
pub mod sink;
pub mod summary;

pub use artifacts::{Artifact, ArtifactKind, ArtifactRecorder};
pub use sink::{FileReportSink, MemorySink, NullSink, Outcome, ReportSink};
pub use summary::SuiteReport;
