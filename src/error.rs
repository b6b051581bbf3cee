use std::fmt::{Display, Formatter};

/// Errors reported by the sort engine.
///
/// The engine propagates [anyhow::Error] values. Failures that belong to one of the categories
/// below are created as a [SortError] and can be recovered with
/// [anyhow::Error::downcast_ref].
///
/// # Examples
/// ```
/// use csv_file_sort::error::SortError;
///
/// fn is_configuration_error(e: &anyhow::Error) -> bool {
///     matches!(e.downcast_ref::<SortError>(), Some(SortError::Configuration(_)))
/// }
/// ```
#[derive(Debug)]
pub enum SortError {
    /// Invalid or missing parameter, rejected before any work starts
    Configuration(String),
    /// A record that does not yield a key at the requested field index
    MalformedRecord {
        line: String,
        field_index: usize,
        reason: String,
    },
    /// Read or write failure inside a worker
    WorkerIo {
        task: String,
        source: std::io::Error,
    },
    /// One or more tasks of a phase failed, the phase did not complete
    PhaseFailure {
        phase: String,
        failed: Vec<String>,
    },
}

impl SortError {
    pub(crate) fn configuration(message: impl Into<String>) -> SortError {
        SortError::Configuration(message.into())
    }

    pub(crate) fn malformed(line: &str, field_index: usize, reason: impl Into<String>) -> SortError {
        SortError::MalformedRecord {
            line: line.to_string(),
            field_index,
            reason: reason.into(),
        }
    }

    pub(crate) fn worker_io(task: &str, source: std::io::Error) -> SortError {
        SortError::WorkerIo {
            task: task.to_string(),
            source,
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SortError::Configuration(message) => {
                write!(f, "configuration error: {}", message)
            }
            SortError::MalformedRecord { line, field_index, reason } => {
                write!(f, "malformed record, field index: {}, reason: {}, line: {}", field_index, reason, line)
            }
            SortError::WorkerIo { task, .. } => {
                write!(f, "I/O failure in task {}", task)
            }
            SortError::PhaseFailure { phase, failed } => {
                write!(f, "phase {} failed, failed tasks: [{}]", phase, failed.join(", "))
            }
        }
    }
}

impl std::error::Error for SortError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SortError::WorkerIo { source, .. } => Some(source),
            _ => None,
        }
    }
}
