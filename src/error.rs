use thiserror::Error;

/// Caller contract violations reported by [`Writer`](crate::Writer).
///
/// Every error leaves the writer state and the output buffer untouched, the
/// failed call can be retried after fixing the problem.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Entry name must not be empty")]
    EmptyEntryName,
    #[error("Entry name too long ({length} B, length must fit into 16bit)")]
    TooLongEntryName { length: usize },
    #[error("An entry is still open, it has to be closed with end_file first")]
    EntryStillOpen,
    #[error("No entry is open, start_file has to be called first")]
    NoEntryOpen,
    #[error("The central directory was already started, no more entries can be added")]
    CentralDirectoryStarted,
    #[error("The archive is finished, reset the writer to encode another one")]
    ArchiveFinished,
    #[error("Output buffer too small (needs {required} B, got {available} B)")]
    BufferTooSmall { required: usize, available: usize },
}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        std::io::Error::other(value)
    }
}
