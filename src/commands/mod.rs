pub mod import;
pub mod status;
pub mod validate;

/// Outcome of a command that completed, mapped to the process exit status
/// in `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    Warnings,
}
