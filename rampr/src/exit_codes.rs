#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// The run completed but the overall verdict is POOR.
    PoorVerdict = 10,

    /// The pre-flight health probe failed; no load was generated.
    TargetUnavailable = 20,

    /// Invalid CLI/plan input (bad flags, malformed YAML, invalid durations, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors, unexpected invariants, panics caught at top-level).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
