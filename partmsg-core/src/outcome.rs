//! Listener return value conversion.

use crate::error::{BoxError, ListenerError};

/// Converts a listener's return value into the engine's outcome.
///
/// # Default Implementations
///
/// - `()` → delivered
/// - `Result<(), ListenerError>` → as is
/// - `Result<(), BoxError>` → errors become [`ListenerError::Failed`]
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a listener outcome",
    label = "listeners must return `()`, `Result<(), ListenerError>` or `Result<(), BoxError>`",
    note = "Return `Err(ListenerError::TargetGone(..))` to report a stale target without aborting delivery."
)]
pub trait IntoOutcome {
    /// Convert into the engine's outcome.
    fn into_outcome(self) -> Result<(), ListenerError>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), ListenerError> {
        Ok(())
    }
}

impl IntoOutcome for Result<(), ListenerError> {
    fn into_outcome(self) -> Result<(), ListenerError> {
        self
    }
}

impl IntoOutcome for Result<(), BoxError> {
    fn into_outcome(self) -> Result<(), ListenerError> {
        self.map_err(ListenerError::Failed)
    }
}
