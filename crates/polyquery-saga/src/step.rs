/// Result of a successful call to [`SagaStep::compensate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// The step's effects were undone.
    Applied,
    /// The step had nothing it could undo.
    Skipped,
}

/// A step in a saga that can be executed and compensated.
///
/// Steps own their state, so `execute` may record what it did for a later
/// `compensate` call.
///
/// Steps do not pass data to each other; everything they share lives in
/// `Context`, and each `Output` is collected into the saga result.
pub trait SagaStep {
    /// Data produced by a successful execution.
    type Output;

    type Context;

    type Error;

    /// Name used in logs, the audit log and error messages.
    fn name(&self) -> String;

    /// Runs the forward action.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails to complete.
    fn execute(&mut self, ctx: &Self::Context) -> Result<Self::Output, Self::Error>;

    /// Compensate (undo) the step's effects.
    ///
    /// Called during rollback when a later step fails, only for steps whose
    /// `execute` succeeded. The default implementation skips, suitable for
    /// read-only steps.
    ///
    /// # Errors
    ///
    /// Returns an error if compensation fails.
    fn compensate(&mut self, ctx: &Self::Context) -> Result<Compensation, Self::Error> {
        let _ = ctx;
        Ok(Compensation::Skipped)
    }

    /// Human-readable description of what compensation will do.
    fn compensation_description(&self) -> String {
        format!("undo {}", self.name())
    }
}
