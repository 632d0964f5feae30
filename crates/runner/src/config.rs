//! Runner configuration.

/// Default ceiling on before-commit cascade passes.
pub const DEFAULT_MAX_CASCADE_PASSES: usize = 6;

/// Default text used when a before-commit handler fails unexpectedly and no
/// override is registered.
pub const DEFAULT_HANDLER_FAULT_MESSAGE: &str =
    "A system error occurred while handling a domain event";

/// Process-wide runner configuration.
///
/// Built once at startup, injected into the `EventRunner`, and never mutated
/// during a commit cycle; the same value is safely shared by concurrent
/// cycles on different unit-of-work instances.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Ceiling on before-commit cascade passes. Exceeding it means handlers
    /// are queueing events without bound and is a fatal fault.
    pub max_cascade_passes: usize,

    /// Stop the current cascade pass at the first handler that leaves the
    /// running status invalid. Individual handlers may override this.
    pub stop_on_first_error: bool,

    /// Convert unexpected before-commit handler failures into an error
    /// status instead of propagating them to the caller.
    pub convert_handler_faults: bool,

    /// Dispatch after-commit events once the commit succeeds.
    pub run_after_commit_handlers: bool,

    /// Text of the error status produced when a before-commit handler fails
    /// and no per-handler or per-event override applies.
    pub handler_fault_message: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_cascade_passes: DEFAULT_MAX_CASCADE_PASSES,
            stop_on_first_error: true,
            convert_handler_faults: true,
            run_after_commit_handlers: true,
            handler_fault_message: DEFAULT_HANDLER_FAULT_MESSAGE.to_string(),
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_cascade_passes(mut self, limit: usize) -> Self {
        self.max_cascade_passes = limit;
        self
    }

    pub fn stop_on_first_error(mut self, stop: bool) -> Self {
        self.stop_on_first_error = stop;
        self
    }

    pub fn convert_handler_faults(mut self, convert: bool) -> Self {
        self.convert_handler_faults = convert;
        self
    }

    pub fn run_after_commit_handlers(mut self, run: bool) -> Self {
        self.run_after_commit_handlers = run;
        self
    }

    pub fn handler_fault_message(mut self, text: impl Into<String>) -> Self {
        self.handler_fault_message = text.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_cascade_passes, 6);
        assert!(config.stop_on_first_error);
        assert!(config.convert_handler_faults);
        assert!(config.run_after_commit_handlers);
        assert_eq!(config.handler_fault_message, DEFAULT_HANDLER_FAULT_MESSAGE);
    }

    #[test]
    fn builder_methods_override_fields() {
        let config = RunnerConfig::new()
            .max_cascade_passes(2)
            .stop_on_first_error(false)
            .convert_handler_faults(false)
            .run_after_commit_handlers(false)
            .handler_fault_message("boom");
        assert_eq!(config.max_cascade_passes, 2);
        assert!(!config.stop_on_first_error);
        assert!(!config.convert_handler_faults);
        assert!(!config.run_after_commit_handlers);
        assert_eq!(config.handler_fault_message, "boom");
    }
}
