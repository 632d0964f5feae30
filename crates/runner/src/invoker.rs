//! Invocation of a single handler against one entity/event pair.

use common::{BoxError, Status};
use events::EntityEventPair;
use handlers::{HandlerRegistration, HandlerRegistry, Phase};

use crate::config::RunnerConfig;
use crate::error::RunnerError;

/// Invokes resolved handlers and converts their failures into statuses.
///
/// Before each invocation an observability record is emitted naming the
/// handler and its phase. Failures are converted according to, in order:
/// the per-handler fault message, the per-event-type fault message, and the
/// process-wide conversion flag. After-commit failures are always downgraded
/// to warnings because the durable write has already happened.
pub(crate) struct HandlerInvoker<'a> {
    registry: &'a HandlerRegistry,
    config: &'a RunnerConfig,
}

impl<'a> HandlerInvoker<'a> {
    pub(crate) fn new(registry: &'a HandlerRegistry, config: &'a RunnerConfig) -> Self {
        Self { registry, config }
    }

    /// Invokes one handler on the calling thread.
    pub(crate) fn invoke_blocking(
        &self,
        pair: &EntityEventPair,
        registration: &HandlerRegistration,
        phase: Phase,
    ) -> Result<Status, RunnerError> {
        self.record_invocation(pair, registration, phase);
        if registration.is_async() {
            return Err(RunnerError::AsyncHandlerInBlockingRun {
                handler: registration.name().to_string(),
            });
        }
        let outcome = registration.invoke_blocking(pair.entity.as_ref(), pair.event.as_ref());
        self.convert(outcome, registration, pair, phase)
    }

    /// Invokes one handler, suspending if it is asynchronous. Blocking
    /// handlers complete inline without suspending.
    pub(crate) async fn invoke(
        &self,
        pair: &EntityEventPair,
        registration: &HandlerRegistration,
        phase: Phase,
    ) -> Result<Status, RunnerError> {
        self.record_invocation(pair, registration, phase);
        let outcome = registration
            .invoke(pair.entity.as_ref(), pair.event.as_ref())
            .await;
        self.convert(outcome, registration, pair, phase)
    }

    fn record_invocation(
        &self,
        pair: &EntityEventPair,
        registration: &HandlerRegistration,
        phase: Phase,
    ) {
        tracing::info!(
            handler = registration.name(),
            phase = %phase,
            event = pair.event.event_name(),
            entity = pair.entity.entity_name(),
            "running event handler"
        );
        metrics::counter!("event_handler_invocations_total").increment(1);
    }

    fn convert(
        &self,
        outcome: Result<Status, BoxError>,
        registration: &HandlerRegistration,
        pair: &EntityEventPair,
        phase: Phase,
    ) -> Result<Status, RunnerError> {
        match outcome {
            Ok(status) if phase == Phase::AfterCommit => Ok(status.downgrade_errors()),
            Ok(status) => Ok(status),
            Err(fault) if phase == Phase::AfterCommit => {
                tracing::warn!(
                    handler = registration.name(),
                    event = pair.event.event_name(),
                    error = %fault,
                    "after-commit handler failed; commit already applied"
                );
                let mut status = Status::new();
                status.add_warning(format!(
                    "after-commit handler '{}' failed: {fault}",
                    registration.name()
                ));
                Ok(status)
            }
            Err(fault) => {
                metrics::counter!("event_handler_faults_total").increment(1);
                let override_text = registration
                    .fault_message()
                    .or_else(|| self.registry.fault_message(pair.event.runtime_type()));
                if let Some(text) = override_text {
                    tracing::warn!(
                        handler = registration.name(),
                        error = %fault,
                        "handler failed; converted with configured message"
                    );
                    Ok(Status::error(text))
                } else if self.config.convert_handler_faults {
                    tracing::warn!(
                        handler = registration.name(),
                        error = %fault,
                        "handler failed; converted to system-error status"
                    );
                    Ok(Status::error(&self.config.handler_fault_message))
                } else {
                    Err(RunnerError::HandlerFault {
                        handler: registration.name().to_string(),
                        source: fault,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Severity;
    use events::{DomainEvent, EventQueues, TrackedEntity};
    use handlers::{EventHandler, HandlerOptions};
    use std::any::Any;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Audited;

    impl DomainEvent for Audited {
        fn event_name(&self) -> &'static str {
            "Audited"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Ledger(EventQueues);

    impl TrackedEntity for Ledger {
        fn entity_name(&self) -> &str {
            "Ledger"
        }

        fn events(&self) -> &EventQueues {
            &self.0
        }
    }

    struct Failing {
        options: HandlerOptions,
    }

    impl EventHandler for Failing {
        type Event = Audited;

        fn options(&self) -> HandlerOptions {
            self.options.clone()
        }

        fn handle(&self, _: &dyn TrackedEntity, _: &Audited) -> Result<Status, BoxError> {
            Err("ledger offline".into())
        }
    }

    fn pair() -> EntityEventPair {
        EntityEventPair::new(Arc::new(Ledger(EventQueues::new())), Box::new(Audited))
    }

    fn registry_with(options: HandlerOptions) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register_before(Failing { options: options.clone() });
        registry.register_after(Failing { options });
        registry
    }

    #[test]
    fn fault_becomes_generic_error_status_by_default() {
        let registry = registry_with(HandlerOptions::new());
        let config = RunnerConfig::default();
        let invoker = HandlerInvoker::new(&registry, &config);
        let pair = pair();
        let reg = &registry.resolve(pair.event.runtime_type(), Phase::BeforeCommit)[0];

        let status = invoker.invoke_blocking(&pair, reg, Phase::BeforeCommit).unwrap();
        assert!(!status.is_valid());
        assert!(status.all_errors().contains("system error"));
    }

    #[test]
    fn per_handler_message_takes_precedence() {
        let registry = registry_with(HandlerOptions::new().fault_message("ledger is closed"));
        let config = RunnerConfig::default();
        let invoker = HandlerInvoker::new(&registry, &config);
        let pair = pair();
        let reg = &registry.resolve(pair.event.runtime_type(), Phase::BeforeCommit)[0];

        let status = invoker.invoke_blocking(&pair, reg, Phase::BeforeCommit).unwrap();
        assert_eq!(status.all_errors(), "ledger is closed");
    }

    #[test]
    fn per_event_message_applies_when_handler_has_none() {
        let mut registry = registry_with(HandlerOptions::new());
        registry.set_fault_message::<Audited>("audit trail unavailable");
        let config = RunnerConfig::default();
        let invoker = HandlerInvoker::new(&registry, &config);
        let pair = pair();
        let reg = &registry.resolve(pair.event.runtime_type(), Phase::BeforeCommit)[0];

        let status = invoker.invoke_blocking(&pair, reg, Phase::BeforeCommit).unwrap();
        assert_eq!(status.all_errors(), "audit trail unavailable");
    }

    #[test]
    fn disabled_conversion_propagates_the_fault() {
        let registry = registry_with(HandlerOptions::new());
        let config = RunnerConfig::new().convert_handler_faults(false);
        let invoker = HandlerInvoker::new(&registry, &config);
        let pair = pair();
        let reg = &registry.resolve(pair.event.runtime_type(), Phase::BeforeCommit)[0];

        let err = invoker
            .invoke_blocking(&pair, reg, Phase::BeforeCommit)
            .unwrap_err();
        assert!(matches!(err, RunnerError::HandlerFault { .. }));
    }

    #[test]
    fn after_commit_fault_is_a_warning_not_an_error() {
        let registry = registry_with(HandlerOptions::new());
        let config = RunnerConfig::new().convert_handler_faults(false);
        let invoker = HandlerInvoker::new(&registry, &config);
        let pair = pair();
        let reg = &registry.resolve(pair.event.runtime_type(), Phase::AfterCommit)[0];

        let status = invoker.invoke_blocking(&pair, reg, Phase::AfterCommit).unwrap();
        assert!(status.is_valid());
        assert_eq!(status.messages()[0].severity, Severity::Warning);
        assert!(status.messages()[0].text.contains("ledger offline"));
    }
}
