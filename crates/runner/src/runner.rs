//! The event orchestrator: before-commit cascade, commit, after-commit dispatch.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use common::{BoxError, Status};
use events::{EntityEventPair, TrackedEntity};
use handlers::{HandlerRegistry, Phase};

use crate::config::RunnerConfig;
use crate::error::{Result, RunnerError};
use crate::invoker::HandlerInvoker;
use crate::translator::CommitTranslators;
use crate::uow::{AsyncUnitOfWork, UnitOfWork};

/// Message appended to the status once the commit has succeeded.
pub const COMMIT_SUCCESS_MESSAGE: &str = "Successfully committed";

enum CommitOutcome<R> {
    Committed(R),
    Rejected(Status),
}

/// Orchestrates domain events around a unit-of-work commit.
///
/// A commit cycle runs the before-commit cascade, and only if the aggregated
/// status is still valid invokes the commit; a successful commit is followed
/// by a single after-commit dispatch whose failures can no longer invalidate
/// the result. The runner holds no per-cycle state, so one instance serves
/// any number of sequential or concurrent cycles on distinct units of work.
///
/// Both entry points stop the cascade at the first error-producing handler
/// when stop-on-first-error is in effect; the blocking and async paths are
/// deliberately symmetric.
pub struct EventRunner {
    registry: Arc<HandlerRegistry>,
    config: RunnerConfig,
    translators: CommitTranslators,
    post_cascade_hooks: Vec<Box<dyn Fn(&Status) + Send + Sync>>,
}

impl EventRunner {
    /// Creates a runner with the default configuration.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_config(registry, RunnerConfig::default())
    }

    /// Creates a runner with an explicit configuration.
    pub fn with_config(registry: Arc<HandlerRegistry>, config: RunnerConfig) -> Self {
        Self {
            registry,
            config,
            translators: CommitTranslators::default(),
            post_cascade_hooks: Vec::new(),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Registers a commit-fault translator for one unit-of-work type.
    ///
    /// On commit failure the translator decides the outcome: `None` lets the
    /// fault propagate, an invalid status becomes the cycle's result, and a
    /// valid status grants exactly one commit retry.
    pub fn set_commit_translator<U, F>(&mut self, translate: F) -> &mut Self
    where
        U: Any,
        F: Fn(&BoxError, &U) -> Option<Status> + Send + Sync + 'static,
    {
        self.translators.insert::<U>(translate);
        self
    }

    /// Adds an action to run after the before-commit cascade, before the
    /// commit decision. Hooks observe the aggregated cascade status.
    pub fn add_post_cascade_hook(
        &mut self,
        hook: impl Fn(&Status) + Send + Sync + 'static,
    ) -> &mut Self {
        self.post_cascade_hooks.push(Box::new(hook));
        self
    }

    /// Runs a full commit cycle on the calling thread.
    ///
    /// Returns the aggregated status with the commit output attached on
    /// success, or a `RunnerError` for unrecoverable faults (cascade
    /// overflow, unconverted handler faults, untranslated commit failures,
    /// async handlers reached from this blocking path).
    #[tracing::instrument(skip(self, uow))]
    pub fn run_before_and_after<U>(&self, uow: &mut U) -> Result<Status<U::Output>>
    where
        U: UnitOfWork + Any,
    {
        let started = Instant::now();
        metrics::counter!("commit_cycles_total").increment(1);

        let mut before = Status::new();
        self.run_before_cascade(&*uow, &mut before)?;
        for hook in &self.post_cascade_hooks {
            hook(&before);
        }
        if !before.is_valid() {
            metrics::counter!("commit_cycles_rejected_total").increment(1);
            tracing::info!(errors = %before.all_errors(), "commit rejected by before-commit handlers");
            return Ok(before.without_result());
        }

        let mut status = match self.commit_blocking(uow)? {
            CommitOutcome::Rejected(translated) => {
                metrics::counter!("commit_cycles_rejected_total").increment(1);
                before.combine(translated);
                return Ok(before.without_result());
            }
            CommitOutcome::Committed(output) => {
                before.add_message(COMMIT_SUCCESS_MESSAGE);
                before.with_result(output)
            }
        };

        if self.config.run_after_commit_handlers {
            self.run_after_dispatch(&*uow, &mut status)?;
        }

        metrics::histogram!("commit_cycle_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(status)
    }

    /// Runs a full commit cycle, suspending at async handlers and the commit.
    ///
    /// Semantics are identical to [`run_before_and_after`], including the
    /// stop-on-first-error short circuit in the cascade.
    ///
    /// [`run_before_and_after`]: EventRunner::run_before_and_after
    #[tracing::instrument(skip(self, uow))]
    pub async fn run_before_and_after_async<U>(&self, uow: &mut U) -> Result<Status<U::Output>>
    where
        U: AsyncUnitOfWork + Any,
    {
        let started = Instant::now();
        metrics::counter!("commit_cycles_total").increment(1);

        let mut before = Status::new();
        self.run_before_cascade_async(&*uow, &mut before).await?;
        for hook in &self.post_cascade_hooks {
            hook(&before);
        }
        if !before.is_valid() {
            metrics::counter!("commit_cycles_rejected_total").increment(1);
            tracing::info!(errors = %before.all_errors(), "commit rejected by before-commit handlers");
            return Ok(before.without_result());
        }

        let mut status = match self.commit_async(uow).await? {
            CommitOutcome::Rejected(translated) => {
                metrics::counter!("commit_cycles_rejected_total").increment(1);
                before.combine(translated);
                return Ok(before.without_result());
            }
            CommitOutcome::Committed(output) => {
                before.add_message(COMMIT_SUCCESS_MESSAGE);
                before.with_result(output)
            }
        };

        if self.config.run_after_commit_handlers {
            self.run_after_dispatch_async(&*uow, &mut status).await?;
        }

        metrics::histogram!("commit_cycle_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        Ok(status)
    }

    fn run_before_cascade<U: UnitOfWork>(
        &self,
        uow: &U,
        status: &mut Status,
    ) -> Result<()> {
        let invoker = HandlerInvoker::new(&self.registry, &self.config);
        let mut pass = 0usize;
        let mut last_processed: Option<(String, String)> = None;

        loop {
            let pairs = drain_pairs(uow.tracked_entities(), Phase::BeforeCommit);
            if pairs.is_empty() {
                break;
            }
            pass += 1;
            self.check_cascade_limit(pass, &last_processed, &pairs)?;
            tracing::debug!(pass, drained = pairs.len(), "before-commit cascade pass");

            'pass: for pair in &pairs {
                last_processed = Some(pair_names(pair));
                for registration in self
                    .registry
                    .resolve(pair.event.runtime_type(), Phase::BeforeCommit)
                {
                    let outcome = invoker.invoke_blocking(pair, registration, Phase::BeforeCommit)?;
                    status.combine(outcome);
                    let stop = registration
                        .stop_on_first_error()
                        .unwrap_or(self.config.stop_on_first_error);
                    if stop && !status.is_valid() {
                        break 'pass;
                    }
                }
            }

            if !status.is_valid() {
                break;
            }
        }
        Ok(())
    }

    async fn run_before_cascade_async<U: AsyncUnitOfWork>(
        &self,
        uow: &U,
        status: &mut Status,
    ) -> Result<()> {
        let invoker = HandlerInvoker::new(&self.registry, &self.config);
        let mut pass = 0usize;
        let mut last_processed: Option<(String, String)> = None;

        loop {
            let pairs = drain_pairs(uow.tracked_entities(), Phase::BeforeCommit);
            if pairs.is_empty() {
                break;
            }
            pass += 1;
            self.check_cascade_limit(pass, &last_processed, &pairs)?;
            tracing::debug!(pass, drained = pairs.len(), "before-commit cascade pass");

            'pass: for pair in &pairs {
                last_processed = Some(pair_names(pair));
                for registration in self
                    .registry
                    .resolve(pair.event.runtime_type(), Phase::BeforeCommit)
                {
                    let outcome = invoker.invoke(pair, registration, Phase::BeforeCommit).await?;
                    status.combine(outcome);
                    let stop = registration
                        .stop_on_first_error()
                        .unwrap_or(self.config.stop_on_first_error);
                    if stop && !status.is_valid() {
                        break 'pass;
                    }
                }
            }

            if !status.is_valid() {
                break;
            }
        }
        Ok(())
    }

    fn check_cascade_limit(
        &self,
        pass: usize,
        last_processed: &Option<(String, String)>,
        pairs: &[EntityEventPair],
    ) -> Result<()> {
        if pass <= self.config.max_cascade_passes {
            return Ok(());
        }
        metrics::counter!("cascade_overflows_total").increment(1);
        let (entity, event) = last_processed
            .clone()
            .or_else(|| pairs.last().map(pair_names))
            .unwrap_or_default();
        Err(RunnerError::CascadeOverflow {
            limit: self.config.max_cascade_passes,
            entity,
            event,
        })
    }

    fn commit_blocking<U: UnitOfWork + Any>(&self, uow: &mut U) -> Result<CommitOutcome<U::Output>> {
        let fault = match uow.commit() {
            Ok(output) => return Ok(CommitOutcome::Committed(output)),
            Err(fault) => fault,
        };
        let Some(translator) = self.translators.get::<U>() else {
            return Err(RunnerError::Commit(fault));
        };
        tracing::warn!(error = %fault, "commit failed; consulting registered translator");
        match translator.translate(&fault, &*uow) {
            None => Err(RunnerError::Commit(fault)),
            Some(translated) if !translated.is_valid() => Ok(CommitOutcome::Rejected(translated)),
            Some(_) => {
                tracing::info!("translator allowed a single commit retry");
                match uow.commit() {
                    Ok(output) => Ok(CommitOutcome::Committed(output)),
                    Err(second) => match translator.translate(&second, &*uow) {
                        Some(translated) if !translated.is_valid() => {
                            Ok(CommitOutcome::Rejected(translated))
                        }
                        // A second failure is never retried, whatever the
                        // translator says.
                        _ => Err(RunnerError::Commit(second)),
                    },
                }
            }
        }
    }

    async fn commit_async<U: AsyncUnitOfWork + Any>(
        &self,
        uow: &mut U,
    ) -> Result<CommitOutcome<U::Output>> {
        let fault = match uow.commit().await {
            Ok(output) => return Ok(CommitOutcome::Committed(output)),
            Err(fault) => fault,
        };
        let Some(translator) = self.translators.get::<U>() else {
            return Err(RunnerError::Commit(fault));
        };
        tracing::warn!(error = %fault, "commit failed; consulting registered translator");
        match translator.translate(&fault, &*uow) {
            None => Err(RunnerError::Commit(fault)),
            Some(translated) if !translated.is_valid() => Ok(CommitOutcome::Rejected(translated)),
            Some(_) => {
                tracing::info!("translator allowed a single commit retry");
                match uow.commit().await {
                    Ok(output) => Ok(CommitOutcome::Committed(output)),
                    Err(second) => match translator.translate(&second, &*uow) {
                        Some(translated) if !translated.is_valid() => {
                            Ok(CommitOutcome::Rejected(translated))
                        }
                        _ => Err(RunnerError::Commit(second)),
                    },
                }
            }
        }
    }

    fn run_after_dispatch<U: UnitOfWork, R>(
        &self,
        uow: &U,
        status: &mut Status<R>,
    ) -> Result<()> {
        let invoker = HandlerInvoker::new(&self.registry, &self.config);
        let pairs = drain_pairs(uow.tracked_entities(), Phase::AfterCommit);
        tracing::debug!(drained = pairs.len(), "after-commit dispatch");

        for pair in &pairs {
            for registration in self
                .registry
                .resolve(pair.event.runtime_type(), Phase::AfterCommit)
            {
                let outcome = invoker.invoke_blocking(pair, registration, Phase::AfterCommit)?;
                status.combine_messages(outcome);
            }
        }
        Ok(())
    }

    async fn run_after_dispatch_async<U: AsyncUnitOfWork, R>(
        &self,
        uow: &U,
        status: &mut Status<R>,
    ) -> Result<()> {
        let invoker = HandlerInvoker::new(&self.registry, &self.config);
        let pairs = drain_pairs(uow.tracked_entities(), Phase::AfterCommit);
        tracing::debug!(drained = pairs.len(), "after-commit dispatch");

        for pair in &pairs {
            for registration in self
                .registry
                .resolve(pair.event.runtime_type(), Phase::AfterCommit)
            {
                let outcome = invoker.invoke(pair, registration, Phase::AfterCommit).await?;
                status.combine_messages(outcome);
            }
        }
        Ok(())
    }
}

/// Drains one phase's queue of every tracked entity into a flat ordered list.
fn drain_pairs(entities: Vec<Arc<dyn TrackedEntity>>, phase: Phase) -> Vec<EntityEventPair> {
    let mut pairs = Vec::new();
    for entity in entities {
        let drained = match phase {
            Phase::BeforeCommit => entity.events().drain_before(),
            Phase::AfterCommit => entity.events().drain_after(),
        };
        for event in drained {
            pairs.push(EntityEventPair::new(Arc::clone(&entity), event));
        }
    }
    pairs
}

fn pair_names(pair: &EntityEventPair) -> (String, String) {
    (
        pair.entity.entity_name().to_string(),
        pair.event.event_name().to_string(),
    )
}
