//! Commit-fault translators, keyed by unit-of-work type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use common::{BoxError, Status};

type ErasedTranslator = dyn Fn(&BoxError, &dyn Any) -> Option<Status> + Send + Sync;

/// A translator resolved for one unit-of-work type.
///
/// Returning `None` means the translator does not recognize the failure and
/// the original fault propagates. An invalid status becomes the runner's
/// result; a valid status asks the runner to retry the commit once.
#[derive(Clone)]
pub(crate) struct Translator(Arc<ErasedTranslator>);

impl Translator {
    pub(crate) fn translate(&self, fault: &BoxError, uow: &dyn Any) -> Option<Status> {
        (self.0)(fault, uow)
    }
}

/// Registry of commit-fault translators, one per unit-of-work type.
///
/// Registered at startup alongside the handler registry; read-only during
/// commit cycles.
#[derive(Default)]
pub(crate) struct CommitTranslators {
    map: HashMap<TypeId, Translator>,
}

impl CommitTranslators {
    pub(crate) fn insert<U: Any>(
        &mut self,
        translate: impl Fn(&BoxError, &U) -> Option<Status> + Send + Sync + 'static,
    ) {
        let erased = move |fault: &BoxError, uow: &dyn Any| {
            uow.downcast_ref::<U>()
                .and_then(|uow| translate(fault, uow))
        };
        self.map.insert(TypeId::of::<U>(), Translator(Arc::new(erased)));
    }

    pub(crate) fn get<U: Any>(&self) -> Option<Translator> {
        self.map.get(&TypeId::of::<U>()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OrdersDb {
        deadlock_is_transient: bool,
    }

    struct OtherDb;

    fn deadlock() -> BoxError {
        "deadlock detected".into()
    }

    #[test]
    fn translator_is_resolved_by_unit_of_work_type() {
        let mut translators = CommitTranslators::default();
        translators.insert::<OrdersDb>(|fault, db| {
            if db.deadlock_is_transient && fault.to_string().contains("deadlock") {
                Some(Status::new())
            } else {
                Some(Status::error("commit rejected"))
            }
        });

        assert!(translators.get::<OrdersDb>().is_some());
        assert!(translators.get::<OtherDb>().is_none());
    }

    #[test]
    fn translate_sees_the_collaborator() {
        let mut translators = CommitTranslators::default();
        translators.insert::<OrdersDb>(|_fault, db| {
            db.deadlock_is_transient.then(Status::new)
        });

        let translator = translators.get::<OrdersDb>().unwrap();
        let transient = OrdersDb {
            deadlock_is_transient: true,
        };
        let permanent = OrdersDb {
            deadlock_is_transient: false,
        };

        assert!(translator.translate(&deadlock(), &transient).is_some());
        assert!(translator.translate(&deadlock(), &permanent).is_none());
    }
}
