use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{Criterion, criterion_group, criterion_main};
use runner::{
    AsyncUnitOfWork, BoxError, DomainEvent, EventHandler, EventQueues, EventRunner,
    HandlerRegistry, Status, TrackedEntity, UnitOfWork,
};

#[derive(Debug)]
struct PriceChanged;

impl DomainEvent for PriceChanged {
    fn event_name(&self) -> &'static str {
        "PriceChanged"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Product(EventQueues);

impl TrackedEntity for Product {
    fn entity_name(&self) -> &str {
        "Product"
    }

    fn events(&self) -> &EventQueues {
        &self.0
    }
}

struct Reprice;

impl EventHandler for Reprice {
    type Event = PriceChanged;

    fn handle(&self, _: &dyn TrackedEntity, _: &PriceChanged) -> Result<Status, BoxError> {
        Ok(Status::new())
    }
}

struct Db(Vec<Arc<dyn TrackedEntity>>);

impl UnitOfWork for Db {
    type Output = usize;

    fn tracked_entities(&self) -> Vec<Arc<dyn TrackedEntity>> {
        self.0.clone()
    }

    fn commit(&mut self) -> Result<usize, BoxError> {
        Ok(self.0.len())
    }
}

#[async_trait]
impl AsyncUnitOfWork for Db {
    type Output = usize;

    fn tracked_entities(&self) -> Vec<Arc<dyn TrackedEntity>> {
        self.0.clone()
    }

    async fn commit(&mut self) -> Result<usize, BoxError> {
        Ok(self.0.len())
    }
}

fn loaded_db(events_per_entity: usize) -> Db {
    let entities: Vec<Arc<dyn TrackedEntity>> = (0..10)
        .map(|_| {
            let product = Product(EventQueues::new());
            for _ in 0..events_per_entity {
                product.0.enqueue_before(PriceChanged);
            }
            Arc::new(product) as Arc<dyn TrackedEntity>
        })
        .collect();
    Db(entities)
}

fn bench_blocking_cycle(c: &mut Criterion) {
    let mut registry = HandlerRegistry::new();
    registry.register_before(Reprice);
    let runner = EventRunner::new(Arc::new(registry));

    c.bench_function("runner/blocking_cycle_100_events", |b| {
        b.iter(|| {
            let mut db = loaded_db(10);
            runner.run_before_and_after(&mut db).unwrap();
        });
    });
}

fn bench_async_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut registry = HandlerRegistry::new();
    registry.register_before(Reprice);
    let runner = EventRunner::new(Arc::new(registry));

    c.bench_function("runner/async_cycle_100_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut db = loaded_db(10);
                runner.run_before_and_after_async(&mut db).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_blocking_cycle, bench_async_cycle);
criterion_main!(benches);
