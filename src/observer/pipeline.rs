// Ring-ordered observer pipeline for record writes

use std::collections::HashMap;
use std::time::Instant;
use tokio::time::timeout;

use crate::database::Document;
use crate::observer::context::ObserverContext;
use crate::observer::error::{ObserverError, ObserverWarning};
use crate::observer::traits::{Observer, ObserverRing};

/// Executes observers in ring order. Pre-database failures abort the operation;
/// post-database failures are logged as warnings since the write already happened.
pub struct ObserverPipeline {
    observers: HashMap<ObserverRing, Vec<Box<dyn Observer>>>,
}

impl ObserverPipeline {
    pub fn new() -> Self {
        Self {
            observers: HashMap::new(),
        }
    }

    pub fn register_observer(&mut self, observer: Box<dyn Observer>) {
        let ring = observer.ring();
        let name = observer.name();
        let ring_observers = self.observers.entry(ring).or_default();
        ring_observers.push(observer);
        ring_observers.sort_by_key(|o| o.priority());

        tracing::debug!("Registered observer '{}' for ring {:?}", name, ring);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.values().map(Vec::len).sum()
    }

    /// Runs a create, update or delete and returns the stored (or deleted) record
    pub async fn execute(&self, mut ctx: ObserverContext) -> Result<Document, ObserverError> {
        tracing::debug!(
            operation = ctx.operation.as_str(),
            collection = %ctx.collection,
            record_id = ?ctx.record_id,
            "Observer pipeline starting"
        );

        for ring in ObserverRing::ALL {
            ctx.current_ring = Some(ring);
            self.execute_ring(ring, &mut ctx).await;

            if ring.is_best_effort() {
                for error in ctx.errors.drain(..).collect::<Vec<_>>() {
                    tracing::warn!(ring = ?ring, "Post-database observer failed: {}", error);
                    ctx.warnings.push(ObserverWarning::new("pipeline", ring as u8, error.to_string()));
                }
                continue;
            }

            if ctx.has_errors() {
                tracing::debug!("Observer pipeline stopped at ring {:?} due to errors", ring);
                return Err(ctx.errors.remove(0));
            }
        }

        tracing::debug!(
            elapsed_ms = ctx.execution_time().as_millis() as u64,
            warnings = ctx.warnings.len(),
            "Observer pipeline finished"
        );

        ctx.result
            .take()
            .ok_or_else(|| ObserverError::DatabaseError("No database observer produced a result".to_string()))
    }

    async fn execute_ring(&self, ring: ObserverRing, ctx: &mut ObserverContext) {
        let Some(observers) = self.observers.get(&ring) else {
            return;
        };

        for observer in observers {
            if !observer.applies_to_operation(ctx.operation) || !observer.applies_to_collection(ctx.collection) {
                continue;
            }

            let observer_start = Instant::now();
            let result = timeout(observer.timeout(), observer.execute(ctx)).await;
            let execution_time = observer_start.elapsed();

            match result {
                Ok(Ok(())) => {
                    tracing::trace!("Observer: {} completed in {:?}", observer.name(), execution_time);
                }
                Ok(Err(error)) => {
                    tracing::debug!("Observer: {} failed in {:?}: {}", observer.name(), execution_time, error);
                    ctx.add_error(error);
                }
                Err(_elapsed) => {
                    tracing::error!("Observer: {} timed out after {:?}", observer.name(), observer.timeout());
                    ctx.add_error(ObserverError::TimeoutError(format!(
                        "Observer {} timed out after {:?}",
                        observer.name(),
                        observer.timeout()
                    )));
                }
            }
        }
    }
}

impl Default for ObserverPipeline {
    fn default() -> Self {
        Self::new()
    }
}
