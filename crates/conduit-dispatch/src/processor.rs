use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_core::Result;

use crate::data::{DispatchData, DispatchOutcome};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The continuation passed to a [`MessageProcessor`]: calling it runs the
/// remainder of the chain (the next processor, or the handler itself once
/// the chain is exhausted) with whatever `DispatchData` the processor
/// passes in, which may differ from what it received.
pub type NextFn = Box<dyn FnOnce(DispatchData) -> BoxFuture<'static, Result<DispatchOutcome>> + Send>;

/// Wraps every handler invocation. Registration order defines chain
/// order, outermost first: the first registered processor sees the
/// dispatch first and its `next` call runs everything after it,
/// including the handler.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, data: DispatchData, next: NextFn) -> Result<DispatchOutcome>;
}

/// Build the `NextFn` for `processors[index..]`, terminating in `tail`
/// (the handler invocation itself) once the chain is exhausted.
pub(crate) fn build_chain(
    processors: Arc<[Arc<dyn MessageProcessor>]>,
    index: usize,
    tail: Arc<dyn Fn(DispatchData) -> BoxFuture<'static, Result<DispatchOutcome>> + Send + Sync>,
) -> NextFn {
    Box::new(move |data: DispatchData| {
        Box::pin(async move {
            if index >= processors.len() {
                return tail(data).await;
            }
            let processor = Arc::clone(&processors[index]);
            let next = build_chain(Arc::clone(&processors), index + 1, tail);
            processor.process(data, next).await
        })
    })
}
