//! Drives the async Kubernetes and S3 clients from the blocking workflow.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::context::CallContext;
use crate::error::{Error, Result};

/// A current-thread tokio runtime shared by the clients built from it.
///
/// Connection tasks only make progress while a call is being driven, which
/// is all a sequential migration needs.
#[derive(Clone)]
pub struct BlockingRuntime {
    runtime: Arc<Runtime>,
}

impl BlockingRuntime {
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    /// Runs `future` to completion, bounded by the context deadline.
    pub fn run<T, F>(&self, ctx: &CallContext, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        ctx.check()?;
        match ctx.remaining() {
            Some(remaining) => self.runtime.block_on(async {
                match tokio::time::timeout(remaining, future).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::DeadlineExceeded),
                }
            }),
            None => self.runtime.block_on(future),
        }
    }

    /// Runs setup work that needs the runtime but no deadline, such as
    /// building a client.
    pub fn setup<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.runtime.block_on(future)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_run_returns_result() {
        let runtime = BlockingRuntime::new().unwrap();
        let value = runtime
            .run(&CallContext::background(), async { Ok(42) })
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_run_times_out_at_deadline() {
        let runtime = BlockingRuntime::new().unwrap();
        let ctx = CallContext::with_timeout(Duration::from_millis(20));
        let result: Result<()> = runtime.run(&ctx, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        });
        assert!(matches!(result, Err(Error::DeadlineExceeded)));
    }

    #[test]
    fn test_run_refuses_cancelled_context() {
        let runtime = BlockingRuntime::new().unwrap();
        let ctx = CallContext::background();
        ctx.cancel();
        let result = runtime.run(&ctx, async { Ok(()) });
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
