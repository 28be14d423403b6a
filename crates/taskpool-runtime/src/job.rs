//! Jobs: a function, its owned argument and the future it completes
//!
//! The queue carries `Box<dyn Execute>` so jobs of every argument and
//! result type share one queue. Executing a job consumes it; the argument
//! is dropped as soon as the function returns.

use crate::future::TaskFuture;
use taskpool_core::FutureId;

/// A queued unit of work
pub trait Execute: Send {
    /// Run the function and complete the future
    fn execute(self: Box<Self>);

    /// Id of the future this job completes
    fn future_id(&self) -> FutureId;
}

/// Job calling a plain function pointer with an owned argument
pub struct FnJob<A, R> {
    func: fn(A) -> R,
    arg: A,
    future: TaskFuture<R>,
}

impl<A, R> FnJob<A, R>
where
    A: Send + 'static,
    R: Send + Sync + 'static,
{
    pub fn new(func: fn(A) -> R, arg: A, future: TaskFuture<R>) -> Self {
        Self { func, arg, future }
    }
}

impl<A, R> Execute for FnJob<A, R>
where
    A: Send + 'static,
    R: Send + Sync + 'static,
{
    fn execute(self: Box<Self>) {
        let FnJob { func, arg, future } = *self;
        let result = func(arg);
        future.complete(result);
    }

    fn future_id(&self) -> FutureId {
        self.future.id()
    }
}

/// Job running a closure
pub struct ClosureJob<F, R> {
    func: F,
    future: TaskFuture<R>,
}

impl<F, R> ClosureJob<F, R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + Sync + 'static,
{
    pub fn new(func: F, future: TaskFuture<R>) -> Self {
        Self { func, future }
    }
}

impl<F, R> Execute for ClosureJob<F, R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + Sync + 'static,
{
    fn execute(self: Box<Self>) {
        let ClosureJob { func, future } = *self;
        future.complete(func());
    }

    fn future_id(&self) -> FutureId {
        self.future.id()
    }
}

/// Copy exactly `size` bytes of `src` into a fallibly allocated buffer
///
/// Fails if `size` exceeds `src` or the allocation cannot be reserved.
pub fn copy_arg_bytes(src: &[u8], size: usize) -> Result<Vec<u8>, ArgCopyError> {
    let bytes = src.get(..size).ok_or(ArgCopyError::SizeExceedsBuffer)?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| ArgCopyError::AllocationFailed)?;
    buf.extend_from_slice(bytes);
    Ok(buf)
}

/// Why `copy_arg_bytes` failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgCopyError {
    SizeExceedsBuffer,
    AllocationFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times_42(n: i32) -> i32 {
        n * 42
    }

    #[test]
    fn test_fn_job_completes_future() {
        let fut = TaskFuture::new();
        let job: Box<dyn Execute> = Box::new(FnJob::new(times_42, 5, fut.clone()));
        assert_eq!(job.future_id(), fut.id());

        job.execute();
        assert_eq!(*fut.get(), 210);
    }

    #[test]
    fn test_closure_job_owns_captures() {
        let fut = TaskFuture::new();
        let words = vec!["a".to_string(), "b".to_string()];
        let job: Box<dyn Execute> = Box::new(ClosureJob::new(move || words.join("+"), fut.clone()));
        job.execute();
        assert_eq!(fut.get().as_str(), "a+b");
    }

    #[test]
    fn test_copy_arg_bytes() {
        let src = [1u8, 2, 3, 4];
        assert_eq!(copy_arg_bytes(&src, 2).unwrap(), vec![1, 2]);
        assert_eq!(copy_arg_bytes(&src, 4).unwrap(), src.to_vec());
        assert!(copy_arg_bytes(&src, 0).unwrap().is_empty());
        assert_eq!(copy_arg_bytes(&src, 5), Err(ArgCopyError::SizeExceedsBuffer));
    }
}
