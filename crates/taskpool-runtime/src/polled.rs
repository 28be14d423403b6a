//! Step-polled tasks
//!
//! A `PolledTask` wraps submit + `is_ready` in an explicit state machine so
//! a caller driving its own loop can advance it one step at a time without
//! ever blocking.
//!
//! ```text
//! NotStarted --poll--> Submitted --poll--> Waiting --poll--> ... --> Done
//!            \--submit error--------------------------------------> Done
//! ```

use crate::executor::Executor;
use crate::future::TaskFuture;
use taskpool_core::{ktrace, ExecError, TaskStage};

use std::sync::Arc;

/// What one `poll()` step observed
#[derive(Debug)]
pub enum Progress<R> {
    /// The job was submitted on this step
    Started,
    /// Submitted, result not ready yet
    Waiting,
    /// Result available; the task is done
    Finished(Arc<R>),
    /// Submission failed; the task is done
    Failed(ExecError),
}

pub struct PolledTask<A, R> {
    func: fn(A) -> R,
    arg: A,
    stage: TaskStage,
    future: Option<TaskFuture<R>>,
    result: Option<Arc<R>>,
}

impl<A, R> PolledTask<A, R>
where
    A: Clone + Send + 'static,
    R: Send + Sync + 'static,
{
    pub fn new(func: fn(A) -> R, arg: A) -> Self {
        Self {
            func,
            arg,
            stage: TaskStage::NotStarted,
            future: None,
            result: None,
        }
    }

    /// Advance by one step; `None` once done
    pub fn poll(&mut self, exec: &Executor) -> Option<Progress<R>> {
        match self.stage {
            TaskStage::NotStarted => match exec.submit(self.func, &self.arg) {
                Ok(future) => {
                    ktrace!("polled task submitted as {}", future.id());
                    self.future = Some(future);
                    self.stage = TaskStage::Submitted;
                    Some(Progress::Started)
                }
                Err(e) => {
                    self.stage = TaskStage::Done;
                    Some(Progress::Failed(e))
                }
            },
            TaskStage::Submitted | TaskStage::Waiting => {
                match self.future.as_ref().and_then(TaskFuture::try_get) {
                    Some(value) => {
                        self.result = Some(Arc::clone(&value));
                        if let Some(future) = self.future.take() {
                            future.destroy();
                        }
                        self.stage = TaskStage::Done;
                        Some(Progress::Finished(value))
                    }
                    None => {
                        self.stage = TaskStage::Waiting;
                        Some(Progress::Waiting)
                    }
                }
            }
            TaskStage::Done => None,
        }
    }

    #[inline]
    pub fn stage(&self) -> TaskStage {
        self.stage
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.stage.is_done()
    }

    /// The result, once `Finished` has been observed
    pub fn result(&self) -> Option<Arc<R>> {
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use std::thread;
    use std::time::Duration;

    fn times_42(n: i32) -> i32 {
        n * 42
    }

    fn slow_double(n: u64) -> u64 {
        thread::sleep(Duration::from_millis(20));
        n * 2
    }

    fn executor(capacity: usize) -> Executor {
        Executor::new(PoolConfig::new().num_workers(1).queue_capacity(capacity)).unwrap()
    }

    #[test]
    fn test_polled_task_runs_to_done() {
        let exec = executor(8);
        exec.start().unwrap();

        let mut task = PolledTask::new(slow_double, 21);
        assert_eq!(task.stage(), TaskStage::NotStarted);
        assert!(matches!(task.poll(&exec), Some(Progress::Started)));
        assert_eq!(task.stage(), TaskStage::Submitted);

        let mut waits = 0;
        let value = loop {
            match task.poll(&exec) {
                Some(Progress::Waiting) => {
                    waits += 1;
                    thread::sleep(Duration::from_millis(1));
                }
                Some(Progress::Finished(v)) => break v,
                other => panic!("unexpected step: {:?}", other),
            }
        };

        assert_eq!(*value, 42);
        assert!(waits > 0);
        assert!(task.is_done());
        assert_eq!(task.result().as_deref(), Some(&42));
        assert!(task.poll(&exec).is_none());
    }

    #[test]
    fn test_polled_task_waits_until_workers_start() {
        let exec = executor(8);
        let mut task = PolledTask::new(times_42, 5);

        assert!(matches!(task.poll(&exec), Some(Progress::Started)));
        assert!(matches!(task.poll(&exec), Some(Progress::Waiting)));
        assert!(matches!(task.poll(&exec), Some(Progress::Waiting)));
        assert_eq!(task.stage(), TaskStage::Waiting);
        assert!(task.result().is_none());

        exec.start().unwrap();
        let value = loop {
            if let Some(Progress::Finished(v)) = task.poll(&exec) {
                break v;
            }
            thread::sleep(Duration::from_millis(1));
        };
        assert_eq!(*value, 210);
    }

    #[test]
    fn test_polled_task_submit_failure() {
        let exec = executor(1);
        exec.shutdown();

        let mut task = PolledTask::new(times_42, 1);
        match task.poll(&exec) {
            Some(Progress::Failed(e)) => assert_eq!(e, ExecError::ShutDown),
            other => panic!("unexpected step: {:?}", other),
        }
        assert!(task.is_done());
        assert!(task.poll(&exec).is_none());
    }
}
