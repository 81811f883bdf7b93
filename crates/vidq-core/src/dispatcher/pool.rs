//! Fixed worker pool over a shared FIFO queue.
//!
//! With `max_concurrency = n > 0`, n threads pop work from an
//! `Arc<Mutex<VecDeque>>` and block on a condvar when it is empty. With
//! `max_concurrency = 0`, each task gets its own thread (no limit).

use std::any::Any;
use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    pending: VecDeque<Task>,
    closed: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

enum Mode {
    Bounded {
        shared: Arc<Shared>,
        workers: Vec<JoinHandle<()>>,
    },
    Unbounded,
}

pub struct WorkerPool {
    mode: Mode,
    max_concurrency: usize,
}

impl WorkerPool {
    /// Spawns `max_concurrency` worker threads (none when 0).
    pub fn new(max_concurrency: usize) -> io::Result<Self> {
        if max_concurrency == 0 {
            return Ok(Self {
                mode: Mode::Unbounded,
                max_concurrency,
            });
        }
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                pending: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        });
        let mut workers = Vec::with_capacity(max_concurrency);
        for i in 0..max_concurrency {
            let worker = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("vidq-worker-{i}"))
                .spawn(move || worker_loop(&worker));
            match handle {
                Ok(h) => workers.push(h),
                Err(e) => {
                    close(&shared);
                    return Err(e);
                }
            }
        }
        Ok(Self {
            mode: Mode::Bounded { shared, workers },
            max_concurrency,
        })
    }

    /// 0 means unbounded.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Tasks waiting for a free worker. Always 0 when unbounded.
    pub fn queued(&self) -> usize {
        match &self.mode {
            Mode::Bounded { shared, .. } => lock(shared).pending.len(),
            Mode::Unbounded => 0,
        }
    }

    /// Enqueues `task` in FIFO order. Never blocks on running work.
    pub fn execute(&self, task: impl FnOnce() + Send + 'static) -> io::Result<()> {
        match &self.mode {
            Mode::Bounded { shared, .. } => {
                let mut queue = lock(shared);
                if queue.closed {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "worker pool closed"));
                }
                queue.pending.push_back(Box::new(task));
                drop(queue);
                shared.available.notify_one();
                Ok(())
            }
            Mode::Unbounded => {
                thread::Builder::new()
                    .name("vidq-worker".to_string())
                    .spawn(move || run_task(Box::new(task)))?;
                Ok(())
            }
        }
    }
}

impl Drop for WorkerPool {
    /// Closes the queue: idle workers exit, pending tasks are dropped, running
    /// tasks finish on their own detached threads.
    fn drop(&mut self) {
        if let Mode::Bounded { shared, workers } = &mut self.mode {
            close(shared);
            let dropped = lock(shared).pending.drain(..).count();
            if dropped > 0 {
                tracing::debug!(dropped, "worker pool closed with queued tasks");
            }
            workers.clear();
        }
    }
}

fn lock(shared: &Shared) -> std::sync::MutexGuard<'_, Queue> {
    shared.queue.lock().unwrap_or_else(PoisonError::into_inner)
}

fn close(shared: &Shared) {
    lock(shared).closed = true;
    shared.available.notify_all();
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut queue = lock(shared);
            loop {
                if queue.closed {
                    return;
                }
                if let Some(task) = queue.pending.pop_front() {
                    break task;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        run_task(task);
    }
}

/// Runs one task; a panic is logged and the worker keeps going.
fn run_task(task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        tracing::error!("worker task panicked: {}", panic_message(payload.as_ref()));
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
