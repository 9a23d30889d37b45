//! Worker Pool — a fixed-size thread pool with pause/resume/drain/shutdown
//! semantics used both for ordinary query dispatch and to quiesce readers
//! around the Shadow-Swap Coordinator's atomic swap (§4.6).
//!
//! Grounded on `index_stream::ThreadPool` (original `threadpool.hpp`/`.cpp`),
//! translated from one condition variable guarding three different
//! predicates into three separate `parking_lot::Condvar`s over the same
//! mutex, one per predicate (queue non-empty or stopped, not paused,
//! drained) — the original's single-condvar wakeup occasionally burns a
//! spurious wakeup re-checking an unrelated predicate, which is harmless
//! there but would let a `drain()` caller miss a wakeup if `pause()` and
//! `submit()` notifications coalesced into it under load.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tracing::error;

use crate::error::{Error, Result};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct State {
    tasks: VecDeque<Task>,
    stop: bool,
    paused: bool,
    active_tasks: usize,
}

struct Shared {
    state: Mutex<State>,
    ready: Condvar,
    not_paused: Condvar,
    drained: Condvar,
}

/// A fixed-size pool of worker threads pulling from a shared task queue.
pub struct Pool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    pub fn new(num_workers: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                tasks: VecDeque::new(),
                stop: false,
                paused: false,
                active_tasks: 0,
            }),
            ready: Condvar::new(),
            not_paused: Condvar::new(),
            drained: Condvar::new(),
        });

        let workers = (0..num_workers.max(1))
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || worker_loop(shared))
            })
            .collect();

        Self { shared, workers: Mutex::new(workers) }
    }

    /// Enqueue a task. Fails if the pool has been shut down.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        if state.stop {
            return Err(Error::PoolShuttingDown);
        }
        state.tasks.push_back(Box::new(task));
        drop(state);
        self.shared.ready.notify_one();
        Ok(())
    }

    /// Stop handing out new tasks to workers. Tasks already running finish
    /// normally; newly submitted tasks still queue but are not picked up
    /// until `resume()`.
    pub fn pause(&self) {
        let mut state = self.shared.state.lock();
        state.paused = true;
    }

    pub fn resume(&self) {
        {
            let mut state = self.shared.state.lock();
            state.paused = false;
        }
        self.shared.not_paused.notify_all();
        self.shared.ready.notify_all();
    }

    /// Block until the queue is empty and no worker has a task in flight.
    pub fn drain(&self) {
        let mut state = self.shared.state.lock();
        self.shared
            .drained
            .wait_while(&mut state, |s| !(s.tasks.is_empty() && s.active_tasks == 0));
    }

    pub fn active_tasks(&self) -> usize {
        self.shared.state.lock().active_tasks
    }

    pub fn queue_len(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }

    /// Stop all workers and join their threads. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.stop = true;
        }
        self.shared.ready.notify_all();
        self.shared.not_paused.notify_all();

        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if handle.join().is_err() {
                error!("worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let mut state = shared.state.lock();

        shared.not_paused.wait_while(&mut state, |s| s.paused && !s.stop);

        shared.ready.wait_while(&mut state, |s| s.tasks.is_empty() && !s.stop);

        if state.stop && state.tasks.is_empty() {
            return;
        }
        if state.paused {
            continue;
        }

        let task = match state.tasks.pop_front() {
            Some(task) => task,
            None => continue,
        };
        state.active_tasks += 1;
        drop(state);

        task();

        let mut state = shared.state.lock();
        state.active_tasks -= 1;
        if state.active_tasks == 0 && state.tasks.is_empty() {
            shared.drained.notify_all();
        }
    }
}
