// Copyright (c) 2024-present Ignis Engine Contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! The scheduler: a fixed pool of worker threads, one ring queue per worker,
//! and dependency-counted jobs that are scheduled the instant their last
//! prerequisite finishes.
//!
//! Locking discipline (see `SPEC_FULL.md` §4.2): the job table's own lock is
//! held only long enough to clone an `Arc<JobInner>` out of the pool. Every
//! other piece of cross-job state - a job's dependents list, its remaining
//! prerequisite count, its finished flag - lives on the `JobInner` itself and
//! is synchronized independently, so two unrelated jobs finishing on two
//! different worker threads never contend on a single global lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use ignis_core::log::Log;
use ignis_core::memory::FreeListAllocator;
use ignis_core::pool::Pool;
use parking_lot::Mutex;

use crate::job::{JobHandle, JobInner, JobOutcome, JobProc, JobState};
use crate::params::RawParams;
use crate::semaphore::Semaphore;

/// Default size of the shared heap backing `execute_raw` parameter buffers.
const DEFAULT_PARAMS_HEAP_SIZE: usize = 4 * 1024 * 1024;

/// Handed to a running job's body. Lets the job spawn further jobs without
/// needing its own reference to the surrounding `Arc<JobSystem>`.
pub struct JobContext {
    system: Arc<Shared>,
}

impl JobContext {
    /// Schedules a new closure-based job from inside a running job, with the
    /// same dependency semantics as `JobSystem::execute`.
    pub fn spawn(&self, wait_for: &[JobHandle], body: impl FnOnce(&JobContext) -> JobOutcome + Send + 'static) -> JobHandle {
        Shared::submit(&self.system, Box::new(body), None, wait_for)
    }
}

struct Worker {
    queue: Mutex<VecDeque<JobHandle>>,
    semaphore: Semaphore,
}

impl Worker {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            semaphore: Semaphore::new(),
        }
    }

    fn len(&self) -> usize {
        self.queue.lock().len()
    }

    fn push(&self, handle: JobHandle) {
        self.queue.lock().push_back(handle);
        self.semaphore.signal();
    }
}

/// State shared between the public `JobSystem` handle and every worker
/// thread it owns.
struct Shared {
    workers: Vec<Worker>,
    jobs: Mutex<Pool<Arc<JobInner>>>,
    params_heap: Arc<FreeListAllocator>,
    /// Jobs scheduled but not yet finished, across every worker. Drives
    /// `wait_for_all`'s termination and the stealing scan.
    in_progress: AtomicUsize,
    shutting_down: AtomicBool,
}

impl Shared {
    /// Picks the worker with the fewest queued jobs and pushes onto it.
    /// Matches the source scheduler's "assign to whichever queue is shortest
    /// right now" policy rather than a fixed round robin, which would let one
    /// slow worker accumulate a backlog while others sit idle.
    fn schedule(&self, handle: JobHandle) {
        let mut best = 0usize;
        let mut best_len = usize::MAX;
        for (i, worker) in self.workers.iter().enumerate() {
            let len = worker.len();
            if len < best_len {
                best_len = len;
                best = i;
            }
        }
        self.in_progress.fetch_add(1, Ordering::SeqCst);
        {
            let jobs = self.jobs.lock();
            if let Some(inner) = jobs.try_borrow(handle) {
                inner.set_state(JobState::Queued);
            }
        }
        self.workers[best].push(handle);
    }

    /// Registers a new job and either schedules it immediately (no
    /// outstanding prerequisites) or lets it sit `Waiting` until its last
    /// prerequisite's `finalize` call schedules it.
    fn submit(self_arc: &Arc<Self>, proc: JobProc, raw_params: Option<RawParams>, wait_for: &[JobHandle]) -> JobHandle {
        let mut unfinished = 0u32;
        {
            let jobs = self_arc.jobs.lock();
            for pred in wait_for {
                if let Some(inner) = jobs.try_borrow(*pred) {
                    if !inner.finished.load(Ordering::Acquire) {
                        unfinished += 1;
                    }
                }
            }
        }

        let inner = Arc::new(JobInner::new(proc, raw_params, unfinished));
        let handle = {
            let mut jobs = self_arc.jobs.lock();
            jobs.spawn(inner.clone())
        };

        if unfinished == 0 {
            self_arc.schedule(handle);
            return handle;
        }

        // Register with every still-unfinished predecessor. A predecessor
        // that finishes between the check above and this registration simply
        // means its dependents list is consulted after we've already been
        // added to it, which `finalize` accounts for without double-counting.
        let jobs = self_arc.jobs.lock();
        for pred in wait_for {
            if let Some(pred_inner) = jobs.try_borrow(*pred) {
                let mut dependents = pred_inner.dependents.lock();
                if !pred_inner.finished.load(Ordering::Acquire) {
                    dependents.push(handle);
                } else {
                    drop(dependents);
                    Self::decrement_and_maybe_schedule(self_arc, handle, &inner);
                }
            }
        }
        handle
    }

    fn decrement_and_maybe_schedule(self_arc: &Arc<Self>, handle: JobHandle, inner: &Arc<JobInner>) {
        if inner.remaining_prereq.fetch_sub(1, Ordering::AcqRel) == 1 {
            self_arc.schedule(handle);
        }
    }

    /// Runs a job's body to completion and propagates the outcome to its
    /// dependents. Called from a worker thread or, during `wait_for_all`'s
    /// steal path, from the waiting thread itself.
    fn run_and_finalize(self_arc: &Arc<Self>, handle: JobHandle) {
        let inner = {
            let jobs = self_arc.jobs.lock();
            jobs.try_borrow(handle).cloned()
        };
        let Some(inner) = inner else {
            self_arc.in_progress.fetch_sub(1, Ordering::SeqCst);
            return;
        };

        inner.set_state(JobState::Running);
        let proc = inner.proc.lock().take();
        let ctx = JobContext {
            system: self_arc.clone(),
        };
        let outcome = match proc {
            Some(proc) => {
                let _scratch = ignis_core::memory::ScratchArena::acquire();
                proc(&ctx)
            }
            None => JobOutcome::Succeeded,
        };
        inner.raw_params.lock().take();

        match &outcome {
            JobOutcome::Succeeded => inner.set_state(JobState::Finished),
            JobOutcome::Failed(msg) => {
                Log::err(format!("job failed: {msg}"));
                inner.set_state(JobState::Failed);
            }
        }
        inner.finished.store(true, Ordering::Release);

        let dependents = std::mem::take(&mut *inner.dependents.lock());
        match &outcome {
            JobOutcome::Succeeded => {
                for dep in dependents {
                    let dep_inner = {
                        let jobs = self_arc.jobs.lock();
                        jobs.try_borrow(dep).cloned()
                    };
                    if let Some(dep_inner) = dep_inner {
                        Self::decrement_and_maybe_schedule(self_arc, dep, &dep_inner);
                    }
                }
            }
            JobOutcome::Failed(_) => {
                for dep in dependents {
                    Self::cancel_recursive(self_arc, dep);
                }
            }
        }

        self_arc.in_progress.fetch_sub(1, Ordering::SeqCst);
    }

    /// Marks `handle` and every job transitively depending on it as
    /// `Cancelled`, per the failure-cascade behavior in `SPEC_FULL.md` §4.2:
    /// a job never runs with a failed prerequisite.
    fn cancel_recursive(self_arc: &Arc<Self>, handle: JobHandle) {
        let inner = {
            let jobs = self_arc.jobs.lock();
            jobs.try_borrow(handle).cloned()
        };
        let Some(inner) = inner else { return };
        if inner.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        inner.set_state(JobState::Cancelled);
        inner.proc.lock().take();
        inner.raw_params.lock().take();

        let dependents = std::mem::take(&mut *inner.dependents.lock());
        for dep in dependents {
            Self::cancel_recursive(self_arc, dep);
        }
    }
}

/// The engine's job scheduler: `num_cpus::get() - 2` worker threads (leaving
/// headroom for the render thread and the OS), each draining its own queue.
pub struct JobSystem {
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl JobSystem {
    /// Spawns the worker pool. Sized the way the source engine sizes its own
    /// thread pool: total hardware threads minus two, floored at one so the
    /// system degrades gracefully on very small machines.
    pub fn new() -> Arc<Self> {
        Self::with_worker_count(num_cpus::get().saturating_sub(2).max(1))
    }

    pub fn with_worker_count(worker_count: usize) -> Arc<Self> {
        let shared = Arc::new(Shared {
            workers: (0..worker_count).map(|_| Worker::new()).collect(),
            jobs: Mutex::new(Pool::new()),
            params_heap: Arc::new(FreeListAllocator::new(DEFAULT_PARAMS_HEAP_SIZE)),
            in_progress: AtomicUsize::new(0),
            shutting_down: AtomicBool::new(false),
        });

        let mut threads = Vec::with_capacity(worker_count);
        for worker_index in 0..worker_count {
            let shared = shared.clone();
            threads.push(
                std::thread::Builder::new()
                    .name(format!("ignis-job-worker-{worker_index}"))
                    .spawn(move || worker_loop(shared, worker_index))
                    .expect("failed to spawn job worker thread"),
            );
        }

        Arc::new(Self {
            shared,
            threads: Mutex::new(threads),
        })
    }

    /// Schedules a closure-based job. `wait_for` lists the handles of every
    /// job this one must not start before; an empty slice runs it as soon as
    /// a worker is free.
    pub fn execute(
        self: &Arc<Self>,
        wait_for: &[JobHandle],
        body: impl FnOnce(&JobContext) -> JobOutcome + Send + 'static,
    ) -> JobHandle {
        Shared::submit(&self.shared, Box::new(body), None, wait_for)
    }

    /// Schedules a job whose parameters are raw bytes copied through the
    /// system's shared free-list heap rather than captured in a closure,
    /// matching the source engine's parameter-block lifecycle literally. The
    /// buffer is freed automatically once `body` returns.
    pub fn execute_raw(
        self: &Arc<Self>,
        wait_for: &[JobHandle],
        params: &[u8],
        body: impl FnOnce(&[u8], &JobContext) -> JobOutcome + Send + 'static,
    ) -> JobHandle {
        let raw = RawParams::store(self.shared.params_heap.clone(), params);
        let bytes = raw.load();
        let proc: JobProc = Box::new(move |ctx| body(&bytes, ctx));
        Shared::submit(&self.shared, proc, Some(raw), wait_for)
    }

    pub fn state_of(&self, handle: JobHandle) -> Option<JobState> {
        let jobs = self.shared.jobs.lock();
        jobs.try_borrow(handle).map(|inner| inner.state())
    }

    /// Blocks the calling thread until every job submitted so far has
    /// finished, failed, or been cancelled. While waiting, the calling
    /// thread steals work from whichever worker has the deepest backlog
    /// (LIFO, so the most recently queued - and most likely cache-warm - job
    /// goes first) instead of sitting idle.
    pub fn wait_for_all(self: &Arc<Self>) {
        loop {
            if self.shared.in_progress.load(Ordering::SeqCst) == 0 {
                return;
            }

            let mut victim = None;
            let mut deepest = 1usize;
            for (i, worker) in self.shared.workers.iter().enumerate() {
                let len = worker.len();
                if len > deepest {
                    deepest = len;
                    victim = Some(i);
                }
            }

            let Some(victim) = victim else {
                std::thread::yield_now();
                continue;
            };

            let stolen = {
                let mut queue = self.shared.workers[victim].queue.lock();
                if queue.len() < 2 {
                    None
                } else {
                    queue.pop_back()
                }
            };

            match stolen {
                Some(handle) => {
                    self.shared.workers[victim].semaphore.try_consume();
                    Shared::run_and_finalize(&self.shared, handle);
                }
                None => std::thread::yield_now(),
            }
        }
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        self.shared.shutting_down.store(true, Ordering::SeqCst);
        for worker in &self.shared.workers {
            worker.semaphore.signal();
        }
        for handle in self.threads.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>, worker_index: usize) {
    loop {
        shared.workers[worker_index].semaphore.wait();
        if shared.shutting_down.load(Ordering::SeqCst) {
            return;
        }
        let job = shared.workers[worker_index].queue.lock().pop_front();
        if let Some(handle) = job {
            Shared::run_and_finalize(&shared, handle);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn independent_job_runs_immediately() {
        let system = JobSystem::with_worker_count(2);
        let flag = Arc::new(AtomicBool::new(false));
        let flag2 = flag.clone();
        system.execute(&[], move |_| {
            flag2.store(true, Ordering::SeqCst);
            JobOutcome::Succeeded
        });
        system.wait_for_all();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn job_chain_observes_predecessor_write() {
        // Mirrors the spec's "job chain" scenario: J1 writes x, J2 depends on
        // J1 and writes y = x + 1; after wait_for_all, y must be 2.
        let system = JobSystem::with_worker_count(2);
        let x = Arc::new(AtomicI32::new(0));
        let y = Arc::new(AtomicI32::new(0));

        let x1 = x.clone();
        let j1 = system.execute(&[], move |_| {
            x1.store(1, Ordering::SeqCst);
            JobOutcome::Succeeded
        });

        let x2 = x.clone();
        let y2 = y.clone();
        let _j2 = system.execute(&[j1], move |_| {
            y2.store(x2.load(Ordering::SeqCst) + 1, Ordering::SeqCst);
            JobOutcome::Succeeded
        });

        system.wait_for_all();
        assert_eq!(y.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dependent_on_already_finished_job_runs_without_deadlock() {
        let system = JobSystem::with_worker_count(2);
        let j1 = system.execute(&[], |_| JobOutcome::Succeeded);
        system.wait_for_all();
        assert_eq!(system.state_of(j1), Some(JobState::Finished));

        let flag = Arc::new(AtomicBool::new(false));
        let flag2 = flag.clone();
        system.execute(&[j1], move |_| {
            flag2.store(true, Ordering::SeqCst);
            JobOutcome::Succeeded
        });
        system.wait_for_all();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn failure_cascades_to_every_dependent() {
        // J1 fails; J2 and J3 depend on J1; J4 depends on J2. All four must
        // end up Failed or Cancelled, and none of J2/J3/J4 must run.
        let system = JobSystem::with_worker_count(2);
        let ran = Arc::new(AtomicBool::new(false));

        let j1 = system.execute(&[], |_| JobOutcome::Failed("boom".into()));
        let j2 = system.execute(&[j1], {
            let ran = ran.clone();
            move |_| {
                ran.store(true, Ordering::SeqCst);
                JobOutcome::Succeeded
            }
        });
        let j3 = system.execute(&[j1], {
            let ran = ran.clone();
            move |_| {
                ran.store(true, Ordering::SeqCst);
                JobOutcome::Succeeded
            }
        });
        let j4 = system.execute(&[j2], {
            let ran = ran.clone();
            move |_| {
                ran.store(true, Ordering::SeqCst);
                JobOutcome::Succeeded
            }
        });

        system.wait_for_all();

        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(system.state_of(j1), Some(JobState::Failed));
        assert_eq!(system.state_of(j2), Some(JobState::Cancelled));
        assert_eq!(system.state_of(j3), Some(JobState::Cancelled));
        assert_eq!(system.state_of(j4), Some(JobState::Cancelled));
    }

    #[test]
    fn execute_raw_roundtrips_parameters() {
        let system = JobSystem::with_worker_count(1);
        let out = Arc::new(AtomicI32::new(0));
        let out2 = out.clone();
        system.execute_raw(&[], &42i32.to_le_bytes(), move |bytes, _| {
            let value = i32::from_le_bytes(bytes.try_into().unwrap());
            out2.store(value, Ordering::SeqCst);
            JobOutcome::Succeeded
        });
        system.wait_for_all();
        assert_eq!(out.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn nested_spawn_from_running_job_is_observed_by_wait_for_all() {
        let system = JobSystem::with_worker_count(2);
        let flag = Arc::new(AtomicBool::new(false));
        let flag2 = flag.clone();
        system.execute(&[], move |ctx| {
            ctx.spawn(&[], move |_| {
                flag2.store(true, Ordering::SeqCst);
                JobOutcome::Succeeded
            });
            JobOutcome::Succeeded
        });
        system.wait_for_all();
        assert!(flag.load(Ordering::SeqCst));
    }
}
