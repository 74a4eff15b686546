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

//! The [`Job`] record and its handle.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use ignis_core::pool::Handle;
use parking_lot::Mutex;

use crate::JobContext;

/// Result a job's body reports back to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
}

/// A scheduled unit of work. Opaque outside this crate: use
/// [`crate::JobSystem`] to query or wait on it.
pub type JobHandle = Handle<Arc<JobInner>>;

pub(crate) type JobProc = Box<dyn FnOnce(&JobContext) -> JobOutcome + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobState {
    Waiting = 0,
    Queued = 1,
    Running = 2,
    Finished = 3,
    Failed = 4,
    Cancelled = 5,
}

impl JobState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Waiting,
            1 => Self::Queued,
            2 => Self::Running,
            3 => Self::Finished,
            4 => Self::Failed,
            _ => Self::Cancelled,
        }
    }
}

/// The actual job bookkeeping, held behind `Arc` so a reference can be
/// cloned out of the job pool and operated on without holding the pool's
/// own lock - only this struct's own fields (`dependents`, `remaining_prereq`,
/// `finished`) are part of the cross-job locking protocol described in
/// `SPEC_FULL.md` §4.2.
pub struct JobInner {
    pub(crate) proc: Mutex<Option<JobProc>>,
    /// Raw parameter bytes backed by the job system's free-list heap, for
    /// jobs scheduled through `execute_raw`. `None` for closure-based jobs.
    pub(crate) raw_params: Mutex<Option<crate::params::RawParams>>,
    pub(crate) dependents: Mutex<Vec<JobHandle>>,
    pub(crate) remaining_prereq: AtomicU32,
    pub(crate) finished: AtomicBool,
    state: AtomicU8,
}

impl JobInner {
    pub(crate) fn new(proc: JobProc, raw_params: Option<crate::params::RawParams>, prereq_count: u32) -> Self {
        Self {
            proc: Mutex::new(Some(proc)),
            raw_params: Mutex::new(raw_params),
            dependents: Mutex::new(Vec::new()),
            remaining_prereq: AtomicU32::new(prereq_count),
            finished: AtomicBool::new(false),
            state: AtomicU8::new(JobState::Waiting as u8),
        }
    }

    pub(crate) fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: JobState) {
        self.state.store(state as u8, Ordering::Release);
    }
}
