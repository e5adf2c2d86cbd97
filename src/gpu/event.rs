// SPDX-License-Identifier: GPL-3.0-only

//! Monotonic signal counter ordering dispatches on one context
//!
//! Every scheduled kernel waits on the current value and then signals the next
//! one, so each dispatch observes the writes of every dispatch scheduled before
//! it. Inside a command buffer this is realised by running each dispatch in its
//! own compute pass (wgpu inserts the barriers between passes); across command
//! buffers the single queue executes submissions in order.
//!
//! The completed value is advanced from the queue's work-done callback and can
//! be read from any thread.

use super::context::CommandBuffer;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Event {
    /// Last value handed out by `signal`
    signaled: u64,
    /// Last value a dispatch was ordered after
    waited: u64,
    /// Highest value whose submission has finished on the GPU
    completed: Arc<AtomicU64>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order the next recorded work after everything signaled so far
    pub fn wait(&mut self, command_buffer: &mut CommandBuffer) {
        self.waited = self.signaled;
        command_buffer.record_wait(self.signaled);
    }

    /// Advance the counter past the work just recorded
    pub fn signal(&mut self, command_buffer: &mut CommandBuffer) -> u64 {
        self.signaled += 1;
        command_buffer.record_signal(self.signaled);
        self.signaled
    }

    pub fn signaled_value(&self) -> u64 {
        self.signaled
    }

    pub fn waited_value(&self) -> u64 {
        self.waited
    }

    pub fn completed_value(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// True once the dispatch that signaled `value` has finished
    pub fn is_complete(&self, value: u64) -> bool {
        self.completed_value() >= value
    }

    /// Mark `value` complete when the queue drains the current submission
    pub(crate) fn complete_on_submission(&self, queue: &wgpu::Queue, value: u64) {
        let completed = Arc::clone(&self.completed);
        queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::AcqRel);
        });
    }
}
