use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Handle of a scheduled job, used for cancellation.
pub type TaskId = u64;

/// Single-threaded virtual-clock task queue.
///
/// Jobs run in deadline order; jobs sharing a deadline run in the order they
/// were scheduled. Time only moves when the owner advances it, which keeps
/// debounce timers, node completions and transition delays deterministic.
#[derive(Debug)]
pub struct Scheduler<J> {
    now: Duration,
    next_id: TaskId,
    queue: BTreeMap<(Duration, TaskId), J>,
    deadlines: HashMap<TaskId, Duration>,
}

impl<J> Default for Scheduler<J> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J> Scheduler<J> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `job` to run `delay` after the current time.
    pub fn schedule(&mut self, delay: Duration, job: J) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        let due = self.now + delay;
        self.queue.insert((due, id), job);
        self.deadlines.insert(id, due);
        id
    }

    /// Cancel a pending job. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.deadlines.remove(&id) {
            Some(due) => self.queue.remove(&(due, id)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Deadline of the earliest pending job.
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Take the earliest job due at or before `until`, moving the clock to
    /// its deadline.
    pub fn pop_until(&mut self, until: Duration) -> Option<(TaskId, J)> {
        let &(due, id) = self.queue.keys().next()?;
        if due > until {
            return None;
        }
        let job = self.queue.remove(&(due, id))?;
        self.deadlines.remove(&id);
        self.now = self.now.max(due);
        Some((id, job))
    }

    /// Move the clock forward without running anything.
    pub fn advance_clock(&mut self, to: Duration) {
        self.now = self.now.max(to);
    }

    /// Drop every pending job.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.deadlines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn drain<J>(scheduler: &mut Scheduler<J>, until: Duration) -> Vec<J> {
        let mut jobs = Vec::new();
        while let Some((_, job)) = scheduler.pop_until(until) {
            jobs.push(job);
        }
        scheduler.advance_clock(until);
        jobs
    }

    #[test]
    fn test_jobs_run_in_deadline_then_schedule_order() {
        let mut s = Scheduler::new();
        s.schedule(ms(20), "late");
        s.schedule(ms(0), "first");
        s.schedule(ms(0), "second");
        assert_eq!(drain(&mut s, ms(10)), vec!["first", "second"]);
        assert_eq!(s.now(), ms(10));
        assert_eq!(drain(&mut s, ms(20)), vec!["late"]);
    }

    #[test]
    fn test_cancel() {
        let mut s = Scheduler::new();
        let id = s.schedule(ms(5), 1);
        assert!(s.is_pending(id));
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(drain(&mut s, ms(10)).is_empty());
    }

    #[test]
    fn test_delay_is_relative_to_current_time() {
        let mut s = Scheduler::new();
        s.advance_clock(ms(100));
        s.schedule(ms(50), ());
        assert_eq!(s.next_due(), Some(ms(150)));
        assert!(s.pop_until(ms(149)).is_none());
        assert!(s.pop_until(ms(150)).is_some());
        assert_eq!(s.now(), ms(150));
    }
}
