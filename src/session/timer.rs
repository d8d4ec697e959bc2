//! Frame-counted timers for the single-threaded session loop

use indexmap::IndexMap;

/// Handle to a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Scheduled<T> {
    remaining: u32,
    payload: T,
}

/// Payloads that fire after a number of ticks
///
/// Nothing runs on its own: [`FrameScheduler::advance`] is called once per
/// frame and returns whatever became due, in scheduling order.
#[derive(Debug)]
pub struct FrameScheduler<T> {
    pending: IndexMap<TimerId, Scheduled<T>>,
    next_id: u64,
}

impl<T> Default for FrameScheduler<T> {
    fn default() -> Self {
        Self {
            pending: IndexMap::new(),
            next_id: 0,
        }
    }
}

impl<T> FrameScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires `payload` on the `frames`-th call to [`Self::advance`]
    ///
    /// A delay of zero fires on the next advance.
    pub fn schedule(&mut self, frames: u32, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert(
            id,
            Scheduled {
                remaining: frames.max(1),
                payload,
            },
        );
        id
    }

    /// Cancels a pending task, returning its payload
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        self.pending.shift_remove(&id).map(|task| task.payload)
    }

    /// Cancels everything, returning the payloads in scheduling order
    pub fn cancel_all(&mut self) -> Vec<T> {
        self.pending.drain(..).map(|(_, task)| task.payload).collect()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Advances one frame and returns the payloads that are now due
    pub fn advance(&mut self) -> Vec<T> {
        for task in self.pending.values_mut() {
            task.remaining -= 1;
        }
        let due: Vec<TimerId> = self
            .pending
            .iter()
            .filter(|(_, task)| task.remaining == 0)
            .map(|(id, _)| *id)
            .collect();
        due.into_iter().filter_map(|id| self.cancel(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_delay() {
        let mut scheduler = FrameScheduler::new();
        scheduler.schedule(2, "connect");
        assert!(scheduler.advance().is_empty());
        assert_eq!(scheduler.advance(), vec!["connect"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_cancelled_tasks_never_fire() {
        let mut scheduler = FrameScheduler::new();
        let first = scheduler.schedule(1, 1);
        scheduler.schedule(1, 2);
        assert_eq!(scheduler.cancel(first), Some(1));
        assert_eq!(scheduler.cancel(first), None);
        assert_eq!(scheduler.advance(), vec![2]);
    }

    #[test]
    fn test_cancel_all_keeps_order() {
        let mut scheduler = FrameScheduler::new();
        scheduler.schedule(5, 'a');
        scheduler.schedule(0, 'b');
        assert_eq!(scheduler.cancel_all(), vec!['a', 'b']);
        assert!(scheduler.advance().is_empty());
    }
}
