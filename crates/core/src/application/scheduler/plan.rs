//! Sweep planner - decides which queue to poll next and for how long
//!
//! Queues are visited from the highest priority (index 0) down. Any
//! non-empty result below the top sends the sweep back to the top queue,
//! so a lower-priority message is never processed while a higher-priority
//! queue still has work. The top queue is long-polled only while the
//! planner believes the lower queues are empty; otherwise it is
//! short-polled so new high-priority work is not hidden behind a long wait.
//!
//! The planner performs no I/O. The scheduler asks it for the next poll,
//! performs it, and reports back whether messages were returned.

use super::constants::MAX_LONG_POLL_WAIT;
use std::time::Duration;

/// Position of the planner inside one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    /// Keep polling the top queue while it returns messages
    PollHighPriority,
    /// Poll one lower-priority queue, or the only queue
    PollNext(usize),
    /// Go back to the top of the priority list
    RestartSweep,
    /// Every queue came back empty
    Complete,
}

/// One receive call to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    pub queue_index: usize,
    pub wait: Duration,
}

#[derive(Debug, Clone)]
pub struct SweepPlanner {
    queue_count: usize,
    high_priority_wait: Duration,
    /// A lower-priority queue may still hold messages from the last attempt
    carry_forward: bool,
    /// The current top-queue drain has already returned messages
    draining: bool,
    state: SweepState,
    sweeps: u64,
}

impl SweepPlanner {
    pub fn new(queue_count: usize, high_priority_wait: Duration) -> Self {
        Self {
            queue_count,
            high_priority_wait,
            carry_forward: true,
            draining: false,
            state: SweepState::Complete,
            sweeps: 0,
        }
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    pub fn carry_forward(&self) -> bool {
        self.carry_forward
    }

    /// Number of sweeps started so far
    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    /// Start a new sweep at the top queue
    ///
    /// Only the very first sweep assumes lower queues may hold messages.
    pub fn begin_sweep(&mut self) {
        if self.sweeps > 0 {
            self.carry_forward = false;
        }
        self.sweeps += 1;
        self.state = SweepState::RestartSweep;
    }

    /// Return to the top queue without ending the sweep (used while paused)
    pub fn restart(&mut self) {
        self.state = SweepState::RestartSweep;
    }

    /// Next poll to issue, or None once the sweep is complete
    pub fn next_poll(&mut self) -> Option<PollRequest> {
        loop {
            match self.state {
                SweepState::RestartSweep => {
                    self.draining = false;
                    self.state = if self.queue_count > 1 {
                        SweepState::PollHighPriority
                    } else {
                        SweepState::PollNext(0)
                    };
                }
                SweepState::PollHighPriority => {
                    let wait = if self.draining || self.carry_forward {
                        Duration::ZERO
                    } else {
                        self.high_priority_wait
                    };
                    return Some(PollRequest {
                        queue_index: 0,
                        wait,
                    });
                }
                SweepState::PollNext(queue_index) => {
                    let wait = if self.queue_count == 1 {
                        MAX_LONG_POLL_WAIT
                    } else {
                        Duration::ZERO
                    };
                    return Some(PollRequest { queue_index, wait });
                }
                SweepState::Complete => return None,
            }
        }
    }

    /// Report whether the poll returned by `next_poll` yielded messages
    pub fn record(&mut self, had_messages: bool) {
        self.state = match self.state {
            SweepState::PollHighPriority if had_messages => {
                self.draining = true;
                SweepState::PollHighPriority
            }
            SweepState::PollHighPriority => SweepState::PollNext(1),
            SweepState::PollNext(queue_index) => {
                self.carry_forward = had_messages;
                if had_messages {
                    SweepState::RestartSweep
                } else if queue_index + 1 < self.queue_count {
                    SweepState::PollNext(queue_index + 1)
                } else {
                    SweepState::Complete
                }
            }
            other => other,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIGH_WAIT: Duration = Duration::from_secs(3);

    fn poll(queue_index: usize, secs: u64) -> Option<PollRequest> {
        Some(PollRequest {
            queue_index,
            wait: Duration::from_secs(secs),
        })
    }

    #[test]
    fn test_single_queue_always_uses_max_wait() {
        let mut planner = SweepPlanner::new(1, HIGH_WAIT);
        planner.begin_sweep();
        assert_eq!(planner.next_poll(), poll(0, 20));
        planner.record(true);
        assert_eq!(planner.next_poll(), poll(0, 20));
        planner.record(false);
        assert_eq!(planner.next_poll(), None);

        planner.begin_sweep();
        assert_eq!(planner.next_poll(), poll(0, 20));
    }

    #[test]
    fn test_top_queue_non_empty_repolls_top_with_zero_wait() {
        let mut planner = SweepPlanner::new(3, HIGH_WAIT);
        planner.begin_sweep();
        planner.next_poll();
        planner.record(true);
        assert_eq!(planner.next_poll(), poll(0, 0));
        planner.record(true);
        assert_eq!(planner.next_poll(), poll(0, 0));
        planner.record(false);
        assert_eq!(planner.next_poll(), poll(1, 0));
    }

    #[test]
    fn test_first_sweep_short_polls_then_long_polls() {
        let mut planner = SweepPlanner::new(2, HIGH_WAIT);
        planner.begin_sweep();
        assert!(planner.carry_forward());
        assert_eq!(planner.next_poll(), poll(0, 0));
        planner.record(false);
        assert_eq!(planner.next_poll(), poll(1, 0));
        planner.record(false);
        assert_eq!(planner.next_poll(), None);
        assert_eq!(planner.state(), SweepState::Complete);

        planner.begin_sweep();
        assert!(!planner.carry_forward());
        assert_eq!(planner.next_poll(), poll(0, 3));
    }

    #[test]
    fn test_low_priority_hit_restarts_at_top_with_zero_wait() {
        let mut planner = SweepPlanner::new(2, HIGH_WAIT);
        planner.begin_sweep();
        planner.next_poll();
        planner.record(false);
        planner.next_poll();
        planner.record(false);
        planner.begin_sweep();

        // Steady state: top queue long-polled, low queue returns a message
        assert_eq!(planner.next_poll(), poll(0, 3));
        planner.record(false);
        assert_eq!(planner.next_poll(), poll(1, 0));
        planner.record(true);

        assert_eq!(planner.state(), SweepState::RestartSweep);
        assert_eq!(planner.next_poll(), poll(0, 0));
        planner.record(false);
        assert_eq!(planner.next_poll(), poll(1, 0));
        planner.record(false);
        assert_eq!(planner.next_poll(), None);
    }

    #[test]
    fn test_third_queue_hit_rechecks_every_higher_queue() {
        let mut planner = SweepPlanner::new(3, HIGH_WAIT);
        planner.begin_sweep();
        let mut order = Vec::new();
        let results = [false, false, true, false, false, false];
        for had_messages in results {
            let request = planner.next_poll().unwrap();
            order.push(request.queue_index);
            planner.record(had_messages);
        }
        assert_eq!(order, vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(planner.next_poll(), None);
    }

    #[test]
    fn test_restart_keeps_carry_forward() {
        let mut planner = SweepPlanner::new(2, HIGH_WAIT);
        planner.begin_sweep();
        planner.next_poll();
        planner.record(false);
        assert_eq!(planner.next_poll(), poll(1, 0));

        planner.restart();
        assert!(planner.carry_forward());
        assert_eq!(planner.next_poll(), poll(0, 0));
    }
}
