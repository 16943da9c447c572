//! Burst/rest pacing decisions.
//!
//! Pure arithmetic over counters: no clock, no I/O. The job loop asks the
//! pacer what to do before every item and owns the timers itself, so the
//! cadence can be checked here against a virtual clock.
//!
//! Every wait the pacer hands out is measured from the start of the previous
//! send (or from the job start for the very first item), never from the end
//! of a transfer. Transfer latency therefore does not stretch the cadence.

use std::time::Duration;

/// What the job loop should do before the next item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceAction {
    /// Wait `wait` after the previous send started, then send one item.
    Send { wait: Duration },
    /// Burst capacity is used up: rest for `duration` after the previous send started.
    /// The first item of the next burst goes out as soon as the rest ends.
    Rest { duration: Duration },
    /// Nothing left to send.
    Done,
}

/// Position inside the current burst. Survives pause/resume unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstCursor {
    /// Items sent since the current burst began.
    pub sent_in_burst: u64,
    /// A rest just ended; the next send needs no extra interval.
    pub rested: bool,
}

/// Pacing parameters derived once from a [`crate::config::RateConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    burst_capacity: u64,
    per_item_interval: Duration,
    rest_duration: Duration,
}

impl Pacer {
    pub fn new(burst_capacity: u64, per_item_interval: Duration, rest_duration: Duration) -> Self {
        Self {
            burst_capacity: burst_capacity.max(1),
            per_item_interval,
            rest_duration,
        }
    }

    pub fn burst_capacity(&self) -> u64 {
        self.burst_capacity
    }

    pub fn per_item_interval(&self) -> Duration {
        self.per_item_interval
    }

    pub fn rest_duration(&self) -> Duration {
        self.rest_duration
    }

    /// Decide the next action given the burst position and items left in the job.
    pub fn decide(&self, cursor: BurstCursor, remaining: u64) -> PaceAction {
        if remaining == 0 {
            return PaceAction::Done;
        }
        if cursor.sent_in_burst >= self.burst_capacity {
            return PaceAction::Rest {
                duration: self.rest_duration,
            };
        }
        let wait = if cursor.rested {
            Duration::ZERO
        } else {
            self.per_item_interval
        };
        PaceAction::Send { wait }
    }

    /// Cursor after one item was sent.
    pub fn after_send(&self, cursor: BurstCursor) -> BurstCursor {
        BurstCursor {
            sent_in_burst: cursor.sent_in_burst.saturating_add(1),
            rested: false,
        }
    }

    /// Cursor after a rest phase completed.
    pub fn after_rest(&self, _cursor: BurstCursor) -> BurstCursor {
        BurstCursor {
            sent_in_burst: 0,
            rested: true,
        }
    }

    /// Items that can still go out before the next rest.
    pub fn burst_items_left(&self, cursor: BurstCursor, remaining: u64) -> u64 {
        self.burst_capacity
            .saturating_sub(cursor.sent_in_burst)
            .min(remaining)
    }

    /// Pacing time needed to send `remaining` items from `cursor`, ignoring
    /// transfer latency above the per-item interval.
    pub fn time_to_finish(&self, cursor: BurstCursor, remaining: u64) -> Duration {
        if remaining == 0 {
            return Duration::ZERO;
        }
        let first = self.burst_items_left(cursor, remaining);
        let mut total = if first == 0 {
            Duration::ZERO
        } else if cursor.rested {
            self.interval_times(first - 1)
        } else {
            self.interval_times(first)
        };
        let rest_items = remaining - first;
        if rest_items > 0 {
            let bursts = rest_items.div_ceil(self.burst_capacity);
            total += self.rest_duration.saturating_mul(saturating_u32(bursts));
            total += self.interval_times(rest_items - bursts);
        }
        total
    }

    fn interval_times(&self, n: u64) -> Duration {
        self.per_item_interval.saturating_mul(saturating_u32(n))
    }
}

fn saturating_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacer(capacity: u64, interval_ms: u64, rest_ms: u64) -> Pacer {
        Pacer::new(
            capacity,
            Duration::from_millis(interval_ms),
            Duration::from_millis(rest_ms),
        )
    }

    /// Drives the pacer against a virtual clock; returns the send time of every item.
    fn virtual_send_times(p: &Pacer, total: u64) -> Vec<Duration> {
        let mut clock = Duration::ZERO;
        let mut anchor = Duration::ZERO;
        let mut cursor = BurstCursor::default();
        let mut sent = 0u64;
        let mut times = Vec::new();
        loop {
            match p.decide(cursor, total - sent) {
                PaceAction::Done => break,
                PaceAction::Rest { duration } => {
                    clock = clock.max(anchor + duration);
                    cursor = p.after_rest(cursor);
                }
                PaceAction::Send { wait } => {
                    clock = clock.max(anchor + wait);
                    anchor = clock;
                    times.push(clock);
                    sent += 1;
                    cursor = p.after_send(cursor);
                }
            }
        }
        times
    }

    #[test]
    fn sends_at_interval_inside_burst() {
        let p = pacer(3, 40, 1000);
        let cursor = BurstCursor::default();
        assert_eq!(
            p.decide(cursor, 10),
            PaceAction::Send {
                wait: Duration::from_millis(40)
            }
        );
        let cursor = p.after_send(p.after_send(cursor));
        assert_eq!(cursor.sent_in_burst, 2);
        assert!(matches!(p.decide(cursor, 8), PaceAction::Send { .. }));
    }

    #[test]
    fn rests_at_capacity_then_sends_immediately() {
        let p = pacer(2, 40, 1000);
        let cursor = p.after_send(p.after_send(BurstCursor::default()));
        assert_eq!(
            p.decide(cursor, 5),
            PaceAction::Rest {
                duration: Duration::from_millis(1000)
            }
        );
        let cursor = p.after_rest(cursor);
        assert_eq!(cursor.sent_in_burst, 0);
        assert_eq!(
            p.decide(cursor, 5),
            PaceAction::Send {
                wait: Duration::ZERO
            }
        );
    }

    #[test]
    fn done_when_nothing_remains_even_at_capacity() {
        let p = pacer(2, 40, 1000);
        let full = p.after_send(p.after_send(BurstCursor::default()));
        assert_eq!(p.decide(full, 0), PaceAction::Done);
        assert_eq!(p.decide(BurstCursor::default(), 0), PaceAction::Done);
    }

    #[test]
    fn virtual_clock_cadence_across_bursts() {
        let p = pacer(3, 40, 1000);
        let times = virtual_send_times(&p, 7);
        let ms: Vec<u128> = times.iter().map(|d| d.as_millis()).collect();
        // 40, 80, 120 | rest 1000 from 120 | 1120, 1160, 1200 | rest | 2200
        assert_eq!(ms, vec![40, 80, 120, 1120, 1160, 1200, 2200]);
    }

    #[test]
    fn default_cycle_matches_expected_totals() {
        let p = Pacer::new(7500, Duration::from_millis(40), Duration::from_secs(30));
        let times = virtual_send_times(&p, 8000);
        assert_eq!(times.len(), 8000);
        assert_eq!(times[7499], Duration::from_secs(300));
        assert_eq!(times[7500], Duration::from_secs(330));
        assert_eq!(*times.last().unwrap(), Duration::from_millis(349_960));
    }

    #[test]
    fn time_to_finish_agrees_with_virtual_clock() {
        let p = pacer(3, 40, 1000);
        for total in 1..=10u64 {
            let times = virtual_send_times(&p, total);
            assert_eq!(
                p.time_to_finish(BurstCursor::default(), total),
                *times.last().unwrap(),
                "total = {total}"
            );
        }
    }

    #[test]
    fn time_to_finish_mid_job() {
        let p = pacer(3, 40, 1000);
        let after_rest = p.after_rest(BurstCursor {
            sent_in_burst: 3,
            rested: false,
        });
        // 1st item immediately, 2 more at 40ms each.
        assert_eq!(p.time_to_finish(after_rest, 3), Duration::from_millis(80));
        let full = BurstCursor {
            sent_in_burst: 3,
            rested: false,
        };
        assert_eq!(p.time_to_finish(full, 1), Duration::from_millis(1000));
        assert_eq!(p.time_to_finish(full, 0), Duration::ZERO);
    }

    #[test]
    fn burst_items_left_is_bounded_by_remaining() {
        let p = pacer(10, 40, 1000);
        let cursor = BurstCursor {
            sent_in_burst: 4,
            rested: false,
        };
        assert_eq!(p.burst_items_left(cursor, 100), 6);
        assert_eq!(p.burst_items_left(cursor, 2), 2);
    }
}
