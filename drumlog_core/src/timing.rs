//! Foreground timers for a practice session.
//!
//! Timers are polled rather than driven by threads: the caller passes the
//! current instant and receives whatever firings became due since the last
//! poll. Two independent timers run during a session:
//! - the elapsed-time display, firing every second
//! - the metronome, firing every `60000 / tempo` milliseconds
//!
//! There is no drift correction. Changing the tempo or toggling playback
//! restarts the metronome interval from that instant.

use crate::types::clamp_tempo;
use chrono::{DateTime, Duration, Utc};

/// Default beats per bar (4/4 time)
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;

/// A cancellable periodic task with explicit start/stop
#[derive(Clone, Debug)]
pub struct PeriodicTask {
    interval: Duration,
    next_due: Option<DateTime<Utc>>,
}

impl PeriodicTask {
    /// Create a stopped task; intervals shorter than 1ms are raised to 1ms
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::milliseconds(1)),
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Arm the task; the first firing is one interval after `now`
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.next_due = Some(now + self.interval);
    }

    /// Cancel the task; pending firings are dropped
    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// Replace the interval and re-arm from `now` if running
    pub fn restart(&mut self, interval: Duration, now: DateTime<Utc>) {
        self.interval = interval.max(Duration::milliseconds(1));
        if self.is_running() {
            self.start(now);
        }
    }

    /// Number of firings due at `now` since the previous poll
    pub fn poll(&mut self, now: DateTime<Utc>) -> u64 {
        let Some(mut due) = self.next_due else {
            return 0;
        };
        let mut fired = 0;
        while due <= now {
            fired += 1;
            due += self.interval;
        }
        self.next_due = Some(due);
        fired
    }
}

/// Time between metronome clicks at `tempo` BPM (clamped to the supported range)
pub fn beat_interval(tempo: u32) -> Duration {
    Duration::microseconds(60_000_000 / clamp_tempo(tempo) as i64)
}

/// One metronome click
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Position in the bar, `0..beats_per_bar`
    pub beat: u32,
}

impl Tick {
    /// First beat of the bar
    pub fn is_downbeat(&self) -> bool {
        self.beat == 0
    }
}

/// Tempo-driven click generator with a cosmetic beat counter
#[derive(Clone, Debug)]
pub struct Metronome {
    tempo: u32,
    beats_per_bar: u32,
    beat: u32,
    task: PeriodicTask,
}

impl Metronome {
    pub fn new(tempo: u32, beats_per_bar: u32) -> Self {
        let tempo = clamp_tempo(tempo);
        Self {
            tempo,
            beats_per_bar: beats_per_bar.max(1),
            beat: 0,
            task: PeriodicTask::new(beat_interval(tempo)),
        }
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    pub fn is_playing(&self) -> bool {
        self.task.is_running()
    }

    /// Beat the next click will land on
    pub fn current_beat(&self) -> u32 {
        self.beat
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.beat = 0;
        self.task.start(now);
        tracing::debug!("Metronome started at {} BPM", self.tempo);
    }

    pub fn stop(&mut self) {
        self.task.stop();
        tracing::debug!("Metronome stopped");
    }

    /// Flip playback; returns whether the metronome is now playing
    pub fn toggle(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_playing() {
            self.stop();
        } else {
            self.start(now);
        }
        self.is_playing()
    }

    /// Change tempo; a playing metronome restarts its interval from `now`
    pub fn set_tempo(&mut self, tempo: u32, now: DateTime<Utc>) -> u32 {
        self.tempo = clamp_tempo(tempo);
        self.task.restart(beat_interval(self.tempo), now);
        if self.is_playing() {
            self.beat = 0;
        }
        self.tempo
    }

    /// Clicks due at `now`
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<Tick> {
        let fired = self.task.poll(now);
        (0..fired)
            .map(|_| {
                let tick = Tick { beat: self.beat };
                self.beat = (self.beat + 1) % self.beats_per_bar;
                tick
            })
            .collect()
    }
}

/// What happened between two polls of [`PracticeTimers`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimerEvents {
    /// Number of one-second display ticks that elapsed
    pub display_ticks: u64,
    pub clicks: Vec<Tick>,
}

/// The elapsed-time display and the metronome for one practice session
///
/// Both timers are stopped on [`PracticeTimers::stop_all`] and on drop.
#[derive(Debug)]
pub struct PracticeTimers {
    display: PeriodicTask,
    /// Display ticks counted since the current exercise started
    display_secs: u64,
    metronome: Metronome,
}

impl PracticeTimers {
    /// Start the display timer; the metronome starts stopped
    pub fn start(tempo: u32, beats_per_bar: u32, now: DateTime<Utc>) -> Self {
        let mut display = PeriodicTask::new(Duration::seconds(1));
        display.start(now);
        Self {
            display,
            display_secs: 0,
            metronome: Metronome::new(tempo, beats_per_bar),
        }
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    pub fn metronome_mut(&mut self) -> &mut Metronome {
        &mut self.metronome
    }

    /// Reset the display for a new exercise and move the metronome to its tempo
    pub fn next_exercise(&mut self, tempo: u32, now: DateTime<Utc>) {
        self.display.start(now);
        self.display_secs = 0;
        self.metronome.set_tempo(tempo, now);
    }

    /// Seconds shown on the elapsed-time display, as of the last poll
    pub fn display_secs(&self) -> u64 {
        self.display_secs
    }

    pub fn poll(&mut self, now: DateTime<Utc>) -> TimerEvents {
        let display_ticks = self.display.poll(now);
        self.display_secs += display_ticks;
        TimerEvents {
            display_ticks,
            clicks: self.metronome.poll(now),
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.display.is_running() && !self.metronome.is_playing()
    }

    pub fn stop_all(&mut self) {
        self.display.stop();
        self.metronome.stop();
    }
}

impl Drop for PracticeTimers {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use chrono::TimeZone;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 2, 2, 20, 0, 0).unwrap())
    }

    #[test]
    fn test_beat_interval_matches_tempo() {
        assert_eq!(beat_interval(120), Duration::milliseconds(500));
        assert_eq!(beat_interval(60), Duration::milliseconds(1000));
        assert_eq!(beat_interval(200), Duration::milliseconds(300));
        // Out-of-range tempos are clamped
        assert_eq!(beat_interval(10), Duration::milliseconds(1500));
    }

    #[test]
    fn test_periodic_task_fires_on_schedule() {
        let clock = clock();
        let mut task = PeriodicTask::new(Duration::seconds(1));
        assert_eq!(task.poll(clock.now()), 0);

        task.start(clock.now());
        clock.advance_millis(999);
        assert_eq!(task.poll(clock.now()), 0);
        clock.advance_millis(1);
        assert_eq!(task.poll(clock.now()), 1);
        clock.advance_secs(3);
        assert_eq!(task.poll(clock.now()), 3);
    }

    #[test]
    fn test_stopped_task_never_fires() {
        let clock = clock();
        let mut task = PeriodicTask::new(Duration::seconds(1));
        task.start(clock.now());
        task.stop();
        clock.advance_secs(10);
        assert_eq!(task.poll(clock.now()), 0);
        assert!(!task.is_running());
    }

    #[test]
    fn test_metronome_ticks_and_cycles_beats() {
        let clock = clock();
        let mut metronome = Metronome::new(120, DEFAULT_BEATS_PER_BAR);
        metronome.start(clock.now());

        clock.advance_millis(2500);
        let ticks = metronome.poll(clock.now());
        let beats: Vec<u32> = ticks.iter().map(|t| t.beat).collect();
        assert_eq!(beats, vec![0, 1, 2, 3, 0]);
        assert!(ticks[0].is_downbeat());
        assert_eq!(metronome.current_beat(), 1);
    }

    #[test]
    fn test_tempo_change_restarts_interval() {
        let clock = clock();
        let mut metronome = Metronome::new(60, DEFAULT_BEATS_PER_BAR);
        metronome.start(clock.now());

        clock.advance_millis(900);
        assert!(metronome.poll(clock.now()).is_empty());

        // Restart from this instant at 120 BPM: next click 500ms later, not at 1000ms
        metronome.set_tempo(120, clock.now());
        clock.advance_millis(499);
        assert!(metronome.poll(clock.now()).is_empty());
        clock.advance_millis(1);
        assert_eq!(metronome.poll(clock.now()), vec![Tick { beat: 0 }]);
    }

    #[test]
    fn test_tempo_change_while_stopped_does_not_start() {
        let clock = clock();
        let mut metronome = Metronome::new(90, DEFAULT_BEATS_PER_BAR);
        metronome.set_tempo(150, clock.now());
        clock.advance_secs(5);
        assert!(metronome.poll(clock.now()).is_empty());
        assert_eq!(metronome.tempo(), 150);
    }

    #[test]
    fn test_toggle() {
        let clock = clock();
        let mut metronome = Metronome::new(100, 3);
        assert!(metronome.toggle(clock.now()));
        assert!(!metronome.toggle(clock.now()));
        clock.advance_secs(5);
        assert!(metronome.poll(clock.now()).is_empty());
    }

    #[test]
    fn test_practice_timers_are_independent() {
        let clock = clock();
        let mut timers = PracticeTimers::start(120, DEFAULT_BEATS_PER_BAR, clock.now());
        timers.metronome_mut().start(clock.now());

        clock.advance_millis(2000);
        let events = timers.poll(clock.now());
        assert_eq!(events.display_ticks, 2);
        assert_eq!(events.clicks.len(), 4);

        timers.metronome_mut().stop();
        clock.advance_secs(1);
        let events = timers.poll(clock.now());
        assert_eq!(events.display_ticks, 1);
        assert!(events.clicks.is_empty());
    }

    #[test]
    fn test_next_exercise_resets_display_and_tempo() {
        let clock = clock();
        let mut timers = PracticeTimers::start(120, DEFAULT_BEATS_PER_BAR, clock.now());
        clock.advance_millis(1500);
        timers.next_exercise(80, clock.now());

        clock.advance_millis(999);
        assert_eq!(timers.poll(clock.now()).display_ticks, 0);
        assert_eq!(timers.display_secs(), 0);
        assert_eq!(timers.metronome().tempo(), 80);
    }

    #[test]
    fn test_display_secs_accumulate_per_exercise() {
        let clock = clock();
        let mut timers = PracticeTimers::start(100, DEFAULT_BEATS_PER_BAR, clock.now());

        clock.advance_millis(2500);
        timers.poll(clock.now());
        clock.advance_millis(600);
        timers.poll(clock.now());
        assert_eq!(timers.display_secs(), 3);

        timers.next_exercise(90, clock.now());
        assert_eq!(timers.display_secs(), 0);
        clock.advance_secs(65);
        timers.poll(clock.now());
        assert_eq!(timers.display_secs(), 65);
    }

    #[test]
    fn test_stop_all_releases_both_timers() {
        let clock = clock();
        let mut timers = PracticeTimers::start(120, DEFAULT_BEATS_PER_BAR, clock.now());
        timers.metronome_mut().start(clock.now());
        timers.stop_all();
        assert!(timers.is_idle());

        clock.advance_secs(10);
        assert_eq!(timers.poll(clock.now()), TimerEvents::default());
    }
}
