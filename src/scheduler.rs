//! Fixed-step tick driver
//!
//! Wall-clock time only decides how many ticks to run; every tick moves the
//! world by the same logical step. Also owns the player's repeat-fire timer.

use crate::consts::*;
use crate::platform::InputIntent;
use crate::sim::combat::{fire_player_volley, player_fire_cooldown_ms};
use crate::sim::{GamePhase, World, tick};

const FPS_WINDOW: usize = 60;

/// Repeating fire timer. Armed while fire is held, cancelled the moment it
/// is released. The cooldown is read from the player's upgrades at every
/// re-arm, so a purchase mid-burst applies to the next shot.
#[derive(Debug, Clone, Default)]
pub struct FireTimer {
    next_ms: Option<f64>,
}

impl FireTimer {
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.next_ms.is_some()
    }

    pub fn cancel(&mut self) {
        self.next_ms = None;
    }

    /// Fire if due. Returns bullets fired.
    pub fn poll(&mut self, world: &mut World, fire: bool) -> usize {
        if !fire || world.phase != GamePhase::Playing {
            self.cancel();
            return 0;
        }
        let now = world.now_ms();
        if self.next_ms.is_some_and(|due| now < due) {
            return 0;
        }
        let fired = fire_player_volley(world);
        self.next_ms = Some(now + player_fire_cooldown_ms(&world.player.upgrades));
        fired
    }
}

/// Accumulator-based tick pacing with an FPS estimate
#[derive(Debug, Clone)]
pub struct TickScheduler {
    accumulator: f64,
    last_ms: Option<f64>,
    suspended: bool,
    fire: FireTimer,
    // FPS tracking
    frame_times: [f64; FPS_WINDOW],
    frame_index: usize,
    fps: u32,
    ticks_run: u64,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler {
    pub fn new() -> Self {
        Self {
            accumulator: 0.0,
            last_ms: None,
            suspended: false,
            fire: FireTimer::default(),
            frame_times: [0.0; FPS_WINDOW],
            frame_index: 0,
            fps: 0,
            ticks_run: 0,
        }
    }

    /// Back to start-of-level state (new level, rebirth)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.last_ms = None;
        self.suspended = false;
        self.fire.cancel();
    }

    /// Stop running ticks (shop overlay)
    pub fn suspend(&mut self) {
        self.suspended = true;
        self.fire.cancel();
        self.accumulator = 0.0;
    }

    /// Resume without replaying time spent suspended
    pub fn resume(&mut self) {
        self.suspended = false;
        self.last_ms = None;
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    pub fn fire_timer(&self) -> &FireTimer {
        &self.fire
    }

    /// Run as many whole ticks as the elapsed time allows. Returns the count.
    pub fn frame(&mut self, now_ms: f64, world: &mut World, input: &InputIntent) -> u32 {
        self.track_fps(now_ms);

        if self.suspended || world.phase == GamePhase::Shop {
            self.last_ms = Some(now_ms);
            self.fire.cancel();
            return 0;
        }

        let elapsed = match self.last_ms {
            Some(last) => (now_ms - last).clamp(0.0, MAX_FRAME_MS),
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        self.accumulator += elapsed;

        let mut substeps = 0;
        while self.accumulator >= TICK_MS && substeps < MAX_SUBSTEPS {
            self.fire.poll(world, input.fire);
            tick(world, input);
            self.accumulator -= TICK_MS;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS && self.accumulator >= TICK_MS {
            log::debug!("Dropping {:.1} ms of backlog", self.accumulator);
            self.accumulator = 0.0;
        }
        self.ticks_run += substeps as u64;
        substeps
    }

    fn track_fps(&mut self, now_ms: f64) {
        self.frame_times[self.frame_index] = now_ms;
        self.frame_index = (self.frame_index + 1) % FPS_WINDOW;

        // Oldest sample is the one about to be overwritten
        let oldest = self.frame_times[self.frame_index];
        if oldest > 0.0 {
            let elapsed = now_ms - oldest;
            if elapsed > 0.0 {
                self.fps = ((FPS_WINDOW - 1) as f64 * 1000.0 / elapsed).round() as u32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::resolve_level_params;
    use crate::sim::progression::Progress;

    fn playing_world() -> World {
        let mut world = World::new(5, Progress::default());
        world.begin_level(resolve_level_params(1, None));
        world.enemies.clear();
        world.phase = GamePhase::Playing;
        world
    }

    #[test]
    fn test_ticks_follow_elapsed_time() {
        let mut world = playing_world();
        let mut scheduler = TickScheduler::new();
        let input = InputIntent::default();

        assert_eq!(scheduler.frame(1000.0, &mut world, &input), 0);
        assert_eq!(scheduler.frame(1000.0 + TICK_MS * 2.5, &mut world, &input), 2);
        // Half a tick carried over
        assert_eq!(scheduler.frame(1000.0 + TICK_MS * 3.75, &mut world, &input), 1);
        assert_eq!(world.time_ticks, 3);
    }

    #[test]
    fn test_substeps_are_capped() {
        let mut world = playing_world();
        let mut scheduler = TickScheduler::new();
        let input = InputIntent::default();
        scheduler.frame(0.0, &mut world, &input);
        assert_eq!(scheduler.frame(200.0, &mut world, &input), MAX_SUBSTEPS);
        // Backlog was dropped, not replayed
        assert_eq!(scheduler.frame(200.0, &mut world, &input), 0);
    }

    #[test]
    fn test_shop_suspends_everything() {
        let mut world = playing_world();
        let mut scheduler = TickScheduler::new();
        let input = InputIntent::default().with_fire(true);
        scheduler.frame(0.0, &mut world, &input);

        world.phase = GamePhase::Shop;
        scheduler.suspend();
        assert_eq!(scheduler.frame(100.0, &mut world, &input), 0);
        assert!(!scheduler.fire_timer().is_armed());

        world.phase = GamePhase::Playing;
        scheduler.resume();
        // Time spent in the shop is not replayed
        assert_eq!(scheduler.frame(5000.0, &mut world, &input), 0);
        assert_eq!(scheduler.frame(5000.0 + TICK_MS * 1.5, &mut world, &input), 1);
    }

    #[test]
    fn test_fire_timer_repeats_and_cancels() {
        let mut world = playing_world();
        let mut timer = FireTimer::default();

        assert_eq!(timer.poll(&mut world, true), 1);
        assert!(timer.is_armed());
        // Still cooling down
        assert_eq!(timer.poll(&mut world, true), 0);

        timer.poll(&mut world, false);
        assert!(!timer.is_armed());
        // Releasing and pressing again fires straight away
        assert_eq!(timer.poll(&mut world, true), 1);
    }

    #[test]
    fn test_fire_timer_reads_live_upgrades() {
        let mut world = playing_world();
        let mut timer = FireTimer::default();
        timer.poll(&mut world, true);
        let slow = timer.next_ms.unwrap();

        world.player.upgrades.bullet_speed = 10;
        world.time_ticks = (slow / TICK_MS).ceil() as u64;
        timer.poll(&mut world, true);
        let fast = timer.next_ms.unwrap() - world.now_ms();
        assert!((fast - player_fire_cooldown_ms(&world.player.upgrades)).abs() < 1e-6);
        assert!(fast < PLAYER_FIRE_BASE_MS);
    }

    #[test]
    fn test_fps_estimate() {
        let mut world = World::new(1, Progress::default());
        let mut scheduler = TickScheduler::new();
        let input = InputIntent::default();
        for i in 1..=120 {
            scheduler.frame(i as f64 * 16.0, &mut world, &input);
        }
        assert!((60..=64).contains(&scheduler.fps()));
    }
}
