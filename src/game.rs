//! Top-level driver: the game state machine around the simulation
//!
//! `Game` owns the world and the scheduler, validates player actions
//! against the current phase, and talks to the persistence and telemetry
//! sinks. Sinks are only called from safe phases, never mid-tick.

use crate::error::ActionError;
use crate::persistence::{ProgressRecord, ProgressSink, SessionRecord};
use crate::platform::InputIntent;
use crate::scheduler::TickScheduler;
use crate::settings::Settings;
use crate::sim::snapshot::{RenderSink, WorldSnapshot};
use crate::sim::{GameEvent, GamePhase, LevelOverrides, Progress, UpgradeKind, World, resolve_level_params};
use crate::telemetry::{TelemetryEvent, TelemetrySink};

pub struct Game {
    world: World,
    scheduler: TickScheduler,
    settings: Settings,
    overrides: Option<LevelOverrides>,
    store: Box<dyn ProgressSink>,
    telemetry: Box<dyn TelemetrySink>,
    /// Phase to return to when the shop closes
    shop_return: Option<GamePhase>,
    level_started_ms: f64,
}

impl Game {
    pub fn new(
        seed: u64,
        progress: Progress,
        settings: Settings,
        store: Box<dyn ProgressSink>,
        telemetry: Box<dyn TelemetrySink>,
    ) -> Self {
        let mut world = World::new(seed, progress);
        world.admin_enemy_tier = settings.admin_enemy_tier;
        log::info!("Game created (seed {seed}, level {})", world.progress.level);
        Self {
            world,
            scheduler: TickScheduler::new(),
            settings,
            overrides: None,
            store,
            telemetry,
            shop_return: None,
            level_started_ms: 0.0,
        }
    }

    pub fn with_overrides(mut self, overrides: LevelOverrides) -> Self {
        if !overrides.is_empty() {
            self.overrides = Some(overrides);
        }
        self
    }

    #[inline]
    pub fn phase(&self) -> GamePhase {
        self.world.phase
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn progress(&self) -> &Progress {
        &self.world.progress
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn fps(&self) -> u32 {
        self.scheduler.fps()
    }

    /// Reset and reseed the current level, entering the intro
    pub fn begin_level(&mut self, now_ms: f64) -> Result<u32, ActionError> {
        match self.world.phase {
            GamePhase::Menu | GamePhase::LevelComplete | GamePhase::GameOver => {}
            phase => return Err(ActionError::WrongPhase(phase)),
        }
        let level = self.world.progress.level;
        let params = resolve_level_params(level, self.overrides.as_ref());
        self.world.admin_enemy_tier = self.settings.admin_enemy_tier;
        self.world.begin_level(params);
        self.scheduler.reset();
        self.level_started_ms = now_ms;
        self.telemetry.record(TelemetryEvent::LevelStart {
            level,
            rebirths: self.world.progress.rebirths,
        });
        Ok(level)
    }

    /// Drive one host frame. Returns the events produced by the ticks run.
    pub fn frame(&mut self, now_ms: f64, input: &InputIntent) -> Vec<GameEvent> {
        let was_simulating = self.world.phase.is_simulating();
        self.scheduler.frame(now_ms, &mut self.world, input);
        let events = self.world.drain_events();

        if was_simulating && self.world.phase.is_safe() {
            self.on_level_end(now_ms, &events);
        }
        events
    }

    /// Persist the outcome of a level attempt. Only runs once the world has
    /// left the simulating phases.
    fn on_level_end(&mut self, now_ms: f64, events: &[GameEvent]) {
        let cleared = events.iter().find_map(|e| match e {
            GameEvent::LevelCleared { xp, .. } => Some(*xp),
            _ => None,
        });
        let player = &self.world.player;
        let session = SessionRecord {
            score: player.session_xp,
            level_reached: self.world.params.level,
            xp_earned: cleared.unwrap_or(0),
            duration_seconds: ((now_ms - self.level_started_ms) / 1000.0).max(0.0),
            cleared: cleared.is_some(),
        };
        self.store.save_session(&session);
        if cleared.is_some() {
            self.save_progress();
        }
        log::info!(
            "Level {} ended: {:?} after {:.1}s",
            session.level_reached,
            self.world.phase,
            session.duration_seconds
        );
    }

    fn save_progress(&mut self) {
        let record = ProgressRecord::from(&self.world.progress);
        self.store.save_progress(&record);
    }

    /// Open the upgrade shop from the menu or mid-level
    pub fn open_shop(&mut self) -> Result<(), ActionError> {
        match self.world.phase {
            GamePhase::Menu | GamePhase::Playing => {}
            phase => return Err(ActionError::WrongPhase(phase)),
        }
        self.shop_return = Some(self.world.phase);
        self.world.phase = GamePhase::Shop;
        self.scheduler.suspend();
        log::info!("Shop opened");
        Ok(())
    }

    pub fn close_shop(&mut self) -> Result<GamePhase, ActionError> {
        if self.world.phase != GamePhase::Shop {
            return Err(ActionError::WrongPhase(self.world.phase));
        }
        let phase = self.shop_return.take().unwrap_or(GamePhase::Menu);
        self.world.phase = phase;
        self.scheduler.resume();
        log::info!("Shop closed, back to {phase:?}");
        Ok(phase)
    }

    /// Buy one level of `kind`. Applies to the live player immediately.
    pub fn purchase(&mut self, kind: UpgradeKind) -> Result<u8, ActionError> {
        if self.world.phase != GamePhase::Shop {
            return Err(ActionError::WrongPhase(self.world.phase));
        }
        let price = kind.price(self.world.progress.upgrades.get(kind));
        let new_level = self.world.progress.purchase(kind)?;

        let player = &mut self.world.player;
        player.upgrades.set(kind, new_level);
        if kind == UpgradeKind::Health {
            player.sync_max_health();
        }

        self.save_progress();
        self.telemetry.record(TelemetryEvent::Purchase {
            kind,
            new_level,
            price,
        });
        log::info!("Purchased {kind:?} level {new_level} for {price} xp");
        Ok(new_level)
    }

    /// Start over at level 1 with a higher upgrade floor
    pub fn rebirth(&mut self) -> Result<u32, ActionError> {
        match self.world.phase {
            GamePhase::Menu | GamePhase::GameComplete => {}
            phase => return Err(ActionError::WrongPhase(phase)),
        }
        self.world.progress.rebirth();
        self.world.clear_entities();
        self.world.phase = GamePhase::Menu;
        self.scheduler.reset();

        let rebirths = self.world.progress.rebirths;
        self.save_progress();
        self.telemetry.record(TelemetryEvent::Rebirth { rebirths });
        log::info!("Rebirth #{rebirths}, upgrade floor {}", self.world.progress.upgrade_floor);
        Ok(rebirths)
    }

    /// Leave a finished level for the menu
    pub fn return_to_menu(&mut self) -> Result<(), ActionError> {
        match self.world.phase {
            GamePhase::LevelComplete | GamePhase::GameOver | GamePhase::GameComplete => {}
            phase => return Err(ActionError::WrongPhase(phase)),
        }
        self.world.clear_entities();
        self.world.phase = GamePhase::Menu;
        self.scheduler.reset();
        Ok(())
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.world).with_skin(self.settings.skin)
    }

    pub fn render(&self, sink: &mut dyn RenderSink) {
        sink.present(&self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;

    use super::*;
    use crate::persistence::MemoryStore;
    use crate::settings::SkinId;
    use crate::telemetry::RecordingTelemetry;

    /// Store handle kept by the test after boxing a clone into the game
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<MemoryStore>>);

    impl ProgressSink for SharedStore {
        fn save_progress(&mut self, record: &ProgressRecord) {
            self.0.borrow_mut().save_progress(record);
        }

        fn save_session(&mut self, record: &SessionRecord) {
            self.0.borrow_mut().save_session(record);
        }
    }

    /// Levels with nothing hostile on the map and a one-star quota
    const QUIET_LEVELS: &str = r#"{
        "1":  {"starsNeeded": 1, "enemyCount": 0, "killerSawCount": 0, "floatingCannonCount": 0,
               "resentfulSnakeCount": 0, "healthBoxCount": 0, "centralCell": false},
        "25": {"starsNeeded": 1, "enemyCount": 0, "killerSawCount": 0, "floatingCannonCount": 0,
               "resentfulSnakeCount": 0, "healthBoxCount": 0, "centralCell": false}
    }"#;

    fn quiet_game(progress: Progress, store: &SharedStore) -> Game {
        let overrides = LevelOverrides::from_json(QUIET_LEVELS).unwrap();
        Game::new(
            99,
            progress,
            Settings::default(),
            Box::new(store.clone()),
            Box::new(RecordingTelemetry::default()),
        )
        .with_overrides(overrides)
    }

    /// Step 50ms frames from `now` until `done` holds; returns the new time
    fn run_until(game: &mut Game, mut now: f64, done: impl Fn(&Game) -> bool) -> f64 {
        for _ in 0..400 {
            if done(game) {
                return now;
            }
            now += 50.0;
            game.frame(now, &InputIntent::default());
        }
        panic!("condition not reached, phase {:?}", game.phase());
    }

    /// Begin the current level and wait out the intro
    fn start_playing(game: &mut Game, now: f64) -> f64 {
        game.begin_level(now).unwrap();
        run_until(game, now, |g| g.phase() == GamePhase::Playing)
    }

    /// Drop every star onto the head and run until the level resolves
    fn gather_stars(game: &mut Game, now: f64) -> f64 {
        let head = game.world.player.head();
        for star in &mut game.world.stars {
            star.pos = head;
        }
        run_until(game, now, |g| g.phase().is_safe())
    }

    fn new_game(progress: Progress) -> Game {
        Game::new(
            7,
            progress,
            Settings::default(),
            Box::new(MemoryStore::new()),
            Box::new(RecordingTelemetry::default()),
        )
    }

    #[test]
    fn test_begin_only_from_rest_phases() {
        let mut game = new_game(Progress::default());
        assert_eq!(game.begin_level(0.0), Ok(1));
        assert_eq!(game.phase(), GamePhase::LevelIntro);
        assert_eq!(
            game.begin_level(0.0),
            Err(ActionError::WrongPhase(GamePhase::LevelIntro))
        );
    }

    #[test]
    fn test_shop_round_trip_from_menu() {
        let mut game = new_game(Progress {
            lifetime_xp: 1000,
            ..Default::default()
        });
        assert_eq!(
            game.purchase(UpgradeKind::Speed),
            Err(ActionError::WrongPhase(GamePhase::Menu))
        );
        game.open_shop().unwrap();
        assert!(game.scheduler().is_suspended());
        assert_eq!(game.purchase(UpgradeKind::Speed), Ok(1));
        assert_eq!(game.progress().lifetime_xp, 920);
        assert_eq!(game.close_shop(), Ok(GamePhase::Menu));
        assert!(!game.scheduler().is_suspended());
    }

    #[test]
    fn test_health_purchase_applies_live() {
        let mut game = new_game(Progress {
            lifetime_xp: 1000,
            ..Default::default()
        });
        game.begin_level(0.0).unwrap();
        game.world.phase = GamePhase::Playing;
        let max = game.world().player.health.max;

        game.open_shop().unwrap();
        game.purchase(UpgradeKind::Health).unwrap();
        assert_eq!(game.world().player.health.max, max + 2);
        assert_eq!(game.world().player.health.current, max + 2);
        assert_eq!(game.close_shop(), Ok(GamePhase::Playing));
    }

    #[test]
    fn test_rebirth_phases() {
        let mut game = new_game(Progress::default());
        game.begin_level(0.0).unwrap();
        assert!(matches!(game.rebirth(), Err(ActionError::WrongPhase(_))));
        game.world.phase = GamePhase::GameComplete;
        assert_eq!(game.rebirth(), Ok(1));
        assert_eq!(game.phase(), GamePhase::Menu);
        assert_eq!(game.progress().upgrade_floor, 1);
        assert!(game.world().enemies.is_empty());
    }

    #[test]
    fn test_cleared_level_is_banked_and_saved() {
        let store = SharedStore::default();
        let mut game = quiet_game(Progress::default(), &store);
        let now = start_playing(&mut game, 1000.0);
        gather_stars(&mut game, now);

        assert_eq!(game.phase(), GamePhase::LevelComplete);
        assert_eq!(game.progress().level, 2);
        assert!(game.progress().lifetime_stars >= 1);

        let store = store.0.borrow();
        assert_eq!(store.sessions.len(), 1);
        assert!(store.sessions[0].cleared);
        assert!(store.sessions[0].duration_seconds > 0.0);
        assert_eq!(store.last_progress().map(|r| r.level), Some(2));
    }

    #[test]
    fn test_death_logs_session_but_banks_nothing() {
        let store = SharedStore::default();
        let mut game = quiet_game(Progress::default(), &store);
        let now = start_playing(&mut game, 1000.0);

        // One health left, head pushed into the border strip
        let player = &mut game.world.player;
        player.health.current = 1;
        player.invulnerable = 0;
        let offset = Vec2::new(game.world.bounds.border * 0.5 - player.head().x, 0.0);
        player.body.translate(offset);
        let now = run_until(&mut game, now, |g| g.phase().is_safe());

        assert_eq!(game.phase(), GamePhase::GameOver);
        assert_eq!(game.progress().level, 1);
        assert_eq!(game.progress().lifetime_xp, 0);
        {
            let store = store.0.borrow();
            assert_eq!(store.sessions.len(), 1);
            assert!(!store.sessions[0].cleared);
            assert_eq!(store.sessions[0].xp_earned, 0);
            assert!(store.progress.is_empty());
        }

        // Frames after the end simulate nothing
        let ticks = game.world().time_ticks;
        assert!(game.frame(now + 200.0, &InputIntent::default()).is_empty());
        assert_eq!(game.world().time_ticks, ticks);

        // Retry the same level
        assert_eq!(game.begin_level(now + 200.0), Ok(1));
    }

    #[test]
    fn test_campaign_end_and_rebirth() {
        let store = SharedStore::default();
        let progress = Progress {
            level: 25,
            ..Default::default()
        };
        let mut game = quiet_game(progress, &store);
        let now = start_playing(&mut game, 1000.0);
        let now = gather_stars(&mut game, now);
        assert_eq!(game.phase(), GamePhase::GameComplete);
        assert!(matches!(
            game.begin_level(now),
            Err(ActionError::WrongPhase(GamePhase::GameComplete))
        ));

        assert_eq!(game.rebirth(), Ok(1));
        assert_eq!(game.phase(), GamePhase::Menu);
        assert_eq!(game.progress().level, 1);
        assert_eq!(game.progress().upgrades.get(UpgradeKind::Shield), 1);
        assert_eq!(store.0.borrow().last_progress().map(|r| r.rebirths), Some(1));

        start_playing(&mut game, now);
        assert_eq!(game.snapshot().level, 1);
    }

    #[test]
    fn test_snapshot_uses_chosen_skin() {
        let mut game = new_game(Progress::default());
        game.settings.skin = SkinId::Venom;
        game.begin_level(0.0).unwrap();
        assert_eq!(game.snapshot().skin_colors, SkinId::Venom.colors());
    }
}
