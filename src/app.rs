use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, warn};

use crate::history::HistoryLog;
use crate::presenter::spawn_presentation;
use crate::runtime::{SpanEvent, Timers};
use crate::scores::{load_leaderboards, ScoreStore};
use crate::scoring::{Leaderboard, ListKey};
use crate::session::{Effect, Event, OspanStage, Phase, Session, Settings, TestKind, PAUSE_STEP_MS};
use crate::speech::Speaker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// test selection
    Menu,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    None,
    Settings,
    Leaderboard,
}

/// Everything the event loop owns: the session plus its collaborators
pub struct App {
    pub state: AppState,
    pub panel: Panel,
    pub session: Session,
    pub timers: Timers,
    pub leaderboards: HashMap<ListKey, Leaderboard>,
    pub games_played: usize,
    pub should_quit: bool,
    store: Box<dyn ScoreStore>,
    history: Option<HistoryLog>,
    speaker: Arc<dyn Speaker>,
    events: Sender<SpanEvent>,
    rng: StdRng,
}

impl App {
    pub fn new(
        kind: Option<TestKind>,
        settings: Settings,
        store: Box<dyn ScoreStore>,
        speaker: Arc<dyn Speaker>,
        events: Sender<SpanEvent>,
    ) -> Self {
        let leaderboards = load_leaderboards(store.as_ref());
        Self {
            state: if kind.is_some() {
                AppState::Test
            } else {
                AppState::Menu
            },
            panel: Panel::None,
            session: Session::new(kind.unwrap_or(TestKind::Digit), settings),
            timers: Timers::new(),
            leaderboards,
            games_played: 0,
            should_quit: false,
            store,
            history: None,
            speaker,
            events,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_history(mut self, history: HistoryLog) -> Self {
        self.games_played = history.records().map(|r| r.len()).unwrap_or_else(|err| {
            warn!(error = %err, "could not read game history");
            0
        });
        self.history = Some(history);
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn leaderboard(&self, list: ListKey) -> &Leaderboard {
        static EMPTY: Leaderboard = Leaderboard::empty();
        self.leaderboards.get(&list).unwrap_or(&EMPTY)
    }

    /// Feeds an event through the session and performs the resulting effects
    pub fn dispatch(&mut self, event: Event) {
        let is_reset = event == Event::Reset;
        let transition = self.session.handle(event, &mut self.rng);
        self.session = transition.session;

        if is_reset {
            self.timers.retain_generation(self.session.generation);
        }
        if !self.session.can_configure() && self.panel == Panel::Settings {
            self.panel = Panel::None;
        }
        if !self.session.can_view_leaderboard() && self.panel == Panel::Leaderboard {
            self.panel = Panel::None;
        }

        for effect in transition.effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Present(presentation) => {
                spawn_presentation(self.speaker.clone(), presentation, self.events.clone());
            }
            Effect::Schedule { delay, event } => {
                self.timers.schedule(Instant::now(), delay, event);
            }
            Effect::Record { list, entry } => {
                info!(%list, level = entry.level, score = entry.score, "recording score");
                let board = self.leaderboards.entry(list).or_default();
                board.insert(entry);
                if let Err(err) = self.store.save(list, board.entries()) {
                    warn!(%list, error = %err, "failed to persist leaderboard");
                }
            }
            Effect::GameOver(summary) => {
                self.games_played += 1;
                if let Some(history) = &self.history {
                    if let Err(err) = history.append(&summary) {
                        warn!(
                            path = %history.path().display(),
                            error = %err,
                            "failed to append game history"
                        );
                    }
                }
            }
        }
    }

    /// Fires every delayed transition that has come due
    pub fn on_tick(&mut self, now: Instant) {
        for event in self.timers.take_due(now) {
            self.dispatch(event);
        }
    }

    pub fn select_test(&mut self, kind: TestKind) {
        let settings = self.session.settings.clone();
        let generation = self.session.generation + 1;
        self.session = Session::new(kind, settings);
        self.session.generation = generation;
        self.timers.retain_generation(generation);
        self.panel = Panel::None;
        self.state = AppState::Test;
        debug!(%kind, "test selected");
    }

    pub fn back_to_menu(&mut self) {
        self.dispatch(Event::Reset);
        self.panel = Panel::None;
        self.state = AppState::Menu;
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.state {
            AppState::Menu => self.on_menu_key(key),
            AppState::Test => match self.panel {
                Panel::Settings => self.on_settings_key(key),
                Panel::Leaderboard => self.on_leaderboard_key(key),
                Panel::None => self.on_test_key(key),
            },
        }
    }

    fn on_menu_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('1') | KeyCode::Char('d') => self.select_test(TestKind::Digit),
            KeyCode::Char('2') | KeyCode::Char('o') => self.select_test(TestKind::Ospan),
            KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn on_settings_key(&mut self, key: KeyEvent) {
        let settings = self.session.settings.clone();
        match key.code {
            KeyCode::Left | KeyCode::Char('-') => {
                self.dispatch(Event::SetPause(
                    settings.pause_ms.saturating_sub(PAUSE_STEP_MS),
                ));
            }
            KeyCode::Right | KeyCode::Char('+') => {
                self.dispatch(Event::SetPause(settings.pause_ms + PAUSE_STEP_MS));
            }
            KeyCode::Char('v') => self.dispatch(Event::SetVoice(settings.voice.next())),
            KeyCode::Char('r') if self.session.kind == TestKind::Digit => {
                self.dispatch(Event::SetReverse(!settings.reverse));
            }
            KeyCode::Char('s') | KeyCode::Esc | KeyCode::Enter => self.panel = Panel::None,
            _ => {}
        }
    }

    fn on_leaderboard_key(&mut self, key: KeyEvent) {
        if matches!(
            key.code,
            KeyCode::Char('l') | KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace
        ) {
            self.panel = Panel::None;
        }
    }

    fn on_test_key(&mut self, key: KeyEvent) {
        let stage = self.session.stage;
        match (self.session.phase, key.code) {
            (Phase::Ready, KeyCode::Enter | KeyCode::Char(' ')) => self.dispatch(Event::Start),
            (Phase::Ready, KeyCode::Char('s')) => self.panel = Panel::Settings,
            (Phase::Ready | Phase::Finished, KeyCode::Char('l')) => {
                self.panel = Panel::Leaderboard
            }
            (
                Phase::Ready | Phase::Correct | Phase::Incorrect | Phase::Finished,
                KeyCode::Char('b'),
            ) => self.back_to_menu(),
            (Phase::Ready | Phase::Finished, KeyCode::Esc) => self.should_quit = true,
            (Phase::Finished, KeyCode::Enter | KeyCode::Char('p')) => {
                self.dispatch(Event::Reset)
            }
            (Phase::Playing, KeyCode::Char('y') | KeyCode::Left)
                if stage == OspanStage::Math =>
            {
                self.dispatch(Event::Judge { says_true: true })
            }
            (Phase::Playing, KeyCode::Char('n') | KeyCode::Right)
                if stage == OspanStage::Math =>
            {
                self.dispatch(Event::Judge { says_true: false })
            }
            (Phase::Input, KeyCode::Backspace) => self.dispatch(Event::Delete),
            (Phase::Input, KeyCode::Enter) => self.dispatch(Event::Submit),
            (Phase::Input, KeyCode::Char(c)) => self.dispatch(Event::Append(c)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::MemoryScoreStore;
    use crate::scoring::ScoreEntry;
    use crate::session::{ADVANCE_DELAY, FINISH_DELAY};
    use crate::speech::SilentSpeaker;
    use std::sync::mpsc;
    use std::time::Duration;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(kind: Option<TestKind>) -> (App, mpsc::Receiver<SpanEvent>) {
        let (tx, rx) = mpsc::channel();
        let app = App::new(
            kind,
            Settings::default(),
            Box::new(MemoryScoreStore::default()),
            Arc::new(SilentSpeaker),
            tx,
        )
        .with_rng(StdRng::seed_from_u64(9));
        (app, rx)
    }

    fn type_answer(app: &mut App) {
        for c in app.session.expected_answer().chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
        app.on_key(key(KeyCode::Enter));
    }

    #[test]
    fn menu_selects_test() {
        let (mut app, _rx) = app(None);
        assert_eq!(app.state, AppState::Menu);
        app.on_key(key(KeyCode::Char('2')));
        assert_eq!(app.state, AppState::Test);
        assert_eq!(app.session.kind, TestKind::Ospan);
    }

    #[test]
    fn ctrl_c_quits_anywhere() {
        let (mut app, _rx) = app(Some(TestKind::Digit));
        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn settings_panel_adjusts_session_settings() {
        let (mut app, _rx) = app(Some(TestKind::Digit));
        app.on_key(key(KeyCode::Char('s')));
        assert_eq!(app.panel, Panel::Settings);
        app.on_key(key(KeyCode::Right));
        app.on_key(key(KeyCode::Right));
        app.on_key(key(KeyCode::Char('r')));
        app.on_key(key(KeyCode::Char('v')));
        assert_eq!(app.session.settings.pause_ms, 1000);
        assert!(app.session.settings.reverse);
        assert_eq!(app.session.settings.voice, crate::speech::Voice::Anna);
        app.on_key(key(KeyCode::Char('s')));
        assert_eq!(app.panel, Panel::None);
    }

    #[test]
    fn starting_a_digit_round_spawns_presentation() {
        let (mut app, rx) = app(Some(TestKind::Digit));
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.session.phase, Phase::Playing);

        let generation = app.session.generation;
        let mut completed = false;
        while let Ok(ev) = rx.recv_timeout(Duration::from_secs(5)) {
            if let SpanEvent::Session(ev) = ev {
                let done = ev == Event::PresentationComplete { generation };
                app.dispatch(ev);
                if done {
                    completed = true;
                    break;
                }
            }
        }
        assert!(completed);
        assert_eq!(app.session.phase, Phase::Input);
        assert_eq!(app.session.presented, 3);
    }

    #[test]
    fn ospan_round_is_keyboard_driven() {
        let (mut app, _rx) = app(Some(TestKind::Ospan));
        app.on_key(key(KeyCode::Char(' ')));
        for _ in 0..3 {
            let truthful = app.session.current_probe().unwrap().is_displayed_true();
            app.on_key(key(if truthful {
                KeyCode::Char('y')
            } else {
                KeyCode::Char('n')
            }));
        }
        assert_eq!(app.session.phase, Phase::Input);
        type_answer(&mut app);
        assert_eq!(app.session.phase, Phase::Correct);
        assert_eq!(app.timers.len(), 1);
    }

    #[test]
    fn due_timer_advances_level() {
        let (mut app, _rx) = app(Some(TestKind::Ospan));
        app.dispatch(Event::Start);
        for _ in 0..3 {
            let truthful = app.session.current_probe().unwrap().is_displayed_true();
            app.dispatch(Event::Judge {
                says_true: truthful,
            });
        }
        type_answer(&mut app);
        app.on_tick(Instant::now());
        assert_eq!(app.session.level, 3);
        app.on_tick(Instant::now() + Duration::from_secs(3));
        assert_eq!(app.session.level, 4);
        assert_eq!(app.session.phase, Phase::Playing);
    }

    #[test]
    fn reset_cancels_pending_advance() {
        let (mut app, _rx) = app(Some(TestKind::Ospan));
        app.dispatch(Event::Start);
        for _ in 0..3 {
            let truthful = app.session.current_probe().unwrap().is_displayed_true();
            app.dispatch(Event::Judge {
                says_true: truthful,
            });
        }
        type_answer(&mut app);
        assert_eq!(app.timers.len(), 1);

        app.dispatch(Event::Reset);
        assert!(app.timers.is_empty());
        app.on_tick(Instant::now() + Duration::from_secs(10));
        assert_eq!(app.session.phase, Phase::Ready);
        assert_eq!(app.session.level, 3);
    }

    #[test]
    fn failure_records_best_level_to_store() {
        let (mut app, _rx) = app(Some(TestKind::Ospan));
        app.session.score = 4;
        app.dispatch(Event::Start);
        for _ in 0..3 {
            app.dispatch(Event::Judge { says_true: true });
            // judgements are irrelevant: the answer below is wrong anyway
        }
        for _ in 0..3 {
            app.dispatch(Event::Append('A'));
        }
        app.dispatch(Event::Submit);
        assert_eq!(app.session.phase, Phase::Incorrect);
        let board = app.leaderboard(ListKey::Normal);
        assert_eq!(board.len(), 1);
        assert_eq!(board.best().unwrap().level, 4);
        assert_eq!(app.games_played, 1);

        app.on_tick(Instant::now() + Duration::from_secs(4));
        assert_eq!(app.session.phase, Phase::Finished);
        app.on_key(key(KeyCode::Char('l')));
        assert_eq!(app.panel, Panel::Leaderboard);
    }

    #[test]
    fn leaderboards_are_loaded_from_store() {
        let mut store = MemoryScoreStore::default();
        store
            .save(ListKey::Reverse, &[ScoreEntry::new(7, 800)])
            .unwrap();
        let (tx, _rx) = mpsc::channel();
        let app = App::new(
            None,
            Settings::default(),
            Box::new(store),
            Arc::new(SilentSpeaker),
            tx,
        );
        assert_eq!(app.leaderboard(ListKey::Reverse).len(), 1);
        assert!(app.leaderboard(ListKey::Normal).is_empty());
    }

    #[test]
    fn back_during_advance_delay_returns_to_menu() {
        let (mut app, _rx) = app(Some(TestKind::Ospan));
        app.dispatch(Event::Start);
        for _ in 0..3 {
            let truthful = app.session.current_probe().unwrap().is_displayed_true();
            app.dispatch(Event::Judge {
                says_true: truthful,
            });
        }
        type_answer(&mut app);
        assert_eq!(app.session.phase, Phase::Correct);

        app.on_key(key(KeyCode::Char('b')));
        assert_eq!(app.state, AppState::Menu);
        assert!(app.timers.is_empty());

        app.on_tick(Instant::now() + ADVANCE_DELAY + Duration::from_secs(1));
        assert_eq!(app.state, AppState::Menu);
        assert_eq!(app.session.phase, Phase::Ready);
        assert_eq!(app.session.level, 3);
    }

    #[test]
    fn back_during_finish_delay_returns_to_menu() {
        let (mut app, _rx) = app(Some(TestKind::Ospan));
        app.dispatch(Event::Start);
        for _ in 0..3 {
            app.dispatch(Event::Judge { says_true: true });
        }
        for _ in 0..3 {
            app.dispatch(Event::Append('A'));
        }
        app.dispatch(Event::Submit);
        assert_eq!(app.session.phase, Phase::Incorrect);

        app.on_key(key(KeyCode::Char('b')));
        app.on_tick(Instant::now() + FINISH_DELAY + Duration::from_secs(1));
        assert_eq!(app.state, AppState::Menu);
        assert_eq!(app.session.phase, Phase::Ready);
    }

    #[test]
    fn back_to_menu_only_between_games() {
        let (mut app, _rx) = app(Some(TestKind::Ospan));
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Char('b')));
        assert_eq!(app.state, AppState::Test);
        assert_eq!(app.session.phase, Phase::Playing);
    }
}
