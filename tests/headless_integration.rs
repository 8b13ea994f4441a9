use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::{rngs::StdRng, SeedableRng};

use memspan::app::App;
use memspan::runtime::{FixedTicker, Runner, SpanEvent, TestEventSource};
use memspan::scores::MemoryScoreStore;
use memspan::session::{Phase, Settings, TestKind, ADVANCE_DELAY, FINISH_DELAY};
use memspan::speech::SilentSpeaker;

// Headless integration using the internal runtime + App without a TTY.
// Keystrokes go through the same channel the presenter reports on.

fn key(code: KeyCode) -> SpanEvent {
    SpanEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn headless_app(kind: TestKind, runner: &Runner<TestEventSource, FixedTicker>) -> App {
    App::new(
        Some(kind),
        Settings {
            pause_ms: 200,
            ..Settings::default()
        },
        Box::new(MemoryScoreStore::default()),
        Arc::new(SilentSpeaker),
        runner.sender(),
    )
    .with_rng(StdRng::seed_from_u64(7))
}

/// Drives the loop until `done` holds or the step budget runs out
fn drive(
    app: &mut App,
    runner: &Runner<TestEventSource, FixedTicker>,
    done: impl Fn(&App) -> bool,
) -> bool {
    for _ in 0..2000u32 {
        match runner.step() {
            SpanEvent::Tick => app.on_tick(Instant::now()),
            SpanEvent::Resize => {}
            SpanEvent::Key(key) => app.on_key(key),
            SpanEvent::Session(event) => app.dispatch(event),
        }
        if done(app) {
            return true;
        }
    }
    false
}

fn type_expected(app: &App, runner: &Runner<TestEventSource, FixedTicker>) {
    let tx = runner.sender();
    for c in app.session.expected_answer().chars() {
        tx.send(key(KeyCode::Char(c))).unwrap();
    }
    tx.send(key(KeyCode::Enter)).unwrap();
}

#[test]
fn headless_digit_flow_advances_a_level() {
    let runner = Runner::new(
        TestEventSource::new(),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let mut app = headless_app(TestKind::Digit, &runner);

    runner.sender().send(key(KeyCode::Enter)).unwrap();
    assert!(
        drive(&mut app, &runner, |a| a.session.phase == Phase::Input),
        "presentation should complete"
    );
    assert_eq!(app.session.presented, 3);

    type_expected(&app, &runner);
    assert!(drive(&mut app, &runner, |a| a.session.phase
        == Phase::Correct));
    assert_eq!(app.session.score, 3);

    app.on_tick(Instant::now() + ADVANCE_DELAY);
    assert_eq!(app.session.level, 4);
    assert_eq!(app.session.phase, Phase::Playing);
}

#[test]
fn headless_reverse_digit_round() {
    let runner = Runner::new(
        TestEventSource::new(),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let mut app = headless_app(TestKind::Digit, &runner);
    let tx = runner.sender();
    tx.send(key(KeyCode::Char('s'))).unwrap();
    tx.send(key(KeyCode::Char('r'))).unwrap();
    tx.send(key(KeyCode::Char('s'))).unwrap();
    tx.send(key(KeyCode::Enter)).unwrap();

    assert!(drive(&mut app, &runner, |a| a.session.phase == Phase::Input));
    assert!(app.session.reverse_active());

    let forward: String = app.session.trial.symbols.iter().collect();
    let expected = app.session.expected_answer();
    assert_eq!(expected, forward.chars().rev().collect::<String>());

    type_expected(&app, &runner);
    assert!(drive(&mut app, &runner, |a| a.session.phase
        == Phase::Correct));
}

#[test]
fn headless_ospan_failure_records_nothing_at_first_level() {
    let runner = Runner::new(
        TestEventSource::new(),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let mut app = headless_app(TestKind::Ospan, &runner);
    let tx = runner.sender();
    tx.send(key(KeyCode::Char(' '))).unwrap();
    assert!(drive(&mut app, &runner, |a| a.session.phase == Phase::Playing));

    // answer every statement, then recall the wrong letters
    for _ in 0..3 {
        let truthful = app
            .session
            .current_probe()
            .map(|p| p.is_displayed_true())
            .unwrap_or(true);
        app.on_key(KeyEvent::new(
            if truthful {
                KeyCode::Left
            } else {
                KeyCode::Right
            },
            KeyModifiers::NONE,
        ));
    }
    assert_eq!(app.session.phase, Phase::Input);

    let wrong: String = app
        .session
        .expected_answer()
        .chars()
        .map(|c| if c == 'B' { 'C' } else { 'B' })
        .collect();
    for c in wrong.chars() {
        tx.send(key(KeyCode::Char(c.to_ascii_lowercase()))).unwrap();
    }
    tx.send(key(KeyCode::Enter)).unwrap();
    assert!(drive(&mut app, &runner, |a| a.session.phase
        == Phase::Incorrect));
    assert!(app.session.message.starts_with("Incorrect!"));
    assert_eq!(app.games_played, 1);
    assert!(app
        .leaderboard(memspan::scoring::ListKey::Normal)
        .is_empty());

    app.on_tick(Instant::now() + FINISH_DELAY);
    assert_eq!(app.session.phase, Phase::Finished);
    assert!(app.session.message.contains("Game Over! Your final score: 0 letters"));
}

#[test]
fn headless_ctrl_c_stops_loop() {
    let runner = Runner::new(
        TestEventSource::new(),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let mut app = headless_app(TestKind::Digit, &runner);
    runner
        .sender()
        .send(SpanEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )))
        .unwrap();
    assert!(drive(&mut app, &runner, |a| a.should_quit));
}
