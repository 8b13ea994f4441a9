//! Memory span session state machine.
//!
//! A [`Session`] is an owned record; [`Session::handle`] consumes an [`Event`]
//! and returns the next record plus the side effects the caller must perform
//! (speak a trial, schedule a delayed event, persist a score). Nothing in here
//! touches the terminal, the speech command or the database.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::presenter::Presentation;
use crate::scoring::{weighted_score, ListKey, ScoreEntry, BASELINE_PAUSE_MS};
use crate::speech::Voice;
use crate::trial::{Trial, MAX_LEVEL};

pub const START_LEVEL: u8 = 3;
/// Minimum share of math probes that must be judged correctly in an OSPAN round
pub const ACCURACY_GATE: f64 = 0.85;
pub const ADVANCE_DELAY: Duration = Duration::from_secs(2);
pub const FINISH_DELAY: Duration = Duration::from_secs(3);

pub const MIN_PAUSE_MS: u64 = 200;
pub const MAX_PAUSE_MS: u64 = 2000;
pub const PAUSE_STEP_MS: u64 = 100;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    #[strum(serialize = "digit span")]
    Digit,
    #[strum(serialize = "operation span")]
    Ospan,
}

impl TestKind {
    fn symbol_noun(&self) -> &'static str {
        match self {
            TestKind::Digit => "digit",
            TestKind::Ospan => "letter",
        }
    }

    /// Normalises a typed character, rejecting symbols that can't be part of an answer
    fn accept(&self, c: char) -> Option<char> {
        match self {
            TestKind::Digit if c.is_ascii_digit() => Some(c),
            TestKind::Ospan if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Ready,
    Playing,
    Input,
    Correct,
    Incorrect,
    Finished,
}

/// OSPAN rounds alternate math judgement and letter recall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OspanStage {
    Math,
    Recall,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub pause_ms: u64,
    pub reverse: bool,
    pub voice: Voice,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pause_ms: BASELINE_PAUSE_MS,
            reverse: false,
            voice: Voice::Default,
        }
    }
}

pub fn clamp_pause(pause_ms: u64) -> u64 {
    let clamped = pause_ms.clamp(MIN_PAUSE_MS, MAX_PAUSE_MS);
    (clamped + PAUSE_STEP_MS / 2) / PAUSE_STEP_MS * PAUSE_STEP_MS
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    /// one symbol of the running presentation was spoken
    SymbolPresented { generation: u64 },
    PresentationComplete { generation: u64 },
    PresentationFailed { generation: u64, reason: String },
    /// OSPAN verdict on the displayed statement
    Judge { says_true: bool },
    Append(char),
    Delete,
    Submit,
    Advance { generation: u64 },
    Finish { generation: u64 },
    Reset,
    SetPause(u64),
    SetReverse(bool),
    SetVoice(Voice),
}

impl Event {
    /// Round identity carried by asynchronous events
    pub fn generation(&self) -> Option<u64> {
        match self {
            Event::SymbolPresented { generation }
            | Event::PresentationComplete { generation }
            | Event::PresentationFailed { generation, .. }
            | Event::Advance { generation }
            | Event::Finish { generation } => Some(*generation),
            _ => None,
        }
    }
}

/// A finished game, for the history log
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    pub kind: TestKind,
    pub list: ListKey,
    pub completed: bool,
    pub best_level: u8,
    pub pause_ms: u64,
    pub weighted_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Present(Presentation),
    Schedule { delay: Duration, event: Event },
    Record { list: ListKey, entry: ScoreEntry },
    GameOver(GameSummary),
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub session: Session,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub kind: TestKind,
    pub level: u8,
    /// highest level completed in this game
    pub score: u8,
    pub phase: Phase,
    pub stage: OspanStage,
    pub trial: Trial,
    pub probe_index: usize,
    /// symbols spoken so far in the running digit presentation
    pub presented: usize,
    pub input: String,
    pub message: String,
    pub settings: Settings,
    /// bumped on every new round and on reset; stale async events are dropped
    pub generation: u64,
}

impl Session {
    pub fn new(kind: TestKind, settings: Settings) -> Self {
        Self {
            kind,
            level: START_LEVEL,
            score: 0,
            phase: Phase::Ready,
            stage: OspanStage::Math,
            trial: Trial::default(),
            probe_index: 0,
            presented: 0,
            input: String::new(),
            message: String::new(),
            settings: Settings {
                pause_ms: clamp_pause(settings.pause_ms),
                ..settings
            },
            generation: 0,
        }
    }

    /// Reverse order only applies to the digit test
    pub fn reverse_active(&self) -> bool {
        self.kind == TestKind::Digit && self.settings.reverse
    }

    pub fn list_key(&self) -> ListKey {
        ListKey::for_mode(self.reverse_active())
    }

    pub fn expected_answer(&self) -> String {
        self.trial.expected_answer(self.reverse_active())
    }

    /// Settings may only be changed between games
    pub fn can_configure(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn can_view_leaderboard(&self) -> bool {
        matches!(self.phase, Phase::Ready | Phase::Finished)
    }

    pub fn current_probe(&self) -> Option<&crate::trial::MathProbe> {
        if self.kind == TestKind::Ospan
            && self.phase == Phase::Playing
            && self.stage == OspanStage::Math
        {
            self.trial.probes.get(self.probe_index)
        } else {
            None
        }
    }

    pub fn current_letter(&self) -> Option<char> {
        self.current_probe()
            .and(self.trial.symbols.get(self.probe_index).copied())
    }

    pub fn input_full(&self) -> bool {
        self.input.chars().count() >= self.level as usize
    }

    /// Computes the next session record for `event`.
    pub fn handle<R: Rng + ?Sized>(&self, event: Event, rng: &mut R) -> Transition {
        let mut next = self.clone();
        let mut effects = Vec::new();

        if let Some(generation) = event.generation() {
            if generation != self.generation {
                debug!(
                    ?event,
                    current = self.generation,
                    "dropping event from a stale round"
                );
                return Transition {
                    session: next,
                    effects,
                };
            }
        }

        match (self.phase, event) {
            (Phase::Ready, Event::Start) => next.begin_round(rng, &mut effects),
            (Phase::Playing, Event::SymbolPresented { .. }) if self.kind == TestKind::Digit => {
                next.presented = (next.presented + 1).min(next.trial.len());
            }
            (Phase::Playing, Event::PresentationComplete { .. })
                if self.kind == TestKind::Digit =>
            {
                next.phase = Phase::Input;
                next.presented = next.trial.len();
                let mode = if next.settings.reverse {
                    " in REVERSE order"
                } else {
                    ""
                };
                next.message = format!(
                    "Enter the {} digit{}{}:",
                    next.level,
                    if next.level > 1 { "s" } else { "" },
                    mode
                );
            }
            (Phase::Playing, Event::PresentationFailed { reason, .. }) => {
                info!(%reason, level = next.level, "presentation failed, round abandoned");
                next.phase = Phase::Ready;
                next.trial = Trial::default();
                next.presented = 0;
                next.input.clear();
                next.message = format!(
                    "Error: could not speak digits ({reason}). Check the speech command."
                );
            }
            (Phase::Playing, Event::Judge { says_true })
                if self.kind == TestKind::Ospan && self.stage == OspanStage::Math =>
            {
                let index = next.probe_index;
                if let Some(probe) = next.trial.probes.get_mut(index) {
                    probe.judge(says_true);
                }
                if index + 1 < next.trial.probes.len() {
                    next.probe_index += 1;
                } else {
                    next.stage = OspanStage::Recall;
                    next.phase = Phase::Input;
                    next.input.clear();
                    next.message = format!("Enter the {} letters in order:", next.level);
                }
            }
            (Phase::Input, Event::Append(c)) => {
                if let Some(symbol) = self.kind.accept(c) {
                    if !next.input_full() {
                        next.input.push(symbol);
                    }
                }
            }
            (Phase::Input, Event::Delete) => {
                next.input.pop();
            }
            (Phase::Input, Event::Submit) if self.input_full() => {
                next.check_answer(&mut effects);
            }
            (Phase::Correct, Event::Advance { .. }) if self.level < MAX_LEVEL => {
                next.level += 1;
                next.begin_round(rng, &mut effects);
            }
            (Phase::Incorrect, Event::Finish { .. }) => {
                next.phase = Phase::Finished;
                let weighted = if next.score > 0 {
                    weighted_score(next.score, next.settings.pause_ms)
                } else {
                    0.0
                };
                next.message = format!(
                    "Game Over! Your final score: {} {}s\nWeighted Score: {}",
                    next.score,
                    next.kind.symbol_noun(),
                    weighted
                );
            }
            (_, Event::Reset) => {
                let generation = next.generation + 1;
                next = Session::new(next.kind, next.settings);
                next.generation = generation;
            }
            (Phase::Ready, Event::SetPause(ms)) => next.settings.pause_ms = clamp_pause(ms),
            (Phase::Ready, Event::SetReverse(on)) => next.settings.reverse = on,
            (Phase::Ready, Event::SetVoice(voice)) => next.settings.voice = voice,
            (phase, event) => {
                debug!(?phase, ?event, "event ignored in current phase");
            }
        }

        Transition {
            session: next,
            effects,
        }
    }

    fn begin_round<R: Rng + ?Sized>(&mut self, rng: &mut R, effects: &mut Vec<Effect>) {
        self.generation += 1;
        self.input.clear();
        self.probe_index = 0;
        self.presented = 0;
        self.stage = OspanStage::Math;
        self.phase = Phase::Playing;

        match self.kind {
            TestKind::Digit => {
                self.trial = Trial::digits(self.level, rng);
                self.message = if self.settings.reverse {
                    "Listen carefully... (reverse mode)".to_string()
                } else {
                    "Listen carefully...".to_string()
                };
                effects.push(Effect::Present(Presentation {
                    generation: self.generation,
                    symbols: self.trial.symbols.clone(),
                    voice: self.settings.voice,
                    pause: Duration::from_millis(self.settings.pause_ms),
                }));
            }
            TestKind::Ospan => {
                self.trial = Trial::ospan(self.level, rng);
                self.message = "Judge each statement and remember the letter".to_string();
            }
        }
        info!(kind = %self.kind, level = self.level, generation = self.generation, "round started");
    }

    fn check_answer(&mut self, effects: &mut Vec<Effect>) {
        if self.kind == TestKind::Ospan {
            let accuracy = self.trial.math_accuracy().unwrap_or(0.0);
            if accuracy < ACCURACY_GATE {
                self.fail(
                    format!(
                        "Math accuracy too low: {}%. Need 85% or better.",
                        (accuracy * 100.0).round()
                    ),
                    effects,
                );
                return;
            }
        }

        let expected = self.expected_answer();
        if self.input == expected {
            self.succeed(effects);
        } else {
            self.fail(
                format!("Incorrect! The correct answer was: {expected}"),
                effects,
            );
        }
    }

    fn succeed(&mut self, effects: &mut Vec<Effect>) {
        self.score = self.level;
        info!(level = self.level, "round passed");

        if self.level >= MAX_LEVEL {
            let entry = ScoreEntry::new(self.level, self.settings.pause_ms);
            self.phase = Phase::Finished;
            self.message = format!(
                "Amazing! You completed all {MAX_LEVEL} levels!\nWeighted Score: {}",
                entry.score
            );
            effects.push(Effect::GameOver(self.summary(true)));
            effects.push(Effect::Record {
                list: self.list_key(),
                entry,
            });
        } else {
            self.phase = Phase::Correct;
            self.message = "Correct!".to_string();
            effects.push(Effect::Schedule {
                delay: ADVANCE_DELAY,
                event: Event::Advance {
                    generation: self.generation,
                },
            });
        }
    }

    /// The failing level is never scored; the best completed level is.
    fn fail(&mut self, message: String, effects: &mut Vec<Effect>) {
        info!(level = self.level, best = self.score, "round failed");
        self.phase = Phase::Incorrect;
        self.message = message;

        effects.push(Effect::GameOver(self.summary(false)));
        if self.score > 0 {
            effects.push(Effect::Record {
                list: self.list_key(),
                entry: ScoreEntry::new(self.score, self.settings.pause_ms),
            });
        }
        effects.push(Effect::Schedule {
            delay: FINISH_DELAY,
            event: Event::Finish {
                generation: self.generation,
            },
        });
    }

    fn summary(&self, completed: bool) -> GameSummary {
        GameSummary {
            kind: self.kind,
            list: self.list_key(),
            completed,
            best_level: self.score,
            pause_ms: self.settings.pause_ms,
            weighted_score: if self.score > 0 {
                weighted_score(self.score, self.settings.pause_ms)
            } else {
                0.0
            },
        }
    }
}
