pub mod leaderboard;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::{
    app::{App, AppState, Panel},
    session::{OspanStage, Phase, TestKind, MAX_PAUSE_MS, MIN_PAUSE_MS},
    trial::MAX_LEVEL,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Menu => render_menu(self, area, buf),
            AppState::Test => render_test(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn hint_style() -> Style {
    Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::ITALIC)
}

pub(crate) fn render_menu(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(vec![
        Line::from(Span::styled("Memory Tests", bold().fg(Color::Cyan))),
        Line::from(Span::styled("Select a test to begin", hint_style())),
    ])
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let digit = Paragraph::new(vec![
        Line::from("Remember and repeat sequences of digits"),
        Line::from(""),
        Line::from("• Tests short-term auditory memory"),
        Line::from(format!("• Progressive difficulty (3-{MAX_LEVEL} digits)")),
        Line::from("• Optional reverse mode"),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("(1) Digit Span Test"),
    );
    digit.render(cards[0], buf);

    let ospan = Paragraph::new(vec![
        Line::from("Judge math statements while remembering letters"),
        Line::from(""),
        Line::from("• Tests working memory capacity"),
        Line::from("• Dual-task paradigm"),
        Line::from("• Requires 85%+ math accuracy"),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("(2) Operation Span Test"),
    );
    ospan.render(cards[1], buf);

    let legend = format!(
        "(1) digit span / (2) operation span / (esc)ape   games played: {}",
        app.games_played
    );
    Paragraph::new(Span::styled(legend, hint_style()))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
}

pub(crate) fn render_test(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // info
            Constraint::Length(1), // padding
            Constraint::Length(3), // message
            Constraint::Min(3),    // body
            Constraint::Length(1), // legend
        ])
        .split(area);

    let title = match session.kind {
        TestKind::Digit => "Digit Memory Span Test",
        TestKind::Ospan => "Operation Span Test",
    };
    Paragraph::new(Span::styled(title, bold().fg(Color::Cyan)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let mut info = format!(
        "Level: {}/{}   Best Score: {}   Pause: {}ms",
        session.level, MAX_LEVEL, session.score, session.settings.pause_ms
    );
    if session.kind == TestKind::Digit {
        info.push_str(&format!("   Voice: {}", session.settings.voice.label()));
        if session.settings.reverse {
            info.push_str("   REVERSE");
        }
    }
    Paragraph::new(Span::styled(info, Style::default().fg(Color::Gray)))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let message_style = match session.phase {
        Phase::Correct => bold().fg(Color::Green),
        Phase::Incorrect => bold().fg(Color::Red),
        Phase::Finished => bold().fg(Color::Yellow),
        _ => bold(),
    };
    Paragraph::new(
        session
            .message
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), message_style)))
            .collect::<Vec<_>>(),
    )
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .render(chunks[3], buf);

    match app.panel {
        Panel::Settings => render_settings(app, chunks[4], buf),
        Panel::Leaderboard => leaderboard::render_leaderboards(app, chunks[4], buf),
        Panel::None => render_body(app, chunks[4], buf),
    }

    Paragraph::new(Span::styled(legend(app), hint_style()))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);
}

fn render_body(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let level = session.level as usize;

    let lines: Vec<Line> = match session.phase {
        Phase::Ready => vec![Line::from(Span::styled(
            format!("Press Enter to start level {}", session.level),
            bold(),
        ))],
        Phase::Playing => match session.kind {
            TestKind::Digit => {
                let dots: String = (0..session.trial.len())
                    .map(|i| if i < session.presented { "● " } else { "○ " })
                    .collect();
                vec![
                    Line::from(Span::styled("Speaking digits...", bold())),
                    Line::from(""),
                    Line::from(Span::styled(dots, Style::default().fg(Color::Magenta))),
                ]
            }
            TestKind::Ospan => ospan_probe_lines(app),
        },
        Phase::Input | Phase::Correct => {
            let style = if session.phase == Phase::Correct {
                bold().fg(Color::Green)
            } else {
                bold()
            };
            vec![symbol_boxes(&session.input, level, style)]
        }
        Phase::Incorrect | Phase::Finished => {
            let mut lines = Vec::new();
            // a full run to the last level has nothing to compare
            let failed = session.score < session.level;
            if failed && !session.trial.is_empty() && !session.input.is_empty() {
                let label = match session.kind {
                    TestKind::Digit => "Correct answer:",
                    TestKind::Ospan => "Correct letters:",
                };
                lines.push(Line::from(Span::styled(label, hint_style())));
                lines.push(symbol_boxes(
                    &session.expected_answer(),
                    level,
                    bold().fg(Color::Green),
                ));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled("Your answer:", hint_style())));
                lines.push(symbol_boxes(&session.input, level, bold().fg(Color::Red)));
            }
            lines
        }
    };

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn ospan_probe_lines(app: &App) -> Vec<Line<'static>> {
    let session = &app.session;
    match (session.current_probe(), session.current_letter()) {
        (Some(probe), Some(letter)) if session.stage == OspanStage::Math => vec![
            Line::from(Span::styled(
                format!(
                    "Problem {} of {}",
                    session.probe_index + 1,
                    session.trial.probes.len()
                ),
                hint_style(),
            )),
            Line::from(""),
            Line::from(Span::styled(probe.statement(), bold())),
            Line::from(""),
            Line::from(Span::styled("Remember this letter:", hint_style())),
            Line::from(Span::styled(
                format!("[ {letter} ]"),
                bold().fg(Color::Yellow),
            )),
        ],
        _ => Vec::new(),
    }
}

/// `[4] [7] [_]` style rendering of a partially filled answer
fn symbol_boxes(text: &str, slots: usize, style: Style) -> Line<'static> {
    let mut spans: Vec<Span> = text
        .chars()
        .map(|c| Span::styled(format!("[{c}] "), style))
        .collect();
    let filled = text.chars().count();
    for _ in filled..slots {
        spans.push(Span::styled(
            "[_] ",
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    Line::from(spans)
}

fn render_settings(app: &App, area: Rect, buf: &mut Buffer) {
    let settings = &app.session.settings;
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Pause between digits: ", bold()),
            Span::raw(format!(
                "{}ms  (←/→, {MIN_PAUSE_MS}-{MAX_PAUSE_MS})",
                settings.pause_ms
            )),
        ]),
        Line::from(vec![
            Span::styled("Voice: ", bold()),
            Span::raw(format!("{}  (v)", settings.voice.label())),
        ]),
    ];
    if app.session.kind == TestKind::Digit {
        lines.push(Line::from(vec![
            Span::styled("Reverse mode: ", bold()),
            Span::raw(format!(
                "{}  (r)",
                if settings.reverse { "ON" } else { "OFF" }
            )),
        ]));
    }

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Settings"))
        .render(area, buf);
}

fn legend(app: &App) -> String {
    let session = &app.session;
    match app.panel {
        Panel::Settings => return "(←/→) pause / (v)oice / (r)everse / (s) close".to_string(),
        Panel::Leaderboard => return "(l) close".to_string(),
        Panel::None => {}
    }
    match session.phase {
        Phase::Ready => "(enter) start / (s)ettings / (l)eaderboard / (b)ack / (esc)ape",
        Phase::Playing if session.kind == TestKind::Ospan => {
            "(y/←) statement is correct / (n/→) statement is incorrect"
        }
        Phase::Playing => "listen...",
        Phase::Input => match session.kind {
            TestKind::Digit => "(0-9) type / (backspace) delete / (enter) submit",
            TestKind::Ospan => "(a-z) type / (backspace) delete / (enter) submit",
        },
        Phase::Correct | Phase::Incorrect => "(b)ack to menu",
        Phase::Finished => "(enter) play again / (l)eaderboard / (b)ack / (esc)ape",
    }
    .to_string()
}
