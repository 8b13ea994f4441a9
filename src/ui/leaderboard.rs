use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};

use crate::{
    app::App,
    scoring::{ListKey, ScoreEntry, BASELINE_PAUSE_MS},
};

/// Pure presenter for one leaderboard row
pub fn present_row(rank: usize, entry: &ScoreEntry) -> Row<'static> {
    let rank_color = match rank {
        1 => Color::Yellow,
        2 => Color::White,
        3 => Color::LightRed,
        _ => Color::Gray,
    };
    // faster than baseline earns a bonus
    let pause_color = if entry.pause_ms < BASELINE_PAUSE_MS {
        Color::Green
    } else if entry.pause_ms == BASELINE_PAUSE_MS {
        Color::Reset
    } else {
        Color::Red
    };

    Row::new(vec![
        Cell::from(format!("{rank}")).style(Style::default().fg(rank_color)),
        Cell::from(format!("{:.2}", entry.score))
            .style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format!("{}", entry.level)),
        Cell::from(format!("{}ms", entry.pause_ms)).style(Style::default().fg(pause_color)),
        Cell::from(entry.timestamp.format("%Y-%m-%d %H:%M").to_string()),
    ])
}

fn title(list: ListKey) -> &'static str {
    match list {
        ListKey::Normal => "Normal Mode",
        ListKey::Reverse => "Reverse Mode",
    }
}

fn render_list(app: &App, list: ListKey, area: Rect, buf: &mut Buffer) {
    let board = app.leaderboard(list);
    let block = Block::default().borders(Borders::ALL).title(title(list));

    if board.is_empty() {
        Paragraph::new("No scores yet")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray))
            .block(block)
            .render(area, buf);
        return;
    }

    let header = Row::new(vec!["#", "Score", "Level", "Pause", "Date"]).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );
    let rows: Vec<Row> = board
        .entries()
        .iter()
        .enumerate()
        .map(|(i, e)| present_row(i + 1, e))
        .collect();
    let widths = [
        Constraint::Length(3),
        Constraint::Length(7),
        Constraint::Length(6),
        Constraint::Length(8),
        Constraint::Min(16),
    ];

    Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1)
        .render(area, buf);
}

/// Side-by-side normal and reverse leaderboards
pub fn render_leaderboards(app: &App, area: Rect, buf: &mut Buffer) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_list(app, ListKey::Normal, columns[0], buf);
    render_list(app, ListKey::Reverse, columns[1], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::SpanEvent;
    use crate::scores::{MemoryScoreStore, ScoreStore};
    use crate::session::Settings;
    use crate::speech::SilentSpeaker;
    use std::sync::{mpsc, Arc};

    fn app_with_scores() -> App {
        let mut store = MemoryScoreStore::default();
        store
            .save(
                ListKey::Normal,
                &[ScoreEntry::new(7, 600), ScoreEntry::new(5, 1300)],
            )
            .unwrap();
        let (tx, _rx) = mpsc::channel::<SpanEvent>();
        App::new(
            None,
            Settings::default(),
            Box::new(store),
            Arc::new(SilentSpeaker),
            tx,
        )
    }

    #[test]
    fn renders_entries_and_empty_list() {
        let app = app_with_scores();
        let area = Rect::new(0, 0, 120, 12);
        let mut buf = Buffer::empty(area);
        render_leaderboards(&app, area, &mut buf);
        let out: String = buf.content().iter().map(|c| c.symbol()).collect();

        assert!(out.contains("Normal Mode"));
        assert!(out.contains("Reverse Mode"));
        assert!(out.contains("7.42"));
        assert!(out.contains("4.25"));
        assert!(out.contains("1300ms"));
        assert!(out.contains("No scores yet"));
    }

    #[test]
    fn present_row_does_not_panic_for_any_rank() {
        let entry = ScoreEntry::new(3, 2000);
        for rank in 1..=15 {
            let _ = present_row(rank, &entry);
        }
    }
}
