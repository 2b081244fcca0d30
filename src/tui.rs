use std::io;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, BarChart, Block, Borders, Chart, Dataset, GraphType, Paragraph, Row, Table, Wrap,
};
use ratatui::{Frame, Terminal};

use crate::domain::GeoPoint;
use crate::present::Presentation;
use crate::series::SeriesPoint;

const PAGE: usize = 10;

pub struct Tui<'a> {
    presentation: &'a Presentation,
    offset: usize,
}

impl<'a> Tui<'a> {
    pub fn new(presentation: &'a Presentation) -> Self {
        Self {
            presentation,
            offset: 0,
        }
    }

    pub fn run(&mut self) -> miette::Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> miette::Result<()> {
        loop {
            terminal
                .draw(|frame| draw_ui(frame, self))
                .into_diagnostic()?;

            if event::poll(Duration::from_millis(200)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if self.handle_key(key) {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        let last = self.presentation.series.len().saturating_sub(1);
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Down | KeyCode::Char('j') => self.offset = (self.offset + 1).min(last),
            KeyCode::Up | KeyCode::Char('k') => self.offset = self.offset.saturating_sub(1),
            KeyCode::PageDown => self.offset = (self.offset + PAGE).min(last),
            KeyCode::PageUp => self.offset = self.offset.saturating_sub(PAGE),
            KeyCode::Home => self.offset = 0,
            _ => {}
        }
        false
    }
}

fn draw_ui(frame: &mut Frame, tui: &Tui<'_>) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(1)])
        .split(frame.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(22),
            Constraint::Percentage(33),
            Constraint::Percentage(45),
        ])
        .split(outer[0]);

    draw_location(frame, columns[0], tui.presentation);
    draw_totals(frame, columns[1], tui);
    draw_charts(frame, columns[2], tui.presentation);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled("q", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" quit  "),
        Span::styled("↑/↓ PgUp/PgDn", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" scroll timelapse"),
    ]))
    .alignment(Alignment::Center);
    frame.render_widget(footer, outer[1]);
}

fn draw_location(frame: &mut Frame, area: Rect, presentation: &Presentation) {
    let geo = &presentation.geo;
    let mut lines = vec![
        Line::from(Span::styled(
            presentation.snapshot.name.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("lat  {:>10.4}", geo.latitude)),
        Line::from(format!("long {:>10.4}", geo.longitude)),
    ];
    if presentation.geo_fallback {
        lines.push(Line::from(Span::styled(
            fallback_note(geo),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if let Some(flag) = &geo.flag {
        lines.push(Line::from(""));
        lines.push(Line::from(format!("flag {flag}")));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "from {} to {} ({} days)",
        presentation.range.start, presentation.range.end, presentation.range.day_count
    )));
    if let Some(updated) = presentation.snapshot.updated {
        lines.push(Line::from(format!(
            "updated {}",
            updated.format("%Y-%m-%d %H:%M UTC")
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(presentation.scope.label().to_string());
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_totals(frame: &mut Frame, area: Rect, tui: &Tui<'_>) {
    let presentation = tui.presentation;
    let rows = presentation.snapshot.rows();
    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(rows.len() as u16 + 2),
            Constraint::Min(5),
        ])
        .split(area);

    let lines = rows
        .iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::raw(format!("{label:<16}")),
                Span::styled(
                    format_count(*value),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ])
        })
        .collect::<Vec<_>>();
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Statistics totals"),
        ),
        split[0],
    );

    let with_recovered = presentation.series.has_recovered();
    let mut header = vec!["date", "cases", "deaths"];
    if with_recovered {
        header.push("recovered");
    }
    let body = timelapse_rows(presentation.series.points(), tui.offset)
        .into_iter()
        .map(|point| {
            let mut cells = vec![
                point.date.to_string(),
                format_count(Some(point.cases)),
                format_count(Some(point.deaths)),
            ];
            if with_recovered {
                cells.push(format_count(point.recovered));
            }
            Row::new(cells)
        })
        .collect::<Vec<_>>();
    let table = Table::new(
        body,
        [
            Constraint::Length(11),
            Constraint::Length(13),
            Constraint::Length(11),
            Constraint::Length(13),
        ],
    )
    .header(Row::new(header).style(Style::default().add_modifier(Modifier::BOLD)))
    .block(Block::default().borders(Borders::ALL).title("Timelapse"));
    frame.render_widget(table, split[1]);
}

fn draw_charts(frame: &mut Frame, area: Rect, presentation: &Presentation) {
    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let chart = &presentation.chart;

    let points = line_points(&chart.cases);
    let max_cases = chart.cases.iter().copied().max().unwrap_or(0);
    let x_labels = match (chart.dates.first(), chart.dates.last()) {
        (Some(first), Some(last)) => vec![first.to_string(), last.to_string()],
        _ => Vec::new(),
    };
    let dataset = Dataset::default()
        .name("cases")
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);
    let cases_chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Cases over time"),
        )
        .x_axis(
            Axis::default()
                .bounds([0.0, points.len().saturating_sub(1).max(1) as f64])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, max_cases.max(1) as f64])
                .labels(vec!["0".to_string(), format_count(Some(max_cases))]),
        );
    frame.render_widget(cases_chart, split[0]);

    let width = split[1].width.saturating_sub(2) as usize;
    let buckets = downsample_last(&chart.deaths, width.max(1));
    let bars = buckets.iter().map(|value| ("", *value)).collect::<Vec<_>>();
    let deaths_chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Deaths over time"),
        )
        .bar_width(1)
        .bar_gap(0)
        .bar_style(Style::default().fg(Color::Red))
        .data(&bars[..]);
    frame.render_widget(deaths_chart, split[1]);
}

fn fallback_note(geo: &GeoPoint) -> String {
    format!(
        "(location unknown, showing fallback center {:.2}, {:.2})",
        geo.latitude, geo.longitude
    )
}

fn timelapse_rows(points: &[SeriesPoint], offset: usize) -> Vec<&SeriesPoint> {
    points.iter().rev().skip(offset).collect()
}

fn line_points(values: &[u64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| (index as f64, *value as f64))
        .collect()
}

fn downsample_last(values: &[u64], buckets: usize) -> Vec<u64> {
    if buckets == 0 || values.len() <= buckets {
        return values.to_vec();
    }
    let size = values.len().div_ceil(buckets);
    values
        .chunks(size)
        .filter_map(|chunk| chunk.last().copied())
        .collect()
}

fn format_count(value: Option<u64>) -> String {
    let Some(value) = value else {
        return "n/a".to_string();
    };
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_count_groups_thousands() {
        assert_eq!(format_count(Some(0)), "0");
        assert_eq!(format_count(Some(999)), "999");
        assert_eq!(format_count(Some(1_234_567)), "1,234,567");
        assert_eq!(format_count(None), "n/a");
    }

    #[test]
    fn downsample_keeps_bucket_tails() {
        let values = (1..=10).collect::<Vec<u64>>();
        assert_eq!(downsample_last(&values, 4), vec![3, 6, 9, 10]);
        assert_eq!(downsample_last(&values, 20), values);
    }

    #[test]
    fn line_points_index_x_axis() {
        assert_eq!(line_points(&[4, 7]), vec![(0.0, 4.0), (1.0, 7.0)]);
    }

    #[test]
    fn fallback_note_names_configured_center() {
        let note = fallback_note(&GeoPoint::new(48.85, 2.35));
        assert_eq!(note, "(location unknown, showing fallback center 48.85, 2.35)");
    }
}
