//! TUI layout and widget rendering.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

use super::runtime::App;
use super::style;
use crate::measure::{RowName, Shift, format_percent};

/// Renders the full TUI frame.
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(4), // summary
            Constraint::Min(8),    // substations
            Constraint::Length(8), // rows of the selected substation
            Constraint::Length(1), // footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_summary(frame, app, chunks[1]);
    render_substations(frame, app, chunks[2]);
    render_detail(frame, app, chunks[3]);
    render_footer(frame, chunks[4]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let filter = app.status_filter.map_or("all", |s| s.as_str());
    let header = Line::from(vec![
        Span::styled(
            " GARDU ",
            Style::default()
                .fg(style::HEADER_FG)
                .bg(style::HEADER_BG)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            app.month().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" │ shift={} │ status={} ", app.shift, filter)),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let r = &app.report;
    let lines = vec![
        Line::from(format!(
            "  substations={} active={} ugb={} measured rows={}",
            r.total_substations, r.active_substations, r.ugb_substations, r.measured_rows
        )),
        Line::from(vec![
            Span::raw("  avg load="),
            Span::styled(
                format_percent(r.average_load_percent),
                Style::default().fg(style::load_color(r.average_load_percent, &app.thresholds)),
            ),
            Span::raw("  peak="),
            Span::styled(
                format_percent(r.peak_load_percent),
                Style::default().fg(style::load_color(r.peak_load_percent, &app.thresholds)),
            ),
            Span::raw(format!(
                "  overloaded={} unbalanced={}",
                r.overloaded.len(),
                r.unbalanced.len()
            )),
        ]),
    ];
    let block = Block::default().title(" Summary ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn load_cell(app: &App, value: Option<f64>) -> Cell<'static> {
    match value {
        Some(v) => Cell::from(format_percent(v))
            .style(Style::default().fg(style::load_color(v, &app.thresholds))),
        None => Cell::from("-"),
    }
}

fn render_substations(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(["NO GARDU", "ULP", "LOKASI", "STATUS", "SIANG", "MALAM", "UNBAL"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = app
        .visible()
        .into_iter()
        .map(|s| {
            let imbalance = app.worst_imbalance(s.id);
            Row::new(vec![
                Cell::from(s.fields.no_gardu.clone()),
                Cell::from(s.fields.ulp.clone()),
                Cell::from(s.fields.nama_lokasi.clone()),
                Cell::from(s.fields.status.as_str())
                    .style(Style::default().fg(style::status_color(s.fields.status))),
                load_cell(app, app.induk_load(s.id, Shift::Siang)),
                load_cell(app, app.induk_load(s.id, Shift::Malam)),
                Cell::from(format_percent(imbalance))
                    .style(Style::default().fg(style::imbalance_color(imbalance, &app.thresholds))),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Min(16),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(8),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(" Substations ").borders(Borders::ALL))
        .row_highlight_style(Style::default().bg(style::SELECTED_BG));
    let mut state = TableState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let (title, rows) = match (app.selected_substation(), app.selected_rows()) {
        (Some(s), Some(measurements)) => {
            let rows: Vec<Row> = RowName::ALL
                .iter()
                .zip(measurements.iter())
                .map(|(name, m)| {
                    Row::new(vec![
                        Cell::from(name.label()),
                        Cell::from(format!("{:.0}", m.raw.r)),
                        Cell::from(format!("{:.0}", m.raw.s)),
                        Cell::from(format!("{:.0}", m.raw.t)),
                        Cell::from(format!("{:.0}", m.raw.n)),
                        Cell::from(format!("{:.0}", m.raw.pp)),
                        Cell::from(format!("{:.2}", m.derived.apparent_power_kva)),
                        load_cell(app, Some(m.derived.load_percent)),
                        Cell::from(format_percent(m.derived.imbalance_percent)).style(
                            Style::default().fg(style::imbalance_color(
                                m.derived.imbalance_percent,
                                &app.thresholds,
                            )),
                        ),
                    ])
                })
                .collect();
            (
                format!(" {} {} ({} kVA) ", s.fields.no_gardu, app.shift, s.fields.daya),
                rows,
            )
        }
        _ => (" No substation selected ".to_string(), Vec::new()),
    };
    let header = Row::new(["ROW", "R", "S", "T", "N", "P-P", "KVA", "LOAD", "UNBAL"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let widths = [
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(8),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

/// Footer with keybinding hints.
fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(Span::styled(
        " q:Quit  ↑/↓:Select  ←/→:Month  Tab:Shift  f:Status filter  r:Refresh",
        Style::default().fg(style::FOOTER_FG),
    )));
    frame.render_widget(footer, area);
}
