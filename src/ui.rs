use crate::db::StoredResolution;
use crate::outcome::OutcomeCategory;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::collections::{BTreeMap, BTreeSet};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Seasons,
    Resolutions,
    Views,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Seasons => Page::Resolutions,
            Page::Resolutions => Page::Views,
            Page::Views => Page::Seasons,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Seasons => Page::Views,
            Page::Resolutions => Page::Seasons,
            Page::Views => Page::Resolutions,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Seasons => "Seasons",
            Page::Resolutions => "Resolutions",
            Page::Views => "Views",
        }
    }
}

/// None shows every stored resolution
pub type Filter = Option<OutcomeCategory>;

/// Per-season row for the Seasons page: (season, records, resolved, salary resolved)
pub type SeasonSummary = (i32, usize, usize, f64);

pub struct App {
    pub resolutions: Vec<StoredResolution>,
    pub filtered: Vec<StoredResolution>,
    pub state: TableState,
    pub total_count: i64,
    pub current_page: Page,
    pub seasons_state: TableState,
    pub show_detail: bool,
    pub filter: Filter,
}

impl App {
    pub fn new(resolutions: Vec<StoredResolution>, total_count: i64) -> Self {
        let mut state = TableState::default();
        if !resolutions.is_empty() {
            state.select(Some(0));
        }

        let mut seasons_state = TableState::default();
        seasons_state.select(Some(0));

        let filtered = resolutions.clone();

        Self {
            resolutions,
            filtered,
            state,
            total_count,
            current_page: Page::Resolutions,
            seasons_state,
            show_detail: false,
            filter: None,
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected(&self) -> Option<&StoredResolution> {
        self.state.selected().and_then(|i| self.filtered.get(i))
    }

    pub fn apply_filter(&mut self, filter: Filter) {
        self.filter = filter;

        self.filtered = match filter {
            None => self.resolutions.clone(),
            Some(category) => self
                .resolutions
                .iter()
                .filter(|r| r.category() == Some(category))
                .cloned()
                .collect(),
        };

        // Reset selection to first item
        if !self.filtered.is_empty() {
            self.state.select(Some(0));
        } else {
            self.state.select(None);
        }
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(None);
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn season_summary(&self) -> Vec<SeasonSummary> {
        let mut summary: BTreeMap<i32, (usize, usize, f64)> = BTreeMap::new();

        for r in &self.resolutions {
            let entry = summary.entry(r.season).or_insert((0, 0, 0.0));
            entry.0 += 1;
            if r.is_resolved() {
                entry.1 += 1;
                entry.2 += r.salary;
            }
        }

        summary
            .into_iter()
            .map(|(season, (count, resolved, salary))| (season, count, resolved, salary))
            .collect()
    }

    pub fn season_count(&self) -> usize {
        self.resolutions.iter().map(|r| r.season).collect::<BTreeSet<_>>().len()
    }

    /// Table moved by the navigation keys on the current page, with its row count
    fn active_table(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::Seasons => {
                let len = self.season_count();
                (&mut self.seasons_state, len)
            }
            _ => (&mut self.state, self.filtered.len()),
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        state.select(Some(i));
    }

    pub fn first(&mut self) {
        let (state, len) = self.active_table();
        if len > 0 {
            state.select(Some(0));
        }
    }

    pub fn last(&mut self) {
        let (state, len) = self.active_table();
        if len > 0 {
            state.select(Some(len - 1));
        }
    }

    pub fn count(&self, category: OutcomeCategory) -> usize {
        self.resolutions
            .iter()
            .filter(|r| r.category() == Some(category))
            .count()
    }
}

fn category_color(category: Option<OutcomeCategory>) -> Color {
    match category {
        Some(OutcomeCategory::Resolved) => Color::Green,
        Some(OutcomeCategory::Ambiguous) => Color::Magenta,
        Some(OutcomeCategory::NoCandidate) => Color::Red,
        Some(OutcomeCategory::LowConfidence) => Color::Yellow,
        None => Color::White,
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('c') => {
                    app.clear_filter();
                    app.current_page = Page::Resolutions;
                }
                KeyCode::Char(c @ '1'..='5') if app.current_page == Page::Views => {
                    let filter = match c {
                        '1' => None,
                        '2' => Some(OutcomeCategory::Resolved),
                        '3' => Some(OutcomeCategory::Ambiguous),
                        '4' => Some(OutcomeCategory::NoCandidate),
                        _ => Some(OutcomeCategory::LowConfidence),
                    };
                    app.apply_filter(filter);
                    app.current_page = Page::Resolutions;
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.first(),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Resolutions {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Seasons => render_seasons(f, chunks[1], app),
            Page::Resolutions => render_table(f, chunks[1], app),
            Page::Views => render_views(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Seasons, Page::Resolutions, Page::Views];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Total: {}", app.total_count),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("✓ {}", app.count(OutcomeCategory::Resolved)),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("? {}", app.resolutions.len() - app.count(OutcomeCategory::Resolved)),
        Style::default().fg(Color::Red),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Season", "Name", "Salary", "Player ID", "Outcome", "Method"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.filtered.iter().map(|r| {
        let color = category_color(r.category());

        let cells = vec![
            Cell::from(r.season.to_string()),
            Cell::from(truncate(&r.name, 28)),
            Cell::from(format!("{:.0}", r.salary)),
            Cell::from(r.player_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::from(r.outcome.clone()).style(Style::default().fg(color)),
            Cell::from(r.method.clone().unwrap_or_default()),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(30),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Resolutions "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.filtered.len();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(category) = app.filter {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("Filter: {}", category.as_str()),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" ("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" clear)"));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Details | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Fast | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn render_seasons(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Season", "Records", "Resolved", "Rate", "Resolved Salary"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = app
        .season_summary()
        .into_iter()
        .map(|(season, count, resolved, salary)| {
            let rate = resolved as f64 / count as f64 * 100.0;
            let color = if rate >= 90.0 { Color::Green } else { Color::Yellow };

            Row::new(vec![
                Cell::from(season.to_string()),
                Cell::from(count.to_string()),
                Cell::from(resolved.to_string()),
                Cell::from(format!("{:.1}%", rate)).style(Style::default().fg(color)),
                Cell::from(format!("{:.0}", salary)),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(18),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Seasons - Resolution by Season "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.seasons_state);
}

fn render_views(f: &mut Frame, area: Rect, app: &App) {
    let entries = [
        ("1", "All Resolutions", app.resolutions.len(), Color::White),
        ("2", "Resolved", app.count(OutcomeCategory::Resolved), Color::Green),
        ("3", "Ambiguous (shared name, shared season)", app.count(OutcomeCategory::Ambiguous), Color::Magenta),
        ("4", "No Candidate", app.count(OutcomeCategory::NoCandidate), Color::Red),
        ("5", "Low Confidence", app.count(OutcomeCategory::LowConfidence), Color::Yellow),
    ];

    let mut content = vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            "  OUTCOME VIEWS",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )]),
        Line::from(""),
    ];

    for (key, label, count, color) in entries {
        content.push(Line::from(vec![
            Span::styled(format!("  [{}] ", key), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(format!("{:<42}", label), Style::default().fg(color)),
            Span::raw(format!("{:>8}", count)),
        ]));
        content.push(Line::from(""));
    }

    content.push(Line::from(vec![Span::styled(
        "  Press a number to filter the Resolutions page",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )]));

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Views "),
    );

    f.render_widget(paragraph, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let Some(r) = app.selected() else {
        let no_selection = Paragraph::new("No resolution selected").block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Resolution Details "),
        );
        f.render_widget(no_selection, area);
        return;
    };

    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    let section = |text: &'static str| {
        Line::from(vec![Span::styled(
            text,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )])
    };
    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    let content = vec![
        Line::from(""),
        section("  SALARY ROW"),
        Line::from(""),
        Line::from(vec![label("  Name: "), Span::raw(r.name.clone())]),
        Line::from(vec![label("  Season: "), Span::raw(r.season.to_string())]),
        Line::from(vec![label("  Salary: "), Span::raw(format!("{:.2}", r.salary))]),
        Line::from(vec![
            label("  Unadjusted: "),
            Span::raw(or_dash(r.salary_unadjusted.map(|s| format!("{:.2}", s)))),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        section("  OUTCOME"),
        Line::from(""),
        Line::from(vec![
            label("  Outcome: "),
            Span::styled(r.outcome.clone(), Style::default().fg(category_color(r.category()))),
        ]),
        Line::from(vec![label("  Player ID: "), Span::raw(or_dash(r.player_id.map(|id| id.to_string())))]),
        Line::from(vec![label("  Method: "), Span::raw(or_dash(r.method.clone()))]),
        Line::from(vec![label("  Score: "), Span::raw(or_dash(r.score.map(|s| format!("{:.0}", s))))]),
        Line::from(vec![label("  Rejection: "), Span::raw(or_dash(r.rejection.clone()))]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        section("  PROVENANCE"),
        Line::from(""),
        Line::from(vec![
            label("  Source File: "),
            Span::styled(or_dash(r.source_file.clone()), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            label("  Line Number: "),
            Span::styled(or_dash(r.line_number.map(|n| n.to_string())), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![label("  Run: "), Span::raw(truncate(&r.run_id, 36))]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Press Enter to close",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )]),
    ];

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Resolution Details "),
    );

    f.render_widget(detail_panel, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(name: &str, season: i32, outcome: &str, player_id: Option<i64>) -> StoredResolution {
        StoredResolution {
            idempotency_hash: format!("{}-{}", name, season),
            run_id: "run".to_string(),
            name: name.to_string(),
            season,
            salary: 1_000.0,
            salary_unadjusted: None,
            player_id,
            outcome: outcome.to_string(),
            method: None,
            score: None,
            rejection: None,
            source_file: None,
            line_number: None,
        }
    }

    fn app() -> App {
        let rows = vec![
            stored("A", 1995, "resolved", Some(1)),
            stored("B", 1995, "ambiguous", None),
            stored("C", 1996, "resolved", Some(2)),
            stored("D", 1996, "no_candidate", None),
        ];
        App::new(rows, 4)
    }

    #[test]
    fn test_filter_by_outcome() {
        let mut app = app();

        app.apply_filter(Some(OutcomeCategory::Resolved));
        assert_eq!(app.filtered.len(), 2);
        assert_eq!(app.state.selected(), Some(0));

        app.apply_filter(Some(OutcomeCategory::LowConfidence));
        assert!(app.filtered.is_empty());
        assert_eq!(app.state.selected(), None);

        app.clear_filter();
        assert_eq!(app.filtered.len(), 4);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();

        app.previous();
        assert_eq!(app.state.selected(), Some(3));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.state.selected(), Some(3));
        app.page_up();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_navigation_follows_current_page() {
        let mut app = app();
        app.current_page = Page::Seasons;

        app.next();
        assert_eq!(app.seasons_state.selected(), Some(1));
        assert_eq!(app.state.selected(), Some(0), "resolutions table stays put");

        app.next();
        assert_eq!(app.seasons_state.selected(), Some(0));
        app.last();
        assert_eq!(app.seasons_state.selected(), Some(1));
        app.page_up();
        assert_eq!(app.seasons_state.selected(), Some(0));

        app.current_page = Page::Resolutions;
        app.last();
        assert_eq!(app.state.selected(), Some(3));
        assert_eq!(app.seasons_state.selected(), Some(0));
    }

    #[test]
    fn test_season_summary() {
        let app = app();
        let summary = app.season_summary();

        assert_eq!(summary, vec![(1995, 2, 1, 1_000.0), (1996, 2, 1, 1_000.0)]);
        assert_eq!(app.count(OutcomeCategory::Ambiguous), 1);
    }
}
