use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
};
use std::collections::{BTreeMap, BTreeSet};
use std::io::stdout;
use std::time::{Duration, Instant};

use crate::debounce::{Debouncer, FILTER_DEBOUNCE};
use crate::models::{ApplicationStatus, FilterCriteria, SortDirection, SortKey, SortState};
use crate::session::{Command, Outcome, PageView, Session};
use crate::store::{BatchOutcome, Storage};

const PLACEHOLDER: &str = "-";

/// Table columns and the sort key each header toggles.
const COLUMNS: [(&str, Option<SortKey>); 8] = [
    ("", None),
    ("STATUS", None),
    ("TITLE", Some(SortKey::Title)),
    ("COMPANY", Some(SortKey::Company)),
    ("LOCATION", Some(SortKey::Location)),
    ("ATS", Some(SortKey::Ats)),
    ("UPDATED", Some(SortKey::Updated)),
    ("SALARY", None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterField {
    Title,
    Company,
    Location,
}

impl FilterField {
    fn next(self) -> Self {
        match self {
            FilterField::Title => FilterField::Company,
            FilterField::Company => FilterField::Location,
            FilterField::Location => FilterField::Title,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FilterField::Title => "title",
            FilterField::Company => "company",
            FilterField::Location => "location",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Edit(FilterField),
}

struct AppState<'a, S: Storage> {
    session: Session<'a, S>,
    /// Criteria as typed; pushed to the session once the debouncer fires.
    draft: FilterCriteria,
    selected: usize,
    marked: BTreeSet<String>,
    mode: Mode,
    debounce: Debouncer,
    message: Option<String>,
}

impl<'a, S: Storage> AppState<'a, S> {
    fn new(session: Session<'a, S>) -> Self {
        let draft = session.criteria().clone();
        Self {
            session,
            draft,
            selected: 0,
            marked: BTreeSet::new(),
            mode: Mode::Browse,
            debounce: Debouncer::new(FILTER_DEBOUNCE),
            message: None,
        }
    }

    fn selected_id(&self) -> Option<String> {
        let view = self.session.view();
        view.rows
            .get(self.selected)
            .and_then(|row| row.record.job_id())
            .map(str::to_string)
    }

    fn run(&mut self, command: Command) {
        match self.session.dispatch(command) {
            Ok(Outcome::Batch(BatchOutcome::NothingSelected)) => {
                self.message = Some("Nothing selected".to_string());
            }
            Ok(Outcome::Batch(BatchOutcome::Applied { applied, .. })) => {
                self.marked.clear();
                self.message = Some(format!("Marked {} job(s) as applied", applied));
            }
            Ok(Outcome::Updated) => {}
            Err(e) => {
                tracing::warn!(error = %e, "command failed");
                self.message = Some(format!("Error: {}", e));
            }
        }
        self.clamp_selection();
    }

    fn apply_draft(&mut self) {
        self.debounce.cancel();
        if &self.draft != self.session.criteria() {
            self.run(Command::SetFilter(self.draft.clone()));
            self.selected = 0;
        }
    }

    fn clamp_selection(&mut self) {
        let rows = self.session.view().rows.len();
        self.selected = self.selected.min(rows.saturating_sub(1));
    }

    fn next(&mut self) {
        let rows = self.session.view().rows.len();
        if rows > 0 && self.selected < rows - 1 {
            self.selected += 1;
        }
    }

    fn prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn set_status(&mut self, status: ApplicationStatus) {
        if let Some(id) = self.selected_id() {
            self.run(Command::SetStatus { id, status });
        }
    }

    fn toggle_mark(&mut self) {
        if let Some(id) = self.selected_id() {
            if !self.marked.remove(&id) {
                self.marked.insert(id);
            }
        }
    }

    fn apply_marked(&mut self) {
        let pending: BTreeMap<String, ApplicationStatus> = self
            .marked
            .iter()
            .map(|id| (id.clone(), ApplicationStatus::Applied))
            .collect();
        self.run(Command::ApplyBatch(pending));
    }

    fn toggle(&mut self, flip: impl FnOnce(&mut FilterCriteria)) {
        flip(&mut self.draft);
        self.apply_draft();
    }

    fn field_mut(&mut self, field: FilterField) -> &mut String {
        match field {
            FilterField::Title => &mut self.draft.title,
            FilterField::Company => &mut self.draft.company,
            FilterField::Location => &mut self.draft.location,
        }
    }

    /// Returns false when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        self.message = None;
        match self.mode {
            Mode::Edit(field) => match key.code {
                KeyCode::Enter | KeyCode::Esc => {
                    self.mode = Mode::Browse;
                    self.apply_draft();
                }
                KeyCode::Tab => self.mode = Mode::Edit(field.next()),
                KeyCode::Backspace => {
                    self.field_mut(field).pop();
                    self.debounce.touch(now);
                }
                KeyCode::Char(c) => {
                    self.field_mut(field).push(c);
                    self.debounce.touch(now);
                }
                _ => {}
            },
            Mode::Browse => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return false,
                KeyCode::Down | KeyCode::Char('j') => self.next(),
                KeyCode::Up | KeyCode::Char('k') => self.prev(),
                KeyCode::Right | KeyCode::Char('n') => {
                    self.run(Command::NextPage);
                    self.selected = 0;
                }
                KeyCode::Left | KeyCode::Char('p') => {
                    self.run(Command::PreviousPage);
                    self.selected = 0;
                }
                KeyCode::Char('/') => self.mode = Mode::Edit(FilterField::Title),
                KeyCode::Char(c @ '1'..='5') => {
                    let idx = c as usize - '1' as usize;
                    self.run(Command::ToggleSort(SortKey::ALL[idx]));
                }
                KeyCode::Char('s') => self.set_status(ApplicationStatus::Saved),
                KeyCode::Char('a') => self.set_status(ApplicationStatus::Applied),
                KeyCode::Char('i') => self.set_status(ApplicationStatus::Ignored),
                KeyCode::Char('u') => {
                    if let Some(id) = self.selected_id() {
                        self.run(Command::ClearStatus { id });
                    }
                }
                KeyCode::Char(' ') => self.toggle_mark(),
                KeyCode::Char('A') => self.apply_marked(),
                KeyCode::Char('r') => self.toggle(|c| c.remote_only = !c.remote_only),
                KeyCode::Char('h') => self.toggle(|c| c.hide_applied = !c.hide_applied),
                KeyCode::Char('R') => self.toggle(|c| c.hide_recruiters = !c.hide_recruiters),
                KeyCode::Char('f') => self.toggle(|c| c.status = next_status_filter(c.status)),
                KeyCode::Char('c') => {
                    self.draft = FilterCriteria::default();
                    self.debounce.cancel();
                    self.run(Command::ClearFilters);
                    self.selected = 0;
                }
                _ => {}
            },
        }
        true
    }

    fn tick(&mut self, now: Instant) {
        if self.debounce.fire(now) {
            self.run(Command::SetFilter(self.draft.clone()));
            self.selected = 0;
        }
    }
}

fn next_status_filter(current: Option<ApplicationStatus>) -> Option<ApplicationStatus> {
    match current {
        None => Some(ApplicationStatus::Saved),
        Some(ApplicationStatus::Saved) => Some(ApplicationStatus::Applied),
        Some(ApplicationStatus::Applied) => Some(ApplicationStatus::Ignored),
        Some(ApplicationStatus::Ignored) => None,
    }
}

pub fn run_browse<S: Storage>(session: Session<'_, S>) -> Result<()> {
    let mut state = AppState::new(session);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<S: Storage>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState<'_, S>,
) -> Result<()> {
    let mut table_state = TableState::default();

    loop {
        let view = state.session.view();
        table_state.select(if view.rows.is_empty() {
            None
        } else {
            Some(state.selected)
        });
        terminal.draw(|frame| draw(frame, state, &view, &mut table_state))?;

        let timeout = state
            .debounce
            .time_left(Instant::now())
            .unwrap_or(Duration::from_millis(500));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !state.handle_key(key, Instant::now()) {
                    break;
                }
            }
        }
        state.tick(Instant::now());
    }
    Ok(())
}

fn status_style(status: Option<ApplicationStatus>) -> Style {
    match status {
        Some(ApplicationStatus::Saved) => Style::default().fg(Color::Yellow),
        Some(ApplicationStatus::Applied) => Style::default().fg(Color::Cyan),
        Some(ApplicationStatus::Ignored) => Style::default().fg(Color::DarkGray),
        None => Style::default(),
    }
}

fn column_title(label: &str, key: Option<SortKey>, sort: SortState) -> String {
    let arrow = match (key, sort.key) {
        (Some(k), Some(active)) if k == active => match sort.direction {
            SortDirection::Asc => " ▲",
            SortDirection::Desc => " ▼",
        },
        _ => "",
    };
    format!("{}{}", label, arrow)
}

/// Date part of an ISO timestamp.
fn updated_date(raw: Option<&str>) -> &str {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.get(..10).unwrap_or(s),
        _ => PLACEHOLDER,
    }
}

fn or_placeholder(s: &str) -> &str {
    if s.is_empty() { PLACEHOLDER } else { s }
}

fn draw<S: Storage>(
    frame: &mut Frame,
    state: &AppState<'_, S>,
    view: &PageView<'_>,
    table_state: &mut TableState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Filter bar
    frame.render_widget(
        Paragraph::new(filter_line(state))
            .block(Block::default().borders(Borders::ALL).title(" Filters "))
            .wrap(Wrap { trim: true }),
        chunks[0],
    );

    // Results table
    let sort = state.session.sort();
    let header_cells = COLUMNS
        .iter()
        .map(|&(label, key)| Cell::from(column_title(label, key, sort)));
    let header = Row::new(header_cells).style(Style::default().add_modifier(Modifier::BOLD));

    let rows = view.rows.iter().map(|row| {
        let job = row.record;
        let marked = job
            .job_id()
            .is_some_and(|id| state.marked.contains(id));
        let salary = row
            .salary
            .map(|s| s.display())
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        Row::new(vec![
            Cell::from(if marked { "■" } else { " " }),
            Cell::from(row.status.map(|s| s.as_str()).unwrap_or("")).style(status_style(row.status)),
            Cell::from(or_placeholder(job.title_text()).to_string()),
            Cell::from(or_placeholder(job.company_name()).to_string()),
            Cell::from(or_placeholder(job.location_text()).to_string()),
            Cell::from(or_placeholder(job.ats.as_deref().unwrap_or("")).to_string()),
            Cell::from(updated_date(job.updated_at.as_deref()).to_string()),
            Cell::from(salary),
        ])
    });

    let widths = [
        Constraint::Length(1),
        Constraint::Length(8),
        Constraint::Percentage(35),
        Constraint::Percentage(18),
        Constraint::Percentage(20),
        Constraint::Length(11),
        Constraint::Length(10),
        Constraint::Length(12),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Jobs {} of {} ",
            view.total,
            state.session.total_records()
        )))
        .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(table, chunks[1], table_state);

    // Page footer
    let share = state.session.view_state().to_url("/");
    let mut footer = vec![Line::from(format!(
        " Page {}/{}  ·  {} selected  ·  share: {}",
        view.current_page,
        view.total_pages,
        state.marked.len(),
        share
    ))];
    if let Some(msg) = &state.message {
        footer.push(Line::from(Span::styled(
            format!(" {}", msg),
            Style::default().fg(Color::Green),
        )));
    }
    frame.render_widget(Paragraph::new(footer), chunks[2]);

    let help = match state.mode {
        Mode::Edit(_) => " type to filter  Tab:next field  Enter/Esc:done",
        Mode::Browse => {
            " j/k:move n/p:page /:filter 1-5:sort(title/company/location/ats/updated) s/a/i:status u:clear space:select A:apply r/h/R/f:toggles c:reset q:quit"
        }
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[3],
    );
}

fn filter_line<S: Storage>(state: &AppState<'_, S>) -> Line<'static> {
    let c = &state.draft;
    let mut spans = Vec::new();
    for field in [FilterField::Title, FilterField::Company, FilterField::Location] {
        let value = match field {
            FilterField::Title => &c.title,
            FilterField::Company => &c.company,
            FilterField::Location => &c.location,
        };
        let editing = state.mode == Mode::Edit(field);
        let style = if editing {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if editing { "_" } else { "" };
        spans.push(Span::styled(
            format!("{}: {}{}  ", field.label(), value, cursor),
            style,
        ));
    }
    let flags = [
        ("remote", c.remote_only),
        ("hide-applied", c.hide_applied),
        ("hide-recruiters", c.hide_recruiters),
    ];
    for (label, on) in flags {
        if on {
            spans.push(Span::styled(
                format!("[{}] ", label),
                Style::default().fg(Color::Cyan),
            ));
        }
    }
    if let Some(status) = c.status {
        spans.push(Span::styled(
            format!("[status={}]", status),
            Style::default().fg(Color::Cyan),
        ));
    }
    Line::from(spans)
}
