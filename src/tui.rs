//! Full-screen terminal front-end
//!
//! Layout:
//! - schema tree on the left
//! - SQL editor at the top right
//! - Results / Messages tabs at the bottom right
//! - status bar and `:` command line at the bottom
//!
//! The loop redraws every tick and polls the controller for a finished
//! query, so drawing never waits on the engine.

use crate::commands::{Command, ProfileCommand, USAGE};
use crate::controller::{Controller, Submission};
use crate::editor::{EditorCapability, SqlEditor};
use crate::error::{QuackviewError, Result};
use crate::logging::LogLevel;
use crate::profiles::ProfileStore;
use crate::render::NodeKind;
use crate::state::UiState;
use crate::theme::Theme;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use quackview_engine::{describe_sql, select_sql, ConnectionProfile, RemoteKind};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, Tabs, Wrap,
    },
    Frame, Terminal,
};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Front-end settings fixed at startup.
#[derive(Debug, Clone)]
pub struct TuiOptions {
    pub theme: Theme,
    pub tick: Duration,
    pub editor: EditorCapability,
}

/// Which pane receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Editor,
    Results,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Tree => Focus::Editor,
            Focus::Editor => Focus::Results,
            Focus::Results => Focus::Tree,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BottomTab {
    Results,
    Messages,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Command,
    Help,
    /// Waiting for `y` before dropping this table
    ConfirmDrop(String),
}

/// Front-end state around the controller.
pub struct App {
    controller: Controller,
    editor: Box<dyn SqlEditor>,
    ui_state: UiState,
    profiles: ProfileStore,
    theme: Theme,
    tick: Duration,

    focus: Focus,
    tab: BottomTab,
    mode: Mode,
    command_input: String,
    tree_selected: usize,
    result_scroll: usize,
    status: Option<(String, Instant)>,
    should_quit: bool,
}

impl App {
    pub fn new(
        controller: Controller,
        options: TuiOptions,
        ui_state: UiState,
        profiles: ProfileStore,
    ) -> Self {
        let mut app = Self {
            controller,
            editor: options.editor.build(),
            ui_state,
            profiles,
            theme: options.theme,
            tick: options.tick,
            focus: Focus::Editor,
            tab: BottomTab::Results,
            mode: Mode::Normal,
            command_input: String::new(),
            tree_selected: 0,
            result_scroll: 0,
            status: None,
            should_quit: false,
        };
        app.sync_completions();
        app
    }

    /// Hand back the controller and the state to persist.
    pub fn into_parts(self) -> (Controller, UiState) {
        (self.controller, self.ui_state)
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    pub fn editor(&self) -> &dyn SqlEditor {
        self.editor.as_ref()
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().map(|(msg, _)| msg.as_str())
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some((msg.into(), Instant::now()));
    }

    fn sync_completions(&mut self) {
        let names = self.controller.completion_names();
        self.editor.update_completions(names);
    }

    /// Work done every tick: apply a finished query and expire the status.
    pub fn on_tick(&mut self) {
        if let Some(done) = self.controller.poll() {
            self.result_scroll = 0;
            self.tab = if done.succeeded {
                BottomTab::Results
            } else {
                BottomTab::Messages
            };
            self.sync_completions();
        }
        if let Some((_, time)) = &self.status {
            if time.elapsed() > Duration::from_secs(5) {
                self.status = None;
            }
        }
    }

    // ─── Keys ────────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if self.controller.popup().is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ')) {
                self.controller.dismiss_popup();
            }
            return;
        }

        match self.mode.clone() {
            Mode::Help => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::F(1)) {
                    self.mode = Mode::Normal;
                }
                return;
            }
            Mode::ConfirmDrop(name) => {
                self.mode = Mode::Normal;
                if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                    self.drop_table(&name);
                } else {
                    self.set_status("Drop cancelled");
                }
                return;
            }
            Mode::Command => {
                self.handle_command_key(key);
                return;
            }
            Mode::Normal => {}
        }

        // Global keys
        match key.code {
            KeyCode::F(5) => return self.execute_editor(),
            KeyCode::Char('e') if ctrl => return self.execute_editor(),
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('o') if ctrl => {
                self.mode = Mode::Command;
                self.command_input = "load ".to_string();
                return;
            }
            KeyCode::Char('l') if ctrl => {
                self.controller.clear_results();
                self.result_scroll = 0;
                self.set_status("Results cleared");
                return;
            }
            KeyCode::Char('t') if ctrl => {
                self.apply_theme(self.theme.next());
                return;
            }
            KeyCode::F(1) => {
                self.mode = Mode::Help;
                return;
            }
            KeyCode::F(6) => {
                self.toggle_tab();
                return;
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::Editor => self.handle_editor_key(key),
            Focus::Tree => self.handle_tree_key(key),
            Focus::Results => self.handle_results_key(key),
        }
    }

    fn handle_command_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.command_input.clear();
            }
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                let input = std::mem::take(&mut self.command_input);
                match Command::parse(&input) {
                    Ok(command) => self.run_command(command),
                    Err(msg) => self.set_status(msg),
                }
            }
            KeyCode::Backspace => {
                self.command_input.pop();
            }
            KeyCode::Char(c) => self.command_input.push(c),
            _ => {}
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char(' ') if ctrl => {
                let candidates = self.editor.complete();
                if candidates.len() > 1 {
                    self.set_status(candidates.join("  "));
                }
            }
            KeyCode::Char(c) if !ctrl => self.editor.insert_char(c),
            KeyCode::Enter => self.editor.newline(),
            KeyCode::Backspace => self.editor.backspace(),
            KeyCode::Delete => self.editor.delete(),
            KeyCode::Left => self.editor.buffer_mut().move_left(),
            KeyCode::Right => self.editor.buffer_mut().move_right(),
            KeyCode::Up => self.editor.buffer_mut().move_up(),
            KeyCode::Down => self.editor.buffer_mut().move_down(),
            KeyCode::Home => self.editor.buffer_mut().home(),
            KeyCode::End => self.editor.buffer_mut().end(),
            KeyCode::Esc => self.focus = Focus::Tree,
            _ => {}
        }
    }

    fn handle_tree_key(&mut self, key: KeyEvent) {
        let visible_len = self.controller.tree().visible().len();
        match key.code {
            KeyCode::Char(':') => {
                self.mode = Mode::Command;
                self.command_input.clear();
            }
            KeyCode::Char('?') => self.mode = Mode::Help,
            KeyCode::Up | KeyCode::Char('k') => {
                self.tree_selected = self.tree_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.tree_selected + 1 < visible_len {
                    self.tree_selected += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let path = self
                    .controller
                    .tree()
                    .visible()
                    .get(self.tree_selected)
                    .map(|v| v.node.path.clone());
                if let Some(path) = path {
                    self.controller.tree_mut().toggle(&path);
                }
            }
            KeyCode::Char('s') => self.insert_for_selected(|t| select_sql(t)),
            KeyCode::Char('d') => self.insert_for_selected(|t| describe_sql(t)),
            KeyCode::Char('x') => {
                if let Some(table) = self.selected_table() {
                    let name = format!("{}.{}.{}", table.database, table.schema, table.name);
                    self.set_status(format!("Drop {}? (y/n)", name));
                    self.mode = Mode::ConfirmDrop(name);
                }
            }
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
        let visible_len = self.controller.tree().visible().len();
        self.tree_selected = self.tree_selected.min(visible_len.saturating_sub(1));
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        let submission = match key.code {
            KeyCode::Char(':') => {
                self.mode = Mode::Command;
                self.command_input.clear();
                return;
            }
            KeyCode::Char('?') => {
                self.mode = Mode::Help;
                return;
            }
            KeyCode::Char('m') => {
                self.toggle_tab();
                return;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.result_scroll = self.result_scroll.saturating_sub(1);
                return;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let rows = self.controller.grid().rows.len();
                if self.result_scroll + 1 < rows {
                    self.result_scroll += 1;
                }
                return;
            }
            KeyCode::PageDown | KeyCode::Char('n') => self.controller.next_page(),
            KeyCode::PageUp | KeyCode::Char('p') => self.controller.prev_page(),
            KeyCode::Home => self.controller.first_page(),
            KeyCode::End => self.controller.last_page(),
            _ => return,
        };
        self.report_submission(submission);
    }

    fn selected_table(&self) -> Option<quackview_engine::CatalogTable> {
        let visible = self.controller.tree().visible();
        match &visible.get(self.tree_selected)?.node.kind {
            NodeKind::Table(table) => Some(table.as_ref().clone()),
            _ => None,
        }
    }

    fn insert_for_selected(&mut self, sql: impl Fn(&quackview_engine::CatalogTable) -> String) {
        if let Some(table) = self.selected_table() {
            self.editor.set_text(&sql(&table));
            self.focus = Focus::Editor;
        }
    }

    fn toggle_tab(&mut self) {
        self.tab = match self.tab {
            BottomTab::Results => BottomTab::Messages,
            BottomTab::Messages => BottomTab::Results,
        };
    }

    // ─── Actions ─────────────────────────────────────────────────────────

    fn execute_editor(&mut self) {
        let text = self.editor.text();
        let submission = self.controller.submit_query(&text);
        if let Submission::ContextSwitched(_) = submission {
            self.sync_completions();
        }
        self.report_submission(submission);
    }

    fn report_submission(&mut self, submission: Submission) {
        match submission {
            Submission::Empty => {}
            Submission::ContextSwitched(context) => {
                self.set_status(format!("Using {}", context))
            }
            Submission::Started(id) => {
                debug!(query_id = id, "Query started");
                self.result_scroll = 0;
            }
            Submission::Busy => self.set_status("A query is already running; please wait"),
            Submission::Failed(msg) => {
                self.set_status(msg);
                self.tab = BottomTab::Messages;
            }
        }
    }

    fn refresh(&mut self) {
        match self.controller.refresh_schema() {
            Ok(()) => {
                self.sync_completions();
                self.set_status("Schema refreshed");
            }
            Err(e) => self.set_status(e.user_message()),
        }
    }

    fn drop_table(&mut self, name: &str) {
        let result = self.controller.drop_table(name);
        self.after_operation(result, format!("Dropped {}", name));
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.ui_state.theme = theme;
        self.set_status(format!("Theme: {}", theme));
    }

    fn after_operation(&mut self, result: Result<()>, success: String) {
        match result {
            Ok(()) => {
                self.sync_completions();
                self.set_status(success);
            }
            Err(e) => {
                self.set_status(e.user_message());
                self.tab = BottomTab::Messages;
            }
        }
    }

    /// Execute a `:` command.
    pub fn run_command(&mut self, command: Command) {
        debug!(?command, "Running command");
        match command {
            Command::Quit => self.should_quit = true,
            Command::Help => self.mode = Mode::Help,
            Command::Refresh => self.refresh(),
            Command::Clear => {
                self.controller.clear_results();
                self.set_status("Results cleared");
            }
            Command::Theme(theme) => {
                let theme = theme.unwrap_or_else(|| self.theme.next());
                self.apply_theme(theme);
            }
            Command::PageSize(n) => {
                let submission = self.controller.set_page_size(n);
                if submission != Submission::Busy {
                    self.ui_state.page_size = Some(n);
                    self.set_status(format!("Page size: {}", n));
                }
                self.report_submission(submission);
            }
            Command::Load { path, format } => self.load(&path, format),
            Command::Rename { old, new } => {
                let result = self.controller.rename_table(&old, &new);
                self.after_operation(result, format!("Renamed {} to {}", old, new));
            }
            Command::Drop(name) => {
                self.set_status(format!("Drop {}? (y/n)", name));
                self.mode = Mode::ConfirmDrop(name);
            }
            Command::Use(target) => {
                let result = self.controller.use_context(&target).map(|_| ());
                let msg = format!("Using {}", self.controller.context());
                self.after_operation(result, msg);
            }
            Command::Connect(name) => match self.profiles.get(&name).cloned() {
                Some(profile) => {
                    let result = self.controller.attach(&profile);
                    self.after_operation(result, format!("Connected to {}", name));
                }
                None => {
                    let msg = format!("No connection profile named '{}'", name);
                    self.controller.message(LogLevel::Error, &msg);
                    self.set_status(msg);
                }
            },
            Command::Disconnect(name) => {
                let result = self.controller.detach(&name);
                self.after_operation(result, format!("Disconnected from {}", name));
            }
            Command::Profile(command) => self.run_profile_command(command),
            Command::Recent(None) => self.list_recent_files(),
            Command::Recent(Some(n)) => match n
                .checked_sub(1)
                .and_then(|idx| self.ui_state.recent_files.get(idx))
                .cloned()
            {
                Some(file) => self.load(&file.path, Some(file.format)),
                None => self.set_status(format!("No recent file #{}", n)),
            },
            Command::Export(path) => {
                let result = self.controller.export(&path);
                self.after_operation(result, format!("Exported to {}", path.display()));
            }
        }
    }

    fn run_profile_command(&mut self, command: ProfileCommand) {
        match command {
            ProfileCommand::Add(profile) => {
                let name = profile.name.clone();
                let result = self.profiles.upsert(profile).and_then(|()| self.profiles.save());
                self.after_profile_change(result, format!("Saved connection profile '{}'", name));
            }
            ProfileCommand::Remove(name) => {
                if self.profiles.remove(&name) {
                    let result = self.profiles.save();
                    self.after_profile_change(result, format!("Removed connection profile '{}'", name));
                } else {
                    let msg = format!("No connection profile named '{}'", name);
                    self.controller.message(LogLevel::Error, &msg);
                    self.set_status(msg);
                }
            }
            ProfileCommand::List => {
                let lines: Vec<String> = self.profiles.list().iter().map(describe_profile).collect();
                if lines.is_empty() {
                    self.controller.message(LogLevel::Info, "No saved connection profiles");
                }
                for line in &lines {
                    self.controller.message(LogLevel::Info, line);
                }
                self.set_status(format!("{} connection profile(s)", lines.len()));
                self.tab = BottomTab::Messages;
            }
        }
    }

    fn after_profile_change(&mut self, result: Result<()>, success: String) {
        match result {
            Ok(()) => {
                self.controller.message(LogLevel::Info, &success);
                self.set_status(success);
            }
            Err(e) => {
                let msg = format!("Error: {}", e.user_message());
                self.controller.message(LogLevel::Error, &msg);
                self.set_status(msg);
                self.tab = BottomTab::Messages;
            }
        }
    }

    fn list_recent_files(&mut self) {
        if self.ui_state.recent_files.is_empty() {
            self.controller.message(LogLevel::Info, "No recent files");
        }
        for (idx, file) in self.ui_state.recent_files.iter().enumerate() {
            self.controller.message(
                LogLevel::Info,
                &format!("{}. {} ({})", idx + 1, file.path.display(), file.format),
            );
        }
        self.set_status("Recent files listed in Messages; :recent <n> to reload");
        self.tab = BottomTab::Messages;
    }

    /// Load a file and remember it for the next session.
    pub fn load(&mut self, path: &Path, format: Option<quackview_engine::FileFormat>) {
        match self.controller.load_file(path, format) {
            Ok(loaded) => {
                self.ui_state.remember_file(path, loaded.format);
                self.sync_completions();
                self.set_status(format!("Loaded table {}", loaded.name));
            }
            Err(QuackviewError::Busy) => self.set_status("A query is already running; please wait"),
            // Reported through the popup.
            Err(_) => {}
        }
    }
}

/// One line per profile for the Messages panel. Passwords are never shown.
fn describe_profile(profile: &ConnectionProfile) -> String {
    match profile.db_type {
        RemoteKind::Sqlite => format!("{}: sqlite {}", profile.name, profile.database),
        kind => format!(
            "{}: {} {}@{}:{}/{}{}",
            profile.name,
            kind,
            profile.username,
            profile.host,
            profile.port,
            profile.database,
            if profile.uses_ssl() { " (ssl)" } else { "" }
        ),
    }
}

// ─── Terminal loop ───────────────────────────────────────────────────────────

/// Take over the terminal and run until the user quits.
pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode().map_err(|e| QuackviewError::Terminal(e.to_string()))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| QuackviewError::Terminal(e.to_string()))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!("Terminal UI started");
    let result = event_loop(&mut terminal, app);

    // Restore the terminal even when the loop failed.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = app
            .tick
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        if last_tick.elapsed() >= app.tick {
            app.on_tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

// ─── Drawing ─────────────────────────────────────────────────────────────────

fn ui(f: &mut Frame, app: &App) {
    let theme = app.theme;
    f.render_widget(
        Block::default().style(Style::default().bg(theme.bg()).fg(theme.fg())),
        f.area(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Panes
            Constraint::Length(1), // Status bar
            Constraint::Length(1), // Command line / key hints
        ])
        .split(f.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(chunks[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(panes[1]);

    render_tree(f, panes[0], app);
    render_editor(f, right[0], app);
    render_bottom(f, right[1], app);
    render_status(f, chunks[1], app);
    render_command_line(f, chunks[2], app);

    if let Some(msg) = app.controller.popup() {
        render_popup(f, theme, msg);
    } else if app.mode == Mode::Help {
        render_help(f, theme);
    }
}

fn pane_block(title: &str, focused: bool, theme: Theme) -> Block<'_> {
    let border = if focused {
        Style::default().fg(theme.highlight())
    } else {
        Style::default().fg(theme.muted())
    };
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title))
        .border_style(border)
}

fn render_tree(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let visible = app.controller.tree().visible();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|v| {
            let marker = if v.node.children.is_empty() {
                "  "
            } else if v.expanded {
                "▾ "
            } else {
                "▸ "
            };
            let style = match v.node.kind {
                NodeKind::Database | NodeKind::Schema => {
                    Style::default().fg(theme.fg()).add_modifier(Modifier::BOLD)
                }
                NodeKind::Group(_) => Style::default().fg(theme.muted()),
                NodeKind::Table(_) => Style::default().fg(theme.fg()),
                NodeKind::Column => Style::default().fg(theme.muted()),
            };
            ListItem::new(Line::from(vec![
                Span::raw("  ".repeat(v.depth)),
                Span::raw(marker),
                Span::styled(v.node.label.clone(), style),
            ]))
        })
        .collect();

    let block = pane_block("Schema", app.focus == Focus::Tree, theme);
    if items.is_empty() {
        let hint = Paragraph::new("No tables. Ctrl+O to load a file.")
            .style(Style::default().fg(theme.muted()))
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(hint, area);
        return;
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(theme.selection()).add_modifier(Modifier::BOLD));
    let mut state = ListState::default().with_selected(Some(app.tree_selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_editor(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let focused = app.focus == Focus::Editor;
    let title = format!("Query ({})", app.editor.capability().label());
    let block = pane_block(&title, focused, theme);

    let inner_height = area.height.saturating_sub(2) as usize;
    let (row, col) = app.editor.cursor();
    let scroll = row.saturating_sub(inner_height.saturating_sub(1));

    let editor = Paragraph::new(app.editor.styled_lines(&theme.syntax()))
        .block(block)
        .scroll((scroll as u16, 0));
    f.render_widget(editor, area);

    if focused && app.mode == Mode::Normal && app.controller.popup().is_none() {
        let x = area.x + 1 + col as u16;
        let y = area.y + 1 + (row - scroll) as u16;
        if x < area.right().saturating_sub(1) && y < area.bottom().saturating_sub(1) {
            f.set_cursor_position((x, y));
        }
    }
}

fn render_bottom(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let selected = match app.tab {
        BottomTab::Results => 0,
        BottomTab::Messages => 1,
    };
    let tabs = Tabs::new(vec![" Results ", " Messages "])
        .select(selected)
        .style(Style::default().fg(theme.muted()))
        .highlight_style(
            Style::default()
                .fg(theme.highlight())
                .add_modifier(Modifier::BOLD),
        )
        .divider(symbols::line::VERTICAL);
    f.render_widget(tabs, chunks[0]);

    match app.tab {
        BottomTab::Results => render_results(f, chunks[1], app),
        BottomTab::Messages => render_messages(f, chunks[1], app),
    }
}

fn render_results(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let grid = app.controller.grid();
    let title = if grid.page_label.is_empty() {
        "Results".to_string()
    } else {
        format!("Results: {} ({} ms)", grid.page_label, grid.execution_time_ms)
    };
    let block = pane_block(&title, app.focus == Focus::Results, theme);

    if grid.headers.is_empty() {
        let hint = Paragraph::new("Run a query with F5 or Ctrl+E.")
            .style(Style::default().fg(theme.muted()))
            .block(block);
        f.render_widget(hint, area);
        return;
    }

    let header = Row::new(grid.headers.iter().map(|h| {
        Cell::from(h.clone()).style(
            Style::default()
                .fg(theme.highlight())
                .add_modifier(Modifier::BOLD),
        )
    }));
    let null_style = Style::default().fg(theme.muted());
    let null_display = &app.controller.render_options().null_display;
    let rows = grid.rows.iter().skip(app.result_scroll).map(|row| {
        Row::new(row.iter().map(|value| {
            let cell = Cell::from(value.clone());
            if value == null_display {
                cell.style(null_style)
            } else {
                cell
            }
        }))
    });
    let widths: Vec<Constraint> = grid
        .widths
        .iter()
        .map(|w| Constraint::Length(*w as u16))
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(2);
    f.render_widget(table, area);
}

fn render_messages(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let height = area.height.saturating_sub(2) as usize;
    let entries = app.controller.messages().get_entries(None, height.max(1), None);
    let lines: Vec<Line> = entries
        .iter()
        .map(|entry| {
            let style = match entry.level {
                LogLevel::Error => Style::default().fg(theme.error()),
                LogLevel::Warn => Style::default().fg(theme.warning()),
                LogLevel::Info => Style::default().fg(theme.fg()),
                LogLevel::Debug | LogLevel::Trace => Style::default().fg(theme.muted()),
            };
            Line::from(Span::styled(entry.display_line(), style))
        })
        .collect();
    let messages = Paragraph::new(lines)
        .block(pane_block("Messages", app.focus == Focus::Results, theme))
        .wrap(Wrap { trim: false });
    f.render_widget(messages, area);
}

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let run = match app.controller.running_for() {
        Some(elapsed) => Span::styled(
            format!(" Running query… {:.1}s ", elapsed.as_secs_f64()),
            Style::default().fg(theme.warning()).add_modifier(Modifier::BOLD),
        ),
        None => Span::styled(" Ready ", Style::default().fg(theme.success())),
    };
    let mut spans = vec![
        run,
        Span::styled("│ ", Style::default().fg(theme.muted())),
        Span::raw(format!("DB: {} ", app.controller.context())),
        Span::styled("│ ", Style::default().fg(theme.muted())),
        Span::raw(format!("Page size: {} ", app.controller.page_size())),
        Span::styled("│ ", Style::default().fg(theme.muted())),
        Span::raw(format!("Theme: {} ", app.theme)),
    ];
    if let Some((msg, _)) = &app.status {
        spans.push(Span::styled("│ ", Style::default().fg(theme.muted())));
        spans.push(Span::styled(msg.clone(), Style::default().fg(theme.highlight())));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.selection())),
        area,
    );
}

fn render_command_line(f: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let key = |k: &'static str| Span::styled(k, Style::default().fg(theme.highlight()));
    let line = match &app.mode {
        Mode::Command => Line::from(vec![
            key(" :"),
            Span::raw(app.command_input.clone()),
            Span::styled("█", Style::default().fg(theme.highlight())),
        ]),
        Mode::ConfirmDrop(name) => Line::from(vec![
            Span::styled(format!(" Drop {}? ", name), Style::default().fg(theme.error())),
            key("y"),
            Span::raw(" confirm  "),
            key("any other key"),
            Span::raw(" cancel"),
        ]),
        _ => Line::from(vec![
            key(" F5"),
            Span::raw(" run  "),
            key("Tab"),
            Span::raw(" focus  "),
            key("Ctrl+O"),
            Span::raw(" load  "),
            key("Ctrl+L"),
            Span::raw(" clear  "),
            key("PgUp/PgDn"),
            Span::raw(" page  "),
            key(":"),
            Span::raw(" command  "),
            key("F1"),
            Span::raw(" help  "),
            key("Ctrl+Q"),
            Span::raw(" quit"),
        ]),
    };
    f.render_widget(
        Paragraph::new(line).style(Style::default().fg(theme.muted())),
        area,
    );
}

fn render_popup(f: &mut Frame, theme: Theme, msg: &str) {
    let area = centered_rect(60, 30, f.area());
    f.render_widget(Clear, area);
    let popup = Paragraph::new(vec![
        Line::from(msg.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter or Esc to dismiss",
            Style::default().fg(theme.muted()),
        )),
    ])
    .wrap(Wrap { trim: false })
    .style(Style::default().bg(theme.bg()).fg(theme.fg()))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Error ")
            .border_style(Style::default().fg(theme.error())),
    );
    f.render_widget(popup, area);
}

fn render_help(f: &mut Frame, theme: Theme) {
    let area = centered_rect(70, 80, f.area());
    f.render_widget(Clear, area);

    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default()
                .fg(theme.highlight())
                .add_modifier(Modifier::BOLD),
        ))
    };
    let entry = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<14}", keys), Style::default().fg(theme.highlight())),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        heading("Global"),
        entry("F5, Ctrl+E", "Run the editor contents"),
        entry("Tab", "Cycle focus: schema, editor, results"),
        entry("Ctrl+O", "Load a file"),
        entry("Ctrl+L", "Clear results"),
        entry("Ctrl+T", "Next theme"),
        entry("F6", "Switch Results/Messages"),
        entry("Ctrl+Q", "Quit"),
        Line::from(""),
        heading("Schema"),
        entry("↑/↓, j/k", "Move"),
        entry("Enter", "Expand or collapse"),
        entry("s", "Insert SELECT for table"),
        entry("d", "Insert DESCRIBE for table"),
        entry("x", "Drop table (asks first)"),
        entry("r", "Refresh"),
        Line::from(""),
        heading("Editor"),
        entry("Ctrl+Space", "Complete keyword or table name"),
        entry("Esc", "Focus schema"),
        Line::from(""),
        heading("Results"),
        entry("PgDn/PgUp", "Next/previous page"),
        entry("Home/End", "First/last page"),
        entry("m", "Switch Results/Messages"),
        Line::from(""),
        heading("Commands"),
        Line::from(format!("  {}", USAGE)),
    ];

    let help = Paragraph::new(help_text)
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(theme.bg()).fg(theme.fg()))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help (Esc to close) ")
                .border_style(Style::default().fg(theme.highlight())),
        );
    f.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerOptions;
    use crate::logging::LogBuffer;
    use ratatui::backend::TestBackend;
    use std::io::Write;

    fn app() -> App {
        let controller =
            Controller::open(ControllerOptions::default(), LogBuffer::new_shared()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        App::new(
            controller,
            TuiOptions {
                theme: Theme::Dark,
                tick: Duration::from_millis(10),
                editor: EditorCapability::Plain,
            },
            UiState::default(),
            ProfileStore::load_from(dir.path().join("connections.json")),
        )
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut App, c: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn wait(app: &mut App) {
        for _ in 0..2_000 {
            app.on_tick();
            if !app.controller().is_busy() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("query did not complete");
    }

    #[test]
    fn test_typing_and_running_a_query() {
        let mut app = app();
        assert_eq!(app.focus(), Focus::Editor);
        type_text(&mut app, "SELECT 7 AS seven");
        press(&mut app, KeyCode::F(5));
        assert!(app.controller().is_busy());
        wait(&mut app);
        assert_eq!(app.controller().grid().headers, vec!["seven"]);
        assert_eq!(app.tab, BottomTab::Results);
    }

    #[test]
    fn test_failed_query_switches_to_messages() {
        let mut app = app();
        type_text(&mut app, "SELEC nonsense");
        ctrl(&mut app, 'e');
        wait(&mut app);
        assert_eq!(app.tab, BottomTab::Messages);
    }

    #[test]
    fn test_command_mode_from_tree() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus(), Focus::Tree);
        press(&mut app, KeyCode::Char(':'));
        assert_eq!(app.mode(), &Mode::Command);
        type_text(&mut app, "theme blue");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode(), &Mode::Normal);
        assert_eq!(app.theme(), Theme::Blue);

        press(&mut app, KeyCode::Char(':'));
        type_text(&mut app, "bogus");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.status_text(), Some("Unknown command: bogus"));
    }

    #[test]
    fn test_load_then_insert_select_from_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales-2024.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "region,amount\nnorth,10\nsouth,20").unwrap();

        let mut app = app();
        app.run_command(Command::Load {
            path: path.clone(),
            format: None,
        });
        assert_eq!(app.ui_state.recent_files[0].path, path);

        app.focus = Focus::Tree;
        // memory / main / Tables / sales_2024
        for _ in 0..3 {
            press(&mut app, KeyCode::Down);
        }
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.focus(), Focus::Editor);
        assert_eq!(
            app.editor().text(),
            "SELECT * FROM \"memory\".\"main\".\"sales_2024\" LIMIT 100;"
        );

        app.focus = Focus::Tree;
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(
            app.mode(),
            &Mode::ConfirmDrop("memory.main.sales_2024".to_string())
        );
        press(&mut app, KeyCode::Char('y'));
        assert!(app.controller().catalog().is_empty());
    }

    #[test]
    fn test_profile_commands_persist_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("connections.json");
        let controller =
            Controller::open(ControllerOptions::default(), LogBuffer::new_shared()).unwrap();
        let mut app = App::new(
            controller,
            TuiOptions {
                theme: Theme::Dark,
                tick: Duration::from_millis(10),
                editor: EditorCapability::Plain,
            },
            UiState::default(),
            ProfileStore::load_from(&store_path),
        );

        app.run_command(
            Command::parse("profile add warehouse mysql host=db port=3307 user=ro password=secret")
                .unwrap(),
        );
        assert_eq!(app.status_text(), Some("Saved connection profile 'warehouse'"));
        let saved = ProfileStore::load_from(&store_path);
        assert_eq!(saved.get("warehouse").unwrap().port, 3307);

        app.run_command(Command::parse("profile list").unwrap());
        assert_eq!(app.tab, BottomTab::Messages);
        let listed = app.controller().messages().last(LogLevel::Info).unwrap();
        assert_eq!(listed.message, "warehouse: mysql ro@db:3307/");
        assert!(!listed.message.contains("secret"));

        app.run_command(Command::parse("profile rm warehouse").unwrap());
        assert!(ProfileStore::load_from(&store_path).list().is_empty());
        app.run_command(Command::parse("profile rm warehouse").unwrap());
        assert_eq!(app.status_text(), Some("No connection profile named 'warehouse'"));
    }

    #[test]
    fn test_recent_lists_and_reloads_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.json");
        std::fs::write(&first, "a\n1\n").unwrap();
        std::fs::write(&second, "[{\"b\": 2}]").unwrap();

        let mut app = app();
        app.run_command(Command::Recent(None));
        assert_eq!(
            app.controller().messages().last(LogLevel::Info).unwrap().message,
            "No recent files"
        );

        app.load(&first, None);
        app.load(&second, None);
        app.run_command(Command::Recent(None));
        assert_eq!(app.tab, BottomTab::Messages);
        let listed = app.controller().messages().last(LogLevel::Info).unwrap();
        assert_eq!(listed.message, format!("2. {} (csv)", first.display()));

        app.run_command(Command::Recent(Some(2)));
        assert_eq!(app.status_text(), Some("Loaded table first_1"));
        assert_eq!(app.ui_state.recent_files[0].path, first);

        app.run_command(Command::Recent(Some(9)));
        assert_eq!(app.status_text(), Some("No recent file #9"));
    }

    #[test]
    fn test_popup_blocks_keys_until_dismissed() {
        let mut app = app();
        app.load(Path::new("/no/such/file.csv"), None);
        assert!(app.controller().popup().is_some());
        press(&mut app, KeyCode::F(5));
        assert!(!app.controller().is_busy());
        press(&mut app, KeyCode::Esc);
        assert!(app.controller().popup().is_none());
    }

    #[test]
    fn test_draws_without_panicking() {
        let mut app = app();
        type_text(&mut app, "SELECT NULL AS empty, 'x' AS letter");
        press(&mut app, KeyCode::F(5));
        wait(&mut app);
        app.mode = Mode::Help;

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(f, &app)).unwrap();
        app.mode = Mode::Normal;
        terminal.draw(|f| ui(f, &app)).unwrap();
    }
}
