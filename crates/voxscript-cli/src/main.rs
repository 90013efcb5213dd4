use anyhow::Result;
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block as Widget, Borders, Paragraph, Wrap},
};
use std::{
    cell::RefCell,
    env,
    io::stdout,
    path::PathBuf,
    process,
    rc::Rc,
    time::{Duration, Instant},
};
use voxscript_config::Config;
use voxscript_engine::surface::render::{format_pause_label, is_valid_block_node, read_back};
use voxscript_engine::units::DEFAULT_PAUSE_MS;
use voxscript_engine::{Block, Document, EditController, EditState, Notify, io};

/// Routes engine warnings into the status line.
#[derive(Clone, Default)]
struct StatusLine(Rc<RefCell<Option<String>>>);

impl Notify for StatusLine {
    fn warn(&mut self, message: &str) {
        *self.0.borrow_mut() = Some(message.to_string());
    }
}

struct App {
    controller: EditController<StatusLine>,
    status: StatusLine,
    script_path: PathBuf,
    /// Selection anchor while shift-extending, as a logical offset.
    anchor: Option<usize>,
    /// Mirror of the caret's logical offset.
    head: usize,
}

impl App {
    fn new(script_path: PathBuf, doc: Document, default_pause_ms: Option<u64>) -> Self {
        let status = StatusLine::default();
        let mut controller = EditController::new(doc, status.clone());
        if let Some(duration_ms) = default_pause_ms {
            controller.set_default_pause_ms(duration_ms);
        }
        let end = controller.document().total_len();
        controller.set_caret_by_offset(end);
        Self {
            controller,
            status,
            script_path,
            anchor: None,
            head: end,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        *self.status.0.borrow_mut() = Some(message.into());
    }

    fn save(&mut self) {
        self.controller.force_sync();
        match io::write_script(&self.script_path, self.controller.document()) {
            Ok(()) => self.set_status(format!("saved {}", self.script_path.display())),
            Err(e) => self.set_status(format!("save failed: {e}")),
        }
    }

    fn move_caret(&mut self, forward: bool, extend: bool) {
        let doc = self.controller.document();
        let head = self.head.min(doc.total_len());
        let new_head = if forward {
            doc.next_offset(head)
        } else {
            doc.prev_offset(head)
        };
        if extend {
            let anchor = *self.anchor.get_or_insert(head);
            self.head = new_head;
            self.controller.select_offsets(anchor, new_head);
        } else {
            self.anchor = None;
            self.head = new_head;
            self.controller.set_caret_by_offset(new_head);
        }
    }

    fn jump_caret(&mut self, offset: usize) {
        self.anchor = None;
        self.head = offset;
        self.controller.set_caret_by_offset(offset);
    }

    /// Open the floating editor on the token the caret touches, if any.
    fn edit_adjacent_token(&mut self) {
        let doc = self.controller.document();
        let Some(position) = doc.find_position_by_offset(self.head.min(doc.total_len())) else {
            return;
        };
        let blocks = doc.blocks();
        let index = if blocks[position.index].is_atomic() {
            Some(position.index)
        } else if position.is_end
            && blocks.get(position.index + 1).is_some_and(Block::is_atomic)
        {
            Some(position.index + 1)
        } else if position.is_start
            && position.index > 0
            && blocks[position.index - 1].is_atomic()
        {
            Some(position.index - 1)
        } else {
            None
        };
        let Some(index) = index else {
            self.set_status("move the caret next to a pause or alias first");
            return;
        };

        let surface = self.controller.surface();
        let root = surface.root();
        let Some(&node) = surface
            .children(root)
            .iter()
            .filter(|&&child| is_valid_block_node(surface, child))
            .nth(index)
        else {
            return;
        };
        self.controller.open_edit(node);
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let now = Instant::now();
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        if self.controller.is_editor_open() {
            self.handle_editor_key(key, ctrl);
        } else {
            match key.code {
                KeyCode::Char('q') if ctrl => return true,
                KeyCode::Char('s') if ctrl => self.save(),
                KeyCode::Char('p') if ctrl => {
                    self.controller.capture_selection();
                    self.controller.add_break();
                    self.anchor = None;
                }
                KeyCode::Char('a') if ctrl => {
                    self.controller.capture_selection();
                    self.controller.open_add_alias_popover();
                }
                KeyCode::Char('e') if ctrl => self.edit_adjacent_token(),
                KeyCode::Left => self.move_caret(false, shift),
                KeyCode::Right => self.move_caret(true, shift),
                KeyCode::Home => self.jump_caret(0),
                KeyCode::End => {
                    let end = self.controller.document().total_len();
                    self.jump_caret(end);
                }
                KeyCode::Backspace => {
                    self.controller.handle_delete_key(true, now);
                    self.anchor = None;
                }
                KeyCode::Delete => {
                    self.controller.handle_delete_key(false, now);
                    self.anchor = None;
                }
                KeyCode::Char(c) if !ctrl => {
                    self.controller.handle_text_input(&c.to_string(), now);
                    self.anchor = None;
                }
                _ => {}
            }
        }

        if let Some(offset) = self.controller.caret_offset() {
            self.head = offset;
        }
        false
    }

    fn handle_editor_key(&mut self, key: KeyEvent, ctrl: bool) {
        match (self.controller.state(), key.code) {
            (_, KeyCode::Esc) => self.controller.close_editor(),
            (EditState::EditingAlias { .. }, KeyCode::Enter) => self.controller.confirm_alias(),
            (EditState::EditingAlias { index: Some(_) }, KeyCode::Char('d')) if ctrl => {
                self.controller.remove_alias();
            }
            (EditState::EditingAlias { .. }, KeyCode::Backspace) => {
                let mut text = self.controller.alias_text().to_string();
                text.pop();
                self.controller.set_alias_text(text);
            }
            (EditState::EditingAlias { .. }, KeyCode::Char(c)) if !ctrl => {
                let mut text = self.controller.alias_text().to_string();
                text.push(c);
                self.controller.set_alias_text(text);
            }
            (EditState::EditingBreak { .. }, KeyCode::Char('+' | '=')) => {
                let seconds = self.controller.break_seconds();
                self.controller.change_break(seconds + 0.1);
            }
            (EditState::EditingBreak { .. }, KeyCode::Char('-')) => {
                let seconds = self.controller.break_seconds();
                self.controller.change_break(seconds - 0.1);
            }
            (EditState::EditingBreak { .. }, KeyCode::Char('d')) => self.controller.remove_break(),
            (EditState::EditingBreak { .. }, KeyCode::Enter) => self.controller.close_editor(),
            _ => {}
        }
    }

    fn selection(&self) -> Option<(usize, usize)> {
        let anchor = self.anchor?;
        if anchor == self.head {
            return None;
        }
        Some((anchor.min(self.head), anchor.max(self.head)))
    }
}

fn seed_document() -> Document {
    Document::from_blocks(vec![
        Block::text("Hi, I am a "),
        Block::alias("programmer", "engineer"),
        Block::text(", and this is my "),
        Block::pause(DEFAULT_PAUSE_MS),
        Block::text("narration editor."),
    ])
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    // Determine the script path from CLI args or the config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let script_path;
    let mut default_pause_ms = None;

    if args.len() == 2 {
        script_path = PathBuf::from(&args[1]);
    } else if args.len() == 1 {
        match Config::load() {
            Ok(Some(config)) => {
                script_path = config.script_path;
                default_pause_ms = config.default_pause_ms;
            }
            Ok(None) => {
                eprintln!("Error: No script path provided and no config file found");
                eprintln!("Usage: {} <script.json>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                eprintln!("Usage: {} <script.json>", args[0]);
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [script.json]", args[0]);
        process::exit(1);
    };

    // A missing file starts a fresh narration; anything else must parse.
    let doc = if script_path.exists() {
        match io::read_script(&script_path) {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!("Error: cannot open script '{}': {e}", script_path.display());
                process::exit(1);
            }
        }
    } else {
        seed_document()
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(script_path, doc, default_pause_ms);

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    <B as ratatui::backend::Backend>::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = app
            .controller
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_millis(250));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    if app.handle_key(key) {
                        return Ok(());
                    }
                }
                Event::Paste(text) => {
                    app.controller.handle_paste(&text, Instant::now());
                }
                _ => {}
            }
        }
        app.controller.tick(Instant::now());
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    // Narration panel: rendered from the live surface so unsynced
    // keystrokes show immediately.
    let narration = Paragraph::new(Line::from(narration_spans(app)))
        .block(
            Widget::default()
                .borders(Borders::ALL)
                .title(format!("voxscript - {}", app.script_path.display())),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(narration, chunks[0]);

    // Floating editor / status panel.
    let panel = match app.controller.state() {
        EditState::EditingAlias { index } => {
            let verb = if index.is_some() { "Edit" } else { "New" };
            Line::from(vec![
                Span::styled(
                    format!("{verb} alias: "),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(app.controller.alias_text().to_string()),
                Span::styled("▏", Style::default().fg(Color::Yellow)),
                Span::styled(
                    "   Enter confirm · Ctrl-D remove · Esc cancel",
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        }
        EditState::EditingBreak { .. } => Line::from(vec![
            Span::styled("Pause: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("{:.1}s", app.controller.break_seconds())),
            Span::styled(
                "   +/- adjust · d remove · Esc close",
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        EditState::Idle => {
            let message = app.status.0.borrow().clone().unwrap_or_default();
            Line::from(Span::styled(message, Style::default().fg(Color::Yellow)))
        }
    };
    f.render_widget(
        Paragraph::new(panel).block(Widget::default().borders(Borders::ALL)),
        chunks[1],
    );

    let help = Line::from(vec![
        Span::raw("Ctrl-P pause | "),
        Span::raw("Ctrl-A alias | "),
        Span::raw("Ctrl-E edit token | "),
        Span::raw("Shift-←/→ select | "),
        Span::raw("Ctrl-S save | "),
        Span::raw("Ctrl-Q quit"),
    ]);
    f.render_widget(Paragraph::new(help), chunks[2]);
}

fn narration_spans(app: &App) -> Vec<Span<'static>> {
    let surface = app.controller.surface();
    let blocks = read_back(surface);
    let caret = app.controller.caret_offset();
    let selection = app.selection();

    let mut spans = Vec::new();
    let mut offset = 0;
    for block in &blocks {
        match block {
            Block::Text { text } => {
                push_text_spans(&mut spans, text, offset, caret, selection);
                offset += text.len();
            }
            Block::Break { duration_ms } => {
                if caret == Some(offset) {
                    spans.push(caret_span());
                }
                let mut style = Style::default().fg(Color::Cyan);
                if in_selection(selection, offset) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                spans.push(Span::styled(
                    format!("⏱{}", format_pause_label(*duration_ms)),
                    style,
                ));
                offset += 1;
            }
            Block::Alias { text, alias } => {
                if caret == Some(offset) {
                    spans.push(caret_span());
                }
                let mut literal = Style::default().add_modifier(Modifier::UNDERLINED);
                let mut label = Style::default().fg(Color::DarkGray);
                if in_selection(selection, offset) {
                    literal = literal.add_modifier(Modifier::REVERSED);
                    label = label.add_modifier(Modifier::REVERSED);
                }
                spans.push(Span::styled(text.clone(), literal));
                spans.push(Span::styled(
                    format!("({})", voxscript_engine::editing::block::ellipsis(alias, 7)),
                    label,
                ));
                offset += 1;
            }
        }
    }
    if caret.is_some_and(|c| c >= offset) {
        spans.push(caret_span());
    }
    spans
}

fn in_selection(selection: Option<(usize, usize)>, offset: usize) -> bool {
    matches!(selection, Some((start, end)) if offset >= start && offset < end)
}

fn push_text_spans(
    spans: &mut Vec<Span<'static>>,
    text: &str,
    base: usize,
    caret: Option<usize>,
    selection: Option<(usize, usize)>,
) {
    let end = base + text.len();
    if let Some((sel_start, sel_end)) = selection {
        let from = sel_start.clamp(base, end) - base;
        let to = sel_end.clamp(base, end) - base;
        if from > 0 {
            spans.push(Span::raw(text[..from].to_string()));
        }
        if from < to {
            spans.push(Span::styled(
                text[from..to].to_string(),
                Style::default().add_modifier(Modifier::REVERSED),
            ));
        }
        if to < text.len() {
            spans.push(Span::raw(text[to..].to_string()));
        }
    } else if let Some(c) = caret.filter(|&c| c >= base && c < end) {
        let at = c - base;
        if at > 0 {
            spans.push(Span::raw(text[..at].to_string()));
        }
        spans.push(caret_span());
        spans.push(Span::raw(text[at..].to_string()));
    } else {
        spans.push(Span::raw(text.to_string()));
    }
}

fn caret_span() -> Span<'static> {
    Span::styled(
        "▏",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}
