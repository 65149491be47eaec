use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use filenav::config::Config;
use filenav::navigation::NavKey;
use filenav::navigator::{NavEvent, Navigator, RootState};
use filenav::preview::{Preview, INVALID_ROOT};
use filenav::tree::ViewTree;
use filenav::{logging, Entry};
use indextree::NodeId;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use ratatui::{Frame, Terminal};
use std::io::{self, stdout};
use std::time::{Duration, Instant};
use tracing::info;

/// Columns per tree level.
const INDENT: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    PathInput,
    Tree,
}

#[derive(Default, Clone, Copy)]
struct UiLayoutState {
    path_input_area: Option<Rect>,
    tree_inner_area: Option<Rect>,
}

struct LastClick {
    row: usize,
    at: Instant,
}

struct App {
    navigator: Navigator,
    path_input: String,
    focus: Focus,
    ui_layout: UiLayoutState,
    last_click: Option<LastClick>,
    double_click_window: Duration,
    dirty: bool,
    should_quit: bool,
}

impl App {
    fn new(config: Config) -> Self {
        let root = config.initial_root();
        let double_click_window = Duration::from_millis(config.double_click_ms);
        let mut navigator = Navigator::new(config);
        let path_input = root.to_string_lossy().to_string();
        navigator.set_root_path(&path_input);

        Self {
            navigator,
            path_input,
            focus: Focus::Tree,
            ui_layout: UiLayoutState::default(),
            last_click: None,
            double_click_window,
            dirty: true,
            should_quit: false,
        }
    }

    /// Apply background results and fold navigator events into the redraw flag.
    fn poll_updates(&mut self) {
        self.navigator.pump();
        for event in self.navigator.drain_events() {
            if event == NavEvent::RootChanged {
                self.last_click = None;
            }
            self.dirty = true;
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }
        self.dirty = true;

        if self.focus == Focus::PathInput {
            match key.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => self.focus = Focus::Tree,
                KeyCode::Backspace => {
                    self.path_input.pop();
                    self.navigator.set_root_path(&self.path_input);
                }
                KeyCode::Char(ch) => {
                    self.path_input.push(ch);
                    self.navigator.set_root_path(&self.path_input);
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('/') | KeyCode::Tab => self.focus = Focus::PathInput,
            KeyCode::Esc => self.navigator.handle_key(NavKey::Escape),
            KeyCode::Up => self.navigator.handle_key(NavKey::Up),
            KeyCode::Down => self.navigator.handle_key(NavKey::Down),
            KeyCode::Left => self.navigator.handle_key(NavKey::Left),
            KeyCode::Right => self.navigator.handle_key(NavKey::Right),
            KeyCode::Enter => {
                if let Some(index) = self.navigator.selected_index() {
                    self.navigator.double_click(index);
                }
            }
            _ => {}
        }
    }

    fn on_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.dirty = true;
                if let Some(area) = self.ui_layout.path_input_area {
                    if point_in_rect(area, event.column, event.row) {
                        self.focus = Focus::PathInput;
                        return;
                    }
                }
                if let Some(area) = self.ui_layout.tree_inner_area {
                    if point_in_rect(area, event.column, event.row) {
                        self.focus = Focus::Tree;
                        self.click_tree(area, event.column, event.row);
                    }
                }
            }
            MouseEventKind::ScrollDown => {
                self.navigator.scroll_by(3);
                self.dirty = true;
            }
            MouseEventKind::ScrollUp => {
                self.navigator.scroll_by(-3);
                self.dirty = true;
            }
            _ => {}
        }
    }

    fn click_tree(&mut self, area: Rect, x: u16, y: u16) {
        let row = self.navigator.scroll_offset() + (y - area.y) as usize;
        let Some(&id) = self.navigator.visible().get(row) else {
            return;
        };

        if self.on_chevron(id, area, x) {
            self.last_click = None;
            self.navigator.toggle_row(row);
            return;
        }

        let now = Instant::now();
        let is_double = self
            .last_click
            .as_ref()
            .is_some_and(|last| last.row == row && now.duration_since(last.at) <= self.double_click_window);
        if is_double {
            self.last_click = None;
            self.navigator.double_click(row);
        } else {
            self.last_click = Some(LastClick { row, at: now });
            self.navigator.click(row);
        }
    }

    fn on_chevron(&self, id: NodeId, area: Rect, x: u16) -> bool {
        let Some(tree) = self.navigator.tree() else {
            return false;
        };
        let level = tree.level(id).unwrap_or(0) as u16;
        let chevron_x = area.x.saturating_add(level.saturating_mul(INDENT));
        tree.has_children(id) && (x == chevron_x || x == chevron_x + 1)
    }
}

fn point_in_rect(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn format_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut unit_index = 0;
    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }
    format!("{:.1} {}", value, UNITS[unit_index])
}

struct TreeWidget<'a> {
    tree: &'a ViewTree,
    rows: &'a [NodeId],
    selected: Option<NodeId>,
    focused: bool,
}

impl Widget for TreeWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        for (offset, &id) in self.rows.iter().take(area.height as usize).enumerate() {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            let y = area.y + offset as u16;
            let is_selected = self.selected == Some(id);

            let style = match (is_selected, self.focused) {
                (true, true) => Style::default().bg(Color::Rgb(38, 79, 120)).fg(Color::White),
                (true, false) => Style::default().bg(Color::Rgb(60, 60, 64)).fg(Color::White),
                _ => Style::default(),
            };
            buf.set_style(Rect::new(area.x, y, area.width, 1), style);

            let indent = (node.level as u16).saturating_mul(INDENT);
            let chevron = match (self.tree.has_children(id), node.expanded) {
                (false, _) => "  ",
                (true, true) => "▾ ",
                (true, false) => "▸ ",
            };
            let label_style = if node.entry.is_container() {
                style.add_modifier(Modifier::BOLD)
            } else {
                style
            };

            if indent >= area.width {
                continue;
            }
            let x = area.x + indent;
            let remaining = area.width - indent;
            let (x, _) = buf.set_stringn(x, y, chevron, remaining as usize, style.fg(Color::Gray));
            let remaining = area.right().saturating_sub(x) as usize;
            buf.set_stringn(x, y, node.entry.label(), remaining, label_style);
        }
    }
}

fn dimmed(message: &str) -> Paragraph<'_> {
    Paragraph::new(message)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
}

fn preview_widget(preview: &Preview) -> Paragraph<'_> {
    if let Some(message) = preview.message() {
        return dimmed(message);
    }

    match preview {
        Preview::Text { text, truncated } => {
            let mut lines: Vec<Line> = text.lines().map(|l| Line::from(l.replace('\t', "    "))).collect();
            if *truncated {
                lines.push(Line::from(Span::styled(
                    "… (truncated)",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            Paragraph::new(lines)
        }
        Preview::Image {
            content_type,
            svg,
            bytes,
            truncated,
        } => {
            let kind = if *svg { "vector image" } else { "raster image" };
            let size = if *truncated {
                format!("more than {}", format_size(bytes.len() as u64))
            } else {
                format_size(bytes.len() as u64)
            };
            Paragraph::new(vec![
                Line::from(Span::styled("Image preview", Style::default().add_modifier(Modifier::BOLD))),
                Line::from(format!("{} ({})", kind, content_type)),
                Line::from(size),
            ])
            .alignment(Alignment::Center)
        }
        // Loading shows nothing until the read lands.
        _ => Paragraph::new(""),
    }
}

fn draw_ui(frame: &mut Frame, app: &mut App) {
    let root = frame.area();
    let split = Layout::horizontal([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)]).split(root);
    let left = split[0];
    let right = split[1];

    let left_rows = Layout::vertical([Constraint::Length(3), Constraint::Min(3), Constraint::Length(1)]).split(left);

    let path_focused = app.focus == Focus::PathInput;
    let path_block = Block::default()
        .title(if path_focused { " Path (typing) " } else { " Path " })
        .borders(Borders::ALL)
        .border_style(if path_focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });
    let path_inner = path_block.inner(left_rows[0]);
    frame.render_widget(path_block, left_rows[0]);
    frame.render_widget(Paragraph::new(app.path_input.as_str()), path_inner);
    app.ui_layout.path_input_area = Some(path_inner);

    let tree_focused = app.focus == Focus::Tree;
    let tree_block = Block::default()
        .title(" Files ")
        .borders(Borders::ALL)
        .border_style(if tree_focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        });
    let tree_inner = tree_block.inner(left_rows[1]);
    frame.render_widget(tree_block, left_rows[1]);
    app.ui_layout.tree_inner_area = Some(tree_inner);

    // Render-time trigger: rows about to be drawn get their children listed.
    app.navigator.set_viewport_rows(tree_inner.height as usize);
    app.navigator.ensure_viewport_loaded();

    match (app.navigator.root_state(), app.navigator.tree()) {
        (RootState::Valid, Some(tree)) => {
            let offset = app.navigator.scroll_offset();
            let rows = app.navigator.visible().get(offset..).unwrap_or_default();
            frame.render_widget(
                TreeWidget {
                    tree,
                    rows,
                    selected: app.navigator.selected(),
                    focused: tree_focused,
                },
                tree_inner,
            );
        }
        _ => frame.render_widget(dimmed(INVALID_ROOT).alignment(Alignment::Left), tree_inner),
    }

    let help = app
        .navigator
        .status()
        .unwrap_or("arrows: move  enter: open  /: path  q: quit");
    frame.render_widget(dimmed(help).alignment(Alignment::Left), left_rows[2]);

    let preview_block = Block::default().title(" Preview ").borders(Borders::ALL);
    let preview_inner = preview_block.inner(right);
    frame.render_widget(preview_block, right);
    frame.render_widget(preview_widget(app.navigator.preview()), preview_inner);
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, config: Config) -> io::Result<()> {
    let mut app = App::new(config);

    loop {
        app.poll_updates();

        if app.dirty {
            app.dirty = false;
            terminal.draw(|frame| {
                draw_ui(frame, &mut app);
            })?;
            // Drawing may have scheduled loads or scrolled.
            app.poll_updates();
        }

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                Event::Resize(_, _) => app.dirty = true,
                Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
            }
        }
    }

    Ok(())
}

fn main() -> io::Result<()> {
    let config = Config::discover().map_err(io::Error::other)?;
    if let Some(path) = logging::init(&config.logging).map_err(io::Error::other)? {
        info!(log = %path.display(), "filenav starting");
    }

    enable_raw_mode()?;
    crossterm::execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let app_result = run_app(&mut terminal, config);

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app_result
}
