use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::rc::Rc;
use textwrap::fill;

use crate::config::Controls;
use crate::document::{LineKind, RenderedDocument};
use crate::form::{Field, FormState};
use crate::payload::SELECTED_VARIABLES;

const PAGE_SCROLL: u16 = 10;
const PAN_STEP: u16 = 8;

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    scroll_position: u16,
    max_scroll: u16,
    pan_position: u16,
    max_pan: u16,
}

#[derive(Debug, Clone)]
pub enum UIState {
    Form {
        form: FormState,
        status: Option<String>,
    },
    Confirmation {
        api_url: String,
        controls: Controls,
        status: Option<String>,
    },
    Document {
        document: RenderedDocument,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub enum UserAction {
    Quit,
    NextField,
    PrevField,
    NextOption,
    PrevOption,
    InputChar(char),
    Backspace,
    Submit,
    Confirm,
    Cancel,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    PanLeft,
    PanRight,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            scroll_position: 0,
            max_scroll: 0,
            pan_position: 0,
            max_pan: 0,
        })
    }

    pub fn cleanup(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    pub fn render(&mut self, state: &UIState) -> Result<()> {
        if let UIState::Document { document } = state {
            let size = self.terminal.size()?;
            self.max_scroll = Self::document_max_scroll(document, size);
            self.scroll_position = self.scroll_position.min(self.max_scroll);
            self.max_pan = Self::document_max_pan(document, size);
            self.pan_position = self.pan_position.min(self.max_pan);
        }

        let scroll = (self.scroll_position, self.pan_position);
        self.terminal.draw(|f| Self::draw(f, state, scroll))?;
        Ok(())
    }

    /// `scroll` is the document's (row, column) offset.
    pub fn draw(f: &mut Frame, state: &UIState, scroll: (u16, u16)) {
        match state {
            UIState::Form { form, status } => Self::render_form(f, form, status.as_deref()),
            UIState::Confirmation {
                api_url,
                controls,
                status,
            } => Self::render_confirmation(f, api_url, *controls, status.as_deref()),
            UIState::Document { document } => Self::render_document(f, document, scroll),
        }
    }

    fn screen_layout(area: Rect) -> Rc<[Rect]> {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(area)
    }

    fn render_title(f: &mut Frame, area: Rect, title: &str) {
        f.render_widget(
            Paragraph::new(title.to_string())
                .style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .block(Block::default().borders(Borders::ALL).title("ACS Data Selection")),
            area,
        );
    }

    fn render_form(f: &mut Frame, form: &FormState, status: Option<&str>) {
        let chunks = Self::screen_layout(f.size());
        Self::render_title(f, chunks[0], "📊 Select a table, year and geography");

        let label_width = form
            .fields()
            .iter()
            .map(|field| field.label.len())
            .max()
            .unwrap_or(0);

        let focused_name = form.focused_field().map(|field| field.name);
        let items: Vec<ListItem> = form
            .fields()
            .iter()
            .filter(|field| form.is_visible(field))
            .map(|field| Self::field_item(field, Some(field.name) == focused_name, label_width))
            .collect();

        f.render_widget(
            List::new(items).block(Block::default().borders(Borders::ALL).title("📝 Form")),
            chunks[1],
        );

        let footer = match status {
            Some(status) => Line::from(Span::styled(
                status.to_string(),
                Style::default().fg(Color::Yellow),
            )),
            None => Self::help_line(&[
                ("Tab/↑↓", "Field"),
                ("←→", "Option"),
                ("Enter", "Generate URL"),
                ("Esc", "Quit"),
            ]),
        };
        f.render_widget(
            Paragraph::new(footer)
                .block(Block::default().borders(Borders::ALL).title("⌨️ Controls")),
            chunks[2],
        );
    }

    fn field_item(field: &Field, focused: bool, label_width: usize) -> ListItem<'static> {
        let indent = if field.name == SELECTED_VARIABLES {
            "  └ "
        } else {
            ""
        };
        let value = if field.is_select() {
            format!("◀ {} ▶", field.display_value())
        } else if focused {
            format!("{}▏", field.display_value())
        } else {
            field.display_value()
        };

        let label_style = if focused {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        ListItem::new(Line::from(vec![
            Span::styled(
                format!("{}{:<width$}", indent, field.label, width = label_width),
                label_style,
            ),
            Span::raw("  "),
            Span::styled(value, Style::default().fg(Color::White)),
        ]))
    }

    fn render_confirmation(f: &mut Frame, api_url: &str, controls: Controls, status: Option<&str>) {
        let chunks = Self::screen_layout(f.size());
        Self::render_title(f, chunks[0], "🔗 Retrieve data from this URL?");

        let width = chunks[1].width.saturating_sub(4) as usize;
        f.render_widget(
            Paragraph::new(fill(api_url, width.max(1)))
                .style(Style::default().fg(Color::Blue))
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Generated API URL"),
                ),
            chunks[1],
        );

        let mut keys = Vec::new();
        if controls.confirm {
            keys.push(("y/Enter", "Yes, retrieve"));
        }
        if controls.cancel {
            keys.push(("n/Esc", "No, edit form"));
        }
        keys.push(("q", "Quit"));

        let footer = match status {
            Some(status) => Line::from(Span::styled(
                status.to_string(),
                Style::default().fg(Color::Yellow),
            )),
            None => Self::help_line(&keys),
        };
        f.render_widget(
            Paragraph::new(footer)
                .block(Block::default().borders(Borders::ALL).title("⌨️ Controls")),
            chunks[2],
        );
    }

    fn render_document(f: &mut Frame, document: &RenderedDocument, (scroll, pan): (u16, u16)) {
        let chunks = Self::screen_layout(f.size());
        let title = if document.title.is_empty() {
            "📄 Results".to_string()
        } else {
            format!("📄 {}", document.title)
        };
        Self::render_title(f, chunks[0], &title);

        let area = chunks[1];
        let lines = document.lines(area.width.saturating_sub(4) as usize);
        let visible_height = area.height.saturating_sub(2) as usize;
        let max_scroll = lines.len().saturating_sub(visible_height);

        let start_index = (scroll as usize).min(max_scroll);
        let end_index = (start_index + visible_height).min(lines.len());
        let visible_lines: Vec<Line> = lines[start_index..end_index]
            .iter()
            .map(|line| Line::from(Span::styled(line.text.clone(), Self::line_style(line.kind))))
            .collect();

        f.render_widget(
            Paragraph::new(visible_lines)
                .scroll((0, pan))
                .block(Block::default().borders(Borders::ALL).title("Document")),
            area,
        );

        if max_scroll > 0 {
            let scrollbar = Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None);
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(lines.len())
                .position(start_index);
            f.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
        }

        f.render_widget(
            Paragraph::new(Self::help_line(&[
                ("↑↓", "Scroll"),
                ("←→", "Pan"),
                ("PgUp/PgDn", "Page"),
                ("q", "Quit"),
            ]))
                .block(Block::default().borders(Borders::ALL).title("⌨️ Controls")),
            chunks[2],
        );
    }

    fn document_max_scroll(document: &RenderedDocument, size: Rect) -> u16 {
        let area = Self::screen_layout(size)[1];
        let lines = document.lines(area.width.saturating_sub(4) as usize);
        let visible_height = area.height.saturating_sub(2) as usize;
        lines.len().saturating_sub(visible_height).min(u16::MAX as usize) as u16
    }

    /// Wide tables are not wrapped, so the widest line sets how far the view can pan.
    fn document_max_pan(document: &RenderedDocument, size: Rect) -> u16 {
        let area = Self::screen_layout(size)[1];
        let widest = document
            .lines(area.width.saturating_sub(4) as usize)
            .iter()
            .map(|line| line.text.chars().count())
            .max()
            .unwrap_or(0);
        let visible_width = area.width.saturating_sub(2) as usize;
        widest.saturating_sub(visible_width).min(u16::MAX as usize) as u16
    }

    fn line_style(kind: LineKind) -> Style {
        match kind {
            LineKind::Heading(1) => Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            LineKind::Heading(_) => Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            LineKind::TableHeader => Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            LineKind::TableRow | LineKind::Text | LineKind::Blank => {
                Style::default().fg(Color::White)
            }
        }
    }

    fn help_line(keys: &[(&str, &str)]) -> Line<'static> {
        let mut spans = Vec::new();
        for (key, action) in keys {
            spans.push(Span::styled(
                key.to_string(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(format!(" {}  ", action)));
        }
        Line::from(spans)
    }

    pub fn get_user_input(&mut self, state: &UIState) -> Result<UserAction> {
        loop {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
                {
                    return Ok(UserAction::Quit);
                }

                match state {
                    UIState::Form { .. } => match key.code {
                        KeyCode::Esc => return Ok(UserAction::Quit),
                        KeyCode::Enter => return Ok(UserAction::Submit),
                        KeyCode::Tab | KeyCode::Down => return Ok(UserAction::NextField),
                        KeyCode::BackTab | KeyCode::Up => return Ok(UserAction::PrevField),
                        KeyCode::Left => return Ok(UserAction::PrevOption),
                        KeyCode::Right => return Ok(UserAction::NextOption),
                        KeyCode::Backspace => return Ok(UserAction::Backspace),
                        KeyCode::Char(c) => return Ok(UserAction::InputChar(c)),
                        _ => continue,
                    },
                    UIState::Confirmation { controls, .. } => match key.code {
                        KeyCode::Char('y') | KeyCode::Enter if controls.confirm => {
                            return Ok(UserAction::Confirm)
                        }
                        KeyCode::Char('n') | KeyCode::Esc if controls.cancel => {
                            return Ok(UserAction::Cancel)
                        }
                        KeyCode::Char('q') => return Ok(UserAction::Quit),
                        _ => continue,
                    },
                    UIState::Document { .. } => match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(UserAction::Quit),
                        KeyCode::Up => return Ok(UserAction::ScrollUp),
                        KeyCode::Down => return Ok(UserAction::ScrollDown),
                        KeyCode::PageUp => return Ok(UserAction::PageUp),
                        KeyCode::PageDown => return Ok(UserAction::PageDown),
                        KeyCode::Left => return Ok(UserAction::PanLeft),
                        KeyCode::Right => return Ok(UserAction::PanRight),
                        _ => continue,
                    },
                }
            }
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_position = self.scroll_position.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        if self.scroll_position < self.max_scroll {
            self.scroll_position += 1;
        }
    }

    pub fn page_up(&mut self) {
        self.scroll_position = self.scroll_position.saturating_sub(PAGE_SCROLL);
    }

    pub fn page_down(&mut self) {
        self.scroll_position = (self.scroll_position + PAGE_SCROLL).min(self.max_scroll);
    }

    pub fn pan_left(&mut self) {
        self.pan_position = self.pan_position.saturating_sub(PAN_STEP);
    }

    pub fn pan_right(&mut self) {
        self.pan_position = (self.pan_position + PAN_STEP).min(self.max_pan);
    }

    pub fn reset_scroll(&mut self) {
        self.scroll_position = 0;
        self.pan_position = 0;
    }
}
