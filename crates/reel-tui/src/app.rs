//! App: the terminal event loop.
//!
//! Architecture:
//! - `App` owns every piece of client state: the row board, the card preview
//!   scheduler, the hero controller and the cursor.
//! - Background tasks (terminal input, row loads, debounce timers, fetches)
//!   never touch that state; they send messages over `tokio::mpsc` and the
//!   loop applies them one at a time.
//! - The loop draws a frame only after something changed.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph, Wrap},
    Terminal,
};
use reel_proto::catalog::{CatalogBucket, Item};
use reel_proto::config::ClientConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::hero::{HeroController, HeroMedia, HeroResolved};
use crate::preview::{CardKey, PreviewEvent, PreviewScheduler, PreviewSurface};
use crate::query::CatalogQuery;
use crate::rows::{spawn_row_loads, RowBoard, RowState, RowUpdate};
use crate::theme::{
    style_muted, style_secondary, style_title, C_BG, C_ERROR, C_LINK, C_PENDING, C_SECONDARY,
};
use crate::widgets::{
    card::{draw_card, truncate_to_width, CARD_HEIGHT, CARD_WIDTH},
    pane_chrome::{pane_chrome, Badge},
    status_bar,
    toast::ToastManager,
};

const HERO_HEIGHT: u16 = 9;
/// Row heading plus the card strip.
const ROW_HEIGHT: u16 = CARD_HEIGHT + 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursor {
    row: usize,
    col: usize,
}

/// Receiving ends of the background channels, handed to `run`.
pub struct AppChannels {
    rows: mpsc::Receiver<RowUpdate>,
    previews: mpsc::Receiver<PreviewEvent>,
    hero: mpsc::Receiver<HeroResolved>,
}

pub struct App {
    client: Arc<dyn CatalogQuery>,
    endpoint: String,
    row_limit: usize,

    board: RowBoard,
    row_tx: mpsc::Sender<RowUpdate>,
    /// The load started by the latest `reload`.
    row_loads: Option<JoinHandle<()>>,
    previews: PreviewScheduler,
    hero: HeroController,

    cursor: Cursor,
    hovered: Option<CardKey>,
    row_scroll: usize,
    /// Where each card was drawn last frame, for mouse hit-testing.
    card_areas: Vec<(CardKey, Rect)>,

    toast: ToastManager,
    should_quit: bool,
}

impl App {
    pub fn new(
        client: Arc<dyn CatalogQuery>,
        config: &ClientConfig,
        buckets: &[CatalogBucket],
    ) -> (Self, AppChannels) {
        let (row_tx, rows) = mpsc::channel(64);
        let (previews, preview_rx) = PreviewScheduler::new(
            client.clone(),
            Duration::from_millis(config.hover_delay_ms),
        );
        let (hero, hero_rx) = HeroController::new(client.clone());

        let app = Self {
            client,
            endpoint: config.dispatcher_url.clone(),
            row_limit: config.row_limit,
            board: RowBoard::new(buckets),
            row_tx,
            row_loads: None,
            previews,
            hero,
            cursor: Cursor::default(),
            hovered: None,
            row_scroll: 0,
            card_areas: Vec::new(),
            toast: ToastManager::new(),
            should_quit: false,
        };
        let channels = AppChannels {
            rows,
            previews: preview_rx,
            hero: hero_rx,
        };
        (app, channels)
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self, channels: AppChannels) -> anyhow::Result<()> {
        let AppChannels {
            rows: mut row_rx,
            previews: mut preview_rx,
            hero: mut hero_rx,
        } = channels;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        // ── Background task: keyboard/mouse events ────────────────────────────
        let (input_tx, mut input_rx) = mpsc::channel::<Event>(256);
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if input_tx.blocking_send(ev).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        self.reload();

        let mut toast_tick = tokio::time::interval(Duration::from_millis(250));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(ev) = input_rx.recv() => {
                    needs_redraw = self.handle_event(ev);
                }
                Some(update) = row_rx.recv() => {
                    needs_redraw = self.on_row_update(update);
                }
                Some(ev) = preview_rx.recv() => {
                    needs_redraw = self.previews.handle(ev);
                }
                Some(resolved) = hero_rx.recv() => {
                    needs_redraw = self.hero.on_resolved(resolved);
                }
                _ = toast_tick.tick() => {
                    needs_redraw = self.toast.tick();
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        self.previews.forget_all();
        if let Some(loads) = self.row_loads.take() {
            loads.abort();
        }
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        info!("reel exiting");

        Ok(())
    }

    // ── State transitions ─────────────────────────────────────────────────────

    /// Drop every card and request all rows again.
    fn reload(&mut self) {
        self.previews.forget_all();
        self.hovered = None;
        if let Some(previous) = self.row_loads.take() {
            previous.abort();
        }
        let generation = self.board.reset();
        info!("reloading {} rows (load {})", self.board.len(), generation);
        self.row_loads = Some(spawn_row_loads(
            self.client.clone(),
            self.board.buckets(),
            self.row_limit,
            generation,
            self.row_tx.clone(),
        ));
    }

    fn on_row_update(&mut self, update: RowUpdate) -> bool {
        let row = update.row;
        if !self.board.apply(update) {
            return false;
        }
        // The row's cards were replaced wholesale.
        self.previews.forget_row(row);
        if self.hovered.is_some_and(|c| c.row == row) {
            self.hovered = None;
        }
        self.clamp_cursor();

        if self.hero.view().is_none() {
            if let Some(item) = self.first_loaded_item() {
                self.hero.show(item);
            }
        }
        true
    }

    fn first_loaded_item(&self) -> Option<Item> {
        self.board
            .rows()
            .iter()
            .find_map(|r| r.items().first().cloned())
    }

    fn set_hover(&mut self, card: Option<CardKey>) {
        if self.hovered == card {
            return;
        }
        if let Some(old) = self.hovered.take() {
            self.previews.pointer_leave(old);
        }
        if let Some(new) = card {
            self.previews.pointer_enter(new);
        }
        self.hovered = card;
    }

    fn card_at(&self, cursor: Cursor) -> Option<(CardKey, &Item)> {
        let item = self.board.rows().get(cursor.row)?.items().get(cursor.col)?;
        Some((
            CardKey {
                row: cursor.row,
                item_id: item.id,
            },
            item,
        ))
    }

    fn clamp_cursor(&mut self) {
        let rows = self.board.rows();
        if rows.is_empty() {
            self.cursor = Cursor::default();
            return;
        }
        self.cursor.row = self.cursor.row.min(rows.len() - 1);
        let len = rows[self.cursor.row].items().len();
        self.cursor.col = self.cursor.col.min(len.saturating_sub(1));
    }

    fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        self.cursor.row = self.cursor.row.saturating_add_signed(d_row);
        self.cursor.col = self.cursor.col.saturating_add_signed(d_col);
        self.clamp_cursor();
        let card = self.card_at(self.cursor).map(|(k, _)| k);
        self.set_hover(card);
    }

    fn select(&mut self, cursor: Cursor) {
        if let Some((_, item)) = self.card_at(cursor) {
            let item = item.clone();
            self.hero.show(item);
        }
    }

    /// Copy the hovered card's preview link, else the hero's trailer link.
    fn copy_link(&mut self) {
        let hovered = self
            .hovered
            .and_then(|card| match self.previews.surface(card) {
                Some(PreviewSurface::Player { url, .. }) => Some(url.as_str()),
                _ => None,
            });
        let Some(url) = hovered.or(self.hero.watch_url()).map(str::to_string) else {
            self.toast.info("no trailer to copy");
            return;
        };
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(url.clone())) {
            Ok(()) => self.toast.success(format!("copied: {}", url)),
            Err(e) => {
                warn!("clipboard error: {}", e);
                self.toast.error(format!("clipboard error: {}", e));
            }
        }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    fn handle_event(&mut self, ev: Event) -> bool {
        match ev {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                self.handle_key(key);
                true
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(_, _) => true,
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, 0),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, 0),
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(0, -1),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(0, 1),
            KeyCode::Enter => self.select(self.cursor),
            KeyCode::Char('r') => {
                self.toast.info("reloading catalog");
                self.reload();
            }
            KeyCode::Char('y') => self.copy_link(),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> bool {
        fn hit(r: Rect, col: u16, row: u16) -> bool {
            r.width > 0
                && r.height > 0
                && col >= r.x
                && col < r.x + r.width
                && row >= r.y
                && row < r.y + r.height
        }

        let target = self
            .card_areas
            .iter()
            .find(|(_, r)| hit(*r, event.column, event.row))
            .map(|(k, _)| *k);

        match event.kind {
            MouseEventKind::Moved => {
                let changed = self.hovered != target;
                self.set_hover(target);
                changed
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(card) = target else { return false };
                let col = self
                    .board
                    .rows()
                    .get(card.row)
                    .and_then(|r| r.items().iter().position(|i| i.id == card.item_id));
                if let Some(col) = col {
                    self.cursor = Cursor { row: card.row, col };
                    self.set_hover(Some(card));
                    self.select(self.cursor);
                }
                true
            }
            MouseEventKind::ScrollUp => {
                self.move_cursor(-1, 0);
                true
            }
            MouseEventKind::ScrollDown => {
                self.move_cursor(1, 0);
                true
            }
            _ => false,
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HERO_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        self.draw_hero(frame, outer[0]);
        self.draw_rows(frame, outer[1]);

        let degraded = self
            .board
            .rows()
            .iter()
            .any(|r| matches!(r.state, RowState::Failed(_)));
        status_bar::draw_keys_bar(frame, outer[2], &self.endpoint, degraded);

        self.toast.draw(frame, area);
    }

    fn draw_hero(&self, frame: &mut ratatui::Frame, area: Rect) {
        let Some(view) = self.hero.view() else {
            let block = pane_chrome("reel", false, None);
            let hint = Paragraph::new(Line::from(Span::styled(
                "Select a title with Enter or a click.",
                style_muted(),
            )))
            .block(block);
            frame.render_widget(hint, area);
            return;
        };

        let badge = match &view.media {
            HeroMedia::Loading => Some(Badge {
                text: "LOADING",
                color: C_PENDING,
            }),
            HeroMedia::Player { label, .. } => Some(Badge {
                text: label,
                color: C_LINK,
            }),
            HeroMedia::Still(_) => Some(Badge {
                text: "STILL",
                color: C_SECONDARY,
            }),
            HeroMedia::Empty => None,
        };
        let block = pane_chrome(view.item.display_title(), true, badge);

        let media_line = match &view.media {
            HeroMedia::Loading => Line::from(Span::styled("loading preview…", style_muted())),
            HeroMedia::Player { url, .. } => Line::from(vec![
                Span::styled("▶ ", style_title()),
                Span::styled(url.as_str(), Style::default().fg(C_LINK)),
            ]),
            HeroMedia::Still(url) => Line::from(vec![
                Span::styled("still ", style_secondary()),
                Span::styled(url.as_str(), Style::default().fg(C_LINK)),
            ]),
            HeroMedia::Empty => Line::from(Span::styled("no preview", style_muted())),
        };

        let text = vec![
            media_line,
            Line::raw(""),
            Line::from(Span::styled(view.item.overview(), style_secondary())),
        ];
        frame.render_widget(
            Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
            area,
        );
    }

    fn draw_rows(&mut self, frame: &mut ratatui::Frame, area: Rect) {
        self.card_areas.clear();
        let visible_rows = ((area.height / ROW_HEIGHT) as usize).max(1);
        if self.cursor.row < self.row_scroll {
            self.row_scroll = self.cursor.row;
        } else if self.cursor.row >= self.row_scroll + visible_rows {
            self.row_scroll = self.cursor.row + 1 - visible_rows;
        }
        let visible_cards = ((area.width / CARD_WIDTH) as usize).max(1);

        let mut y = area.y;
        for (index, row) in self.board.rows().iter().enumerate().skip(self.row_scroll) {
            if y + ROW_HEIGHT > area.y + area.height {
                break;
            }
            let focused_row = index == self.cursor.row;
            let heading = Rect::new(area.x, y, area.width, 1);
            let strip = Rect::new(area.x, y + 1, area.width, CARD_HEIGHT);
            y += ROW_HEIGHT;

            let heading_style = if focused_row { style_title() } else { style_secondary() };
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    format!(" {}", truncate_to_width(&row.bucket.name, area.width as usize)),
                    heading_style,
                ))),
                heading,
            );

            let items = match &row.state {
                RowState::Loading => {
                    frame.render_widget(
                        Paragraph::new(Span::styled("  Loading…", style_muted())),
                        strip,
                    );
                    continue;
                }
                RowState::Failed(message) => {
                    frame.render_widget(
                        Paragraph::new(Span::styled(
                            format!("  {}", message),
                            Style::default().fg(C_ERROR),
                        )),
                        strip,
                    );
                    continue;
                }
                RowState::Loaded(items) if items.is_empty() => {
                    frame.render_widget(
                        Paragraph::new(Span::styled("  Nothing here.", style_muted())),
                        strip,
                    );
                    continue;
                }
                RowState::Loaded(items) => items,
            };

            let first = if focused_row && self.cursor.col >= visible_cards {
                self.cursor.col + 1 - visible_cards
            } else {
                0
            };
            for (slot, (col, item)) in items.iter().enumerate().skip(first).take(visible_cards).enumerate() {
                let card = CardKey {
                    row: index,
                    item_id: item.id,
                };
                let rect = Rect::new(
                    strip.x + slot as u16 * CARD_WIDTH,
                    strip.y,
                    CARD_WIDTH.min(strip.width.saturating_sub(slot as u16 * CARD_WIDTH)),
                    CARD_HEIGHT,
                );
                let focused = focused_row && col == self.cursor.col;
                draw_card(
                    frame,
                    rect,
                    item,
                    focused,
                    self.previews.phase(card),
                    self.previews.surface(card),
                );
                self.card_areas.push((card, rect));
            }
        }
    }
}
