//! Status bar: bottom line with dispatcher endpoint and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_ACCENT, C_MUTED, C_PLAYING, C_SECONDARY};

const KEYS: &str =
    " ←↓↑→/hjkl move  Enter show  mouse hover/click  r reload  y copy link  q quit";

/// Draw the keybindings footer bar (one row).  The dot goes red while any
/// row has failed to load.
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, endpoint: &str, degraded: bool) {
    let dot = if degraded {
        Span::styled("●", Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("●", Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD))
    };

    let line = Line::from(vec![
        Span::styled(" REEL ", Style::default().fg(C_SECONDARY).add_modifier(Modifier::BOLD)),
        dot,
        Span::raw(" "),
        Span::styled(endpoint, Style::default().fg(C_MUTED)),
        Span::styled(KEYS, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
