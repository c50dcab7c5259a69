//! Catalog card: one item in a row with its hover preview state.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use reel_proto::catalog::Item;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::preview::{PreviewPhase, PreviewSurface};
use crate::theme::{
    style_default, style_focused_border, style_muted, style_secondary, style_selected_focused,
    style_unfocused_border, C_LINK, C_PENDING,
};

pub const CARD_WIDTH: u16 = 24;
pub const CARD_HEIGHT: u16 = 4;

/// Cut `s` to at most `max_width` terminal columns, ending in `…` when cut.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let target = max_width - 1;
    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > target {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('…');
    out
}

pub fn draw_card(
    frame: &mut Frame,
    area: Rect,
    item: &Item,
    focused: bool,
    phase: PreviewPhase,
    surface: Option<&PreviewSurface>,
) {
    let block = Block::default().borders(Borders::ALL).border_style(if focused {
        style_focused_border()
    } else {
        style_unfocused_border()
    });
    let inner_width = area.width.saturating_sub(2) as usize;

    let title_style = if focused {
        style_selected_focused()
    } else {
        style_default()
    };
    let title = Line::from(Span::styled(
        truncate_to_width(item.display_title(), inner_width),
        title_style,
    ));

    let status = match (phase, surface) {
        (PreviewPhase::Mounted, Some(PreviewSurface::Player { label, .. })) => {
            Span::styled(format!("▶ {}", label), Style::default().fg(C_LINK))
        }
        (PreviewPhase::Mounted, _) => Span::styled("preview not available", style_muted()),
        (PreviewPhase::Fetching, _) => Span::styled("loading preview…", Style::default().fg(C_PENDING)),
        (PreviewPhase::Waiting, _) => Span::styled("·", style_secondary()),
        (PreviewPhase::Idle, _) => Span::raw(""),
    };
    let status = Line::from(Span::styled(
        truncate_to_width(&status.content, inner_width),
        status.style,
    ));

    frame.render_widget(Paragraph::new(vec![title, status]).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_display_width() {
        assert_eq!(truncate_to_width("Alien", 10), "Alien");
        assert_eq!(truncate_to_width("The Empire Strikes Back", 10), "The Empir…");
        // Wide glyphs take two columns each.
        assert_eq!(truncate_to_width("千と千尋の神隠し", 7), "千と千…");
        assert_eq!(truncate_to_width("anything", 0), "");
    }
}
