use portal_core::controller::{NetworkRow, PageView, StatusKind};

const BARS: [char; 4] = ['▂', '▄', '▆', '█'];

/// Four-character signal glyph, unlit bars drawn as dots.
pub fn signal_glyph(bars: u8) -> String {
    BARS.iter()
        .enumerate()
        .map(|(i, &c)| if (i as u8) < bars { c } else { '·' })
        .collect()
}

pub fn render_row(row: &NetworkRow) -> String {
    let marker = if row.selected { '>' } else { ' ' };
    format!("{marker} {} {}", signal_glyph(row.bars), row.ssid)
}

pub fn render_page(view: &PageView) -> String {
    let mut out: Vec<String> = view.rows.iter().map(render_row).collect();
    if let Some(status) = &view.status {
        let tag = match status.kind {
            StatusKind::Info => "info",
            StatusKind::Success => "ok",
            StatusKind::Error => "error",
        };
        out.push(format!("[{tag}] {}", status.text));
    }
    out.join("\n")
}
