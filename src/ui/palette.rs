//! Ratatui palette wired to the request sequencer.
//!
//! The loop polls for key events on a short tick, feeds the input buffer to
//! the sequencer, and renders whatever the sequencer says to render. Picking
//! an item quits and hands its locator back to the caller.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs};
use tracing::warn;

use crate::client::sequencer::{RenderState, SearchErrorKind, Sequencer};
use crate::client::transport::{SearchTransport, UdsTransport};
use crate::model::permission::Requester;
use crate::model::types::{DomainId, PanelEntry, ResultItem, SearchResponse};

const TICK_RATE: Duration = Duration::from_millis(30);
const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(2);

/// Domains offered on the tab row, in display order.
const TAB_DOMAINS: [DomainId; 3] = [
    DomainId::Documents,
    DomainId::Accounts,
    DomainId::AdminActions,
];

pub struct PaletteOptions {
    pub socket_path: std::path::PathBuf,
    pub requester: Requester,
    /// Render a single frame and exit.
    pub once: bool,
}

/// Run the palette. Returns the locator of the picked item, if any.
pub async fn run_palette(opts: PaletteOptions) -> Result<Option<String>> {
    let transport = Arc::new(UdsTransport::new(opts.socket_path));
    let mut seq = Sequencer::new(
        Arc::clone(&transport) as Arc<dyn SearchTransport>,
        opts.requester,
    );

    // Best-effort: the palette still works without panels or the menu
    // snapshot, direct lookup just comes up empty.
    match tokio::time::timeout(BOOTSTRAP_TIMEOUT, transport.bootstrap(opts.requester)).await {
        Ok(Ok(boot)) => seq.apply_bootstrap(boot),
        Ok(Err(e)) => warn!(error = %e, "session bootstrap failed"),
        Err(_) => warn!("session bootstrap timed out"),
    }

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let picked = event_loop(&mut terminal, &mut seq, opts.once).await;

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    picked
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    seq: &mut Sequencer,
    once: bool,
) -> Result<Option<String>> {
    let mut input = String::new();
    let mut selected: usize = 0;
    let mut needs_draw = true;

    loop {
        seq.tick(Instant::now());

        let rows = visible_rows(seq);
        if selected >= rows.len() {
            selected = rows.len().saturating_sub(1);
        }

        if needs_draw {
            terminal.draw(|f| draw(f, seq, &input, &rows, selected))?;
            needs_draw = false;
        }

        if once {
            return Ok(None);
        }

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                needs_draw = true;
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(None);
                    }
                    KeyCode::Esc => {
                        if input.is_empty() {
                            return Ok(None);
                        }
                        input.clear();
                        selected = 0;
                        seq.cancel_current();
                    }
                    KeyCode::Char(c) => {
                        input.push(c);
                        selected = 0;
                        seq.on_input_changed(&input, Instant::now());
                    }
                    KeyCode::Backspace => {
                        input.pop();
                        selected = 0;
                        seq.on_input_changed(&input, Instant::now());
                    }
                    KeyCode::Tab => {
                        let next = next_domain(seq.current_domain());
                        seq.switch_domain(next, &input, Instant::now());
                    }
                    KeyCode::Down => {
                        if selected + 1 < rows.len() {
                            selected += 1;
                        }
                    }
                    KeyCode::Up => {
                        selected = selected.saturating_sub(1);
                    }
                    KeyCode::Enter => {
                        if let Some(Row::Item { locator, .. }) = rows.get(selected) {
                            return Ok(Some(locator.clone()));
                        }
                    }
                    _ => {}
                }
            }
        } else {
            needs_draw = true;
            tokio::task::yield_now().await;
        }
    }
}

fn next_domain(current: DomainId) -> DomainId {
    let idx = TAB_DOMAINS
        .iter()
        .position(|d| *d == current)
        .unwrap_or(0);
    TAB_DOMAINS[(idx + 1) % TAB_DOMAINS.len()]
}

/// One selectable or decorative line in the main area.
#[derive(Debug)]
enum Row {
    Header(String),
    Item { label: String, locator: String },
}

fn item_row(item: &ResultItem) -> Row {
    let mut label = item.title.clone();
    if let Some(kind) = &item.kind_label {
        label.push_str(&format!("  [{kind}]"));
    }
    if let Some(status) = &item.status_label {
        label.push_str(&format!("  ({status})"));
    }
    if let Some(author) = &item.author_label {
        label.push_str(&format!("  - {author}"));
    }
    if let Some(ts) = item.modified_at {
        label.push_str(&format!("  {}", format_ts(ts)));
    }
    Row::Item {
        label,
        locator: item.edit_locator.clone(),
    }
}

fn format_ts(secs: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn panel_row(entry: &PanelEntry) -> Row {
    Row::Item {
        label: entry.title.clone(),
        locator: entry.locator.clone(),
    }
}

fn response_rows(resp: &SearchResponse) -> Vec<Row> {
    let mut rows = Vec::new();
    for (group, items) in &resp.groups {
        rows.push(Row::Header(group_title(group, items.len())));
        rows.extend(items.iter().map(item_row));
    }
    rows
}

fn group_title(wire_key: &str, count: usize) -> String {
    let name = match wire_key {
        "documents" => "Documents",
        "accounts" => "Accounts",
        "admin" => "Admin",
        "direct" => "Direct",
        other => other,
    };
    format!("{name} ({count})")
}

fn visible_rows(seq: &Sequencer) -> Vec<Row> {
    match seq.state() {
        RenderState::Idle => {
            let mut rows = Vec::new();
            if !seq.favorites.is_empty() {
                rows.push(Row::Header(format!("Favorites ({})", seq.favorites.len())));
                rows.extend(seq.favorites.iter().map(panel_row));
            }
            if !seq.recents.is_empty() {
                rows.push(Row::Header(format!("Recent ({})", seq.recents.len())));
                rows.extend(seq.recents.iter().map(panel_row));
            }
            rows
        }
        RenderState::Results(resp) => response_rows(resp),
        RenderState::Hint(_) | RenderState::Loading | RenderState::Failed { .. } => Vec::new(),
    }
}

fn draw(frame: &mut Frame, seq: &Sequencer, input: &str, rows: &[Row], selected: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3), // input bar
                Constraint::Length(1), // domain tabs
                Constraint::Min(0),    // results
                Constraint::Length(1), // footer
            ]
            .as_ref(),
        )
        .split(frame.area());

    let bar = Paragraph::new(format!("> {input}"))
        .block(Block::default().title("Search").borders(Borders::ALL));
    frame.render_widget(bar, chunks[0]);

    let tab_idx = TAB_DOMAINS
        .iter()
        .position(|d| *d == seq.current_domain())
        .unwrap_or(0);
    let tabs = Tabs::new(TAB_DOMAINS.iter().map(|d| d.to_string()))
        .select(tab_idx)
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, chunks[1]);

    match seq.state() {
        RenderState::Hint(hint) => {
            let para = Paragraph::new(hint.as_str()).style(Style::default().fg(Color::DarkGray));
            frame.render_widget(para, chunks[2]);
        }
        RenderState::Loading => {
            let para = Paragraph::new("Searching…").style(Style::default().fg(Color::DarkGray));
            frame.render_widget(para, chunks[2]);
        }
        RenderState::Failed { kind, message } => {
            let color = match kind {
                SearchErrorKind::Timeout => Color::Yellow,
                _ => Color::Red,
            };
            let para = Paragraph::new(message.as_str()).style(Style::default().fg(color));
            frame.render_widget(para, chunks[2]);
        }
        RenderState::Idle | RenderState::Results(_) => {
            if rows.is_empty() {
                let text = if matches!(seq.state(), RenderState::Results(_)) {
                    "No results."
                } else {
                    "Type to search. d:/u:/a: pick a domain, # or / jump directly."
                };
                frame.render_widget(
                    Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
                    chunks[2],
                );
            } else {
                let items: Vec<ListItem> = rows
                    .iter()
                    .enumerate()
                    .map(|(idx, row)| match row {
                        Row::Header(title) => ListItem::new(Line::from(Span::styled(
                            title.clone(),
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        ))),
                        Row::Item { label, .. } => {
                            let style = if idx == selected {
                                Style::default().add_modifier(Modifier::REVERSED)
                            } else {
                                Style::default()
                            };
                            ListItem::new(Line::from(Span::styled(
                                format!("  {label}"),
                                style,
                            )))
                        }
                    })
                    .collect();
                let mut state = ListState::default();
                state.select(Some(selected));
                let list =
                    List::new(items).block(Block::default().borders(Borders::ALL));
                frame.render_stateful_widget(list, chunks[2], &mut state);
            }
        }
    }

    let footer = Paragraph::new(
        "Tab domain | ↑/↓ move | Enter open | Esc clear/quit | Ctrl+C quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::ResponseMeta;
    use std::collections::BTreeMap;

    #[test]
    fn domain_tabs_cycle() {
        assert_eq!(next_domain(DomainId::Documents), DomainId::Accounts);
        assert_eq!(next_domain(DomainId::Accounts), DomainId::AdminActions);
        assert_eq!(next_domain(DomainId::AdminActions), DomainId::Documents);
        // Direct lookup has no tab; fall back to the start of the cycle.
        assert_eq!(next_domain(DomainId::DirectLookup), DomainId::Accounts);
    }

    #[test]
    fn response_rows_interleave_headers_and_items() {
        let mut groups = BTreeMap::new();
        groups.insert(
            "documents".to_string(),
            vec![ResultItem {
                domain: DomainId::Documents,
                id: "1".into(),
                title: "Launch Plan".into(),
                kind_label: Some("Article".into()),
                status_label: Some("Draft".into()),
                edit_locator: "documents/1/edit".into(),
                view_locator: None,
                modified_at: None,
                created_at: None,
                author_label: None,
            }],
        );
        let resp = SearchResponse {
            groups,
            total_count: 1,
            meta: ResponseMeta {
                query: "launch".into(),
                domain: DomainId::Documents,
                context: "palette".into(),
            },
        };
        let rows = response_rows(&resp);
        assert_eq!(rows.len(), 2);
        assert!(matches!(&rows[0], Row::Header(t) if t == "Documents (1)"));
        match &rows[1] {
            Row::Item { label, locator } => {
                assert!(label.contains("Launch Plan"));
                assert!(label.contains("[Article]"));
                assert!(label.contains("(Draft)"));
                assert_eq!(locator, "documents/1/edit");
            }
            other => panic!("expected item row, got header {other:?}"),
        }
    }
}
