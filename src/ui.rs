use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::{
    app::{App, Notice, VisibleNode},
    filter::{self, NodeMatch},
    tree::{NodeId, NodeKind, ProjectTree, UrlKind},
};

pub(crate) fn draw(frame: &mut ratatui::Frame, app: &mut App, visible: &[VisibleNode]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    frame.render_widget(Paragraph::new(server_line(app)), chunks[0]);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let items: Vec<ListItem> = visible
        .iter()
        .map(|node| ListItem::new(tree_row(app, node)))
        .collect();
    let list = List::new(items)
        .block(Block::default().title("GitLab Checkout").borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    app.list_state
        .select((!visible.is_empty()).then_some(app.selected));
    frame.render_stateful_widget(list, main_chunks[0], &mut app.list_state);
    app.list_area = main_chunks[0];

    let details_lines = match visible.get(app.selected) {
        Some(node) if !app.tree.root_visible() => {
            format_node_details(&app.tree, node.id, app.query())
        }
        _ => vec!["No selection".to_string()],
    };
    let details = Paragraph::new(details_lines.join("\n"))
        .block(Block::default().title("Details").borders(Borders::ALL));
    frame.render_widget(details, main_chunks[1]);

    frame.render_widget(Paragraph::new(footer_text(app)), chunks[2]);

    if let Some(notice) = &app.notice {
        render_notice(frame, notice);
    }
}

fn server_line(app: &App) -> Line<'static> {
    let mut spans = vec![Span::raw("server: ")];
    for (idx, server) in app.servers.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw(" | "));
        }
        let style = if idx == app.server_index {
            Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(server.display_name().to_string(), style));
    }
    if let Some(server) = app.loading_server() {
        spans.push(Span::styled(
            format!("  fetching {}", server.display_name()),
            Style::default().fg(Color::Yellow),
        ));
    }
    Line::from(spans)
}

fn tree_row(app: &App, node: &VisibleNode) -> Line<'static> {
    let data = app.tree.node(node.id);
    let indent = "  ".repeat(node.depth);
    if app.tree.root_visible() {
        return Line::from(Span::styled(
            format!("{indent}{}", loading_message(app.tick)),
            Style::default().fg(Color::Gray),
        ));
    }

    let marker = if data.children.is_empty() {
        " * "
    } else if app.is_open(node.id) {
        "[-]"
    } else {
        "[+]"
    };
    let style = match app.matches[node.id] {
        NodeMatch::DirectMatch => Style::default(),
        NodeMatch::AncestorOfMatch => Style::default().fg(Color::DarkGray),
        NodeMatch::Hidden => Style::default(),
    };
    let label = match data.kind {
        NodeKind::Url(UrlKind::Ssh) => format!("ssh  {}", data.label),
        NodeKind::Url(UrlKind::Http) => format!("http {}", data.label),
        _ => data.label.clone(),
    };
    Line::from(vec![
        Span::raw(format!("{indent}{marker} ")),
        Span::styled(label, style),
    ])
}

pub(crate) fn footer_text(app: &App) -> String {
    let checkout = if app.dialog.confirm_enabled {
        "[Checkout]"
    } else {
        "(Checkout)"
    };
    let mut footer = format!(
        "q quit | r refresh | s server | arrows move | space select | enter/c checkout | y yank | o open | / filter | {checkout}"
    );
    if let Some(url) = app.selection.selected_url() {
        if app.selection.is_valid() {
            footer.push_str(&format!(" {url}"));
        } else {
            footer.push_str(&format!(" ({url})"));
        }
    }
    if let Some(status) = &app.status {
        footer.push_str(&format!(" | {status}"));
    }
    if let Some(query) = &app.filter_query {
        let label = if app.filter_mode { "filter*" } else { "filter" };
        footer.push_str(&format!(" | {label}: {query}"));
    }
    footer
}

pub(crate) fn format_node_details(tree: &ProjectTree, id: NodeId, query: &str) -> Vec<String> {
    let node = tree.node(id);
    let kind = match node.kind {
        NodeKind::Root => "Root",
        NodeKind::Namespace => "Namespace",
        NodeKind::Project => "Project",
        NodeKind::Url(UrlKind::Ssh) => "SSH clone URL",
        NodeKind::Url(UrlKind::Http) => "HTTP clone URL",
    };
    let mut lines = vec![format!("Name: {}", node.label), format!("Kind: {kind}")];
    match node.kind {
        NodeKind::Namespace => {
            lines.push(format!("Projects: {}", node.children.len()));
        }
        NodeKind::Project => {
            if let Some(namespace) = tree.parent(id) {
                lines.push(format!("Namespace: {}", tree.label(namespace)));
            }
            for &leaf in tree.children(id) {
                lines.push(format!("Clone: {}", tree.label(leaf)));
            }
        }
        NodeKind::Url(_) => {
            if let Some(project) = tree.project_of(id) {
                lines.push(format!("Project: {}", tree.label(project)));
            }
            lines.push("space select | enter checkout".to_string());
        }
        NodeKind::Root => {}
    }
    if !query.is_empty() && filter::classify(tree, id, query) == NodeMatch::AncestorOfMatch {
        lines.push(format!("Filter: matched below ({query})"));
    }
    lines
}

fn render_notice(frame: &mut ratatui::Frame, notice: &Notice) {
    let area = frame.size();
    let width = (notice.message.len().max(notice.title.len()) as u16).saturating_add(4);
    let height = 3;
    let x = area.width.saturating_sub(width + 1);
    let y = 1;
    let rect = Rect::new(x, y, width.min(area.width), height.min(area.height));
    let block = Block::default()
        .title(notice.title.clone())
        .borders(Borders::ALL);
    let paragraph = Paragraph::new(notice.message.clone()).block(block);
    frame.render_widget(Clear, rect);
    frame.render_widget(paragraph, rect);
}

pub(crate) fn loading_message(tick: usize) -> String {
    let frames = ["|", "/", "-", "\\"];
    let frame = frames[tick % frames.len()];
    format!("{frame} {}", crate::tree::LOADING_LABEL)
}
