use std::{collections::HashSet, time::Instant};

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::{layout::Rect, widgets::ListState};

use crate::{
    config::Server,
    error::LOGIN_ERROR_TITLE,
    filter::{self, NodeMatch},
    handoff::{BrowserOpener, ClipboardSink},
    project::{ProjectRecord, web_url_from_http},
    refresh::{RefreshController, RefreshOutcome, RefreshState},
    selection::{CheckoutHost, CheckoutSelection, ClickTracker},
    tree::{NodeId, NodeKind, ProjectTree, ROOT},
};

/// User-visible notifications. Fire and forget.
pub(crate) trait ErrorReporter {
    fn show_error(&mut self, message: &str, title: &str);
}

/// The confirm ("Checkout") action of the picker.
#[derive(Debug, Default)]
pub(crate) struct DialogHost {
    pub(crate) confirm_enabled: bool,
}

impl CheckoutHost for DialogHost {
    fn set_confirm_enabled(&mut self, enabled: bool) {
        self.confirm_enabled = enabled;
    }
}

pub(crate) struct Notice {
    pub(crate) title: String,
    pub(crate) message: String,
    remaining: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum KeyAction {
    None,
    Quit,
    Commit(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct VisibleNode {
    pub(crate) id: NodeId,
    pub(crate) depth: usize,
}

pub(crate) struct App {
    pub(crate) servers: Vec<Server>,
    pub(crate) server_index: usize,
    refresh: RefreshController,
    pub(crate) tree: ProjectTree,
    pub(crate) matches: Vec<NodeMatch>,
    pub(crate) selection: CheckoutSelection,
    pub(crate) dialog: DialogHost,
    pub(crate) selected: usize,
    pub(crate) status: Option<String>,
    pub(crate) notice: Option<Notice>,
    pub(crate) filter_query: Option<String>,
    pub(crate) filter_mode: bool,
    pub(crate) list_state: ListState,
    pub(crate) list_area: Rect,
    pub(crate) tick: usize,
    pending_g: bool,
    clicks: ClickTracker,
}

impl App {
    const NOTICE_TTL: u8 = 10;
    const ERROR_TTL: u8 = 25;

    /// Shows `cached` projects for the first server, or starts loading them.
    pub(crate) fn new(
        servers: Vec<Server>,
        cached: Option<HashSet<ProjectRecord>>,
        refresh: RefreshController,
    ) -> Self {
        let mut app = Self {
            servers,
            server_index: 0,
            refresh,
            tree: ProjectTree::empty(),
            matches: Vec::new(),
            selection: CheckoutSelection::default(),
            dialog: DialogHost::default(),
            selected: 0,
            status: None,
            notice: None,
            filter_query: None,
            filter_mode: false,
            list_state: ListState::default(),
            list_area: Rect::default(),
            tick: 0,
            pending_g: false,
            clicks: ClickTracker::default(),
        };
        match cached {
            Some(projects) => {
                app.status = Some(format!("cached projects: {}", projects.len()));
                app.set_tree(ProjectTree::build(&projects));
            }
            None => app.request_refresh(),
        }
        app
    }

    pub(crate) fn current_server(&self) -> Option<&Server> {
        self.servers.get(self.server_index)
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.refresh.is_loading()
    }

    /// Server whose projects are currently being fetched.
    pub(crate) fn loading_server(&self) -> Option<&Server> {
        match self.refresh.state() {
            RefreshState::Loading { server } => Some(server),
            _ => None,
        }
    }

    pub(crate) fn request_refresh(&mut self) {
        let server = self.servers.get(self.server_index);
        self.refresh.request_refresh(server);
        if self.is_loading() {
            self.set_tree(ProjectTree::loading());
            self.status = None;
        }
    }

    pub(crate) fn next_server(&mut self) {
        if self.servers.len() < 2 {
            self.request_refresh();
            return;
        }
        self.server_index = (self.server_index + 1) % self.servers.len();
        if let Some(server) = self.current_server() {
            tracing::info!(server = server.display_name(), "switched server");
        }
        self.request_refresh();
    }

    /// Applies a finished refresh. Must run on the UI thread.
    pub(crate) fn poll_refresh(&mut self) {
        match self.refresh.poll() {
            Some(RefreshOutcome::Ready) => {
                let tree = match self.refresh.state() {
                    RefreshState::Ready { server, projects } => {
                        self.status = Some(format!(
                            "{}: {} projects",
                            server.display_name(),
                            projects.len()
                        ));
                        ProjectTree::build(projects)
                    }
                    _ => ProjectTree::empty(),
                };
                self.set_tree(tree);
            }
            Some(RefreshOutcome::Failed) => {
                self.set_tree(ProjectTree::empty());
                let message = match self.refresh.state() {
                    RefreshState::Failed { server, error } => {
                        self.status =
                            Some(format!("refresh of {} failed: {error}", server.display_name()));
                        error.user_message()
                    }
                    _ => return,
                };
                self.show_error(message, LOGIN_ERROR_TITLE);
            }
            None => {}
        }
    }

    fn set_tree(&mut self, tree: ProjectTree) {
        self.tree = tree;
        self.selected = 0;
        self.clicks.clear();
        self.selection.reset(&mut self.dialog);
        self.reclassify();
    }

    fn reclassify(&mut self) {
        self.matches = if self.tree.root_visible() {
            vec![NodeMatch::DirectMatch; self.tree.len()]
        } else {
            filter::classify_all(&self.tree, self.query())
        };
    }

    pub(crate) fn query(&self) -> &str {
        self.filter_query.as_deref().unwrap_or("")
    }

    /// Expanded by the user, or forced open because a filter match sits below.
    pub(crate) fn is_open(&self, id: NodeId) -> bool {
        self.tree.node(id).expanded || self.forced_open(id)
    }

    fn forced_open(&self, id: NodeId) -> bool {
        self.matches[id] == NodeMatch::AncestorOfMatch && !self.query().is_empty()
    }

    /// Rows in display order. Descendants of a direct match stay reachable
    /// even when their own labels do not match.
    pub(crate) fn visible_nodes(&self) -> Vec<VisibleNode> {
        let mut out = Vec::new();
        if self.tree.root_visible() {
            self.walk_visible(ROOT, 0, false, &mut out);
        } else {
            for &child in self.tree.children(ROOT) {
                self.walk_visible(child, 0, false, &mut out);
            }
        }
        out
    }

    fn walk_visible(
        &self,
        node_id: NodeId,
        depth: usize,
        under_match: bool,
        out: &mut Vec<VisibleNode>,
    ) {
        let class = self.matches[node_id];
        if !under_match && !class.is_visible() {
            return;
        }
        out.push(VisibleNode { id: node_id, depth });
        if self.is_open(node_id) {
            let under_match = under_match || class == NodeMatch::DirectMatch;
            for &child in self.tree.children(node_id) {
                self.walk_visible(child, depth + 1, under_match, out);
            }
        }
    }

    pub(crate) fn ensure_selection(&mut self, visible_len: usize) {
        if visible_len == 0 {
            self.selected = 0;
        } else if self.selected >= visible_len {
            self.selected = visible_len - 1;
        }
    }

    fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    fn move_down(&mut self, visible_len: usize) {
        if self.selected + 1 < visible_len {
            self.selected += 1;
        }
    }

    fn move_bottom(&mut self, visible_len: usize) {
        if visible_len > 0 {
            self.selected = visible_len - 1;
        }
    }

    fn cursor_node(&self, visible: &[VisibleNode]) -> Option<NodeId> {
        visible.get(self.selected).map(|node| node.id)
    }

    fn collapse_or_parent(&mut self, visible: &[VisibleNode]) {
        let Some(node_id) = self.cursor_node(visible) else {
            return;
        };
        if self.tree.node(node_id).expanded && !self.forced_open(node_id) {
            self.tree.set_expanded(node_id, false);
        } else if let Some(parent) = self.tree.parent(node_id) {
            if let Some(pos) = visible.iter().position(|item| item.id == parent) {
                self.selected = pos;
            }
        }
        self.ensure_selection(self.visible_nodes().len());
    }

    fn expand_or_child(&mut self, visible: &[VisibleNode]) {
        let Some(node_id) = self.cursor_node(visible) else {
            return;
        };
        if self.tree.is_leaf(node_id) {
            return;
        }
        if !self.is_open(node_id) {
            self.tree.set_expanded(node_id, true);
        } else if self.selected + 1 < visible.len() {
            self.selected += 1;
        }
    }

    /// Pointer-down or keyboard activation of `node`.
    fn activate(&mut self, node: Option<NodeId>, click_count: u8) -> KeyAction {
        let result = self
            .selection
            .on_node_activated(&self.tree, node, click_count, &mut self.dialog);
        if result.should_commit {
            if let Some(url) = result.url {
                tracing::info!(url = %url, "checkout committed");
                return KeyAction::Commit(url);
            }
        }
        if result.valid {
            return KeyAction::None;
        }
        if let Some(id) = node.filter(|&id| id < self.tree.len()) {
            if click_count == 2 && !self.tree.is_leaf(id) {
                let open = self.is_open(id);
                self.tree.set_expanded(id, !open);
            }
        }
        KeyAction::None
    }

    /// Accepts the dialog with the current selection, like pressing "Checkout".
    fn confirm(&mut self) -> KeyAction {
        if !self.dialog.confirm_enabled {
            self.set_status("select a clone URL first".to_string());
            return KeyAction::None;
        }
        match self.selection.last_selected_url() {
            Some(url) => KeyAction::Commit(url.to_string()),
            None => KeyAction::None,
        }
    }

    /// Maps a terminal cell to a row of the project list, if it lands on one.
    pub(crate) fn row_at(&self, column: u16, row: u16, visible_len: usize) -> Option<usize> {
        let area = self.list_area;
        if area.width < 2 || area.height < 2 {
            return None;
        }
        let inner_top = area.y + 1;
        let inner_bottom = area.y + area.height - 1;
        let inner_left = area.x + 1;
        let inner_right = area.x + area.width - 1;
        if row < inner_top || row >= inner_bottom || column < inner_left || column >= inner_right {
            return None;
        }
        let index = self.list_state.offset() + usize::from(row - inner_top);
        (index < visible_len).then_some(index)
    }

    pub(crate) fn handle_mouse_down(
        &mut self,
        column: u16,
        row: u16,
        visible: &[VisibleNode],
        now: Instant,
    ) -> KeyAction {
        match self.row_at(column, row, visible.len()) {
            Some(index) => {
                self.selected = index;
                let click_count = self.clicks.register(index, now);
                self.activate(Some(visible[index].id), click_count)
            }
            None => {
                self.clicks.clear();
                self.activate(None, 1)
            }
        }
    }

    fn yank_selected<C: ClipboardSink + ?Sized>(
        &mut self,
        visible: &[VisibleNode],
        clipboard: &mut C,
    ) -> Result<String> {
        let Some(node_id) = self.cursor_node(visible) else {
            anyhow::bail!("no selection");
        };
        if !matches!(self.tree.node(node_id).kind, NodeKind::Url(_)) {
            anyhow::bail!("not a clone URL");
        }
        let url = self.tree.label(node_id).to_string();
        clipboard.set_text(url.clone())?;
        tracing::info!(url = %url, backend = clipboard.backend().label(), "copied clone URL");
        Ok(url)
    }

    fn open_selected<B: BrowserOpener + ?Sized>(
        &mut self,
        visible: &[VisibleNode],
        browser: &mut B,
    ) -> Result<String> {
        let Some(node_id) = self.cursor_node(visible) else {
            anyhow::bail!("no selection");
        };
        let Some(http_url) = self
            .tree
            .project_of(node_id)
            .and_then(|project| self.tree.http_url_of(project))
        else {
            anyhow::bail!("not a project");
        };
        let url = web_url_from_http(http_url);
        browser.open(&url)?;
        Ok(url)
    }

    pub(crate) fn set_status(&mut self, message: String) {
        self.status = Some(message);
    }

    fn set_notice(&mut self, title: &str, message: String, ttl: u8) {
        self.notice = Some(Notice {
            title: title.to_string(),
            message,
            remaining: ttl,
        });
    }

    pub(crate) fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        if let Some(notice) = self.notice.as_mut() {
            if notice.remaining > 0 {
                notice.remaining -= 1;
            }
            if notice.remaining == 0 {
                self.notice = None;
            }
        }
    }

    fn start_filter(&mut self) {
        self.filter_mode = true;
        if self.filter_query.is_none() {
            self.filter_query = Some(String::new());
        }
    }

    fn exit_filter_mode(&mut self) {
        self.filter_mode = false;
        if self.query().is_empty() {
            self.filter_query = None;
        }
    }

    fn clear_filter(&mut self) {
        self.filter_query = None;
        self.filter_mode = false;
        self.filter_changed();
    }

    fn push_filter_char(&mut self, ch: char) {
        self.filter_query.get_or_insert_with(String::new).push(ch);
        self.filter_changed();
    }

    fn pop_filter_char(&mut self) {
        if let Some(query) = &mut self.filter_query {
            query.pop();
        }
        self.filter_changed();
    }

    fn filter_changed(&mut self) {
        self.selection.reset(&mut self.dialog);
        self.selected = 0;
        self.clicks.clear();
        self.reclassify();
    }

    pub(crate) fn handle_key(
        &mut self,
        key: KeyCode,
        visible: &[VisibleNode],
        clipboard: Option<&mut dyn ClipboardSink>,
        browser: &mut dyn BrowserOpener,
    ) -> Result<KeyAction> {
        if self.filter_mode {
            match key {
                KeyCode::Esc => self.clear_filter(),
                KeyCode::Enter => self.exit_filter_mode(),
                KeyCode::Backspace => self.pop_filter_char(),
                KeyCode::Char(ch) => self.push_filter_char(ch),
                _ => {}
            }
            return Ok(KeyAction::None);
        }

        let action = match key {
            KeyCode::Char('q') => KeyAction::Quit,
            KeyCode::Char('r') => {
                self.request_refresh();
                KeyAction::None
            }
            KeyCode::Char('s') | KeyCode::Tab => {
                self.next_server();
                KeyAction::None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_up();
                KeyAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_down(visible.len());
                KeyAction::None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.collapse_or_parent(visible);
                KeyAction::None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.expand_or_child(visible);
                KeyAction::None
            }
            KeyCode::Char('g') => {
                if std::mem::take(&mut self.pending_g) {
                    self.selected = 0;
                } else {
                    self.pending_g = true;
                }
                KeyAction::None
            }
            KeyCode::Char('G') => {
                self.move_bottom(visible.len());
                KeyAction::None
            }
            KeyCode::Char(' ') => {
                let node = self.cursor_node(visible);
                self.activate(node, 1)
            }
            KeyCode::Enter => {
                let node = self.cursor_node(visible);
                self.activate(node, 2)
            }
            KeyCode::Char('c') => self.confirm(),
            KeyCode::Char('y') => {
                if let Some(clipboard) = clipboard {
                    match self.yank_selected(visible, &mut *clipboard) {
                        Ok(url) => {
                            let via = clipboard.backend().label();
                            self.set_status(format!("copied {url} via {via}"));
                            self.set_notice("Notice", "Copied URL".to_string(), Self::NOTICE_TTL);
                        }
                        Err(err) => self.set_status(format!("copy failed: {err}")),
                    }
                } else {
                    self.set_status("clipboard unavailable".to_string());
                }
                KeyAction::None
            }
            KeyCode::Char('o') => {
                match self.open_selected(visible, browser) {
                    Ok(url) => self.set_status(format!("opened {url}")),
                    Err(err) => self.set_status(format!("open failed: {err}")),
                }
                KeyAction::None
            }
            KeyCode::Char('/') => {
                self.start_filter();
                KeyAction::None
            }
            KeyCode::Esc => {
                if self.filter_query.is_some() {
                    self.clear_filter();
                    KeyAction::None
                } else {
                    KeyAction::Quit
                }
            }
            _ => KeyAction::None,
        };

        if key != KeyCode::Char('g') {
            self.pending_g = false;
        }

        Ok(action)
    }
}

impl ErrorReporter for App {
    fn show_error(&mut self, message: &str, title: &str) {
        self.set_notice(title, message.to_string(), Self::ERROR_TTL);
    }
}
