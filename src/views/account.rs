//! 账号功能的视图状态：收藏/稍后看开关、历史与收藏列表。
//!
//! 两者都是纯状态机：方法返回“要发什么请求”，TUI 层发出请求后再把结果喂回来。

use crate::api::ApiError;
use crate::api::account::{Paged, RelationItem, RelationKind, WatchHistory};
use crate::route::Route;

pub const GENERIC_ERROR: &str = "Có lỗi xảy ra";
pub const DELETE_FAILED: &str = "Xóa thất bại";
pub const CONFIRM_DELETE: &str = "Bạn có chắc muốn xóa mục này khỏi lịch sử?";
pub const CONFIRM_CLEAR: &str = "Bạn có chắc muốn xóa toàn bộ lịch sử?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationState {
    Unknown,
    Known(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleAction {
    /// 未登录：只提示，不发请求
    PromptLogin(&'static str),
    Add,
    Remove,
    /// 上一次切换还在进行中
    Ignore,
}

#[derive(Debug, Clone)]
pub struct RelationToggle {
    kind: RelationKind,
    state: RelationState,
    pending: bool,
}

impl RelationToggle {
    pub fn new(kind: RelationKind) -> Self {
        Self {
            kind,
            state: RelationState::Unknown,
            pending: false,
        }
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn state(&self) -> RelationState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_active(&self) -> bool {
        self.state == RelationState::Known(true)
    }

    /// 打开页面时的存在性查询结果；失败保持未知。
    pub fn checked(&mut self, result: Result<bool, ApiError>) {
        if let Ok(exists) = result {
            self.state = RelationState::Known(exists);
        }
    }

    pub fn begin_toggle(&mut self, authenticated: bool) -> ToggleAction {
        if !authenticated {
            return ToggleAction::PromptLogin(login_prompt(self.kind));
        }
        if self.pending {
            return ToggleAction::Ignore;
        }
        self.pending = true;
        if self.is_active() {
            ToggleAction::Remove
        } else {
            ToggleAction::Add
        }
    }

    /// 服务端确认后才翻转状态。失败时返回要弹出的提示。
    pub fn finish(&mut self, action: &ToggleAction, result: Result<(), ApiError>) -> Option<String> {
        self.pending = false;
        match result {
            Ok(()) => {
                match action {
                    ToggleAction::Add => self.state = RelationState::Known(true),
                    ToggleAction::Remove => self.state = RelationState::Known(false),
                    _ => {}
                }
                None
            }
            Err(e) => Some(e.user_message(GENERIC_ERROR)),
        }
    }

    pub fn label(&self) -> String {
        let mark = match self.state {
            RelationState::Known(true) => "●",
            RelationState::Known(false) => "○",
            RelationState::Unknown => "?",
        };
        let busy = if self.pending { "…" } else { "" };
        format!("{mark} {}{busy}", self.kind.label())
    }
}

fn login_prompt(kind: RelationKind) -> &'static str {
    match kind {
        RelationKind::Favorite => "Vui lòng đăng nhập để lưu yêu thích",
        RelationKind::WatchLater => "Vui lòng đăng nhập để lưu xem sau",
    }
}

/// 列表项的内容标识，删除时按它匹配。
pub trait ListEntry {
    fn content_id(&self) -> &str;
}

impl ListEntry for WatchHistory {
    fn content_id(&self) -> &str {
        &self.content_id
    }
}

impl ListEntry for RelationItem {
    fn content_id(&self) -> &str {
        &self.content_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListCommand {
    Delete(String),
    Clear,
}

#[derive(Debug, Clone)]
pub struct HistoryList<T> {
    items: Vec<T>,
    loading: bool,
    load_error: Option<String>,
    confirm: Option<ListCommand>,
}

impl<T> Default for HistoryList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            load_error: None,
            confirm: None,
        }
    }
}

impl<T: ListEntry> HistoryList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 未登录时返回应跳转的路由（首页），不加载。
    pub fn open(&mut self, authenticated: bool) -> Result<(), Route> {
        if !authenticated {
            return Err(Route::Home);
        }
        self.loading = true;
        self.load_error = None;
        Ok(())
    }

    pub fn loaded(&mut self, result: Result<Paged<T>, ApiError>)
    where
        T: Default,
    {
        self.loading = false;
        match result {
            Ok(page) => self.items = page.items,
            Err(e) => self.load_error = Some(e.user_message(GENERIC_ERROR)),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn request_delete(&mut self, content_id: &str) {
        self.confirm = Some(ListCommand::Delete(content_id.to_string()));
    }

    /// 列表为空时没有可清空的内容。
    pub fn request_clear(&mut self) {
        if !self.items.is_empty() {
            self.confirm = Some(ListCommand::Clear);
        }
    }

    pub fn confirmation_prompt(&self) -> Option<&'static str> {
        match self.confirm {
            Some(ListCommand::Delete(_)) => Some(CONFIRM_DELETE),
            Some(ListCommand::Clear) => Some(CONFIRM_CLEAR),
            None => None,
        }
    }

    pub fn cancel(&mut self) {
        self.confirm = None;
    }

    /// 只有确认后才产生破坏性请求。
    pub fn confirm(&mut self) -> Option<ListCommand> {
        self.confirm.take()
    }

    /// 成功后本地同步删除；失败返回提示文本。
    pub fn command_done(&mut self, command: &ListCommand, result: Result<(), ApiError>) -> Option<String> {
        match result {
            Ok(()) => {
                match command {
                    ListCommand::Delete(id) => self.items.retain(|i| i.content_id() != id),
                    ListCommand::Clear => self.items.clear(),
                }
                None
            }
            Err(e) => Some(e.user_message(DELETE_FAILED)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn server_error(body: &str) -> ApiError {
        ApiError::from_status(StatusCode::BAD_REQUEST, body)
    }

    #[test]
    fn unauthenticated_toggle_only_prompts() {
        let mut t = RelationToggle::new(RelationKind::Favorite);
        assert_eq!(
            t.begin_toggle(false),
            ToggleAction::PromptLogin("Vui lòng đăng nhập để lưu yêu thích")
        );
        assert!(!t.is_pending());
        assert_eq!(t.state(), RelationState::Unknown);
    }

    #[test]
    fn state_flips_only_after_confirmation() {
        let mut t = RelationToggle::new(RelationKind::Favorite);
        t.checked(Ok(false));
        let action = t.begin_toggle(true);
        assert_eq!(action, ToggleAction::Add);
        assert!(!t.is_active());
        assert_eq!(t.begin_toggle(true), ToggleAction::Ignore);

        assert_eq!(t.finish(&action, Ok(())), None);
        assert!(t.is_active());

        let action = t.begin_toggle(true);
        assert_eq!(action, ToggleAction::Remove);
        assert_eq!(t.finish(&action, Ok(())), None);
        assert_eq!(t.state(), RelationState::Known(false));
    }

    #[test]
    fn failed_toggle_keeps_state_and_reports() {
        let mut t = RelationToggle::new(RelationKind::WatchLater);
        t.checked(Ok(true));
        let action = t.begin_toggle(true);
        let alert = t.finish(&action, Err(server_error(r#"{"message":"Đã xảy ra lỗi máy chủ"}"#)));
        assert_eq!(alert.as_deref(), Some("Đã xảy ra lỗi máy chủ"));
        assert!(t.is_active());
        assert!(!t.is_pending());

        let action = t.begin_toggle(true);
        let alert = t.finish(&action, Err(server_error("")));
        assert_eq!(alert.as_deref(), Some(GENERIC_ERROR));
    }

    #[test]
    fn failed_check_stays_unknown() {
        let mut t = RelationToggle::new(RelationKind::Favorite);
        t.checked(Err(ApiError::Unauthenticated));
        assert_eq!(t.state(), RelationState::Unknown);
        assert_eq!(t.begin_toggle(true), ToggleAction::Add);
    }

    fn entry(id: &str) -> WatchHistory {
        WatchHistory {
            content_id: id.to_string(),
            ..Default::default()
        }
    }

    fn loaded_list() -> HistoryList<WatchHistory> {
        let mut list = HistoryList::new();
        list.open(true).unwrap();
        assert!(list.is_loading());
        list.loaded(Ok(Paged {
            items: vec![entry("a"), entry("b"), entry("c")],
            ..Default::default()
        }));
        list
    }

    #[test]
    fn unauthenticated_history_redirects_home() {
        let mut list: HistoryList<WatchHistory> = HistoryList::new();
        assert_eq!(list.open(false), Err(Route::Home));
        assert!(!list.is_loading());
    }

    #[test]
    fn delete_needs_confirmation() {
        let mut list = loaded_list();
        list.request_delete("b");
        assert_eq!(list.confirmation_prompt(), Some(CONFIRM_DELETE));
        list.cancel();
        assert!(list.confirm().is_none());
        assert_eq!(list.items().len(), 3);

        list.request_delete("b");
        let cmd = list.confirm().unwrap();
        assert_eq!(cmd, ListCommand::Delete("b".to_string()));
        assert!(list.confirmation_prompt().is_none());
        assert_eq!(list.command_done(&cmd, Ok(())), None);
        let ids: Vec<_> = list.items().iter().map(|i| i.content_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn clear_and_failure() {
        let mut list = loaded_list();
        list.request_clear();
        assert_eq!(list.confirmation_prompt(), Some(CONFIRM_CLEAR));
        let cmd = list.confirm().unwrap();

        let alert = list.command_done(&cmd, Err(server_error("")));
        assert_eq!(alert.as_deref(), Some(DELETE_FAILED));
        assert_eq!(list.items().len(), 3);

        assert_eq!(list.command_done(&cmd, Ok(())), None);
        assert!(list.items().is_empty());
        list.request_clear();
        assert!(list.confirmation_prompt().is_none());
    }

    #[test]
    fn load_error_is_kept() {
        let mut list: HistoryList<RelationItem> = HistoryList::new();
        list.open(true).unwrap();
        list.loaded(Err(server_error(r#"{"message":"Token hết hạn"}"#)));
        assert_eq!(list.load_error(), Some("Token hết hạn"));
        assert!(!list.is_loading());
    }
}
