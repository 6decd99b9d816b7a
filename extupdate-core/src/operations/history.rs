use crate::history::History;
use crate::output::{ClearHistoryResult, HistoryResult};
use crate::workspace::Workspace;

/// History operation - returns structured data, newest entries first
pub fn history_operation(workspace: &Workspace, limit: Option<usize>) -> HistoryResult {
    let history = History::load_from_path(&workspace.history_path);

    HistoryResult {
        path: history.path().to_path_buf(),
        load_status: history.load_status().clone(),
        total: history.len(),
        entries: history.list_entries(limit).into_iter().cloned().collect(),
    }
}

/// Clear history operation - wipes every entry. Destructive, no undo.
pub fn clear_history_operation(workspace: &Workspace) -> ClearHistoryResult {
    let mut history = History::load_from_path(&workspace.history_path);
    let removed = history.len();
    let status = history.clear();

    ClearHistoryResult {
        path: history.path().to_path_buf(),
        removed,
        status,
    }
}
