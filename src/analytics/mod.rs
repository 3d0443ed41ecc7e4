// src/analytics/mod.rs
// =============================================================================
// Page-view tracking and the admin summary.
//
// Recording a page view is best-effort: a failure is logged and otherwise
// ignored. Admin pages are never tracked.
// =============================================================================

mod summary;

use tracing::{debug, warn};

use crate::store::{NewPageView, PageView, PageViewStore};

pub use summary::{build_summary, Summary};

pub fn should_track(page_path: &str) -> bool {
    !page_path.starts_with("/admin")
}

/// Record a page view unless it's an admin page. Returns the stored view,
/// or `None` when it was skipped or could not be saved.
pub fn record_page_view<S>(store: &S, view: &NewPageView) -> Option<PageView>
where
    S: PageViewStore + ?Sized,
{
    if !should_track(&view.page_path) {
        debug!(path = %view.page_path, "not tracking admin page view");
        return None;
    }

    match store.insert_page_view(view) {
        Ok(saved) => Some(saved),
        Err(e) => {
            warn!(path = %view.page_path, error = %e, "failed to record page view");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::test_support::FailingStore;

    fn view(path: &str) -> NewPageView {
        NewPageView {
            page_path: path.to_string(),
            referrer: Some("https://search.example".to_string()),
            user_agent: Some("test-agent".to_string()),
        }
    }

    #[test]
    fn test_admin_pages_are_not_tracked() {
        assert!(!should_track("/admin"));
        assert!(!should_track("/admin/login"));
        assert!(should_track("/"));
        assert!(should_track("/website/example-com"));
    }

    #[test]
    fn test_records_public_page_view() {
        let store = SqliteStore::open_in_memory().unwrap();

        let saved = record_page_view(&store, &view("/recent")).unwrap();

        assert_eq!(saved.page_path, "/recent");
        assert_eq!(saved.referrer.as_deref(), Some("https://search.example"));
        assert_eq!(store.count_page_views(None).unwrap(), 1);
    }

    #[test]
    fn test_skips_admin_page_view() {
        let store = SqliteStore::open_in_memory().unwrap();

        assert!(record_page_view(&store, &view("/admin/settings")).is_none());
        assert_eq!(store.count_page_views(None).unwrap(), 0);
    }

    #[test]
    fn test_store_failure_is_swallowed() {
        assert!(record_page_view(&FailingStore, &view("/")).is_none());
    }
}
