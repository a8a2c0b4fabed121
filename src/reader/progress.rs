//! 阅读进度上报：每次章节加载最多一次 upsert，后台线程执行，失败只记日志。

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::state::ReaderState;
use crate::api::account::{CreateWatchHistory, WatchHistoryWriter};

#[derive(Debug, Default)]
pub struct ProgressReporter {
    reported: Option<u64>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 本次加载还没上报、且数据齐全时取出记录。
    pub fn take(&mut self, state: &ReaderState, cdn_fallback: &str) -> Option<CreateWatchHistory> {
        if self.reported == Some(state.load_seq()) {
            return None;
        }
        let entry = state.progress_entry(cdn_fallback)?;
        self.reported = Some(state.load_seq());
        Some(entry)
    }

    /// 未登录时不发请求。返回后台线程句柄，调用方通常直接丢弃。
    pub fn report(
        &mut self,
        state: &ReaderState,
        cdn_fallback: &str,
        writer: &Arc<dyn WatchHistoryWriter>,
    ) -> Option<JoinHandle<()>> {
        if !writer.is_authenticated() {
            return None;
        }
        let entry = self.take(state, cdn_fallback)?;
        Some(spawn_upsert(Arc::clone(writer), entry))
    }
}

/// 后台写入一条阅读记录（也供详情页的章节入口使用）。
pub fn spawn_upsert(writer: Arc<dyn WatchHistoryWriter>, entry: CreateWatchHistory) -> JoinHandle<()> {
    thread::spawn(move || match writer.upsert(&entry) {
        Ok(saved) => debug!(
            target: "reader",
            content_id = %saved.content_id,
            chapter = ?entry.chapter_name,
            "watch history saved"
        ),
        Err(e) => warn!(
            target: "reader",
            content_id = %entry.content_id,
            "watch history upsert failed: {e}"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::api::ApiResult;
    use crate::api::account::WatchHistory;
    use crate::api::models::{ChapterImage, ChapterItem, ChapterPayload, Comic, ComicDetail};
    use crate::reader::ReadingMode;

    #[derive(Default)]
    struct Recorder {
        authed: bool,
        calls: Mutex<Vec<CreateWatchHistory>>,
    }

    impl WatchHistoryWriter for Recorder {
        fn is_authenticated(&self) -> bool {
            self.authed
        }

        fn upsert(&self, entry: &CreateWatchHistory) -> ApiResult<WatchHistory> {
            self.calls.lock().unwrap().push(entry.clone());
            Ok(WatchHistory {
                content_id: entry.content_id.clone(),
                ..Default::default()
            })
        }
    }

    fn loaded_state() -> ReaderState {
        let mut s = ReaderState::new(
            Some("c1".to_string()),
            Some("naruto".to_string()),
            ReadingMode::Single,
            true,
        );
        s.chapter_loaded(
            "c1",
            &ChapterPayload {
                domain_cdn: "https://cdn".to_string(),
                item: ChapterItem {
                    chapter_name: "1".to_string(),
                    chapter_path: "p".to_string(),
                    chapter_image: vec![ChapterImage {
                        image_page: 1,
                        image_file: "a.jpg".to_string(),
                    }],
                    ..Default::default()
                },
            },
        );
        s.comic_loaded(Arc::new(ComicDetail {
            item: Comic {
                id: "n1".to_string(),
                slug: "naruto".to_string(),
                name: "Naruto".to_string(),
                ..Default::default()
            },
            cdn_image: String::new(),
        }));
        s
    }

    #[test]
    fn unauthenticated_sends_nothing() {
        let rec = Arc::new(Recorder::default());
        let writer: Arc<dyn WatchHistoryWriter> = rec.clone();
        let mut reporter = ProgressReporter::new();
        assert!(reporter.report(&loaded_state(), "", &writer).is_none());
        assert!(rec.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn one_upsert_per_load() {
        let rec = Arc::new(Recorder {
            authed: true,
            ..Default::default()
        });
        let writer: Arc<dyn WatchHistoryWriter> = rec.clone();

        let state = loaded_state();
        let mut reporter = ProgressReporter::new();
        reporter.report(&state, "", &writer).unwrap().join().unwrap();
        assert!(reporter.report(&state, "", &writer).is_none());

        // 再次打开同一章：新的阅读器实例，再上报一次
        let mut again = ProgressReporter::new();
        again
            .report(&loaded_state(), "", &writer)
            .unwrap()
            .join()
            .unwrap();

        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].content_id, "n1");
        assert_eq!(calls[1].content_id, "n1");
        assert_eq!(calls[1].chapter_id.as_deref(), Some("c1"));
    }

    #[test]
    fn chapter_switch_is_a_new_load() {
        let mut state = loaded_state();
        let mut reporter = ProgressReporter::new();
        assert!(reporter.take(&state, "").is_some());
        assert!(reporter.take(&state, "").is_none());

        state.switch_chapter("c2");
        assert!(reporter.take(&state, "").is_none());
        state.chapter_loaded(
            "c2",
            &ChapterPayload {
                domain_cdn: "https://cdn".to_string(),
                ..Default::default()
            },
        );
        let entry = reporter.take(&state, "").unwrap();
        assert_eq!(entry.chapter_id.as_deref(), Some("c2"));
    }
}
