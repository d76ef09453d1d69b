// ABOUTME: Core export loop: paginate marks, enrich each with its detail
// ABOUTME: Tolerates per-item failures and persists a resumable cursor

use crate::{
    platform::{Cursor, EnrichedItem, MarkRef, Platform},
    resume::ResumeStore,
    storage::write_json,
    Result,
};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, warn};

pub const DEFAULT_BATCH_SIZE: u32 = 20;

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub output: PathBuf,
    /// Explicit starting cursor; overrides the resume store.
    pub cursor: Option<Cursor>,
    pub max_items: Option<usize>,
    pub batch_size: u32,
}

impl ExportRequest {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        ExportRequest {
            output: output.into(),
            cursor: None,
            max_items: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub items: usize,
    pub degraded: usize,
    pub pages: usize,
    /// Cursor written to the resume store, if any.
    pub persisted_cursor: Option<Cursor>,
    /// The platform reported there is nothing more to list.
    pub exhausted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExportReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }

    /// Stopped with more left but without a cursor to resume from.
    pub fn resume_lost(&self) -> bool {
        !self.exhausted && self.persisted_cursor.is_none()
    }
}

/// Size of the next listing request: the batch size, capped by what is left
/// of the item budget.
pub fn page_request_size(batch_size: u32, max_items: Option<usize>, count: usize) -> u32 {
    match max_items {
        Some(cap) => {
            let remaining = cap.saturating_sub(count);
            batch_size
                .max(1)
                .min(u32::try_from(remaining).unwrap_or(u32::MAX))
        }
        None => batch_size.max(1),
    }
}

pub fn progress_bar(max_items: Option<usize>) -> ProgressBar {
    let pb = match max_items {
        Some(cap) => ProgressBar::new(cap as u64),
        None => ProgressBar::new_spinner(),
    };
    let template = if max_items.is_some() {
        "[{bar:40}] {pos}/{len} items"
    } else {
        "{spinner} {pos} items"
    };
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

struct Walk<M, D> {
    batch: Vec<EnrichedItem<M, D>>,
    cursor: Cursor,
    has_more: bool,
    /// False once `cursor` no longer marks the end of `batch`.
    resumable: bool,
    pages: usize,
}

impl<M, D> Walk<M, D> {
    fn persistable_cursor(&self) -> Option<&Cursor> {
        (self.resumable && !self.batch.is_empty() && !self.cursor.is_start()).then_some(&self.cursor)
    }
}

fn walk<P: Platform>(
    platform: &P,
    request: &ExportRequest,
    start: Cursor,
    pb: &ProgressBar,
    state: &mut Walk<P::Mark, P::Detail>,
) -> Result<()> {
    state.cursor = start;

    while state.has_more && request.max_items.map_or(true, |cap| state.batch.len() < cap) {
        let size = page_request_size(request.batch_size, request.max_items, state.batch.len());
        let page = platform.list_marks(&state.cursor, size)?;
        state.pages += 1;

        if page.marks.is_empty() {
            state.has_more = false;
            break;
        }

        let mut marks = page.marks;
        let mut next = page.next;
        let mut has_more = page.has_more;
        if marks.len() > size as usize {
            let returned = marks.len();
            marks.truncate(size as usize);
            has_more = true;
            match platform.cursor_after(&state.cursor, marks.len()) {
                Some(cursor) => {
                    warn!(
                        platform = platform.name(),
                        requested = size,
                        returned,
                        "page longer than requested; resuming after the kept items"
                    );
                    next = cursor;
                }
                None => {
                    warn!(
                        platform = platform.name(),
                        requested = size,
                        returned,
                        "page longer than requested; resume point unknown, stopping"
                    );
                    state.resumable = false;
                }
            }
        }

        for mark in marks {
            let item_id = mark.item_id().into_owned();
            match platform.get_detail(&item_id, mark.access_token()) {
                Ok(detail) => {
                    pb.suspend(|| {
                        println!(
                            "{} {}: {}",
                            platform.item_noun(),
                            state.batch.len() + 1,
                            mark.display_title()
                        )
                    });
                    state.batch.push(EnrichedItem::enriched(mark, detail));
                }
                Err(e) => {
                    warn!(platform = platform.name(), item = %item_id, error = %e, "detail fetch failed");
                    pb.suspend(|| println!("Error dealing with `{}`: {}", item_id, e));
                    state.batch.push(EnrichedItem::bare(mark));
                }
            }
            pb.inc(1);
        }

        state.cursor = next;
        state.has_more = has_more;
        if !state.resumable {
            break;
        }
    }

    Ok(())
}

/// Export one collection to `request.output`.
///
/// If a listing call fails, whatever was collected before it is still written
/// (together with the cursor that resumes right after it) and the error is
/// returned.
pub fn run_export<P: Platform>(
    platform: &P,
    store: &ResumeStore,
    request: &ExportRequest,
    pb: &ProgressBar,
) -> Result<ExportReport> {
    let started_at = Utc::now();
    let start = request
        .cursor
        .clone()
        .filter(|c| !c.is_start())
        .or_else(|| store.load())
        .unwrap_or_default();

    info!(
        platform = platform.name(),
        cursor = %start,
        max_items = ?request.max_items,
        "starting export"
    );

    let mut state = Walk {
        batch: Vec::new(),
        cursor: Cursor::start(),
        has_more: true,
        resumable: true,
        pages: 0,
    };
    if let Err(e) = walk(platform, request, start, pb, &mut state) {
        pb.abandon();
        if !state.batch.is_empty() {
            write_json(&request.output, &state.batch)?;
            if let Some(cursor) = state.persistable_cursor() {
                store.save(cursor)?;
            }
            warn!(
                items = state.batch.len(),
                output = %request.output.display(),
                "listing failed; partial batch written"
            );
        }
        return Err(e);
    }

    write_json(&request.output, &state.batch)?;

    let persisted_cursor = match state.persistable_cursor() {
        Some(cursor) if state.has_more => {
            store.save(cursor)?;
            Some(cursor.clone())
        }
        _ => None,
    };

    pb.finish_and_clear();
    let report = ExportReport {
        items: state.batch.len(),
        degraded: state.batch.iter().filter(|item| item.is_degraded()).count(),
        pages: state.pages,
        persisted_cursor,
        exhausted: !state.has_more,
        started_at,
        finished_at: Utc::now(),
    };
    info!(
        items = report.items,
        degraded = report.degraded,
        pages = report.pages,
        elapsed_ms = report.elapsed().num_milliseconds(),
        output = %request.output.display(),
        "export finished"
    );
    Ok(report)
}
