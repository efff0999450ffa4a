use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::data::{self, ImportError};
use crate::html;
use crate::store;
use crate::types::TimetableEntry;

/// Application state shared across requests.
///
/// The entry batch is only ever replaced wholesale: a reader sees either
/// the previous complete batch or the next one, never a partial update.
/// Concurrent imports race and the last write wins.
pub struct AppState {
    pub entries: RwLock<Vec<TimetableEntry>>,
    pub data_dir: PathBuf,
}

impl AppState {
    pub fn new(entries: Vec<TimetableEntry>, data_dir: PathBuf) -> Self {
        Self {
            entries: RwLock::new(entries),
            data_dir,
        }
    }
}

/// Start the web server with data-directory watching.
pub async fn serve(port: u16, data_dir: PathBuf) -> anyhow::Result<()> {
    let entries = data::load_or_import(&data_dir)?;
    info!(count = entries.len(), "Timetable loaded");

    let state = Arc::new(AppState::new(entries, data_dir));

    start_file_watcher(state.clone())?;

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(%addr, "Server running");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/entries", get(entries_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/refresh", get(refresh_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Watch the data directory and re-import when a workbook file appears or
/// changes. The JSON store lives in the same directory but is filtered out
/// by extension.
fn start_file_watcher(state: Arc<AppState>) -> anyhow::Result<()> {
    let data_dir = state.data_dir.clone();

    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        info!(dir = %data_dir.display(), "Created data directory");
    }

    let (tx, mut rx) = tokio::sync::mpsc::channel(10);

    let watch_dir = data_dir.clone();
    std::thread::spawn(move || {
        let tx_clone = tx.clone();
        let mut debouncer = new_debouncer(
            Duration::from_secs(2),
            move |result: DebounceEventResult| {
                if let Ok(events) = result {
                    let has_workbook = events.iter().any(|e| {
                        e.path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .map(data::is_workbook_file)
                            .unwrap_or(false)
                    });

                    if has_workbook {
                        let _ = tx_clone.blocking_send(());
                    }
                }
            },
        )
        .expect("Failed to create debouncer");

        debouncer
            .watcher()
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .expect("Failed to watch data directory");

        // Keep the watcher alive
        loop {
            std::thread::sleep(Duration::from_secs(60));
        }
    });

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            info!("Detected workbook change in data directory");
            match data::refresh_from_dir(&state.data_dir) {
                Ok(new_entries) => {
                    let mut entries = state.entries.write().await;
                    let old_count = entries.len();
                    *entries = new_entries;
                    info!(old = old_count, new = entries.len(), "Timetable replaced");
                }
                Err(e) => {
                    warn!(error = %e, "Refresh failed, keeping previous timetable");
                }
            }
        }
    });

    Ok(())
}

#[derive(Debug, Deserialize)]
struct WeekQuery {
    week: Option<String>,
}

impl WeekQuery {
    /// Reference date for the requested week; bad or missing values fall
    /// back to today.
    fn reference(&self) -> NaiveDate {
        self.week
            .as_deref()
            .and_then(|w| NaiveDate::parse_from_str(w, "%Y-%m-%d").ok())
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Serve the weekly grid page.
async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeekQuery>,
) -> Html<String> {
    let entries = state.entries.read().await;
    let markup = html::render_page(&entries, query.reference(), None);
    Html(markup.into_string())
}

/// Return the current batch as JSON (the read endpoint).
async fn entries_handler(State(state): State<Arc<AppState>>) -> Json<Vec<TimetableEntry>> {
    let entries = state.entries.read().await;
    Json(entries.clone())
}

/// Accept a workbook upload, replace the batch on success.
///
/// Any failure keeps the previous batch and reports back; nothing partial
/// is ever installed.
async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    let mut file_bytes: Option<Vec<u8>> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("file") {
                    match field.bytes().await {
                        Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                        Err(e) => {
                            return Err(upload_error(
                                &state,
                                StatusCode::BAD_REQUEST,
                                &format!("Lỗi khi đọc file tải lên: {}", e),
                            )
                            .await);
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return Err(upload_error(
                    &state,
                    StatusCode::BAD_REQUEST,
                    &format!("Lỗi khi đọc file tải lên: {}", e),
                )
                .await);
            }
        }
    }

    let Some(bytes) = file_bytes else {
        return Err(upload_error(&state, StatusCode::BAD_REQUEST, "Thiếu file tải lên").await);
    };

    match data::import_bytes(bytes) {
        Ok(new_entries) => {
            if let Err(e) = store::save(&state.data_dir, &new_entries) {
                error!(error = %e, "Failed to persist uploaded timetable");
                return Err(upload_error(
                    &state,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Lỗi khi lưu thời khóa biểu",
                )
                .await);
            }
            let mut entries = state.entries.write().await;
            *entries = new_entries;
            info!(count = entries.len(), "Timetable replaced via upload");
            Ok(Redirect::to("/"))
        }
        Err(e) => {
            warn!(error = %e, "Upload rejected, keeping previous timetable");
            Err(upload_error(
                &state,
                StatusCode::UNPROCESSABLE_ENTITY,
                &format!("Lỗi khi xử lý file Excel: {}", e),
            )
            .await)
        }
    }
}

/// Render the current (unchanged) week page with an error notice.
async fn upload_error(
    state: &Arc<AppState>,
    status: StatusCode,
    message: &str,
) -> (StatusCode, Html<String>) {
    let entries = state.entries.read().await;
    let markup = html::render_page(&entries, Local::now().date_naive(), Some(message));
    (status, Html(markup.into_string()))
}

/// Re-import from the data directory (manual trigger).
async fn refresh_handler(State(state): State<Arc<AppState>>) -> &'static str {
    info!("Manual refresh triggered");

    match data::refresh_from_dir(&state.data_dir) {
        Ok(new_entries) => {
            let mut entries = state.entries.write().await;
            *entries = new_entries;
            "OK"
        }
        Err(ImportError::NoWorkbook) => {
            warn!("Refresh requested but no workbook present");
            "NO WORKBOOK"
        }
        Err(e) => {
            warn!(error = %e, "Refresh failed, keeping previous timetable");
            "ERROR"
        }
    }
}
