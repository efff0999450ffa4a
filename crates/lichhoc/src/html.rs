use anyhow::Result;
use chrono::NaiveDate;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::Path;

use crate::grid::{week_view, WeekView};
use crate::types::{Period, TimetableEntry};
use crate::week::{format_date_dmy, shift_week, DAY_LABELS};

/// Write a static week view to disk (the `build` command).
pub fn generate_html(entries: &[TimetableEntry], reference: NaiveDate, path: &Path) -> Result<()> {
    let html = render_page(entries, reference, None);
    fs::write(path, html.into_string())?;
    Ok(())
}

/// Render the weekly grid page for the week containing `reference`.
pub fn render_page(
    entries: &[TimetableEntry],
    reference: NaiveDate,
    notice: Option<&str>,
) -> Markup {
    let view = week_view(entries, reference);
    let prev = shift_week(reference, -1).format("%Y-%m-%d");
    let next = shift_week(reference, 1).format("%Y-%m-%d");

    html! {
        (DOCTYPE)
        html lang="vi" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Lịch học" }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container {
                    h1 { "💗 Lịch học của bạn nhỏ 💗" }
                    @if let Some(msg) = notice {
                        div.notice { (msg) }
                    }
                    div.toolbar {
                        a.nav-button href={"/?week=" (prev)} { "Tuần Trước" }
                        form.upload-form action="/api/upload" method="post" enctype="multipart/form-data" {
                            input type="file" name="file" accept=".xlsx,.xls,.xlsb,.ods" required;
                            button type="submit" { "Tải File Excel" }
                        }
                        a.nav-button href={"/?week=" (next)} { "Tuần Tiếp" }
                    }
                    div.stats {
                        span #"total-count" { (entries.len()) }
                        " lớp học phần"
                    }
                    (render_week_table(&view))
                    @if entries.is_empty() {
                        div.empty-state {
                            p { "Chưa có thời khóa biểu. Tải lên file Excel để bắt đầu." }
                        }
                    }
                }
            }
        }
    }
}

fn render_week_table(view: &WeekView<'_>) -> Markup {
    html! {
        table.timetable {
            thead {
                tr {
                    th.corner { }
                    @for (i, day) in view.days.iter().enumerate() {
                        th {
                            div.day-name { (DAY_LABELS[i]) }
                            div.day-date { (format_date_dmy(*day)) }
                        }
                    }
                }
            }
            tbody {
                @for (period, row) in Period::ALL.iter().zip(&view.cells) {
                    tr {
                        th.period-label { (period.label()) }
                        @for cell in row {
                            td {
                                @for entry in cell {
                                    (render_entry_card(entry))
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn render_entry_card(entry: &TimetableEntry) -> Markup {
    html! {
        div.entry-card {
            p.entry-name { (entry.course_name) }
            p { span.field-label { "Mã HP: " } (entry.course_code) }
            @if !entry.session_label.is_empty() {
                p { span.field-label { "Tiết: " } (entry.session_label) }
            }
            p {
                span.field-label { "Giờ: " }
                (display_time(&entry.start_time)) " - " (display_time(&entry.end_time))
            }
            p { span.field-label { "Phòng: " } (entry.room) }
        }
    }
}

/// `HH:MM:SS` shown as `HH:MM`.
fn display_time(time: &str) -> &str {
    if time.len() == 8 {
        &time[..5]
    } else {
        time
    }
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    background: #fdf2f8;
    color: #333;
    min-height: 100vh;
    line-height: 1.4;
}

.container {
    max-width: 1280px;
    margin: 0 auto;
    padding: 24px 16px 48px;
    background: #fff;
    border-radius: 12px;
    box-shadow: 0 2px 12px rgba(236, 72, 153, 0.15);
}

h1 {
    text-align: center;
    font-size: 1.6em;
    margin-bottom: 20px;
}

.notice {
    background: #fef3c7;
    border: 1px solid #f59e0b;
    border-radius: 8px;
    padding: 10px 14px;
    margin-bottom: 16px;
}

.toolbar {
    display: flex;
    justify-content: space-between;
    align-items: center;
    gap: 12px;
    flex-wrap: wrap;
    margin-bottom: 12px;
}

.nav-button {
    display: inline-block;
    padding: 8px 18px;
    background: #fff;
    border: 1px solid #d9d9d9;
    border-radius: 8px;
    color: #333;
    text-decoration: none;
}

.nav-button:hover {
    border-color: #ec4899;
    color: #ec4899;
}

.upload-form {
    display: flex;
    align-items: center;
    gap: 8px;
}

.upload-form button {
    padding: 8px 18px;
    background: #ec4899;
    color: #fff;
    border: none;
    border-radius: 8px;
    cursor: pointer;
}

.upload-form button:hover {
    background: #db2777;
}

.stats {
    color: #888;
    font-size: 0.85em;
    margin-bottom: 16px;
}

.timetable {
    width: 100%;
    border-collapse: collapse;
    table-layout: fixed;
}

.timetable th,
.timetable td {
    border: 1px solid #fbcfe8;
    padding: 6px;
    vertical-align: top;
}

.timetable thead th {
    background: #fce7f3;
}

.day-name {
    font-weight: 600;
}

.day-date {
    font-size: 0.8em;
    color: #888;
    font-weight: 400;
}

.period-label {
    background: #fbcfe8;
    font-weight: 700;
    width: 56px;
    text-align: center;
}

.entry-card {
    background: #fce7f3;
    border: 1px solid #f9a8d4;
    border-radius: 8px;
    padding: 8px;
    margin-bottom: 10px;
    font-size: 0.72rem;
    box-shadow: 0 1px 2px rgba(0, 0, 0, 0.05);
}

.entry-card:last-child {
    margin-bottom: 0;
}

.entry-name {
    font-weight: 700;
    margin-bottom: 4px;
}

.field-label {
    font-weight: 700;
}

.empty-state {
    text-align: center;
    color: #888;
    padding: 32px 0;
}
"#;
