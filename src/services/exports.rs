//! Spreadsheet exports

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet, XlsxError};
use tempfile::TempDir;

use crate::{
    error::{AppError, AppResult},
    models::{AttendanceExportRow, Capability, Visitor},
    repository::Repository,
};

use super::{calendar::format_local, permissions::PermissionService};

const VISITOR_HEADERS: [&str; 9] = [
    "#",
    "Telegram ID",
    "Name",
    "Username",
    "Phone",
    "Source",
    "Gender",
    "Registered",
    "Last visit",
];

const ATTENDANCE_HEADERS: [&str; 8] = [
    "ID",
    "Time",
    "Location",
    "Visitor ID",
    "Name",
    "Phone",
    "Marked by",
    "Staff name",
];

/// A generated workbook. The file lives in its own temporary directory and
/// is removed when this value is dropped.
#[derive(Debug)]
pub struct ExportFile {
    _dir: TempDir,
    path: PathBuf,
    pub rows: usize,
}

impl ExportFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn xlsx_error(e: XlsxError) -> AppError {
    AppError::Internal(format!("Spreadsheet encoding failed: {}", e))
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x4F81BD))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
}

fn write_header(worksheet: &mut Worksheet, headers: &[&str]) -> Result<(), XlsxError> {
    let format = header_format();
    for (col, title) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &format)?;
    }
    Ok(())
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn visitors_workbook(visitors: &[Visitor], offset: FixedOffset, path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Visitors")?;
    write_header(worksheet, &VISITOR_HEADERS)?;

    for (index, visitor) in visitors.iter().enumerate() {
        let row = index as u32 + 1;
        let username = visitor.username.as_ref().map(|u| format!("@{}", u));
        worksheet.write_number(row, 0, row as f64)?;
        worksheet.write_number(row, 1, visitor.telegram_id as f64)?;
        worksheet.write_string(row, 2, or_dash(visitor.first_name.as_deref()))?;
        worksheet.write_string(row, 3, or_dash(username.as_deref()))?;
        worksheet.write_string(row, 4, &visitor.phone)?;
        worksheet.write_string(row, 5, &visitor.source)?;
        worksheet.write_string(row, 6, or_dash(visitor.gender.map(|g| g.as_str())))?;
        worksheet.write_string(row, 7, format_local(visitor.registered_at, offset))?;
        let last_visit = visitor.attended_date.map(|d| format_local(d, offset));
        worksheet.write_string(row, 8, or_dash(last_visit.as_deref()))?;
    }

    worksheet.autofit();
    workbook.save(path)
}

fn attendance_workbook(rows: &[AttendanceExportRow], offset: FixedOffset, path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Attendance")?;
    write_header(worksheet, &ATTENDANCE_HEADERS)?;

    for (index, event) in rows.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_number(row, 0, event.id as f64)?;
        worksheet.write_string(row, 1, format_local(event.marked_at, offset))?;
        worksheet.write_string(row, 2, &event.location)?;
        worksheet.write_number(row, 3, event.visitor_telegram_id as f64)?;
        worksheet.write_string(row, 4, or_dash(event.first_name.as_deref()))?;
        worksheet.write_string(row, 5, or_dash(event.phone.as_deref()))?;
        worksheet.write_number(row, 6, event.marked_by as f64)?;
        worksheet.write_string(row, 7, or_dash(event.staff_name.as_deref()))?;
    }

    worksheet.autofit();
    workbook.save(path)
}

/// `FamilyPark_2026-10-18_14-05.xlsx`
pub fn file_name(venue: &str, now: DateTime<Utc>, offset: FixedOffset) -> String {
    let venue: String = venue
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{}.xlsx", venue, now.with_timezone(&offset).format("%Y-%m-%d_%H-%M"))
}

#[derive(Clone)]
pub struct ExportService {
    repository: Repository,
    permissions: PermissionService,
    venue: String,
    offset: FixedOffset,
}

impl ExportService {
    pub fn new(repository: Repository, permissions: PermissionService, venue: String, offset: FixedOffset) -> Self {
        Self {
            repository,
            permissions,
            venue,
            offset,
        }
    }

    fn target(&self) -> AppResult<(TempDir, PathBuf)> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(file_name(&self.venue, Utc::now(), self.offset));
        Ok((dir, path))
    }

    pub async fn visitors(&self, actor: i64) -> AppResult<ExportFile> {
        self.permissions.authorize(actor, Capability::ExportData).await?;
        let visitors = self.repository.visitors.list().await?;
        let (dir, path) = self.target()?;

        let offset = self.offset;
        let rows = visitors.len();
        let target = path.clone();
        tokio::task::spawn_blocking(move || visitors_workbook(&visitors, offset, &target))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(xlsx_error)?;

        tracing::info!(actor, rows, "Visitor list exported");
        Ok(ExportFile { _dir: dir, path, rows })
    }

    pub async fn attendance(&self, actor: i64) -> AppResult<ExportFile> {
        self.permissions.authorize(actor, Capability::ExportData).await?;
        let events = self.repository.attendance.list_export().await?;
        let (dir, path) = self.target()?;

        let offset = self.offset;
        let rows = events.len();
        let target = path.clone();
        tokio::task::spawn_blocking(move || attendance_workbook(&events, offset, &target))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(xlsx_error)?;

        tracing::info!(actor, rows, "Attendance log exported");
        Ok(ExportFile { _dir: dir, path, rows })
    }
}
