use crate::attendance::{self, AttendanceRecord};
use crate::auth::Permission;
use crate::ipc::helpers::{parse_params, require_any, respond, role_from, to_value, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde::Deserialize;
use serde_json::json;

const ATTENDANCE_READERS: [Permission; 3] = [
    Permission::RecordAttendance,
    Permission::ViewChildAttendance,
    Permission::ViewAllReports,
];

#[derive(Deserialize)]
struct RecordsParams {
    #[serde(default)]
    role: serde_json::Value,
    #[serde(default)]
    records: Vec<AttendanceRecord>,
    #[serde(default)]
    months: Option<Vec<String>>,
}

impl RecordsParams {
    // Omitted labels mean the whole session in school order.
    fn month_labels(&self) -> Vec<String> {
        self.months.clone().unwrap_or_else(attendance::session_months)
    }
}

fn attendance_summary(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: RecordsParams = parse_params(req)?;
    to_value(&attendance::summarize(&p.records))
}

fn attendance_monthly(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: RecordsParams = parse_params(req)?;
    let months = attendance::monthly_breakdown(&p.records, &p.month_labels());
    Ok(json!({ "months": to_value(&months)? }))
}

fn attendance_report(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: RecordsParams = parse_params(req)?;
    require_any(state, req, role_from(&p.role), &ATTENDANCE_READERS)?;
    to_value(&attendance::report(&p.records, &p.month_labels()))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.summary" => attendance_summary(req),
        "attendance.monthly" => attendance_monthly(req),
        "attendance.report" => attendance_report(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
