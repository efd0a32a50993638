use crate::grades::round_percent;
use chrono::{DateTime, Datelike, Month, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Sessions open in September and run through July.
pub const SESSION_START_MONTH: u32 = 9;
const SESSION_MONTH_COUNT: u32 = 11;

/// One student on one school day. `reason` only means something for an
/// absence; a reason on a present day is ignored everywhere below.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttendanceRecord {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub present: Option<bool>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AttendanceRecord {
    #[cfg(test)]
    pub fn new(date: &str, present: bool) -> Self {
        Self {
            date: date.to_string(),
            present: Some(present),
            reason: None,
        }
    }

    #[cfg(test)]
    pub fn absent(date: &str, reason: &str) -> Self {
        Self {
            date: date.to_string(),
            present: Some(false),
            reason: Some(reason.to_string()),
        }
    }

    pub fn is_present(&self) -> bool {
        self.present == Some(true)
    }

    /// English month name of the record's calendar date, as written.
    pub fn month_name(&self) -> Option<&'static str> {
        let date = calendar_date(&self.date)?;
        let month = Month::try_from(date.month() as u8).ok()?;
        Some(month.name())
    }
}

// Timestamps without an offset, as most backends emit them.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

// Accepts a bare `YYYY-MM-DD`, an RFC 3339 timestamp or an offset-less
// timestamp. The day is read as written; there is no conversion to local time.
fn calendar_date(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.date_naive());
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(t, fmt).ok())
        .map(|dt| dt.date())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub total_days: usize,
    pub present_days: usize,
    pub absent_days: usize,
    pub attendance_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStat {
    pub month: String,
    pub total_days: usize,
    pub present_days: usize,
    pub absent_days: usize,
    pub attendance_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Absence {
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub summary: AttendanceSummary,
    pub months: Vec<MonthlyStat>,
    pub absences: Vec<Absence>,
}

fn attendance_rate(present_days: usize, total_days: usize) -> i64 {
    if total_days == 0 {
        return 0;
    }
    round_percent((present_days as f64) / (total_days as f64) * 100.0)
}

pub fn summarize<'a, I>(records: I) -> AttendanceSummary
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut total_days = 0_usize;
    let mut present_days = 0_usize;
    for r in records {
        total_days += 1;
        if r.is_present() {
            present_days += 1;
        }
    }
    AttendanceSummary {
        total_days,
        present_days,
        absent_days: total_days - present_days,
        attendance_rate: attendance_rate(present_days, total_days),
    }
}

/// One row per requested label, in the order given. Records whose date
/// cannot be read belong to no month.
pub fn monthly_breakdown(records: &[AttendanceRecord], months: &[String]) -> Vec<MonthlyStat> {
    let keyed: Vec<(Option<&'static str>, &AttendanceRecord)> =
        records.iter().map(|r| (r.month_name(), r)).collect();

    months
        .iter()
        .map(|label| {
            let s = summarize(
                keyed
                    .iter()
                    .filter(|(m, _)| *m == Some(label.as_str()))
                    .map(|(_, r)| *r),
            );
            MonthlyStat {
                month: label.clone(),
                total_days: s.total_days,
                present_days: s.present_days,
                absent_days: s.absent_days,
                attendance_rate: s.attendance_rate,
            }
        })
        .collect()
}

/// September through July.
pub fn session_months() -> Vec<String> {
    (0..SESSION_MONTH_COUNT)
        .map(|i| (SESSION_START_MONTH - 1 + i) % 12 + 1)
        .filter_map(|m| Month::try_from(m as u8).ok())
        .map(|m| m.name().to_string())
        .collect()
}

pub fn absences(records: &[AttendanceRecord]) -> Vec<Absence> {
    records
        .iter()
        .filter(|r| !r.is_present())
        .map(|r| Absence {
            date: r.date.clone(),
            reason: r.reason.clone(),
        })
        .collect()
}

pub fn report(records: &[AttendanceRecord], months: &[String]) -> AttendanceReport {
    AttendanceReport {
        summary: summarize(records),
        months: monthly_breakdown(records, months),
        absences: absences(records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn summarize_empty_is_all_zero() {
        let s = summarize(&[] as &[AttendanceRecord]);
        assert_eq!(
            s,
            AttendanceSummary {
                total_days: 0,
                present_days: 0,
                absent_days: 0,
                attendance_rate: 0,
            }
        );
    }

    #[test]
    fn summarize_nine_of_ten_is_ninety() {
        let mut records: Vec<AttendanceRecord> = (1..=9)
            .map(|d| AttendanceRecord::new(&format!("2024-10-{:02}", d), true))
            .collect();
        records.push(AttendanceRecord::new("2024-10-10", false));
        let s = summarize(&records);
        assert_eq!(s.total_days, 10);
        assert_eq!(s.present_days, 9);
        assert_eq!(s.absent_days, 1);
        assert_eq!(s.attendance_rate, 90);
    }

    #[test]
    fn summarize_rounds_half_up() {
        // 1 of 8 present = 12.5%
        let mut records = vec![AttendanceRecord::new("2024-10-01", true)];
        records.extend((2..=8).map(|d| AttendanceRecord::new(&format!("2024-10-{:02}", d), false)));
        assert_eq!(summarize(&records).attendance_rate, 13);
    }

    #[test]
    fn missing_present_flag_counts_as_absent() {
        let r: AttendanceRecord =
            serde_json::from_value(serde_json::json!({"date": "2024-09-02", "present": null})).unwrap();
        assert!(!r.is_present());
        assert_eq!(summarize(&[r]).absent_days, 1);
    }

    #[test]
    fn month_name_reads_calendar_date_as_written() {
        assert_eq!(AttendanceRecord::new("2024-03-01", true).month_name(), Some("March"));
        assert_eq!(
            AttendanceRecord::new("2024-03-01T00:30:00+01:00", true).month_name(),
            Some("March")
        );
        for raw in ["2024-09-02T08:00:00", "2024-09-02T08:00:00.000", "2024-09-02 08:00:00"] {
            assert_eq!(AttendanceRecord::new(raw, true).month_name(), Some("September"), "{}", raw);
        }
        assert_eq!(AttendanceRecord::new("not a date", true).month_name(), None);
        assert_eq!(AttendanceRecord::new("", true).month_name(), None);
    }

    #[test]
    fn monthly_breakdown_follows_requested_order() {
        let records = vec![
            AttendanceRecord::new("2024-09-02", true),
            AttendanceRecord::new("2024-09-03", false),
            AttendanceRecord::new("2024-10-01", true),
            AttendanceRecord::new("garbage", true),
        ];
        let out = monthly_breakdown(&records, &labels(&["October", "September", "November"]));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].month, "October");
        assert_eq!(out[0].total_days, 1);
        assert_eq!(out[0].attendance_rate, 100);
        assert_eq!(out[1].month, "September");
        assert_eq!(out[1].present_days, 1);
        assert_eq!(out[1].attendance_rate, 50);
        assert_eq!(out[2].total_days, 0);
        assert_eq!(out[2].attendance_rate, 0);
    }

    #[test]
    fn monthly_breakdown_matches_labels_exactly() {
        let records = vec![AttendanceRecord::new("2024-09-02", true)];
        let out = monthly_breakdown(&records, &labels(&["september", "Sep"]));
        assert!(out.iter().all(|m| m.total_days == 0));
        assert!(monthly_breakdown(&records, &[]).is_empty());
    }

    #[test]
    fn session_runs_september_to_july() {
        let months = session_months();
        assert_eq!(months.len(), 11);
        assert_eq!(months.first().map(String::as_str), Some("September"));
        assert_eq!(months[3], "December");
        assert_eq!(months[4], "January");
        assert_eq!(months.last().map(String::as_str), Some("July"));
    }

    #[test]
    fn absences_drop_reasons_on_present_days() {
        let mut present_with_reason = AttendanceRecord::new("2024-09-02", true);
        present_with_reason.reason = Some("late bus".to_string());
        let records = vec![
            present_with_reason,
            AttendanceRecord::absent("2024-09-03", "sick"),
            AttendanceRecord::new("2024-09-04", false),
        ];
        let out = absences(&records);
        assert_eq!(
            out,
            vec![
                Absence {
                    date: "2024-09-03".to_string(),
                    reason: Some("sick".to_string()),
                },
                Absence {
                    date: "2024-09-04".to_string(),
                    reason: None,
                },
            ]
        );
    }

    #[test]
    fn report_combines_all_views() {
        let records = vec![
            AttendanceRecord::new("2024-09-02", true),
            AttendanceRecord::absent("2024-09-03", "sick"),
        ];
        let r = report(&records, &session_months());
        assert_eq!(r.summary.attendance_rate, 50);
        assert_eq!(r.months.len(), 11);
        assert_eq!(r.months[0].total_days, 2);
        assert_eq!(r.absences.len(), 1);
    }
}
