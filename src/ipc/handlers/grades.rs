use crate::auth::Permission;
use crate::config::ScorePolicy;
use crate::grades::{self, GradeLetter, PerTermData, ScoreEntry, ScoreKind, StudentAverage, StudentKey, Term};
use crate::ipc::helpers::{parse_params, require_any, respond, role_from, to_value, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

const REPORT_CARD_READERS: [Permission; 3] = [
    Permission::ViewChildReportCard,
    Permission::ViewClassPerformance,
    Permission::ViewAllReports,
];

// A missing or null total grades as 0.
#[derive(Deserialize)]
struct LetterParams {
    #[serde(default)]
    total: Option<f64>,
}

fn grades_letter(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: LetterParams = parse_params(req)?;
    Ok(json!({ "grade": grades::grade_letter(p.total.unwrap_or(0.0)) }))
}

#[derive(Deserialize)]
struct TermTotalParams {
    #[serde(default)]
    ca: Option<f64>,
    #[serde(default)]
    exam: Option<f64>,
}

fn grades_term_total(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: TermTotalParams = parse_params(req)?;
    let total = grades::term_total(p.ca.unwrap_or(0.0), p.exam.unwrap_or(0.0));
    Ok(json!({ "total": total }))
}

#[derive(Deserialize)]
struct ValidateScoreParams {
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    kind: String,
}

fn grades_validate_score(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: ValidateScoreParams = parse_params(req)?;
    let score = p.score.unwrap_or(0.0);
    to_value(&grades::validate_score(score, ScoreKind::from_label(&p.kind)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TermAverageParams {
    #[serde(default)]
    term_totals: Vec<Option<f64>>,
}

fn grades_term_average(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: TermAverageParams = parse_params(req)?;
    Ok(json!({
        "average": grades::term_average(&p.term_totals),
        "cumulative": grades::cumulative_total(&p.term_totals),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TermDisplayParams {
    current_term: Term,
    #[serde(default)]
    data: PerTermData,
}

fn grades_term_display(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: TermDisplayParams = parse_params(req)?;
    to_value(&grades::term_display_data(p.current_term, &p.data))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryParams {
    current_term: Term,
    #[serde(default)]
    subjects: BTreeMap<String, PerTermData>,
}

fn grades_summary(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: SummaryParams = parse_params(req)?;
    to_value(&grades::grade_summary(&p.subjects, p.current_term))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassPositionParams {
    #[serde(default)]
    student_averages: Vec<StudentAverage>,
    student_id: StudentKey,
}

fn grades_class_position(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: ClassPositionParams = parse_params(req)?;
    Ok(json!({
        "position": grades::class_position(&p.student_averages, &p.student_id),
        "classSize": p.student_averages.len(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassRankingParams {
    #[serde(default)]
    student_averages: Vec<StudentAverage>,
}

fn grades_class_ranking(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: ClassRankingParams = parse_params(req)?;
    Ok(json!({ "ranking": to_value(&grades::class_ranking(&p.student_averages))? }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportCardParams {
    #[serde(default)]
    role: serde_json::Value,
    current_term: Term,
    #[serde(default)]
    subjects: BTreeMap<String, PerTermData>,
    #[serde(default)]
    class_averages: Option<Vec<StudentAverage>>,
    #[serde(default)]
    student_id: Option<StudentKey>,
}

fn grades_report_card(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: ReportCardParams = parse_params(req)?;
    require_any(state, req, role_from(&p.role), &REPORT_CARD_READERS)?;
    let card = grades::report_card(
        &p.subjects,
        p.current_term,
        p.class_averages.as_deref(),
        p.student_id.as_ref(),
    );
    to_value(&card)
}

#[derive(Deserialize)]
struct SubmittedScore {
    subject: String,
    #[serde(default)]
    ca: Option<f64>,
    #[serde(default)]
    exam: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitScoresParams {
    #[serde(default)]
    role: serde_json::Value,
    current_term: Term,
    #[serde(default)]
    entries: Vec<SubmittedScore>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreProblem {
    subject: String,
    field: &'static str,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AcceptedScore {
    subject: String,
    ca: f64,
    exam: f64,
    total: f64,
    grade: GradeLetter,
}

fn check_entry(entry: &SubmittedScore) -> Vec<ScoreProblem> {
    let mut problems = Vec::new();
    for (field, value, kind) in [
        ("ca", entry.ca, ScoreKind::Ca),
        ("exam", entry.exam, ScoreKind::Exam),
    ] {
        let Some(score) = value else {
            continue;
        };
        let v = grades::validate_score(score, kind);
        if !v.is_valid {
            problems.push(ScoreProblem {
                subject: entry.subject.clone(),
                field,
                message: v.message,
            });
        }
    }
    problems
}

/// Turns submitted raw scores into the entries the caller should store.
/// Under the strict policy one bad score refuses the whole batch.
fn grades_submit_scores(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let p: SubmitScoresParams = parse_params(req)?;
    require_any(state, req, role_from(&p.role), &[Permission::RecordGrades])?;

    let problems: Vec<ScoreProblem> = p.entries.iter().flat_map(check_entry).collect();
    if !problems.is_empty() && state.config.score_policy == ScorePolicy::Strict {
        tracing::warn!(rejected = problems.len(), "score submission rejected");
        return Err(HandlerErr {
            code: "validation_failed",
            message: problems[0].message.clone(),
            details: Some(json!({ "errors": to_value(&problems)? })),
        });
    }

    let accepted: Vec<AcceptedScore> = p
        .entries
        .iter()
        .map(|e| {
            let entry = ScoreEntry {
                continuous_assessment: e.ca,
                exam_score: e.exam,
            };
            let total = entry.total();
            AcceptedScore {
                subject: e.subject.clone(),
                ca: entry.ca(),
                exam: entry.exam(),
                total,
                grade: grades::grade_letter(total),
            }
        })
        .collect();

    Ok(json!({
        "currentTerm": p.current_term,
        "entries": to_value(&accepted)?,
        "warnings": to_value(&problems)?,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "grades.letter" => grades_letter(req),
        "grades.termTotal" => grades_term_total(req),
        "grades.validateScore" => grades_validate_score(req),
        "grades.termAverage" => grades_term_average(req),
        "grades.termDisplay" => grades_term_display(req),
        "grades.summary" => grades_summary(req),
        "grades.classPosition" => grades_class_position(req),
        "grades.classRanking" => grades_class_ranking(req),
        "grades.reportCard" => grades_report_card(state, req),
        "grades.submitScores" => grades_submit_scores(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
