use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const CA_MAX: f64 = 30.0;
pub const EXAM_MAX: f64 = 70.0;
pub const DEFAULT_SCORE_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GradeLetter {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "D+")]
    DPlus,
    D,
    E,
    F,
}

impl GradeLetter {
    pub fn as_str(self) -> &'static str {
        match self {
            GradeLetter::APlus => "A+",
            GradeLetter::A => "A",
            GradeLetter::BPlus => "B+",
            GradeLetter::B => "B",
            GradeLetter::CPlus => "C+",
            GradeLetter::C => "C",
            GradeLetter::DPlus => "D+",
            GradeLetter::D => "D",
            GradeLetter::E => "E",
            GradeLetter::F => "F",
        }
    }
}

impl fmt::Display for GradeLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds, highest first. Anything below the last row is an F.
const GRADE_BOUNDARIES: [(f64, GradeLetter); 9] = [
    (90.0, GradeLetter::APlus),
    (80.0, GradeLetter::A),
    (75.0, GradeLetter::BPlus),
    (70.0, GradeLetter::B),
    (65.0, GradeLetter::CPlus),
    (60.0, GradeLetter::C),
    (55.0, GradeLetter::DPlus),
    (50.0, GradeLetter::D),
    (45.0, GradeLetter::E),
];

pub fn grade_letter(total: f64) -> GradeLetter {
    GRADE_BOUNDARIES
        .iter()
        .find(|(min, _)| total >= *min)
        .map(|(_, grade)| *grade)
        .unwrap_or(GradeLetter::F)
}

/// `floor(x + 0.5)`: halves always round toward +infinity, including for
/// negative inputs. Every rounded figure the dashboard shows goes through this.
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn round_2_decimal(x: f64) -> f64 {
    round_half_up(x * 100.0) / 100.0
}

/// Integer form of `round_half_up` for percentages. NaN maps to 0.
pub fn round_percent(x: f64) -> i64 {
    round_half_up(x) as i64
}

// Upper clamp only. NaN passes through untouched.
fn cap(value: f64, max: f64) -> f64 {
    if value > max {
        max
    } else {
        value
    }
}

/// `min(ca, 30) + min(exam, 70)`. Negative inputs are not raised to zero;
/// `validate_score` is where negatives get rejected.
pub fn term_total(ca: f64, exam: f64) -> f64 {
    cap(ca, CA_MAX) + cap(exam, EXAM_MAX)
}

pub fn cumulative_total(term_totals: &[Option<f64>]) -> f64 {
    term_totals
        .iter()
        .fold(0.0, |acc, t| acc + t.unwrap_or(0.0))
}

/// Mean of the terms that have a total, to 2 decimal places.
pub fn term_average(term_totals: &[Option<f64>]) -> f64 {
    let defined: Vec<f64> = term_totals.iter().filter_map(|t| *t).collect();
    if defined.is_empty() {
        return 0.0;
    }
    let sum = defined.iter().fold(0.0, |acc, t| acc + t);
    round_2_decimal(sum / (defined.len() as f64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub enum Term {
    First,
    Second,
    Third,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::First, Term::Second, Term::Third];

    pub fn from_number(n: i64) -> Option<Term> {
        match n {
            1 => Some(Term::First),
            2 => Some(Term::Second),
            3 => Some(Term::Third),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Term::First => 1,
            Term::Second => 2,
            Term::Third => 3,
        }
    }
}

impl TryFrom<i64> for Term {
    type Error = String;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        Term::from_number(n).ok_or_else(|| format!("term must be 1, 2 or 3 (got {})", n))
    }
}

impl From<Term> for u8 {
    fn from(term: Term) -> u8 {
        term.number()
    }
}

/// One subject's scores for one term. Either half may be absent on the wire;
/// an absent half counts as 0. The total is never carried, only derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    #[serde(default, alias = "ca")]
    pub continuous_assessment: Option<f64>,
    #[serde(default, alias = "exam")]
    pub exam_score: Option<f64>,
}

impl ScoreEntry {
    #[cfg(test)]
    pub fn new(ca: f64, exam: f64) -> Self {
        Self {
            continuous_assessment: Some(ca),
            exam_score: Some(exam),
        }
    }

    pub fn ca(&self) -> f64 {
        self.continuous_assessment.unwrap_or(0.0)
    }

    pub fn exam(&self) -> f64 {
        self.exam_score.unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        term_total(self.ca(), self.exam())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PerTermData {
    #[serde(default)]
    pub term1: Option<ScoreEntry>,
    #[serde(default)]
    pub term2: Option<ScoreEntry>,
    #[serde(default)]
    pub term3: Option<ScoreEntry>,
}

impl PerTermData {
    pub fn get(&self, term: Term) -> Option<&ScoreEntry> {
        match term {
            Term::First => self.term1.as_ref(),
            Term::Second => self.term2.as_ref(),
            Term::Third => self.term3.as_ref(),
        }
    }

    pub fn total_for(&self, term: Term) -> Option<f64> {
        self.get(term).map(ScoreEntry::total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRecord {
    pub term: Term,
    pub ca: f64,
    pub exam: f64,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cumulative: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
}

/// Columns a report shows for `current`. From term 2 on, the cumulative
/// figure sums every term so far; a term with no data contributes 0, which
/// drags the average down rather than shrinking the divisor.
pub fn term_display_data(current: Term, data: &PerTermData) -> DisplayRecord {
    let entry = data.get(current).copied().unwrap_or_default();
    let total = entry.total();

    let (cumulative, average) = match current {
        Term::First => (None, None),
        Term::Second | Term::Third => {
            let upto = current.number() as usize;
            let totals: Vec<Option<f64>> = Term::ALL[..upto]
                .iter()
                .map(|t| Some(data.total_for(*t).unwrap_or(0.0)))
                .collect();
            let cumulative = cumulative_total(&totals);
            (Some(cumulative), Some(cumulative / (upto as f64)))
        }
    };

    DisplayRecord {
        term: current,
        ca: entry.ca(),
        exam: entry.exam(),
        total,
        cumulative,
        average,
    }
}

/// Student identifier as sent by the dashboard: either a JSON string or a
/// number. Compared by textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StudentKey(String);

impl StudentKey {
    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StudentKey {
    fn from(s: &str) -> Self {
        StudentKey(s.to_string())
    }
}

impl From<i64> for StudentKey {
    fn from(n: i64) -> Self {
        StudentKey(n.to_string())
    }
}

impl<'de> Deserialize<'de> for StudentKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => StudentKey(s),
            Raw::Number(n) => StudentKey(n.to_string()),
        })
    }
}

/// A missing or null average ranks as 0.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StudentAverage {
    pub id: StudentKey,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub average: f64,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStudent {
    pub id: StudentKey,
    pub average: f64,
    pub position: usize,
}

// NaN averages rank last; -0.0 and 0.0 tie.
fn rank_key(average: f64) -> f64 {
    if average.is_nan() {
        f64::NEG_INFINITY
    } else {
        average + 0.0
    }
}

/// Highest average first. The sort is stable, so tied students keep the
/// order they were supplied in.
fn rank_descending(averages: &[StudentAverage]) -> Vec<&StudentAverage> {
    let mut ranked: Vec<&StudentAverage> = averages.iter().collect();
    ranked.sort_by(|a, b| rank_key(b.average).total_cmp(&rank_key(a.average)));
    ranked
}

/// 1-based rank of `student_id`. An id that is not in the list gets
/// `averages.len()`, i.e. last place.
pub fn class_position(averages: &[StudentAverage], student_id: &StudentKey) -> usize {
    rank_descending(averages)
        .iter()
        .position(|s| &s.id == student_id)
        .map(|idx| idx + 1)
        .unwrap_or(averages.len())
}

pub fn class_ranking(averages: &[StudentAverage]) -> Vec<RankedStudent> {
    rank_descending(averages)
        .into_iter()
        .enumerate()
        .map(|(idx, s)| RankedStudent {
            id: s.id.clone(),
            average: s.average,
            position: idx + 1,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    Ca,
    Exam,
    Other,
}

impl ScoreKind {
    pub fn from_label(label: &str) -> ScoreKind {
        match label {
            "ca" => ScoreKind::Ca,
            "exam" => ScoreKind::Exam,
            _ => ScoreKind::Other,
        }
    }

    pub fn max(self) -> f64 {
        match self {
            ScoreKind::Ca => CA_MAX,
            ScoreKind::Exam => EXAM_MAX,
            ScoreKind::Other => DEFAULT_SCORE_MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreValidation {
    pub is_valid: bool,
    pub message: String,
}

impl ScoreValidation {
    fn valid() -> Self {
        Self {
            is_valid: true,
            message: String::new(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}

pub fn validate_score(score: f64, kind: ScoreKind) -> ScoreValidation {
    let max = kind.max();
    if score < 0.0 {
        return ScoreValidation::invalid("Score cannot be negative");
    }
    if score > max {
        return ScoreValidation::invalid(format!("Score cannot exceed {}", max));
    }
    ScoreValidation::valid()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSummary {
    pub subject_count: usize,
    pub total_marks: f64,
    pub total_possible: f64,
    pub overall_average: f64,
    pub overall_grade: GradeLetter,
    pub grade_distribution: BTreeMap<GradeLetter, usize>,
    pub percentage: i64,
}

/// Aggregate of every subject's `term` total. A subject with no entry for
/// that term still counts, with a total of 0.
pub fn grade_summary(subjects: &BTreeMap<String, PerTermData>, term: Term) -> GradeSummary {
    let mut total_marks = 0.0_f64;
    let mut grade_distribution: BTreeMap<GradeLetter, usize> = BTreeMap::new();

    for data in subjects.values() {
        let total = data.total_for(term).unwrap_or(0.0);
        total_marks += total;
        *grade_distribution.entry(grade_letter(total)).or_insert(0) += 1;
    }

    let subject_count = subjects.len();
    let total_possible = DEFAULT_SCORE_MAX * (subject_count as f64);
    let overall_average = if subject_count > 0 {
        total_marks / (subject_count as f64)
    } else {
        0.0
    };
    let percentage = if total_possible > 0.0 {
        round_percent(total_marks / total_possible * 100.0)
    } else {
        0
    };

    GradeSummary {
        subject_count,
        total_marks,
        total_possible,
        overall_average,
        overall_grade: grade_letter(overall_average),
        grade_distribution,
        percentage,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectReport {
    pub subject: String,
    #[serde(flatten)]
    pub display: DisplayRecord,
    pub grade: GradeLetter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCard {
    pub term: Term,
    pub subjects: Vec<SubjectReport>,
    pub summary: GradeSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_size: Option<usize>,
}

/// Subjects come out in name order. Position is only filled in when both
/// the class averages and the student's id are known.
pub fn report_card(
    subjects: &BTreeMap<String, PerTermData>,
    term: Term,
    class_averages: Option<&[StudentAverage]>,
    student_id: Option<&StudentKey>,
) -> ReportCard {
    let rows = subjects
        .iter()
        .map(|(name, data)| {
            let display = term_display_data(term, data);
            SubjectReport {
                subject: name.clone(),
                grade: grade_letter(display.total),
                display,
            }
        })
        .collect();

    let (position, class_size) = match (class_averages, student_id) {
        (Some(averages), Some(id)) => (Some(class_position(averages, id)), Some(averages.len())),
        _ => (None, None),
    };

    ReportCard {
        term,
        subjects: rows,
        summary: grade_summary(subjects, term),
        position,
        class_size,
    }
}
