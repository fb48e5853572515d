use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniversityCode {
    Comsats,
    Punjab,
}

impl FromStr for UniversityCode {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "COMSATS" => Ok(UniversityCode::Comsats),
            "PU" | "PUNJAB UNIVERSITY" => Ok(UniversityCode::Punjab),
            other => Err(AggregateError::UnknownUniversity(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightTable {
    pub matric: f64,
    pub inter: f64,
    pub entry_test: f64,
    /// Minimum entry-test percentage for the engineering track.
    pub engineering_min_test_percent: Option<f64>,
}

pub const COMSATS_WEIGHTS: WeightTable = WeightTable {
    matric: 0.10,
    inter: 0.40,
    entry_test: 0.50,
    engineering_min_test_percent: Some(50.0),
};

/// (bonus marks, out of) per PU additional category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PunjabBonusTable {
    pub hafiz: f64,
    pub elective_cap: f64,
    pub optional_cap: f64,
    pub diploma: f64,
    pub additional_elective_cap: f64,
    pub additional_optional_cap: f64,
    pub combination: f64,
    pub other_cap: f64,
    pub matric_divisor: f64,
    pub gap_year_deduction: f64,
    pub max_gap_years: u32,
}

pub const PUNJAB_BONUSES: PunjabBonusTable = PunjabBonusTable {
    hafiz: 20.0,
    elective_cap: 20.0,
    optional_cap: 10.0,
    diploma: 20.0,
    additional_elective_cap: 10.0,
    additional_optional_cap: 5.0,
    combination: 10.0,
    other_cap: 10.0,
    matric_divisor: 4.0,
    gap_year_deduction: 2.0,
    max_gap_years: 5,
};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Marks {
    pub matric_obtained: f64,
    pub matric_total: f64,
    pub inter_obtained: f64,
    pub inter_total: f64,
    pub test_obtained: f64,
    pub test_total: f64,
}

/// Bonuses and deductions; only PU reads them today.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AggregateOptions {
    pub hafiz: bool,
    pub elective_marks: f64,
    pub optional_marks: f64,
    pub diploma: bool,
    pub additional_elective_marks: f64,
    pub additional_optional_marks: f64,
    pub combination: bool,
    pub subject_marks: f64,
    pub subject_total: f64,
    pub other_marks: f64,
    /// Academic share in percent; the remainder goes to the entry test.
    pub weightage: f64,
    pub gap_years: u32,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            hafiz: false,
            elective_marks: 0.0,
            optional_marks: 0.0,
            diploma: false,
            additional_elective_marks: 0.0,
            additional_optional_marks: 0.0,
            combination: false,
            subject_marks: 0.0,
            subject_total: 0.0,
            other_marks: 0.0,
            weightage: 100.0,
            gap_years: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregateRequest {
    pub university: String,
    #[serde(flatten)]
    pub marks: Marks,
    #[serde(default)]
    pub is_engineering: bool,
    #[serde(default)]
    pub options: AggregateOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateError {
    UnknownUniversity(String),
    InvalidTotal(&'static str),
    TestBelowThreshold { required: f64, actual: f64 },
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateError::UnknownUniversity(code) => {
                write!(f, "Aggregate calculator for {code} is not available.")
            }
            AggregateError::InvalidTotal(field) => write!(f, "{field} must be greater than zero"),
            AggregateError::TestBelowThreshold { required, actual } => write!(
                f,
                "test score {actual:.2}% is below the required {required:.2}% for the engineering track"
            ),
        }
    }
}

impl std::error::Error for AggregateError {}

pub fn calculate(request: &AggregateRequest) -> Result<f64, AggregateError> {
    let code: UniversityCode = request.university.parse()?;
    match code {
        UniversityCode::Comsats => comsats_aggregate(&request.marks, request.is_engineering),
        UniversityCode::Punjab => punjab_aggregate(&request.marks, &request.options),
    }
}

pub fn comsats_aggregate(marks: &Marks, is_engineering: bool) -> Result<f64, AggregateError> {
    let weights = COMSATS_WEIGHTS;
    let matric = percent(marks.matric_obtained, marks.matric_total, "matric_total")?;
    let inter = percent(marks.inter_obtained, marks.inter_total, "inter_total")?;
    let test = percent(marks.test_obtained, marks.test_total, "test_total")?;

    if is_engineering {
        if let Some(required) = weights.engineering_min_test_percent {
            if test < required {
                return Err(AggregateError::TestBelowThreshold {
                    required,
                    actual: round2(test),
                });
            }
        }
    }

    Ok(round2(
        matric * weights.matric + inter * weights.inter + test * weights.entry_test,
    ))
}

pub fn punjab_aggregate(marks: &Marks, options: &AggregateOptions) -> Result<f64, AggregateError> {
    let table = PUNJAB_BONUSES;
    let mut extra_obtained = 0.0;
    let mut extra_total = 0.0;

    let mut flat = |enabled: bool, bonus: f64| {
        if enabled {
            extra_obtained += bonus;
            extra_total += bonus;
        }
    };
    flat(options.hafiz, table.hafiz);
    flat(options.diploma, table.diploma);
    flat(options.combination, table.combination);

    for (obtained, cap) in [
        (options.elective_marks, table.elective_cap),
        (options.optional_marks, table.optional_cap),
        (options.additional_elective_marks, table.additional_elective_cap),
        (options.additional_optional_marks, table.additional_optional_cap),
        (options.other_marks, table.other_cap),
    ] {
        if obtained > 0.0 {
            extra_obtained += obtained.min(cap);
            extra_total += cap;
        }
    }

    if options.subject_marks > 0.0 && options.subject_total > 0.0 {
        extra_obtained += options.subject_marks;
        extra_total += options.subject_total;
    }

    require_positive(marks.matric_total, "matric_total")?;
    require_positive(marks.inter_total, "inter_total")?;

    let numerator =
        marks.matric_obtained / table.matric_divisor + marks.inter_obtained + extra_obtained;
    let denominator =
        marks.matric_total / table.matric_divisor + marks.inter_total + extra_total;
    let academic = numerator / denominator * 100.0;

    let mut merit = academic * (options.weightage / 100.0);
    if options.weightage < 100.0 {
        let test = percent(marks.test_obtained, marks.test_total, "test_total")?;
        merit += test * ((100.0 - options.weightage) / 100.0);
    }

    let gap_years = options.gap_years.min(table.max_gap_years);
    let gap_deduction = f64::from(gap_years) * table.gap_year_deduction;
    Ok(round2(merit - gap_deduction))
}

fn percent(obtained: f64, total: f64, field: &'static str) -> Result<f64, AggregateError> {
    require_positive(total, field)?;
    Ok(obtained / total * 100.0)
}

fn require_positive(total: f64, field: &'static str) -> Result<(), AggregateError> {
    if total > 0.0 {
        Ok(())
    } else {
        Err(AggregateError::InvalidTotal(field))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
