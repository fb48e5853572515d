use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_percentage_matric: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_percentage_inter: Option<f64>,
    #[serde(default)]
    pub entry_test: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub fee_per_semester: Option<i64>,
    #[serde(default)]
    pub total_fee_first_year: Option<i64>,
    #[serde(default)]
    pub eligibility: Eligibility,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scholarship {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedDeadline {
    pub title: String,
    pub deadline_date: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// A university as stored after passing the document adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct University {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub admission_link: String,
    #[serde(default)]
    pub application_fee: Option<i64>,
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub scholarships: Vec<Scholarship>,
    #[serde(default)]
    pub deadlines: Vec<EmbeddedDeadline>,
}

/// Card shape for the university listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniversitySummary {
    #[serde(rename = "shortName")]
    pub short_name: String,
    pub name: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub location: String,
}

/// A deadline row scraped on its own rather than inside a university document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandaloneDeadline {
    pub university_name: String,
    pub title: String,
    pub deadline_date: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeadlineRecord {
    pub university_name: String,
    pub title: String,
    pub deadline_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university_city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDeadline {
    #[serde(flatten)]
    pub record: DeadlineRecord,
    pub parsed_date: NaiveDate,
    /// Unix seconds at 23:59:59.999999 of `parsed_date`.
    pub timestamp: f64,
    pub is_past: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeadlineDigest {
    pub total_deadlines: usize,
    pub upcoming_count: usize,
    pub past_count: usize,
    pub deadlines: Vec<NormalizedDeadline>,
    pub upcoming_deadlines: Vec<NormalizedDeadline>,
    pub past_deadlines: Vec<NormalizedDeadline>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeadlineFilter {
    pub university: Option<String>,
    pub city: Option<String>,
}

impl DeadlineFilter {
    pub fn label(&self) -> Option<&str> {
        self.university.as_deref().or(self.city.as_deref())
    }
}
