use std::fmt;

use serde_json::{Map, Value};

use crate::models::{
    DeadlineFilter, DeadlineRecord, Eligibility, EmbeddedDeadline, Program, Scholarship,
    StandaloneDeadline, University, UniversitySummary,
};

const NAME_KEYS: &[&str] = &["name", "short_name", "shortName", "full_name", "fullName"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    NotAnObject,
    MissingName,
    MissingUniversityName,
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::NotAnObject => write!(f, "university document is not a JSON object"),
            DocumentError::MissingName => write!(f, "university document has no name"),
            DocumentError::MissingUniversityName => {
                write!(f, "deadline record has no university_name")
            }
        }
    }
}

impl std::error::Error for DocumentError {}

/// Documents are read leniently; only a missing university name rejects one.
pub fn university_from_document(doc: &Value) -> Result<University, DocumentError> {
    let object = doc.as_object().ok_or(DocumentError::NotAnObject)?;
    let name = first_text(object, NAME_KEYS).ok_or(DocumentError::MissingName)?;

    Ok(University {
        full_name: first_text(object, &["full_name", "fullName"]).unwrap_or_else(|| name.clone()),
        short_name: first_text(object, &["short_name", "shortName"]).unwrap_or_default(),
        city: first_text(object, &["city", "location"]).unwrap_or_default(),
        address: text(object, "address"),
        website: text(object, "website"),
        email: text(object, "email"),
        admission_link: text(object, "admission_link"),
        application_fee: object.get("application_fee").and_then(integer),
        programs: objects(object, "programs").filter_map(program).collect(),
        scholarships: objects(object, "scholarships").filter_map(scholarship).collect(),
        deadlines: objects(object, "deadlines").map(embedded_deadline).collect(),
        name,
    })
}

/// Flattens a document's embedded deadlines, honouring the pass-through filter.
pub fn deadline_records(doc: &Value, filter: &DeadlineFilter) -> Vec<DeadlineRecord> {
    let Some(object) = doc.as_object() else {
        return Vec::new();
    };
    let Some(name) = first_text(object, NAME_KEYS) else {
        return Vec::new();
    };
    let city = first_text(object, &["city", "location"]);

    if let Some(wanted) = non_blank(filter.university.as_deref()) {
        if !matches_name(doc, wanted) {
            return Vec::new();
        }
    }
    if !city_matches(city.as_deref(), filter) {
        return Vec::new();
    }

    objects(object, "deadlines")
        .map(|entry| DeadlineRecord {
            university_name: name.clone(),
            title: text(entry, "title"),
            deadline_date: text(entry, "deadline_date"),
            university_city: city.clone(),
        })
        .collect()
}

/// Scraped rows carry `university_name`; `url` is optional.
pub fn standalone_deadline(doc: &Value) -> Result<StandaloneDeadline, DocumentError> {
    let object = doc.as_object().ok_or(DocumentError::NotAnObject)?;
    let university_name =
        first_text(object, &["university_name"]).ok_or(DocumentError::MissingUniversityName)?;

    Ok(StandaloneDeadline {
        university_name,
        title: text(object, "title"),
        deadline_date: text(object, "deadline_date"),
        url: text(object, "url"),
    })
}

pub fn is_standalone_deadline(doc: &Value) -> bool {
    doc.get("university_name").is_some()
}

/// Resolves a standalone row against the university documents for its city
/// and applies the same pass-through filter as embedded deadlines.
pub fn standalone_record(
    deadline: &StandaloneDeadline,
    docs: &[Value],
    filter: &DeadlineFilter,
) -> Option<DeadlineRecord> {
    let university_name = non_blank(Some(deadline.university_name.as_str()))?;
    let owner = docs.iter().find(|doc| matches_name(doc, university_name));
    let city = owner
        .and_then(Value::as_object)
        .and_then(|object| first_text(object, &["city", "location"]));

    if let Some(wanted) = non_blank(filter.university.as_deref()) {
        let named = university_name.eq_ignore_ascii_case(wanted);
        if !named && !owner.is_some_and(|doc| matches_name(doc, wanted)) {
            return None;
        }
    }
    if !city_matches(city.as_deref(), filter) {
        return None;
    }

    Some(DeadlineRecord {
        university_name: university_name.to_string(),
        title: deadline.title.clone(),
        deadline_date: deadline.deadline_date.clone(),
        university_city: city,
    })
}

pub fn university_summary(doc: &Value) -> Option<UniversitySummary> {
    let object = doc.as_object()?;
    let name = first_text(object, &["name", "fullName", "full_name"]);
    let full_name = first_text(object, &["fullName", "full_name", "name"]);
    let short_name = first_text(object, &["shortName", "short_name", "name"])
        .unwrap_or_else(|| "Unknown".to_string());

    Some(UniversitySummary {
        name: name.clone().unwrap_or_else(|| short_name.clone()),
        full_name: full_name.or(name).unwrap_or_else(|| short_name.clone()),
        location: first_text(object, &["location", "city"])
            .unwrap_or_else(|| "Pakistan".to_string()),
        short_name,
    })
}

/// Case-insensitive match on `name`, `shortName` or `short_name`.
pub fn matches_name(doc: &Value, wanted: &str) -> bool {
    let wanted = wanted.trim();
    if wanted.is_empty() {
        return false;
    }
    let Some(object) = doc.as_object() else {
        return false;
    };
    ["name", "shortName", "short_name"].iter().any(|key| {
        object
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case(wanted))
    })
}

/// Case-insensitive substring match; no city filter matches everything.
fn city_matches(city: Option<&str>, filter: &DeadlineFilter) -> bool {
    let Some(wanted) = non_blank(filter.city.as_deref()) else {
        return true;
    };
    let wanted = wanted.to_lowercase();
    city.is_some_and(|city| city.to_lowercase().contains(&wanted))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn program(entry: &Map<String, Value>) -> Option<Program> {
    let name = first_text(entry, &["name"])?;
    let eligibility = entry
        .get("eligibility")
        .and_then(Value::as_object)
        .map(|e| Eligibility {
            min_percentage: e.get("min_percentage").and_then(number),
            min_percentage_matric: e.get("min_percentage_matric").and_then(number),
            min_percentage_inter: e.get("min_percentage_inter").and_then(number),
            entry_test: text(e, "entry_test"),
            notes: text(e, "notes"),
        })
        .unwrap_or_default();

    Some(Program {
        name,
        department: text(entry, "department"),
        fee_per_semester: entry.get("fee_per_semester").and_then(integer),
        total_fee_first_year: entry.get("total_fee_first_year").and_then(integer),
        eligibility,
        notes: text(entry, "notes"),
    })
}

fn scholarship(entry: &Map<String, Value>) -> Option<Scholarship> {
    Some(Scholarship {
        name: first_text(entry, &["name"])?,
        kind: text(entry, "type"),
        link: text(entry, "link"),
    })
}

fn embedded_deadline(entry: &Map<String, Value>) -> EmbeddedDeadline {
    EmbeddedDeadline {
        title: text(entry, "title"),
        deadline_date: text(entry, "deadline_date"),
        url: text(entry, "url"),
    }
}

fn objects<'a>(
    object: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> + 'a {
    object
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// Strings are trimmed; anything else reads as empty.
fn text(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

fn first_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .map(|key| text(object, key))
        .find(|value| !value.is_empty())
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        _ => number(value).map(|f| f.round() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_documents_without_a_name() {
        assert_eq!(
            university_from_document(&json!({"city": "Lahore"})),
            Err(DocumentError::MissingName)
        );
        assert_eq!(
            university_from_document(&json!(["LUMS"])),
            Err(DocumentError::NotAnObject)
        );
    }

    #[test]
    fn reads_legacy_keys_and_loose_numbers() {
        let doc = json!({
            "shortName": "PU",
            "fullName": "University of the Punjab",
            "location": "Lahore",
            "application_fee": "2,500",
            "programs": [
                {"name": "BS Computer Science", "fee_per_semester": 45000.0,
                 "eligibility": {"min_percentage": "45", "entry_test": "PU test"}},
                {"department": "no name, dropped"},
                "not an object"
            ],
            "scholarships": [{"name": "PEEF", "type": "Need-based"}],
            "deadlines": [{"title": "Form close", "deadline_date": 20250925}]
        });

        let university = university_from_document(&doc).expect("valid document");
        assert_eq!(university.name, "PU");
        assert_eq!(university.full_name, "University of the Punjab");
        assert_eq!(university.city, "Lahore");
        assert_eq!(university.application_fee, Some(2500));
        assert_eq!(university.programs.len(), 1);
        assert_eq!(university.programs[0].fee_per_semester, Some(45000));
        assert_eq!(university.programs[0].eligibility.min_percentage, Some(45.0));
        assert_eq!(university.scholarships[0].kind, "Need-based");
        assert_eq!(university.deadlines[0].deadline_date, "");
    }

    #[test]
    fn flattens_deadlines_with_city() {
        let doc = json!({
            "name": "NUST Islamabad",
            "city": "Islamabad",
            "deadlines": [
                {"title": "NET-1 registration", "deadline_date": "October 15, 2025"},
                {"deadline_date": "TBD"},
                42
            ]
        });

        let records = deadline_records(&doc, &DeadlineFilter::default());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].university_name, "NUST Islamabad");
        assert_eq!(records[0].university_city.as_deref(), Some("Islamabad"));
        assert_eq!(records[1].title, "");
    }

    #[test]
    fn filters_by_university_and_city() {
        let doc = json!({
            "name": "COMSATS Lahore",
            "short_name": "CUI",
            "city": "Lahore",
            "deadlines": [{"title": "Apply", "deadline_date": "July 1, 2025"}]
        });

        let by_short = DeadlineFilter {
            university: Some("cui".to_string()),
            city: None,
        };
        let by_city = DeadlineFilter {
            university: None,
            city: Some("lahore".to_string()),
        };
        let elsewhere = DeadlineFilter {
            university: None,
            city: Some("Karachi".to_string()),
        };

        assert_eq!(deadline_records(&doc, &by_short).len(), 1);
        assert_eq!(deadline_records(&doc, &by_city).len(), 1);
        assert!(deadline_records(&doc, &elsewhere).is_empty());
    }

    #[test]
    fn standalone_rows_need_a_university_name() {
        let row = standalone_deadline(&json!({
            "university_name": " NUST Islamabad ",
            "title": "NET-2 registration",
            "deadline_date": "December 5, 2025",
            "url": "https://nust.edu.pk/admissions/"
        }))
        .expect("valid row");
        assert_eq!(row.university_name, "NUST Islamabad");
        assert_eq!(row.url, "https://nust.edu.pk/admissions/");

        assert_eq!(
            standalone_deadline(&json!({"title": "orphan", "deadline_date": "2025-01-01"})),
            Err(DocumentError::MissingUniversityName)
        );
        assert!(is_standalone_deadline(&json!({"university_name": "UMT"})));
        assert!(!is_standalone_deadline(&json!({"name": "UMT"})));
    }

    #[test]
    fn standalone_rows_take_city_from_their_university() {
        let docs = vec![json!({
            "name": "NUST Islamabad",
            "short_name": "NUST",
            "city": "Islamabad"
        })];
        let row = StandaloneDeadline {
            university_name: "NUST Islamabad".to_string(),
            title: "NET-2 registration".to_string(),
            deadline_date: "December 5, 2025".to_string(),
            url: String::new(),
        };

        let record = standalone_record(&row, &docs, &DeadlineFilter::default()).expect("record");
        assert_eq!(record.university_city.as_deref(), Some("Islamabad"));

        let by_short = DeadlineFilter {
            university: Some("nust".to_string()),
            city: None,
        };
        let by_city = DeadlineFilter {
            university: None,
            city: Some("islam".to_string()),
        };
        let elsewhere = DeadlineFilter {
            university: None,
            city: Some("Lahore".to_string()),
        };
        assert!(standalone_record(&row, &docs, &by_short).is_some());
        assert!(standalone_record(&row, &docs, &by_city).is_some());
        assert!(standalone_record(&row, &docs, &elsewhere).is_none());
        assert!(standalone_record(&row, &[], &by_city).is_none());
    }

    #[test]
    fn summary_falls_back_across_keys() {
        let summary = university_summary(&json!({"name": "UMT"})).expect("object");
        assert_eq!(summary.short_name, "UMT");
        assert_eq!(summary.full_name, "UMT");
        assert_eq!(summary.location, "Pakistan");

        let summary = university_summary(&json!({})).expect("object");
        assert_eq!(summary.short_name, "Unknown");
    }
}
