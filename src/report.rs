use std::collections::BTreeMap;
use std::fmt::Write;
use std::io;

use chrono::NaiveDate;

use crate::models::{DeadlineDigest, NormalizedDeadline};

#[derive(Debug, Clone, PartialEq)]
pub struct UniversityDeadlineCount {
    pub university_name: String,
    pub upcoming: usize,
    pub past: usize,
}

pub fn count_by_university(digest: &DeadlineDigest) -> Vec<UniversityDeadlineCount> {
    let mut map: BTreeMap<&str, (usize, usize)> = BTreeMap::new();

    for deadline in &digest.deadlines {
        let entry = map.entry(deadline.record.university_name.as_str()).or_insert((0, 0));
        if deadline.is_past {
            entry.1 += 1;
        } else {
            entry.0 += 1;
        }
    }

    let mut counts: Vec<UniversityDeadlineCount> = map
        .into_iter()
        .map(|(name, (upcoming, past))| UniversityDeadlineCount {
            university_name: name.to_string(),
            upcoming,
            past,
        })
        .collect();

    counts.sort_by(|a, b| b.upcoming.cmp(&a.upcoming));
    counts
}

pub fn build_report(scope: Option<&str>, today: NaiveDate, digest: &DeadlineDigest) -> String {
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all universities");

    let _ = writeln!(output, "# Admissions Deadline Digest");
    let _ = writeln!(output, "Generated for {} on {}", scope_label, today);
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{} dated deadlines: {} upcoming, {} past.",
        digest.total_deadlines, digest.upcoming_count, digest.past_count
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming Deadlines");

    if digest.upcoming_deadlines.is_empty() {
        let _ = writeln!(output, "No upcoming deadlines.");
    } else {
        let _ = writeln!(output, "| Date | Days left | University | Deadline |");
        let _ = writeln!(output, "|---|---|---|---|");
        for deadline in &digest.upcoming_deadlines {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                deadline.parsed_date,
                (deadline.parsed_date - today).num_days(),
                deadline.record.university_name,
                table_cell(&deadline.record.title)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recently Closed");

    if digest.past_deadlines.is_empty() {
        let _ = writeln!(output, "No closed deadlines.");
    } else {
        for deadline in digest.past_deadlines.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}) closed {}",
                table_cell(&deadline.record.title),
                deadline.record.university_name,
                deadline.parsed_date
            );
        }
    }

    let counts = count_by_university(digest);
    let _ = writeln!(output);
    let _ = writeln!(output, "## By University");

    if counts.is_empty() {
        let _ = writeln!(output, "No universities with dated deadlines.");
    } else {
        for count in &counts {
            let _ = writeln!(
                output,
                "- {}: {} upcoming, {} past",
                count.university_name, count.upcoming, count.past
            );
        }
    }

    output
}

/// Writes the combined ordering as CSV rows.
pub fn export_csv<W: io::Write>(
    writer: W,
    deadlines: &[NormalizedDeadline],
) -> anyhow::Result<usize> {
    #[derive(serde::Serialize)]
    struct CsvRow<'a> {
        university_name: &'a str,
        university_city: &'a str,
        title: &'a str,
        deadline_date: &'a str,
        parsed_date: NaiveDate,
        is_past: bool,
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    for deadline in deadlines {
        csv_writer.serialize(CsvRow {
            university_name: &deadline.record.university_name,
            university_city: deadline.record.university_city.as_deref().unwrap_or_default(),
            title: &deadline.record.title,
            deadline_date: &deadline.record.deadline_date,
            parsed_date: deadline.parsed_date,
            is_past: deadline.is_past,
        })?;
    }
    csv_writer.flush()?;

    Ok(deadlines.len())
}

fn table_cell(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").replace('|', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DeadlineClock;
    use crate::deadlines::build_digest;
    use crate::models::DeadlineRecord;
    use chrono::FixedOffset;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 20).expect("valid date")
    }

    fn digest() -> DeadlineDigest {
        let clock = DeadlineClock::fixed(today(), FixedOffset::east_opt(5 * 3600).expect("offset"));
        let record = |university: &str, title: &str, date: &str| DeadlineRecord {
            university_name: university.to_string(),
            title: title.to_string(),
            deadline_date: date.to_string(),
            university_city: Some("Lahore".to_string()),
        };
        build_digest(
            vec![
                record("PU", "Form Portal Close", "25 September, 2025, Thursday"),
                record("PU", "Form Portal Open", "18 September, 2025, Thursday"),
                record("LUMS", "Round 1", "Monday, November 3, 2025"),
                record("UMT", "Classes Begin", "August"),
            ],
            &clock,
        )
    }

    #[test]
    fn counts_group_by_university() {
        let counts = count_by_university(&digest());
        assert_eq!(
            counts,
            vec![
                UniversityDeadlineCount {
                    university_name: "LUMS".to_string(),
                    upcoming: 1,
                    past: 0
                },
                UniversityDeadlineCount {
                    university_name: "PU".to_string(),
                    upcoming: 1,
                    past: 1
                },
            ]
        );
    }

    #[test]
    fn report_lists_sections() {
        let report = build_report(Some("Lahore"), today(), &digest());
        assert!(report.contains("Generated for Lahore on 2025-09-20"));
        assert!(report.contains("3 dated deadlines: 2 upcoming, 1 past."));
        assert!(report.contains("| 2025-09-25 | 5 | PU | Form Portal Close |"));
        assert!(report.contains("- Form Portal Open (PU) closed 2025-09-18"));
        assert!(!report.contains("Classes Begin"));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let digest = digest();
        let mut buffer = Vec::new();
        let written = export_csv(&mut buffer, &digest.deadlines).expect("csv export");
        let text = String::from_utf8(buffer).expect("utf8");

        assert_eq!(written, 3);
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("university_name,university_city,title,deadline_date,parsed_date,is_past")
        );
        assert_eq!(
            lines.next(),
            Some("PU,Lahore,Form Portal Close,\"25 September, 2025, Thursday\",2025-09-25,false")
        );
    }
}
