use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::dates::{normalize_deadline_date, DeadlineClock};
use crate::documents;
use crate::models::{
    DeadlineDigest, DeadlineFilter, DeadlineRecord, NormalizedDeadline, StandaloneDeadline,
};

/// Embedded deadlines first, then standalone rows. A row repeating an
/// earlier (university, title, date) triple is kept once.
pub fn collect_records(
    docs: &[Value],
    standalone: &[StandaloneDeadline],
    filter: &DeadlineFilter,
) -> Vec<DeadlineRecord> {
    let mut seen = HashSet::new();
    docs.iter()
        .flat_map(|doc| documents::deadline_records(doc, filter))
        .chain(
            standalone
                .iter()
                .filter_map(|row| documents::standalone_record(row, docs, filter)),
        )
        .filter(|record| {
            seen.insert((
                record.university_name.to_lowercase(),
                record.title.clone(),
                record.deadline_date.clone(),
            ))
        })
        .collect()
}

pub fn normalize_record(
    record: DeadlineRecord,
    clock: &DeadlineClock,
) -> Option<NormalizedDeadline> {
    let Some(parsed_date) = normalize_deadline_date(&record.deadline_date) else {
        debug!(
            university = %record.university_name,
            deadline_date = %record.deadline_date,
            "dropping unparseable deadline"
        );
        return None;
    };

    Some(NormalizedDeadline {
        timestamp: clock.end_of_day_timestamp(parsed_date),
        is_past: clock.is_past(parsed_date),
        parsed_date,
        record,
    })
}

/// Upcoming soonest first, then past most recently expired first.
pub fn build_digest<I>(records: I, clock: &DeadlineClock) -> DeadlineDigest
where
    I: IntoIterator<Item = DeadlineRecord>,
{
    let (mut past, mut upcoming): (Vec<_>, Vec<_>) = records
        .into_iter()
        .filter_map(|record| normalize_record(record, clock))
        .partition(|deadline| deadline.is_past);

    upcoming.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    past.sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));

    let deadlines: Vec<NormalizedDeadline> = upcoming.iter().chain(past.iter()).cloned().collect();

    DeadlineDigest {
        total_deadlines: deadlines.len(),
        upcoming_count: upcoming.len(),
        past_count: past.len(),
        deadlines,
        upcoming_deadlines: upcoming,
        past_deadlines: past,
    }
}

pub fn digest_documents(
    docs: &[Value],
    standalone: &[StandaloneDeadline],
    filter: &DeadlineFilter,
    clock: &DeadlineClock,
) -> DeadlineDigest {
    build_digest(collect_records(docs, standalone, filter), clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};
    use serde_json::json;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn clock_on(today: NaiveDate) -> DeadlineClock {
        DeadlineClock::fixed(today, FixedOffset::east_opt(5 * 3600).expect("offset"))
    }

    fn record(title: &str, deadline_date: &str) -> DeadlineRecord {
        DeadlineRecord {
            university_name: "LUMS".to_string(),
            title: title.to_string(),
            deadline_date: deadline_date.to_string(),
            university_city: Some("Lahore".to_string()),
        }
    }

    #[test]
    fn partitions_and_orders_by_expiry() {
        let records = vec![
            record("june", "2025-06-01"),
            record("december", "2025-12-01"),
            record("january", "2025-01-01"),
        ];

        let digest = build_digest(records, &clock_on(ymd(2025, 6, 15)));

        let dates = |items: &[NormalizedDeadline]| -> Vec<NaiveDate> {
            items.iter().map(|d| d.parsed_date).collect()
        };
        assert_eq!(dates(&digest.upcoming_deadlines), vec![ymd(2025, 12, 1)]);
        assert_eq!(
            dates(&digest.past_deadlines),
            vec![ymd(2025, 6, 1), ymd(2025, 1, 1)]
        );
        assert_eq!(
            dates(&digest.deadlines),
            vec![ymd(2025, 12, 1), ymd(2025, 6, 1), ymd(2025, 1, 1)]
        );
        assert_eq!(digest.total_deadlines, 3);
        assert_eq!(digest.upcoming_count, 1);
        assert_eq!(digest.past_count, 2);
    }

    #[test]
    fn upcoming_is_soonest_first() {
        let records = vec![
            record("later", "September 30, 2025"),
            record("sooner", "Monday, July 21, 2025"),
            record("today", "July 15, 2025"),
        ];

        let digest = build_digest(records, &clock_on(ymd(2025, 7, 15)));
        let titles: Vec<&str> = digest
            .upcoming_deadlines
            .iter()
            .map(|d| d.record.title.as_str())
            .collect();
        assert_eq!(titles, vec!["today", "sooner", "later"]);
        assert!(digest.past_deadlines.is_empty());
    }

    #[test]
    fn unparseable_records_are_dropped_without_touching_counts() {
        let clock = clock_on(ymd(2025, 6, 15));
        let baseline = build_digest(
            vec![record("a", "2025-12-01"), record("b", "2025-01-01")],
            &clock,
        );
        let noisy = build_digest(
            vec![
                record("a", "2025-12-01"),
                record("tbd", "TBD"),
                record("b", "2025-01-01"),
                record("empty", ""),
            ],
            &clock,
        );

        assert_eq!(noisy, baseline);
        assert!(noisy
            .deadlines
            .iter()
            .all(|d| d.record.title != "tbd" && d.record.title != "empty"));
    }

    #[test]
    fn empty_input_yields_empty_digest() {
        let digest = build_digest(Vec::new(), &clock_on(ymd(2025, 6, 15)));
        assert_eq!(digest, DeadlineDigest::default());
    }

    #[test]
    fn malformed_documents_are_skipped() {
        let docs = vec![
            json!("not a document"),
            json!({"city": "Lahore", "deadlines": [{"title": "x", "deadline_date": "2025-07-01"}]}),
            json!({"name": "GIKI", "deadlines": "not a list"}),
            json!({"name": "FAST", "deadlines": [{"title": "Apply", "deadline_date": "July 1, 2025"}]}),
        ];

        let clock = clock_on(ymd(2025, 6, 15));
        let digest = digest_documents(&docs, &[], &DeadlineFilter::default(), &clock);
        assert_eq!(digest.total_deadlines, 1);
        assert_eq!(digest.deadlines[0].record.university_name, "FAST");
    }

    fn standalone(university_name: &str, title: &str, deadline_date: &str) -> StandaloneDeadline {
        StandaloneDeadline {
            university_name: university_name.to_string(),
            title: title.to_string(),
            deadline_date: deadline_date.to_string(),
            url: String::new(),
        }
    }

    #[test]
    fn standalone_rows_join_the_digest() {
        let docs = vec![json!({
            "name": "NUST Islamabad",
            "city": "Islamabad",
            "deadlines": [{"title": "NET-1 registration", "deadline_date": "October 15, 2025"}]
        })];
        let rows = vec![
            standalone("NUST Islamabad", "NET-2 registration", "5th December 2025"),
            standalone("nust islamabad", "NET-1 registration", "October 15, 2025"),
            standalone("PIEAS", "Entry test", "2025-03-01"),
            standalone("PIEAS", "Result", "To be announced"),
        ];

        let clock = clock_on(ymd(2025, 6, 15));
        let digest = digest_documents(&docs, &rows, &DeadlineFilter::default(), &clock);

        let titles: Vec<&str> = digest
            .deadlines
            .iter()
            .map(|d| d.record.title.as_str())
            .collect();
        assert_eq!(titles, vec!["NET-1 registration", "NET-2 registration", "Entry test"]);
        assert_eq!(digest.upcoming_count, 2);
        assert_eq!(digest.past_count, 1);
        assert_eq!(
            digest.deadlines[1].record.university_city.as_deref(),
            Some("Islamabad")
        );
        assert_eq!(digest.deadlines[2].record.university_city, None);
    }

    #[test]
    fn standalone_rows_honour_the_filter() {
        let docs = vec![json!({"name": "PIEAS", "city": "Islamabad"})];
        let rows = vec![
            standalone("PIEAS", "Entry test", "2025-08-01"),
            standalone("GIKI", "Admission test", "2025-08-02"),
        ];
        let filter = DeadlineFilter {
            university: None,
            city: Some("islamabad".to_string()),
        };

        let records = collect_records(&docs, &rows, &filter);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].university_name, "PIEAS");
    }
}
