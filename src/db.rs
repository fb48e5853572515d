use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::StandaloneDeadline;
use crate::store::{self, UniversityStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UniversityStore for PgStore {
    async fn find_all(&self) -> anyhow::Result<Vec<Value>> {
        let rows = sqlx::query("SELECT doc FROM uniguide.universities ORDER BY created_at, name")
            .fetch_all(&self.pool)
            .await
            .context("failed to read universities")?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let Json(doc): Json<Value> = row.get("doc");
            docs.push(doc);
        }

        Ok(docs)
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Value>> {
        let row = sqlx::query(
            r#"
            SELECT doc FROM uniguide.universities
            WHERE lower(doc->>'name') = lower($1)
               OR lower(doc->>'shortName') = lower($1)
               OR lower(doc->>'short_name') = lower($1)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up university")?;

        Ok(row.map(|row| {
            let Json(doc): Json<Value> = row.get("doc");
            doc
        }))
    }

    async fn insert(&self, name: &str, doc: Value) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO uniguide.universities (id, name, doc)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(Json(doc))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert {name}"))?;

        Ok(id)
    }

    async fn delete_many(&self, name: &str) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM uniguide.universities WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete {name}"))?;

        Ok(result.rows_affected())
    }

    async fn find_all_deadlines(&self) -> anyhow::Result<Vec<StandaloneDeadline>> {
        let rows = sqlx::query(
            r#"
            SELECT university_name, title, deadline_date, url
            FROM uniguide.deadlines
            ORDER BY created_at, university_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to read standalone deadlines")?;

        let mut deadlines = Vec::with_capacity(rows.len());
        for row in rows {
            deadlines.push(StandaloneDeadline {
                university_name: row.get("university_name"),
                title: row.get("title"),
                deadline_date: row.get("deadline_date"),
                url: row.get("url"),
            });
        }

        Ok(deadlines)
    }

    async fn replace_deadlines(
        &self,
        university_name: &str,
        rows: Vec<StandaloneDeadline>,
    ) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM uniguide.deadlines WHERE university_name = $1")
            .bind(university_name)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to clear deadlines for {university_name}"))?;

        let mut stored = 0u64;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO uniguide.deadlines (id, university_name, title, deadline_date, url)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(university_name)
            .bind(row.title)
            .bind(row.deadline_date)
            .bind(row.url)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to insert deadline for {university_name}"))?;
            stored += 1;
        }

        tx.commit().await?;
        Ok(stored)
    }
}

pub async fn seed(store: &dyn UniversityStore) -> anyhow::Result<usize> {
    let docs = seed_documents();
    for doc in &docs {
        store::replace_university(store, doc).await?;
    }
    store
        .replace_deadlines("NUST Islamabad", seed_deadlines())
        .await?;
    Ok(docs.len())
}

/// Rows the NUST "dates to remember" page yields outside the university document.
pub fn seed_deadlines() -> Vec<StandaloneDeadline> {
    let url = "https://nust.edu.pk/admissions/undergraduates/dates-to-remember/";
    [
        ("NET-2 Online Registration", "Monday, December 1, 2025"),
        ("NET-3 Online Registration", "9th - 12th February, 2026"),
        ("Merit List", "Expected in July"),
    ]
    .into_iter()
    .map(|(title, deadline_date)| StandaloneDeadline {
        university_name: "NUST Islamabad".to_string(),
        title: title.to_string(),
        deadline_date: deadline_date.to_string(),
        url: url.to_string(),
    })
    .collect()
}

/// Static snapshots of what the scrapers produce, deadline formats included.
pub fn seed_documents() -> Vec<Value> {
    vec![
        json!({
            "name": "LUMS",
            "full_name": "Lahore University of Management Sciences",
            "city": "Lahore",
            "address": "Opposite Sector U, DHA, Lahore Cantt, Pakistan",
            "website": "https://lums.edu.pk",
            "email": "admissions@lums.edu.pk",
            "admission_link": "https://admission.lums.edu.pk",
            "programs": [{
                "name": "BSc (Honours) Psychology",
                "department": "Mushtaq Ahmad Gurmani School of Humanities & Social Sciences",
                "total_fee_first_year": 1665160,
                "eligibility": {
                    "min_percentage_matric": 70.0,
                    "min_percentage_inter": 65.0,
                    "entry_test": "SAT / ACT / LCAT",
                    "notes": "O/A-Levels: B average in 8 O-Level subjects, 2Bs+1C in A-Levels"
                }
            }],
            "scholarships": [{
                "name": "LUMS - PHEC Honhaar Scholarship",
                "type": "need-based",
                "link": "https://financial-aid.lums.edu.pk/honhaar-scholarship"
            }],
            "deadlines": [
                {"title": "Round 1 Application Deadline", "deadline_date": "Monday, November 3, 2025"},
                {"title": "LCAT Test Window", "deadline_date": "January 20-22, 2026"}
            ]
        }),
        json!({
            "name": "NUST Islamabad",
            "full_name": "National University of Sciences and Technology",
            "city": "Islamabad",
            "website": "https://nust.edu.pk",
            "email": "ugadmissions@nust.edu.pk",
            "admission_link": "https://nust.edu.pk/admissions/undergraduates/dates-to-remember/",
            "scholarships": [{
                "name": "NEED BASED FINANCIAL AID",
                "type": "Need-Based",
                "link": "https://nust.edu.pk/admissions/scholarships/need-based-financial-aid/"
            }],
            "deadlines": [
                {"title": "NET-1 Online Registration", "deadline_date": "15th October 2025"},
                {"title": "NET-4 Result", "deadline_date": "To be announced"}
            ]
        }),
        json!({
            "name": "COMSATS Lahore",
            "full_name": "COMSATS University Islamabad - Lahore Campus",
            "city": "Lahore",
            "address": "Defence Road, Off Raiwind Road, Lahore, Pakistan",
            "website": "https://lahore.comsats.edu.pk",
            "email": "admissions@cuilahore.edu.pk",
            "admission_link": "https://lahore.comsats.edu.pk/admissions/",
            "programs": [{
                "name": "BS Computer Science",
                "department": "Computer Science",
                "fee_per_semester": 129000,
                "total_fee_first_year": 258000,
                "eligibility": {
                    "min_percentage_matric": 50.0,
                    "min_percentage_inter": 50.0,
                    "entry_test": "NTS test",
                    "notes": "Intermediate with Mathematics required."
                }
            }],
            "deadlines": [
                {"title": "Last Date for Submission of Applications", "deadline_date": "28-07-2025"}
            ]
        }),
        json!({
            "name": "UMT",
            "full_name": "University of Management and Technology",
            "city": "Lahore",
            "address": "C-II, Johar Town, Lahore, Pakistan",
            "website": "https://umt.edu.pk",
            "email": "admissions@umt.edu.pk",
            "admission_link": "https://admissions.umt.edu.pk",
            "deadlines": [
                {"title": "Fall Admissions Open", "deadline_date": "November onwards"},
                {"title": "Application Deadline", "deadline_date": "15 August"},
                {"title": "Classes Begin", "deadline_date": "August"}
            ]
        }),
        json!({
            "name": "PU",
            "full_name": "University of the Punjab, Lahore",
            "city": "Lahore",
            "website": "https://pu.edu.pk/#intro",
            "email": "infocell@pu.edu.pk",
            "admission_link": "https://pu.edu.pk//home/more/4",
            "application_fee": null,
            "deadlines": [
                {"title": "Test & Admission Form Portal Open Date", "deadline_date": "18 September, 2025, Thursday"},
                {"title": "Test & Admission Form Portal Close Date", "deadline_date": "25 September, 2025, Thursday"},
                {"title": "Last Date of Fee Deposit Final Merit List", "deadline_date": "13 October, 2025, Monday"}
            ]
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn seed_documents_pass_the_adapter() {
        for doc in seed_documents() {
            assert!(crate::documents::university_from_document(&doc).is_ok());
        }
    }

    #[tokio::test]
    async fn seeding_twice_keeps_one_copy_each() {
        let store = MemoryStore::default();
        seed(&store).await.expect("first seed");
        let count = seed(&store).await.expect("second seed");
        assert_eq!(store.find_all().await.expect("find all").len(), count);
        assert_eq!(
            store.find_all_deadlines().await.expect("find deadlines").len(),
            seed_deadlines().len()
        );
    }
}
