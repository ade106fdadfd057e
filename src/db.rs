use anyhow::Context;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{ComponentMetrics, Corpus, MetricScale, SimilarityRecord, SimilarityRow};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let submissions = [
        ("asgn1", "alice", "asgn1_alice.py", 2_310),
        ("asgn1", "bilal", "asgn1_bilal.py", 2_184),
        ("asgn1", "chen", "asgn1_chen.py", 1_942),
        ("asgn2", "alice", "asgn2_alice.py", 3_407),
        ("asgn2", "chen", "asgn2_chen.py", 3_391),
    ];

    for (assignment, student_id, filename, size_bytes) in submissions {
        sqlx::query(
            r#"
            INSERT INTO similarity_review.submissions
            (id, assignment, student_id, filename, size_bytes)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (assignment, student_id, filename) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(assignment)
        .bind(student_id)
        .bind(filename)
        .bind(size_bytes as i64)
        .execute(pool)
        .await?;
    }

    let comparisons = [
        ("seed-001", "alice", "bilal", "asgn1", [0.90, 0.93, 0.88, 0.81, 0.86]),
        ("seed-002", "alice", "chen", "asgn1", [0.40, 0.45, 0.38, 0.31, 0.42]),
        ("seed-003", "bilal", "chen", "asgn1", [0.60, 0.64, 0.59, 0.52, 0.57]),
        ("seed-004", "alice", "chen", "asgn2", [0.83, 0.79, 0.91, 0.74, 0.80]),
    ];

    for (source_key, student1, student2, assignment, [score, lex, ast, jaccard, seq]) in comparisons
    {
        let record = SimilarityRecord {
            student_a: student1.to_string(),
            student_b: student2.to_string(),
            assignment: assignment.to_string(),
            composite_score: score,
            metrics: ComponentMetrics {
                lexical: lex,
                structural: ast,
                jaccard,
                sequence: seq,
            },
        };
        insert_comparison(pool, &record, source_key).await?;
    }

    Ok(())
}

async fn insert_comparison(
    pool: &PgPool,
    record: &SimilarityRecord,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO similarity_review.comparisons
        (id, assignment, student1, student2, composite_score,
         sim_lex, sim_ast, jaccard, seqmatch, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&record.assignment)
    .bind(&record.student_a)
    .bind(&record.student_b)
    .bind(record.composite_score)
    .bind(record.metrics.lexical)
    .bind(record.metrics.structural)
    .bind(record.metrics.jaccard)
    .bind(record.metrics.sequence)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Drops rows with NaN or infinite values, which the schema cannot rule out.
fn retain_finite(records: Vec<SimilarityRecord>) -> Vec<SimilarityRecord> {
    records
        .into_iter()
        .filter(|record| {
            let keep = record.is_finite();
            if !keep {
                warn!(
                    student_a = %record.student_a,
                    student_b = %record.student_b,
                    assignment = %record.assignment,
                    "skipping non-finite comparison row"
                );
            }
            keep
        })
        .collect()
}

/// Loads the comparison corpus, oldest first, optionally for one assignment.
pub async fn fetch_corpus(pool: &PgPool, assignment: Option<&str>) -> anyhow::Result<Corpus> {
    let mut query = String::from(
        "SELECT student1, student2, assignment, composite_score, \
         sim_lex, sim_ast, jaccard, seqmatch \
         FROM similarity_review.comparisons",
    );
    let mut count_query =
        String::from("SELECT COUNT(*) AS total FROM similarity_review.submissions");

    if assignment.is_some() {
        query.push_str(" WHERE assignment = $1");
        count_query.push_str(" WHERE assignment = $1");
    }
    query.push_str(" ORDER BY compared_at, source_key");

    let mut rows = sqlx::query(&query);
    let mut count = sqlx::query(&count_query);

    if let Some(value) = assignment {
        rows = rows.bind(value);
        count = count.bind(value);
    }

    let loaded = rows
        .fetch_all(pool)
        .await
        .context("failed to load comparisons")?
        .into_iter()
        .map(|row| SimilarityRecord {
            student_a: row.get("student1"),
            student_b: row.get("student2"),
            assignment: row.get("assignment"),
            composite_score: row.get("composite_score"),
            metrics: ComponentMetrics {
                lexical: row.get("sim_lex"),
                structural: row.get("sim_ast"),
                jaccard: row.get("jaccard"),
                sequence: row.get("seqmatch"),
            },
        })
        .collect::<Vec<_>>();
    let records = retain_finite(loaded);

    let total_submissions: i64 = count
        .fetch_one(pool)
        .await
        .context("failed to count submissions")?
        .get("total");

    info!(
        comparisons = records.len(),
        submissions = total_submissions,
        "loaded similarity corpus"
    );

    Ok(Corpus {
        reported_students: 0,
        total_submissions: usize::try_from(total_submissions).unwrap_or(0),
        records,
    })
}

/// Imports comparison rows shaped like the statistics payload. Rows that
/// fail boundary checks are skipped with a warning.
pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
    scale: MetricScale,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student1: String,
        student2: String,
        assignment: String,
        similarity: f64,
        sim_lex: f64,
        sim_ast: f64,
        jaccard: f64,
        seqmatch: f64,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let wire = SimilarityRow {
            student1: row.student1,
            student2: row.student2,
            assignment: row.assignment,
            similarity: row.similarity,
            sim_lex: row.sim_lex,
            sim_ast: row.sim_ast,
            jaccard: row.jaccard,
            seqmatch: row.seqmatch,
        };

        let record = match wire.into_record(scale) {
            Ok(record) => record,
            Err(err) => {
                warn!(row = index, %err, "skipping comparison row");
                continue;
            }
        };

        if insert_comparison(pool, &record, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(student_b: &str, composite_score: f64, sequence: f64) -> SimilarityRecord {
        SimilarityRecord {
            student_a: "alice".to_string(),
            student_b: student_b.to_string(),
            assignment: "asgn1".to_string(),
            composite_score,
            metrics: ComponentMetrics {
                lexical: 0.5,
                structural: 0.5,
                jaccard: 0.5,
                sequence,
            },
        }
    }

    #[test]
    fn stored_rows_with_non_finite_values_are_skipped() {
        let records = vec![
            stored("bilal", 0.9, 0.8),
            stored("chen", f64::NAN, 0.4),
            stored("dana", 0.3, f64::INFINITY),
            stored("eli", 0.6, 0.6),
        ];

        let kept: Vec<_> = retain_finite(records)
            .into_iter()
            .map(|record| record.student_b)
            .collect();
        assert_eq!(kept, vec!["bilal", "eli"]);
    }
}
