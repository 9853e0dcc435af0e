use axum::{extract::{Query, State}, Json};
use tracing::instrument;

use crate::dtos::analytics::{
    ComparisonQuery, ComparisonReport, FeedingOutcomeReport, GradeGenderCount, LabelCount,
    MonthlyCount,
};
use crate::dtos::common::SchoolYearFilter;
use crate::error::AppError;
use crate::handlers::academic_year::resolve_academic_year;
use crate::state::AppState;

fn require_school_year(filter: &SchoolYearFilter) -> Result<&str, AppError> {
    filter
        .school_year
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("school_year query parameter is required"))
}

/// Templated comparison sentence for the two-school-year report.
pub fn describe_change(metric: &str, current: i64, previous: i64) -> String {
    if previous == 0 {
        if current == 0 {
            return format!("No {metric} were recorded in either school year.");
        }
        return format!(
            "{current} {metric} were recorded this school year; none were recorded in the previous one."
        );
    }
    if current == previous {
        return format!("{metric} held steady at {current} across both school years.");
    }
    let percent = ((current - previous).abs() as f64 / previous as f64 * 100.0).round() as i64;
    if current > previous {
        format!(
            "{metric} increased by {percent}% ({previous} to {current}) compared to the previous school year."
        )
    } else {
        format!(
            "{metric} decreased by {percent}% ({previous} to {current}) compared to the previous school year."
        )
    }
}

// ==================== Clinic visits ====================

#[instrument(skip(state))]
pub async fn clinic_visits_monthly(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<MonthlyCount>>, AppError> {
    let label = require_school_year(&filter)?;
    let academic_year_id = resolve_academic_year(&state.db_pool, label).await?;

    let counts = sqlx::query_as::<_, MonthlyCount>(
        r#"SELECT EXTRACT(MONTH FROM visit_date)::INT AS month, COUNT(*)::BIGINT AS count
           FROM clinic_visits
           WHERE academic_year_id = $1
           GROUP BY month
           ORDER BY month"#,
    )
    .bind(academic_year_id)
    .fetch_all(&state.db_pool)
    .await?;
    Ok(Json(counts))
}

#[instrument(skip(state))]
pub async fn clinic_visits_by_malady(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<LabelCount>>, AppError> {
    let label = require_school_year(&filter)?;
    let academic_year_id = resolve_academic_year(&state.db_pool, label).await?;

    let counts = sqlx::query_as::<_, LabelCount>(
        r#"SELECT malady AS label, COUNT(*)::BIGINT AS count
           FROM clinic_visits
           WHERE academic_year_id = $1
           GROUP BY malady
           ORDER BY count DESC, malady"#,
    )
    .bind(academic_year_id)
    .fetch_all(&state.db_pool)
    .await?;
    Ok(Json(counts))
}

/// Natural-language comparison of clinic-visit volume across two
/// school years.
#[instrument(skip(state))]
pub async fn clinic_visits_comparison(
    State(state): State<AppState>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Json<ComparisonReport>, AppError> {
    let current_id = resolve_academic_year(&state.db_pool, &query.current).await?;
    let previous_id = resolve_academic_year(&state.db_pool, &query.previous).await?;

    let count_for = |id: i64| {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM clinic_visits WHERE academic_year_id = $1",
        )
        .bind(id)
        .fetch_one(&state.db_pool)
    };
    let current_total = count_for(current_id).await?;
    let previous_total = count_for(previous_id).await?;

    Ok(Json(ComparisonReport {
        summary: describe_change("clinic visits", current_total, previous_total),
        current_school_year: query.current,
        previous_school_year: query.previous,
        current_total,
        previous_total,
    }))
}

// ==================== Dengue ====================

#[instrument(skip(state))]
pub async fn dengue_monthly(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<MonthlyCount>>, AppError> {
    let label = require_school_year(&filter)?;
    let academic_year_id = resolve_academic_year(&state.db_pool, label).await?;

    let counts = sqlx::query_as::<_, MonthlyCount>(
        r#"SELECT EXTRACT(MONTH FROM onset_date)::INT AS month, COUNT(*)::BIGINT AS count
           FROM dengue_cases
           WHERE academic_year_id = $1
           GROUP BY month
           ORDER BY month"#,
    )
    .bind(academic_year_id)
    .fetch_all(&state.db_pool)
    .await?;
    Ok(Json(counts))
}

/// Dengue cases joined back to student profiles for the grade/gender split.
#[instrument(skip(state))]
pub async fn dengue_by_grade_gender(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<GradeGenderCount>>, AppError> {
    let label = require_school_year(&filter)?;
    let academic_year_id = resolve_academic_year(&state.db_pool, label).await?;

    let counts = sqlx::query_as::<_, GradeGenderCount>(
        r#"SELECT sp.grade, sp.gender, COUNT(*)::BIGINT AS count
           FROM dengue_cases dc
           JOIN student_profiles sp
             ON sp.lrn = dc.lrn AND sp.academic_year_id = dc.academic_year_id
           WHERE dc.academic_year_id = $1
           GROUP BY sp.grade, sp.gender
           ORDER BY sp.grade, sp.gender"#,
    )
    .bind(academic_year_id)
    .fetch_all(&state.db_pool)
    .await?;
    Ok(Json(counts))
}

// ==================== Feeding program ====================

/// Pre/post BMI classification breakdown for the feeding program, the basis
/// of the SBFP outcome dashboard.
#[instrument(skip(state))]
pub async fn feeding_outcomes(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<FeedingOutcomeReport>, AppError> {
    let label = require_school_year(&filter)?;
    let academic_year_id = resolve_academic_year(&state.db_pool, label).await?;

    let breakdown_for = |measurement_type: &'static str| {
        sqlx::query_as::<_, LabelCount>(
            r#"SELECT bmi_classification AS label, COUNT(*)::BIGINT AS count
               FROM feeding_records
               WHERE academic_year_id = $1 AND measurement_type = $2
               GROUP BY bmi_classification
               ORDER BY count DESC, label"#,
        )
        .bind(academic_year_id)
        .bind(measurement_type)
        .fetch_all(&state.db_pool)
    };

    let pre = breakdown_for("PRE").await?;
    let post = breakdown_for("POST").await?;

    Ok(Json(FeedingOutcomeReport {
        school_year: label.to_string(),
        pre,
        post,
    }))
}

// ==================== Medical checkups ====================

/// Counts of failed screenings and flagged conditions for the year.
#[instrument(skip(state))]
pub async fn checkup_screening_issues(
    State(state): State<AppState>,
    Query(filter): Query<SchoolYearFilter>,
) -> Result<Json<Vec<LabelCount>>, AppError> {
    let label = require_school_year(&filter)?;
    let academic_year_id = resolve_academic_year(&state.db_pool, label).await?;

    let counts = sqlx::query_as::<_, LabelCount>(
        r#"SELECT label, count FROM (
               SELECT 'Failed vision screening' AS label, COUNT(*)::BIGINT AS count
               FROM medical_checkups
               WHERE academic_year_id = $1 AND vision_screening = 'Failed'
               UNION ALL
               SELECT 'Failed auditory screening', COUNT(*)::BIGINT
               FROM medical_checkups
               WHERE academic_year_id = $1 AND auditory_screening = 'Failed'
               UNION ALL
               SELECT 'Not dewormed', COUNT(*)::BIGINT
               FROM medical_checkups
               WHERE academic_year_id = $1 AND dewormed = FALSE
               UNION ALL
               SELECT 'Underweight (wasted)', COUNT(*)::BIGINT
               FROM medical_checkups
               WHERE academic_year_id = $1
                 AND bmi_classification IN ('Wasted', 'Severely Wasted')
           ) issues
           ORDER BY count DESC, label"#,
    )
    .bind(academic_year_id)
    .fetch_all(&state.db_pool)
    .await?;
    Ok(Json(counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increase_is_phrased_with_percentage() {
        assert_eq!(
            describe_change("clinic visits", 150, 100),
            "clinic visits increased by 50% (100 to 150) compared to the previous school year."
        );
    }

    #[test]
    fn decrease_is_phrased_with_percentage() {
        assert_eq!(
            describe_change("dengue cases", 30, 40),
            "dengue cases decreased by 25% (40 to 30) compared to the previous school year."
        );
    }

    #[test]
    fn unchanged_and_empty_baselines_read_naturally() {
        assert_eq!(
            describe_change("clinic visits", 12, 12),
            "clinic visits held steady at 12 across both school years."
        );
        assert_eq!(
            describe_change("dengue cases", 0, 0),
            "No dengue cases were recorded in either school year."
        );
        assert_eq!(
            describe_change("dengue cases", 5, 0),
            "5 dengue cases were recorded this school year; none were recorded in the previous one."
        );
    }
}
