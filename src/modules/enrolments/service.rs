use anyhow::anyhow;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use rollbook_core::permissions;
use rollbook_core::{AppError, PaginationMeta};

use crate::middleware::auth::Principal;
use crate::modules::audit::service::AuditService;
use crate::utils::authz;

use super::model::{
    CreateEnrolmentDto, Enrolment, EnrolmentFilterParams, PaginatedEnrolmentsResponse,
};

const ENROLMENT_COLUMNS: &str = "id, student_id, class_id, start_date, end_date, created_at";

pub struct EnrolmentService;

impl EnrolmentService {
    #[instrument(skip(db, principal))]
    pub async fn enrol(
        db: &PgPool,
        principal: &Principal,
        dto: CreateEnrolmentDto,
    ) -> Result<Enrolment, AppError> {
        authz::require(principal, permissions::MANAGE_ENROLMENTS)?;

        if let Some(end_date) = dto.end_date
            && end_date < dto.start_date
        {
            return Err(AppError::bad_request(anyhow!(
                "end_date must not be before start_date"
            )));
        }

        let student_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM students WHERE id = $1)")
                .bind(dto.student_id)
                .fetch_one(db)
                .await?;
        if !student_exists {
            return Err(AppError::not_found(anyhow!(
                "Student not found: {}",
                dto.student_id
            )));
        }

        let class_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM classes WHERE id = $1)")
                .bind(dto.class_id)
                .fetch_one(db)
                .await?;
        if !class_exists {
            return Err(AppError::not_found(anyhow!(
                "Class not found: {}",
                dto.class_id
            )));
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM enrolments WHERE student_id = $1 AND class_id = $2)",
        )
        .bind(dto.student_id)
        .bind(dto.class_id)
        .fetch_one(db)
        .await?;

        if duplicate {
            return Err(AppError::bad_request(anyhow!(
                "Student is already enrolled in this class"
            )));
        }

        let enrolment = sqlx::query_as::<_, Enrolment>(&format!(
            "INSERT INTO enrolments (student_id, class_id, start_date, end_date)
             VALUES ($1, $2, $3, $4)
             RETURNING {ENROLMENT_COLUMNS}"
        ))
        .bind(dto.student_id)
        .bind(dto.class_id)
        .bind(dto.start_date)
        .bind(dto.end_date)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict();
            }
            AppError::from(e)
        })?;

        AuditService::record(
            db,
            Some(principal.id),
            "create",
            "enrolment",
            Some(enrolment.id),
            Some(format!(
                "student={} class={}",
                enrolment.student_id, enrolment.class_id
            )),
        )
        .await;

        Ok(enrolment)
    }

    #[instrument(skip(db, principal))]
    pub async fn get_enrolments(
        db: &PgPool,
        principal: &Principal,
        params: EnrolmentFilterParams,
    ) -> Result<PaginatedEnrolmentsResponse, AppError> {
        authz::require(principal, permissions::VIEW_DIRECTORY)?;

        let limit = params.pagination.limit();
        let offset = params.pagination.offset();

        let mut where_clause = String::from(" WHERE 1=1");
        let mut binds: Vec<Uuid> = Vec::new();

        if let Some(student_id) = params.student_id {
            binds.push(student_id);
            where_clause.push_str(&format!(" AND student_id = ${}", binds.len()));
        }
        if let Some(class_id) = params.class_id {
            binds.push(class_id);
            where_clause.push_str(&format!(" AND class_id = ${}", binds.len()));
        }

        let data_query = format!(
            "SELECT {ENROLMENT_COLUMNS} FROM enrolments {where_clause}
             ORDER BY start_date DESC, created_at DESC LIMIT {limit} OFFSET {offset}"
        );
        let count_query = format!("SELECT COUNT(*) FROM enrolments {where_clause}");

        let mut data_sql = sqlx::query_as::<_, Enrolment>(&data_query);
        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        for bind in &binds {
            data_sql = data_sql.bind(bind);
            count_sql = count_sql.bind(bind);
        }

        let enrolments = data_sql.fetch_all(db).await?;
        let total = count_sql.fetch_one(db).await?;

        let has_more = offset + (enrolments.len() as i64) < total;

        Ok(PaginatedEnrolmentsResponse {
            data: enrolments,
            meta: PaginationMeta {
                total,
                limit,
                offset: Some(offset),
                page: params.pagination.page(),
                has_more,
            },
        })
    }

    #[instrument(skip(db, principal))]
    pub async fn unenrol(db: &PgPool, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        authz::require(principal, permissions::MANAGE_ENROLMENTS)?;

        let result = sqlx::query("DELETE FROM enrolments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Enrolment not found: {}", id)));
        }

        AuditService::record(db, Some(principal.id), "delete", "enrolment", Some(id), None).await;

        Ok(())
    }
}
