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
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentFilterParams, UpdateStudentDto,
};

const STUDENT_COLUMNS: &str =
    "id, first_name, last_name, date_of_birth, guardian_id, created_at, updated_at";

async fn guardian_exists(db: &PgPool, guardian_id: Uuid) -> Result<bool, AppError> {
    Ok(
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM guardians WHERE id = $1)")
            .bind(guardian_id)
            .fetch_one(db)
            .await?,
    )
}

pub struct StudentService;

impl StudentService {
    #[instrument(skip(db, principal))]
    pub async fn create_student(
        db: &PgPool,
        principal: &Principal,
        dto: CreateStudentDto,
    ) -> Result<Student, AppError> {
        authz::require(principal, permissions::MANAGE_STUDENTS)?;

        if let Some(guardian_id) = dto.guardian_id
            && !guardian_exists(db, guardian_id).await?
        {
            return Err(AppError::bad_request(anyhow!(
                "Guardian does not exist: {}",
                guardian_id
            )));
        }

        let student = sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students (first_name, last_name, date_of_birth, guardian_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(dto.date_of_birth)
        .bind(dto.guardian_id)
        .fetch_one(db)
        .await?;

        AuditService::record(
            db,
            Some(principal.id),
            "create",
            "student",
            Some(student.id),
            Some(format!("{} {}", student.first_name, student.last_name)),
        )
        .await;

        Ok(student)
    }

    #[instrument(skip(db, principal))]
    pub async fn get_students(
        db: &PgPool,
        principal: &Principal,
        params: StudentFilterParams,
    ) -> Result<PaginatedStudentsResponse, AppError> {
        authz::require(principal, permissions::VIEW_DIRECTORY)?;

        let limit = params.pagination.limit();
        let offset = params.pagination.offset();

        let mut where_clause = String::from(" WHERE 1=1");
        let mut name_bind: Option<String> = None;

        if let Some(name) = &params.name {
            name_bind = Some(format!("%{}%", name));
            where_clause.push_str(" AND (first_name ILIKE $1 OR last_name ILIKE $1)");
        }
        let guardian_filter = params.guardian_id.map(|guardian_id| {
            let position = if name_bind.is_some() { 2 } else { 1 };
            (guardian_id, format!(" AND guardian_id = ${}", position))
        });
        if let Some((_, clause)) = &guardian_filter {
            where_clause.push_str(clause);
        }

        let data_query = format!(
            "SELECT {STUDENT_COLUMNS} FROM students {where_clause}
             ORDER BY last_name, first_name LIMIT {limit} OFFSET {offset}"
        );
        let count_query = format!("SELECT COUNT(*) FROM students {where_clause}");

        let mut data_sql = sqlx::query_as::<_, Student>(&data_query);
        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(bind) = &name_bind {
            data_sql = data_sql.bind(bind);
            count_sql = count_sql.bind(bind);
        }
        if let Some((guardian_id, _)) = guardian_filter {
            data_sql = data_sql.bind(guardian_id);
            count_sql = count_sql.bind(guardian_id);
        }

        let students = data_sql.fetch_all(db).await?;
        let total = count_sql.fetch_one(db).await?;

        let has_more = offset + (students.len() as i64) < total;

        Ok(PaginatedStudentsResponse {
            data: students,
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
    pub async fn get_student_by_id(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
    ) -> Result<Student, AppError> {
        authz::require(principal, permissions::VIEW_DIRECTORY)?;

        let mut student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Student not found: {}", id)))?;

        // Weak reference: null out a guardian link that no longer resolves.
        if let Some(guardian_id) = student.guardian_id
            && !guardian_exists(db, guardian_id).await?
        {
            student.guardian_id = None;
        }

        Ok(student)
    }

    #[instrument(skip(db, principal))]
    pub async fn update_student(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        authz::require(principal, permissions::MANAGE_STUDENTS)?;

        let existing = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Student not found: {}", id)))?;

        if let Some(guardian_id) = dto.guardian_id
            && !guardian_exists(db, guardian_id).await?
        {
            return Err(AppError::bad_request(anyhow!(
                "Guardian does not exist: {}",
                guardian_id
            )));
        }

        let first_name = dto.first_name.unwrap_or(existing.first_name);
        let last_name = dto.last_name.unwrap_or(existing.last_name);
        let date_of_birth = dto.date_of_birth.unwrap_or(existing.date_of_birth);
        let guardian_id = dto.guardian_id.or(existing.guardian_id);

        let student = sqlx::query_as::<_, Student>(&format!(
            "UPDATE students
             SET first_name = $1, last_name = $2, date_of_birth = $3, guardian_id = $4,
                 updated_at = NOW()
             WHERE id = $5
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(&first_name)
        .bind(&last_name)
        .bind(date_of_birth)
        .bind(guardian_id)
        .bind(id)
        .fetch_one(db)
        .await?;

        AuditService::record(
            db,
            Some(principal.id),
            "update",
            "student",
            Some(student.id),
            None,
        )
        .await;

        Ok(student)
    }

    #[instrument(skip(db, principal))]
    pub async fn delete_student(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
    ) -> Result<(), AppError> {
        authz::require(principal, permissions::MANAGE_STUDENTS)?;

        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Student not found: {}", id)));
        }

        AuditService::record(db, Some(principal.id), "delete", "student", Some(id), None).await;

        Ok(())
    }
}
