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
    AttendanceRecord, AttendanceSession, AttendanceStatus, CreateSessionDto,
    PaginatedSessionsResponse, RecordAttendanceDto, SessionFilterParams,
};

const SESSION_COLUMNS: &str = "id, class_id, session_date, created_at";
const RECORD_COLUMNS: &str =
    "id, session_id, student_id, status, note, recorded_by, created_at, updated_at";

pub struct AttendanceService;

impl AttendanceService {
    #[instrument(skip(db, principal))]
    pub async fn create_session(
        db: &PgPool,
        principal: &Principal,
        dto: CreateSessionDto,
    ) -> Result<AttendanceSession, AppError> {
        authz::require(principal, permissions::EDIT_ATTENDANCE)?;

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
            "SELECT EXISTS(SELECT 1 FROM attendance_sessions WHERE class_id = $1 AND session_date = $2)",
        )
        .bind(dto.class_id)
        .bind(dto.session_date)
        .fetch_one(db)
        .await?;

        if duplicate {
            return Err(AppError::bad_request(anyhow!(
                "A session for this class and date already exists"
            )));
        }

        let session = sqlx::query_as::<_, AttendanceSession>(&format!(
            "INSERT INTO attendance_sessions (class_id, session_date)
             VALUES ($1, $2)
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(dto.class_id)
        .bind(dto.session_date)
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
            "attendance_session",
            Some(session.id),
            Some(format!(
                "class={} date={}",
                session.class_id, session.session_date
            )),
        )
        .await;

        Ok(session)
    }

    #[instrument(skip(db, principal))]
    pub async fn get_sessions(
        db: &PgPool,
        principal: &Principal,
        params: SessionFilterParams,
    ) -> Result<PaginatedSessionsResponse, AppError> {
        authz::require(principal, permissions::VIEW_ATTENDANCE)?;

        let limit = params.pagination.limit();
        let offset = params.pagination.offset();

        let (sessions, total): (Vec<AttendanceSession>, i64) =
            if let Some(class_id) = params.class_id {
                let sessions = sqlx::query_as::<_, AttendanceSession>(&format!(
                    "SELECT {SESSION_COLUMNS} FROM attendance_sessions WHERE class_id = $1
                     ORDER BY session_date DESC LIMIT $2 OFFSET $3"
                ))
                .bind(class_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(db)
                .await?;

                let total = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM attendance_sessions WHERE class_id = $1",
                )
                .bind(class_id)
                .fetch_one(db)
                .await?;

                (sessions, total)
            } else {
                let sessions = sqlx::query_as::<_, AttendanceSession>(&format!(
                    "SELECT {SESSION_COLUMNS} FROM attendance_sessions
                     ORDER BY session_date DESC LIMIT $1 OFFSET $2"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(db)
                .await?;

                let total =
                    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance_sessions")
                        .fetch_one(db)
                        .await?;

                (sessions, total)
            };

        let has_more = offset + (sessions.len() as i64) < total;

        Ok(PaginatedSessionsResponse {
            data: sessions,
            meta: PaginationMeta {
                total,
                limit,
                offset: Some(offset),
                page: params.pagination.page(),
                has_more,
            },
        })
    }

    /// Records one student's attendance for a session, overwriting any
    /// earlier record for the same (session, student) pair.
    #[instrument(skip(db, principal))]
    pub async fn record_attendance(
        db: &PgPool,
        principal: &Principal,
        session_id: Uuid,
        dto: RecordAttendanceDto,
    ) -> Result<AttendanceRecord, AppError> {
        authz::require(principal, permissions::EDIT_ATTENDANCE)?;

        let status = AttendanceStatus::parse(&dto.status).ok_or_else(|| {
            AppError::bad_request(anyhow!("Invalid attendance status: {}", dto.status))
        })?;

        let class_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT class_id FROM attendance_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| {
            AppError::not_found(anyhow!("Attendance session not found: {}", session_id))
        })?;

        let enrolled = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM enrolments WHERE student_id = $1 AND class_id = $2)",
        )
        .bind(dto.student_id)
        .bind(class_id)
        .fetch_one(db)
        .await?;

        if !enrolled {
            return Err(AppError::bad_request(anyhow!(
                "Student is not enrolled in this class"
            )));
        }

        let record = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "INSERT INTO attendance_records (session_id, student_id, status, note, recorded_by)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (session_id, student_id)
             DO UPDATE SET status = $3, note = $4, recorded_by = $5, updated_at = NOW()
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(session_id)
        .bind(dto.student_id)
        .bind(status.as_str())
        .bind(&dto.note)
        .bind(principal.id)
        .fetch_one(db)
        .await?;

        AuditService::record(
            db,
            Some(principal.id),
            "record",
            "attendance_record",
            Some(record.id),
            Some(format!(
                "session={} student={} status={}",
                session_id, record.student_id, record.status
            )),
        )
        .await;

        Ok(record)
    }

    #[instrument(skip(db, principal))]
    pub async fn get_records(
        db: &PgPool,
        principal: &Principal,
        session_id: Uuid,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        authz::require(principal, permissions::VIEW_ATTENDANCE)?;

        let session_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM attendance_sessions WHERE id = $1)",
        )
        .bind(session_id)
        .fetch_one(db)
        .await?;

        if !session_exists {
            return Err(AppError::not_found(anyhow!(
                "Attendance session not found: {}",
                session_id
            )));
        }

        let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM attendance_records WHERE session_id = $1
             ORDER BY created_at"
        ))
        .bind(session_id)
        .fetch_all(db)
        .await?;

        Ok(records)
    }
}
