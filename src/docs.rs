use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::attendance::model::{
    AttendanceRecord, AttendanceSession, AttendanceStatus, CreateSessionDto,
    PaginatedSessionsResponse, RecordAttendanceDto,
};
use crate::modules::audit::model::{AuditEntry, PaginatedAuditResponse};
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::auth::model::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, MeResponse, MessageResponse,
    ResetPasswordRequest,
};
use crate::modules::classes::model::{
    Class, CreateClassDto, PaginatedClassesResponse, UpdateClassDto,
};
use crate::modules::enrolments::model::{
    CreateEnrolmentDto, Enrolment, PaginatedEnrolmentsResponse,
};
use crate::modules::guardians::model::{
    CreateGuardianDto, Guardian, PaginatedGuardiansResponse, UpdateGuardianDto,
};
use crate::modules::roles::model::{
    CreateRoleDto, PaginatedRolesResponse, PermissionInfo, Role, UpdateRoleDto,
};
use crate::modules::students::model::{
    CreateStudentDto, PaginatedStudentsResponse, Student, UpdateStudentDto,
};
use crate::modules::users::model::{
    ChangePasswordDto, CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User, UserWithRole,
};
use rollbook_core::{PaginationMeta, PaginationParams};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::logout,
        crate::modules::auth::controller::me,
        crate::modules::auth::controller::forgot_password,
        crate::modules::auth::controller::reset_password,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::get_user_by_id,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::users::controller::change_password,
        crate::modules::roles::controller::get_permissions,
        crate::modules::roles::controller::create_role,
        crate::modules::roles::controller::get_roles,
        crate::modules::roles::controller::get_role_by_id,
        crate::modules::roles::controller::get_role_by_name,
        crate::modules::roles::controller::update_role,
        crate::modules::roles::controller::delete_role,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_students,
        crate::modules::students::controller::get_student_by_id,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::guardians::controller::create_guardian,
        crate::modules::guardians::controller::get_guardians,
        crate::modules::guardians::controller::get_guardian_by_id,
        crate::modules::guardians::controller::update_guardian,
        crate::modules::guardians::controller::delete_guardian,
        crate::modules::classes::controller::create_class,
        crate::modules::classes::controller::get_classes,
        crate::modules::classes::controller::get_class_by_id,
        crate::modules::classes::controller::update_class,
        crate::modules::classes::controller::delete_class,
        crate::modules::enrolments::controller::enrol,
        crate::modules::enrolments::controller::get_enrolments,
        crate::modules::enrolments::controller::unenrol,
        crate::modules::attendance::controller::create_session,
        crate::modules::attendance::controller::get_sessions,
        crate::modules::attendance::controller::record_attendance,
        crate::modules::attendance::controller::get_records,
        crate::modules::audit::controller::get_audit_entries,
    ),
    components(
        schemas(
            ErrorResponse,
            LoginRequest,
            LoginResponse,
            MeResponse,
            MessageResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            User,
            UserWithRole,
            CreateUserDto,
            UpdateUserDto,
            ChangePasswordDto,
            PaginatedUsersResponse,
            Role,
            PermissionInfo,
            CreateRoleDto,
            UpdateRoleDto,
            PaginatedRolesResponse,
            Student,
            CreateStudentDto,
            UpdateStudentDto,
            PaginatedStudentsResponse,
            Guardian,
            CreateGuardianDto,
            UpdateGuardianDto,
            PaginatedGuardiansResponse,
            Class,
            CreateClassDto,
            UpdateClassDto,
            PaginatedClassesResponse,
            Enrolment,
            CreateEnrolmentDto,
            PaginatedEnrolmentsResponse,
            AttendanceSession,
            AttendanceRecord,
            AttendanceStatus,
            CreateSessionDto,
            RecordAttendanceDto,
            PaginatedSessionsResponse,
            AuditEntry,
            PaginatedAuditResponse,
            PaginationMeta,
            PaginationParams,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, logout, session introspection"),
        (name = "Users", description = "User account management"),
        (name = "Roles", description = "Roles and the permission catalogue"),
        (name = "Students", description = "Student directory"),
        (name = "Guardians", description = "Guardian directory"),
        (name = "Classes", description = "Classes"),
        (name = "Enrolments", description = "Student-class enrolments"),
        (name = "Attendance", description = "Attendance sessions and records"),
        (name = "Audit", description = "Audit log"),
    ),
    info(
        title = "Rollbook API",
        description = "School information system backend",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
