use crate::api::admin::{
    Activity, AdminDashboard, Deadline, DepartmentShare, MonthlyAttendance, Performer,
    ReportsView, StatCard, UsersView, WeeklyTasks,
};
use crate::api::attendance::{AttendanceView, HistoryRow, HistoryStats, HistoryView};
use crate::api::dashboard::UserDashboard;
use crate::api::profile::ProfileView;
use crate::api::tasks::{Assignee, MyTasksView, StatusUpdate, TaskCard, TaskCounts, TaskManagerView};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::identity::Identity;
use crate::model::profile::{Profile, ProfileUpdate};
use crate::model::role::Role;
use crate::model::task::{NewTask, Task, TaskPriority, TaskStatus};
use crate::models::{AuthResponse, LoginRequest, SignUpRequest};
use crate::session::seed::SeedStatus;
use crate::session::store::{SessionState, SignUpForm};
use crate::shell::{MenuItem, View};
use crate::sync::notify::{Notification, Variant};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance & Task Dashboard API",
        version = "0.1.0",
        description = r#"
## Attendance & Task Dashboard

Server side of a small team dashboard on top of a hosted auth/data/storage service.

### Key Features
- **Sessions**: sign in, sign up (with sample tasks seeded in the background), sign out
- **Attendance**: daily check-in / check-out, history with CSV export
- **Tasks**: status and progress updates for assignees, create / delete for admins
- **Profile**: profile edits and avatar upload
- **Notifications**: every action answers with the session's queued notifications

### Sessions
A session is bound to the `attend_session` cookie. Clients without cookies send the
token from the `x-session-token` response header as `Authorization: Bearer <token>`.

### Pages
Every path outside `/api` is a page: it is resolved in the route table, passed
through the role gate and answered with a JSON envelope
(`path`, `title`, `view`, `identity`, `menu`, `data`, `notifications`).
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::signup,
        crate::auth::handlers::logout,
        crate::auth::handlers::current,
        crate::auth::handlers::seed_status,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::export_history,

        crate::api::tasks::update_status,
        crate::api::tasks::create_task,
        crate::api::tasks::delete_task,

        crate::api::profile::update_profile,
        crate::api::profile::upload_avatar,

        crate::api::notifications::drain,
        crate::api::notifications::dismiss
    ),
    components(
        schemas(
            LoginRequest,
            SignUpRequest,
            SignUpForm,
            AuthResponse,
            SessionState,
            SeedStatus,
            Identity,
            Role,
            AttendanceRecord,
            AttendanceStatus,
            Task,
            TaskStatus,
            TaskPriority,
            NewTask,
            StatusUpdate,
            Profile,
            ProfileUpdate,
            Notification,
            Variant,
            View,
            MenuItem,
            UserDashboard,
            AttendanceView,
            HistoryView,
            HistoryRow,
            HistoryStats,
            MyTasksView,
            TaskManagerView,
            TaskCard,
            TaskCounts,
            Assignee,
            ProfileView,
            AdminDashboard,
            ReportsView,
            UsersView,
            StatCard,
            Activity,
            Deadline,
            MonthlyAttendance,
            WeeklyTasks,
            DepartmentShare,
            Performer
        )
    ),
    tags(
        (name = "Auth", description = "Session and account APIs"),
        (name = "Attendance", description = "Check-in / check-out APIs"),
        (name = "Tasks", description = "Task APIs for assignees"),
        (name = "Profile", description = "Profile APIs"),
        (name = "Admin", description = "Admin-only task management APIs"),
        (name = "Notifications", description = "Per-session notification queue"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/login",
            "/api/session/seed",
            "/api/attendance/history/export",
            "/api/tasks/{id}/status",
            "/api/profile/avatar",
            "/api/notifications/{id}",
            "/api/admin/tasks/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
