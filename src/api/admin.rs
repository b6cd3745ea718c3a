//! Admin pages. The dashboard and reports show fixed figures; only the users
//! page and the task manager read live data.

use once_cell::sync::Lazy;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::identity::Identity;
use crate::model::profile::Profile;
use crate::session::SessionContext;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatCard {
    pub title: &'static str,
    pub value: &'static str,
    pub change: &'static str,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Activity {
    pub user: &'static str,
    pub action: &'static str,
    pub time: &'static str,
    /// `completed`, `checkin`, `update` or `checkout`.
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Deadline {
    pub task: &'static str,
    pub assignee: &'static str,
    pub deadline: &'static str,
    pub priority: &'static str,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MonthlyAttendance {
    pub name: &'static str,
    pub present: u32,
    pub absent: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WeeklyTasks {
    pub name: &'static str,
    pub completed: u32,
    pub pending: u32,
    pub in_progress: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DepartmentShare {
    pub name: &'static str,
    /// Percent of headcount.
    pub value: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Performer {
    pub name: &'static str,
    pub completed_tasks: u32,
    /// Attendance percent.
    pub attendance: u32,
}

static DASHBOARD_STATS: Lazy<Vec<StatCard>> = Lazy::new(|| {
    vec![
        StatCard {
            title: "Total Employees",
            value: "24",
            change: "+2 this month",
        },
        StatCard {
            title: "Present Today",
            value: "18",
            change: "75% attendance",
        },
        StatCard {
            title: "Active Tasks",
            value: "45",
            change: "12 due today",
        },
        StatCard {
            title: "Completion Rate",
            value: "87%",
            change: "+5% vs last week",
        },
    ]
});

static RECENT_ACTIVITY: Lazy<Vec<Activity>> = Lazy::new(|| {
    vec![
        Activity {
            user: "Jane Intern",
            action: "Completed task: API Integration",
            time: "2 hours ago",
            kind: "completed",
        },
        Activity {
            user: "Mike Developer",
            action: "Checked in",
            time: "3 hours ago",
            kind: "checkin",
        },
        Activity {
            user: "Sarah Designer",
            action: "Updated task status",
            time: "4 hours ago",
            kind: "update",
        },
        Activity {
            user: "Tom Analyst",
            action: "Checked out",
            time: "5 hours ago",
            kind: "checkout",
        },
    ]
});

static UPCOMING_DEADLINES: Lazy<Vec<Deadline>> = Lazy::new(|| {
    vec![
        Deadline {
            task: "Database Migration",
            assignee: "Development Team",
            deadline: "Today",
            priority: "High",
        },
        Deadline {
            task: "UI Redesign",
            assignee: "Design Team",
            deadline: "Tomorrow",
            priority: "Medium",
        },
        Deadline {
            task: "Testing Phase",
            assignee: "QA Team",
            deadline: "2 days",
            priority: "Medium",
        },
        Deadline {
            task: "Documentation",
            assignee: "Technical Writers",
            deadline: "1 week",
            priority: "Low",
        },
    ]
});

static REPORT_SUMMARY: Lazy<Vec<StatCard>> = Lazy::new(|| {
    vec![
        StatCard {
            title: "Avg Attendance",
            value: "91.2%",
            change: "+2.5% from last month",
        },
        StatCard {
            title: "Tasks Completed",
            value: "348",
            change: "+12% from last month",
        },
        StatCard {
            title: "Avg Working Hours",
            value: "7.8h",
            change: "Per day average",
        },
        StatCard {
            title: "Active Projects",
            value: "23",
            change: "5 completing this week",
        },
    ]
});

static MONTHLY_ATTENDANCE: Lazy<Vec<MonthlyAttendance>> = Lazy::new(|| {
    [
        ("Jan", 85, 15),
        ("Feb", 90, 10),
        ("Mar", 88, 12),
        ("Apr", 92, 8),
        ("May", 87, 13),
        ("Jun", 95, 5),
    ]
        .into_iter()
        .map(|(name, present, absent)| MonthlyAttendance { name, present, absent })
        .collect()
});

static WEEKLY_TASKS: Lazy<Vec<WeeklyTasks>> = Lazy::new(|| {
    [("Week 1", 12, 8, 5), ("Week 2", 15, 6, 4), ("Week 3", 18, 4, 3), ("Week 4", 20, 3, 2)]
        .into_iter()
        .map(|(name, completed, pending, in_progress)| WeeklyTasks {
            name,
            completed,
            pending,
            in_progress,
        })
        .collect()
});

static DEPARTMENTS: Lazy<Vec<DepartmentShare>> = Lazy::new(|| {
    [("Engineering", 45), ("Design", 25), ("Marketing", 20), ("HR", 10)]
        .into_iter()
        .map(|(name, value)| DepartmentShare { name, value })
        .collect()
});

static TOP_PERFORMERS: Lazy<Vec<Performer>> = Lazy::new(|| {
    [
        ("John Doe", 24, 98),
        ("Jane Smith", 22, 96),
        ("Mike Johnson", 20, 94),
        ("Sarah Wilson", 19, 92),
    ]
        .into_iter()
        .map(|(name, completed_tasks, attendance)| Performer {
            name,
            completed_tasks,
            attendance,
        })
        .collect()
});

#[derive(Serialize, ToSchema)]
pub struct AdminDashboard {
    pub stats: Vec<StatCard>,
    pub recent_activity: Vec<Activity>,
    pub upcoming_deadlines: Vec<Deadline>,
}

pub fn admin_dashboard() -> AdminDashboard {
    AdminDashboard {
        stats: DASHBOARD_STATS.clone(),
        recent_activity: RECENT_ACTIVITY.clone(),
        upcoming_deadlines: UPCOMING_DEADLINES.clone(),
    }
}

#[derive(Serialize, ToSchema)]
pub struct ReportsView {
    pub summary: Vec<StatCard>,
    pub attendance: Vec<MonthlyAttendance>,
    pub task_completion: Vec<WeeklyTasks>,
    pub departments: Vec<DepartmentShare>,
    pub top_performers: Vec<Performer>,
}

pub fn reports() -> ReportsView {
    ReportsView {
        summary: REPORT_SUMMARY.clone(),
        attendance: MONTHLY_ATTENDANCE.clone(),
        task_completion: WEEKLY_TASKS.clone(),
        departments: DEPARTMENTS.clone(),
        top_performers: TOP_PERFORMERS.clone(),
    }
}

#[derive(Serialize, ToSchema)]
pub struct UsersView {
    pub users: Vec<Profile>,
    pub total: usize,
}

pub async fn users_view(ctx: &SessionContext, identity: &Identity) -> UsersView {
    let mut users = ctx.profile.fetch_all(identity).await;
    users.sort_by(|a, b| a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()));
    UsersView {
        total: users.len(),
        users,
    }
}
