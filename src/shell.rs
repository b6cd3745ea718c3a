//! Navigation shell: the static route table of the dashboard and the sidebar
//! menus. Rendering lives in `api::pages`.

use serde::Serialize;
use strum_macros::AsRefStr;
use utoipa::ToSchema;

use crate::model::role::Role;

/// Where an authenticated visitor lands when asking for `/`.
pub const DEFAULT_LANDING: &str = "/dashboard";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Role(Role),
}

impl Access {
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Access::Role(role) => Some(*role),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum View {
    Login,
    /// Answers `/` by redirecting to the landing page.
    Landing,
    AdminDashboard,
    AdminUsers,
    TaskManager,
    Reports,
    UserDashboard,
    Attendance,
    MyTasks,
    History,
    Profile,
    Pending,
    NotFound,
}

#[derive(Debug)]
pub struct Route {
    pub path: &'static str,
    pub title: &'static str,
    pub access: Access,
    pub view: View,
}

pub static ROUTES: &[Route] = &[
    Route {
        path: LOGIN_PATH,
        title: "Sign In",
        access: Access::Public,
        view: View::Login,
    },
    Route {
        path: "/",
        title: "Home",
        access: Access::Authenticated,
        view: View::Landing,
    },
    Route {
        path: "/admin/dashboard",
        title: "Admin Dashboard",
        access: Access::Role(Role::Admin),
        view: View::AdminDashboard,
    },
    Route {
        path: "/admin/users",
        title: "Users",
        access: Access::Role(Role::Admin),
        view: View::AdminUsers,
    },
    Route {
        path: "/admin/tasks",
        title: "Task Manager",
        access: Access::Role(Role::Admin),
        view: View::TaskManager,
    },
    Route {
        path: "/admin/reports",
        title: "Reports",
        access: Access::Role(Role::Admin),
        view: View::Reports,
    },
    Route {
        path: "/dashboard",
        title: "Dashboard",
        access: Access::Authenticated,
        view: View::UserDashboard,
    },
    Route {
        path: "/attendance",
        title: "Check In/Out",
        access: Access::Authenticated,
        view: View::Attendance,
    },
    Route {
        path: "/tasks",
        title: "My Tasks",
        access: Access::Authenticated,
        view: View::MyTasks,
    },
    Route {
        path: "/history",
        title: "Attendance History",
        access: Access::Authenticated,
        view: View::History,
    },
    Route {
        path: "/profile",
        title: "Profile",
        access: Access::Authenticated,
        view: View::Profile,
    },
];

/// Looks a path up in the table. Trailing slashes are ignored; unknown paths yield `None`.
pub fn resolve(path: &str) -> Option<&'static Route> {
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    ROUTES.iter().find(|r| r.path == path)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MenuItem {
    pub label: &'static str,
    pub path: &'static str,
}

const ADMIN_MENU: &[(&str, &str)] = &[
    ("Dashboard", "/admin/dashboard"),
    ("Users", "/admin/users"),
    ("Task Manager", "/admin/tasks"),
    ("Reports", "/admin/reports"),
];

const USER_MENU: &[(&str, &str)] = &[
    ("Dashboard", "/dashboard"),
    ("Check In/Out", "/attendance"),
    ("My Tasks", "/tasks"),
    ("Attendance History", "/history"),
    ("Profile", "/profile"),
];

/// Sidebar entries for a role.
pub fn menu(role: Role) -> Vec<MenuItem> {
    let items = match role {
        Role::Admin => ADMIN_MENU,
        Role::User => USER_MENU,
    };
    items
        .iter()
        .map(|&(label, path)| MenuItem { label, path })
        .collect()
}
