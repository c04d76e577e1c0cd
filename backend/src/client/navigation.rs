//! Client-side view guard.
//!
//! Decides whether a view should be shown for the permissions reported by
//! `/auth/me`. This only shapes the UI; the server gate still checks every
//! request.

use crate::models::permission::Permission;

/// Views of the client application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Tasks,
    Personnel,
    Warehouse,
    Roles,
    Login,
    Register,
}

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Allow,
    Redirect(View),
}

impl View {
    pub fn path(&self) -> &'static str {
        match self {
            View::Dashboard => "/",
            View::Tasks => "/tasks",
            View::Personnel => "/personnel",
            View::Warehouse => "/warehouse",
            View::Roles => "/roles",
            View::Login => "/login",
            View::Register => "/register",
        }
    }

    /// Login and register are for signed-out visitors only.
    pub fn is_guest_only(&self) -> bool {
        matches!(self, View::Login | View::Register)
    }

    /// Permission needed to open the view. Tasks only need a session.
    pub fn required_permission(&self) -> Option<Permission> {
        match self {
            View::Dashboard => Some(Permission::DashboardView),
            View::Personnel => Some(Permission::PersonnelView),
            View::Warehouse => Some(Permission::WarehouseView),
            View::Roles => Some(Permission::RolesView),
            View::Tasks | View::Login | View::Register => None,
        }
    }
}

/// `permissions` is `None` when nobody is signed in.
pub fn can_visit(view: View, permissions: Option<&[String]>) -> Visit {
    let Some(permissions) = permissions else {
        return if view.is_guest_only() {
            Visit::Allow
        } else {
            Visit::Redirect(View::Login)
        };
    };

    if view.is_guest_only() {
        return Visit::Redirect(landing_view(permissions));
    }

    match view.required_permission() {
        Some(permission) if !holds(permissions, permission) => {
            Visit::Redirect(landing_view(permissions))
        }
        _ => Visit::Allow,
    }
}

/// First view a signed-in user can open. Tasks are always reachable.
pub fn landing_view(permissions: &[String]) -> View {
    if holds(permissions, Permission::DashboardView) {
        View::Dashboard
    } else {
        View::Tasks
    }
}

fn holds(permissions: &[String], permission: Permission) -> bool {
    permissions.iter().any(|p| p == permission.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_guest_is_sent_to_login() {
        assert_eq!(can_visit(View::Dashboard, None), Visit::Redirect(View::Login));
        assert_eq!(can_visit(View::Tasks, None), Visit::Redirect(View::Login));
        assert_eq!(can_visit(View::Login, None), Visit::Allow);
        assert_eq!(can_visit(View::Register, None), Visit::Allow);
    }

    #[test]
    fn test_signed_in_user_leaves_guest_views() {
        let worker = perms(&["dashboard.view"]);
        assert_eq!(
            can_visit(View::Login, Some(worker.as_slice())),
            Visit::Redirect(View::Dashboard)
        );
        assert_eq!(
            can_visit(View::Register, Some(&[][..])),
            Visit::Redirect(View::Tasks)
        );
    }

    #[test]
    fn test_views_follow_exact_permissions() {
        let clerk = perms(&["dashboard.view", "warehouse.view", "personnel.viewer"]);
        assert_eq!(can_visit(View::Warehouse, Some(clerk.as_slice())), Visit::Allow);
        assert_eq!(can_visit(View::Tasks, Some(clerk.as_slice())), Visit::Allow);
        assert_eq!(
            can_visit(View::Personnel, Some(clerk.as_slice())),
            Visit::Redirect(View::Dashboard)
        );
        assert_eq!(
            can_visit(View::Roles, Some(clerk.as_slice())),
            Visit::Redirect(View::Dashboard)
        );
    }

    #[test]
    fn test_edit_permission_alone_does_not_open_view() {
        let editor = perms(&["roles.edit"]);
        assert_eq!(can_visit(View::Roles, Some(editor.as_slice())), Visit::Redirect(View::Tasks));
    }
}
