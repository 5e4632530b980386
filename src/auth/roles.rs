//! Static role and permission tables.
//!
//! Three fixed roles (viewer, editor, manager), each mapped to an
//! immutable permission set. There is no per-user grant storage; the
//! role column on the user row decides everything.

use serde::{Deserialize, Serialize};

/// Fine-grained permission over register resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewRisks,
    CreateRisks,
    EditRisks,
    DeleteRisks,
    ViewActionItems,
    CreateActionItems,
    EditActionItems,
    DeleteActionItems,
    ViewSnapshots,
    CreateSnapshots,
    RestoreSnapshots,
    DeleteSnapshots,
    ViewAuditLogs,
    ViewUsers,
    ManageUsers,
    ViewRbs,
    EditRbs,
    ViewSystemStatus,
    ManageConfig,
}

impl Permission {
    /// All permission variants.
    pub fn all() -> Vec<Permission> {
        vec![
            Permission::ViewRisks,
            Permission::CreateRisks,
            Permission::EditRisks,
            Permission::DeleteRisks,
            Permission::ViewActionItems,
            Permission::CreateActionItems,
            Permission::EditActionItems,
            Permission::DeleteActionItems,
            Permission::ViewSnapshots,
            Permission::CreateSnapshots,
            Permission::RestoreSnapshots,
            Permission::DeleteSnapshots,
            Permission::ViewAuditLogs,
            Permission::ViewUsers,
            Permission::ManageUsers,
            Permission::ViewRbs,
            Permission::EditRbs,
            Permission::ViewSystemStatus,
            Permission::ManageConfig,
        ]
    }

    /// Wire name, e.g. `view_risks`. Matches the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewRisks => "view_risks",
            Permission::CreateRisks => "create_risks",
            Permission::EditRisks => "edit_risks",
            Permission::DeleteRisks => "delete_risks",
            Permission::ViewActionItems => "view_action_items",
            Permission::CreateActionItems => "create_action_items",
            Permission::EditActionItems => "edit_action_items",
            Permission::DeleteActionItems => "delete_action_items",
            Permission::ViewSnapshots => "view_snapshots",
            Permission::CreateSnapshots => "create_snapshots",
            Permission::RestoreSnapshots => "restore_snapshots",
            Permission::DeleteSnapshots => "delete_snapshots",
            Permission::ViewAuditLogs => "view_audit_logs",
            Permission::ViewUsers => "view_users",
            Permission::ManageUsers => "manage_users",
            Permission::ViewRbs => "view_rbs",
            Permission::EditRbs => "edit_rbs",
            Permission::ViewSystemStatus => "view_system_status",
            Permission::ManageConfig => "manage_config",
        }
    }
}

/// Account role, stored lowercase in the users table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Editor,
    Manager,
}

impl Role {
    pub fn all() -> [Role; 3] {
        [Role::Viewer, Role::Editor, Role::Manager]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Manager => "manager",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "viewer" => Some(Role::Viewer),
            "editor" => Some(Role::Editor),
            "manager" => Some(Role::Manager),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Viewer => "Viewer",
            Role::Editor => "Editor",
            Role::Manager => "Manager",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Viewer => "Read-only access to risks, action items, and snapshots",
            Role::Editor => "Can create and edit risks and action items, and capture snapshots",
            Role::Manager => "Full access including deletion, restores, audit logs, and user management",
        }
    }

    /// Whether this role holds the given permission.
    pub fn has(&self, permission: Permission) -> bool {
        permissions_for(*self).contains(&permission)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed permission set for a role.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    match role {
        Role::Viewer => vec![
            Permission::ViewRisks,
            Permission::ViewActionItems,
            Permission::ViewSnapshots,
            Permission::ViewRbs,
            Permission::ViewSystemStatus,
        ],
        Role::Editor => {
            let mut perms = permissions_for(Role::Viewer);
            perms.extend([
                Permission::CreateRisks,
                Permission::EditRisks,
                Permission::CreateActionItems,
                Permission::EditActionItems,
                Permission::CreateSnapshots,
                Permission::EditRbs,
            ]);
            perms
        }
        Role::Manager => Permission::all(),
    }
}

/// Catalog entry for the public roles endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RoleInfo {
    pub value: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub permissions: Vec<Permission>,
}

/// All roles with their labels and resolved permissions.
pub fn role_catalog() -> Vec<RoleInfo> {
    Role::all()
        .iter()
        .map(|role| RoleInfo {
            value: role.as_str(),
            label: role.label(),
            description: role.description(),
            permissions: permissions_for(*role),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_is_read_only() {
        assert!(Role::Viewer.has(Permission::ViewRisks));
        assert!(Role::Viewer.has(Permission::ViewSystemStatus));
        assert!(!Role::Viewer.has(Permission::CreateRisks));
        assert!(!Role::Viewer.has(Permission::ViewAuditLogs));
        assert!(!Role::Viewer.has(Permission::ViewUsers));
    }

    #[test]
    fn test_editor_can_write_but_not_delete() {
        assert!(Role::Editor.has(Permission::CreateRisks));
        assert!(Role::Editor.has(Permission::EditActionItems));
        assert!(Role::Editor.has(Permission::CreateSnapshots));
        assert!(!Role::Editor.has(Permission::DeleteRisks));
        assert!(!Role::Editor.has(Permission::RestoreSnapshots));
        assert!(!Role::Editor.has(Permission::ManageUsers));
    }

    #[test]
    fn test_manager_has_everything() {
        for permission in Permission::all() {
            assert!(
                Role::Manager.has(permission),
                "manager missing {}",
                permission.as_str()
            );
        }
    }

    #[test]
    fn test_role_parse_round_trip() {
        for role in Role::all() {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn test_permission_wire_names_match_serde() {
        for permission in Permission::all() {
            let encoded = serde_json::to_value(permission).unwrap();
            assert_eq!(encoded, serde_json::json!(permission.as_str()));
        }
    }
}
