//! Permission vocabulary.
//!
//! Permissions are flat, namespaced strings. A role either contains the exact
//! string or it does not; there is no hierarchy and no wildcard.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Every permission string a role may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "dashboard.view")]
    DashboardView,
    #[serde(rename = "personnel.view")]
    PersonnelView,
    #[serde(rename = "personnel.edit")]
    PersonnelEdit,
    #[serde(rename = "warehouse.view")]
    WarehouseView,
    #[serde(rename = "warehouse.edit")]
    WarehouseEdit,
    #[serde(rename = "roles.view")]
    RolesView,
    #[serde(rename = "roles.edit")]
    RolesEdit,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::DashboardView,
        Permission::PersonnelView,
        Permission::PersonnelEdit,
        Permission::WarehouseView,
        Permission::WarehouseEdit,
        Permission::RolesView,
        Permission::RolesEdit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::DashboardView => "dashboard.view",
            Permission::PersonnelView => "personnel.view",
            Permission::PersonnelEdit => "personnel.edit",
            Permission::WarehouseView => "warehouse.view",
            Permission::WarehouseEdit => "warehouse.edit",
            Permission::RolesView => "roles.view",
            Permission::RolesEdit => "roles.edit",
        }
    }

    /// Exact-match lookup. `"roles"` or `"Roles.Edit"` are not permissions.
    pub fn parse(s: &str) -> Option<Permission> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// Every permission string, in vocabulary order.
    pub fn all_strings() -> Vec<String> {
        Self::ALL.iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(Permission::parse("roles.edit"), Some(Permission::RolesEdit));
        assert_eq!(Permission::parse("roles"), None);
        assert_eq!(Permission::parse("roles.*"), None);
        assert_eq!(Permission::parse("Roles.Edit"), None);
        assert_eq!(Permission::parse(" roles.edit"), None);
        assert_eq!(Permission::parse("personnel.viewer"), None);
    }

    #[test]
    fn test_serde_uses_wire_strings() {
        let json = serde_json::to_string(&Permission::WarehouseView).unwrap();
        assert_eq!(json, "\"warehouse.view\"");
        let parsed: Permission = serde_json::from_str("\"personnel.edit\"").unwrap();
        assert_eq!(parsed, Permission::PersonnelEdit);
    }

    #[test]
    fn test_as_str_matches_parse_for_every_variant() {
        for p in Permission::ALL {
            assert_eq!(Permission::parse(p.as_str()), Some(p));
            assert_eq!(p.to_string(), p.as_str());
        }
        assert_eq!(Permission::all_strings().len(), Permission::ALL.len());
    }
}
