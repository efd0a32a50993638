use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Parent,
}

impl Role {
    #[cfg(test)]
    pub const ALL: [Role; 3] = [Role::Admin, Role::Teacher, Role::Parent];

    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "parent" => Some(Role::Parent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // Administration
    ManageTeachers,
    ManageStudents,
    ManageParents,
    ManageClasses,
    ManageSubjects,
    ManageSessions,
    ViewAllReports,
    ManageSettings,
    // Teaching
    ViewAssignedClasses,
    ViewClassStudents,
    RecordGrades,
    EditGrades,
    RecordAttendance,
    ViewClassPerformance,
    // Parents
    ViewChildren,
    ViewChildGrades,
    ViewChildAttendance,
    ViewChildReportCard,
}

impl Permission {
    pub const ALL: [Permission; 18] = [
        Permission::ManageTeachers,
        Permission::ManageStudents,
        Permission::ManageParents,
        Permission::ManageClasses,
        Permission::ManageSubjects,
        Permission::ManageSessions,
        Permission::ViewAllReports,
        Permission::ManageSettings,
        Permission::ViewAssignedClasses,
        Permission::ViewClassStudents,
        Permission::RecordGrades,
        Permission::EditGrades,
        Permission::RecordAttendance,
        Permission::ViewClassPerformance,
        Permission::ViewChildren,
        Permission::ViewChildGrades,
        Permission::ViewChildAttendance,
        Permission::ViewChildReportCard,
    ];

    pub const TEACHER: [Permission; 6] = [
        Permission::ViewAssignedClasses,
        Permission::ViewClassStudents,
        Permission::RecordGrades,
        Permission::EditGrades,
        Permission::RecordAttendance,
        Permission::ViewClassPerformance,
    ];

    pub const PARENT: [Permission; 4] = [
        Permission::ViewChildren,
        Permission::ViewChildGrades,
        Permission::ViewChildAttendance,
        Permission::ViewChildReportCard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::ManageTeachers => "manage_teachers",
            Permission::ManageStudents => "manage_students",
            Permission::ManageParents => "manage_parents",
            Permission::ManageClasses => "manage_classes",
            Permission::ManageSubjects => "manage_subjects",
            Permission::ManageSessions => "manage_sessions",
            Permission::ViewAllReports => "view_all_reports",
            Permission::ManageSettings => "manage_settings",
            Permission::ViewAssignedClasses => "view_assigned_classes",
            Permission::ViewClassStudents => "view_class_students",
            Permission::RecordGrades => "record_grades",
            Permission::EditGrades => "edit_grades",
            Permission::RecordAttendance => "record_attendance",
            Permission::ViewClassPerformance => "view_class_performance",
            Permission::ViewChildren => "view_children",
            Permission::ViewChildGrades => "view_child_grades",
            Permission::ViewChildAttendance => "view_child_attendance",
            Permission::ViewChildReportCard => "view_child_report_card",
        }
    }

    pub fn parse(raw: &str) -> Option<Permission> {
        Permission::ALL.iter().copied().find(|p| p.as_str() == raw)
    }
}

/// Role -> permission sets. Built once and never edited; a different table
/// means building a new one and swapping it in whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePermissionTable {
    by_role: BTreeMap<Role, BTreeSet<Permission>>,
}

impl RolePermissionTable {
    pub fn standard() -> Self {
        Self::from_entries([
            (Role::Admin, Permission::ALL.to_vec()),
            (Role::Teacher, Permission::TEACHER.to_vec()),
            (Role::Parent, Permission::PARENT.to_vec()),
        ])
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Role, Vec<Permission>)>,
    {
        let mut by_role: BTreeMap<Role, BTreeSet<Permission>> = BTreeMap::new();
        for (role, perms) in entries {
            by_role.entry(role).or_default().extend(perms);
        }
        Self { by_role }
    }

    pub fn grants(&self, role: Role, permission: Permission) -> bool {
        self.by_role
            .get(&role)
            .map(|set| set.contains(&permission))
            .unwrap_or(false)
    }

    pub fn permissions(&self, role: Role) -> Vec<Permission> {
        self.by_role
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Answers "may this role do X" against a shared, read-only table. A missing
/// role or permission is always a "no".
#[derive(Debug, Clone)]
pub struct AuthorizationModel {
    table: Arc<RolePermissionTable>,
}

impl Default for AuthorizationModel {
    fn default() -> Self {
        Self::new(Arc::new(RolePermissionTable::standard()))
    }
}

impl AuthorizationModel {
    pub fn new(table: Arc<RolePermissionTable>) -> Self {
        Self { table }
    }

    #[cfg(test)]
    pub fn table(&self) -> &Arc<RolePermissionTable> {
        &self.table
    }

    /// Readers holding the old `Arc` keep seeing the old table in full.
    #[allow(dead_code)]
    pub fn replace_table(&mut self, table: Arc<RolePermissionTable>) {
        self.table = table;
    }

    pub fn has_permission(
        &self,
        role: impl Into<Option<Role>>,
        permission: impl Into<Option<Permission>>,
    ) -> bool {
        let role: Option<Role> = role.into();
        let permission: Option<Permission> = permission.into();
        match (role, permission) {
            (Some(role), Some(permission)) => self.table.grants(role, permission),
            _ => false,
        }
    }

    pub fn has_any<I, P>(&self, role: impl Into<Option<Role>>, permissions: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: Into<Option<Permission>>,
    {
        let role: Option<Role> = role.into();
        permissions
            .into_iter()
            .any(|p| self.has_permission(role, p))
    }

    /// True for an empty list, like any universal check.
    pub fn has_all<I, P>(&self, role: impl Into<Option<Role>>, permissions: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: Into<Option<Permission>>,
    {
        let role: Option<Role> = role.into();
        permissions
            .into_iter()
            .all(|p| self.has_permission(role, p))
    }

    pub fn permissions_for(&self, role: impl Into<Option<Role>>) -> Vec<Permission> {
        let role: Option<Role> = role.into();
        role.map(|r| self.table.permissions(r)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> AuthorizationModel {
        AuthorizationModel::default()
    }

    #[test]
    fn permission_strings_round_trip_and_are_unique() {
        let mut seen = BTreeSet::new();
        for p in Permission::ALL {
            assert_eq!(Permission::parse(p.as_str()), Some(p));
            assert!(seen.insert(p.as_str()));
            assert_eq!(
                serde_json::to_value(p).unwrap(),
                serde_json::json!(p.as_str())
            );
        }
        assert_eq!(seen.len(), 18);
        assert_eq!(Permission::parse("launch_missiles"), None);
        assert_eq!(Permission::parse(""), None);
    }

    #[test]
    fn role_strings_parse_exactly() {
        for r in Role::ALL {
            assert_eq!(Role::parse(r.as_str()), Some(r));
        }
        assert_eq!(Role::parse("Admin"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn admin_holds_every_permission() {
        let m = model();
        assert!(m.has_all(Role::Admin, Permission::ALL));
        assert!(m.has_permission(Role::Admin, Permission::ManageTeachers));
    }

    #[test]
    fn teacher_and_parent_sets_are_disjoint() {
        let m = model();
        let teacher: BTreeSet<_> = m.permissions_for(Role::Teacher).into_iter().collect();
        let parent: BTreeSet<_> = m.permissions_for(Role::Parent).into_iter().collect();
        assert_eq!(teacher.len(), 6);
        assert_eq!(parent.len(), 4);
        assert!(teacher.is_disjoint(&parent));
    }

    #[test]
    fn has_permission_checks_table_and_fails_closed() {
        let m = model();
        assert!(!m.has_permission(Role::Parent, Permission::ManageTeachers));
        assert!(m.has_permission(Role::Parent, Permission::ViewChildGrades));
        assert!(!m.has_permission(None, Permission::ViewChildGrades));
        assert!(!m.has_permission(Role::Admin, None));
        assert!(!m.has_permission(None, None));
    }

    #[test]
    fn has_any_and_has_all() {
        let m = model();
        assert!(m.has_all(
            Role::Teacher,
            [Permission::RecordGrades, Permission::RecordAttendance]
        ));
        assert!(!m.has_all(
            Role::Teacher,
            [Permission::RecordGrades, Permission::ManageTeachers]
        ));
        assert!(m.has_any(
            Role::Teacher,
            [Permission::ManageTeachers, Permission::RecordGrades]
        ));
        assert!(!m.has_any(Role::Parent, [Permission::RecordGrades]));
        assert!(!m.has_any(Role::Admin, Vec::<Permission>::new()));
        assert!(m.has_all(Role::Admin, Vec::<Permission>::new()));
        assert!(!m.has_any(None, Permission::ALL));
        assert!(!m.has_all(Role::Admin, [Some(Permission::RecordGrades), None]));
    }

    #[test]
    fn permissions_for_unknown_role_is_empty() {
        assert!(model().permissions_for(None).is_empty());
    }

    #[test]
    fn replacing_the_table_leaves_old_readers_untouched() {
        let mut m = model();
        let before = Arc::clone(m.table());
        let restricted = RolePermissionTable::from_entries([(Role::Admin, vec![Permission::ManageSettings])]);
        m.replace_table(Arc::new(restricted));

        assert!(!m.has_permission(Role::Admin, Permission::ManageTeachers));
        assert!(m.has_permission(Role::Admin, Permission::ManageSettings));
        assert!(!m.has_permission(Role::Teacher, Permission::RecordGrades));
        assert!(before.grants(Role::Admin, Permission::ManageTeachers));
    }
}
