//! Static, role-scoped catalog of navigable pages.
//!
//! The catalog is loaded once at startup and never mutated afterwards. The
//! built-in table mirrors the admin and employee dashboards; deployments can
//! replace it with a JSON file of the same shape.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use hrms_shared::types::Role;

use crate::error::CatalogError;

/// One navigable page and the alternate terms it answers to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchTarget {
    pub label: String,
    pub href: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SearchTarget {
    pub fn new(label: &str, href: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            href: href.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Page catalog, one list per role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    #[serde(default)]
    admin: Vec<SearchTarget>,
    #[serde(default)]
    employee: Vec<SearchTarget>,
}

impl Catalog {
    pub fn new(admin: Vec<SearchTarget>, employee: Vec<SearchTarget>) -> Self {
        Self { admin, employee }
    }

    /// Entries visible to `role`.
    pub fn entries(&self, role: Role) -> &[SearchTarget] {
        match role {
            Role::Admin => &self.admin,
            Role::Employee => &self.employee,
        }
    }

    /// Parse a catalog from JSON: `{ "admin": [...], "employee": [...] }`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog file from disk.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            admin = catalog.admin.len(),
            employee = catalog.employee.len(),
            "Loaded search catalog"
        );
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for role in [Role::Admin, Role::Employee] {
            for (index, target) in self.entries(role).iter().enumerate() {
                let field = if target.label.trim().is_empty() {
                    "label"
                } else if target.href.trim().is_empty() {
                    "href"
                } else {
                    continue;
                };
                return Err(CatalogError::EmptyField {
                    role: role.as_str(),
                    index,
                    field,
                });
            }
        }
        Ok(())
    }

    /// The pages of the HRMS dashboards.
    pub fn builtin() -> Self {
        let admin = vec![
            SearchTarget::new("Dashboard", "/admin/dashboard", &["home", "overview", "stats"]),
            SearchTarget::new("Employees", "/admin/employees", &["staff", "people", "directory"]),
            SearchTarget::new("Add Employee", "/admin/employees/new", &["onboard", "new hire", "create employee"]),
            SearchTarget::new("Attendance", "/admin/attendance", &["check in", "check out", "clock", "presence"]),
            SearchTarget::new("Leave Requests", "/admin/leaves", &["leave", "vacation", "time off", "approvals"]),
            SearchTarget::new("Payroll", "/admin/payroll", &["salary", "compensation", "wages"]),
            SearchTarget::new("Payslips", "/admin/payroll/payslips", &["salary slip", "pay stub", "monthly payroll"]),
            SearchTarget::new("Holidays", "/admin/holidays", &["calendar", "public holiday", "festival"]),
            SearchTarget::new("Polls", "/admin/polls", &["survey", "vote", "feedback"]),
            SearchTarget::new("Create Poll", "/admin/polls/new", &["new poll", "survey builder"]),
            SearchTarget::new("Messages", "/admin/chat", &["chat", "inbox", "conversation"]),
            SearchTarget::new("Departments", "/admin/departments", &["units", "org structure"]),
            SearchTarget::new("Announcements", "/admin/announcements", &["notice", "broadcast", "news"]),
            SearchTarget::new("Reports", "/admin/reports", &["export", "analytics", "excel"]),
            SearchTarget::new("Organization Settings", "/admin/settings", &["company", "configuration", "preferences"]),
            SearchTarget::new("Profile", "/admin/profile", &["account", "my details"]),
        ];

        let employee = vec![
            SearchTarget::new("Dashboard", "/user/dashboard", &["home", "overview"]),
            SearchTarget::new("Attendance", "/user/attendance", &["check in", "check out", "clock in", "punch"]),
            SearchTarget::new("Apply Leave", "/user/leave/apply", &["vacation", "time off", "request leave"]),
            SearchTarget::new("Leave History", "/user/leave", &["leave balance", "past leaves"]),
            SearchTarget::new("Timesheet", "/user/timesheet", &["hours", "logs"]),
            SearchTarget::new("Add Timesheet", "/user/timesheet/add", &["new entry", "submit work"]),
            SearchTarget::new("Payslips", "/user/payslips", &["salary", "payroll", "pay stub"]),
            SearchTarget::new("Holidays", "/user/holidays", &["calendar", "festival"]),
            SearchTarget::new("Polls", "/user/polls", &["survey", "vote"]),
            SearchTarget::new("Messages", "/user/chat", &["chat", "inbox"]),
            SearchTarget::new("Documents", "/user/documents", &["files", "letters"]),
            SearchTarget::new("Profile", "/user/profile", &["account", "my details", "personal info"]),
        ];

        Self { admin, employee }
    }
}
