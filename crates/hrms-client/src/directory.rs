//! Employee directory used to resolve names and avatars of chat peers.
//!
//! Reference data only: refreshed independently of the conversation list and
//! joined against it by user id.

use std::collections::HashMap;

use hrms_shared::models::Employee;
use hrms_shared::types::UserId;

#[derive(Debug, Clone, Default)]
pub struct Directory {
    by_user: HashMap<UserId, Employee>,
}

impl Directory {
    pub fn new(employees: Vec<Employee>) -> Self {
        Self {
            by_user: employees
                .into_iter()
                .map(|e| (e.user_id.clone(), e))
                .collect(),
        }
    }

    pub fn get(&self, user: &UserId) -> Option<&Employee> {
        self.by_user.get(user)
    }

    /// Full name from the directory, if it has a non-empty one.
    pub fn full_name(&self, user: &UserId) -> Option<String> {
        self.get(user)
            .map(Employee::full_name)
            .filter(|name| !name.is_empty())
    }

    pub fn avatar_url(&self, user: &UserId) -> Option<&str> {
        self.get(user).and_then(|e| e.avatar_url.as_deref())
    }

    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }
}
