use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Manager,
    Employee,
}

impl Role {
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_stored_lowercase() {
        assert_eq!(Role::Manager.as_ref(), "manager");
        assert_eq!(Role::from_name("employee"), Some(Role::Employee));
        assert_eq!(Role::from_name("admin"), None);
    }
}
