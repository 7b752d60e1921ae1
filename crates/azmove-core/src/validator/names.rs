//! Resource naming rules

use crate::error::ValidationFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Charset {
    AlnumDashUnderscore,
    AlnumDashUnderscorePeriod,
    LowerAlnum,
}

impl Charset {
    fn allows(self, c: char) -> bool {
        match self {
            Self::AlnumDashUnderscore => c.is_ascii_alphanumeric() || c == '-' || c == '_',
            Self::AlnumDashUnderscorePeriod => {
                c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
            }
            Self::LowerAlnum => c.is_ascii_lowercase() || c.is_ascii_digit(),
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::AlnumDashUnderscore => "alphanumeric, underscore, and hyphen",
            Self::AlnumDashUnderscorePeriod => "alphanumeric, dash, underscore, and period",
            Self::LowerAlnum => "lower-case alphanumeric characters",
        }
    }
}

/// Length bounds plus allowed characters for one kind of name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameRule {
    type_name: &'static str,
    min: usize,
    max: usize,
    charset: Charset,
}

impl NameRule {
    const fn new(type_name: &'static str, min: usize, max: usize, charset: Charset) -> Self {
        Self {
            type_name,
            min,
            max,
            charset,
        }
    }

    /// Check `name` against this rule
    ///
    /// # Errors
    /// Returns a length failure first, then a character-class failure.
    pub fn validate(&self, name: &str) -> Result<(), ValidationFailure> {
        let len = name.chars().count();
        if len < self.min || len > self.max {
            return Err(ValidationFailure::NameLength {
                type_name: self.type_name,
                min: self.min,
                max: self.max,
            });
        }
        if !name.chars().all(|c| self.charset.allows(c)) {
            return Err(ValidationFailure::NameCharacters {
                type_name: self.type_name,
                valid_chars: self.charset.description(),
            });
        }
        Ok(())
    }
}

pub const RESOURCE_GROUP: NameRule = NameRule::new("Resource group", 1, 64, Charset::AlnumDashUnderscore);
pub const AVAILABILITY_SET: NameRule =
    NameRule::new("Availability set", 1, 64, Charset::AlnumDashUnderscore);
pub const VIRTUAL_MACHINE: NameRule =
    NameRule::new("Virtual machine", 1, 64, Charset::AlnumDashUnderscore);
pub const STORAGE_ACCOUNT: NameRule = NameRule::new("Storage account", 3, 24, Charset::LowerAlnum);
pub const VIRTUAL_NETWORK: NameRule =
    NameRule::new("Virtual network", 2, 64, Charset::AlnumDashUnderscorePeriod);
pub const NETWORK_INTERFACE: NameRule =
    NameRule::new("Network interface", 1, 80, Charset::AlnumDashUnderscorePeriod);
pub const NETWORK_SECURITY_GROUP: NameRule =
    NameRule::new("Network security group", 1, 80, Charset::AlnumDashUnderscorePeriod);
pub const PUBLIC_IP_ADDRESS: NameRule =
    NameRule::new("Public IP Address", 1, 80, Charset::AlnumDashUnderscorePeriod);
pub const LOAD_BALANCER: NameRule =
    NameRule::new("Load balancer", 1, 80, Charset::AlnumDashUnderscorePeriod);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_account_too_short() {
        assert_eq!(
            STORAGE_ACCOUNT.validate("ab"),
            Err(ValidationFailure::NameLength {
                type_name: "Storage account",
                min: 3,
                max: 24
            })
        );
    }

    #[test]
    fn storage_account_rejects_uppercase() {
        let err = STORAGE_ACCOUNT.validate("abcDEF").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Storage account name can only contain lower-case alphanumeric characters"
        );
    }

    #[test]
    fn virtual_machine_accepts_dash_and_underscore() {
        assert!(VIRTUAL_MACHINE.validate("my-vm_01").is_ok());
        assert!(VIRTUAL_MACHINE.validate("my.vm").is_err());
    }

    #[test]
    fn network_names_allow_period() {
        assert!(VIRTUAL_NETWORK.validate("vnet.prod-01").is_ok());
        assert!(VIRTUAL_NETWORK.validate("v").is_err());
        assert!(LOAD_BALANCER.validate(&"l".repeat(80)).is_ok());
        assert!(LOAD_BALANCER.validate(&"l".repeat(81)).is_err());
    }

    #[test]
    fn resource_group_bounds() {
        assert!(RESOURCE_GROUP.validate("").is_err());
        assert!(RESOURCE_GROUP.validate(&"g".repeat(64)).is_ok());
        assert!(RESOURCE_GROUP.validate("rg with space").is_err());
    }
}
