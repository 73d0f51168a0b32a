use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Role string supplied by the auth collaborator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cartera,
    Logistica,
    Empaque,
    Reparto,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cartera => "cartera",
            Role::Logistica => "logistica",
            Role::Empaque => "empaque",
            Role::Reparto => "reparto",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cartera" => Ok(Role::Cartera),
            "logistica" | "logística" => Ok(Role::Logistica),
            "empaque" => Ok(Role::Empaque),
            "reparto" => Ok(Role::Reparto),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

/// Opaque caller identity. Trusted as given; authentication happens upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }
}

/// Actions an operation may require
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Move a paid order into accounts review
    AdvancePayment,
    /// Approve or reject the wallet review
    ReviewWallet,
    /// Route orders through logistics and into the packaging queue
    RouteLogistics,
    /// Start packaging, scan items, close packaging
    PackItems,
    /// Send out and confirm delivery
    Dispatch,
    Cancel,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Role → capability grants, consulted once per operation
#[derive(Debug, Clone)]
pub struct CapabilityTable {
    grants: HashMap<Role, HashSet<Capability>>,
}

impl CapabilityTable {
    pub fn empty() -> Self {
        Self {
            grants: HashMap::new(),
        }
    }

    /// The grants the warehouse runs with
    pub fn standard() -> Self {
        use Capability::*;

        Self::empty()
            .grant(Role::Cartera, &[AdvancePayment, ReviewWallet, Cancel])
            .grant(Role::Logistica, &[RouteLogistics, Dispatch, Cancel])
            .grant(Role::Empaque, &[PackItems])
            .grant(Role::Reparto, &[Dispatch])
            .grant(
                Role::Admin,
                &[AdvancePayment, ReviewWallet, RouteLogistics, PackItems, Dispatch, Cancel],
            )
    }

    pub fn grant(mut self, role: Role, capabilities: &[Capability]) -> Self {
        self.grants
            .entry(role)
            .or_default()
            .extend(capabilities.iter().copied());
        self
    }

    pub fn allows(&self, role: Role, capability: Capability) -> bool {
        self.grants
            .get(&role)
            .is_some_and(|caps| caps.contains(&capability))
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::standard()
    }
}
