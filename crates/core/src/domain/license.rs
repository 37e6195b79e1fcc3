use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseType {
    Enterprise,
    Cascade,
}

impl LicenseType {
    pub const ALL: [LicenseType; 2] = [LicenseType::Enterprise, LicenseType::Cascade];

    /// Annual price per seat in whole USD.
    pub fn unit_price(self) -> u64 {
        match self {
            Self::Enterprise => 1_000,
            Self::Cascade => 2_000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Enterprise => "Enterprise License (Annual)",
            Self::Cascade => "Cascade License (Annual)",
        }
    }
}

/// Pair of seat counts for a team.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LicenseMix {
    pub enterprise: u32,
    pub cascade: u32,
}

impl LicenseMix {
    pub fn new(enterprise: u32, cascade: u32) -> Self {
        Self { enterprise, cascade }
    }

    pub fn quantity(&self, license: LicenseType) -> u32 {
        match license {
            LicenseType::Enterprise => self.enterprise,
            LicenseType::Cascade => self.cascade,
        }
    }

    /// Seats across both license types, widened so large entries cannot overflow.
    pub fn seats(&self) -> u64 {
        u64::from(self.enterprise) + u64::from(self.cascade)
    }
}
