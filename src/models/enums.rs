use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form is also the wire form, so serde renames each variant to it.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(StaffRole {
    Admin => "ADMIN",
    RegisteredNurse => "RN",
    PracticalNurse => "LPN",
    HomeHealthAide => "HHA",
    PhysicalTherapist => "PT",
    OccupationalTherapist => "OT",
    SpeechTherapist => "ST",
    SocialWorker => "MSW",
    QaReviewer => "QA_REVIEWER",
});

str_enum!(StaffStatus {
    Active => "ACTIVE",
    Inactive => "INACTIVE",
    OnLeave => "ON_LEAVE",
    Terminated => "TERMINATED",
});

str_enum!(CredentialStatus {
    Active => "ACTIVE",
    ExpiringSoon => "EXPIRING_SOON",
    Expired => "EXPIRED",
    PendingVerification => "PENDING_VERIFICATION",
    Revoked => "REVOKED",
});

impl CredentialStatus {
    /// Statuses set by an administrator rather than derived from dates.
    pub fn is_manual(&self) -> bool {
        matches!(self, Self::PendingVerification | Self::Revoked)
    }
}

str_enum!(FormType {
    OasisSoc => "OASIS_SOC",
    OasisRoc => "OASIS_ROC",
    OasisRecert => "OASIS_RECERT",
    OasisDischarge => "OASIS_DISCHARGE",
    OasisTransfer => "OASIS_TRANSFER",
    PlanOfCare485 => "PLAN_OF_CARE_485",
    SnVisitNote => "SN_VISIT_NOTE",
    ServiceOrder => "SERVICE_ORDER",
});

str_enum!(QaStatus {
    Draft => "DRAFT",
    SentToQa => "SENT_TO_QA",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

// The fixed set of outcomes a reviewer can choose.
str_enum!(QaDecision {
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

impl From<QaDecision> for QaStatus {
    fn from(decision: QaDecision) -> Self {
        match decision {
            QaDecision::Approved => QaStatus::Approved,
            QaDecision::Rejected => QaStatus::Rejected,
        }
    }
}
