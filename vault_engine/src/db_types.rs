use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;
pub use vault_common::Kobo;

/// Solo savings have no plan of their own. Pending transactions for them carry this value in the plan id column.
pub const PLAN_SENTINEL_ID: i64 = 99_909_990;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Basic,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Basic => write!(f, "basic"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------   PaymentOriginator   -------------------------------------------------------
/// The kind of account a funding attempt is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOriginator {
    SoloSavings,
    FamilySavings,
    TargetSavings,
}

impl Display for PaymentOriginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentOriginator::SoloSavings => write!(f, "SOLO_SAVINGS"),
            PaymentOriginator::FamilySavings => write!(f, "FAMILY_SAVINGS"),
            PaymentOriginator::TargetSavings => write!(f, "TARGET_SAVINGS"),
        }
    }
}

impl FromStr for PaymentOriginator {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SOLO_SAVINGS" => Ok(Self::SoloSavings),
            "FAMILY_SAVINGS" => Ok(Self::FamilySavings),
            "TARGET_SAVINGS" => Ok(Self::TargetSavings),
            s => Err(ConversionError(format!("Invalid payment originator: {s}"))),
        }
    }
}

impl TryFrom<String> for PaymentOriginator {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------   TransactionStatus   -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// The funding intent has been recorded, and we are waiting on the payment processor.
    Pending,
    /// The processor confirmed the payment and the amount was credited.
    Successful,
    /// The processor reported a failed payment. Nothing was credited.
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "PENDING"),
            TransactionStatus::Successful => write!(f, "SUCCESSFUL"),
            TransactionStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SUCCESSFUL" => Ok(Self::Successful),
            "FAILED" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid transaction status: {s}"))),
        }
    }
}

//--------------------------------------      Reference      ---------------------------------------------------------
/// The reference number correlating a funding intent with the processor's eventual webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference(Uuid);

impl Reference {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for Reference {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for Reference {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|e| ConversionError(format!("Invalid reference '{s}': {e}")))
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

//--------------------------------------  PendingTransaction  --------------------------------------------------------
/// One attempted funding of an account. Rows are never deleted; they form the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub id: i64,
    pub user_id: i64,
    pub plan_id: i64,
    pub reference: Reference,
    pub originator: PaymentOriginator,
    /// The amount the user said they intended to pay
    pub amount: Kobo,
    pub verification_status: TransactionStatus,
    pub fulfillment_status: TransactionStatus,
    /// The amount the processor reported and that was applied to the balance, once successful
    pub credited_amount: Option<Kobo>,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPendingTransaction {
    pub user_id: i64,
    pub plan_id: i64,
    pub reference: Reference,
    pub originator: PaymentOriginator,
    pub amount: Kobo,
}

impl NewPendingTransaction {
    pub fn solo_savings(user_id: i64, reference: Reference, amount: Kobo) -> Self {
        Self { user_id, plan_id: PLAN_SENTINEL_ID, reference, originator: PaymentOriginator::SoloSavings, amount }
    }

    pub fn family_savings(user_id: i64, plan_id: i64, reference: Reference, amount: Kobo) -> Self {
        Self { user_id, plan_id, reference, originator: PaymentOriginator::FamilySavings, amount }
    }

    pub fn target_savings(user_id: i64, plan_id: i64, reference: Reference, amount: Kobo) -> Self {
        Self { user_id, plan_id, reference, originator: PaymentOriginator::TargetSavings, amount }
    }
}

//--------------------------------------   AccountBalances   ---------------------------------------------------------
/// A user's dashboard balances. Missing accounts read as zero, never as null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AccountBalances {
    pub user_id: i64,
    pub savings: Kobo,
    pub loans: Kobo,
    pub investment: Kobo,
}

//--------------------------------------    Savings plans    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FamilyVaultPlan {
    pub id: i64,
    pub creator_id: i64,
    pub name: String,
    pub description: String,
    pub balance: Kobo,
    pub number_of_members: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TargetSavingsPlan {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub balance: Kobo,
    pub goal: Kobo,
    pub created_at: DateTime<Utc>,
}

impl TargetSavingsPlan {
    /// How far along the plan is towards its goal, in whole percent, capped at 100.
    pub fn completion_percentage(&self) -> u8 {
        if !self.goal.is_positive() {
            return 100;
        }
        let pct = self.balance.value().max(0).saturating_mul(100) / self.goal.value();
        pct.min(100) as u8
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSavingsPlan {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Only meaningful for target savings plans
    #[serde(default)]
    pub goal: Option<Kobo>,
}

//--------------------------------------     Credentials     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub user_id: i64,
    pub email: String,
    /// argon2 PHC string
    pub password_hash: String,
    pub is_admin: bool,
    pub email_verified: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}
