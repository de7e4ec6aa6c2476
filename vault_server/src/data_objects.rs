use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vault_engine::{
    db_types::{
        AccountBalances,
        FamilyVaultPlan,
        Kobo,
        PaymentOriginator,
        PendingTransaction,
        Reference,
        Role,
        TargetSavingsPlan,
        TransactionStatus,
    },
    WebhookAck,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//--------------------------------------        Money        ---------------------------------------------------------
/// An amount as the client sees it: the exact kobo value, the whole naira (truncated), and a display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub kobo: Kobo,
    pub naira: i64,
    pub display: String,
}

impl From<Kobo> for Amount {
    fn from(kobo: Kobo) -> Self {
        Self { kobo, naira: kobo.naira(), display: kobo.to_string() }
    }
}

//--------------------------------------      Sessions       ---------------------------------------------------------
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub session_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user_id: i64,
    pub role: Role,
    pub session_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUserResponse {
    pub user_id: i64,
    pub message: String,
}

//--------------------------------------      Balances       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancesResponse {
    pub user_id: i64,
    pub savings: Amount,
    pub loans: Amount,
    pub investment: Amount,
}

impl From<AccountBalances> for BalancesResponse {
    fn from(b: AccountBalances) -> Self {
        Self { user_id: b.user_id, savings: b.savings.into(), loans: b.loans.into(), investment: b.investment.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionView {
    pub reference: Reference,
    pub originator: PaymentOriginator,
    pub plan_id: i64,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub credited: Option<Amount>,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl From<PendingTransaction> for TransactionView {
    fn from(tx: PendingTransaction) -> Self {
        Self {
            reference: tx.reference,
            originator: tx.originator,
            plan_id: tx.plan_id,
            amount: tx.amount.into(),
            status: tx.verification_status,
            credited: tx.credited_amount.map(Amount::from),
            created_at: tx.created_at,
            verified_at: tx.verified_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyVaultPlanView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub balance: Amount,
    pub number_of_members: i64,
    pub is_creator: bool,
}

impl FamilyVaultPlanView {
    pub fn for_user(plan: FamilyVaultPlan, user_id: i64) -> Self {
        Self {
            id: plan.id,
            name: plan.name,
            description: plan.description,
            balance: plan.balance.into(),
            number_of_members: plan.number_of_members,
            is_creator: plan.creator_id == user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSavingsPlanView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub balance: Amount,
    pub goal: Amount,
    pub completion_percentage: u8,
}

impl From<TargetSavingsPlan> for TargetSavingsPlanView {
    fn from(plan: TargetSavingsPlan) -> Self {
        let completion_percentage = plan.completion_percentage();
        Self {
            id: plan.id,
            name: plan.name,
            description: plan.description,
            balance: plan.balance.into(),
            goal: plan.goal.into(),
            completion_percentage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlanResponse {
    pub plan_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMemberRequest {
    pub user_id: i64,
}

//--------------------------------------    Funding intents    -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFundsRequest {
    /// In kobo
    pub amount: Kobo,
    /// Minted by the server if the client doesn't supply one
    #[serde(default)]
    pub reference: Option<Reference>,
}

/// Everything the client needs to open the payment with Paystack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingIntentResponse {
    pub reference: Reference,
    pub originator: PaymentOriginator,
    pub plan_id: i64,
    pub amount: Amount,
    pub paystack_public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    pub outcome: String,
}

impl From<&WebhookAck> for WebhookResponse {
    fn from(ack: &WebhookAck) -> Self {
        Self { status: "ok".into(), outcome: ack.to_string() }
    }
}
