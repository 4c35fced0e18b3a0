use serde::Deserialize;

use findermeister_auth::BanSeverity;
use findermeister_infra::projections::{ContractReadModel, UserReadModel};
use findermeister_support::TicketSeverity;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct PostFindRequest {
    pub title: String,
    pub description: String,
    pub budget: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFindRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitProposalRequest {
    pub message: String,
    pub price: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateProposalRequest {
    pub find_id: String,
    pub message: String,
    pub price: u64,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseTokensRequest {
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct OpenContractRequest {
    pub proposal_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitWorkRequest {
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct StartThreadRequest {
    pub find_id: String,
    /// Required when the caller is the client; a finder always converses as
    /// themselves.
    pub finder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenTicketRequest {
    pub subject: String,
    pub severity: TicketSeverity,
}

#[derive(Debug, Deserialize)]
pub struct TicketReplyRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct BanUserRequest {
    pub reason: String,
    pub severity: BanSeverity,
}

#[derive(Debug, Deserialize)]
pub struct ReviewVerificationRequest {
    pub approve: bool,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn user_to_json(rm: UserReadModel) -> serde_json::Value {
    serde_json::json!({
        "user_id": rm.user_id.to_string(),
        "email": rm.email,
        "display_name": rm.display_name,
        "role": rm.role,
        "banned": rm.ban.is_some(),
        "ban": rm.ban,
        "verification": rm.verification,
        "created_at": rm.created_at,
    })
}

pub fn contract_to_json(rm: ContractReadModel) -> serde_json::Value {
    let steps = rm.escrow_steps();
    serde_json::json!({
        "contract_id": rm.contract_id.to_string(),
        "find_id": rm.find_id.to_string(),
        "client_id": rm.client_id.to_string(),
        "finder_id": rm.finder_id.to_string(),
        "amount": rm.amount,
        "status": rm.status,
        "has_submission": rm.has_submission,
        "is_completed": rm.is_completed,
        "escrow_steps": steps,
        "opened_at": rm.opened_at,
        "updated_at": rm.updated_at,
    })
}
