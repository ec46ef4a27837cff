//! `SeaORM` active enums mapped to the `PostgreSQL` enum types.

use ardesk_core::allocation::AppliesTo;
use ardesk_core::invoice::{InvoiceKind as CoreInvoiceKind, InvoiceState as CoreInvoiceState};
use ardesk_core::ledger::OriginKind as CoreOriginKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "origin_kind")]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    #[sea_orm(string_value = "invoice")]
    Invoice,
    #[sea_orm(string_value = "collection")]
    Collection,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    #[sea_orm(string_value = "credit_note")]
    CreditNote,
    #[sea_orm(string_value = "debit_note")]
    DebitNote,
    #[sea_orm(string_value = "prior_balance")]
    PriorBalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invoice_kind")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "on_credit")]
    OnCredit,
    #[sea_orm(string_value = "partial_upfront")]
    PartialUpfront,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invoice_state")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "voided")]
    Voided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "allocation_target")]
#[serde(rename_all = "snake_case")]
pub enum AllocationTarget {
    #[sea_orm(string_value = "invoice")]
    Invoice,
    #[sea_orm(string_value = "unassigned_credit")]
    UnassignedCredit,
    #[sea_orm(string_value = "prior_balance")]
    PriorBalance,
}

impl From<CoreOriginKind> for OriginKind {
    fn from(kind: CoreOriginKind) -> Self {
        match kind {
            CoreOriginKind::Invoice => Self::Invoice,
            CoreOriginKind::Collection => Self::Collection,
            CoreOriginKind::Adjustment => Self::Adjustment,
            CoreOriginKind::CreditNote => Self::CreditNote,
            CoreOriginKind::DebitNote => Self::DebitNote,
            CoreOriginKind::PriorBalance => Self::PriorBalance,
        }
    }
}

impl From<OriginKind> for CoreOriginKind {
    fn from(kind: OriginKind) -> Self {
        match kind {
            OriginKind::Invoice => Self::Invoice,
            OriginKind::Collection => Self::Collection,
            OriginKind::Adjustment => Self::Adjustment,
            OriginKind::CreditNote => Self::CreditNote,
            OriginKind::DebitNote => Self::DebitNote,
            OriginKind::PriorBalance => Self::PriorBalance,
        }
    }
}

impl From<CoreInvoiceKind> for InvoiceKind {
    fn from(kind: CoreInvoiceKind) -> Self {
        match kind {
            CoreInvoiceKind::Cash => Self::Cash,
            CoreInvoiceKind::OnCredit => Self::OnCredit,
            CoreInvoiceKind::PartialUpfront => Self::PartialUpfront,
        }
    }
}

impl From<InvoiceKind> for CoreInvoiceKind {
    fn from(kind: InvoiceKind) -> Self {
        match kind {
            InvoiceKind::Cash => Self::Cash,
            InvoiceKind::OnCredit => Self::OnCredit,
            InvoiceKind::PartialUpfront => Self::PartialUpfront,
        }
    }
}

impl From<CoreInvoiceState> for InvoiceState {
    fn from(state: CoreInvoiceState) -> Self {
        match state {
            CoreInvoiceState::Confirmed => Self::Confirmed,
            CoreInvoiceState::Voided => Self::Voided,
        }
    }
}

impl From<InvoiceState> for CoreInvoiceState {
    fn from(state: InvoiceState) -> Self {
        match state {
            InvoiceState::Confirmed => Self::Confirmed,
            InvoiceState::Voided => Self::Voided,
        }
    }
}

impl From<AppliesTo> for AllocationTarget {
    fn from(target: AppliesTo) -> Self {
        match target {
            AppliesTo::Invoice => Self::Invoice,
            AppliesTo::UnassignedCredit => Self::UnassignedCredit,
            AppliesTo::PriorBalance => Self::PriorBalance,
        }
    }
}

impl From<AllocationTarget> for AppliesTo {
    fn from(target: AllocationTarget) -> Self {
        match target {
            AllocationTarget::Invoice => Self::Invoice,
            AllocationTarget::UnassignedCredit => Self::UnassignedCredit,
            AllocationTarget::PriorBalance => Self::PriorBalance,
        }
    }
}
