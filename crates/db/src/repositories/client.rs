//! Client and seller lookups shared by the receivables repositories.
//!
//! Clients and sellers are owned by the surrounding back-office; the ledger
//! only needs to know they exist and, for legacy debt, to serialise writers
//! on the client row.

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, QuerySelect};

use ardesk_shared::types::{ClientId, SellerId};

use crate::entities::{clients, sellers};

/// Reads a client without locking.
pub(crate) async fn find_client<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
) -> Result<Option<clients::Model>, DbErr> {
    clients::Entity::find_by_id(client_id.into_inner())
        .one(conn)
        .await
}

/// Locks a client row with `SELECT ... FOR UPDATE`.
///
/// Taken before any prior-balance ceiling check or legacy debt write so that
/// concurrent writers for the same client serialise.
pub(crate) async fn lock_client<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
) -> Result<Option<clients::Model>, DbErr> {
    clients::Entity::find_by_id(client_id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
}

/// Returns true when the seller exists.
pub(crate) async fn seller_exists<C: ConnectionTrait>(
    conn: &C,
    seller_id: SellerId,
) -> Result<bool, DbErr> {
    Ok(sellers::Entity::find_by_id(seller_id.into_inner())
        .one(conn)
        .await?
        .is_some())
}
