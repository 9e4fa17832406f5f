//! Wallet API endpoints.

use api_types::wallet::{
    BalanceVerification, DepositCreated, DepositNew, Direction as ApiDirection,
    TransactionHistory, TransactionHistoryQuery, TransactionKind as ApiKind,
    TransactionStatus as ApiStatus, TransactionView, WalletSummary, WalletView, WithdrawNew,
    WithdrawalCreated,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{
    BankDetails, Direction, Principal, Transaction, TransactionFilter, TransactionKind,
    TransactionStatus, Wallet,
};

use crate::{ServerError, server::ServerState};

fn map_kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::Deposit => ApiKind::Deposit,
        TransactionKind::Withdrawal => ApiKind::Withdrawal,
        TransactionKind::Escrow => ApiKind::Escrow,
        TransactionKind::Release => ApiKind::Release,
        TransactionKind::Refund => ApiKind::Refund,
        TransactionKind::Fee => ApiKind::Fee,
        TransactionKind::WithdrawalFee => ApiKind::WithdrawalFee,
    }
}

fn unmap_kind(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::Deposit => TransactionKind::Deposit,
        ApiKind::Withdrawal => TransactionKind::Withdrawal,
        ApiKind::Escrow => TransactionKind::Escrow,
        ApiKind::Release => TransactionKind::Release,
        ApiKind::Refund => TransactionKind::Refund,
        ApiKind::Fee => TransactionKind::Fee,
        ApiKind::WithdrawalFee => TransactionKind::WithdrawalFee,
    }
}

fn map_status(status: TransactionStatus) -> ApiStatus {
    match status {
        TransactionStatus::Pending => ApiStatus::Pending,
        TransactionStatus::Completed => ApiStatus::Completed,
        TransactionStatus::Failed => ApiStatus::Failed,
        TransactionStatus::Cancelled => ApiStatus::Cancelled,
    }
}

fn unmap_status(status: ApiStatus) -> TransactionStatus {
    match status {
        ApiStatus::Pending => TransactionStatus::Pending,
        ApiStatus::Completed => TransactionStatus::Completed,
        ApiStatus::Failed => TransactionStatus::Failed,
        ApiStatus::Cancelled => TransactionStatus::Cancelled,
    }
}

fn wallet_view(wallet: Wallet) -> WalletView {
    WalletView {
        id: wallet.id,
        user_id: wallet.user_id,
        balance_minor: wallet.balance,
        pending_balance_minor: wallet.pending_balance,
        total_earned_minor: wallet.total_earned,
        total_spent_minor: wallet.total_spent,
        currency: wallet.currency,
        last_transaction_at: wallet.last_transaction_at,
        last_balance_verification: wallet.last_balance_verification,
    }
}

fn transaction_view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: map_kind(tx.kind),
        direction: match tx.direction {
            Direction::Debit => ApiDirection::Debit,
            Direction::Credit => ApiDirection::Credit,
        },
        status: map_status(tx.status),
        amount_minor: tx.amount,
        fee_minor: tx.fee,
        reference: tx.reference,
        description: tx.description,
        order_id: tx.order_id,
        gig_id: tx.gig_id,
        bid_id: tx.bid_id,
        created_at: tx.created_at,
        updated_at: tx.updated_at,
    }
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
) -> Result<Json<WalletView>, ServerError> {
    let wallet = state.engine.get_wallet(&principal.user_id).await?;
    Ok(Json(wallet_view(wallet)))
}

pub async fn summary(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
) -> Result<Json<WalletSummary>, ServerError> {
    let summary = state.engine.wallet_summary(&principal.user_id).await?;
    Ok(Json(WalletSummary {
        wallet: wallet_view(summary.wallet),
        transaction_count: summary.transaction_count,
        pending_withdrawals_minor: summary.pending_withdrawals,
        recent_transactions: summary
            .recent_transactions
            .into_iter()
            .map(transaction_view)
            .collect(),
    }))
}

pub async fn history(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionHistoryQuery>,
) -> Result<Json<TransactionHistory>, ServerError> {
    let filter = TransactionFilter {
        kind: query.kind.map(unmap_kind),
        status: query.status.map(unmap_status),
        from: query.from,
        to: query.to,
        order_id: query.order_id,
        limit: query.limit,
        offset: query.offset,
    };
    let page = state
        .engine
        .transaction_history(&principal.user_id, filter)
        .await?;

    Ok(Json(TransactionHistory {
        transactions: page.transactions.into_iter().map(transaction_view).collect(),
        total: page.total,
        limit: page.limit,
        offset: page.offset,
    }))
}

pub async fn deposit(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Json(payload): Json<DepositNew>,
) -> Result<(StatusCode, Json<DepositCreated>), ServerError> {
    let session = state
        .engine
        .initialize_deposit(&principal.user_id, &payload.email, payload.amount_minor)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DepositCreated {
            reference: session.reference,
            authorization_url: session.authorization_url,
            access_code: session.access_code,
            amount_minor: session.amount,
        }),
    ))
}

pub async fn verify_deposit(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Path(reference): Path<String>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state
        .engine
        .verify_deposit(&principal.user_id, &reference)
        .await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn withdraw(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
    Json(payload): Json<WithdrawNew>,
) -> Result<(StatusCode, Json<WithdrawalCreated>), ServerError> {
    let bank = BankDetails {
        account_number: payload.account_number,
        bank_code: payload.bank_code,
        account_name: payload.account_name,
    };
    let receipt = state
        .engine
        .withdraw(&principal.user_id, payload.amount_minor, bank)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(WithdrawalCreated {
            reference: receipt.reference,
            amount_minor: receipt.amount,
            fee_minor: receipt.fee,
            status: map_status(receipt.withdrawal.status),
        }),
    ))
}

pub async fn verify_balance(
    Extension(principal): Extension<Principal>,
    State(state): State<ServerState>,
) -> Result<Json<BalanceVerification>, ServerError> {
    let report = state.engine.verify_balance(&principal.user_id).await?;
    Ok(Json(BalanceVerification {
        wallet_id: report.wallet_id,
        calculated_balance_minor: report.calculated_balance,
        calculated_pending_balance_minor: report.calculated_pending_balance,
        db_balance_minor: report.db_balance,
        db_pending_balance_minor: report.db_pending_balance,
        balance_discrepancy_minor: report.discrepancy.balance,
        pending_discrepancy_minor: report.discrepancy.pending_balance,
        corrected: report.corrected,
        verified_at: report.verified_at,
    }))
}
