use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{Method, Uri};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::core::session::Session;
use crate::server::delegate::delegate;
use crate::server::error::ApiError;
use crate::server::validate;

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    cutoff: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

fn query<T>(extracted: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    extracted
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

fn path(extracted: Result<Path<String>, PathRejection>) -> Result<String, ApiError> {
    extracted
        .map(|Path(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

pub async fn status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Budget API is running",
    }))
}

pub async fn list_budgets(State(session): State<Arc<Session>>) -> ApiResult {
    Ok(Json(delegate(&session, |c| c.list_budgets()).await?))
}

pub async fn list_budget_months(State(session): State<Arc<Session>>) -> ApiResult {
    Ok(Json(delegate(&session, |c| c.list_budget_months()).await?))
}

pub async fn get_budget_month(
    State(session): State<Arc<Session>>,
    month: Result<Path<String>, PathRejection>,
) -> ApiResult {
    let month = path(month)?;
    let month = validate::month(&month)?;
    Ok(Json(delegate(&session, |c| c.get_budget_month(month)).await?))
}

pub async fn list_accounts(State(session): State<Arc<Session>>) -> ApiResult {
    Ok(Json(delegate(&session, |c| c.list_accounts()).await?))
}

pub async fn get_account_balance(
    State(session): State<Arc<Session>>,
    account_id: Result<Path<String>, PathRejection>,
    params: Result<Query<BalanceQuery>, QueryRejection>,
) -> ApiResult {
    let account_id = path(account_id)?;
    let params = query(params)?;
    let cutoff = params
        .cutoff
        .as_deref()
        .map(|cutoff| validate::date("cutoff", cutoff))
        .transpose()?;

    let balance = delegate(&session, |c| c.get_account_balance(&account_id, cutoff)).await?;
    Ok(Json(json!({ "accountId": account_id, "balance": balance })))
}

pub async fn list_transactions(
    State(session): State<Arc<Session>>,
    account_id: Result<Path<String>, PathRejection>,
    params: Result<Query<TransactionsQuery>, QueryRejection>,
) -> ApiResult {
    let account_id = path(account_id)?;
    let params = query(params)?;
    let (start, end) =
        validate::date_range(params.start_date.as_deref(), params.end_date.as_deref())?;

    let transactions = delegate(&session, |c| {
        c.list_transactions(&account_id, start, end)
    })
    .await?;
    Ok(Json(transactions))
}

pub async fn list_categories(State(session): State<Arc<Session>>) -> ApiResult {
    Ok(Json(delegate(&session, |c| c.list_categories()).await?))
}

pub async fn list_category_groups(State(session): State<Arc<Session>>) -> ApiResult {
    Ok(Json(delegate(&session, |c| c.list_category_groups()).await?))
}

pub async fn list_payees(State(session): State<Arc<Session>>) -> ApiResult {
    Ok(Json(delegate(&session, |c| c.list_payees()).await?))
}

pub async fn list_rules(State(session): State<Arc<Session>>) -> ApiResult {
    Ok(Json(delegate(&session, |c| c.list_rules()).await?))
}

pub async fn list_payee_rules(
    State(session): State<Arc<Session>>,
    payee_id: Result<Path<String>, PathRejection>,
) -> ApiResult {
    let payee_id = path(payee_id)?;
    Ok(Json(delegate(&session, |c| c.list_payee_rules(&payee_id)).await?))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method.to_string())
}
