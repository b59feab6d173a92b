use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use dice::{
    Category, Color, NewQuickRoll, QuickRollPatch, Roll, Sort,
    payloads::{
        ClearResponse, CreateQuickRollBody, HealthResponse, HistoryResponse, MessageResponse,
        QuickRollEnvelope, QuickRollList, SaveRollBody, UpdateQuickRollBody,
    },
};
use serde::Deserialize;

use crate::{
    error::AppError,
    history::DEFAULT_HISTORY_LIMIT,
    quick_rolls::ListOptions,
    state::AppState,
    utils::{MAX_LIMIT, clamp_limit, present},
};

type SharedState = State<Arc<AppState>>;
type QueryResult<T> = Result<Query<T>, QueryRejection>;
type JsonResult<T> = Result<Json<T>, JsonRejection>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerParams {
    user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    user_id: Option<String>,
    category: Option<String>,
    limit: Option<String>,
    sort: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    user_id: Option<String>,
    limit: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearParams {
    user_id: Option<String>,
    all: Option<String>,
}

fn filled(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub async fn list_quick_rolls(
    State(state): SharedState,
    params: QueryResult<ListParams>,
) -> Result<Json<QuickRollList>, AppError> {
    let Query(params) = params?;

    let category = present(params.category.as_deref())
        .map(str::parse::<Category>)
        .transpose()
        .map_err(AppError::InvalidCategory)?;

    let sort = present(params.sort.as_deref())
        .map(str::parse::<Sort>)
        .transpose()
        .map_err(AppError::InvalidSortField)?
        .unwrap_or_default();

    let options = ListOptions {
        category,
        limit: clamp_limit(params.limit.as_deref(), MAX_LIMIT),
        sort,
    };

    let data = state
        .quick_rolls
        .list(params.user_id.as_deref(), &options)
        .await?;

    Ok(Json(QuickRollList {
        success: true,
        count: data.len(),
        data,
    }))
}

pub async fn create_quick_roll(
    State(state): SharedState,
    params: QueryResult<OwnerParams>,
    payload: JsonResult<CreateQuickRollBody>,
) -> Result<(StatusCode, Json<QuickRollEnvelope>), AppError> {
    let Query(params) = params?;
    let Json(body) = payload?;

    let (Some(name), Some(notation), Some(category), Some(color)) = (
        filled(body.name),
        filled(body.notation),
        filled(body.category),
        filled(body.color),
    ) else {
        return Err(AppError::MissingFields("name, notation, category, color"));
    };

    let fields = NewQuickRoll {
        name,
        notation,
        color: Some(color.parse::<Color>()?),
        category: Some(category.parse::<Category>()?),
    };

    let quick_roll = state
        .quick_rolls
        .create(params.user_id.as_deref(), fields)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(QuickRollEnvelope {
            success: true,
            data: quick_roll,
            message: "Quick roll created".to_string(),
        }),
    ))
}

pub async fn update_quick_roll(
    State(state): SharedState,
    Path(id): Path<String>,
    params: QueryResult<OwnerParams>,
    payload: JsonResult<UpdateQuickRollBody>,
) -> Result<Json<QuickRollEnvelope>, AppError> {
    let Query(params) = params?;
    let Json(body) = payload?;

    let patch = QuickRollPatch {
        name: body.name,
        notation: body.notation,
        color: body.color.as_deref().map(str::parse::<Color>).transpose()?,
        category: body.category.as_deref().map(str::parse::<Category>).transpose()?,
        order: body.order,
    };

    let quick_roll = state
        .quick_rolls
        .update(&id, params.user_id.as_deref(), patch)
        .await?;

    Ok(Json(QuickRollEnvelope {
        success: true,
        data: quick_roll,
        message: "Quick roll updated".to_string(),
    }))
}

pub async fn delete_quick_roll(
    State(state): SharedState,
    Path(id): Path<String>,
    params: QueryResult<OwnerParams>,
) -> Result<Json<MessageResponse>, AppError> {
    let Query(params) = params?;

    state
        .quick_rolls
        .delete(&id, params.user_id.as_deref())
        .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Quick roll deleted".to_string(),
    }))
}

pub async fn roll_history(
    State(state): SharedState,
    params: QueryResult<HistoryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(params) = params?;
    let limit = clamp_limit(params.limit.as_deref(), DEFAULT_HISTORY_LIMIT);

    let (rolls, owner) = state
        .history
        .list(params.user_id.as_deref(), limit)
        .await?;

    Ok(Json(HistoryResponse {
        success: true,
        count: rolls.len(),
        rolamentos: rolls,
        filter: owner.map_or_else(|| "all".to_string(), |owner| format!("userId: {owner}")),
    }))
}

pub async fn save_roll(
    State(state): SharedState,
    payload: JsonResult<SaveRollBody>,
) -> Result<(StatusCode, Json<Roll>), AppError> {
    let Json(body) = payload?;

    let roll = state
        .history
        .save(
            body.dados.as_deref(),
            body.resultados.as_deref(),
            body.total,
            body.user_id.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(roll)))
}

pub async fn clear_rolls(
    State(state): SharedState,
    params: QueryResult<ClearParams>,
) -> Result<Json<ClearResponse>, AppError> {
    let Query(params) = params?;
    let all = matches!(params.all.as_deref(), Some("true" | "1"));

    let deleted_count = state
        .history
        .clear(params.user_id.as_deref(), all)
        .await?;

    Ok(Json(ClearResponse {
        success: true,
        message: format!("History cleared, {deleted_count} rolls removed"),
        deleted_count,
    }))
}

pub async fn health(State(state): SharedState) -> Result<Json<HealthResponse>, AppError> {
    state.store.ping().await?;

    Ok(Json(HealthResponse {
        success: true,
        store: "reachable".to_string(),
    }))
}
