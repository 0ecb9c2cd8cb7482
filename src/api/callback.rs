use axum::extract::{Form, OriginalUri, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;

use crate::api::AppState;
use crate::error::GatewayResult;
use crate::payments::traits::{AtomicScope, NotificationHandler};
use crate::payments::types::ParameterSet;
use crate::payments::wire::XML_CONTENT_TYPE;

/// Result notification delivered as a form POST.
pub async fn result_form<S, H>(
    State(state): State<AppState<S, H>>,
    OriginalUri(uri): OriginalUri,
    Form(fields): Form<HashMap<String, String>>,
) -> GatewayResult<Response>
where
    S: AtomicScope,
    H: NotificationHandler<S::Transaction>,
{
    process(state, uri.path(), fields).await
}

/// Result notification delivered as a GET query string.
pub async fn result_query<S, H>(
    State(state): State<AppState<S, H>>,
    OriginalUri(uri): OriginalUri,
    Query(fields): Query<HashMap<String, String>>,
) -> GatewayResult<Response>
where
    S: AtomicScope,
    H: NotificationHandler<S::Transaction>,
{
    process(state, uri.path(), fields).await
}

async fn process<S, H>(
    state: AppState<S, H>,
    request_path: &str,
    fields: HashMap<String, String>,
) -> GatewayResult<Response>
where
    S: AtomicScope,
    H: NotificationHandler<S::Transaction>,
{
    // The configured result URL names the signed endpoint; fall back to the path hit.
    let callback_url = state
        .processor
        .config()
        .callbacks()
        .result
        .clone()
        .unwrap_or_else(|| request_path.to_string());

    let response = state
        .processor
        .process_notification(ParameterSet::from(fields), &callback_url, state.handler.as_ref())
        .await?;
    let xml = response.to_xml()?;

    Ok(([(header::CONTENT_TYPE, XML_CONTENT_TYPE)], xml).into_response())
}
