use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use super::AppState;
use crate::error::{PawFinderError, Result};
use crate::models::{NewOrder, OrderCreated, OrderList};

pub async fn create_order(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewOrder>, JsonRejection>,
) -> Result<Json<OrderCreated>> {
    let Json(new) = payload.map_err(|e| PawFinderError::ClientInput(e.body_text()))?;
    let order = state.orders.create(new).await?;
    Ok(Json(OrderCreated {
        ok: true,
        order_id: order.id,
        order,
    }))
}

pub async fn list_orders(State(state): State<AppState>) -> Json<OrderList> {
    let orders = state.orders.list().await;
    Json(OrderList {
        count: orders.len(),
        orders,
    })
}
