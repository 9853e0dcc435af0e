use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::medicine_inventory::{
    create_adjustment, create_dispense, create_item, create_receipt, delete_item,
    list_adjustments, list_dispenses, list_items, list_receipts, near_expiry_batches,
    update_item, update_receipt_status,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/medicineInventory/item", post(create_item))
        .route("/medicineInventory/item", get(list_items))
        .route("/medicineInventory/item/{id}", put(update_item))
        .route("/medicineInventory/item/{id}", delete(delete_item))
        .route("/medicineInventory/in", post(create_receipt))
        .route("/medicineInventory/in", get(list_receipts))
        .route("/medicineInventory/in/{id}/status", put(update_receipt_status))
        .route("/medicineInventory/adjustment", post(create_adjustment))
        .route("/medicineInventory/adjustment", get(list_adjustments))
        .route("/medicineInventory/dispense", post(create_dispense))
        .route("/medicineInventory/dispense", get(list_dispenses))
        .route("/medicineInventory/batchQuantity", get(near_expiry_batches))
        .layer(middleware::from_fn(require_auth))
}
