use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::inventory::ledger::AdjustmentKind;

// ==================== Item DTOs ====================

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub product_name: String,
    pub quantity: i32, // nominal, informational only
    pub dosage: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub product_name: Option<String>,
    pub quantity: Option<i32>,
    pub dosage: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ItemResponse {
    pub id: i64,
    pub item_id: String,
    pub product_name: String,
    pub quantity: i32,
    pub dosage: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

// ==================== Batch Receipt ("In") DTOs ====================

#[derive(Debug, Deserialize)]
pub struct CreateReceiptRequest {
    pub item_id: String,
    pub batch_id: String,
    pub receipt_id: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReceiptStatusRequest {
    pub status: String, // receipts are immutable except for status
}

#[derive(Debug, Serialize, FromRow)]
pub struct ReceiptResponse {
    pub id: i64,
    pub item_id: String,
    pub batch_id: String,
    pub receipt_id: String,
    pub expiration_date: NaiveDate,
    pub quantity: i32,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

// ==================== Adjustment DTOs ====================

#[derive(Debug, Deserialize)]
pub struct CreateAdjustmentRequest {
    pub item_id: String,
    pub batch_id: String,
    pub kind: AdjustmentKind,
    pub quantity: i32,
    pub reason: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AdjustmentResponse {
    pub id: i64,
    pub item_id: String,
    pub batch_id: String,
    pub kind: String,
    pub quantity: i32,
    pub reason: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

// ==================== Dispense DTOs ====================

#[derive(Debug, Deserialize)]
pub struct CreateDispenseRequest {
    pub item_id: String,
    pub batch_id: String,
    pub quantity: i32,
    pub reason: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct DispenseResponse {
    pub id: i64,
    pub item_id: String,
    pub batch_id: String,
    pub quantity: i32,
    pub reason: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

// ==================== Batch Quantity (near-expiry) view ====================

#[derive(Debug, Serialize)]
pub struct BatchQuantityItem {
    pub item_id: String,
    pub product_name: String,
    pub batch_id: String,
    pub receipt_id: String,
    pub expiration_date: NaiveDate,
    pub receipt_quantity: i64,
    pub available_quantity: i64,
}
