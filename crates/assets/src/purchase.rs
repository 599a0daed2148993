use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Procurement metadata shared by units, licenses and consumables.
///
/// Informational only; no lifecycle rule reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseInfo {
    pub purchase_date: Option<NaiveDate>,
    /// Cost in minor currency units (cents).
    pub purchase_cost_cents: Option<i64>,
    pub order_number: Option<String>,
    pub supplier: Option<String>,
}
