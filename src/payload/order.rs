use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Smallest discount ever generated. The order service rejects line items
/// whose discount is not strictly positive.
pub const MIN_DISCOUNT: f64 = 0.01;
/// The order service requires gift wrapping on every line item.
pub const GIFT_WRAP: bool = true;
/// Restricted-item flags the order service requires to be set.
pub const AGE_VERIFICATION_REQUIRED: bool = true;
pub const HAZARDOUS_MATERIAL: bool = true;
/// Card security codes are never generated, only this mask.
pub const MASKED_CVV: &str = "***";
/// Processing budget hint sent with every order.
pub const OPTIONS_TIMEOUT_MS: u32 = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub request_id: String,
    pub customer_id: String,
    pub order: OrderMetadata,
    pub items: Vec<LineItem>,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub customer: CustomerDetails,
    pub client: ClientMetadata,
    pub promotion_codes: Vec<String>,
    pub options: OrderOptions,
    pub audit: AuditInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMetadata {
    pub order_type: String,
    pub channel: String,
    pub currency: String,
    pub priority: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub attributes: ProductAttributes,
    pub pricing: Pricing,
    pub customization: Customization,
    pub fulfillment: Fulfillment,
    pub restrictions: Restrictions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAttributes {
    pub color: String,
    pub size: String,
    pub material: String,
    pub weight_kg: f64,
    pub dimensions: Dimensions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub unit_price: f64,
    pub discount: f64,
    pub tax_rate: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    pub gift_wrap: bool,
    pub gift_message: String,
}

/// How a line item leaves the warehouse. The variant decides which ids are
/// carried, so a shipment can never lack its delivery date and a pickup can
/// never lack its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Fulfillment {
    #[serde(rename_all = "camelCase")]
    Ship {
        warehouse_id: String,
        expected_delivery_date: NaiveDate,
        carrier: String,
        service_level: String,
    },
    #[serde(rename_all = "camelCase")]
    Pickup {
        pickup_location_id: String,
        warehouse_id: String,
        ready_by: DateTime<Utc>,
    },
}

impl Fulfillment {
    pub fn kind(&self) -> &'static str {
        match self {
            Fulfillment::Ship { .. } => "ship",
            Fulfillment::Pickup { .. } => "pickup",
        }
    }

    pub fn warehouse_id(&self) -> &str {
        match self {
            Fulfillment::Ship { warehouse_id, .. } | Fulfillment::Pickup { warehouse_id, .. } => {
                warehouse_id
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restrictions {
    pub age_verification_required: bool,
    pub hazardous_material: bool,
    pub max_quantity_per_order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub method_type: String,
    pub brand: String,
    pub last4: String,
    pub expiry_month: u32,
    pub expiry_year: i32,
    pub cardholder_name: String,
    pub cvv: String,
    pub billing_address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub recipient_name: String,
    pub phone: String,
    pub address: Address,
    pub delivery_instructions: String,
    pub residential: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub loyalty_tier: String,
    pub member_since: NaiveDate,
    pub marketing_opt_in: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetadata {
    pub ip_address: String,
    pub user_agent: String,
    pub device_type: String,
    pub session_id: String,
    pub app_version: String,
    pub locale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOptions {
    pub validate_inventory: bool,
    pub reserve_stock: bool,
    pub send_confirmation: bool,
    pub apply_promotions: bool,
    pub timeout_ms: u32,
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self {
            validate_inventory: true,
            reserve_stock: true,
            send_confirmation: true,
            apply_promotions: true,
            timeout_ms: OPTIONS_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditInfo {
    pub operation_ref: String,
    pub source: String,
    pub initiated_by: String,
    pub initiated_at: DateTime<Utc>,
}
