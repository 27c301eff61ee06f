//! Protobuf messages and unary client for `order.OrderService`.
//!
//! Hand-maintained equivalent of the generated code for `order.proto`; tags
//! must stay in sync with the service definition.

use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;

use crate::payload;

pub const CREATE_ORDER_PATH: &str = "/order.OrderService/createOrder";

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateOrderRequest {
    #[prost(string, tag = "1")]
    pub request_id: String,
    #[prost(string, tag = "2")]
    pub customer_id: String,
    #[prost(message, optional, tag = "3")]
    pub order: Option<OrderMetadata>,
    #[prost(message, repeated, tag = "4")]
    pub items: Vec<LineItem>,
    #[prost(message, optional, tag = "5")]
    pub payment_method: Option<PaymentMethod>,
    #[prost(message, optional, tag = "6")]
    pub shipping_address: Option<ShippingAddress>,
    #[prost(message, optional, tag = "7")]
    pub customer: Option<CustomerDetails>,
    #[prost(message, optional, tag = "8")]
    pub client: Option<ClientMetadata>,
    #[prost(string, repeated, tag = "9")]
    pub promotion_codes: Vec<String>,
    #[prost(message, optional, tag = "10")]
    pub options: Option<OrderOptions>,
    #[prost(message, optional, tag = "11")]
    pub audit: Option<AuditInfo>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OrderMetadata {
    #[prost(string, tag = "1")]
    pub order_type: String,
    #[prost(string, tag = "2")]
    pub channel: String,
    #[prost(string, tag = "3")]
    pub currency: String,
    #[prost(string, tag = "4")]
    pub priority: String,
    #[prost(string, tag = "5")]
    pub notes: String,
    #[prost(string, tag = "6")]
    pub created_at: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LineItem {
    #[prost(string, tag = "1")]
    pub product_id: String,
    #[prost(string, tag = "2")]
    pub sku: String,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(string, tag = "4")]
    pub category: String,
    #[prost(uint32, tag = "5")]
    pub quantity: u32,
    #[prost(message, optional, tag = "6")]
    pub attributes: Option<ProductAttributes>,
    #[prost(message, optional, tag = "7")]
    pub pricing: Option<Pricing>,
    #[prost(message, optional, tag = "8")]
    pub customization: Option<Customization>,
    #[prost(message, optional, tag = "9")]
    pub fulfillment: Option<Fulfillment>,
    #[prost(message, optional, tag = "10")]
    pub restrictions: Option<Restrictions>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ProductAttributes {
    #[prost(string, tag = "1")]
    pub color: String,
    #[prost(string, tag = "2")]
    pub size: String,
    #[prost(string, tag = "3")]
    pub material: String,
    #[prost(double, tag = "4")]
    pub weight_kg: f64,
    #[prost(double, tag = "5")]
    pub length_cm: f64,
    #[prost(double, tag = "6")]
    pub width_cm: f64,
    #[prost(double, tag = "7")]
    pub height_cm: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Pricing {
    #[prost(double, tag = "1")]
    pub unit_price: f64,
    #[prost(double, tag = "2")]
    pub discount: f64,
    #[prost(double, tag = "3")]
    pub tax_rate: f64,
    #[prost(string, tag = "4")]
    pub currency: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Customization {
    #[prost(bool, tag = "1")]
    pub gift_wrap: bool,
    #[prost(string, tag = "2")]
    pub gift_message: String,
}

/// Flat on the wire; fields that do not apply to `type` are left empty.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Fulfillment {
    #[prost(string, tag = "1")]
    pub r#type: String,
    #[prost(string, tag = "2")]
    pub warehouse_id: String,
    #[prost(string, tag = "3")]
    pub expected_delivery_date: String,
    #[prost(string, tag = "4")]
    pub carrier: String,
    #[prost(string, tag = "5")]
    pub service_level: String,
    #[prost(string, tag = "6")]
    pub pickup_location_id: String,
    #[prost(string, tag = "7")]
    pub ready_by: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Restrictions {
    #[prost(bool, tag = "1")]
    pub age_verification_required: bool,
    #[prost(bool, tag = "2")]
    pub hazardous_material: bool,
    #[prost(uint32, tag = "3")]
    pub max_quantity_per_order: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PaymentMethod {
    #[prost(string, tag = "1")]
    pub method_type: String,
    #[prost(string, tag = "2")]
    pub brand: String,
    #[prost(string, tag = "3")]
    pub last4: String,
    #[prost(uint32, tag = "4")]
    pub expiry_month: u32,
    #[prost(int32, tag = "5")]
    pub expiry_year: i32,
    #[prost(string, tag = "6")]
    pub cardholder_name: String,
    #[prost(string, tag = "7")]
    pub cvv: String,
    #[prost(message, optional, tag = "8")]
    pub billing_address: Option<Address>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Address {
    #[prost(string, tag = "1")]
    pub street: String,
    #[prost(string, tag = "2")]
    pub city: String,
    #[prost(string, tag = "3")]
    pub state: String,
    #[prost(string, tag = "4")]
    pub postal_code: String,
    #[prost(string, tag = "5")]
    pub country: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ShippingAddress {
    #[prost(string, tag = "1")]
    pub recipient_name: String,
    #[prost(string, tag = "2")]
    pub phone: String,
    #[prost(message, optional, tag = "3")]
    pub address: Option<Address>,
    #[prost(string, tag = "4")]
    pub delivery_instructions: String,
    #[prost(bool, tag = "5")]
    pub residential: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CustomerDetails {
    #[prost(string, tag = "1")]
    pub first_name: String,
    #[prost(string, tag = "2")]
    pub last_name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(string, tag = "4")]
    pub phone: String,
    #[prost(string, tag = "5")]
    pub loyalty_tier: String,
    #[prost(string, tag = "6")]
    pub member_since: String,
    #[prost(bool, tag = "7")]
    pub marketing_opt_in: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ClientMetadata {
    #[prost(string, tag = "1")]
    pub ip_address: String,
    #[prost(string, tag = "2")]
    pub user_agent: String,
    #[prost(string, tag = "3")]
    pub device_type: String,
    #[prost(string, tag = "4")]
    pub session_id: String,
    #[prost(string, tag = "5")]
    pub app_version: String,
    #[prost(string, tag = "6")]
    pub locale: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OrderOptions {
    #[prost(bool, tag = "1")]
    pub validate_inventory: bool,
    #[prost(bool, tag = "2")]
    pub reserve_stock: bool,
    #[prost(bool, tag = "3")]
    pub send_confirmation: bool,
    #[prost(bool, tag = "4")]
    pub apply_promotions: bool,
    #[prost(uint32, tag = "5")]
    pub timeout_ms: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AuditInfo {
    #[prost(string, tag = "1")]
    pub operation_ref: String,
    #[prost(string, tag = "2")]
    pub source: String,
    #[prost(string, tag = "3")]
    pub initiated_by: String,
    #[prost(string, tag = "4")]
    pub initiated_at: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateOrderResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(message, optional, tag = "2")]
    pub order: Option<OrderSummary>,
    #[prost(string, repeated, tag = "3")]
    pub errors: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OrderSummary {
    #[prost(string, tag = "1")]
    pub order_id: String,
    #[prost(string, tag = "2")]
    pub status: String,
    #[prost(double, tag = "3")]
    pub total_amount: f64,
}

#[derive(Debug, Clone)]
pub struct OrderServiceClient {
    inner: tonic::client::Grpc<Channel>,
}

impl OrderServiceClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn create_order(
        &mut self,
        request: impl tonic::IntoRequest<CreateOrderRequest>,
    ) -> Result<tonic::Response<CreateOrderResponse>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unknown(format!("Service was not ready: {e}")))?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static(CREATE_ORDER_PATH);
        self.inner.unary(request.into_request(), path, codec).await
    }
}

impl From<&payload::CreateOrderRequest> for CreateOrderRequest {
    fn from(r: &payload::CreateOrderRequest) -> Self {
        Self {
            request_id: r.request_id.clone(),
            customer_id: r.customer_id.clone(),
            order: Some(OrderMetadata {
                order_type: r.order.order_type.clone(),
                channel: r.order.channel.clone(),
                currency: r.order.currency.clone(),
                priority: r.order.priority.clone(),
                notes: r.order.notes.clone(),
                created_at: r.order.created_at.to_rfc3339(),
            }),
            items: r.items.iter().map(LineItem::from).collect(),
            payment_method: Some(PaymentMethod::from(&r.payment_method)),
            shipping_address: Some(ShippingAddress {
                recipient_name: r.shipping_address.recipient_name.clone(),
                phone: r.shipping_address.phone.clone(),
                address: Some(Address::from(&r.shipping_address.address)),
                delivery_instructions: r.shipping_address.delivery_instructions.clone(),
                residential: r.shipping_address.residential,
            }),
            customer: Some(CustomerDetails {
                first_name: r.customer.first_name.clone(),
                last_name: r.customer.last_name.clone(),
                email: r.customer.email.clone(),
                phone: r.customer.phone.clone(),
                loyalty_tier: r.customer.loyalty_tier.clone(),
                member_since: r.customer.member_since.to_string(),
                marketing_opt_in: r.customer.marketing_opt_in,
            }),
            client: Some(ClientMetadata {
                ip_address: r.client.ip_address.clone(),
                user_agent: r.client.user_agent.clone(),
                device_type: r.client.device_type.clone(),
                session_id: r.client.session_id.clone(),
                app_version: r.client.app_version.clone(),
                locale: r.client.locale.clone(),
            }),
            promotion_codes: r.promotion_codes.clone(),
            options: Some(OrderOptions {
                validate_inventory: r.options.validate_inventory,
                reserve_stock: r.options.reserve_stock,
                send_confirmation: r.options.send_confirmation,
                apply_promotions: r.options.apply_promotions,
                timeout_ms: r.options.timeout_ms,
            }),
            audit: Some(AuditInfo {
                operation_ref: r.audit.operation_ref.clone(),
                source: r.audit.source.clone(),
                initiated_by: r.audit.initiated_by.clone(),
                initiated_at: r.audit.initiated_at.to_rfc3339(),
            }),
        }
    }
}

impl From<&payload::LineItem> for LineItem {
    fn from(item: &payload::LineItem) -> Self {
        let attrs = &item.attributes;
        Self {
            product_id: item.product_id.clone(),
            sku: item.sku.clone(),
            name: item.name.clone(),
            category: item.category.clone(),
            quantity: item.quantity,
            attributes: Some(ProductAttributes {
                color: attrs.color.clone(),
                size: attrs.size.clone(),
                material: attrs.material.clone(),
                weight_kg: attrs.weight_kg,
                length_cm: attrs.dimensions.length_cm,
                width_cm: attrs.dimensions.width_cm,
                height_cm: attrs.dimensions.height_cm,
            }),
            pricing: Some(Pricing {
                unit_price: item.pricing.unit_price,
                discount: item.pricing.discount,
                tax_rate: item.pricing.tax_rate,
                currency: item.pricing.currency.clone(),
            }),
            customization: Some(Customization {
                gift_wrap: item.customization.gift_wrap,
                gift_message: item.customization.gift_message.clone(),
            }),
            fulfillment: Some(Fulfillment::from(&item.fulfillment)),
            restrictions: Some(Restrictions {
                age_verification_required: item.restrictions.age_verification_required,
                hazardous_material: item.restrictions.hazardous_material,
                max_quantity_per_order: item.restrictions.max_quantity_per_order,
            }),
        }
    }
}

impl From<&payload::Fulfillment> for Fulfillment {
    fn from(f: &payload::Fulfillment) -> Self {
        let mut out = Fulfillment {
            r#type: f.kind().to_string(),
            warehouse_id: f.warehouse_id().to_string(),
            ..Default::default()
        };
        match f {
            payload::Fulfillment::Ship {
                expected_delivery_date,
                carrier,
                service_level,
                ..
            } => {
                out.expected_delivery_date = expected_delivery_date.to_string();
                out.carrier = carrier.clone();
                out.service_level = service_level.clone();
            }
            payload::Fulfillment::Pickup {
                pickup_location_id,
                ready_by,
                ..
            } => {
                out.pickup_location_id = pickup_location_id.clone();
                out.ready_by = ready_by.to_rfc3339();
            }
        }
        out
    }
}

impl From<&payload::PaymentMethod> for PaymentMethod {
    fn from(p: &payload::PaymentMethod) -> Self {
        Self {
            method_type: p.method_type.clone(),
            brand: p.brand.clone(),
            last4: p.last4.clone(),
            expiry_month: p.expiry_month,
            expiry_year: p.expiry_year,
            cardholder_name: p.cardholder_name.clone(),
            cvv: p.cvv.clone(),
            billing_address: Some(Address::from(&p.billing_address)),
        }
    }
}

impl From<&payload::Address> for Address {
    fn from(a: &payload::Address) -> Self {
        Self {
            street: a.street.clone(),
            city: a.city.clone(),
            state: a.state.clone(),
            postal_code: a.postal_code.clone(),
            country: a.country.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::OrderGenerator;
    use chrono::{TimeZone, Utc};

    #[test]
    fn conversion_keeps_every_line_item_and_the_fixed_blocks() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let request = OrderGenerator::seeded(21).generate_at(now);
        let wire = CreateOrderRequest::from(&request);

        assert_eq!(wire.request_id, request.request_id);
        assert_eq!(wire.items.len(), request.items.len());
        let options = wire.options.as_ref().unwrap();
        assert!(options.validate_inventory && options.reserve_stock);
        assert_eq!(options.timeout_ms, 2000);
        assert_eq!(wire.payment_method.as_ref().unwrap().cvv, "***");

        for (wire_item, item) in wire.items.iter().zip(&request.items) {
            let f = wire_item.fulfillment.as_ref().unwrap();
            assert_eq!(f.r#type, item.fulfillment.kind());
            assert!(!f.warehouse_id.is_empty());
            match f.r#type.as_str() {
                "ship" => assert!(!f.expected_delivery_date.is_empty()),
                _ => assert!(!f.pickup_location_id.is_empty()),
            }
        }
    }
}
