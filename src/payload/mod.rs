//! Synthetic "create order" requests.
//!
//! Every generator takes an explicit random source so a fixed seed always
//! yields the same request. Wall-clock dependent fields are derived from the
//! `now` argument for the same reason.

pub mod fields;
pub mod order;

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use self::fields::{cents, identifier, pick, DEFAULT_ID_LEN, FIRST_NAMES, LAST_NAMES};
pub use self::order::*;

const PRODUCTS: &[(&str, &str)] = &[
    ("Wireless Headphones", "electronics"),
    ("Running Shoes", "apparel"),
    ("Coffee Grinder", "kitchen"),
    ("Yoga Mat", "sports"),
    ("Desk Lamp", "home"),
    ("Backpack", "accessories"),
    ("Smart Watch", "electronics"),
    ("Cast Iron Skillet", "kitchen"),
];
const COLORS: &[&str] = &["black", "white", "red", "blue", "green", "silver", "navy"];
const SIZES: &[&str] = &["XS", "S", "M", "L", "XL", "one-size"];
const MATERIALS: &[&str] = &["cotton", "polyester", "leather", "steel", "aluminium", "wood"];
const CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "CAD"];
const CARRIERS: &[&str] = &["UPS", "FedEx", "USPS", "DHL"];
const SERVICE_LEVELS: &[&str] = &["standard", "expedited", "overnight"];
const GIFT_MESSAGES: &[&str] = &[
    "Happy birthday!",
    "Congratulations!",
    "With love",
    "Thank you",
    "Enjoy!",
];
const CARD_BRANDS: &[&str] = &["visa", "mastercard", "amex", "discover"];
const ORDER_TYPES: &[&str] = &["standard", "express", "subscription", "preorder"];
const CHANNELS: &[&str] = &["web", "mobile_app", "call_center", "marketplace"];
const PRIORITIES: &[&str] = &["low", "normal", "high"];
const ORDER_NOTES: &[&str] = &[
    "Leave at the front desk",
    "Call before delivery",
    "No substitutions",
    "Deliver after 5pm",
];
const DELIVERY_INSTRUCTIONS: &[&str] = &[
    "Leave at door",
    "Ring the bell",
    "Hand to recipient",
    "Back porch",
];
const LOYALTY_TIERS: &[&str] = &["bronze", "silver", "gold", "platinum"];
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X)",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8)",
];
const DEVICE_TYPES: &[&str] = &["desktop", "mobile", "tablet"];
const APP_VERSIONS: &[&str] = &["3.2.0", "3.2.1", "3.3.0", "4.0.0-beta"];
const LOCALES: &[&str] = &["en-US", "en-CA", "es-MX", "fr-CA"];
const PROMOTION_CODES: &[&str] = &["SAVE10", "WELCOME5", "FREESHIP", "SPRING20", "VIP15"];
const AUDIT_SOURCES: &[&str] = &["load-test", "synthetic-traffic"];

/// Produces one fresh request per call from its own random source.
pub struct OrderGenerator<R> {
    rng: R,
}

impl OrderGenerator<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> OrderGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self) -> CreateOrderRequest {
        self.generate_at(Utc::now())
    }

    pub fn generate_at(&mut self, now: DateTime<Utc>) -> CreateOrderRequest {
        create_order(&mut self.rng, now)
    }
}

pub fn create_order<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> CreateOrderRequest {
    let item_count = rng.random_range(1..=5);
    let items = (0..item_count).map(|_| line_item(rng, now)).collect();
    let promo_count = rng.random_range(0..=2);
    let promotion_codes = (0..promo_count)
        .map(|_| pick(rng, PROMOTION_CODES).to_string())
        .collect();

    CreateOrderRequest {
        request_id: identifier(rng, "req", DEFAULT_ID_LEN),
        customer_id: identifier(rng, "cust", DEFAULT_ID_LEN),
        order: order_metadata(rng, now),
        items,
        payment_method: payment_method(rng, now),
        shipping_address: shipping_address(rng),
        customer: customer_details(rng, now),
        client: client_metadata(rng),
        promotion_codes,
        options: OrderOptions::default(),
        audit: audit_info(rng, now),
    }
}

pub fn order_metadata<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> OrderMetadata {
    OrderMetadata {
        order_type: pick(rng, ORDER_TYPES).to_string(),
        channel: pick(rng, CHANNELS).to_string(),
        currency: pick(rng, CURRENCIES).to_string(),
        priority: pick(rng, PRIORITIES).to_string(),
        notes: pick(rng, ORDER_NOTES).to_string(),
        created_at: now,
    }
}

pub fn line_item<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> LineItem {
    let (name, category) = PRODUCTS[rng.random_range(0..PRODUCTS.len())];
    let currency = pick(rng, CURRENCIES).to_string();
    let unit_price = cents(rng.random_range(5.0..500.0));
    let discount = cents(unit_price * rng.random_range(0.01..0.30)).max(MIN_DISCOUNT);

    LineItem {
        product_id: identifier(rng, "prod", DEFAULT_ID_LEN),
        sku: identifier(rng, "sku", 8),
        name: name.to_string(),
        category: category.to_string(),
        quantity: rng.random_range(1..=5),
        attributes: ProductAttributes {
            color: pick(rng, COLORS).to_string(),
            size: pick(rng, SIZES).to_string(),
            material: pick(rng, MATERIALS).to_string(),
            weight_kg: cents(rng.random_range(0.1..25.0)),
            dimensions: Dimensions {
                length_cm: cents(rng.random_range(5.0..120.0)),
                width_cm: cents(rng.random_range(5.0..80.0)),
                height_cm: cents(rng.random_range(1.0..60.0)),
            },
        },
        pricing: Pricing {
            unit_price,
            discount,
            tax_rate: cents(rng.random_range(0.0..0.12)),
            currency,
        },
        customization: Customization {
            gift_wrap: GIFT_WRAP,
            gift_message: pick(rng, GIFT_MESSAGES).to_string(),
        },
        fulfillment: fulfillment(rng, now),
        restrictions: Restrictions {
            age_verification_required: AGE_VERIFICATION_REQUIRED,
            hazardous_material: HAZARDOUS_MATERIAL,
            max_quantity_per_order: rng.random_range(5..=20),
        },
    }
}

pub fn fulfillment<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Fulfillment {
    let warehouse_id = identifier(rng, "wh", 4);
    if rng.random_bool(0.5) {
        Fulfillment::Ship {
            warehouse_id,
            expected_delivery_date: now.date_naive() + TimeDelta::days(rng.random_range(2..=10)),
            carrier: pick(rng, CARRIERS).to_string(),
            service_level: pick(rng, SERVICE_LEVELS).to_string(),
        }
    } else {
        Fulfillment::Pickup {
            pickup_location_id: identifier(rng, "loc", 5),
            warehouse_id,
            ready_by: now + TimeDelta::hours(rng.random_range(2..=48)),
        }
    }
}

pub fn address<R: Rng + ?Sized>(rng: &mut R) -> Address {
    Address {
        street: fields::street(rng),
        city: fields::city(rng).to_string(),
        state: fields::state(rng).to_string(),
        postal_code: fields::postal_code(rng),
        country: fields::country(rng).to_string(),
    }
}

pub fn payment_method<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> PaymentMethod {
    PaymentMethod {
        method_type: "credit_card".to_string(),
        brand: pick(rng, CARD_BRANDS).to_string(),
        last4: fields::digits(rng, 4),
        expiry_month: rng.random_range(1..=12),
        expiry_year: now.year() + rng.random_range(1..=5),
        cardholder_name: fields::full_name(rng),
        cvv: MASKED_CVV.to_string(),
        billing_address: address(rng),
    }
}

pub fn shipping_address<R: Rng + ?Sized>(rng: &mut R) -> ShippingAddress {
    ShippingAddress {
        recipient_name: fields::full_name(rng),
        phone: fields::phone(rng),
        address: address(rng),
        delivery_instructions: pick(rng, DELIVERY_INSTRUCTIONS).to_string(),
        residential: rng.random_bool(0.8),
    }
}

pub fn customer_details<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> CustomerDetails {
    CustomerDetails {
        first_name: pick(rng, FIRST_NAMES).to_string(),
        last_name: pick(rng, LAST_NAMES).to_string(),
        email: fields::email(rng),
        phone: fields::phone(rng),
        loyalty_tier: pick(rng, LOYALTY_TIERS).to_string(),
        member_since: now.date_naive() - TimeDelta::days(rng.random_range(30..=3650)),
        marketing_opt_in: rng.random_bool(0.5),
    }
}

pub fn client_metadata<R: Rng + ?Sized>(rng: &mut R) -> ClientMetadata {
    ClientMetadata {
        ip_address: fields::ipv4(rng),
        user_agent: pick(rng, USER_AGENTS).to_string(),
        device_type: pick(rng, DEVICE_TYPES).to_string(),
        session_id: identifier(rng, "sess", 12),
        app_version: pick(rng, APP_VERSIONS).to_string(),
        locale: pick(rng, LOCALES).to_string(),
    }
}

pub fn audit_info<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> AuditInfo {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    AuditInfo {
        operation_ref: uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        source: pick(rng, AUDIT_SOURCES).to_string(),
        initiated_by: identifier(rng, "vu", 4),
        initiated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn assert_structurally_valid(request: &CreateOrderRequest) {
        assert!((1..=5).contains(&request.items.len()));
        assert!(request.promotion_codes.len() <= 2);
        assert!(!request.audit.operation_ref.is_empty());
        assert_eq!(request.options, OrderOptions::default());
        assert_eq!(request.payment_method.cvv, "***");

        for item in &request.items {
            assert!((1..=5).contains(&item.quantity));
            assert!(item.pricing.discount > 0.0, "{:?}", item.pricing);
            assert!(item.pricing.discount <= item.pricing.unit_price);
            assert!(item.customization.gift_wrap);
            assert!(item.restrictions.age_verification_required);
            assert!(item.restrictions.hazardous_material);
            match &item.fulfillment {
                Fulfillment::Ship {
                    warehouse_id,
                    carrier,
                    ..
                } => {
                    assert!(!warehouse_id.is_empty());
                    assert!(!carrier.is_empty());
                }
                Fulfillment::Pickup {
                    pickup_location_id,
                    warehouse_id,
                    ..
                } => {
                    assert!(!pickup_location_id.is_empty());
                    assert!(!warehouse_id.is_empty());
                }
            }
        }
    }

    #[test]
    fn ten_thousand_requests_are_structurally_valid() {
        let mut generator = OrderGenerator::seeded(42);
        for _ in 0..10_000 {
            assert_structurally_valid(&generator.generate_at(fixed_now()));
        }
    }

    #[test]
    fn same_seed_same_request() {
        let a = OrderGenerator::seeded(9).generate_at(fixed_now());
        let b = OrderGenerator::seeded(9).generate_at(fixed_now());
        let c = OrderGenerator::seeded(10).generate_at(fixed_now());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn both_fulfillment_kinds_are_produced() {
        let mut rng = StdRng::seed_from_u64(1);
        let kinds: Vec<&str> = (0..200)
            .map(|_| fulfillment(&mut rng, fixed_now()).kind())
            .collect();
        assert!(kinds.contains(&"ship"));
        assert!(kinds.contains(&"pickup"));
    }

    #[test]
    fn fulfillment_serializes_required_fields_for_its_type() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            let value = serde_json::to_value(fulfillment(&mut rng, fixed_now())).unwrap();
            match value["type"].as_str() {
                Some("ship") => {
                    assert!(value["warehouseId"].is_string());
                    assert!(value["expectedDeliveryDate"].is_string());
                }
                Some("pickup") => {
                    assert!(value["pickupLocationId"].is_string());
                    assert!(value["warehouseId"].is_string());
                }
                other => panic!("unexpected fulfillment type {other:?}"),
            }
        }
    }

    #[test]
    fn request_json_uses_camel_case_and_no_nulls() {
        let request = OrderGenerator::seeded(3).generate_at(fixed_now());
        let value = serde_json::to_value(&request).unwrap();
        assert!(value["requestId"].as_str().unwrap().starts_with("req_"));
        assert_eq!(value["options"]["timeoutMs"], 2000);
        assert_eq!(value["items"][0]["customization"]["giftWrap"], true);

        fn no_nulls(v: &serde_json::Value) -> bool {
            match v {
                serde_json::Value::Null => false,
                serde_json::Value::Array(a) => a.iter().all(no_nulls),
                serde_json::Value::Object(o) => o.values().all(no_nulls),
                _ => true,
            }
        }
        assert!(no_nulls(&value));
    }

    #[test]
    fn dates_follow_the_clock() {
        let now = fixed_now();
        let mut rng = StdRng::seed_from_u64(4);
        let payment = payment_method(&mut rng, now);
        assert!((2027..=2031).contains(&payment.expiry_year));
        assert!((1..=12).contains(&payment.expiry_month));

        let customer = customer_details(&mut rng, now);
        assert!(customer.member_since < now.date_naive());
    }
}
