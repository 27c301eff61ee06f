//! Leaf generators for individual order fields.

use rand::Rng;

pub const DEFAULT_ID_LEN: usize = 9;

pub(crate) const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica",
];
pub(crate) const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Wilson", "Anderson", "Thomas", "Taylor",
];
const EMAIL_DOMAINS: &[&str] = &["example.com", "test.com", "demo.org", "sample.net", "mail.com"];
const STREETS: &[&str] = &[
    "Main St", "Oak Ave", "Pine Rd", "Maple Dr", "Cedar Ln", "Elm St", "Washington Blvd",
    "Lake View Ct",
];
const CITIES: &[&str] = &[
    "New York", "Los Angeles", "Chicago", "Houston", "Phoenix", "Philadelphia", "San Antonio",
    "San Diego", "Dallas", "Seattle",
];
const STATES: &[&str] = &["NY", "CA", "IL", "TX", "AZ", "PA", "FL", "WA", "OH", "GA"];
const COUNTRIES: &[&str] = &["US", "CA", "MX"];

/// Uniformly pick one entry. `options` must not be empty.
pub fn pick<R: Rng + ?Sized>(rng: &mut R, options: &[&'static str]) -> &'static str {
    options[rng.random_range(0..options.len())]
}

pub fn digits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// `{prefix}_{len random digits}`.
pub fn identifier<R: Rng + ?Sized>(rng: &mut R, prefix: &str, len: usize) -> String {
    format!("{prefix}_{}", digits(rng, len))
}

pub fn lowercase_letters<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}

pub fn email<R: Rng + ?Sized>(rng: &mut R) -> String {
    let first = pick(rng, FIRST_NAMES).to_lowercase();
    let suffix = lowercase_letters(rng, 5);
    let domain = pick(rng, EMAIL_DOMAINS);
    format!("{first}{suffix}@{domain}")
}

/// North American number: `+1-AAA-EEE-LLLL`.
pub fn phone<R: Rng + ?Sized>(rng: &mut R) -> String {
    let area = rng.random_range(200..=999);
    let exchange = rng.random_range(200..=999);
    let line = rng.random_range(1000..=9999);
    format!("+1-{area}-{exchange}-{line}")
}

pub fn full_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

pub fn street<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", rng.random_range(1..=9999), pick(rng, STREETS))
}

pub fn city<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, CITIES)
}

pub fn state<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, STATES)
}

pub fn country<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, COUNTRIES)
}

pub fn postal_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    digits(rng, 5)
}

pub fn ipv4<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}.{}.{}.{}",
        rng.random_range(1..=223),
        rng.random_range(0..=255),
        rng.random_range(0..=255),
        rng.random_range(1..=254)
    )
}

/// Round to whole cents.
pub fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
