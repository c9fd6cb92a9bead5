//! Broker records as stored in the record store.
//!
//! Field names match the database columns so rows deserialize directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Publication state of a broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerStatus {
    Draft,
    Published,
    Archived,
}

impl BrokerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerStatus::Draft => "draft",
            BrokerStatus::Published => "published",
            BrokerStatus::Archived => "archived",
        }
    }
}

/// A broker with its review data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broker {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub founded_year: Option<i32>,
    #[serde(default)]
    pub headquarters: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,

    // SEO
    pub meta_title: String,
    pub meta_description: String,
    #[serde(default)]
    pub meta_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub og_image: Option<String>,

    // Ratings, out of 10
    #[serde(default)]
    pub overall_rating: Option<f64>,
    #[serde(default)]
    pub safety_rating: Option<f64>,
    #[serde(default)]
    pub cost_rating: Option<f64>,
    #[serde(default)]
    pub platform_rating: Option<f64>,
    #[serde(default)]
    pub service_rating: Option<f64>,
    #[serde(default)]
    pub withdrawal_speed_rating: Option<f64>,

    #[serde(default)]
    pub min_deposit: Option<f64>,
    #[serde(default)]
    pub max_leverage: Option<String>,
    #[serde(default)]
    pub spreads_from: Option<String>,

    pub status: BrokerStatus,
    pub created_at: String,
    pub updated_at: String,

    #[serde(default)]
    pub regulations: Vec<BrokerRegulation>,
    #[serde(default)]
    pub accounts: Vec<BrokerAccount>,
    #[serde(default)]
    pub products: Vec<BrokerProduct>,
    #[serde(default)]
    pub payment_methods: Vec<BrokerPaymentMethod>,
    #[serde(default)]
    pub faqs: Vec<BrokerFaq>,
    #[serde(default)]
    pub pros_cons: Vec<BrokerProsCons>,
    #[serde(default)]
    pub content_blocks: Vec<BrokerContentBlock>,
    #[serde(default)]
    pub schema_data: Vec<BrokerSchemaData>,
}

/// Child rows rendered in `display_order`.
pub trait DisplayOrdered {
    fn display_order(&self) -> i32;
}

/// Sort child rows by `display_order`, keeping the store order for ties.
pub fn sort_by_display_order<T: DisplayOrdered>(rows: &mut [T]) {
    rows.sort_by_key(|row| row.display_order());
}

macro_rules! display_ordered {
    ($($ty:ty),* $(,)?) => {
        $(impl DisplayOrdered for $ty {
            fn display_order(&self) -> i32 {
                self.display_order
            }
        })*
    };
}

display_ordered!(
    BrokerRegulation,
    BrokerAccount,
    BrokerProduct,
    BrokerPaymentMethod,
    BrokerFaq,
    BrokerProsCons,
    BrokerContentBlock,
);

/// Regulatory license.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerRegulation {
    pub id: String,
    pub broker_id: String,
    pub regulator_name: String,
    #[serde(default)]
    pub regulator_full_name: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub license_type: Option<String>,
    #[serde(default)]
    pub protection_amount: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub display_order: i32,
}

/// Trading account tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerAccount {
    pub id: String,
    pub broker_id: String,
    pub account_type: String,
    #[serde(default)]
    pub min_deposit: Option<f64>,
    #[serde(default)]
    pub max_leverage: Option<String>,
    #[serde(default)]
    pub spread_type: Option<String>,
    #[serde(default)]
    pub spread_value: Option<String>,
    #[serde(default)]
    pub commission: Option<String>,
    #[serde(default)]
    pub suitable_for: Option<Vec<String>>,
    #[serde(default)]
    pub features: Option<Value>,
    #[serde(default)]
    pub display_order: i32,
}

/// Tradable product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerProduct {
    pub id: String,
    pub broker_id: String,
    pub category: String,
    #[serde(default)]
    pub product_count: Option<i64>,
    #[serde(default)]
    pub product_list: Option<Vec<String>>,
    #[serde(default)]
    pub leverage: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub display_order: i32,
}

/// Deposit and withdrawal method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerPaymentMethod {
    pub id: String,
    pub broker_id: String,
    pub method_name: String,
    #[serde(default)]
    pub method_type: Option<String>,
    #[serde(default)]
    pub min_amount: Option<f64>,
    #[serde(default)]
    pub max_amount: Option<f64>,
    #[serde(default)]
    pub deposit_time: Option<String>,
    #[serde(default)]
    pub withdrawal_time: Option<String>,
    #[serde(default)]
    pub deposit_fee: Option<String>,
    #[serde(default)]
    pub withdrawal_fee: Option<String>,
    #[serde(default)]
    pub supported_currencies: Option<Vec<String>>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerFaq {
    pub id: String,
    pub broker_id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProsConsKind {
    Pro,
    Con,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerProsCons {
    pub id: String,
    pub broker_id: String,
    #[serde(rename = "type")]
    pub kind: ProsConsKind,
    pub content: String,
    #[serde(default)]
    pub display_order: i32,
}

/// Free-form content section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerContentBlock {
    pub id: String,
    pub broker_id: String,
    pub section_id: String,
    pub block_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub display_order: i32,
}

/// Extra JSON-LD object published with the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerSchemaData {
    pub id: String,
    pub broker_id: String,
    pub schema_type: String,
    pub schema_data: Value,
    #[serde(default)]
    pub enabled: bool,
}

/// Listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerSummary {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub overall_rating: Option<f64>,
    pub updated_at: String,
}
