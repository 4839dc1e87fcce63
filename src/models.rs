use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::providers::ProviderKind;

/// Flexible number deserializer to handle string, float, or int inputs from form-driven clients
fn deserialize_flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleNumber {
        Float(f64),
        String(String),
    }

    match FlexibleNumber::deserialize(deserializer)? {
        FlexibleNumber::Float(f) => Ok(f),
        FlexibleNumber::String(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

/// Item ids arrive as strings or numbers depending on the client
fn deserialize_flexible_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleId {
        String(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<FlexibleId>::deserialize(deserializer)? {
        Some(FlexibleId::String(s)) => Some(s),
        Some(FlexibleId::Int(i)) => Some(i.to_string()),
        Some(FlexibleId::Float(f)) => Some(f.to_string()),
        None => None,
    })
}

fn default_qty() -> f64 {
    1.0
}

// ─── Chat ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub force_openai: bool,
    #[serde(default)]
    pub force_gemini: bool,
    #[serde(default)]
    pub force_grok: bool,
}

impl ChatRequest {
    /// Provider the caller asked to try first, if any
    pub fn forced(&self) -> Option<ProviderKind> {
        [
            (self.force_openai, ProviderKind::OpenAi),
            (self.force_gemini, ProviderKind::Gemini),
            (self.force_grok, ProviderKind::Grok),
        ]
        .into_iter()
        .find_map(|(set, kind)| set.then_some(kind))
    }
}

/// Where an answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Provider(ProviderKind),
    Cache,
    Fallback,
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerSource::Provider(kind) => write!(f, "{kind}"),
            AnswerSource::Cache => f.write_str("cache"),
            AnswerSource::Fallback => f.write_str("fallback"),
        }
    }
}

impl Serialize for AnswerSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub source: AnswerSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl ChatResponse {
    pub fn fresh(answer: String, source: AnswerSource) -> Self {
        Self {
            answer,
            source,
            cached: None,
        }
    }

    pub fn cached(answer: String) -> Self {
        Self {
            answer,
            source: AnswerSource::Cache,
            cached: Some(true),
        }
    }
}

// ─── Prediction ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub breed: String,
    /// Top-class probability as a percentage (0-100)
    pub confidence: f32,
}

// ─── Orders ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    /// email, phone and anything else the client sends
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, deserialize_with = "deserialize_flexible_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_qty", deserialize_with = "deserialize_flexible_f64")]
    pub qty: f64,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub price: f64,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.qty * self.price
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Online,
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cod" => Ok(PaymentMethod::Cod),
            "online" => Ok(PaymentMethod::Online),
            other => Err(format!(
                "Invalid payment_method '{other}'. Must be 'cod' or 'online'."
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    AwaitingPayment,
}

impl From<PaymentMethod> for OrderStatus {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cod => OrderStatus::Pending,
            PaymentMethod::Online => OrderStatus::AwaitingPayment,
        }
    }
}

/// Order body as posted by the client, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    pub user: Customer,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Persisted order record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: uuid::Uuid,
    pub user: Customer,
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub total: f64,
    pub status: OrderStatus,
    /// Unix timestamp in seconds
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderCreated {
    pub ok: bool,
    pub order_id: uuid::Uuid,
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub count: usize,
    pub orders: Vec<Order>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_forced_provider_order() {
        let req: ChatRequest =
            serde_json::from_value(json!({"question": "hi", "force_grok": true, "force_gemini": true}))
                .unwrap();
        assert_eq!(req.forced(), Some(ProviderKind::Gemini));
        assert_eq!(ChatRequest::default().forced(), None);
    }

    #[test]
    fn test_chat_response_shape() {
        let fresh = serde_json::to_value(ChatResponse::fresh(
            "a".into(),
            AnswerSource::Provider(ProviderKind::OpenAi),
        ))
        .unwrap();
        assert_eq!(fresh, json!({"answer": "a", "source": "openai"}));

        let cached = serde_json::to_value(ChatResponse::cached("b".into())).unwrap();
        assert_eq!(cached, json!({"answer": "b", "source": "cache", "cached": true}));
    }

    #[test]
    fn test_order_item_accepts_loose_numbers() {
        let item: OrderItem =
            serde_json::from_value(json!({"id": 7, "name": "Chew Toy", "qty": "2", "price": 99}))
                .unwrap();
        assert_eq!(item.id.as_deref(), Some("7"));
        assert_eq!(item.qty, 2.0);
        assert_eq!(item.subtotal(), 198.0);

        let bare: OrderItem = serde_json::from_value(json!({"name": "Leash"})).unwrap();
        assert_eq!(bare.qty, 1.0);
        assert_eq!(bare.price, 0.0);
    }

    #[test]
    fn test_customer_keeps_extra_fields() {
        let user: Customer = serde_json::from_value(
            json!({"name": "Asha", "address": "12 Park Rd", "email": "a@example.com"}),
        )
        .unwrap();
        assert_eq!(user.extra["email"], "a@example.com");
        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["email"], "a@example.com");
    }

    #[test]
    fn test_status_from_payment_method() {
        assert_eq!(OrderStatus::from(PaymentMethod::Cod), OrderStatus::Pending);
        assert_eq!(
            serde_json::to_value(OrderStatus::from(PaymentMethod::Online)).unwrap(),
            json!("awaiting_payment")
        );
        assert!("card".parse::<PaymentMethod>().is_err());
    }
}
