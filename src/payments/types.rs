//! Gateway data model
//!
//! Parameter sets exchanged with the gateway, payment requests and the
//! in-flight callback records handed to business handlers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::GatewayResult;
use crate::payments::{codes, wire};

/// Field carrying the request/response signature. Never part of the signed input.
pub const SIGNATURE_FIELD: &str = "pg_sig";

/// Scalar value of a gateway parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl ParamValue {
    /// Wire rendering of the value, or `None` when the value must be left out
    /// of both the signature and the request body.
    pub fn to_wire(&self) -> Option<Cow<'_, str>> {
        match self {
            ParamValue::Null => None,
            ParamValue::Text(s) if s.is_empty() => None,
            ParamValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            ParamValue::Int(i) => Some(Cow::Owned(i.to_string())),
            ParamValue::Bool(true) => Some(Cow::Borrowed("1")),
            ParamValue::Bool(false) => Some(Cow::Borrowed("0")),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Text(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

/// Case-sensitive mapping of parameter names to values, kept in byte-wise key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Text value for `key`, if present and non-empty.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(ParamValue::Text(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies every entry of `other` into this set, overwriting duplicates.
    pub fn extend(&mut self, other: &ParameterSet) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Non-empty values in ascending key order.
    pub fn signable_values(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.entries.values().filter_map(ParamValue::to_wire)
    }

    /// Non-empty entries rendered for a form-encoded body or XML document.
    pub fn to_wire_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.to_wire().map(|v| (k.clone(), v.into_owned())))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl From<HashMap<String, String>> for ParameterSet {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

/// Request to start a payment for a merchant invoice.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Merchant order identifier, sent as `pg_order_id`
    pub invoice_id: String,
    pub amount: Decimal,
    pub description: String,
    /// Opaque optional gateway parameters (`pg_user_phone`, `pg_lifetime`, ...)
    pub extra: ParameterSet,
}

impl PaymentRequest {
    pub fn new(invoice_id: impl Into<String>, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            amount,
            description: description.into(),
            extra: ParameterSet::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.extra.insert(key, value);
        self
    }
}

/// Successful payment initiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRedirect {
    /// Page the customer must be sent to
    pub redirect_url: String,
    pub payment_id: Option<String>,
    pub order_id: String,
}

/// A verified callback on its way through the business handler.
#[derive(Debug, Clone)]
pub struct GatewayEvent {
    id: Uuid,
    received_at: DateTime<Utc>,
    endpoint: String,
    params: ParameterSet,
}

impl GatewayEvent {
    pub(crate) fn new(endpoint: impl Into<String>, params: ParameterSet) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            endpoint: endpoint.into(),
            params,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Endpoint name the callback signature was verified against
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get_str(key)
    }

    pub fn order_id(&self) -> Option<&str> {
        self.get("pg_order_id")
    }

    pub fn payment_id(&self) -> Option<&str> {
        self.get("pg_payment_id")
    }

    pub fn salt(&self) -> Option<&str> {
        self.get("pg_salt")
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.get("pg_amount").and_then(|s| Decimal::from_str(s).ok())
    }

    pub fn currency(&self) -> Option<&str> {
        self.get("pg_currency")
    }

    /// `pg_result == 1`: the gateway reports the payment as completed.
    pub fn is_successful(&self) -> bool {
        self.get("pg_result") == Some("1")
    }

    /// Whether the gateway allows the merchant to refuse this payment.
    pub fn can_reject(&self) -> bool {
        self.get("pg_can_reject") == Some("1")
    }

    pub fn failure_code(&self) -> Option<u32> {
        self.get("pg_failure_code").and_then(|s| s.parse().ok())
    }

    pub fn failure_label(&self) -> Option<&'static str> {
        self.failure_code().map(codes::reject_code_label)
    }
}

/// Outcome of the business handler's first look at a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Not claimed. The gateway receives the default error payload.
    Unhandled,
    /// Claimed. The settlement phase runs inside an atomic scope.
    Handled,
    /// Payment refused by the merchant.
    Rejected { description: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
    Rejected,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Ok => "ok",
            ResponseStatus::Error => "error",
            ResponseStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed payload answering a gateway callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResponse {
    status: ResponseStatus,
    salt: Option<String>,
    description: String,
    signature: String,
}

impl CallbackResponse {
    pub(crate) fn new(
        status: ResponseStatus,
        salt: Option<String>,
        description: impl Into<String>,
        signature: String,
    ) -> Self {
        Self {
            status,
            salt,
            description: description.into(),
            signature,
        }
    }

    pub(crate) fn unsigned_params(
        status: ResponseStatus,
        salt: Option<&str>,
        description: &str,
    ) -> ParameterSet {
        ParameterSet::new()
            .with("pg_status", status.as_str())
            .with("pg_salt", salt)
            .with("pg_description", description)
    }

    pub fn status(&self) -> ResponseStatus {
        self.status
    }

    pub fn salt(&self) -> Option<&str> {
        self.salt.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// All response fields including `pg_sig`.
    pub fn to_params(&self) -> ParameterSet {
        Self::unsigned_params(self.status, self.salt(), &self.description)
            .with(SIGNATURE_FIELD, self.signature.as_str())
    }

    /// XML document sent back to the gateway.
    pub fn to_xml(&self) -> GatewayResult<String> {
        wire::render_response(&self.to_params())
    }
}
