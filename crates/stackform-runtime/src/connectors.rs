//! Payments connector configurations.
//!
//! A connector configuration is a flat JSON object whose shape depends on its
//! `provider` field. Each provider has its own variant struct with its own
//! required fields. Fields a variant does not know are kept in `extra` and
//! sent back unchanged.
//!
//! Credentials and configuration are declared separately but the remote side
//! takes them as one object, so decoding merges the two before dispatching on
//! `provider`. Errors raised while decoding never include field values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stackform_core::{CodecError, DynamicKind, DynamicMap, DynamicValue};
use std::fmt;
use std::str::FromStr;

/// Name of the discriminator field.
pub const PROVIDER_FIELD: &str = "provider";

/// The closed set of supported connector providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorProvider {
    Adyen,
    Atlar,
    Bankingcircle,
    Column,
    Currencycloud,
    Dummypay,
    Generic,
    Increase,
    Mangopay,
    Modulr,
    Moneycorp,
    Qonto,
    Stripe,
    Wise,
}

impl ConnectorProvider {
    pub const ALL: &'static [ConnectorProvider] = &[
        ConnectorProvider::Adyen,
        ConnectorProvider::Atlar,
        ConnectorProvider::Bankingcircle,
        ConnectorProvider::Column,
        ConnectorProvider::Currencycloud,
        ConnectorProvider::Dummypay,
        ConnectorProvider::Generic,
        ConnectorProvider::Increase,
        ConnectorProvider::Mangopay,
        ConnectorProvider::Modulr,
        ConnectorProvider::Moneycorp,
        ConnectorProvider::Qonto,
        ConnectorProvider::Stripe,
        ConnectorProvider::Wise,
    ];

    /// Canonical spelling, as the payments module expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorProvider::Adyen => "Adyen",
            ConnectorProvider::Atlar => "Atlar",
            ConnectorProvider::Bankingcircle => "Bankingcircle",
            ConnectorProvider::Column => "Column",
            ConnectorProvider::Currencycloud => "Currencycloud",
            ConnectorProvider::Dummypay => "Dummypay",
            ConnectorProvider::Generic => "Generic",
            ConnectorProvider::Increase => "Increase",
            ConnectorProvider::Mangopay => "Mangopay",
            ConnectorProvider::Modulr => "Modulr",
            ConnectorProvider::Moneycorp => "Moneycorp",
            ConnectorProvider::Qonto => "Qonto",
            ConnectorProvider::Stripe => "Stripe",
            ConnectorProvider::Wise => "Wise",
        }
    }
}

impl fmt::Display for ConnectorProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorProvider {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectorProvider::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CodecError::UnknownDiscriminator {
                field: PROVIDER_FIELD.to_string(),
                value: s.to_string(),
            })
    }
}

/// Fields shared by every provider.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_period: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdyenConfig {
    pub api_key: String,
    #[serde(rename = "companyID")]
    pub company_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_endpoint_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_username: Option<String>,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlarConfig {
    pub access_key: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub secret: String,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankingcircleConfig {
    pub authorization_endpoint: String,
    pub endpoint: String,
    pub password: String,
    pub user_certificate: String,
    pub user_certificate_key: String,
    pub username: String,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

/// Providers authenticated by an API key against an endpoint.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyEndpointConfig {
    pub api_key: String,
    pub endpoint: String,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencycloudConfig {
    pub api_key: String,
    pub endpoint: String,
    #[serde(rename = "loginID")]
    pub login_id: String,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DummypayConfig {
    pub directory: String,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncreaseConfig {
    pub api_key: String,
    pub endpoint: String,
    pub webhook_shared_secret: String,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

/// Providers authenticated by an API key plus a client id.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdConfig {
    pub api_key: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub endpoint: String,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModulrConfig {
    pub api_key: String,
    pub api_secret: String,
    pub endpoint: String,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QontoConfig {
    pub api_key: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_token: Option<String>,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeConfig {
    pub api_key: String,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiseConfig {
    pub api_key: String,
    pub webhook_public_key: String,
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub extra: DynamicMap,
}

/// A decoded connector configuration, one variant per provider.
#[derive(Clone)]
pub enum ConnectorConfig {
    Adyen(AdyenConfig),
    Atlar(AtlarConfig),
    Bankingcircle(BankingcircleConfig),
    Column(ApiKeyEndpointConfig),
    Currencycloud(CurrencycloudConfig),
    Dummypay(DummypayConfig),
    Generic(ApiKeyEndpointConfig),
    Increase(IncreaseConfig),
    Mangopay(ClientIdConfig),
    Modulr(ModulrConfig),
    Moneycorp(ClientIdConfig),
    Qonto(QontoConfig),
    Stripe(StripeConfig),
    Wise(WiseConfig),
}

impl ConnectorConfig {
    /// Merge `credentials` and `config` and decode the result for its provider.
    ///
    /// A key present in both groups is rejected rather than letting one side
    /// silently win.
    pub fn from_parts(credentials: &DynamicMap, config: &DynamicMap) -> Result<Self, CodecError> {
        if let Some(key) = credentials.keys().find(|k| config.contains_key(*k)) {
            return Err(CodecError::Invalid {
                context: "connector".to_string(),
                reason: format!("key '{key}' is declared in both credentials and config"),
            });
        }

        let mut merged = config.clone();
        merged.extend(credentials.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self::decode(&merged)
    }

    /// Decode one flat object, dispatching on its `provider` field.
    pub fn decode(flat: &DynamicMap) -> Result<Self, CodecError> {
        let provider = match flat.get(PROVIDER_FIELD) {
            None | Some(DynamicValue::Null) => {
                return Err(CodecError::MissingDiscriminator {
                    field: PROVIDER_FIELD.to_string(),
                });
            }
            Some(DynamicValue::String(s)) => s.parse::<ConnectorProvider>()?,
            Some(other) => {
                return Err(CodecError::UnexpectedShape {
                    field: PROVIDER_FIELD.to_string(),
                    expected: DynamicKind::String,
                    found: other.kind(),
                });
            }
        };

        let mut flat = flat.clone();
        flat.insert(
            PROVIDER_FIELD.to_string(),
            DynamicValue::from(provider.as_str()),
        );

        Ok(match provider {
            ConnectorProvider::Adyen => ConnectorConfig::Adyen(decode_variant(provider, &flat)?),
            ConnectorProvider::Atlar => ConnectorConfig::Atlar(decode_variant(provider, &flat)?),
            ConnectorProvider::Bankingcircle => {
                ConnectorConfig::Bankingcircle(decode_variant(provider, &flat)?)
            }
            ConnectorProvider::Column => ConnectorConfig::Column(decode_variant(provider, &flat)?),
            ConnectorProvider::Currencycloud => {
                ConnectorConfig::Currencycloud(decode_variant(provider, &flat)?)
            }
            ConnectorProvider::Dummypay => ConnectorConfig::Dummypay(decode_variant(provider, &flat)?),
            ConnectorProvider::Generic => ConnectorConfig::Generic(decode_variant(provider, &flat)?),
            ConnectorProvider::Increase => ConnectorConfig::Increase(decode_variant(provider, &flat)?),
            ConnectorProvider::Mangopay => ConnectorConfig::Mangopay(decode_variant(provider, &flat)?),
            ConnectorProvider::Modulr => ConnectorConfig::Modulr(decode_variant(provider, &flat)?),
            ConnectorProvider::Moneycorp => {
                ConnectorConfig::Moneycorp(decode_variant(provider, &flat)?)
            }
            ConnectorProvider::Qonto => ConnectorConfig::Qonto(decode_variant(provider, &flat)?),
            ConnectorProvider::Stripe => ConnectorConfig::Stripe(decode_variant(provider, &flat)?),
            ConnectorProvider::Wise => ConnectorConfig::Wise(decode_variant(provider, &flat)?),
        })
    }

    pub fn provider(&self) -> ConnectorProvider {
        match self {
            ConnectorConfig::Adyen(_) => ConnectorProvider::Adyen,
            ConnectorConfig::Atlar(_) => ConnectorProvider::Atlar,
            ConnectorConfig::Bankingcircle(_) => ConnectorProvider::Bankingcircle,
            ConnectorConfig::Column(_) => ConnectorProvider::Column,
            ConnectorConfig::Currencycloud(_) => ConnectorProvider::Currencycloud,
            ConnectorConfig::Dummypay(_) => ConnectorProvider::Dummypay,
            ConnectorConfig::Generic(_) => ConnectorProvider::Generic,
            ConnectorConfig::Increase(_) => ConnectorProvider::Increase,
            ConnectorConfig::Mangopay(_) => ConnectorProvider::Mangopay,
            ConnectorConfig::Modulr(_) => ConnectorProvider::Modulr,
            ConnectorConfig::Moneycorp(_) => ConnectorProvider::Moneycorp,
            ConnectorConfig::Qonto(_) => ConnectorProvider::Qonto,
            ConnectorConfig::Stripe(_) => ConnectorProvider::Stripe,
            ConnectorConfig::Wise(_) => ConnectorProvider::Wise,
        }
    }

    pub fn common(&self) -> &CommonConfig {
        match self {
            ConnectorConfig::Adyen(c) => &c.common,
            ConnectorConfig::Atlar(c) => &c.common,
            ConnectorConfig::Bankingcircle(c) => &c.common,
            ConnectorConfig::Column(c) | ConnectorConfig::Generic(c) => &c.common,
            ConnectorConfig::Currencycloud(c) => &c.common,
            ConnectorConfig::Dummypay(c) => &c.common,
            ConnectorConfig::Increase(c) => &c.common,
            ConnectorConfig::Mangopay(c) | ConnectorConfig::Moneycorp(c) => &c.common,
            ConnectorConfig::Modulr(c) => &c.common,
            ConnectorConfig::Qonto(c) => &c.common,
            ConnectorConfig::Stripe(c) => &c.common,
            ConnectorConfig::Wise(c) => &c.common,
        }
    }

    /// Flat object sent to the payments module.
    pub fn encode(&self) -> Result<DynamicMap, CodecError> {
        let value = match self {
            ConnectorConfig::Adyen(c) => DynamicValue::from_typed(c)?,
            ConnectorConfig::Atlar(c) => DynamicValue::from_typed(c)?,
            ConnectorConfig::Bankingcircle(c) => DynamicValue::from_typed(c)?,
            ConnectorConfig::Column(c) | ConnectorConfig::Generic(c) => DynamicValue::from_typed(c)?,
            ConnectorConfig::Currencycloud(c) => DynamicValue::from_typed(c)?,
            ConnectorConfig::Dummypay(c) => DynamicValue::from_typed(c)?,
            ConnectorConfig::Increase(c) => DynamicValue::from_typed(c)?,
            ConnectorConfig::Mangopay(c) | ConnectorConfig::Moneycorp(c) => {
                DynamicValue::from_typed(c)?
            }
            ConnectorConfig::Modulr(c) => DynamicValue::from_typed(c)?,
            ConnectorConfig::Qonto(c) => DynamicValue::from_typed(c)?,
            ConnectorConfig::Stripe(c) => DynamicValue::from_typed(c)?,
            ConnectorConfig::Wise(c) => DynamicValue::from_typed(c)?,
        };

        match value {
            DynamicValue::Map(map) => Ok(map),
            other => Err(CodecError::UnexpectedShape {
                field: "connector".to_string(),
                expected: DynamicKind::Map,
                found: other.kind(),
            }),
        }
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("provider", &self.provider())
            .field("name", &self.common().name)
            .finish_non_exhaustive()
    }
}

/// Decode `flat` into the variant struct of `provider`.
///
/// The shape is checked first against a copy whose leaves are replaced by
/// placeholders, so the error text serde produces cannot contain a secret.
fn decode_variant<T: DeserializeOwned>(
    provider: ConnectorProvider,
    flat: &DynamicMap,
) -> Result<T, CodecError> {
    let placeholder = DynamicValue::Map(flat.iter().map(|(k, v)| (k.clone(), shape_of(v))).collect());

    if let Err(err) = serde_json::from_value::<T>(placeholder.encode()) {
        let reason = err.to_string();
        return Err(match missing_field(&reason) {
            Some(field) => CodecError::MissingField {
                discriminator: PROVIDER_FIELD.to_string(),
                value: provider.as_str().to_string(),
                field: field.to_string(),
            },
            None => CodecError::Invalid {
                context: format!("{} connector", provider.as_str()),
                reason,
            },
        });
    }

    serde_json::from_value::<T>(DynamicValue::Map(flat.clone()).encode()).map_err(|_| {
        CodecError::Invalid {
            context: format!("{} connector", provider.as_str()),
            reason: "configuration does not match the provider shape".to_string(),
        }
    })
}

/// Same structure, placeholder leaves.
fn shape_of(value: &DynamicValue) -> DynamicValue {
    match value {
        DynamicValue::Null => DynamicValue::Null,
        DynamicValue::Bool(_) => DynamicValue::Bool(false),
        DynamicValue::Int(_) => DynamicValue::Int(0),
        DynamicValue::Float(_) => DynamicValue::Float(0.5),
        DynamicValue::String(_) => DynamicValue::String(String::new()),
        DynamicValue::List(items) => DynamicValue::List(items.iter().map(shape_of).collect()),
        DynamicValue::Map(map) => {
            DynamicValue::Map(map.iter().map(|(k, v)| (k.clone(), shape_of(v))).collect())
        }
    }
}

fn missing_field(reason: &str) -> Option<&str> {
    reason.strip_prefix("missing field `")?.split('`').next()
}
