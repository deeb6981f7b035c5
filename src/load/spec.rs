use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::args::{HttpMethod, PositiveU64, PositiveUsize};
use crate::error::ValidationError;

/// Validated description of one load-test run. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    url: String,
    method: HttpMethod,
    payload: Value,
    auth_header: Option<String>,
    total_requests: PositiveU64,
    concurrency: PositiveUsize,
}

impl RequestSpec {
    /// Builds a spec with an empty JSON object payload and no auth header.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL is empty.
    pub fn new(
        url: impl Into<String>,
        method: HttpMethod,
        total_requests: PositiveU64,
        concurrency: PositiveUsize,
    ) -> Result<Self, ValidationError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        Ok(Self {
            url,
            method,
            payload: Value::Object(Map::new()),
            auth_header: None,
            total_requests,
            concurrency,
        })
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// An empty header value is treated as absent.
    #[must_use]
    pub fn with_auth_header(mut self, auth_header: Option<String>) -> Self {
        self.auth_header = auth_header.filter(|value| !value.is_empty());
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// The payload to send as the request body, if this method carries one.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        if self.method.sends_body() {
            Some(&self.payload)
        } else {
            None
        }
    }

    #[must_use]
    pub fn auth_header(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    #[must_use]
    pub const fn total_requests(&self) -> u64 {
        self.total_requests.get()
    }

    #[must_use]
    pub const fn concurrency(&self) -> PositiveUsize {
        self.concurrency
    }
}

/// A request count as it arrives over the wire: a JSON number or a numeric
/// string such as `"10"` from a form field. Floats and exponent notation are
/// accepted when they denote a whole number (`10.0`, `"1e3"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CountValue {
    Number(Number),
    Text(String),
}

impl CountValue {
    fn to_u64(&self, field: &'static str) -> Result<u64, ValidationError> {
        let parsed = match self {
            CountValue::Number(number) => number
                .as_u64()
                .or_else(|| integral_from_decimal(&number.to_string())),
            CountValue::Text(text) => integral_from_decimal(text.trim()),
        };
        parsed.ok_or_else(|| ValidationError::InvalidCount {
            field,
            value: self.to_string(),
        })
    }
}

impl std::fmt::Display for CountValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountValue::Number(number) => write!(f, "{}", number),
            CountValue::Text(text) => write!(f, "'{}'", text),
        }
    }
}

impl From<u64> for CountValue {
    fn from(value: u64) -> Self {
        CountValue::Number(Number::from(value))
    }
}

/// Input object of `POST /api/test`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub total_requests: Option<CountValue>,
    #[serde(default)]
    pub concurrency: Option<CountValue>,
    #[serde(default)]
    pub auth_header: Option<String>,
}

impl TestRequest {
    /// Validates the wire object into a [`RequestSpec`].
    ///
    /// # Errors
    ///
    /// Returns an error when the URL is missing or empty, the method is not
    /// GET/POST/PUT/DELETE, or a count is missing, non-numeric, or below 1.
    pub fn into_spec(self) -> Result<RequestSpec, ValidationError> {
        let url = self.url.ok_or(ValidationError::MissingUrl)?;
        let method: HttpMethod = self
            .method
            .as_deref()
            .unwrap_or_default()
            .parse()?;
        let total_requests = positive_count(self.total_requests.as_ref(), "totalRequests")?;
        let concurrency = positive_count(self.concurrency.as_ref(), "concurrency")?;
        let concurrency = usize::try_from(concurrency.get())
            .map_err(|_overflow| ValidationError::CountOutOfRange {
                field: "concurrency",
            })
            .and_then(PositiveUsize::try_from)?;

        let spec = RequestSpec::new(url, method, total_requests, concurrency)?
            .with_auth_header(self.auth_header);
        Ok(match self.payload {
            Some(payload) => spec.with_payload(payload),
            None => spec,
        })
    }
}

fn positive_count(
    value: Option<&CountValue>,
    field: &'static str,
) -> Result<PositiveU64, ValidationError> {
    let value = value.ok_or(ValidationError::InvalidCount {
        field,
        value: "nothing".to_owned(),
    })?;
    let count = value.to_u64(field)?;
    PositiveU64::try_from(count).map_err(|_zero| ValidationError::InvalidCount {
        field,
        value: count.to_string(),
    })
}

/// Reads decimal text such as `10`, `+7`, `10.0` or `1.5e3` as an exact
/// non-negative integer. A non-zero fractional remainder yields `None`.
fn integral_from_decimal(text: &str) -> Option<u64> {
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().ok()?),
        None => (unsigned, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole
        .bytes()
        .chain(fraction.bytes())
        .all(|byte| byte.is_ascii_digit())
    {
        return None;
    }

    let joined: String = whole.chars().chain(fraction.chars()).collect();
    let significant = joined.trim_start_matches('0');
    let shift = exponent.checked_sub(i32::try_from(fraction.len()).ok()?)?;

    if shift >= 0 {
        if significant.is_empty() {
            return Some(0);
        }
        let scale = 10_u64.checked_pow(u32::try_from(shift).ok()?)?;
        significant.parse::<u64>().ok()?.checked_mul(scale)
    } else {
        let dropped_len = usize::try_from(shift.unsigned_abs()).ok()?;
        let cut = significant.len().saturating_sub(dropped_len);
        let (kept, dropped) = significant.split_at_checked(cut)?;
        if !dropped.bytes().all(|byte| byte == b'0') {
            return None;
        }
        if kept.is_empty() {
            Some(0)
        } else {
            kept.parse::<u64>().ok()
        }
    }
}
