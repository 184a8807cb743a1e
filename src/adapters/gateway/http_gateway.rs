//! HTTP payment gateway adapter.
//!
//! Implements `PaymentGateway` against a JSON request/verify API:
//!
//! - `POST {base}/pg/v4/payment/request.json` opens a charge and returns an
//!   authority; the user pays at `{start_pay_url}{authority}`
//! - `POST {base}/pg/v4/payment/verify.json` verifies it
//!
//! # Result codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 100 | Success (charge opened / payment verified) |
//! | 101 | Payment was already verified |
//! | other | Refused; the code and message are passed through |
//!
//! # Security
//!
//! The merchant id is held as a `secrecy::SecretString` and only exposed when
//! building request bodies.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::AuthorityToken;
use crate::domain::subscription::GatewayError;
use crate::ports::{OpenChargeRequest, OpenedCharge, PaymentGateway, VerifyOutcome};

const CODE_SUCCESS: i32 = 100;
const CODE_ALREADY_VERIFIED: i32 = 101;

/// Gateway API configuration.
#[derive(Clone)]
pub struct HttpGatewayConfig {
    merchant_id: SecretString,

    /// Base URL for API calls.
    base_url: String,

    /// Prefix the authority is appended to for the user redirect.
    start_pay_url: String,
}

impl HttpGatewayConfig {
    pub fn new(merchant_id: impl Into<String>) -> Self {
        Self {
            merchant_id: SecretString::new(merchant_id.into()),
            base_url: "https://api.zarinpal.com".to_string(),
            start_pay_url: "https://www.zarinpal.com/pg/StartPay/".to_string(),
        }
    }

    /// Set a custom API base URL (sandbox or testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the redirect prefix.
    pub fn with_start_pay_url(mut self, url: impl Into<String>) -> Self {
        self.start_pay_url = url.into();
        self
    }

    fn request_url(&self) -> String {
        format!("{}/pg/v4/payment/request.json", self.base_url)
    }

    fn verify_url(&self) -> String {
        format!("{}/pg/v4/payment/verify.json", self.base_url)
    }

    fn redirect_url(&self, authority: &AuthorityToken) -> String {
        format!("{}{}", self.start_pay_url, authority)
    }
}

/// Payment gateway adapter over HTTP.
pub struct HttpPaymentGateway {
    config: HttpGatewayConfig,
    http_client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(config: HttpGatewayConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<GatewayEnvelope, GatewayError> {
        let response = self
            .http_client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        // Refusals come back as 4xx with a normal envelope, so parse first.
        serde_json::from_str::<GatewayEnvelope>(&text).map_err(|e| {
            tracing::warn!(status = %status, error = %e, "Unparseable gateway response");
            GatewayError::InvalidResponse(format!("HTTP {}: {}", status, e))
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Wire Types
// ════════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct RequestBody<'a> {
    merchant_id: &'a str,
    amount: i64,
    callback_url: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct VerifyBody<'a> {
    merchant_id: &'a str,
    amount: i64,
    authority: &'a str,
}

/// `data` and `errors` are each either an object or an empty array.
#[derive(Debug, Deserialize)]
struct GatewayEnvelope {
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    errors: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    authority: Option<String>,
    #[serde(default)]
    ref_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    code: i32,
    #[serde(default)]
    message: String,
}

/// Either the success payload or the refusal, whichever the envelope carries.
enum Answer {
    Data(ResultData),
    Refused(ErrorData),
}

impl GatewayEnvelope {
    fn answer(self) -> Result<Answer, GatewayError> {
        if self.errors.is_object() {
            let error: ErrorData = serde_json::from_value(self.errors)
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
            return Ok(Answer::Refused(error));
        }
        if self.data.is_object() {
            let data: ResultData = serde_json::from_value(self.data)
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
            return Ok(Answer::Data(data));
        }
        Err(GatewayError::InvalidResponse(
            "response carries neither data nor errors".to_string(),
        ))
    }
}

/// Reference ids arrive as numbers from some gateway versions, strings from others.
fn reference_id(value: Option<serde_json::Value>) -> Result<String, GatewayError> {
    match value {
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(GatewayError::InvalidResponse(
            "verified payment without ref_id".to_string(),
        )),
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn open_charge(&self, request: OpenChargeRequest) -> Result<OpenedCharge, GatewayError> {
        let body = RequestBody {
            merchant_id: self.config.merchant_id.expose_secret(),
            amount: request.amount,
            callback_url: &request.callback_url,
            description: &request.description,
        };

        match self.post(&self.config.request_url(), &body).await?.answer()? {
            Answer::Data(data) if data.code == CODE_SUCCESS => {
                let authority = data
                    .authority
                    .ok_or_else(|| GatewayError::InvalidResponse("missing authority".to_string()))
                    .and_then(|a| {
                        AuthorityToken::new(a)
                            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
                    })?;
                Ok(OpenedCharge {
                    redirect_url: self.config.redirect_url(&authority),
                    authority,
                })
            }
            Answer::Data(data) => Err(GatewayError::Refused {
                code: data.code,
                message: data.message,
            }),
            Answer::Refused(error) => {
                tracing::warn!(code = error.code, message = %error.message, "Gateway refused charge");
                Err(GatewayError::Refused {
                    code: error.code,
                    message: error.message,
                })
            }
        }
    }

    async fn verify_charge(
        &self,
        amount: i64,
        authority: &AuthorityToken,
    ) -> Result<VerifyOutcome, GatewayError> {
        let body = VerifyBody {
            merchant_id: self.config.merchant_id.expose_secret(),
            amount,
            authority: authority.as_str(),
        };

        match self.post(&self.config.verify_url(), &body).await?.answer()? {
            Answer::Data(data) if data.code == CODE_SUCCESS => Ok(VerifyOutcome::Verified {
                reference_id: reference_id(data.ref_id)?,
            }),
            Answer::Data(data) if data.code == CODE_ALREADY_VERIFIED => {
                Ok(VerifyOutcome::AlreadyVerified {
                    reference_id: reference_id(data.ref_id).unwrap_or_default(),
                })
            }
            Answer::Data(data) => Ok(VerifyOutcome::Rejected {
                code: data.code,
                message: data.message,
            }),
            Answer::Refused(error) => Ok(VerifyOutcome::Rejected {
                code: error.code,
                message: error.message,
            }),
        }
    }
}
