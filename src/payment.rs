use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;

/// Currency of every payment intent.
pub const CURRENCY: &str = "usd";

/// PaymentService Contract
///
/// Requests a payment intent from the external processor. Swappable between the
/// real HTTP client and `MockPaymentService` in tests.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Creates an intent for `amount` minor currency units (cents) and returns
    /// the client secret the browser confirms the card payment with.
    async fn create_payment_intent(&self, amount: i64) -> Result<String, AppError>;
}

/// PaymentState
///
/// The shared handle to the payment adapter held in `AppState`.
pub type PaymentState = Arc<dyn PaymentService>;

/// to_minor_units
///
/// Converts a listing price into integer cents. Rejects non-finite and
/// non-positive prices, which the processor would refuse anyway.
pub fn to_minor_units(price: f64) -> Result<i64, AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::BadRequest(
            "price must be a positive number".to_string(),
        ));
    }
    Ok((price * 100.0).round() as i64)
}

#[derive(Deserialize)]
struct PaymentIntentBody {
    client_secret: String,
}

#[derive(Deserialize)]
struct ProcessorErrorBody {
    error: ProcessorErrorDetail,
}

#[derive(Deserialize)]
struct ProcessorErrorDetail {
    message: String,
}

/// StripePaymentClient
///
/// `reqwest`-backed client for the Stripe-compatible `/v1/payment_intents`
/// endpoint (form-encoded request, bearer secret key).
#[derive(Clone)]
pub struct StripePaymentClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripePaymentClient {
    pub fn new(base_url: &str, secret_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

#[async_trait]
impl PaymentService for StripePaymentClient {
    async fn create_payment_intent(&self, amount: i64) -> Result<String, AppError> {
        let url = format!("{}/v1/payment_intents", self.base_url);
        let amount = amount.to_string();

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", CURRENCY),
                ("payment_method_types[]", "card"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Payment(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ProcessorErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| format!("processor returned {status}"));
            return Err(AppError::Payment(message));
        }

        let intent = response
            .json::<PaymentIntentBody>()
            .await
            .map_err(|e| AppError::Payment(e.to_string()))?;

        tracing::info!(amount = %amount, "payment intent created");
        Ok(intent.client_secret)
    }
}

/// MockPaymentService
///
/// Deterministic stand-in for tests: echoes the amount into a fake client secret.
#[derive(Clone, Default)]
pub struct MockPaymentService {
    /// When true, every request fails as if the processor were down.
    pub should_fail: bool,
}

impl MockPaymentService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl PaymentService for MockPaymentService {
    async fn create_payment_intent(&self, amount: i64) -> Result<String, AppError> {
        if self.should_fail {
            return Err(AppError::Payment(
                "Mock Payment Error: Simulation requested".to_string(),
            ));
        }
        Ok(format!("pi_mock_{amount}_secret_test"))
    }
}
