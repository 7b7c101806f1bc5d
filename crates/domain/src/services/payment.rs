//! Payment gateway abstraction.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use uuid::Uuid;

/// A line on the hosted checkout page. `unit_amount` is in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i64,
}

/// Parameters for a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub currency: String,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    /// Opaque key/value pairs echoed back on completion.
    pub metadata: BTreeMap<String, String>,
}

/// A created checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// A completed checkout reported by the payment processor.
#[derive(Debug, Clone)]
pub struct CheckoutCompleted {
    pub session_id: String,
    pub payment_status: String,
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutCompleted {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider rejected the request: {0}")]
    Rejected(String),

    #[error("Payment provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

/// Mock gateway for development and testing.
///
/// Returns deterministic-looking session ids and records every request.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    requests: Arc<Mutex<Vec<CheckoutSessionRequest>>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if self.simulate_failure {
            tracing::warn!("Mock payment gateway simulating failure");
            return Err(PaymentError::Unavailable("Simulated failure".to_string()));
        }

        let id = format!("cs_test_{}", Uuid::new_v4().simple());
        tracing::info!(
            session_id = %id,
            currency = %request.currency,
            line_items = request.line_items.len(),
            "Mock: Created checkout session"
        );

        Ok(CheckoutSession {
            url: format!("https://checkout.mock.local/pay/{}", id),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            currency: "usd".into(),
            line_items: vec![LineItem {
                name: "Photography".into(),
                unit_amount: 50000,
                quantity: 1,
            }],
            success_url: "https://app.local/success".into(),
            cancel_url: "https://app.local/cancel".into(),
            customer_email: None,
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_mock_gateway_creates_unique_sessions() {
        let gateway = MockPaymentGateway::new();
        let a = gateway.create_checkout_session(request()).await.unwrap();
        let b = gateway.create_checkout_session(request()).await.unwrap();

        assert!(a.id.starts_with("cs_test_"));
        assert!(a.url.ends_with(&a.id));
        assert_ne!(a.id, b.id);
        assert_eq!(gateway.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_gateway_failure() {
        let gateway = MockPaymentGateway::failing();
        assert!(gateway.create_checkout_session(request()).await.is_err());
    }

    #[test]
    fn test_completed_is_paid() {
        let mut completed = CheckoutCompleted {
            session_id: "cs_1".into(),
            payment_status: "unpaid".into(),
            metadata: BTreeMap::new(),
        };
        assert!(!completed.is_paid());
        completed.payment_status = "paid".into();
        assert!(completed.is_paid());
    }
}
