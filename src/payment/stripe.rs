use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::{CheckoutSession, NewCheckoutSession, PaymentError, PaymentGateway};

/// Stripe Checkout Sessions over the form-encoded REST API.
#[derive(Clone)]
pub struct StripeGateway {
    secret_key: String,
    api_base: String,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn read_error(response: reqwest::Response) -> PaymentError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        warn!(status, error = %message, "stripe api error");
        PaymentError::Api { status, message }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn provider_name(&self) -> &'static str {
        "Stripe"
    }

    #[instrument(skip(self, session), fields(items = session.line_items.len()))]
    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<serde_json::Value, PaymentError> {
        let params = form_params(&session);
        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, Some(""))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PaymentError::Decode(e.to_string()))?;
        info!(session_id = ?body.get("id"), "checkout session created");
        Ok(body)
    }

    #[instrument(skip(self))]
    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .client
            .get(format!("{}/checkout/sessions/{}", self.api_base, session_id))
            .basic_auth(&self.secret_key, Some(""))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| PaymentError::Decode(e.to_string()))
    }
}

/// Flatten a session request into Stripe's bracketed form keys.
pub fn form_params(session: &NewCheckoutSession) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), session.success_url.clone()),
        ("cancel_url".to_string(), session.cancel_url.clone()),
    ];

    if let Some(email) = &session.customer_email {
        params.push(("customer_email".to_string(), email.clone()));
    }

    for (i, item) in session.line_items.iter().enumerate() {
        let price = format!("line_items[{i}][price_data]");
        params.push((format!("{price}[currency]"), session.currency.clone()));
        params.push((format!("{price}[unit_amount]"), item.unit_amount.to_string()));
        params.push((format!("{price}[product_data][name]"), item.name.clone()));
        params.push((
            format!("{price}[product_data][description]"),
            item.description.clone(),
        ));
        if let Some(image) = &item.image {
            params.push((format!("{price}[product_data][images][0]"), image.clone()));
        }
        params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
    }

    for (key, value) in &session.metadata {
        params.push((format!("metadata[{key}]"), value.clone()));
    }

    params
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::payment::SessionLineItem;

    fn session() -> NewCheckoutSession {
        let mut metadata = BTreeMap::new();
        metadata.insert("user_id".to_string(), "7".to_string());
        NewCheckoutSession {
            currency: "inr".into(),
            line_items: vec![
                SessionLineItem {
                    name: "Phone".into(),
                    image: Some("https://img/phone.png".into()),
                    description: "Brand: Apple".into(),
                    unit_amount: 9999,
                    quantity: 2,
                },
                SessionLineItem {
                    name: "Case".into(),
                    image: None,
                    description: "Brand: N/A".into(),
                    unit_amount: 500,
                    quantity: 1,
                },
            ],
            customer_email: Some("buyer@example.com".into()),
            success_url: "http://shop/shipping/confirm?session_id={CHECKOUT_SESSION_ID}".into(),
            cancel_url: "http://shop/shipping/failed".into(),
            metadata,
        }
    }

    fn get<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn encodes_line_items_with_bracketed_keys() {
        let params = form_params(&session());
        assert_eq!(get(&params, "mode"), Some("payment"));
        assert_eq!(
            get(&params, "line_items[0][price_data][unit_amount]"),
            Some("9999")
        );
        assert_eq!(get(&params, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            get(&params, "line_items[0][price_data][product_data][images][0]"),
            Some("https://img/phone.png")
        );
        assert_eq!(
            get(&params, "line_items[1][price_data][product_data][description]"),
            Some("Brand: N/A")
        );
        assert_eq!(
            get(&params, "line_items[1][price_data][product_data][images][0]"),
            None
        );
        assert_eq!(get(&params, "metadata[user_id]"), Some("7"));
        assert_eq!(get(&params, "customer_email"), Some("buyer@example.com"));
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let gateway = StripeGateway::new("sk_test", "https://api.stripe.com/v1/");
        assert_eq!(gateway.api_base, "https://api.stripe.com/v1");
    }
}
