use {
    crate::domain::error::BillingError,
    serde::{Deserialize, Serialize},
};

/// Thin client for the Creem REST API: hosted checkout and billing
/// portal creation. No retries here — callers surface failures to the
/// user, who can simply try again.
pub struct CreemClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutParams {
    pub product_id: String,
    pub user_id: String,
    pub email: String,
    pub product_type: String,
    pub credits: Option<i64>,
    pub success_url: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CheckoutBody {
    pub product_id: String,
    pub customer: CheckoutCustomer,
    pub metadata: CheckoutMetadata,
    pub success_url: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CheckoutCustomer {
    pub email: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CheckoutMetadata {
    pub user_id: String,
    pub product_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub checkout_url: String,
}

#[derive(Debug, Deserialize)]
pub struct PortalSession {
    pub customer_portal_link: String,
}

pub fn checkout_body(params: &CheckoutParams) -> CheckoutBody {
    CheckoutBody {
        product_id: params.product_id.clone(),
        customer: CheckoutCustomer {
            email: params.email.clone(),
        },
        metadata: CheckoutMetadata {
            user_id: params.user_id.clone(),
            product_type: params.product_type.clone(),
            credits: params.credits,
        },
        success_url: params.success_url.clone(),
    }
}

impl CreemClient {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
        }
    }

    pub async fn create_checkout(
        &self,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, BillingError> {
        self.post("/v1/checkouts", &checkout_body(params)).await
    }

    pub async fn create_customer_portal(
        &self,
        customer_id: &str,
    ) -> Result<PortalSession, BillingError> {
        self.post(
            "/v1/customers/billing",
            &serde_json::json!({"customer_id": customer_id}),
        )
        .await
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, BillingError>
    where
        B: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.api_url, path);
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| BillingError::Provider(format!("creem request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body, path, "creem api error");
            return Err(BillingError::Provider(format!(
                "creem returned {status} for {path}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BillingError::Provider(format!("creem response decode: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_body_carries_user_and_credits_metadata() {
        let body = checkout_body(&CheckoutParams {
            product_id: "prod_credits".into(),
            user_id: "u1".into(),
            email: "a@b.c".into(),
            product_type: "credits".into(),
            credits: Some(500),
            success_url: "https://app.example/billing/done".into(),
        });

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["product_id"], "prod_credits");
        assert_eq!(json["customer"]["email"], "a@b.c");
        assert_eq!(json["metadata"]["user_id"], "u1");
        assert_eq!(json["metadata"]["product_type"], "credits");
        assert_eq!(json["metadata"]["credits"], 500);
        assert_eq!(json["success_url"], "https://app.example/billing/done");
    }

    #[test]
    fn checkout_body_omits_credits_for_plans() {
        let body = checkout_body(&CheckoutParams {
            product_id: "prod_pro".into(),
            user_id: "u1".into(),
            email: "a@b.c".into(),
            product_type: "subscription".into(),
            credits: None,
            success_url: "https://app.example/billing/done".into(),
        });

        let json = serde_json::to_value(&body).unwrap();
        assert!(json["metadata"].get("credits").is_none());
    }
}
