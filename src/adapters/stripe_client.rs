use crate::domain::error::BillingError;

/// Outbound Stripe calls: hosted checkout and the billing portal.
pub struct StripeClient {
    client: stripe::Client,
}

#[derive(Debug, Clone)]
pub struct CheckoutParams {
    pub price_id: String,
    pub user_id: String,
    pub customer_id: Option<String>,
    pub subscription: bool,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug)]
pub struct HostedSession {
    pub id: String,
    pub url: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: stripe::Client::new(secret_key),
        }
    }

    pub async fn create_checkout(
        &self,
        params: &CheckoutParams,
    ) -> Result<HostedSession, BillingError> {
        let mut create = stripe::CreateCheckoutSession::new();
        create.line_items = Some(vec![stripe::CreateCheckoutSessionLineItems {
            price: Some(params.price_id.clone()),
            quantity: Some(1),
            ..Default::default()
        }]);
        create.mode = Some(if params.subscription {
            stripe::CheckoutSessionMode::Subscription
        } else {
            stripe::CheckoutSessionMode::Payment
        });
        create.success_url = Some(&params.success_url);
        create.cancel_url = Some(&params.cancel_url);
        create.metadata = Some(
            [
                ("user_id".to_string(), params.user_id.clone()),
                ("price_id".to_string(), params.price_id.clone()),
            ]
            .into(),
        );
        if let Some(ref customer_id) = params.customer_id {
            create.customer = Some(
                customer_id
                    .parse()
                    .map_err(|_| BillingError::InvalidInput(format!("bad customer id: {customer_id}")))?,
            );
        }

        let session = stripe::CheckoutSession::create(&self.client, create)
            .await
            .map_err(|e| BillingError::Provider(format!("stripe checkout: {e}")))?;

        let url = session
            .url
            .ok_or_else(|| BillingError::Provider("checkout session has no url".into()))?;
        Ok(HostedSession {
            id: session.id.to_string(),
            url,
        })
    }

    pub async fn create_customer_portal(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, BillingError> {
        let customer = customer_id
            .parse()
            .map_err(|_| BillingError::InvalidInput(format!("bad customer id: {customer_id}")))?;
        let mut create = stripe::CreateBillingPortalSession::new(customer);
        create.return_url = Some(return_url);

        let session = stripe::BillingPortalSession::create(&self.client, create)
            .await
            .map_err(|e| BillingError::Provider(format!("stripe portal: {e}")))?;

        Ok(session.url)
    }
}
