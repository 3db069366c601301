use {
    super::error::BillingError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Canonical subscription/order status. Both providers are normalized
/// onto this vocabulary before anything is persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Active,
    Canceled,
    Incomplete,
    IncompleteExpired,
    PastDue,
    Paused,
    Trialing,
    Unpaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::PastDue => "past_due",
            Self::Paused => "paused",
            Self::Trialing => "trialing",
            Self::Unpaid => "unpaid",
        }
    }

    /// Canonical lifecycle:
    /// incomplete → trialing → active ⇄ past_due → canceled,
    /// plus active → canceled and trialing → canceled.
    /// Used to flag anomalies in the audit log, not to block updates —
    /// reconciliation is last-write-wins.
    pub fn can_transition_to(&self, next: &PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Incomplete, Trialing)
                | (Incomplete, Active)
                | (Incomplete, IncompleteExpired)
                | (Trialing, Active)
                | (Trialing, Canceled)
                | (Trialing, Paused)
                | (Active, PastDue)
                | (Active, Canceled)
                | (Active, Paused)
                | (PastDue, Active)
                | (PastDue, Canceled)
                | (PastDue, Unpaid)
                | (Paused, Active)
                | (Paused, Canceled)
                | (Unpaid, Canceled)
                | (Unpaid, Active)
        )
    }

    /// True while the subscription still grants entitlement.
    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing | Self::PastDue)
    }

    /// Creem exposes a narrow 3-value status on the object but emits
    /// richer event types. The event type carries the real state-machine
    /// position, so it wins over the snapshot when supplied.
    pub fn from_creem(object_status: &str, event_hint: Option<&str>) -> PaymentStatus {
        if let Some(hint) = event_hint
            && let Some(status) = Self::from_creem_event(hint)
        {
            return status;
        }
        Self::from_creem_object(object_status)
    }

    fn from_creem_event(event_type: &str) -> Option<PaymentStatus> {
        match event_type {
            "subscription.active" | "subscription.paid" => Some(Self::Active),
            "subscription.trialing" => Some(Self::Trialing),
            "subscription.unpaid" => Some(Self::Unpaid),
            "subscription.paused" => Some(Self::Paused),
            // Expired is a provider-side terminal state; canonically the
            // subscription is canceled either way.
            "subscription.canceled" | "subscription.expired" => Some(Self::Canceled),
            _ => None,
        }
    }

    fn from_creem_object(status: &str) -> PaymentStatus {
        match status {
            "active" | "paid" => Self::Active,
            "canceled" | "expired" => Self::Canceled,
            "incomplete" => Self::Incomplete,
            "past_due" => Self::PastDue,
            "paused" => Self::Paused,
            "trialing" => Self::Trialing,
            "unpaid" => Self::Unpaid,
            other => {
                // Fail-open: unknown provider vocabulary keeps the
                // subscription serviceable and surfaces in the logs.
                tracing::warn!(status = other, "unknown creem status, defaulting to active");
                Self::Active
            }
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = BillingError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "active" => Ok(Self::Active),
            "canceled" => Ok(Self::Canceled),
            "incomplete" => Ok(Self::Incomplete),
            "incomplete_expired" => Ok(Self::IncompleteExpired),
            "past_due" => Ok(Self::PastDue),
            "paused" => Ok(Self::Paused),
            "trialing" => Ok(Self::Trialing),
            "unpaid" => Ok(Self::Unpaid),
            other => Err(BillingError::InvalidInput(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanInterval {
    Month,
    Year,
}

impl PlanInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Providers send free-form interval strings ("monthly",
    /// "every-month", "year"). Matched by substring; anything else is
    /// `None` with a warning — never guessed.
    pub fn parse(raw: &str) -> Option<PlanInterval> {
        let raw_lower = raw.to_ascii_lowercase();
        if raw_lower.contains("month") {
            Some(Self::Month)
        } else if raw_lower.contains("year") {
            Some(Self::Year)
        } else {
            tracing::warn!(interval = raw, "unrecognized billing interval");
            None
        }
    }
}

impl TryFrom<&str> for PlanInterval {
    type Error = BillingError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(BillingError::InvalidInput(format!(
                "unknown plan interval: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Subscription,
    OneTime,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::OneTime => "one_time",
        }
    }

    /// Billing type feeds best-effort bookkeeping, not a security check:
    /// unknown values default to subscription with a warning.
    pub fn from_billing_type(raw: &str) -> PaymentType {
        match raw {
            "recurring" | "subscription" => Self::Subscription,
            "one_time" | "onetime" | "one-time" => Self::OneTime,
            other => {
                tracing::warn!(billing_type = other, "unknown billing type, defaulting to subscription");
                Self::Subscription
            }
        }
    }
}

impl TryFrom<&str> for PaymentType {
    type Error = BillingError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "subscription" => Ok(Self::Subscription),
            "one_time" => Ok(Self::OneTime),
            other => Err(BillingError::InvalidInput(format!(
                "unknown payment type: {other}"
            ))),
        }
    }
}
