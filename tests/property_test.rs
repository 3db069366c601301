use billing_sync::domain::status::{PaymentStatus, PlanInterval};
use billing_sync::domain::subscription::SubscriptionState;
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

fn arb_status() -> impl Strategy<Value = PaymentStatus> {
    use PaymentStatus::*;
    prop_oneof![
        Just(Active),
        Just(Canceled),
        Just(Incomplete),
        Just(IncompleteExpired),
        Just(PastDue),
        Just(Paused),
        Just(Trialing),
        Just(Unpaid),
    ]
}

fn arb_ts() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

fn sub_with(
    status: PaymentStatus,
    canceled_at: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
) -> SubscriptionState {
    SubscriptionState {
        provider: "creem",
        subscription_id: "sub_p".into(),
        customer_id: "cus_p".into(),
        price_id: "prod_p".into(),
        status,
        interval: None,
        period_start: None,
        period_end,
        trial_start: None,
        trial_end: None,
        canceled_at,
        metadata: serde_json::json!({}),
    }
}

proptest! {
    /// Terminal states never transition anywhere.
    #[test]
    fn terminal_states_reject_all_transitions(target in arb_status()) {
        use PaymentStatus::*;
        for terminal in [Canceled, IncompleteExpired] {
            prop_assert!(!terminal.can_transition_to(&target));
        }
    }

    /// A status never transitions to itself — "same status" is not a
    /// lifecycle step.
    #[test]
    fn no_self_transitions(status in arb_status()) {
        prop_assert!(!status.can_transition_to(&status));
    }

    /// Only active, trialing and past_due grant entitlement.
    #[test]
    fn access_implies_live_status(status in arb_status()) {
        use PaymentStatus::*;
        prop_assert_eq!(
            status.grants_access(),
            matches!(status, Active | Trialing | PastDue)
        );
    }

    /// as_str → try_from roundtrip is identity for any status.
    #[test]
    fn status_roundtrip(status in arb_status()) {
        let roundtripped = PaymentStatus::try_from(status.as_str()).unwrap();
        prop_assert_eq!(roundtripped, status);
    }

    /// Mapping never fails: any provider string and any event hint land on
    /// some canonical status.
    #[test]
    fn creem_mapping_is_total(
        object_status in "[a-z_.]{0,20}",
        hint in proptest::option::of("[a-z.]{0,30}"),
    ) {
        let status = PaymentStatus::from_creem(&object_status, hint.as_deref());
        // Must be representable in storage vocabulary.
        prop_assert_eq!(PaymentStatus::try_from(status.as_str()).unwrap(), status);
    }

    /// Interval parsing never invents a value: a Some result means the
    /// raw string actually mentioned the unit.
    #[test]
    fn interval_parse_is_conservative(raw in "[a-zA-Z-]{0,20}") {
        let lower = raw.to_ascii_lowercase();
        match PlanInterval::parse(&raw) {
            Some(PlanInterval::Month) => prop_assert!(lower.contains("month")),
            Some(PlanInterval::Year) => prop_assert!(lower.contains("year")),
            None => prop_assert!(!lower.contains("month") && !lower.contains("year")),
        }
    }

    /// cancel_at_period_end holds exactly when the subscription is
    /// canceled with a timestamp at or before the period end.
    #[test]
    fn cancel_flag_derivation(
        status in arb_status(),
        canceled_at in proptest::option::of(arb_ts()),
        period_end in proptest::option::of(arb_ts()),
    ) {
        let sub = sub_with(status, canceled_at, period_end);
        let expected = status == PaymentStatus::Canceled
            && matches!((canceled_at, period_end), (Some(c), Some(p)) if c <= p);
        prop_assert_eq!(sub.cancel_at_period_end(), expected);
    }
}
