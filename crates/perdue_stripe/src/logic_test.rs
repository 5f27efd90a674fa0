// --- File: crates/perdue_stripe/src/logic_test.rs ---
#[cfg(test)]
mod tests {
    use crate::error::{ReservationError, StripeError};
    use crate::logic::*;
    use axum::{routing::post, Json, Router};
    use chrono::{TimeZone, Utc};
    use hmac::{Hmac, Mac};
    use perdue_common::{BoxFuture, BoxedError, ReservationLedger};
    use perdue_config::{ReservationConfig, StripeConfig};
    use serde_json::{json, Value};
    use sha2::Sha256;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn rules() -> ReservationConfig {
        ReservationConfig::default()
    }

    // 2025-06-06 is a Friday, 06-07 a Saturday, 06-08 a Sunday, 06-09 a Monday.
    fn valid_request() -> ReservationRequest {
        ReservationRequest {
            name: Some("Ada".to_string()),
            email: Some("ada@example.com".to_string()),
            date: Some("2025-06-07".to_string()),
            time: Some("20:30".to_string()),
            party_size: Some(json!(2)),
            celebration: Some("anniversary".to_string()),
        }
    }

    // --- Validation ---

    #[test]
    fn valid_request_passes() {
        let reservation = validate_reservation(&valid_request(), &rules()).unwrap();
        assert_eq!(reservation.name, "Ada");
        assert_eq!(reservation.party_size, 2);
        assert_eq!(reservation.celebration, "anniversary");
    }

    #[test]
    fn party_size_as_numeric_string_is_coerced() {
        let mut request = valid_request();
        request.party_size = Some(json!("2"));
        assert!(validate_reservation(&request, &rules()).is_ok());
    }

    #[test]
    fn missing_celebration_becomes_empty_string() {
        let mut request = valid_request();
        request.celebration = None;
        let reservation = validate_reservation(&request, &rules()).unwrap();
        assert_eq!(reservation.celebration, "");
    }

    #[test]
    fn absent_field_is_rejected() {
        for strip in 0..5 {
            let mut request = valid_request();
            match strip {
                0 => request.name = None,
                1 => request.email = None,
                2 => request.date = None,
                3 => request.time = None,
                _ => request.party_size = None,
            }
            assert_eq!(
                validate_reservation(&request, &rules()),
                Err(ReservationError::MissingFields)
            );
        }
    }

    #[test]
    fn empty_string_field_counts_as_missing() {
        let mut request = valid_request();
        request.name = Some(String::new());
        assert_eq!(
            validate_reservation(&request, &rules()),
            Err(ReservationError::MissingFields)
        );
    }

    #[test]
    fn zero_party_size_counts_as_missing() {
        let mut request = valid_request();
        request.party_size = Some(json!(0));
        assert_eq!(
            validate_reservation(&request, &rules()),
            Err(ReservationError::MissingFields)
        );
    }

    #[test]
    fn wrong_party_size_is_rejected() {
        let mut request = valid_request();
        request.party_size = Some(json!(4));
        assert_eq!(
            validate_reservation(&request, &rules()),
            Err(ReservationError::PartySize)
        );
    }

    #[test]
    fn non_numeric_party_size_is_rejected() {
        let mut request = valid_request();
        request.party_size = Some(json!("four"));
        assert_eq!(
            validate_reservation(&request, &rules()),
            Err(ReservationError::PartySize)
        );
    }

    #[test]
    fn weekday_dates_are_rejected() {
        let mut request = valid_request();
        request.date = Some("2025-06-09".to_string()); // Monday
        assert_eq!(
            validate_reservation(&request, &rules()),
            Err(ReservationError::DisallowedDate)
        );
    }

    #[test]
    fn friday_and_sunday_are_allowed() {
        for date in ["2025-06-06", "2025-06-08"] {
            let mut request = valid_request();
            request.date = Some(date.to_string());
            assert!(validate_reservation(&request, &rules()).is_ok(), "{date}");
        }
    }

    #[test]
    fn unparseable_date_is_rejected() {
        let mut request = valid_request();
        request.date = Some("June 7th".to_string());
        assert_eq!(
            validate_reservation(&request, &rules()),
            Err(ReservationError::DisallowedDate)
        );
    }

    #[test]
    fn disallowed_time_is_rejected() {
        for time in ["19:30", "18:31", "18:30:00"] {
            let mut request = valid_request();
            request.time = Some(time.to_string());
            assert_eq!(
                validate_reservation(&request, &rules()),
                Err(ReservationError::DisallowedTime),
                "{time}"
            );
        }
    }

    #[test]
    fn both_seatings_are_allowed() {
        for time in ["18:30", "20:30"] {
            let mut request = valid_request();
            request.time = Some(time.to_string());
            assert!(validate_reservation(&request, &rules()).is_ok(), "{time}");
        }
    }

    #[test]
    fn rejection_messages_are_the_wire_contract() {
        assert_eq!(ReservationError::PartySize.to_string(), "Party size must be 2");
        assert_eq!(
            ReservationError::DisallowedDate.to_string(),
            "Date must be Fri, Sat, or Sun"
        );
        assert_eq!(
            ReservationError::DisallowedTime.to_string(),
            "Time must be 18:30 or 20:30"
        );
        assert_eq!(
            ReservationError::MissingFields.to_string(),
            "Missing required fields"
        );
    }

    // --- Signature verification ---

    fn now_ts() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_verifies() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_test", now_ts());
        assert!(verify_stripe_signature(payload, Some(&header), "whsec_test").is_ok());
    }

    #[test]
    fn tampered_payload_fails() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_test", now_ts());
        let tampered = br#"{"id":"evt_2"}"#;
        assert!(matches!(
            verify_stripe_signature(tampered, Some(&header), "whsec_test"),
            Err(StripeError::WebhookSignatureError(_))
        ));
    }

    #[test]
    fn missing_header_fails() {
        assert!(matches!(
            verify_stripe_signature(b"{}", None, "whsec_test"),
            Err(StripeError::WebhookSignatureError(_))
        ));
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_other", now_ts());
        assert!(verify_stripe_signature(payload, Some(&header), "whsec_test").is_err());
    }

    #[test]
    fn garbage_header_fails() {
        assert!(verify_stripe_signature(b"{}", Some("v1only=abc"), "whsec_test").is_err());
    }

    #[test]
    fn stale_timestamp_fails() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_test", now_ts() - 3600);
        assert!(matches!(
            verify_stripe_signature(payload, Some(&header), "whsec_test"),
            Err(StripeError::WebhookSignatureError(msg)) if msg.contains("tolerance")
        ));
    }

    #[test]
    fn extra_v1_candidates_are_tried() {
        let payload = br#"{"id":"evt_1"}"#;
        let good = sign(payload, "whsec_test", now_ts());
        let header = format!("{good},v1=deadbeef");
        assert!(verify_stripe_signature(payload, Some(&header), "whsec_test").is_ok());
    }

    // --- Ledger rows ---

    fn completed_session() -> StripeCheckoutSessionObject {
        let mut metadata = HashMap::new();
        metadata.insert("name".to_string(), "Ada".to_string());
        metadata.insert("date".to_string(), "2025-06-07".to_string());
        metadata.insert("time".to_string(), "20:30".to_string());
        metadata.insert("partySize".to_string(), "2".to_string());
        metadata.insert("celebration".to_string(), "anniversary".to_string());
        StripeCheckoutSessionObject {
            id: "cs_test_123".to_string(),
            amount_total: Some(5000),
            currency: Some("usd".to_string()),
            customer_email: Some("ada@example.com".to_string()),
            customer_details: None,
            metadata: Some(metadata),
            payment_intent: Some("pi_test_456".to_string()),
            payment_status: Some("paid".to_string()),
        }
    }

    #[test]
    fn ledger_row_has_canonical_field_order() {
        let recorded_at = Utc.with_ymd_and_hms(2025, 6, 7, 18, 45, 0).unwrap();
        let row = build_ledger_row(&completed_session(), recorded_at);
        assert_eq!(
            row,
            vec![
                json!("2025-06-07T18:45:00.000Z"),
                json!("Ada"),
                json!("ada@example.com"),
                json!("2025-06-07"),
                json!("20:30"),
                json!("2"),
                json!("anniversary"),
                json!(50),
                json!("cs_test_123"),
                json!("pi_test_456"),
            ]
        );
    }

    #[test]
    fn absent_email_and_amount_become_empty_fields() {
        let mut session = completed_session();
        session.customer_email = None;
        session.customer_details = None;
        session.amount_total = None;
        session.payment_intent = None;
        let row = build_ledger_row(&session, Utc::now());
        assert_eq!(row[2], json!(""));
        assert_eq!(row[7], json!(""));
        assert_eq!(row[9], json!(""));
    }

    #[test]
    fn customer_details_email_is_a_fallback() {
        let mut session = completed_session();
        session.customer_email = None;
        session.customer_details = Some(StripeCustomerDetails {
            email: Some("detail@example.com".to_string()),
            name: None,
        });
        let row = build_ledger_row(&session, Utc::now());
        assert_eq!(row[2], json!("detail@example.com"));
    }

    #[test]
    fn amount_conversion_is_minor_units_over_100() {
        assert_eq!(amount_to_decimal(5000), json!(50));
        assert_eq!(amount_to_decimal(0), json!(0));
        assert_eq!(amount_to_decimal(5150), json!(51.5));
        assert_eq!(amount_to_decimal(1), json!(0.01));
    }

    // --- Webhook processing ---

    #[derive(Default)]
    struct RecordingLedger {
        rows: Mutex<Vec<Vec<Value>>>,
    }

    impl ReservationLedger for RecordingLedger {
        fn append_row(&self, values: Vec<Value>) -> BoxFuture<'_, (), BoxedError> {
            Box::pin(async move {
                self.rows.lock().unwrap().push(values);
                Ok(())
            })
        }
    }

    fn event(event_type: &str, object: Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "api_version": "2023-10-16",
            "created": now_ts(),
            "livemode": false,
            "type": event_type,
            "data": { "object": object },
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn completed_session_appends_one_row() {
        let ledger = RecordingLedger::default();
        let object = json!({
            "id": "cs_test_123",
            "amount_total": 5000,
            "customer_email": "ada@example.com",
            "metadata": {
                "name": "Ada",
                "date": "2025-06-07",
                "time": "20:30",
                "partySize": "2",
                "celebration": ""
            },
            "payment_intent": "pi_test_456",
            "payment_status": "paid"
        });

        process_stripe_webhook(event("checkout.session.completed", object), &ledger)
            .await
            .unwrap();

        let rows = ledger.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        // metadata round-trips unchanged
        assert_eq!(rows[0][1], json!("Ada"));
        assert_eq!(rows[0][3], json!("2025-06-07"));
        assert_eq!(rows[0][4], json!("20:30"));
        assert_eq!(rows[0][5], json!("2"));
        assert_eq!(rows[0][7], json!(50));
    }

    #[tokio::test]
    async fn other_event_types_are_ignored() {
        let ledger = RecordingLedger::default();
        process_stripe_webhook(
            event("payment_intent.succeeded", json!({"id": "pi_test_456"})),
            &ledger,
        )
        .await
        .unwrap();
        assert!(ledger.rows.lock().unwrap().is_empty());
    }

    struct FailingLedger;

    impl ReservationLedger for FailingLedger {
        fn append_row(&self, _values: Vec<Value>) -> BoxFuture<'_, (), BoxedError> {
            Box::pin(async move {
                Err(BoxedError(Box::new(std::io::Error::other("sheet gone"))))
            })
        }
    }

    #[tokio::test]
    async fn ledger_failure_surfaces_as_error() {
        let object = json!({"id": "cs_test_123", "metadata": {}});
        let result =
            process_stripe_webhook(event("checkout.session.completed", object), &FailingLedger)
                .await;
        assert!(matches!(result, Err(StripeError::LedgerError(_))));
    }

    // --- Checkout session creation against a local Stripe stub ---

    #[tokio::test]
    async fn create_checkout_session_round_trips_metadata() {
        let captured: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();

        let stub = Router::new().route(
            "/v1/checkout/sessions",
            post(move |body: String| {
                let sink = sink.clone();
                async move {
                    let form: Vec<(String, String)> =
                        serde_urlencoded::from_str(&body).unwrap();
                    *sink.lock().unwrap() = form;
                    Json(json!({
                        "id": "cs_test_123",
                        "url": "https://checkout.stripe.com/pay/cs_test_123"
                    }))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });

        let stripe_config = StripeConfig {
            success_url: "https://per-due.la/reservation-confirmed?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "https://per-due.la/reservation-canceled".to_string(),
            currency: None,
            unit_amount: None,
            product_name: None,
            product_description: None,
            api_base: Some(format!("http://{}", addr)),
            secret_key: Some("sk_test_123".to_string()),
            webhook_secret: Some("whsec_test".to_string()),
        };

        let reservation = validate_reservation(&valid_request(), &rules()).unwrap();
        let response = create_checkout_session(&stripe_config, &reservation)
            .await
            .unwrap();
        assert_eq!(response.url, "https://checkout.stripe.com/pay/cs_test_123");

        let form = captured.lock().unwrap();
        let get = |key: &str| -> String {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| panic!("missing form field {key}"))
        };
        assert_eq!(get("mode"), "payment");
        assert_eq!(get("customer_email"), "ada@example.com");
        assert_eq!(get("line_items[0][price_data][currency]"), "usd");
        assert_eq!(get("line_items[0][price_data][unit_amount]"), "5000");
        assert_eq!(get("line_items[0][quantity]"), "1");
        assert_eq!(
            get("line_items[0][price_data][product_data][name]"),
            "Reservation Deposit"
        );
        assert_eq!(get("metadata[name]"), "Ada");
        assert_eq!(get("metadata[date]"), "2025-06-07");
        assert_eq!(get("metadata[time]"), "20:30");
        assert_eq!(get("metadata[partySize]"), "2");
        assert_eq!(get("metadata[celebration]"), "anniversary");
    }
}
