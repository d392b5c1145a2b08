#[cfg(test)]
mod tests {
    use crate::api::{AqiSource, WaqiClient};
    use crate::categories::categorize;
    use crate::config::Config;
    use crate::error::{AppError, Result};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;

    // Helper to build a client pointed at the mock server
    fn client_for(server: &Server, api_key: Option<&str>, max_retries: u32) -> WaqiClient {
        let config = Config {
            api_key: api_key.map(str::to_string),
            base_url: server.url(),
            request_timeout: Duration::from_secs(5),
            max_retries,
            retry_backoff: Duration::from_millis(1),
            ..Config::default()
        };
        WaqiClient::new(&config).unwrap()
    }

    // Helper to create a successful feed body
    fn feed_body(aqi: serde_json::Value) -> String {
        json!({
            "status": "ok",
            "data": {
                "aqi": aqi,
                "idx": 5724,
                "city": { "name": "London", "geo": [51.5073509, -0.1277583] },
                "time": { "s": "2024-03-01 14:00:00", "tz": "+00:00", "v": 1709301600, "iso": "2024-03-01T14:00:00+00:00" },
                "dominentpol": "pm25"
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_fetch_known_city_success() -> Result<()> {
        let mut server = Server::new_async().await;
        let api_key = "test_key";
        let m = server
            .mock("GET", "/feed/london/")
            .match_query(Matcher::UrlEncoded("token".into(), api_key.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(feed_body(json!(57)))
            .create_async()
            .await;

        let client = client_for(&server, Some(api_key), 0);
        let reading = client.fetch("london").await?;

        m.assert_async().await;
        assert_eq!(reading.city, "London");
        assert_eq!(reading.aqi, 57);
        assert!((0..=500).contains(&reading.aqi));
        assert_eq!(reading.category, categorize(reading.aqi));
        assert_eq!(reading.station.as_deref(), Some("London"));
        assert_eq!(reading.dominant_pollutant.as_deref(), Some("pm25"));
        let coords = reading.coordinates.expect("coordinates should be parsed");
        assert!((coords.latitude - 51.5073509).abs() < 1e-9);
        assert_eq!(reading.observed_at.timestamp(), 1709301600);

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_unknown_city_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/feed/atlantis/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"error","data":"Unknown station"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("test_key"), 0);
        let result = client.fetch("atlantis").await;

        match result {
            Err(AppError::NotFound(msg)) => assert!(msg.contains("atlantis")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_with_invalid_key_is_auth_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/feed/london/")
            .match_query(Matcher::UrlEncoded("token".into(), "bad_key".into()))
            .with_status(200)
            .with_body(r#"{"status":"error","data":"Invalid key"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("bad_key"), 0);
        let result = client.fetch("london").await;
        assert!(matches!(result, Err(AppError::Auth(_))), "got {:?}", result);
    }

    #[tokio::test]
    async fn test_fetch_unauthorized_status_is_auth_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/feed/london/")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let client = client_for(&server, Some("test_key"), 0);
        let result = client.fetch("london").await;
        assert!(matches!(result, Err(AppError::Auth(_))), "got {:?}", result);
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server, None, 0);
        let result = client.fetch("london").await;

        assert!(matches!(result, Err(AppError::Auth(_))), "got {:?}", result);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_reported_transient() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/feed/london/")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(3) // first attempt + 2 retries
            .create_async()
            .await;

        let client = client_for(&server, Some("test_key"), 2);
        let result = client.fetch("london").await;

        assert!(matches!(result, Err(AppError::Transient(_))), "got {:?}", result);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/feed/atlantis/")
            .match_query(Matcher::Any)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, Some("test_key"), 3);
        let result = client.fetch("atlantis").await;

        assert!(matches!(result, Err(AppError::NotFound(_))), "got {:?}", result);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_transient() {
        // Nothing listens on port 9 (discard) on test machines.
        let config = Config {
            api_key: Some("test_key".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(2),
            max_retries: 0,
            ..Config::default()
        };
        let client = WaqiClient::new(&config).unwrap();
        let result = client.fetch("london").await;
        assert!(matches!(result, Err(AppError::Transient(_))), "got {:?}", result);
    }

    #[tokio::test]
    async fn test_placeholder_aqi_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/feed/nowhere/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(feed_body(json!("-")))
            .create_async()
            .await;

        let client = client_for(&server, Some("test_key"), 0);
        let result = client.fetch("nowhere").await;
        assert!(matches!(result, Err(AppError::NotFound(_))), "got {:?}", result);
    }

    #[tokio::test]
    async fn test_out_of_scale_aqi_is_clamped() -> Result<()> {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/feed/delhi/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(feed_body(json!(742)))
            .create_async()
            .await;

        let client = client_for(&server, Some("test_key"), 0);
        let reading = client.fetch("delhi").await?;
        assert_eq!(reading.aqi, 500);
        assert_eq!(reading.reported_aqi, 742);
        assert_eq!(reading.category, categorize(500));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/feed/london/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = client_for(&server, Some("test_key"), 0);
        let result = client.fetch("london").await;
        assert!(matches!(result, Err(AppError::JsonParse(_))), "got {:?}", result);
    }

    #[tokio::test]
    async fn test_fetch_many_keeps_input_order_and_failures() {
        let mut server = Server::new_async().await;
        // Mocks are removed when dropped, so keep them alive for the whole test
        let mut mocks = Vec::new();
        for (city, aqi) in [("delhi", 180), ("beijing", 120), ("london", 40)] {
            let m = server
                .mock("GET", format!("/feed/{}/", city).as_str())
                .match_query(Matcher::Any)
                .with_status(200)
                .with_body(feed_body(json!(aqi)))
                .create_async()
                .await;
            mocks.push(m);
        }
        let _unknown = server
            .mock("GET", "/feed/atlantis/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":"error","data":"Unknown station"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("test_key"), 0);
        let cities: Vec<String> = ["delhi", "atlantis", "beijing", "london"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let results = client.fetch_many(&cities, 3).await;

        let order: Vec<&str> = results.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(order, vec!["delhi", "atlantis", "beijing", "london"]);
        assert_eq!(results.iter().filter(|(_, r)| r.is_ok()).count(), 3);
        assert!(matches!(results[1].1, Err(AppError::NotFound(_))));
        assert_eq!(results[2].1.as_ref().unwrap().aqi, 120);
    }
}
