//! Follower endpoint integration tests.

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};

    use crate::{client, endpoint_url, follow, signed};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health() {
        let resp = client()
            .get(format!("{}/health", endpoint_url()))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("server").unwrap(), "tentd");
        assert!(resp.headers().get("x-request-id").is_some());
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "running");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_issue_credentials_on_follow() {
        let client = client();
        let follower = follow(&client, "issue").await.unwrap();

        assert_eq!(follower.id, follower.mac_key_id);
        assert_eq!(follower.mac_algorithm, "hmac-sha-256");
        assert!(follower.entity.starts_with("https://issue-"));
        assert!(!follower.mac_key.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_get_own_follower_record() {
        let client = client();
        let follower = follow(&client, "get").await.unwrap();
        let path = format!("/followers/{}", follower.id);

        let resp = signed(&client, Method::GET, &path, &follower.signer())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["id"], follower.id.as_str());
        assert_eq!(json["entity"], follower.entity.as_str());
        assert!(json.get("mac_key").is_none());
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_not_expose_other_followers() {
        let client = client();
        let alice = follow(&client, "alice").await.unwrap();
        let bob = follow(&client, "bob").await.unwrap();

        let resp = signed(
            &client,
            Method::GET,
            &format!("/followers/{}", bob.id),
            &alice.signer(),
        )
        .await
        .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_revoke_own_keypair() {
        let client = client();
        let follower = follow(&client, "revoke").await.unwrap();
        let path = format!("/followers/{}", follower.id);

        let resp = signed(&client, Method::DELETE, &path, &follower.signer())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = signed(&client, Method::GET, &path, &follower.signer())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_invalid_follow_body() {
        let resp = client()
            .post(format!("{}/followers", endpoint_url()))
            .json(&serde_json::json!({ "entity": "not-a-url" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
