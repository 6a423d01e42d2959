//! MAC authentication integration tests.

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};
    use tentd_auth::RequestSigner;

    use crate::{authorization, client, endpoint_url, follow, signed};

    async fn assert_challenge(resp: reqwest::Response) {
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get("www-authenticate").unwrap(), "MAC");
        assert_eq!(resp.text().await.unwrap(), "Invalid MAC Credentials\n");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_challenge_missing_authorization() {
        let client = client();
        let follower = follow(&client, "noauth").await.unwrap();

        let resp = client
            .get(format!("{}/followers/{}", endpoint_url(), follower.id))
            .send()
            .await
            .unwrap();

        assert_challenge(resp).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_challenge_wrong_secret_and_unknown_id_identically() {
        let client = client();
        let follower = follow(&client, "wrong").await.unwrap();
        let path = format!("/followers/{}", follower.id);

        let wrong_secret = RequestSigner::new(&follower.mac_key_id, "not-the-secret");
        let resp = signed(&client, Method::GET, &path, &wrong_secret)
            .await
            .unwrap();
        assert_challenge(resp).await;

        let unknown_id = RequestSigner::new("no-such-key", &follower.mac_key);
        let resp = signed(&client, Method::GET, &path, &unknown_id)
            .await
            .unwrap();
        assert_challenge(resp).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_replayed_authorization() {
        let client = client();
        let follower = follow(&client, "replay").await.unwrap();
        let path = format!("/followers/{}", follower.id);
        let header = authorization(&follower.signer(), "GET", &path).unwrap();
        let url = format!("{}{path}", endpoint_url());

        let first = client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, &header)
            .send()
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let replay = client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, &header)
            .send()
            .await
            .unwrap();
        assert_challenge(replay).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_signature_for_another_path() {
        let client = client();
        let follower = follow(&client, "path").await.unwrap();
        let header = authorization(&follower.signer(), "GET", "/followers/other").unwrap();

        let resp = client
            .get(format!("{}/followers/{}", endpoint_url(), follower.id))
            .header(reqwest::header::AUTHORIZATION, header)
            .send()
            .await
            .unwrap();

        assert_challenge(resp).await;
    }
}
