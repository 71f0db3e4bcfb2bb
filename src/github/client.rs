use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT},
    Response,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, trace};

use crate::{
    config::BotConfig,
    github::{ApiError, GitHubApi, OutboundComment, API_VERSION},
};

const X_GITHUB_API_VERSION: &str = "x-github-api-version";

// GitHub refuses app tokens living longer than 10 minutes, and clocks drift.
const JWT_BACKDATE_SECS: i64 = 60;
const JWT_LIFETIME_SECS: i64 = 9 * 60;

/// GitHub REST client authenticating as an app installation.
///
/// Every call exchanges a freshly signed app JWT for an installation token, then uses that token
/// for the actual request.
pub struct AppClient {
    http: reqwest::Client,
    api_url: String,
    app_id: u64,
    key: EncodingKey,
}

#[derive(Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: u64,
}

#[derive(Deserialize)]
struct InstallationToken {
    token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl AppClient {
    pub fn new(config: &BotConfig) -> anyhow::Result<Self> {
        let key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())
            .context("private key isn't a PEM encoded RSA key")?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(X_GITHUB_API_VERSION, HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("pr-greeter/", env!("CARGO_PKG_VERSION"))),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            http,
            api_url: config.github_api_url.as_str().trim_end_matches('/').to_owned(),
            app_id: config.app_id,
            key,
        })
    }

    fn app_jwt(&self) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let claims = AppClaims {
            iat: now - JWT_BACKDATE_SECS,
            exp: now + JWT_LIFETIME_SECS,
            iss: self.app_id,
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.key,
        )?)
    }

    async fn installation_token(&self, installation_id: u64) -> Result<String, ApiError> {
        trace!("requesting token for installation {}", installation_id);
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_url, installation_id
        );

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.app_jwt()?))
            .send()
            .await?;
        let token: InstallationToken = check_status(response).await?.json().await?;

        Ok(token.token)
    }

    async fn post_comment(&self, token: &str, comment: &OutboundComment) -> Result<(), ApiError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url, comment.owner, comment.repo, comment.issue_number
        );

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({ "body": comment.body }))
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }
}

/// Turns non-success responses into [`ApiError::Response`], keeping GitHub's error message.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(error) => error.message,
        Err(_) => body,
    };

    Err(ApiError::Response { status, message })
}

#[async_trait]
impl GitHubApi for AppClient {
    async fn create_issue_comment(
        &self,
        installation_id: Option<u64>,
        comment: &OutboundComment,
    ) -> Result<(), ApiError> {
        let installation_id = installation_id.ok_or(ApiError::NoInstallation)?;
        let token = self.installation_token(installation_id).await?;

        debug!(
            "posting comment on {}/{}#{}",
            comment.owner, comment.repo, comment.issue_number
        );
        self.post_comment(&token, comment).await
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use url::Url;
    use wiremock::{
        matchers::{body_json, header, header_exists, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::config::test_config;

    const TEST_KEY: &str = include_str!("testdata/app-key.pem");

    fn client_for(server: &MockServer) -> AppClient {
        let mut config = test_config(None);
        config.private_key = TEST_KEY.to_string();
        config.github_api_url = Url::parse(&server.uri()).unwrap();

        AppClient::new(&config).expect("test key should be valid")
    }

    fn comment() -> OutboundComment {
        OutboundComment {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            issue_number: 42,
            body: "Hello!".to_string(),
        }
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/app/installations/7/access_tokens"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "token": "ghs_installation",
                "expires_at": "2030-01-01T00:00:00Z",
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn posts_comment_with_installation_token() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/issues/42/comments"))
            .and(header("authorization", "Bearer ghs_installation"))
            .and(header("x-github-api-version", "2022-11-28"))
            .and(body_json(json!({ "body": "Hello!" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .create_issue_comment(Some(7), &comment())
            .await
            .expect("comment should be posted");
    }

    #[tokio::test]
    async fn github_error_message_is_kept() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/issues/42/comments"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "message": "Resource not accessible by integration",
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_issue_comment(Some(7), &comment())
            .await
            .expect_err("403 should be an error");

        assert_eq!(
            err.response(),
            Some((
                StatusCode::FORBIDDEN,
                "Resource not accessible by integration"
            ))
        );
    }

    #[tokio::test]
    async fn token_exchange_failure_stops_before_posting() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/app/installations/7/access_tokens"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/issues/42/comments"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_issue_comment(Some(7), &comment())
            .await
            .expect_err("401 should be an error");

        assert_eq!(
            err.response(),
            Some((StatusCode::UNAUTHORIZED, "Bad credentials"))
        );
    }

    #[tokio::test]
    async fn no_installation() {
        let server = MockServer::start().await;

        let err = client_for(&server)
            .create_issue_comment(None, &comment())
            .await
            .expect_err("can't authenticate without installation");

        assert!(matches!(err, ApiError::NoInstallation));
        assert!(err.response().is_none());
    }

    #[test]
    fn rejects_invalid_key() {
        let mut config = test_config(None);
        config.private_key = "not a key".to_string();

        assert!(AppClient::new(&config).is_err());
    }
}
