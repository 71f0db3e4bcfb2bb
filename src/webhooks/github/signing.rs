use rocket::{
    data::{ByteUnit, FromData, Outcome},
    Data, Request,
};
use tracing::trace;

use crate::webhooks::{github::GitHubSecret, WebhookError};

const X_GITHUB_SIGNATURE: &str = "X-Hub-Signature-256";

type HmacSha256 = hmac::Hmac<sha2::Sha256>;

fn validate_signature(secret: &str, signature: &str, data: &[u8]) -> bool {
    trace!("validating signature...");
    use hmac::Mac;

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };

    mac.update(data);

    // GitHub puts a prefix in front of its hex SHA256
    let signature = match signature.strip_prefix("sha256=") {
        Some(s) => s,
        None => {
            trace!("couldn't strip prefix from signature `{}`", signature);
            return false;
        }
    };

    match hex::decode(signature) {
        Ok(bytes) => mac.verify_slice(&bytes).is_ok(),
        Err(_) => {
            trace!("couldn't decode hex-encoded signature {}", signature);
            false
        }
    }
}

/// Computes the `X-Hub-Signature-256` header GitHub would send for this payload.
#[cfg(test)]
pub(crate) fn sign(secret: &str, data: &[u8]) -> String {
    use hmac::Mac;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(data);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Raw body of a request whose signature matched the webhook secret.
pub struct SignedGitHubPayload(pub Vec<u8>);

const LIMIT: ByteUnit = ByteUnit::Mebibyte(1);

fn fail<'r>(error: WebhookError) -> Outcome<'r, SignedGitHubPayload, WebhookError> {
    Outcome::Error((error.status(), error))
}

// Tracking issue for chaining Data guards to avoid reimplementing all this:
// https://github.com/SergioBenitez/Rocket/issues/775
#[rocket::async_trait]
impl<'r> FromData<'r> for SignedGitHubPayload {
    type Error = WebhookError;

    async fn from_data(request: &'r Request<'_>, data: Data<'r>) -> Outcome<'r, Self> {
        trace!("received payload on GitHub webhook endpoint: {:?}", request);

        match request.content_type() {
            Some(ct) if ct.is_json() => {}
            other => {
                trace!("content type `{:?}` wasn't json, stopping here...", other);
                let content_type = other.map_or_else(|| "(none)".to_string(), |ct| ct.to_string());
                return fail(WebhookError::UnsupportedContentType(content_type));
            }
        }

        let signatures = request
            .headers()
            .get(X_GITHUB_SIGNATURE)
            .collect::<Vec<_>>();
        if signatures.len() != 1 {
            trace!("couldn't locate {} header", X_GITHUB_SIGNATURE);
            return fail(WebhookError::MissingHeader(X_GITHUB_SIGNATURE));
        }

        let size_limit = request.limits().get("json").unwrap_or(LIMIT);
        let content = match data.open(size_limit).into_bytes().await {
            Ok(bytes) if bytes.is_complete() => bytes.into_inner(),
            Ok(_) => {
                trace!("payload was too big");
                return fail(WebhookError::PayloadTooLarge(size_limit));
            }
            Err(e) => return fail(e.into()),
        };

        let secret = match request.rocket().state::<GitHubSecret>() {
            Some(secret) => secret,
            None => return fail(WebhookError::MissingSecret),
        };

        if !validate_signature(&secret.0, signatures[0], &content) {
            trace!("signature validation failed, stopping here...");
            return fail(WebhookError::InvalidSignature);
        }

        trace!("validated GitHub payload");
        Outcome::Success(SignedGitHubPayload(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "It's a Secret to Everybody";

    #[test]
    fn github_documentation_example() {
        // https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries
        let signature = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";

        assert_eq!(sign(SECRET, b"Hello, World!"), signature);
        assert!(validate_signature(SECRET, signature, b"Hello, World!"));
    }

    #[test]
    fn wrong_secret() {
        let signature = sign("another secret", b"Hello, World!");
        assert!(!validate_signature(SECRET, &signature, b"Hello, World!"));
    }

    #[test]
    fn tampered_payload() {
        let signature = sign(SECRET, b"Hello, World!");
        assert!(!validate_signature(SECRET, &signature, b"Hello, World?"));
    }

    #[test]
    fn malformed_signatures() {
        let hex = sign(SECRET, b"Hello, World!");
        let hex = hex.strip_prefix("sha256=").unwrap();

        assert!(!validate_signature(SECRET, hex, b"Hello, World!"));
        assert!(!validate_signature(SECRET, &format!("sha1={}", hex), b"Hello, World!"));
        assert!(!validate_signature(SECRET, "sha256=xyz", b"Hello, World!"));
        assert!(!validate_signature(SECRET, "", b"Hello, World!"));
    }
}
