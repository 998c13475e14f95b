// Test identity provider: serves a discovery document and JWKS, and mints
// RS256 tokens signed by a freshly generated key.
use axum::{Json, Router, routing::get};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use std::net::SocketAddr;

pub struct TestIdp {
    pub addr: SocketAddr,
    pub tenant: String,
    pub kid: String,
    private_pem: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestIdp {
    pub async fn spawn(tenant: &str) -> Self {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("generate key");
        let public = RsaPublicKey::from(&key);
        let kid = "kid-1".to_string();
        let jwks = jwks_for_key(&public, &kid);
        let private_pem = key
            .to_pkcs1_pem(Default::default())
            .expect("encode key")
            .to_string();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let jwks_uri = format!("http://{addr}/jwks");

        let app = Router::new()
            .route(
                "/:tenant/v2.0/.well-known/openid-configuration",
                get(move || {
                    let jwks_uri = jwks_uri.clone();
                    async move { Json(json!({ "jwks_uri": jwks_uri })) }
                }),
            )
            .route(
                "/jwks",
                get(move || {
                    let jwks = jwks.clone();
                    async move { Json(jwks) }
                }),
            );
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service()).await;
        });

        Self {
            addr,
            tenant: tenant.to_string(),
            kid,
            private_pem,
            handle,
        }
    }

    pub fn authority(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn issuer(&self) -> String {
        format!("http://{}/{}/v2.0", self.addr, self.tenant)
    }

    /// Baseline claims valid for the given audience; tests override fields.
    pub fn base_claims(&self, audience: &str) -> Value {
        let now = chrono::Utc::now().timestamp();
        json!({
            "iss": self.issuer(),
            "aud": audience,
            "iat": now,
            "nbf": now - 30,
            "exp": now + 600,
        })
    }

    pub fn mint(&self, claims: &Value) -> String {
        let mut header = jsonwebtoken::Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        jsonwebtoken::encode(
            &header,
            claims,
            &EncodingKey::from_rsa_pem(self.private_pem.as_bytes()).expect("signing key"),
        )
        .expect("mint token")
    }

    /// Stop serving discovery/JWKS; minting still works.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

fn jwks_for_key(public: &RsaPublicKey, kid: &str) -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "kid": kid,
            "alg": "RS256",
            "use": "sig",
            "n": URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
        }]
    })
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}
