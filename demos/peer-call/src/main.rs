//! End-to-end demo of the warden auth layer.
//!
//! Spawns a stub identity provider (discovery + JWKS), a protected callee
//! wired with `AuthLayer`, and a stub identity agent, then makes two calls
//! through `AuthenticatedClient`: one as a listed caller and one as an
//! unlisted caller that gets a uniform 401.
use anyhow::Result;
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use warden_auth::{AllowList, AuthConfig, AuthLayer, CallerIdentity, RequestAuthorizer, claims};
use warden_common::EnvironmentMode;
use warden_credential::{AuthenticatedClient, IdentityAgentSource};

const TENANT: &str = "tenant-demo";
const AUDIENCE: &str = "1d922779-bc5e-4c5a-b1a8-f3ce9a1d50b6";
const LISTED_OID: &str = "5e9ccc1b-12c0-460f-be42-585ac084ba52";
const UNLISTED_OID: &str = "df0905f5-0000-4444-8888-cccccccccccc";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)?;
    let idp_addr = spawn_idp(&key).await?;
    let authority = format!("http://{idp_addr}");
    let issuer = format!("{authority}/{TENANT}/v2.0");
    tracing::info!(%issuer, "stub identity provider up");

    let callee_addr = spawn_callee(&authority).await?;
    tracing::info!(%callee_addr, "protected peer up");

    let private_pem = key.to_pkcs1_pem(Default::default())?.to_string();

    // Listed caller: the allow-list contains its object identifier.
    let agent_addr = spawn_agent(private_pem.clone(), issuer.clone(), LISTED_OID).await?;
    let client = authenticated_client(agent_addr)?;
    let response = client
        .get(&format!("http://{callee_addr}/documents"))
        .await?;
    tracing::info!(
        status = response.status().as_u16(),
        body = %response.text().await?,
        "listed caller"
    );

    // Unlisted caller: token is authentic but the principal is unknown.
    let agent_addr = spawn_agent(private_pem, issuer, UNLISTED_OID).await?;
    let client = authenticated_client(agent_addr)?;
    let response = client
        .get(&format!("http://{callee_addr}/documents"))
        .await?;
    tracing::info!(
        status = response.status().as_u16(),
        body = %response.text().await?,
        "unlisted caller"
    );

    Ok(())
}

fn authenticated_client(agent_addr: SocketAddr) -> Result<AuthenticatedClient> {
    let source = IdentityAgentSource::new(format!("http://{agent_addr}/token"), None)?;
    Ok(AuthenticatedClient::new(
        Arc::new(source),
        AUDIENCE.to_string(),
    )?)
}

async fn spawn_idp(key: &RsaPrivateKey) -> Result<SocketAddr> {
    let public = RsaPublicKey::from(key);
    let jwks = json!({
        "keys": [{
            "kty": "RSA",
            "kid": "demo-kid",
            "alg": "RS256",
            "use": "sig",
            "n": URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
        }]
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
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
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });
    Ok(addr)
}

async fn spawn_callee(authority: &str) -> Result<SocketAddr> {
    let config = AuthConfig {
        expected_audience: AUDIENCE.to_string(),
        tenant_id: TENANT.to_string(),
        authority: authority.to_string(),
        allowed_callers: AllowList::new(vec![LISTED_OID.to_string()]),
        mode: EnvironmentMode::Enforcing,
    };
    let authorizer = RequestAuthorizer::from_config(&config)?;

    let app = Router::new()
        .route("/documents", get(list_documents))
        .layer(AuthLayer::new(authorizer))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });
    Ok(addr)
}

async fn list_documents(identity: CallerIdentity) -> Json<Value> {
    Json(json!({
        "caller": identity.principal_id,
        "documents": ["report-q1", "report-q2"],
    }))
}

/// Stub identity agent: mints a token for the fixed principal on demand,
/// standing in for the platform's workload-identity endpoint.
async fn spawn_agent(private_pem: String, issuer: String, oid: &str) -> Result<SocketAddr> {
    let oid = oid.to_string();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let app = Router::new().route(
        "/token",
        get(move || {
            let private_pem = private_pem.clone();
            let issuer = issuer.clone();
            let oid = oid.clone();
            async move {
                let now = chrono::Utc::now().timestamp();
                let mut token_claims = json!({
                    "iss": issuer,
                    "aud": AUDIENCE,
                    "iat": now,
                    "nbf": now - 30,
                    "exp": now + 600,
                });
                token_claims[claims::OBJECT_ID_CLAIM] = json!(oid);
                let mut header = jsonwebtoken::Header::new(Algorithm::RS256);
                header.kid = Some("demo-kid".to_string());
                let token = jsonwebtoken::encode(
                    &header,
                    &token_claims,
                    &EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("signing key"),
                )
                .expect("mint token");
                Json(json!({ "access_token": token, "expires_in": 600 }))
            }
        }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });
    Ok(addr)
}
