//! Authenticates with the client-credentials grant against a mock identity provider, then lists
//! a paginated collection through the authenticated client.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
use serde_json::json;
use url::Url;
// self
use graph_broker::{
	auth::{ClientId, ProviderId, TenantId},
	client::{Client, ClientConfig},
	credentials::ClientCredentialsProvider,
	provider::{GrantType, ProviderDescriptor},
	query::RequestOptions,
};

#[derive(Debug, Deserialize)]
struct User {
	id: String,
	#[serde(rename = "displayName")]
	display_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").body_includes("grant_type=client_credentials");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/users").header("authorization", "Bearer demo-access");
			then.status(200).json_body(json!({
				"value": [{ "id": "1", "displayName": "Ada" }, { "id": "2", "displayName": "Grace" }],
				"@odata.nextLink": server.url("/v1.0/users/page2"),
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/users/page2");
			then.status(200).json_body(json!({ "value": [{ "id": "3", "displayName": "Linus" }] }));
		})
		.await;

	let descriptor = ProviderDescriptor::builder(ProviderId::new("demo-provider")?)
		.authorization_endpoint(Url::parse(&server.url("/authorize"))?)
		.token_endpoint(Url::parse(&server.url("/token"))?)
		.support_grant(GrantType::ClientCredentials)
		.build()?;
	let provider = ClientCredentialsProvider::builder(
		TenantId::new("tenant-acme")?,
		ClientId::new("demo-client")?,
		"super-secret",
	)
	.descriptor(descriptor)
	.build()
	.await?;
	let client = Client::new(Arc::new(provider), ClientConfig::default())?;
	let users = client
		.list::<User>(
			&server.url("/v1.0/users"),
			&RequestOptions::new().select("id").select("displayName").page_size(2),
		)
		.await?;

	for user in &users {
		println!("{} {}", user.id, user.display_name);
	}

	token_mock.assert_async().await;

	Ok(())
}
