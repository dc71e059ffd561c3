//! Signs a user in through the browser and prints their ten most recent unread messages.
//!
//! Requires an app registration with `http://localhost:8001/authcb` as a redirect URI:
//!
//! ```sh
//! GRAPH_TENANT=<tenant> GRAPH_CLIENT_ID=<client-id> cargo run --example interactive_login
//! ```
//!
//! The credential is cached under the user cache directory, so a second run skips the browser.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::{Result, eyre::WrapErr};
use serde::Deserialize;
// self
use graph_broker::{
	auth::{ClientId, ScopeSet, TenantId},
	cache::FileCache,
	client::{Client, ClientConfig},
	credentials::AuthorizationCodeProvider,
	query::RequestOptions,
};

#[derive(Debug, Deserialize)]
struct Message {
	subject: Option<String>,
	#[serde(rename = "receivedDateTime")]
	received: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let tenant = TenantId::new(env::var("GRAPH_TENANT").wrap_err("GRAPH_TENANT is not set")?)?;
	let client_id =
		ClientId::new(env::var("GRAPH_CLIENT_ID").wrap_err("GRAPH_CLIENT_ID is not set")?)?;
	let cache = FileCache::in_user_cache_dir()?;
	let provider = AuthorizationCodeProvider::builder(
		tenant,
		client_id,
		ScopeSet::new(["Mail.Read", "User.Read"])?,
	)
	.cache(Arc::new(cache))
	.authenticate()
	.await?;
	let client = Client::new(Arc::new(provider), ClientConfig::default())?;
	let options = RequestOptions::new()
		.filter("isRead eq false")
		.select("subject")
		.select("receivedDateTime")
		.page_size(10)
		.max_items(10)
		.text_body();
	let messages = client
		.list::<Message>("https://graph.microsoft.com/v1.0/me/messages", &options)
		.await?;

	for message in messages {
		println!("{} {}", message.received, message.subject.as_deref().unwrap_or("(no subject)"));
	}

	Ok(())
}
