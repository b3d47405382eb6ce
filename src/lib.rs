//! Single-flight token-refresh pipeline—attach short-lived credentials to outbound calls,
//! coordinate renewal across concurrent failures, and replay each call at most once.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod credential;
pub mod error;
pub mod events;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod refresh;
pub mod renew;
pub mod retry;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	use serde_json::json;
	// self
	use crate::{
		http::CallTransport,
		pipeline::RequestPipeline,
		refresh::RefreshCoordinator,
		renew::RenewalClient,
		store::{CredentialStore, MemoryBacking},
	};

	/// Builds an unsigned JWT whose payload carries the provided subject and a relative expiry.
	///
	/// The signature segment is a fixed placeholder; nothing in this crate verifies it.
	pub fn fixture_access_token(subject: &str, expires_in: Duration) -> String {
		let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\",\"typ\":\"JWT\"}");
		let exp = (OffsetDateTime::now_utc() + expires_in).unix_timestamp();
		let payload = URL_SAFE_NO_PAD.encode(
			json!({
				"sub": subject,
				"email": format!("{subject}@example.com"),
				"role": "Candidate",
				"exp": exp,
			})
			.to_string(),
		);

		format!("{header}.{payload}.fixture-signature")
	}

	/// Constructs a [`CredentialStore`] over two in-memory backings, returning handles to both so
	/// tests can clear one slot independently of the other.
	pub fn build_memory_store() -> (Arc<CredentialStore>, Arc<MemoryBacking>, Arc<MemoryBacking>) {
		let durable = Arc::new(MemoryBacking::default());
		let ephemeral = Arc::new(MemoryBacking::default());
		let store = Arc::new(CredentialStore::new(durable.clone(), ephemeral.clone()));

		(store, durable, ephemeral)
	}

	/// Wires a [`RequestPipeline`] over the provided transport and renewal client, backed by a
	/// fresh in-memory [`CredentialStore`].
	pub fn build_test_relay(
		transport: Arc<dyn CallTransport>,
		renewal: Arc<dyn RenewalClient>,
	) -> (RequestPipeline, Arc<CredentialStore>, Arc<RefreshCoordinator>) {
		let (store, _, _) = build_memory_store();
		let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), renewal));
		let pipeline = RequestPipeline::new(transport, store.clone(), coordinator.clone());

		(pipeline, store, coordinator)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
