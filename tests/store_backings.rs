// std
use std::sync::Arc;
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use auth_relay::{
	credential::Credential,
	store::{CredentialBacking, CredentialKey, CredentialStore, MemoryBacking},
};

fn fixture_token(subject: &str) -> String {
	let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\",\"typ\":\"JWT\"}");
	let exp = (OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp();
	let payload = URL_SAFE_NO_PAD
		.encode(json!({ "sub": subject, "role": "Candidate", "exp": exp }).to_string());

	format!("{header}.{payload}.sig")
}

fn build_store() -> (CredentialStore, Arc<MemoryBacking>, Arc<MemoryBacking>) {
	let durable = Arc::new(MemoryBacking::default());
	let ephemeral = Arc::new(MemoryBacking::default());
	let store = CredentialStore::new(durable.clone(), ephemeral.clone());

	(store, durable, ephemeral)
}

fn credential(access: &str, refresh: &str) -> Credential {
	Credential::builder()
		.access_token(access)
		.refresh_token(refresh)
		.expires_in(Duration::hours(1))
		.build()
		.expect("Credential fixture should build successfully.")
}

async fn wipe(backing: &MemoryBacking) {
	for key in CredentialKey::ALL {
		backing.remove(key).await.expect("Wiping a memory backing should succeed.");
	}
}

#[tokio::test]
async fn durable_set_survives_ephemeral_wipe() {
	let (store, _, ephemeral) = build_store();
	let access = fixture_token("user-durable");

	store
		.set(credential(&access, "refresh-d"), true)
		.await
		.expect("Storing the durable credential should succeed.");
	wipe(&ephemeral).await;

	let fetched = store
		.get()
		.await
		.expect("Reading the store should succeed.")
		.expect("The durable credential should survive an ephemeral wipe.");

	assert_eq!(fetched.access_token.expose(), access);
	assert!(fetched.durable);
}

#[tokio::test]
async fn ephemeral_set_survives_durable_wipe() {
	let (store, durable, _) = build_store();
	let access = fixture_token("user-session");

	store
		.set(credential(&access, "refresh-s"), false)
		.await
		.expect("Storing the session credential should succeed.");
	wipe(&durable).await;

	let fetched = store
		.get()
		.await
		.expect("Reading the store should succeed.")
		.expect("The session credential should survive a durable wipe.");

	assert_eq!(fetched.access_token.expose(), access);
	assert!(!fetched.durable);
}

#[tokio::test]
async fn durable_slot_wins_when_both_are_populated() {
	let (store, _, _) = build_store();
	let session_access = fixture_token("user-session");
	let durable_access = fixture_token("user-durable");

	store
		.set(credential(&session_access, "refresh-s"), false)
		.await
		.expect("Storing the session credential should succeed.");
	store
		.set(credential(&durable_access, "refresh-d"), true)
		.await
		.expect("Storing the durable credential should succeed.");

	let fetched = store
		.get()
		.await
		.expect("Reading the store should succeed.")
		.expect("A credential should be present in both slots.");

	assert_eq!(fetched.access_token.expose(), durable_access);
	assert!(fetched.durable);
}

#[tokio::test]
async fn clear_wipes_both_slots() {
	let (store, _, _) = build_store();

	store
		.set(credential(&fixture_token("user-a"), "refresh-a"), true)
		.await
		.expect("Storing the durable credential should succeed.");
	store
		.set(credential(&fixture_token("user-b"), "refresh-b"), false)
		.await
		.expect("Storing the session credential should succeed.");
	store.clear().await.expect("Clearing the store should succeed.");

	assert!(store.get().await.expect("Reading the store should succeed.").is_none());
	assert!(
		!store.is_authenticated().await.expect("Authentication check should succeed."),
		"A cleared store must not report an authenticated session.",
	);
}

#[tokio::test]
async fn presence_counts_even_when_the_token_is_undecodable() {
	let (store, _, ephemeral) = build_store();

	ephemeral
		.write(CredentialKey::AccessToken, "opaque-garbage".into())
		.await
		.expect("Writing directly to the backing should succeed.");

	assert!(
		store.is_authenticated().await.expect("Authentication check should succeed."),
		"Presence is checked without decoding.",
	);
	assert!(
		store.identity().await.expect("Identity lookup should succeed.").is_none(),
		"Corrupt material maps to no identity, not an error.",
	);
	assert!(
		store.get().await.is_err(),
		"Reconstructing a credential from undecodable material should fail.",
	);
}

#[tokio::test]
async fn identity_is_recomputed_whenever_the_credential_changes() {
	let (store, _, _) = build_store();

	store
		.set(credential(&fixture_token("user-one"), "refresh-1"), false)
		.await
		.expect("Storing the first credential should succeed.");

	let identity = store
		.identity()
		.await
		.expect("Identity lookup should succeed.")
		.expect("Identity should be derived from the stored token.");

	assert_eq!(identity.subject, "user-one");
	assert_eq!(identity.role.as_deref(), Some("Candidate"));

	store
		.set(credential(&fixture_token("user-two"), "refresh-2"), false)
		.await
		.expect("Storing the replacement credential should succeed.");

	let identity = store
		.identity()
		.await
		.expect("Identity lookup should succeed.")
		.expect("Identity should follow the replacement token.");

	assert_eq!(identity.subject, "user-two");
}

#[tokio::test]
async fn refresh_secret_reports_the_slot_it_came_from() {
	let (store, _, _) = build_store();

	store
		.set(credential(&fixture_token("user-d"), "refresh-durable"), true)
		.await
		.expect("Storing the durable credential should succeed.");

	let (secret, durable) = store
		.refresh_secret()
		.await
		.expect("Refresh secret lookup should succeed.")
		.expect("A refresh token should be present.");

	assert_eq!(secret.expose(), "refresh-durable");
	assert!(durable);

	store.clear().await.expect("Clearing the store should succeed.");
	store
		.set(credential(&fixture_token("user-s"), "refresh-session"), false)
		.await
		.expect("Storing the session credential should succeed.");

	let (secret, durable) = store
		.refresh_secret()
		.await
		.expect("Refresh secret lookup should succeed.")
		.expect("A refresh token should be present.");

	assert_eq!(secret.expose(), "refresh-session");
	assert!(!durable);
}
