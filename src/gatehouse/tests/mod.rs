use std::sync::{Arc, Mutex};

use super::*;
use crate::config::ResetPasswordConfig;
use crate::memory::MemoryStore;
use crate::traits::{MailMessage, Mutation, QueryResults};
use crate::types::{Headers, QueryParams, into_record};
use serde_json::json;


const MASTER_KEY_HEADER: &str = "X-Master-Key";
const MASTER_KEY: &str = "master";

/// Grants an override for the master key header, and nothing else.
struct StaticKeyChecker;

impl KeyChecker for StaticKeyChecker {
    fn check_permissions(&self, headers: &Headers) -> Result<bool, GatehouseError> {
        Ok(headers.get(MASTER_KEY_HEADER).map(String::as_str) == Some(MASTER_KEY))
    }
}

struct FailingKeyChecker;

impl KeyChecker for FailingKeyChecker {
    fn check_permissions(&self, _headers: &Headers) -> Result<bool, GatehouseError> {
        Err(GatehouseError::Internal("key store unavailable".into()))
    }
}

/// Reversible "hash" so stored digests can be asserted on.
struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, plaintext: &str) -> Result<String, GatehouseError> {
        Ok(format!("hashed:{plaintext}"))
    }

    fn verify(&self, digest: &str, plaintext: &str) -> bool {
        digest == format!("hashed:{plaintext}")
    }
}

struct FixedTokens;

impl TokenIssuer for FixedTokens {
    fn generate_token(&self, subject_id: &str, _claims: &Record) -> Result<String, GatehouseError> {
        Ok(format!("token-for-{subject_id}"))
    }
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl MailTransport for RecordingMailer {
    fn send(&self, message: &MailMessage) -> Result<(), GatehouseError> {
        if self.fail {
            return Err(GatehouseError::Internal("connection refused".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Stores writes in a [`MemoryStore`] but echoes a stale record with side effects.
struct StaleEchoStore(MemoryStore);

impl Storage for StaleEchoStore {
    fn create(&self, collection: &str, fields: Record) -> Result<Mutation, GatehouseError> {
        self.0.create(collection, fields)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Record, GatehouseError> {
        self.0.get(collection, id)
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Record,
    ) -> Result<Mutation, GatehouseError> {
        let stale = self.0.get(collection, id)?;
        self.0.update(collection, id, fields)?;
        Ok(Mutation {
            record: stale,
            side_effects: Some(into_record(json!({"audit": format!("{collection}/{id}")}))),
        })
    }

    fn query(
        &self,
        collection: &str,
        parameters: &QueryParams,
    ) -> Result<QueryResults, GatehouseError> {
        self.0.query(collection, parameters)
    }
}

struct Fixture {
    engine: Gatehouse,
    store: Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
}

impl Fixture {
    fn subject(&self, id: &str) -> Subject {
        Subject::from_record(self.store.get("users", id).unwrap())
    }

    fn stored(&self, collection: &str, id: &str, field: &str) -> Option<Value> {
        self.store.get(collection, id).unwrap().get(field).cloned()
    }
}

fn reset_config() -> ResetPasswordConfig {
    ResetPasswordConfig {
        sender_email: "noreply@example.com".into(),
        sender_email_password: "mailpw".into(),
        smtp_server: "smtp.example.com".into(),
        smtp_port: "587".into(),
        mail_subject: "Your new password".into(),
        mail_content_template: "Your new password is %s".into(),
    }
}

fn seed(store: &MemoryStore, collection: &str, value: Value) {
    store.seed(collection, into_record(value)).unwrap();
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    seed(
        &store,
        "users",
        json!({"_id": "admin", "email": "admin@example.com", "password": "hashed:adminpw", "_roles": ["admin", "editor"]}),
    );
    seed(
        &store,
        "users",
        json!({"_id": "alice", "username": "alice", "email": "alice@example.com", "password": "hashed:alicepw"}),
    );
    seed(&store, "users", json!({"_id": "bob", "_roles": ["editor"]}));
    seed(&store, "users", json!({"_id": "carol", "_roles": ["editor", "owner"]}));
    seed(&store, "users", json!({"_id": "dave", "_roles": ["admin"]}));
    seed(
        &store,
        "users",
        json!({"_id": "erin", "email": "erin@example.com", "google": {"id": "g-erin"}}),
    );
    seed(
        &store,
        "groups",
        json!({"_id": "g1", "members": ["a", "b", "c"], "labels": [{"id": 1}], "title": "core"}),
    );
    store
}

fn fixture_with(
    config: GatehouseConfig,
    keys: Arc<dyn KeyChecker>,
    mailer: RecordingMailer,
) -> Fixture {
    let store = Arc::new(seeded_store());
    let mailer = Arc::new(mailer);
    let engine = Gatehouse::new(
        config,
        Collaborators {
            storage: store.clone(),
            keys,
            tokens: Arc::new(FixedTokens),
            passwords: Arc::new(PlainHasher),
            mailer: mailer.clone(),
        },
    )
    .expect("engine should build");

    Fixture {
        engine,
        store,
        mailer,
    }
}

fn fixture() -> Fixture {
    fixture_with(
        GatehouseConfig::default().with_reset_password(reset_config()),
        Arc::new(StaticKeyChecker),
        RecordingMailer::default(),
    )
}

fn request(path: &str, body: Value) -> Request {
    Request::new(path).with_body(into_record(body))
}

fn with_master_key(request: Request) -> Request {
    request.with_header(MASTER_KEY_HEADER, MASTER_KEY)
}

fn assert_malformed(result: Result<Response, GatehouseError>, message: &str) {
    assert_eq!(
        result.unwrap_err(),
        GatehouseError::MalformedRequest(message.to_string())
    );
}

#[derive(Clone)]
struct SharedLogBuffer(Arc<Mutex<Vec<u8>>>);

struct SharedLogWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedLogBuffer {
    type Writer = SharedLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SharedLogWriter(Arc::clone(&self.0))
    }
}

impl std::io::Write for SharedLogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return everything it logged.
fn capture_logs(f: impl FnOnce()) -> String {
    let sink = SharedLogBuffer(Arc::new(Mutex::new(Vec::new())));
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(sink.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        tracing::callsite::rebuild_interest_cache();
        f();
    });

    String::from_utf8(sink.0.lock().unwrap().clone()).unwrap()
}
