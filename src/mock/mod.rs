//! In-memory Client Registry simulator
//!
//! Speaks MLLP and enforces the identifier-domain rules the suite
//! verifies: registrations must carry resolvable assigning
//! authorities, a facility may only assign identifiers inside its own
//! domain (NID excepted), partial CX.4 designators are completed from
//! the domain table, and records sharing an identifier are linked.
//! Exists to exercise the harness end-to-end; it is not an MPI.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};

use crate::common::{Error, Result};
use crate::hl7::{DomainTable, Message, Segment};
use crate::mllp::codec;

const RESPONDER_APP: &str = "CR1";
const RESPONDER_FACILITY: &str = "MOH_CAAT";
const TIMESTAMP: &str = "20260107120000";

/// A stored identifier, with its authority completed from the table
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredId {
    value: String,
    namespace: String,
    universal_id: String,
}

#[derive(Debug, Default)]
struct PatientRecord {
    identifiers: Vec<StoredId>,
}

struct RegistryState {
    domains: DomainTable,
    /// Sending application → namespaces it may assign in
    permissions: HashMap<String, Vec<String>>,
    patients: Vec<PatientRecord>,
}

impl Default for RegistryState {
    fn default() -> Self {
        let mut permissions = HashMap::new();
        permissions.insert("TEST_HARNESS".to_string(), vec!["TEST".to_string()]);
        permissions.insert("TEST_HARNESS_A".to_string(), vec!["TEST_A".to_string()]);
        permissions.insert("TEST_HARNESS_B".to_string(), vec!["TEST_B".to_string()]);
        Self {
            domains: DomainTable::default(),
            permissions,
            patients: Vec::new(),
        }
    }
}

/// MLLP listener wrapping the registry state
pub struct MockRegistry {
    listener: TcpListener,
    state: Arc<Mutex<RegistryState>>,
}

impl MockRegistry {
    /// Bind the listener; pass port 0 for an ephemeral port
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Connection(format!("cannot bind {addr}: {e}")))?;
        Ok(Self {
            listener,
            state: Arc::new(Mutex::new(RegistryState::default())),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            tracing::debug!(%peer, "registry connection accepted");
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, state).await {
                    tracing::debug!(%peer, "connection ended: {e}");
                }
            });
        }
    }
}

async fn serve_connection(stream: TcpStream, state: Arc<Mutex<RegistryState>>) -> Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = BufWriter::new(write_half);

    loop {
        let raw = match codec::read_frame(&mut reader).await {
            Ok(raw) => raw,
            // peer hung up between frames
            Err(Error::Connection(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        let response = match Message::parse(&raw) {
            Ok(message) => {
                let mut state = state.lock().expect("registry state poisoned");
                handle_message(&mut state, &message)
            }
            Err(e) => {
                tracing::warn!("unparseable inbound message: {e}");
                continue;
            }
        };

        codec::write_frame(&mut writer, &response).await?;
    }
}

fn handle_message(state: &mut RegistryState, request: &Message) -> String {
    match (request.message_type(), request.trigger_event()) {
        ("ADT", "A01") | ("ADT", "A08") => handle_registration(state, request),
        ("QBP", "Q23") => handle_query(state, request),
        (ty, ev) => ack(request, "AE", Some(&format!("unsupported message {ty}^{ev}"))),
    }
}

fn handle_registration(state: &mut RegistryState, request: &Message) -> String {
    let pid = match request.segments().into_iter().find(|s| s.name() == "PID") {
        Some(pid) => pid,
        None => return ack(request, "AE", Some("missing PID segment")),
    };

    let mut resolved = Vec::new();
    for (value, namespace, universal_id) in identifiers(pid) {
        if value.is_empty() {
            return ack(request, "AE", Some("identifier without a value in PID-3"));
        }
        if namespace.is_empty() && universal_id.is_empty() {
            return ack(
                request,
                "AE",
                Some(&format!("identifier '{value}' carries no assigning authority")),
            );
        }

        // complete the partial designator from the domain table
        let domain = state
            .domains
            .by_universal_id(&universal_id)
            .or_else(|| state.domains.by_namespace(&namespace))
            .cloned();
        let domain = match domain {
            Some(domain) => domain,
            None => {
                return ack(
                    request,
                    "AE",
                    Some(&format!(
                        "unknown assigning authority '{namespace}&{universal_id}' for '{value}'"
                    )),
                )
            }
        };

        let sender = request.segments()[0].value(3).to_string();
        if !authorized(state, &sender, &domain.namespace) {
            return ack(
                request,
                "AE",
                Some(&format!(
                    "'{sender}' may not assign identifiers in domain {}",
                    domain.namespace
                )),
            );
        }

        resolved.push(StoredId {
            value,
            namespace: domain.namespace,
            universal_id: domain.universal_id,
        });
    }

    if resolved.is_empty() {
        return ack(request, "AE", Some("no identifiers in PID-3"));
    }

    upsert(state, resolved);
    ack(request, "AA", None)
}

fn authorized(state: &RegistryState, sender: &str, namespace: &str) -> bool {
    // the national authority registers through any facility
    if namespace == "NID" {
        return true;
    }
    state
        .permissions
        .get(sender)
        .is_some_and(|allowed| allowed.iter().any(|ns| ns == namespace))
}

/// Link on any shared identifier, otherwise create a new record
fn upsert(state: &mut RegistryState, ids: Vec<StoredId>) {
    let existing = state.patients.iter_mut().find(|record| {
        record.identifiers.iter().any(|stored| {
            ids.iter()
                .any(|id| id.value == stored.value && id.universal_id == stored.universal_id)
        })
    });

    match existing {
        Some(record) => {
            for id in ids {
                if !record.identifiers.contains(&id) {
                    record.identifiers.push(id);
                }
            }
        }
        None => state.patients.push(PatientRecord { identifiers: ids }),
    }
}

fn handle_query(state: &RegistryState, request: &Message) -> String {
    let qpd = match request.segments().into_iter().find(|s| s.name() == "QPD") {
        Some(qpd) => qpd,
        None => return ack(request, "AE", Some("missing QPD segment")),
    };
    let tag = qpd.value(2).to_string();

    let (value, namespace, universal_id) = qpd
        .field(3)
        .and_then(|f| f.first())
        .map(|rep| {
            let (ns, oid) = rep
                .component(4)
                .map(|c| (c.subcomponent(1), c.subcomponent(2)))
                .unwrap_or(("", ""));
            (rep.component_value(1).to_string(), ns.to_string(), oid.to_string())
        })
        .unwrap_or_default();

    let key = state.domains.key(&namespace, &universal_id);
    let matches: Vec<&PatientRecord> = match key {
        Some(key) => state
            .patients
            .iter()
            .filter(|record| {
                record
                    .identifiers
                    .iter()
                    .any(|id| id.value == value && id.universal_id == key)
            })
            .collect(),
        None => Vec::new(),
    };

    let msh = request.segments()[0];
    let mut response = format!(
        "MSH|^~\\&|{RESPONDER_APP}|{RESPONDER_FACILITY}|{}|{}|{TIMESTAMP}||RSP^K23^RSP_K23|{}|P|2.5\r",
        msh.value(3),
        msh.value(4),
        msh.value(10),
    );
    response.push_str(&format!("MSA|AA|{}\r", msh.value(10)));
    response.push_str(&format!(
        "QAK|{tag}|{}\r",
        if matches.is_empty() { "NF" } else { "OK" }
    ));
    response.push_str(&format!(
        "QPD|IHE PDQ Query|{tag}|{value}^^^{namespace}&{universal_id}&ISO^PI\r"
    ));
    for record in matches {
        let ids: Vec<String> = record
            .identifiers
            .iter()
            .map(|id| format!("{}^^^{}&{}&ISO^PI", id.value, id.namespace, id.universal_id))
            .collect();
        response.push_str(&format!("PID|1||{}\r", ids.join("~")));
    }
    response
}

/// PID-3 repetitions as (value, namespace, universal id) triples
fn identifiers(pid: &Segment) -> Vec<(String, String, String)> {
    let mut out = Vec::new();
    if let Some(field) = pid.field(3) {
        for rep in field.repetitions() {
            let (ns, oid) = rep
                .component(4)
                .map(|c| (c.subcomponent(1), c.subcomponent(2)))
                .unwrap_or(("", ""));
            out.push((
                rep.component_value(1).to_string(),
                ns.to_string(),
                oid.to_string(),
            ));
        }
    }
    out
}

fn ack(request: &Message, code: &str, error: Option<&str>) -> String {
    let msh = request.segments()[0];
    let trigger = match request.trigger_event() {
        "" => "A01",
        ev => ev,
    };
    let mut response = format!(
        "MSH|^~\\&|{RESPONDER_APP}|{RESPONDER_FACILITY}|{}|{}|{TIMESTAMP}||ACK^{trigger}|{}|P|2.3.1\r",
        msh.value(3),
        msh.value(4),
        msh.value(10),
    );
    response.push_str(&format!("MSA|{code}|{}\r", msh.value(10)));
    if let Some(text) = error {
        response.push_str(&format!("ERR|^^^207&{text}\r"));
    }
    response
}
