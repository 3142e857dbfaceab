//! In-memory adapters.
//!
//! - [`ReferenceAdapter`]: a complete, stateful implementation of all seven
//!   protocols and the cross-protocol operations. A conformant baseline for
//!   demos and end-to-end tests.
//! - [`ScriptedAdapter`]: canned outcomes per `(protocol, operation)`, built
//!   in code or loaded from a JSON fixture, optionally layered over another
//!   adapter.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::adapter::{AdapterError, ImplementationAdapter};
use crate::error::{CertifyError, Result};

type OpResult = std::result::Result<Value, AdapterError>;

/// Daily spend limit applied when none is configured.
pub const DEFAULT_DAILY_LIMIT: f64 = 1_000.0;

const GENESIS_HASH: &str = "genesis";

// ---------------------------------------------------------------------------
// ReferenceAdapter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Identity {
    identity_id: String,
    credential: String,
}

#[derive(Debug, Clone)]
struct Scope {
    scope_id: String,
    tools: Vec<String>,
    resources: Vec<String>,
}

#[derive(Debug, Clone)]
struct MemoryRecord {
    agent_id: String,
    record_type: String,
    retention_policy: String,
    content: Value,
}

#[derive(Debug, Clone, Serialize)]
struct AuditEntry {
    entry_id: String,
    agent_id: String,
    event_type: String,
    decision: String,
    context: Value,
    recorded_at: String,
    prev_hash: String,
    hash: String,
}

impl AuditEntry {
    fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.prev_hash.as_str(),
            self.entry_id.as_str(),
            self.agent_id.as_str(),
            self.event_type.as_str(),
            self.decision.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(b"|");
        }
        hasher.update(self.context.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Created,
    Active,
    Suspended,
    Retired,
}

impl LifecycleState {
    fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Active => "active",
            LifecycleState::Suspended => "suspended",
            LifecycleState::Retired => "retired",
        }
    }
}

#[derive(Debug, Clone)]
struct Lifecycle {
    state: LifecycleState,
    transitions: Vec<Value>,
}

#[derive(Debug, Default)]
struct ReferenceState {
    trust_levels: HashMap<String, u8>,
    identities: HashMap<String, Identity>,
    revoked: HashSet<String>,
    scopes: HashMap<String, Scope>,
    spent: HashMap<String, f64>,
    memory: BTreeMap<String, MemoryRecord>,
    audit: Vec<AuditEntry>,
    lifecycles: HashMap<String, Lifecycle>,
}

impl ReferenceState {
    fn audit(&mut self, agent_id: &str, event_type: &str, decision: &str, context: Value) -> String {
        let prev_hash = self
            .audit
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let mut entry = AuditEntry {
            entry_id: Uuid::new_v4().to_string(),
            agent_id: agent_id.to_string(),
            event_type: event_type.to_string(),
            decision: decision.to_string(),
            context,
            recorded_at: Utc::now().to_rfc3339(),
            prev_hash,
            hash: String::new(),
        };
        entry.hash = entry.compute_hash();
        let id = entry.entry_id.clone();
        self.audit.push(entry);
        id
    }

    fn entries_where(&self, pred: impl Fn(&AuditEntry) -> bool) -> Vec<Value> {
        self.audit
            .iter()
            .filter(|e| pred(e))
            .map(|e| json!(e))
            .collect()
    }
}

/// Stateful in-memory implementation of every protocol operation.
///
/// State lives for the lifetime of the adapter, so checks observe the side
/// effects of earlier checks in the same run (e.g. an identity revoked via
/// AIP is refused by ATP afterwards).
#[derive(Debug)]
pub struct ReferenceAdapter {
    daily_limit: f64,
    state: Mutex<ReferenceState>,
}

impl Default for ReferenceAdapter {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            state: Mutex::new(ReferenceState::default()),
        }
    }
}

impl ReferenceAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_daily_limit(mut self, limit: f64) -> Self {
        self.daily_limit = limit;
        self
    }

    /// Number of audit entries recorded so far.
    pub fn audit_len(&self) -> usize {
        self.lock().audit.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReferenceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, protocol: &str, operation: &str, p: &Value) -> OpResult {
        let mut s = self.lock();
        match (protocol, operation) {
            ("atp", "set_trust_level") => set_trust_level(&mut s, p),
            ("atp", "check_trust_requirement") => check_trust_requirement(&mut s, p),
            ("atp", "change_trust_level") => change_trust_level(&mut s, p),
            ("atp", "get_recent_audit_entries") => recent_audit_entries(&s, p),

            ("aip", "register_identity") => register_identity(&mut s, p),
            ("aip", "lookup_identity") => lookup_identity(&s, p),
            ("aip", "validate_credential") => validate_credential(&s, p),
            ("aip", "revoke_identity") => revoke_identity(&mut s, p),

            ("asp", "declare_scope") => declare_scope(&mut s, p),
            ("asp", "check_scope") => check_scope(&mut s, p),
            ("asp", "get_scope") => get_scope(&s, p),

            ("aeap", "check_spend_allowed") => check_spend_allowed(&mut s, self.daily_limit, p),
            ("aeap", "record_spend") => record_spend(&mut s, self.daily_limit, p),
            ("aeap", "get_budget_status") => budget_status(&s, self.daily_limit, p),

            ("amgp", "write_memory_record") => write_memory_record(&mut s, p),
            ("amgp", "query_memory_records") => query_memory_records(&s, p),
            ("amgp", "delete_memory_record") => delete_memory_record(&mut s, p),

            ("aoap", "append_audit_entry") => append_audit_entry(&mut s, p),
            ("aoap", "export_audit_log") => export_audit_log(&s, p),
            ("aoap", "verify_audit_chain") => Ok(verify_audit_chain(&s)),
            ("aoap", "query_audit_entries") => query_audit_entries(&s, p),

            ("alcp", "register_agent") => register_agent(&mut s, p),
            ("alcp", "activate_agent") => transition(&mut s, p, LifecycleState::Active),
            ("alcp", "suspend_agent") => transition(&mut s, p, LifecycleState::Suspended),
            ("alcp", "retire_agent") => transition(&mut s, p, LifecycleState::Retired),
            ("alcp", "get_lifecycle_history") => lifecycle_history(&s, p),

            ("cross_protocol", "check_action_allowed") => check_action_allowed(&mut s, p),
            ("cross_protocol", "assign_trust_with_identity_check") => {
                assign_trust_with_identity_check(&mut s, p)
            }
            ("cross_protocol", "get_denial_audit_entries") => denial_audit_entries(&s, p),

            _ => Err(AdapterError::not_supported(operation)),
        }
    }
}

#[async_trait]
impl ImplementationAdapter for ReferenceAdapter {
    async fn invoke(&self, protocol: &str, operation: &str, payload: &Value) -> OpResult {
        self.dispatch(protocol, operation, payload)
    }
}

// -- payload helpers ---------------------------------------------------------

fn str_field<'a>(payload: &'a Value, field: &str) -> std::result::Result<&'a str, AdapterError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::failed(format!("missing string field '{field}'")))
}

fn opt_str<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn num_field(payload: &Value, field: &str) -> std::result::Result<f64, AdapterError> {
    payload
        .get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| AdapterError::failed(format!("missing numeric field '{field}'")))
}

fn str_list(payload: &Value, field: &str) -> Vec<String> {
    payload
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `"L0"`..`"L5"` → 0..5.
fn trust_level(payload: &Value, field: &str) -> std::result::Result<u8, AdapterError> {
    let raw = str_field(payload, field)?;
    raw.strip_prefix(|c: char| c == 'L' || c == 'l')
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| *n <= 5)
        .ok_or_else(|| AdapterError::failed(format!("invalid trust level '{raw}'")))
}

// -- ATP ---------------------------------------------------------------------

fn set_trust_level(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let level = trust_level(p, "level")?;
    s.trust_levels.insert(agent.to_string(), level);
    Ok(json!({ "success": true, "agent_id": agent, "level": format!("L{level}") }))
}

fn check_trust_requirement(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let required = trust_level(p, "required_level")?;
    let current = match p.get("current_level") {
        Some(_) => trust_level(p, "current_level")?,
        None => s.trust_levels.get(agent).copied().unwrap_or(0),
    };

    let denial = if s.revoked.contains(agent) {
        Some("identity revoked: trust cannot be granted to a revoked agent".to_string())
    } else if current < required {
        Some(format!("insufficient trust level: L{current} < L{required}"))
    } else {
        None
    };

    let context = json!({ "required_level": required, "current_level": current });
    match denial {
        Some(reason) => {
            s.audit(agent, "trust_decision", "deny", context);
            Ok(json!({
                "allowed": false,
                "agent_id": agent,
                "required_level": format!("L{required}"),
                "current_level": format!("L{current}"),
                "reason": reason,
            }))
        }
        None => {
            s.audit(agent, "trust_decision", "allow", context);
            Ok(json!({ "allowed": true, "agent_id": agent }))
        }
    }
}

fn change_trust_level(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let level = trust_level(p, "new_level")?;
    let Some(owner) = opt_str(p, "authorized_by") else {
        return Ok(json!({
            "success": false,
            "reason": "trust level changes require explicit owner authorization",
        }));
    };
    let previous = s.trust_levels.insert(agent.to_string(), level);
    s.audit(
        agent,
        "trust_change",
        "allow",
        json!({ "new_level": level, "authorized_by": owner }),
    );
    Ok(json!({
        "success": true,
        "agent_id": agent,
        "previous_level": previous.map(|l| format!("L{l}")),
        "new_level": format!("L{level}"),
        "authorized_by": owner,
    }))
}

fn recent_audit_entries(s: &ReferenceState, p: &Value) -> OpResult {
    let limit = p.get("limit").and_then(Value::as_u64).unwrap_or(10) as usize;
    let skip = s.audit.len().saturating_sub(limit);
    let entries: Vec<Value> = s.audit.iter().skip(skip).map(|e| json!(e)).collect();
    Ok(json!({ "entries": entries }))
}

// -- AIP ---------------------------------------------------------------------

fn register_identity(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    str_field(p, "public_key")?;
    let identity = Identity {
        identity_id: Uuid::new_v4().to_string(),
        credential: Uuid::new_v4().to_string(),
    };
    let response = json!({
        "registered": true,
        "agent_id": agent,
        "identity_id": identity.identity_id,
        "credential": identity.credential,
    });
    s.revoked.remove(agent);
    s.identities.insert(agent.to_string(), identity);
    Ok(response)
}

fn lookup_identity(s: &ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    Ok(match s.identities.get(agent) {
        Some(identity) => json!({
            "found": true,
            "agent_id": agent,
            "identity_id": identity.identity_id,
            "revoked": s.revoked.contains(agent),
        }),
        None => json!({ "found": false }),
    })
}

fn validate_credential(s: &ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let presented = str_field(p, "credential_value")?;
    let reason = match s.identities.get(agent) {
        None => Some("unknown identity"),
        Some(_) if s.revoked.contains(agent) => Some("identity revoked"),
        Some(identity) if identity.credential != presented => Some("credential mismatch"),
        Some(_) => None,
    };
    Ok(match reason {
        Some(reason) => json!({ "valid": false, "reason": reason }),
        None => json!({ "valid": true }),
    })
}

fn revoke_identity(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let by = opt_str(p, "revoked_by").unwrap_or("unknown");
    s.revoked.insert(agent.to_string());
    s.audit(agent, "identity_revoked", "allow", json!({ "revoked_by": by }));
    Ok(json!({ "revoked": true, "agent_id": agent }))
}

// -- ASP ---------------------------------------------------------------------

fn declare_scope(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let spec = p
        .get("scope")
        .ok_or_else(|| AdapterError::failed("missing field 'scope'"))?;
    if opt_str(p, "declared_by").is_none() {
        return Ok(json!({
            "declared": false,
            "reason": "scope declaration requires an owner",
        }));
    }
    let scope = Scope {
        scope_id: Uuid::new_v4().to_string(),
        tools: str_list(spec, "tools"),
        resources: str_list(spec, "resources"),
    };
    let response = json!({ "declared": true, "scope_id": scope.scope_id });
    s.scopes.insert(agent.to_string(), scope);
    Ok(response)
}

fn check_scope(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let action = str_field(p, "action")?;
    let reason = match s.scopes.get(agent) {
        None => Some(format!("no scope declared for agent '{agent}'")),
        Some(scope) if !scope.tools.iter().any(|t| t == action) => {
            Some(format!("action '{action}' is outside the declared scope"))
        }
        Some(_) => None,
    };
    match reason {
        Some(reason) => {
            s.audit(agent, "scope_check", "deny", json!({ "action": action }));
            Ok(json!({ "allowed": false, "reason": reason }))
        }
        None => Ok(json!({ "allowed": true })),
    }
}

fn get_scope(s: &ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    Ok(match s.scopes.get(agent) {
        Some(scope) => json!({
            "scope_id": scope.scope_id,
            "scope": { "tools": scope.tools, "resources": scope.resources },
        }),
        None => json!({ "declared": false }),
    })
}

// -- AEAP --------------------------------------------------------------------

fn check_spend_allowed(s: &mut ReferenceState, limit: f64, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let amount = num_field(p, "amount")?;
    let remaining = limit - s.spent.get(agent).copied().unwrap_or(0.0);
    if amount > remaining {
        s.audit(agent, "spend_check", "deny", json!({ "amount": amount }));
        Ok(json!({
            "allowed": false,
            "remaining": remaining,
            "reason": format!("amount {amount} exceeds remaining daily budget {remaining}"),
        }))
    } else {
        Ok(json!({ "allowed": true, "remaining": remaining }))
    }
}

fn record_spend(s: &mut ReferenceState, limit: f64, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let amount = num_field(p, "amount")?;
    let spent = s.spent.entry(agent.to_string()).or_insert(0.0);
    if *spent + amount > limit {
        return Ok(json!({ "recorded": false, "reason": "spend exceeds daily limit" }));
    }
    *spent += amount;
    Ok(json!({ "recorded": true, "spend_id": Uuid::new_v4().to_string() }))
}

fn budget_status(s: &ReferenceState, limit: f64, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let spent = s.spent.get(agent).copied().unwrap_or(0.0);
    Ok(json!({
        "period": opt_str(p, "period").unwrap_or("daily"),
        "limit": limit,
        "spent": spent,
        "remaining": limit - spent,
    }))
}

// -- AMGP --------------------------------------------------------------------

fn write_memory_record(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let retention = str_field(p, "retention_policy")?;
    if retention == "long_term" && opt_str(p, "consent_token").is_none() {
        return Ok(json!({
            "written": false,
            "reason": "consent token required for long_term retention",
        }));
    }
    let record_id = Uuid::new_v4().to_string();
    s.memory.insert(
        record_id.clone(),
        MemoryRecord {
            agent_id: agent.to_string(),
            record_type: opt_str(p, "record_type").unwrap_or("observation").to_string(),
            retention_policy: retention.to_string(),
            content: p.get("content").cloned().unwrap_or(Value::Null),
        },
    );
    Ok(json!({ "written": true, "record_id": record_id }))
}

fn query_memory_records(s: &ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let retention = opt_str(p, "retention_policy");
    let records: Vec<Value> = s
        .memory
        .iter()
        .filter(|(_, r)| r.agent_id == agent)
        .filter(|(_, r)| retention.map_or(true, |want| r.retention_policy == want))
        .map(|(id, r)| {
            json!({
                "record_id": id,
                "record_type": r.record_type,
                "retention_policy": r.retention_policy,
                "content": r.content,
            })
        })
        .collect();
    Ok(json!({ "records": records }))
}

fn delete_memory_record(s: &mut ReferenceState, p: &Value) -> OpResult {
    let record_id = str_field(p, "record_id")?;
    if opt_str(p, "requested_by").is_none() {
        return Ok(json!({ "deleted": false, "reason": "deletion requires a requester" }));
    }
    let existed = s.memory.remove(record_id).is_some();
    Ok(json!({ "deleted": true, "record_id": record_id, "existed": existed }))
}

// -- AOAP --------------------------------------------------------------------

fn append_audit_entry(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let event_type = str_field(p, "event_type")?;
    let decision = opt_str(p, "decision").unwrap_or("allow");
    let context = p.get("context").cloned().unwrap_or_else(|| json!({}));
    let entry_id = s.audit(agent, event_type, decision, context);
    Ok(json!({ "appended": true, "entry_id": entry_id }))
}

fn export_audit_log(s: &ReferenceState, p: &Value) -> OpResult {
    let format = opt_str(p, "format").unwrap_or("json");
    if format != "json" {
        return Err(AdapterError::failed(format!(
            "unsupported export format '{format}'"
        )));
    }
    let agent = opt_str(p, "agent_id");
    let entries = s.entries_where(|e| agent.map_or(true, |a| e.agent_id == a));
    Ok(json!({ "format": "json", "entries": entries }))
}

fn verify_audit_chain(s: &ReferenceState) -> Value {
    let mut prev = GENESIS_HASH.to_string();
    for (index, entry) in s.audit.iter().enumerate() {
        if entry.prev_hash != prev || entry.compute_hash() != entry.hash {
            return json!({ "valid": false, "broken_at": index });
        }
        prev = entry.hash.clone();
    }
    json!({ "valid": true, "entries_verified": s.audit.len() })
}

fn query_audit_entries(s: &ReferenceState, p: &Value) -> OpResult {
    let agent = opt_str(p, "agent_id");
    let event_type = opt_str(p, "event_type");
    let entries = s.entries_where(|e| {
        agent.map_or(true, |a| e.agent_id == a) && event_type.map_or(true, |t| e.event_type == t)
    });
    Ok(json!({ "entries": entries }))
}

// -- ALCP --------------------------------------------------------------------

fn register_agent(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    if s.lifecycles.contains_key(agent) {
        return Ok(json!({ "registered": false, "reason": "agent already registered" }));
    }
    let owner = opt_str(p, "owner").unwrap_or("unknown");
    s.lifecycles.insert(
        agent.to_string(),
        Lifecycle {
            state: LifecycleState::Created,
            transitions: vec![json!({
                "from": null,
                "to": "created",
                "authorized_by": owner,
                "at": Utc::now().to_rfc3339(),
            })],
        },
    );
    Ok(json!({ "registered": true, "agent_id": agent, "state": "created" }))
}

fn transition(s: &mut ReferenceState, p: &Value, to: LifecycleState) -> OpResult {
    use LifecycleState::*;

    let agent = str_field(p, "agent_id")?;
    let Some(lifecycle) = s.lifecycles.get_mut(agent) else {
        return Ok(json!({ "changed": false, "reason": "agent not registered" }));
    };
    let from = lifecycle.state;
    let Some(owner) = opt_str(p, "authorized_by") else {
        return Ok(json!({
            "changed": false,
            "state": from.as_str(),
            "reason": "lifecycle transitions require explicit owner authorization",
        }));
    };
    let permitted = matches!(
        (from, to),
        (Created | Suspended, Active) | (Active, Suspended) | (Created | Active | Suspended, Retired)
    );
    if !permitted {
        return Ok(json!({
            "changed": false,
            "state": from.as_str(),
            "reason": format!("transition {} -> {} not permitted", from.as_str(), to.as_str()),
        }));
    }
    lifecycle.state = to;
    lifecycle.transitions.push(json!({
        "from": from.as_str(),
        "to": to.as_str(),
        "authorized_by": owner,
        "reason": opt_str(p, "reason"),
        "at": Utc::now().to_rfc3339(),
    }));
    Ok(json!({ "changed": true, "agent_id": agent, "state": to.as_str() }))
}

fn lifecycle_history(s: &ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let transitions = s
        .lifecycles
        .get(agent)
        .map(|l| l.transitions.clone())
        .unwrap_or_default();
    Ok(json!({ "agent_id": agent, "transitions": transitions }))
}

// -- cross-protocol ------------------------------------------------------------

fn check_action_allowed(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let trust = trust_level(p, "trust_level")?;
    let required = trust_level(p, "required_trust_level")?;

    // trust is evaluated before budget
    let blocked = if trust < required {
        Some(("atp", format!("insufficient trust level: L{trust} < L{required}")))
    } else {
        let amount = num_field(p, "amount")?;
        let remaining = num_field(p, "budget_remaining")?;
        (amount > remaining).then(|| ("aeap", format!("amount {amount} exceeds budget {remaining}")))
    };

    match blocked {
        Some((protocol, reason)) => {
            s.audit(
                agent,
                "action_check",
                "deny",
                json!({ "blocked_by": protocol, "action_type": p.get("action_type") }),
            );
            Ok(json!({ "allowed": false, "blocked_by": protocol, "reason": reason }))
        }
        None => Ok(json!({ "allowed": true })),
    }
}

fn assign_trust_with_identity_check(s: &mut ReferenceState, p: &Value) -> OpResult {
    let agent = str_field(p, "agent_id")?;
    let level = trust_level(p, "requested_level")?;
    let verified = match p.get("identity_verified").and_then(Value::as_bool) {
        Some(flag) => flag,
        None => s.identities.contains_key(agent) && !s.revoked.contains(agent),
    };
    if !verified {
        s.audit(agent, "trust_change", "deny", json!({ "requested_level": level }));
        return Ok(json!({
            "success": false,
            "reason": "verified identity required before trust assignment",
        }));
    }
    s.trust_levels.insert(agent.to_string(), level);
    Ok(json!({ "success": true, "level": format!("L{level}") }))
}

fn denial_audit_entries(s: &ReferenceState, p: &Value) -> OpResult {
    let agent = opt_str(p, "agent_id");
    let entries =
        s.entries_where(|e| e.decision == "deny" && agent.map_or(true, |a| e.agent_id == a));
    Ok(json!({ "entries": entries }))
}

// ---------------------------------------------------------------------------
// ScriptedAdapter
// ---------------------------------------------------------------------------

/// Outcome a scripted step produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptedOutcome {
    Respond { response: Value },
    NotSupported,
    Fail { message: String },
    /// Never completes; only a timeout ends the invocation.
    Hang,
}

/// One scripted reply, optionally delayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedStep {
    #[serde(flatten)]
    pub outcome: ScriptedOutcome,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delay_ms: u64,
}

fn is_zero(ms: &u64) -> bool {
    *ms == 0
}

impl From<ScriptedOutcome> for ScriptedStep {
    fn from(outcome: ScriptedOutcome) -> Self {
        Self {
            outcome,
            delay_ms: 0,
        }
    }
}

/// A single step, or a sequence consumed in order (the last step repeats).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Script {
    Sequence(Vec<ScriptedStep>),
    Single(ScriptedStep),
}

impl Script {
    fn step(&self, call: usize) -> Option<&ScriptedStep> {
        match self {
            Script::Single(step) => Some(step),
            Script::Sequence(steps) => steps.get(call).or_else(|| steps.last()),
        }
    }
}

/// On-disk fixture format for [`ScriptedAdapter::from_fixture_file`].
///
/// ```json
/// {
///   "implementation_name": "acme-agent",
///   "fallback": "reference",
///   "operations": {
///     "aip": { "lookup_identity": { "kind": "not_supported" } },
///     "atp": { "set_trust_level": { "kind": "respond", "response": { "success": true } } }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptFixture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_name: Option<String>,
    /// `"reference"` routes unscripted operations to a [`ReferenceAdapter`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// Reply for unscripted operations when there is no fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ScriptedStep>,
    /// protocol → operation → script.
    #[serde(default)]
    pub operations: BTreeMap<String, BTreeMap<String, Script>>,
}

/// Adapter replaying canned outcomes.
///
/// Unscripted operations go to the fallback adapter if one is set, then to
/// the default step, and are otherwise reported as not supported.
#[derive(Default)]
pub struct ScriptedAdapter {
    implementation_name: Option<String>,
    scripts: HashMap<(String, String), Script>,
    default: Option<ScriptedStep>,
    fallback: Option<Arc<dyn ImplementationAdapter>>,
    calls: Mutex<HashMap<(String, String), usize>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a parsed fixture.
    pub fn from_fixture(fixture: ScriptFixture) -> Result<Self> {
        let mut adapter = Self::new();
        adapter.implementation_name = fixture.implementation_name;
        adapter.default = fixture.default;
        match fixture.fallback.as_deref() {
            None => {}
            Some("reference") => adapter.fallback = Some(Arc::new(ReferenceAdapter::new())),
            Some(other) => {
                return Err(CertifyError::AdapterConstruction(format!(
                    "unknown fallback adapter '{other}'"
                )))
            }
        }
        for (protocol, ops) in fixture.operations {
            for (operation, script) in ops {
                adapter.scripts.insert((protocol.clone(), operation), script);
            }
        }
        Ok(adapter)
    }

    /// Parse a fixture from a JSON string.
    pub fn from_fixture_str(raw: &str) -> Result<Self> {
        let fixture: ScriptFixture = serde_json::from_str(raw)
            .map_err(|e| CertifyError::AdapterConstruction(format!("invalid fixture: {e}")))?;
        Self::from_fixture(fixture)
    }

    /// Load a fixture file. Any failure is an adapter construction error.
    pub fn from_fixture_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CertifyError::AdapterConstruction(format!("read fixture {}: {e}", path.display()))
        })?;
        Self::from_fixture_str(&raw)
    }

    pub fn implementation_name(&self) -> Option<&str> {
        self.implementation_name.as_deref()
    }

    pub fn with_fallback(mut self, adapter: impl ImplementationAdapter + 'static) -> Self {
        self.fallback = Some(Arc::new(adapter));
        self
    }

    pub fn with_default(mut self, step: impl Into<ScriptedStep>) -> Self {
        self.default = Some(step.into());
        self
    }

    pub fn script(mut self, protocol: &str, operation: &str, script: Script) -> Self {
        self.scripts
            .insert((protocol.to_string(), operation.to_string()), script);
        self
    }

    pub fn respond(self, protocol: &str, operation: &str, response: Value) -> Self {
        self.step(protocol, operation, ScriptedOutcome::Respond { response }.into())
    }

    pub fn not_supported(self, protocol: &str, operation: &str) -> Self {
        self.step(protocol, operation, ScriptedOutcome::NotSupported.into())
    }

    pub fn fail(self, protocol: &str, operation: &str, message: &str) -> Self {
        let outcome = ScriptedOutcome::Fail {
            message: message.to_string(),
        };
        self.step(protocol, operation, outcome.into())
    }

    pub fn hang(self, protocol: &str, operation: &str) -> Self {
        self.step(protocol, operation, ScriptedOutcome::Hang.into())
    }

    pub fn delayed(self, protocol: &str, operation: &str, delay_ms: u64, response: Value) -> Self {
        let step = ScriptedStep {
            outcome: ScriptedOutcome::Respond { response },
            delay_ms,
        };
        self.step(protocol, operation, step)
    }

    fn step(self, protocol: &str, operation: &str, step: ScriptedStep) -> Self {
        self.script(protocol, operation, Script::Single(step))
    }

    /// Times `(protocol, operation)` has been invoked.
    pub fn call_count(&self, protocol: &str, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(protocol.to_string(), operation.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn next_step(&self, key: &(String, String)) -> Option<ScriptedStep> {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        let call = calls.entry(key.clone()).or_insert(0);
        let index = *call;
        *call += 1;
        self.scripts
            .get(key)
            .and_then(|script| script.step(index))
            .cloned()
    }
}

#[async_trait]
impl ImplementationAdapter for ScriptedAdapter {
    async fn invoke(&self, protocol: &str, operation: &str, payload: &Value) -> OpResult {
        let key = (protocol.to_string(), operation.to_string());
        let step = match self.next_step(&key) {
            Some(step) => step,
            None => match (&self.fallback, &self.default) {
                (Some(fallback), _) => return fallback.invoke(protocol, operation, payload).await,
                (None, Some(step)) => step.clone(),
                (None, None) => return Err(AdapterError::not_supported(operation)),
            },
        };

        if step.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
        }
        match step.outcome {
            ScriptedOutcome::Respond { response } => Ok(response),
            ScriptedOutcome::NotSupported => Err(AdapterError::not_supported(operation)),
            ScriptedOutcome::Fail { message } => Err(AdapterError::Failed(message)),
            ScriptedOutcome::Hang => std::future::pending().await,
        }
    }
}
