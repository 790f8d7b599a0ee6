//! Default values referenced by `#[serde(default = ...)]` attributes.

// ── Server ─────────────────────────────────────────────────────────────────

pub fn base_url() -> String {
    "http://localhost:8000".to_string()
}

pub fn request_timeout_secs() -> u64 {
    30
}

pub fn user_agent() -> String {
    "padsync".to_string()
}

// ── Sync ───────────────────────────────────────────────────────────────────

pub fn same_tab_policy() -> crate::types::SameTabPolicy {
    crate::types::SameTabPolicy::Queue
}

pub fn new_pad_title() -> String {
    "New pad".to_string()
}

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_false() -> bool {
    false
}
