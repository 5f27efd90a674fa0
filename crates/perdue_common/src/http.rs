// --- File: crates/perdue_common/src/http.rs ---

pub mod client;
