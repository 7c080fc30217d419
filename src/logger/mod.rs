//! Structured event logging: append-only JSONL with stderr fallback.

pub mod jsonl;
