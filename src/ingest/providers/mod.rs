// src/ingest/providers/mod.rs
pub mod afad_html;
pub mod kandilli_text;
