//! Integration tests for the query engine
//!
//! Tests term matching, exclusion, wildcard terms, caching, and bulk replace.

mod cached;
