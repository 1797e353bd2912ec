//! Integration tests for davwatch-sync
//!
//! Drives the ingest and processing services end to end against an
//! in-memory event log and a wiremock WebDAV endpoint.


mod test_ingest;
