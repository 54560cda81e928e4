//! Library surface of the fraudwatch front end, split out so the HTTP router
//! and argument handling can be exercised from integration tests.
pub mod input;
pub mod serve;
