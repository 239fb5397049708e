//! Repository management modules.
//!
//! Services here combine the store, credentials and update rules into the operations the API
//! layers expose.

pub mod accounts;
