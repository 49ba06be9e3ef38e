//! Fabric Comprehensive Test Suite
//!
//! End-to-end behavior of the memory fabric through the public crate.
//!
//! ## Test Tiers
//!
//! - **Tier 1**: Concrete scenarios (set/get, subscriptions, delete, search)
//! - **Tier 2**: Properties (history chains, pattern matching, concurrency)
//! - **Tier 3**: Dispatch isolation (scopes, failing handlers, unsubscribe)
//! - **Tier 4**: Durability (restart, torn tail, read-only)
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test fabric_comprehensive
//! ```

// Test modules
mod test_utils;

// Tier 1: Concrete scenarios
mod tier1_scenarios;

// Tier 2: Properties
mod tier2_properties;

// Tier 3: Dispatch isolation
mod tier3_dispatch_isolation;

// Tier 4: Durability
mod tier4_durability;
