// handlers/mod.rs - Two handler tiers
//
// Public (no auth) → Protected (JWT auth, some routes additionally admin-only)
pub mod protected; // Tier 2: JWT authentication required
pub mod public; // Tier 1: No authentication required
