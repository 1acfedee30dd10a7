// Session ownership and navigation gating.
// Only `store` touches the persisted slots; everything else observes snapshots.

pub mod guard;
pub mod storage;
pub mod store;
