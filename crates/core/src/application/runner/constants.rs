// Runner constants (No magic values)

/// Capacity of the event channel between the job thread and the connection task
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Largest accepted include/exclude list
pub const MAX_ROOTS: usize = 1024;

/// Maximum nesting depth walked below an include root
pub const MAX_WALK_DEPTH: usize = 256;
