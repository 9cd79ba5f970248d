/**
 * How long (milliseconds) a single scan session stays open before it is closed.
 */
pub const DEFAULT_SCAN_WINDOW: u64 = 5000;

/**
 * How often (milliseconds) the scheduler attempts to start a new scan session.
 */
pub const DEFAULT_SCAN_PERIOD: u64 = 5000;

/**
 * How long (milliseconds) stopping the discovery source may take.
 * Must stay below the scan window.
 */
pub const DEFAULT_STOP_DEADLINE: u64 = 2000;

/**
 * Capacity of the command queue into the scan session task.
 */
pub const SESSION_COMMAND_CAPACITY: usize = 16;

/**
 * Capacity of the manual trigger queue into the scheduler task.
 */
pub const TRIGGER_CAPACITY: usize = 8;

pub const GENERIC_DISCOVERY_ERROR: &str = "unexpected discovery error";
pub const GENERIC_PERMISSION_ERROR: &str = "unexpected permission error";
pub const SOURCE_CLOSED_ERROR: &str = "discovery source closed unexpectedly";
