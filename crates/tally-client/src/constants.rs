//! Client configuration constants.

use std::time::Duration;

/// How long a failed speculation stays on screen before the display is
/// resynced to the confirmed value. Gives the error message time to be seen
/// next to the value it refers to.
pub const ROLLBACK_DELAY: Duration = Duration::from_millis(500);
