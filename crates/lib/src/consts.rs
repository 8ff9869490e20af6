//! Crate-wide constants.

pub const APP_NAME: &str = "wheelhouse";

/// Default configuration file name, resolved against the working directory.
pub const CONFIG_FILENAME: &str = "wheelhouse.json";

/// Diagnostic tool appended to every default bucket.
pub const SYNTHETIC_REQUIREMENT: &str = "pipdeptree==2.23.4";

/// Bucket id used for the catch-all requirement set.
pub const DEFAULT_BUCKET: &str = "default";

/// Lock file written when the configuration names none.
pub const LOCK_FILENAME: &str = "frozen.lock";

/// Metadata-derived pin list written by the wheel inventory.
pub const FROZEN_FILENAME: &str = "frozen.txt";

/// Per-wheel size report written by the wheel inventory.
pub const SIZES_FILENAME: &str = "sizes.json";

/// Value is 315532800 = January 1, 1980 00:00:00 UTC (ZIP epoch)
pub const SOURCE_DATE_EPOCH: &str = "315532800";
