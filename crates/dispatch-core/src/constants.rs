/// Default namespace for persisted assignment partitions.
pub const DEFAULT_STORE_NAMESPACE: &str = "assignments";

/// Partition suffix used for the undated aggregate view.
pub const AGGREGATE_PARTITION: &str = "all";

/// Separator between namespace and partition in storage keys.
pub const STORAGE_KEY_SEPARATOR: &str = ":";

/// Orders API path components
pub const ORDERS_PATH_COMPONENT: &str = "orders";
pub const ASSIGNMENTS_PATH_COMPONENT: &str = "assignments";
pub const CONFIRM_PATH_COMPONENT: &str = "confirm";
pub const CANCEL_PATH_COMPONENT: &str = "cancel";

/// Date format used for date keys and the `date` query parameter.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Time format for order start times on the wire and in persisted rows.
pub const START_TIME_FORMAT: &str = "%H:%M";

pub const DEFAULT_TIME_ZONE: &str = "Asia/Tokyo";
pub const DEFAULT_API_BASE_URL: &str = const_str::concat!("http://localhost:8080/", "api");
