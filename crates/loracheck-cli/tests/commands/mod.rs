//! Command-specific CLI tests.

mod add_device_test;
mod list_test;
mod query_test;
mod verify_test;
