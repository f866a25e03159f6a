// Exit codes of the `alt` binary
pub const EXIT_SUCCESS: i32 = 0;
/// The file is damaged, or the command failed.
pub const EXIT_FAILURE: i32 = 1;
/// The configuration file or environment could not be loaded.
pub const EXIT_CONFIG: i32 = 2;
