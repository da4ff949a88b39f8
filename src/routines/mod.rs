// Routines for reading the effect tables
pub mod data;
// Routines for logging
pub mod logger;
// Routines for output
pub mod output;
// Routines for settings
pub mod settings;
