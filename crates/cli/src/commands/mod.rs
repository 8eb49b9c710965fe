pub mod init;
pub mod pending;
pub mod prefs;
pub mod resume;
pub mod run;
pub mod runtime;
pub mod status;
