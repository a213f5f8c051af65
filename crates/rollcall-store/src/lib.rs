//! rollcall-store — persistent state for the attendance scanner.
//!
//! A SQLite roster of enrolled students (name, class, photo path) and an
//! append-only CSV attendance log.

pub mod attendance;
pub mod roster;

pub use attendance::{AttendanceLog, AttendanceLogError};
pub use roster::{Roster, StoreError, StudentRecord};
