// File: ./src/model/mod.rs
// Aggregates the split model files
pub mod adapter;
pub mod event;
pub mod item;

pub use event::{CalendarEvent, Recurrence, Reminder};
pub use item::{ClassAggregate, Lesson, Period, RegisteredClass, Subject};
