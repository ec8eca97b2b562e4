pub mod backup;
pub mod classes;
pub mod core;
pub mod dashboard;
pub mod fees;
pub mod holidays;
pub mod notifications;
pub mod settings;
pub mod students;
pub mod teachers;
