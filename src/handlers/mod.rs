pub mod academic_year;
pub mod analytics;
pub mod auth;
pub mod clinic_visit;
pub mod deworming;
pub mod dengue;
pub mod employee;
pub mod event;
pub mod feeding_program;
pub mod logs;
pub mod medical_checkup;
pub mod medicine_inventory;
pub mod role;
pub mod student_profile;
pub mod user;
