pub mod attendance;
pub mod audit;
pub mod auth;
pub mod classes;
pub mod enrolments;
pub mod guardians;
pub mod roles;
pub mod students;
pub mod users;
