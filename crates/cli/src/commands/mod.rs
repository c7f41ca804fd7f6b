pub mod doctor;
pub mod format;
pub mod onboard;
pub mod serve;
