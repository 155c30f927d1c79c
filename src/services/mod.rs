pub mod attempt_service;
pub mod backend_service;
pub mod result_service;
pub mod session_service;
pub mod timer_service;
