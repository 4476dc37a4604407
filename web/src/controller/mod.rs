pub(crate) mod event_controller;
pub(crate) mod health_check_controller;
pub(crate) mod session_controller;
