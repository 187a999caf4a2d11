pub mod audit_log_service;
pub mod config_service;
pub mod cost_center_service;
pub mod employee_self_service;
pub mod employee_update_service;
pub mod role_service;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
