pub mod alert_service;
pub mod portfolio_service;
pub mod position_service;
pub mod report_service;
pub mod risk_service;
pub mod risk_settings_service;
pub mod transaction_service;
