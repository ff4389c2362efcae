pub mod catalog_service;
pub mod crm_service;
pub mod document_service;
pub mod notification_service;
pub mod portfolio_service;
pub mod project_poller;
pub mod project_service;
pub mod signature;
pub mod transition;
pub mod workflow_service;
