pub mod auth;
pub mod catalog;
pub mod contracts;
pub mod crm;
pub mod notification;
pub mod portfolio;
pub mod project;
pub mod solicitation;
