pub mod contracts;
pub mod crm;
pub mod documents;
pub mod projects;
pub mod solicitations;
