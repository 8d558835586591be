mod delivery;
mod domain;
mod schema;
mod tenant;

pub use delivery::DeliveryQueueRepository;
pub use domain::DomainRepository;
pub use schema::CentralSchema;
pub use tenant::TenantRepository;
