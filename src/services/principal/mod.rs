mod memory;
mod pg;

pub use memory::InMemoryPrincipalStore;
pub use pg::PgPrincipalStore;
