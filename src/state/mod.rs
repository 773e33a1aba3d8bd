pub mod opportunity_store;

pub use opportunity_store::OpportunityStore;
