pub mod delegate_handlers;
pub mod event_handlers;
pub mod geocode_handlers;
pub mod join_handlers;
pub mod task_handlers;
pub mod volunteer_handlers;
