pub(crate) mod async_acquisition;
pub mod capture;
pub(crate) mod context;
pub mod mailbox;
pub mod recovery;
pub mod stop_signal;
pub(crate) mod sync_acquisition;
