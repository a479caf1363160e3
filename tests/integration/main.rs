//! Workspace integration tests: the engine end to end and the HTTP surface.

mod helpers;

mod delivery_test;
mod http_test;
mod presence_test;
mod store_test;
