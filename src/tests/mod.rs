mod client_tests;
mod proxy_tests;
mod sync_tests;
