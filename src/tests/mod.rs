mod credentials_tests;
mod proxy_tests;
mod utils;
