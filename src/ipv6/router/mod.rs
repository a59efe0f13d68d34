//! Router discovery on hosts and router advertisement on routers.

mod advertisement;
mod discovery;
