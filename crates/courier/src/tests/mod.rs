//! Behavioural suites for the dispatch routers.

mod net_dispatch_behaviour;
mod support;
