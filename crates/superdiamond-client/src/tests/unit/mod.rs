//! Unit-level suites driven through the scripted authority.

mod accessor;
mod bootstrap;
