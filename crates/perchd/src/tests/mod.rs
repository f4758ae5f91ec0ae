//! Behaviour tests exercising the assembled daemon stack.

mod daemon_behaviour;
