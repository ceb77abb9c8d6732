//! Containers and the actors behind them.

/// The other side of a container or trade menu.
pub trait Container {
    /// The actor this container belongs to, if it is one.
    fn as_actor(&self) -> Option<&dyn Actor>;
}

pub trait Actor {
    /// True once the actor is in its terminal (dead) state.
    fn is_dead(&self) -> bool;
}
